// src/providers/mock.rs
//
// Last stage of the chain. Pure function of the input so the same request
// always reads the same way.

use crate::model::{ContentDomain, GenerationInput};

const TAROT_REFLECTIONS: [&str; 4] = [
    "The cards point to a turning point: what you release now makes room for what comes next.",
    "The cards suggest patience. The answer is forming, but it is not ready to be forced.",
    "The cards highlight your own judgement as the strongest influence on this outcome.",
    "The cards show tension between what you want and what you expect. Naming both eases it.",
];

const DREAM_REFLECTIONS: [&str; 4] = [
    "Dreams like this often surface when something unfinished is asking for attention.",
    "This dream reads as your mind rehearsing a change you already sense is coming.",
    "The imagery suggests feelings you have set aside during the day are looking for space.",
    "Recurring details like these tend to mark what matters most to you right now.",
];

/// Deterministic stand-in used when every provider has failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockInterpreter;

impl MockInterpreter {
    pub fn interpret(&self, domain: ContentDomain, input: &GenerationInput) -> String {
        let question = input.question.trim();
        let context = input.card_spread_or_context.trim();
        let structured = input.structured_card_or_context.trim();

        let mut text = String::new();
        match domain {
            ContentDomain::Tarot => {
                text.push_str(&format!("Your question: \"{}\"\n\n", question));
                text.push_str(&format!("Spread: {}\n", context));
                if !structured.is_empty() {
                    text.push_str(&format!("Cards: {}\n", structured));
                }
                text.push('\n');
                text.push_str(TAROT_REFLECTIONS[stable_index(question, TAROT_REFLECTIONS.len())]);
            }
            ContentDomain::Dream => {
                text.push_str(&format!("Your question: \"{}\"\n\n", question));
                text.push_str(&format!("Your dream: {}\n", context));
                if !structured.is_empty() {
                    text.push_str(&format!("Symbols: {}\n", structured));
                }
                text.push('\n');
                text.push_str(DREAM_REFLECTIONS[stable_index(question, DREAM_REFLECTIONS.len())]);
            }
        }

        text.push_str("\n\n");
        if input.is_guest_user {
            text.push_str(
                "This is a brief reading. Sign in to save it and receive a fuller interpretation.",
            );
        } else {
            text.push_str("Come back to this reading whenever you want to reflect on it again.");
        }
        text
    }
}

// FNV-1a, so the choice is stable across processes and platforms
fn stable_index(seed: &str, len: usize) -> usize {
    let hash = seed.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    });
    (hash % len as u64) as usize
}
