// src/prompt/templates.rs
//
// Built-in prompts used whenever the prompt store can't supply one.

use crate::config::DEFAULT_MODEL;
use crate::model::ContentDomain;
use crate::prompt::PromptConfig;

const TAROT_TEMPLATE: &str = "You are an experienced tarot reader.
A {audience} asked: \"{question}\"
Spread: {spread}
Cards drawn: {cards}

Give a {style} interpretation. Walk through each card in its position, \
then tie them together into an answer to the question. \
Close with one concrete piece of advice.";

const DREAM_TEMPLATE: &str = "You are a thoughtful dream interpreter.
A {audience} asked: \"{question}\"
Dream: {spread}
Notable symbols: {cards}

Give a {style} interpretation. Explain what the key symbols commonly \
represent, how they relate to the question, and what the dreamer might \
reflect on next.";

pub fn default_template(domain: ContentDomain) -> &'static str {
    match domain {
        ContentDomain::Tarot => TAROT_TEMPLATE,
        ContentDomain::Dream => DREAM_TEMPLATE,
    }
}

pub fn default_prompt_config(domain: ContentDomain) -> PromptConfig {
    PromptConfig {
        model: DEFAULT_MODEL.to_string(),
        prompt_template: default_template(domain).to_string(),
    }
}
