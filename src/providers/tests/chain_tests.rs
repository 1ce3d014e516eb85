// src/providers/tests/chain_tests.rs

use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

use crate::config::CircuitBreakerConfig;
use crate::error::ProviderError;
use crate::model::{ContentDomain, InterpretationSource};
use crate::prompt::templates::default_prompt_config;
use crate::prompt::PromptConfig;
use crate::providers::{InterpretationProvider, MockInterpreter, ProviderFallbackChain};
use crate::test_utils::{sample_input, Script, ScriptedProvider};

fn chain(providers: Vec<Arc<ScriptedProvider>>) -> ProviderFallbackChain {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn InterpretationProvider>)
        .collect();
    ProviderFallbackChain::new(providers, CircuitBreakerConfig::default())
}

fn fail(message: &str) -> Script {
    Script::Fail(ProviderError::Transport(message.to_string()))
}

#[tokio::test]
async fn test_first_provider_wins() {
    let a = ScriptedProvider::new("a", Script::Reply("from a".to_string()));
    let b = ScriptedProvider::new("b", Script::Reply("from b".to_string()));
    let chain = chain(vec![a.clone(), b.clone()]);

    let input = sample_input(ContentDomain::Tarot);
    let result = chain
        .run(ContentDomain::Tarot, &input, &default_prompt_config(ContentDomain::Tarot))
        .await;

    assert_eq!(result.text, "from a");
    assert_eq!(result.source, InterpretationSource::Provider("a".to_string()));
    assert!(result.failures.is_empty());
    assert_eq!(b.calls(), 0, "b must not be called when a succeeds");
}

#[tokio::test]
async fn test_falls_through_to_second_provider() {
    let a = ScriptedProvider::new("a", fail("connection refused"));
    let b = ScriptedProvider::new("b", Script::Reply("from b".to_string()));
    let chain = chain(vec![a.clone(), b.clone()]);

    let input = sample_input(ContentDomain::Dream);
    let result = chain
        .run(ContentDomain::Dream, &input, &default_prompt_config(ContentDomain::Dream))
        .await;

    assert_eq!(result.text, "from b");
    assert_eq!(result.source, InterpretationSource::Provider("b".to_string()));
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].0, "a");
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_provider_times_out() {
    let a = ScriptedProvider::with_timeout("a", Script::Hang, Duration::from_secs(15));
    let b = ScriptedProvider::new("b", Script::Reply("from b".to_string()));
    let chain = chain(vec![a, b]);

    let input = sample_input(ContentDomain::Tarot);
    let result = chain
        .run(ContentDomain::Tarot, &input, &default_prompt_config(ContentDomain::Tarot))
        .await;

    assert_eq!(result.text, "from b");
    assert_eq!(
        result.failures[0].1,
        ProviderError::Timeout(Duration::from_secs(15))
    );
}

#[tokio::test]
async fn test_blank_text_counts_as_failure() {
    let a = ScriptedProvider::new("a", Script::Reply("   \n".to_string()));
    let b = ScriptedProvider::new("b", Script::Reply("from b".to_string()));
    let chain = chain(vec![a, b]);

    let input = sample_input(ContentDomain::Tarot);
    let result = chain
        .run(ContentDomain::Tarot, &input, &default_prompt_config(ContentDomain::Tarot))
        .await;

    assert_eq!(result.text, "from b");
    assert_eq!(result.failures[0].1, ProviderError::EmptyText);
}

#[tokio::test]
#[traced_test]
async fn test_all_failures_use_deterministic_fallback() {
    let chain = chain(vec![
        ScriptedProvider::new("a", fail("down")),
        ScriptedProvider::new(
            "b",
            Script::Fail(ProviderError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
        ),
    ]);

    let input = sample_input(ContentDomain::Tarot);
    let prompt = default_prompt_config(ContentDomain::Tarot);
    let first = chain.run(ContentDomain::Tarot, &input, &prompt).await;
    let second = chain.run(ContentDomain::Tarot, &input, &prompt).await;

    assert_eq!(first.source, InterpretationSource::Fallback);
    assert!(!first.text.trim().is_empty());
    assert_eq!(first.text, second.text);
    assert_eq!(
        first.text,
        MockInterpreter.interpret(ContentDomain::Tarot, &input)
    );
    assert_eq!(first.failures.len(), 2);
    assert!(logs_contain("All providers failed"));
}

#[tokio::test]
async fn test_empty_chain_uses_fallback() {
    let chain = ProviderFallbackChain::fallback_only();
    assert!(chain.provider_names().is_empty());

    let input = sample_input(ContentDomain::Dream);
    let result = chain
        .run(ContentDomain::Dream, &input, &default_prompt_config(ContentDomain::Dream))
        .await;
    assert_eq!(result.source, InterpretationSource::Fallback);
    assert!(result.text.contains(input.question.as_str()));
}

#[tokio::test]
async fn test_prompt_is_rendered_and_model_forwarded() {
    let a = ScriptedProvider::new("a", Script::Reply("ok".to_string()));
    let chain = chain(vec![a.clone()]);

    let input = sample_input(ContentDomain::Tarot);
    let prompt = PromptConfig {
        model: "gemini-1.5-pro".to_string(),
        prompt_template: "Q={question}; S={spread}; C={cards}".to_string(),
    };
    chain.run(ContentDomain::Tarot, &input, &prompt).await;

    let request = a.last_request().unwrap();
    assert_eq!(request.model, "gemini-1.5-pro");
    assert_eq!(
        request.prompt,
        format!(
            "Q={}; S={}; C={}",
            input.question, input.card_spread_or_context, input.structured_card_or_context
        )
    );
}

#[tokio::test]
async fn test_open_circuit_skips_provider() {
    let a = ScriptedProvider::new("a", fail("down"));
    let b = ScriptedProvider::new("b", Script::Reply("from b".to_string()));
    let chain = ProviderFallbackChain::new(
        vec![
            a.clone() as Arc<dyn InterpretationProvider>,
            b.clone() as Arc<dyn InterpretationProvider>,
        ],
        CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout: Duration::from_secs(60),
            success_threshold: 1,
        },
    );

    let input = sample_input(ContentDomain::Tarot);
    let prompt = default_prompt_config(ContentDomain::Tarot);
    for _ in 0..4 {
        let result = chain.run(ContentDomain::Tarot, &input, &prompt).await;
        assert_eq!(result.text, "from b");
    }

    // Two real failures opened the circuit; later runs skip "a"
    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 4);

    let result = chain.run(ContentDomain::Tarot, &input, &prompt).await;
    assert_eq!(result.failures[0].1, ProviderError::CircuitOpen);
}
