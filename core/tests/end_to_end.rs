use std::sync::Arc;

use conductor_core::providers::{GENERAL_DIRECTIVE, LANGUAGE_DIRECTIVE};
use conductor_core::{
    CollectingSink, Domain, NO_MATCH_CONTEXT, Orchestrator, OrchestratorConfig, Request,
    TraceEvent,
};
use conductor_generation::GenerationRequest;
use conductor_generation::mock::ScriptedGenerator;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CHAR_COUNT: &str = r#"{
    "name": "char_count",
    "description": "Count the characters in a string.",
    "input_schema": {
        "properties": {"text": {"type": "string", "description": "Text to measure"}},
        "required": ["text"]
    },
    "handler": {"kind": "transform", "op": "char_count", "input": "text"}
}"#;

/// Answers like a well-behaved model, keyed on the directive it receives.
fn respond(request: &GenerationRequest) -> conductor_generation::Result<String> {
    let directive = request.directive.as_str();
    let prompt = request.prompt.to_lowercase();

    let reply = if directive.starts_with("Classify the request") {
        if directive.contains("- store:") {
            if prompt.starts_with("my ") { "store" } else { "retrieve" }
        } else if directive.contains("- create_new:") {
            if prompt.contains("create") {
                "Processing... create_new"
            } else {
                "char_count"
            }
        } else if prompt.contains("translate") {
            "language"
        } else if prompt.contains("tool") || prompt.contains("count") {
            "I think this is tools"
        } else if prompt.contains("my name") || prompt.contains("my age") {
            "memory"
        } else if prompt.chars().any(|c| c.is_ascii_digit()) {
            "math"
        } else {
            "general"
        }
    } else if directive.starts_with("You design small tools") {
        CHAR_COUNT
    } else if directive.starts_with("Extract the arguments") {
        r#"{"text": "hello world"}"#
    } else if directive.starts_with("Answer the user's question") {
        if request.context.as_deref() == Some(NO_MATCH_CONTEXT) {
            "I don't have any information about that."
        } else {
            "Here is what you told me."
        }
    } else if directive == LANGUAGE_DIRECTIVE {
        "\"Hola\" is Spanish for hello."
    } else if directive == GENERAL_DIRECTIVE {
        "General answer."
    } else {
        "Factor the left side and set each factor to zero."
    };

    Ok(reply.to_string())
}

fn scripted() -> ScriptedGenerator {
    ScriptedGenerator::new().with_responder(respond)
}

async fn orchestrator(temp_dir: &TempDir, generator: &ScriptedGenerator) -> Orchestrator {
    let config = OrchestratorConfig::default().with_artifact_dir(temp_dir.path());
    Orchestrator::builder(config, Arc::new(generator.clone()))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_quadratic_routes_to_math_and_reports_both_roots() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir, &scripted()).await;
    let sink = CollectingSink::new();

    let outcome = orchestrator
        .dispatch(&Request::new("Solve x^2 + 5x + 6 = 0"), Arc::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.label, Domain::Math);
    assert!(outcome.text.contains("-2"));
    assert!(outcome.text.contains("-3"));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        TraceEvent::ToolCompleted { tool, success: true, .. } if tool == "solve_equation"
    )));
}

#[tokio::test]
async fn test_translation_routes_to_language() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir, &scripted()).await;

    let text = orchestrator
        .handle("Translate 'Hello' to Spanish", Vec::new())
        .await;
    assert!(text.contains("Hola"));
}

#[tokio::test]
async fn test_store_then_unknown_fact_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir, &scripted()).await;

    let stored = orchestrator
        .dispatch(&Request::new("My name is J"), Arc::new(CollectingSink::new()))
        .await
        .unwrap();
    assert_eq!(stored.label, Domain::Memory);
    assert_eq!(stored.text, "Got it, I'll remember that.");

    let sink = CollectingSink::new();
    let answer = orchestrator
        .dispatch(&Request::new("What is my age?"), Arc::new(sink.clone()))
        .await
        .unwrap();
    assert_eq!(answer.label, Domain::Memory);
    assert_eq!(answer.text, "I don't have any information about that.");
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, TraceEvent::RetrievalCompleted { results: 0, .. })));
}

#[tokio::test]
async fn test_disabled_provider_routes_to_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let generator = scripted();
    let orchestrator = orchestrator(&temp_dir, &generator).await;

    orchestrator
        .set_enabled(Domain::Language, false)
        .await
        .unwrap();
    let outcome = orchestrator
        .dispatch(
            &Request::new("Translate 'Hello' to Spanish"),
            Arc::new(CollectingSink::new()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.label, Domain::General);
    assert!(!outcome.matched);
    assert_eq!(outcome.text, "General answer.");
    let classification = &generator.requests()[0];
    assert!(!classification.directive.contains("- language:"));
}

#[tokio::test]
async fn test_second_tool_request_reuses_the_first_tool() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir, &scripted()).await;

    let created = orchestrator
        .handle("create a tool that counts characters", Vec::new())
        .await;
    assert!(created.starts_with("Created tool char_count"));

    let counted = orchestrator
        .handle("count the characters in 'hello world'", Vec::new())
        .await;
    assert_eq!(counted, "11");

    let stats = orchestrator.registry().stats().await;
    assert_eq!(stats.synthesized, 1);
}

#[tokio::test]
async fn test_synthesized_tools_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let first = orchestrator(&temp_dir, &scripted()).await;
    let outcome = first
        .request_tool("create a tool that counts characters")
        .await
        .unwrap();
    assert!(outcome.created);
    drop(first);

    let second = orchestrator(&temp_dir, &scripted()).await;
    assert!(second.registry().contains("char_count").await);

    let again = second
        .request_tool("count the characters in a string")
        .await
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.tool_name, "char_count");
}

#[tokio::test]
async fn test_concurrent_cycles_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = Arc::new(orchestrator(&temp_dir, &scripted()).await);

    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let text = orchestrator.handle(&format!("What is {n} + {n}?"), Vec::new()).await;
                (n, text)
            })
        })
        .collect();

    for handle in handles {
        let (n, text) = handle.await.unwrap();
        let expected = format!("**Result:** {}", n * 2);
        assert!(text.starts_with(&expected), "{text}");
    }
}
