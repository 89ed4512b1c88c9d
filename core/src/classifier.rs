//! Closed-set classification through one generation call.
//!
//! The classifier asks the generation capability to answer with one label
//! and then matches the reply against the candidates. Replies are often
//! padded ("I think this is a store action"), so matching looks for a label
//! inside the reply rather than comparing for equality. A reply that names
//! no candidate resolves to the fallback label.

use std::sync::Arc;
use std::time::Duration;

use conductor_generation::{GenerationError, GenerationRequest, Generator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::label::LabelSet;

/// How a label is located in the generated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The label's words appear as whole words, in order.
    #[default]
    Token,

    /// The label appears anywhere, even inside another word.
    Substring,
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The chosen label, always one of the candidates.
    pub label: String,

    /// False when the reply named no candidate and the fallback was used.
    pub matched: bool,
}

/// Picks one label from a candidate set.
pub struct Classifier {
    generator: Arc<dyn Generator>,
    model: Option<String>,
    timeout: Duration,
    match_mode: MatchMode,
}

impl Classifier {
    /// Create a classifier with token matching and a 15 second timeout.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            model: None,
            timeout: Duration::from_secs(15),
            match_mode: MatchMode::default(),
        }
    }

    /// Use a specific model.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Set the timeout for the classification call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the match mode.
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Current match mode.
    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Classify `request` into one of `labels`.
    ///
    /// Only a failed or timed-out generation call is an error; any reply
    /// text, however malformed, yields a candidate label.
    pub async fn classify(
        &self,
        request: &str,
        labels: &LabelSet,
    ) -> Result<Classification, GenerationError> {
        let mut generation = GenerationRequest::new(directive(labels), request)
            .with_temperature(0.0)
            .with_max_tokens(16);
        if let Some(model) = &self.model {
            generation = generation.with_model(model);
        }

        let reply = tokio::time::timeout(self.timeout, self.generator.generate(generation))
            .await
            .map_err(|_| GenerationError::Timeout {
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        let classification = match match_label(&reply, labels, self.match_mode) {
            Some(label) => Classification {
                label: label.to_string(),
                matched: true,
            },
            None => {
                warn!(
                    "Classifier reply {reply:?} matched no label, using {}",
                    labels.fallback()
                );
                Classification {
                    label: labels.fallback().to_string(),
                    matched: false,
                }
            }
        };

        debug!("Classified as {}", classification.label);
        Ok(classification)
    }
}

/// Prompt instructing the model to answer with exactly one label.
pub fn directive(labels: &LabelSet) -> String {
    let categories: Vec<String> = labels
        .entries()
        .map(|e| {
            if e.description.is_empty() {
                format!("- {}", e.name)
            } else {
                format!("- {}: {}", e.name, e.description)
            }
        })
        .collect();

    format!(
        "Classify the request into exactly one category.\n\n\
         Categories:\n{}\n\n\
         Respond with only the category name, nothing else. \
         If no category fits, respond with {}.",
        categories.join("\n"),
        labels.fallback()
    )
}

/// Find the highest-priority label present in `reply`.
pub fn match_label<'a>(reply: &str, labels: &'a LabelSet, mode: MatchMode) -> Option<&'a str> {
    let reply = reply.trim().to_lowercase();
    if reply.is_empty() {
        return None;
    }

    match mode {
        MatchMode::Substring => labels.names().find(|label| reply.contains(label)),
        MatchMode::Token => {
            let reply_tokens = tokens(&reply);
            labels.names().find(|label| {
                let label_tokens = tokens(label);
                !label_tokens.is_empty()
                    && reply_tokens
                        .windows(label_tokens.len())
                        .any(|w| w == label_tokens.as_slice())
            })
        }
    }
}

/// Words of `text`; underscores stay inside words so `char_count` is one token.
fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_generation::mock::ScriptedGenerator;
    use pretty_assertions::assert_eq;

    fn memory_labels() -> LabelSet {
        LabelSet::new("retrieve", "look up a stored fact").with_label("store", "save a new fact")
    }

    #[test]
    fn test_padded_reply_still_matches() {
        let labels = memory_labels();
        for mode in [MatchMode::Token, MatchMode::Substring] {
            assert_eq!(match_label("Processing... store", &labels, mode), Some("store"));
            assert_eq!(
                match_label("I think this is a STORE action.", &labels, mode),
                Some("store")
            );
        }
    }

    #[test]
    fn test_priority_breaks_ties() {
        let labels = memory_labels();
        assert_eq!(
            match_label("retrieve or store", &labels, MatchMode::Token),
            Some("store")
        );
    }

    #[test]
    fn test_token_mode_ignores_labels_inside_words() {
        let labels = LabelSet::new("general", "").with_label("code", "");
        assert_eq!(match_label("barcode", &labels, MatchMode::Token), None);
        assert_eq!(
            match_label("barcode", &labels, MatchMode::Substring),
            Some("code")
        );
    }

    #[test]
    fn test_multi_word_and_underscore_labels() {
        let labels = LabelSet::new("create_new", "").with_label("char_count", "");
        assert_eq!(
            match_label("Use `char_count`.", &labels, MatchMode::Token),
            Some("char_count")
        );
        assert_eq!(match_label("char count", &labels, MatchMode::Token), None);
    }

    #[test]
    fn test_directive_lists_every_label() {
        let text = directive(&memory_labels());
        assert!(text.contains("- store: save a new fact"));
        assert!(text.contains("- retrieve: look up a stored fact"));
        assert!(text.contains("respond with retrieve"));
    }

    #[tokio::test]
    async fn test_unmatched_reply_falls_back() {
        let generator = ScriptedGenerator::new().with_response("banana");
        let classifier = Classifier::new(Arc::new(generator));

        let result = classifier.classify("hello", &memory_labels()).await.unwrap();
        assert_eq!(
            result,
            Classification {
                label: "retrieve".to_string(),
                matched: false
            }
        );
    }

    #[tokio::test]
    async fn test_single_generation_call_per_classification() {
        let generator = ScriptedGenerator::new().with_response("store");
        let classifier = Classifier::new(Arc::new(generator.clone()));

        let result = classifier
            .classify("My name is J", &memory_labels())
            .await
            .unwrap();
        assert_eq!(result.label, "store");
        assert!(result.matched);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(generator.requests()[0].prompt, "My name is J");
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let generator = ScriptedGenerator::new()
            .with_response("store")
            .with_delay(Duration::from_secs(5));
        let classifier =
            Classifier::new(Arc::new(generator)).with_timeout(Duration::from_millis(20));

        let err = classifier.classify("x", &memory_labels()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { ms: 20 }));
    }
}
