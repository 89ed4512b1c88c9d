//! Scripted generator for tests and offline runs.
//!
//! Responses are served from a queue first, then from an optional responder
//! closure, then from a default response. Every request is recorded so tests
//! can assert on the directives a component sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GenerationError, Result};
use crate::provider::Generator;
use crate::request::GenerationRequest;

type Responder = Arc<dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync>;

enum Scripted {
    Text(String),
    Error(String),
}

/// A generator that replays scripted answers.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    responder: Option<Responder>,
    default_response: Option<String>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    /// Create an empty scripted generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push_response(text);
        self
    }

    /// Queue an API failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.lock_queue().push_back(Scripted::Error(message.into()));
        self
    }

    /// Answer with a closure once the queue is drained.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Answer with a fixed text once the queue is drained and no responder is set.
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_response = Some(text.into());
        self
    }

    /// Sleep before answering every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response on a shared handle.
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_queue().push_back(Scripted::Text(text.into()));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.lock_queue().pop_front();
        match next {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Error(message)) => Err(GenerationError::ApiRequest(message)),
            None => {
                if let Some(responder) = &self.responder {
                    responder(&request)
                } else if let Some(text) = &self.default_response {
                    Ok(text.clone())
                } else {
                    Err(GenerationError::InvalidResponse(
                        "no scripted response left".to_string(),
                    ))
                }
            }
        }
    }
}
