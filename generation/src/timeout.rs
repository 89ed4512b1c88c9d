//! Deadline enforcement for generation calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{GenerationError, Result};
use crate::provider::Generator;
use crate::request::GenerationRequest;

/// Wraps a generator so every call fails with [`GenerationError::Timeout`]
/// once the deadline passes. The inner future is dropped on timeout, which
/// cancels any in-flight HTTP request.
#[derive(Clone)]
pub struct TimedGenerator {
    inner: Arc<dyn Generator>,
    timeout: Duration,
}

impl TimedGenerator {
    /// Wrap `inner` with the given per-call deadline.
    pub fn new(inner: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The wrapped generator.
    pub fn inner(&self) -> &Arc<dyn Generator> {
        &self.inner
    }
}

#[async_trait]
impl Generator for TimedGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!("Generation via {} timed out after {ms}ms", self.inner.name());
                Err(GenerationError::Timeout { ms })
            }
        }
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedGenerator;

    #[tokio::test]
    async fn test_slow_generator_times_out() {
        let slow = ScriptedGenerator::new()
            .with_default_response("late")
            .with_delay(Duration::from_millis(200));
        let timed = TimedGenerator::new(Arc::new(slow), Duration::from_millis(20));

        let err = timed
            .generate(GenerationRequest::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { ms: 20 }));
    }

    #[tokio::test]
    async fn test_fast_generator_passes_through() {
        let fast = ScriptedGenerator::new().with_default_response("on time");
        let timed = TimedGenerator::new(Arc::new(fast), Duration::from_secs(1));

        let text = timed.generate(GenerationRequest::new("", "hi")).await.unwrap();
        assert_eq!(text, "on time");
    }
}
