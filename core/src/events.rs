//! Trace events and sinks.
//!
//! Every dispatch cycle reports its progress to an injected `EventSink`.
//! The top-level caller usually wraps its sink in a `TerminalSink` so that
//! only the final outcome is rendered; nested provider calls receive a
//! `NoopSink` so their intermediate steps never reach the caller.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events emitted during a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A cycle began.
    CycleStarted { cycle_id: Uuid, text: String },

    /// The classifier chose a label.
    Classified {
        cycle_id: Uuid,
        label: String,
        /// False when the fallback was used because nothing matched.
        matched: bool,
    },

    /// The selected provider was invoked.
    ProviderStarted { cycle_id: Uuid, label: String },

    /// A provider called a tool.
    ToolInvoked { cycle_id: Uuid, tool: String },

    /// A tool call returned.
    ToolCompleted {
        cycle_id: Uuid,
        tool: String,
        success: bool,
    },

    /// A retrieval step returned.
    RetrievalCompleted { cycle_id: Uuid, results: usize },

    /// The cycle produced its final text.
    Completed {
        cycle_id: Uuid,
        label: String,
        text: String,
    },

    /// The cycle failed.
    Failed {
        cycle_id: Uuid,
        label: Option<String>,
        error: String,
    },
}

impl TraceEvent {
    /// The cycle this event belongs to.
    pub fn cycle_id(&self) -> Uuid {
        match self {
            Self::CycleStarted { cycle_id, .. }
            | Self::Classified { cycle_id, .. }
            | Self::ProviderStarted { cycle_id, .. }
            | Self::ToolInvoked { cycle_id, .. }
            | Self::ToolCompleted { cycle_id, .. }
            | Self::RetrievalCompleted { cycle_id, .. }
            | Self::Completed { cycle_id, .. }
            | Self::Failed { cycle_id, .. } => *cycle_id,
        }
    }

    /// Whether this event ends a cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Receives trace events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: TraceEvent) {}
}

/// Renders events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: TraceEvent) {
        let cycle_id = event.cycle_id();
        match &event {
            TraceEvent::Completed { label, .. } => info!("Cycle {cycle_id} completed by {label}"),
            TraceEvent::Failed { error, .. } => warn!("Cycle {cycle_id} failed: {error}"),
            other => debug!("{other:?}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// Forwards only terminal events to the wrapped sink.
pub struct TerminalSink<S> {
    inner: S,
}

impl<S: EventSink> TerminalSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: EventSink> EventSink for TerminalSink<S> {
    fn emit(&self, event: TraceEvent) {
        if event.is_terminal() {
            self.inner.emit(event);
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: TraceEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_terminal_sink_filters_intermediate_events() {
        let collected = CollectingSink::new();
        let sink = TerminalSink::new(collected.clone());
        let cycle_id = Uuid::new_v4();

        sink.emit(TraceEvent::CycleStarted {
            cycle_id,
            text: "hi".to_string(),
        });
        sink.emit(TraceEvent::ToolInvoked {
            cycle_id,
            tool: "calculator".to_string(),
        });
        sink.emit(TraceEvent::Completed {
            cycle_id,
            label: "math".to_string(),
            text: "4".to_string(),
        });

        let events = collected.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert_eq!(events[0].cycle_id(), cycle_id);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = TraceEvent::RetrievalCompleted {
            cycle_id: Uuid::nil(),
            results: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "retrieval_completed");
        assert_eq!(value["results"], 0);
    }
}
