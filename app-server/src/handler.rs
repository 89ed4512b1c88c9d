//! Conversation state for the app server.
//!
//! Each session keeps its own turn history and memory owner. The lock is
//! never held across an orchestrator call, so sessions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use conductor_core::{Domain, Orchestrator, Request, Result, ToolRequestOutcome};
use conductor_generation::Turn;
use conductor_tool_gen::ToolInfo;
use tokio::sync::Mutex;
use tracing::debug;

/// Turns kept per session; older turns are dropped first.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Routes conversation requests to the orchestrator.
pub struct ConversationHandler {
    orchestrator: Arc<Orchestrator>,
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
    max_history: usize,
}

impl ConversationHandler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: Mutex::new(HashMap::new()),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Answer `text` in a session and record both turns.
    pub async fn handle(&self, session_id: &str, text: &str) -> String {
        let history = self
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default();

        let request = Request::new(text)
            .with_history(history)
            .with_owner(session_id);
        let reply = self.orchestrator.handle_request(request).await;

        let mut sessions = self.sessions.lock().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn::user(text));
        turns.push(Turn::assistant(reply.as_str()));
        if turns.len() > self.max_history {
            let excess = turns.len() - self.max_history;
            turns.drain(..excess);
        }
        debug!("Session {session_id} holds {} turns", turns.len());

        reply
    }

    pub async fn request_tool(&self, description: &str) -> Result<ToolRequestOutcome> {
        self.orchestrator.request_tool(description).await
    }

    /// Toggle a provider and return the enabled labels.
    pub async fn set_provider(&self, label: &str, enabled: bool) -> Result<Vec<Domain>> {
        let domain: Domain = label.parse()?;
        self.orchestrator.set_enabled(domain, enabled).await?;
        Ok(self.orchestrator.enabled_labels())
    }

    pub async fn list_tools(&self) -> Vec<ToolInfo> {
        self.orchestrator.registry().list_info().await
    }

    /// Forget a session's history. Returns whether it existed.
    pub async fn reset(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    /// Number of turns recorded for a session.
    pub async fn history_len(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map_or(0, Vec::len)
    }
}
