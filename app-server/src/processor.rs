//! Maps wire requests to handler calls.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::handler::ConversationHandler;
use crate::message::{
    ClientRequest, DEFAULT_SESSION, ErrorCode, HandleParams, RequestToolParams, ResetParams,
    ServerResponse, SetProviderParams,
};

/// Turns request lines into response messages.
pub struct MessageProcessor {
    handler: ConversationHandler,
}

impl MessageProcessor {
    pub fn new(handler: ConversationHandler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &ConversationHandler {
        &self.handler
    }

    /// Process one line of input.
    pub async fn process_line(&self, line: &str) -> ServerResponse {
        match serde_json::from_str::<ClientRequest>(line) {
            Ok(request) => self.process(request).await,
            Err(e) => {
                warn!("Unparseable request line: {e}");
                ServerResponse::error("", ErrorCode::ParseError, format!("invalid request: {e}"))
            }
        }
    }

    /// Run one request.
    pub async fn process(&self, request: ClientRequest) -> ServerResponse {
        let ClientRequest { id, method, params } = request;
        debug!("Request {id}: {method}");

        match method.as_str() {
            "handle" => {
                let params: HandleParams = match parse_params(params) {
                    Ok(params) => params,
                    Err(message) => return ServerResponse::error(id, ErrorCode::InvalidParams, message),
                };
                let session = params.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
                let text = self.handler.handle(session, &params.text).await;
                ServerResponse::ok(id, json!({ "text": text }))
            }
            "request_tool" => {
                let params: RequestToolParams = match parse_params(params) {
                    Ok(params) => params,
                    Err(message) => return ServerResponse::error(id, ErrorCode::InvalidParams, message),
                };
                match self.handler.request_tool(&params.description).await {
                    Ok(outcome) => to_response(id, &outcome),
                    Err(e) => ServerResponse::error(id, ErrorCode::Failed, e.to_string()),
                }
            }
            "set_provider" => {
                let params: SetProviderParams = match parse_params(params) {
                    Ok(params) => params,
                    Err(message) => return ServerResponse::error(id, ErrorCode::InvalidParams, message),
                };
                match self.handler.set_provider(&params.label, params.enabled).await {
                    Ok(enabled) => to_response(id, &json!({ "enabled": enabled })),
                    Err(e) => ServerResponse::error(id, ErrorCode::InvalidParams, e.to_string()),
                }
            }
            "list_tools" => {
                let tools = self.handler.list_tools().await;
                to_response(id, &json!({ "tools": tools }))
            }
            "reset" => {
                let params: ResetParams = if params.is_null() {
                    ResetParams::default()
                } else {
                    match parse_params(params) {
                        Ok(params) => params,
                        Err(message) => {
                            return ServerResponse::error(id, ErrorCode::InvalidParams, message);
                        }
                    }
                };
                let session = params.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
                let cleared = self.handler.reset(session).await;
                ServerResponse::ok(id, json!({ "cleared": cleared }))
            }
            other => ServerResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("unknown method: {other}"),
            ),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("invalid params: {e}"))
}

fn to_response(id: String, result: &impl serde::Serialize) -> ServerResponse {
    match serde_json::to_value(result) {
        Ok(value) => ServerResponse::ok(id, value),
        Err(e) => ServerResponse::error(id, ErrorCode::Failed, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{Orchestrator, OrchestratorConfig};
    use conductor_generation::mock::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn processor(temp_dir: &TempDir, generator: ScriptedGenerator) -> MessageProcessor {
        let config = OrchestratorConfig::default().with_artifact_dir(temp_dir.path());
        let orchestrator = Orchestrator::builder(config, Arc::new(generator))
            .build()
            .await
            .unwrap();
        MessageProcessor::new(ConversationHandler::new(Arc::new(orchestrator)))
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::new()
            .with_response("math")
            .with_response("Two plus two.");
        let processor = processor(&temp_dir, generator).await;

        let response = processor
            .process_line(r#"{"id":"1","method":"handle","params":{"text":"What is 2 + 2?"}}"#)
            .await;

        assert_eq!(response.id, "1");
        assert_eq!(
            response.result,
            Some(json!({ "text": "**Result:** 4\n\nTwo plus two." }))
        );
        assert_eq!(processor.handler().history_len(DEFAULT_SESSION).await, 2);
    }

    #[tokio::test]
    async fn test_bad_input_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let processor = processor(&temp_dir, ScriptedGenerator::new()).await;

        let parse = processor.process_line("not json").await;
        assert_eq!(parse.error.map(|e| e.code), Some(ErrorCode::ParseError));

        let unknown = processor
            .process_line(r#"{"id":"2","method":"launch"}"#)
            .await;
        assert_eq!(unknown.error.map(|e| e.code), Some(ErrorCode::MethodNotFound));

        let missing = processor
            .process_line(r#"{"id":"3","method":"request_tool","params":{}}"#)
            .await;
        assert_eq!(missing.error.map(|e| e.code), Some(ErrorCode::InvalidParams));
    }

    #[tokio::test]
    async fn test_reset_and_set_provider() {
        let temp_dir = TempDir::new().unwrap();
        let processor = processor(&temp_dir, ScriptedGenerator::new()).await;

        let reset = processor
            .process_line(r#"{"id":"4","method":"reset"}"#)
            .await;
        assert_eq!(reset.result, Some(json!({ "cleared": false })));

        let toggled = processor
            .process_line(
                r#"{"id":"5","method":"set_provider","params":{"label":"memory","enabled":false}}"#,
            )
            .await;
        assert_eq!(
            toggled.result,
            Some(json!({ "enabled": ["math", "language", "code", "tools", "general"] }))
        );
    }
}
