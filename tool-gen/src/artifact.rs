//! Declarative tool artifacts.
//!
//! A `ToolArtifact` is what the drafting step produces and what the
//! artifact store persists: a name, a description, an input schema, and a
//! handler body the runtime knows how to execute.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, ToolError};
use crate::handler::{Args, ToolHandler, ToolOutput, arg_text};
use crate::script::ScriptHandler;
use crate::spec::{DataType, InputSchema, ToolSpec};

/// A synthesized tool in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolArtifact {
    /// Unique tool name.
    pub name: String,

    /// What the tool does.
    pub description: String,

    /// Arguments the tool accepts.
    #[serde(default)]
    pub input_schema: InputSchema,

    /// How the tool runs.
    pub handler: HandlerBody,
}

/// Executable part of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerBody {
    /// Substitute `{{param}}` placeholders with argument values.
    Template { template: String },

    /// Apply a built-in text operation to one string parameter.
    Transform { op: TextOp, input: String },

    /// Run a short script with an allowlisted interpreter.
    Script { interpreter: String, source: String },
}

/// Text operations available to transform handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOp {
    CharCount,
    WordCount,
    LineCount,
    Uppercase,
    Lowercase,
    Reverse,
}

impl TextOp {
    /// Apply the operation.
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::CharCount => text.chars().count().to_string(),
            Self::WordCount => text.split_whitespace().count().to_string(),
            Self::LineCount => text.lines().count().to_string(),
            Self::Uppercase => text.to_uppercase(),
            Self::Lowercase => text.to_lowercase(),
            Self::Reverse => text.chars().rev().collect(),
        }
    }
}

impl ToolArtifact {
    /// Parse drafted text, tolerating a surrounding code fence or prose.
    pub fn parse(raw: &str) -> Result<Self> {
        let start = raw.find('{');
        let end = raw.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &raw[start..=end],
            _ => {
                return Err(ToolError::InvalidDefinition(
                    "draft does not contain a JSON object".to_string(),
                ));
            }
        };

        serde_json::from_str(json).map_err(|e| {
            ToolError::InvalidDefinition(format!("draft is not a valid tool artifact: {e}"))
        })
    }

    /// The advertised contract of this artifact.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Structural validation: naming, schema, and handler fit.
    pub fn validate(&self) -> Result<()> {
        self.spec().validate()?;
        self.build_handler(Duration::from_secs(1))
            .check_schema(&self.input_schema)
            .map_err(|reason| ToolError::InvalidDefinition(format!("{}: {reason}", self.name)))
    }

    /// Hex-encoded SHA-256 of the canonical JSON form.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }

    /// Build the runtime handler for this artifact.
    pub fn build_handler(&self, script_timeout: Duration) -> Arc<dyn ToolHandler> {
        match &self.handler {
            HandlerBody::Template { template } => Arc::new(TemplateHandler {
                template: template.clone(),
            }),
            HandlerBody::Transform { op, input } => Arc::new(TransformHandler {
                op: *op,
                input: input.clone(),
            }),
            HandlerBody::Script {
                interpreter,
                source,
            } => Arc::new(ScriptHandler::new(interpreter, source, script_timeout)),
        }
    }
}

/// Renders a text template.
pub struct TemplateHandler {
    template: String,
}

impl TemplateHandler {
    /// Split the template into literal text and `{{name}}` placeholders.
    fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                break;
            };
            segments.push(Segment::Text(&rest[..open]));
            segments.push(Segment::Param(after[..close].trim()));
            rest = &after[close + 2..];
        }
        segments.push(Segment::Text(rest));
        segments
    }
}

enum Segment<'a> {
    Text(&'a str),
    Param(&'a str),
}

#[async_trait]
impl ToolHandler for TemplateHandler {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let rendered: String = self
            .segments()
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.to_string(),
                Segment::Param(name) => arg_text(args, name).unwrap_or_default(),
            })
            .collect();
        Ok(ToolOutput::success(rendered))
    }

    fn check_schema(&self, schema: &InputSchema) -> std::result::Result<(), String> {
        if self.template.trim().is_empty() {
            return Err("template is empty".to_string());
        }
        for segment in self.segments() {
            if let Segment::Param(name) = segment {
                if !schema.declares(name) {
                    return Err(format!("template uses undeclared parameter '{name}'"));
                }
            }
        }
        Ok(())
    }
}

/// Applies a `TextOp` to one argument.
pub struct TransformHandler {
    op: TextOp,
    input: String,
}

#[async_trait]
impl ToolHandler for TransformHandler {
    async fn call(&self, args: &Args) -> Result<ToolOutput> {
        let text = arg_text(args, &self.input).unwrap_or_default();
        Ok(ToolOutput::success(self.op.apply(&text)))
    }

    fn check_schema(&self, schema: &InputSchema) -> std::result::Result<(), String> {
        match schema.properties.get(&self.input) {
            Some(param) if param.data_type == DataType::String => Ok(()),
            Some(_) => Err(format!("transform input '{}' must be a string", self.input)),
            None => Err(format!("transform input '{}' is not declared", self.input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CHAR_COUNT_DRAFT: &str = r#"Here is the tool:
```json
{
  "name": "char_count",
  "description": "Count the characters in a string.",
  "input_schema": {
    "properties": {"text": {"type": "string", "description": "Text to measure"}},
    "required": ["text"]
  },
  "handler": {"kind": "transform", "op": "char_count", "input": "text"}
}
```"#;

    fn args(value: serde_json::Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_fenced_draft() {
        let artifact = ToolArtifact::parse(CHAR_COUNT_DRAFT).unwrap();
        assert_eq!(artifact.name, "char_count");
        assert_eq!(
            artifact.handler,
            HandlerBody::Transform {
                op: TextOp::CharCount,
                input: "text".to_string()
            }
        );
        artifact.validate().unwrap();
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = ToolArtifact::parse("I cannot build that tool.").unwrap_err();
        assert!(matches!(err, ToolError::InvalidDefinition(_)));
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let mut artifact = ToolArtifact::parse(CHAR_COUNT_DRAFT).unwrap();
        artifact.name = "Char Count".to_string();
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_handler_schema_mismatch() {
        let mut artifact = ToolArtifact::parse(CHAR_COUNT_DRAFT).unwrap();
        artifact.handler = HandlerBody::Transform {
            op: TextOp::CharCount,
            input: "body".to_string(),
        };
        assert!(artifact.validate().is_err());

        artifact.handler = HandlerBody::Template {
            template: "Hi {{ name }}".to_string(),
        };
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = ToolArtifact::parse(CHAR_COUNT_DRAFT).unwrap();
        let mut b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_eq!(a.digest().unwrap().len(), 64);

        b.description = "Count characters.".to_string();
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[tokio::test]
    async fn test_transform_counts_unicode_chars() {
        let artifact = ToolArtifact::parse(CHAR_COUNT_DRAFT).unwrap();
        let handler = artifact.build_handler(Duration::from_secs(1));

        let output = handler.call(&args(json!({"text": "héllo"}))).await.unwrap();
        assert_eq!(output, ToolOutput::success("5"));
    }

    #[tokio::test]
    async fn test_template_renders_arguments() {
        let handler = TemplateHandler {
            template: "Dear {{name}}, you owe {{ amount }}.".to_string(),
        };

        let output = handler
            .call(&args(json!({"name": "Ada", "amount": 12})))
            .await
            .unwrap();
        assert_eq!(output.content, "Dear Ada, you owe 12.");
    }

    #[test]
    fn test_text_ops() {
        assert_eq!(TextOp::WordCount.apply("one two  three"), "3");
        assert_eq!(TextOp::LineCount.apply("a\nb\nc"), "3");
        assert_eq!(TextOp::Reverse.apply("abc"), "cba");
        assert_eq!(TextOp::Uppercase.apply("abc"), "ABC");
    }
}
