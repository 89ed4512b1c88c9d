//! Error types for the tool registry and synthesis pipeline.

use thiserror::Error;

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur in the tool system.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool not found.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool already exists.
    #[error("tool already exists: {0}")]
    AlreadyExists(String),

    /// Invalid tool definition.
    #[error("invalid tool definition: {0}")]
    InvalidDefinition(String),

    /// Re-registration would change the input schema without confirmation.
    #[error("schema change for {name} requires explicit confirmation")]
    SchemaDrift { name: String },

    /// A required argument was not supplied.
    #[error("missing required parameter '{parameter}' for tool {tool}")]
    MissingParameter { tool: String, parameter: String },

    /// Invalid tool input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A drafted artifact failed structural validation.
    #[error("tool synthesis rejected: {reason}")]
    SynthesisRejected { reason: String },

    /// The drafting call failed.
    #[error("generation failed: {0}")]
    Generation(#[from] conductor_generation::GenerationError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Whether this error came from validating a registration or invocation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_)
                | Self::InvalidDefinition(_)
                | Self::SchemaDrift { .. }
                | Self::MissingParameter { .. }
                | Self::InvalidInput(_)
        )
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read artifact file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write artifact file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete artifact files.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),

    /// Stored content does not match its recorded digest.
    #[error("artifact {name} v{version} is corrupt: digest mismatch")]
    Corrupt { name: String, version: u32 },
}
