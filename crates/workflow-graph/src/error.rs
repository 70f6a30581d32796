//! Error types for the workflow graph subsystem

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while editing, saving or loading a workflow graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// The node type catalog could not be located (fatal at startup)
    #[error("Node type catalog not found at {0:?}")]
    CatalogMissing(PathBuf),

    /// The node type catalog exists but could not be parsed
    #[error("Invalid node type catalog: {0}")]
    CatalogParse(String),

    /// A node type key that the registry does not know
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// An explicit node id supplied during replay is already taken
    #[error("Node id '{0}' is already in use")]
    Conflict(String),

    /// The tracker already holds a node with this id
    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    /// A document failed top-level validation
    #[error("Malformed workflow document: {0}")]
    MalformedDocument(String),

    /// A document link names a node or port that does not exist
    #[error("Link '{link_id}' references missing attribute '{attribute}'")]
    DanglingLinkReference { link_id: String, attribute: String },

    /// Workflow store I/O or encoding failure
    #[error("Workflow store error: {0}")]
    StoreIo(String),

    /// A workflow name that cannot be used as a document identity
    #[error("Invalid workflow name: {0}")]
    InvalidWorkflowName(String),

    /// The rendering surface refused a command
    #[error("Rendering surface error: {0}")]
    Surface(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Create a malformed document error with a message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a rendering surface error with a message
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }
}
