//! Error types for Saka3D

use thiserror::Error;

/// Main error type for Saka3D
#[derive(Error, Debug)]
pub enum Saka3dError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Scene and rig manifest errors
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read rig manifest: {0}")]
    ReadManifest(String),

    #[error("Failed to parse rig manifest: {0}")]
    ParseManifest(String),

    #[error("Mesh {mesh} declares {names} morph targets but {weights} weights")]
    WeightCount {
        mesh: String,
        names: usize,
        weights: usize,
    },
}

/// Chat completion errors
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("API error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode completion: {0}")]
    Decode(String),

    #[error("Completion contained no reply text")]
    EmptyReply,

    #[error("No API key configured (set chat.api_key or ${0})")]
    MissingApiKey(String),
}

impl ChatError {
    /// HTTP status code, if the failure came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChatError::Decode(e.to_string())
        } else {
            ChatError::Network(e.to_string())
        }
    }
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Result type alias for Saka3D operations
pub type Result<T> = std::result::Result<T, Saka3dError>;
