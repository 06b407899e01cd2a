use thiserror::Error;

/// Errors from the external login flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Login flow failed: {0}")]
    Flow(String),

    #[error("Login did not yield a session token")]
    MissingToken,
}

/// Errors from session persistence
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access session store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the HTTP settings endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
