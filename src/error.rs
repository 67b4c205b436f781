use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The client does not own the target app; reconciliation must not start.
    #[error("not entitled to app {app_id}")]
    NotEntitled { app_id: u32 },

    /// Subscription client could not be started or stopped answering.
    #[error("Subscription client error: {0}")]
    Client(String),
}
