use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Credential store error: {0}")]
    Credential(String),
    #[error("Sync configuration incomplete: {0}")]
    SyncConfiguration(String),
    #[error("Remote file not found: {0}")]
    RemoteNotFound(String),
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Sync already in progress")]
    SyncInProgress,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
