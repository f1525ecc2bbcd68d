use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    Sqlite(rusqlite::Error),
    Json(serde_json::Error),
    /// The blocking task running a query panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Sqlite(e) => write!(f, "dependency cache sqlite error: {e}"),
            CacheError::Json(e) => write!(f, "dependency cache json error: {e}"),
            CacheError::Task(e) => write!(f, "dependency cache task error: {e}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Sqlite(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Json(e)
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(e: tokio::task::JoinError) -> Self {
        CacheError::Task(e)
    }
}
