use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The translation API answered, but not with a usable translation.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("snbt syntax error at {line}:{column}: {message}")]
    Snbt {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("unexpected file layout: {0}")]
    Layout(String),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("config error: {0}")]
    Config(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for CoreError {
    fn from(err: tempfile::PersistError) -> Self {
        CoreError::Io(err.error)
    }
}

impl CoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}
