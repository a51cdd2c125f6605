use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Missing host capability: {0}")]
    MissingCapability(&'static str),

    #[error("Board already exists: {0}")]
    DuplicateBoard(String),

    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Engine is not active")]
    EngineInactive,

    #[error("Config {path} could not be read ({reason}); reload it before saving")]
    ConfigUnreadable { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlRead(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Bad duration or bad regex, reported back to whoever configured it
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDuration { .. } | Error::InvalidPattern { .. }
        )
    }
}
