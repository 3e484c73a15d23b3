use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Collaborator errors
    #[error("Authorization lookup failed: {0}")]
    Lookup(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a lookup error from anything printable.
    pub fn lookup(message: impl std::fmt::Display) -> Self {
        Self::Lookup(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
