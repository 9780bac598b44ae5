use crate::io::LoadError;

/// Main error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    /// Surface sampling could not be performed, e.g. a mesh without area.
    #[error("Sampling error: {0}")]
    Sampling(String),
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    pub fn sampling<T: ToString>(msg: T) -> Self {
        Error::Sampling(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
