use std::io;

/// Errors raised while reading geometry or array files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parser error: {0}")]
    ParseError(String),
    /// The file is well formed but uses a feature we do not read.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}
