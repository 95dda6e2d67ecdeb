//! Core error types for the Necromancy server

#[derive(thiserror::Error, Debug)]
pub enum NecroError {
    /// Fewer bytes available than a header or payload field requires
    #[error("Truncated frame: needed {needed} bytes, {available} available")]
    TruncatedFrame { needed: usize, available: usize },

    /// A null-terminated string ran past the end of the buffer
    #[error("Unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },

    /// Payload too large for the 16-bit size field
    #[error("Frame too large: {0} payload bytes")]
    FrameTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NecroError>;
