//! Error types for the render kernels.

use thiserror::Error;

/// Errors that can occur before a kernel runs.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Two images passed to one kernel disagree in size.
    #[error("{what} is {found:?}, expected {expected:?}")]
    DimensionMismatch {
        /// Which buffer was wrong.
        what: &'static str,
        /// Width and height of the reference buffer.
        expected: (usize, usize),
        /// Width and height actually supplied.
        found: (usize, usize),
    },

    /// A flat buffer does not hold `width * height` elements.
    #[error("buffer holds {found} pixels, expected {expected}")]
    BufferLength {
        /// `width * height`.
        expected: usize,
        /// Elements supplied.
        found: usize,
    },

    /// Invalid render settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings could not be parsed.
    #[error("failed to parse settings: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
