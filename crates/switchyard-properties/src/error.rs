//! Errors raised while reading properties text.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from loading or parsing properties.
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// The properties file could not be read.
    #[error("failed to read properties from {path}: {source}")]
    Io {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A `\u` escape was truncated or named an invalid character.
    #[error("invalid unicode escape on line {line}: {message}")]
    InvalidEscape {
        /// One-based line on which the offending entry starts.
        line: usize,
        /// Description of the malformed escape.
        message: String,
    },
}
