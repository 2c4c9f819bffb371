//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ends in the middle of an entry.
    #[error("truncated entry at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Offset of the entry that could not be decoded.
        offset: usize,
        /// Bytes required to finish decoding.
        needed: usize,
        /// Bytes remaining in the buffer from `offset`.
        available: usize,
    },

    /// A hint buffer whose length is not a whole number of hint entries.
    #[error("hint buffer of {len} bytes is not a multiple of the hint entry size")]
    MisalignedHints {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// A value longer than the 32-bit length prefix can describe.
    #[error("value of {len} bytes does not fit a 32-bit length prefix")]
    ValueTooLarge {
        /// Length of the rejected value.
        len: usize,
    },
}

impl CodecError {
    /// Creates a truncation error.
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::Truncated {
            offset,
            needed,
            available,
        }
    }
}
