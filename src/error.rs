//! Error types shared by every clock family.

use thiserror::Error;

/// A specialized `Result` type for clock operations.
pub type Result<T> = std::result::Result<T, ClockError>;

/// Errors raised while decoding clocks or validating their identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The input ended before a complete clock (or a complete trailing entry) could be read.
    #[error("truncated input: needed {expected} bytes, found {actual}")]
    Truncated {
        /// Number of bytes the layout requires at this point.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },

    /// The input has the right shape but its contents cannot be interpreted.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// An identifier was decoded from the wrong number of bytes.
    #[error("identifier must be {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The identifier's required size.
        expected: usize,
        /// The size of the rejected input.
        actual: usize,
    },

    /// Two raw identifiers of different lengths were compared.
    #[error("cannot compare identifiers of {lhs} and {rhs} bytes")]
    LengthMismatch {
        /// Length of the left-hand identifier.
        lhs: usize,
        /// Length of the right-hand identifier.
        rhs: usize,
    },

    /// An identifier's text form contains a reserved delimiter.
    #[error("identifier {text:?} contains reserved delimiter {delimiter:?}")]
    InvalidIdentifier {
        /// The offending identifier text.
        text: String,
        /// The reserved delimiter it contains.
        delimiter: char,
    },

    /// A vector clock names the same identifier more than once.
    #[error("identifier {0} appears more than once")]
    DuplicateIdentifier(String),
}

impl ClockError {
    /// Returns true for errors caused by untrusted input rather than misuse of the API.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::Malformed(_)
                | Self::SizeMismatch { .. }
                | Self::DuplicateIdentifier(_)
        )
    }
}
