use thiserror::Error;

use crate::uplc::data::CborError;

/// Failure to decode a Flat bit stream. Positions are bit offsets.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input at bit {bit}")]
    UnexpectedEnd { bit: usize },

    #[error("integer starting at bit {bit} has no terminating chunk")]
    UnterminatedInteger { bit: usize },

    #[error("invalid term tag {0}")]
    InvalidTermTag(u8),

    #[error("invalid builtin tag {0}")]
    InvalidBuiltinTag(u8),

    #[error("invalid type tag {0}")]
    InvalidTypeTag(u8),

    #[error("constant type nests deeper than {limit} levels")]
    TypeTooDeep { limit: usize },

    #[error("malformed data constant: {0}")]
    Data(#[from] CborError),

    #[error("invalid padding at bit {bit}")]
    InvalidPadding { bit: usize },

    #[error("string constant is not valid UTF-8")]
    InvalidUtf8,

    #[error("variable index 0 does not name a binder")]
    VariableIndexZero,

    #[error("natural number does not fit in 64 bits")]
    IndexOverflow,

    #[error("{remaining} bytes left after the program")]
    TrailingBytes { remaining: usize },
}
