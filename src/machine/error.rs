use thiserror::Error;

use crate::uplc::DefaultFunction;

/// Why an evaluation failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("evaluation reached an error term")]
    ErrorTerm,

    #[error("variable {index} is not bound")]
    UnboundVariable { index: u64 },

    #[error("attempted to apply a non-function: {value}")]
    NonFunctionalApplication { value: String },

    #[error("attempted to force a non-delayed value: {value}")]
    NonPolymorphicInstantiation { value: String },

    #[error("builtin {fun} must be forced before it takes a term argument")]
    BuiltinTermArgumentExpected { fun: DefaultFunction },

    #[error("builtin {fun} cannot take argument {value}")]
    UnexpectedBuiltinArgument { fun: DefaultFunction, value: String },

    #[error("{fun}: division by zero")]
    DivisionByZero { fun: DefaultFunction },

    #[error("{fun}: index {index} out of range")]
    IndexOutOfRange { fun: DefaultFunction, index: String },

    #[error("decodeUtf8: byte string is not valid UTF-8")]
    InvalidUtf8,

    #[error("{fun}: empty list")]
    EmptyList { fun: DefaultFunction },

    #[error("builtin {0} is not supported by this machine")]
    UnsupportedBuiltin(DefaultFunction),

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
}
