//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// The `Display` output of each variant is the user-facing failure message
/// shown in a cell, so the wording is part of the public contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// The input does not match the grammar. Reported as a bare `syntax`;
    /// the offset (in chars) and reason are kept for diagnostics only.
    #[error("syntax")]
    Syntax { offset: usize, reason: String },

    /// Reference not present in the lookup snapshot
    #[error("missing reference '{0}'")]
    MissingReference(String),

    /// Reference resolved to a cell that itself failed
    #[error("error in referenced cell '{0}'")]
    ReferencedCell(String),

    /// Division with a zero denominator
    #[error("divide by 0")]
    DivideByZero,

    /// Operator or function applied to values of the wrong type
    #[error("invalid operation")]
    InvalidOperation,

    /// Function name not in the catalog
    #[error("unsupported function '{0}'")]
    UnsupportedFunction(String),

    /// Fewer arguments than the function's declared minimum
    #[error("not enough arguments passed to '{0}'")]
    NotEnoughArguments(String),

    /// More arguments than the function's declared maximum
    #[error("too many arguments passed to '{0}'")]
    TooManyArguments(String),

    /// A function name typed without an argument list
    #[error("function without arguments")]
    IncompleteFunction,
}

impl FormulaError {
    pub(crate) fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        FormulaError::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error came from the parser rather than evaluation
    pub fn is_syntax(&self) -> bool {
        matches!(self, FormulaError::Syntax { .. })
    }
}
