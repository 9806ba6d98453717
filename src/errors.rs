use thiserror::Error;

use crate::eval::Shape;

/// Everything that can go wrong between query text and result value.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query text did not match the grammar at the top level. The parser
    /// backtracks fully on failure, so there is no position to report.
    #[error("Syntax error")]
    Syntax,

    /// An operation was applied to a value shape it does not support.
    #[error("cannot {operation} {shape}")]
    TypeMismatch { operation: String, shape: Shape },

    /// Broadcast arithmetic over argument arrays of unequal length.
    #[error("attempting to {0} arrays of different length")]
    LengthMismatch(String),

    /// A function node carried more than its name and argument list. The
    /// grammar never produces this; it guards the evaluator's assumptions.
    #[error("malformed function node: {0} children")]
    MalformedFunction(usize),

    #[error("function not implemented: {0}")]
    UnknownFunction(String),

    /// A node kind internal to the parser reached the evaluator. The
    /// grammar filters these out before they can surface.
    #[error("no evaluation rule for {0:?} nodes")]
    Unevaluable(crate::combinator::Kind),

    /// The input document was not well-formed JSON.
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;
