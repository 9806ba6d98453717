pub mod errors;

mod combinator;
mod cursor;
mod eval;
mod grammar;

use serde_json::Value;

pub use combinator::{Kind, Node};
pub use errors::{QueryError, Result};
pub use eval::Shape;

/// A parsed query, reusable across any number of documents.
pub struct Query {
    root: Node,
}

impl Query {
    pub fn parse(text: &str) -> Result<Self> {
        grammar::parse(text)
            .map(|root| Self { root })
            .ok_or(QueryError::Syntax)
    }

    /// Evaluate against an already-decoded document.
    pub fn eval(&self, document: &Value) -> Result<Value> {
        eval::evaluate(&self.root, document)
    }

    /// The annotated syntax tree behind this query.
    pub fn syntax(&self) -> &Node {
        &self.root
    }
}

/// Parse a query into its syntax tree. Fails with [`QueryError::Syntax`]
/// if the text is empty or does not begin with a valid path segment.
pub fn parse(text: &str) -> Result<Node> {
    Query::parse(text).map(|q| q.root)
}

/// Decode `document` as JSON, parse `query` and evaluate. Every failure
/// below this point is converted into a [`QueryError`]; nothing panics
/// through this boundary.
pub fn interpret(query: &str, document: &str) -> Result<Value> {
    let query = Query::parse(query)?;
    let document: Value = serde_json::from_str(document)?;
    query.eval(&document)
}
