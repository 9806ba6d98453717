//! Recursive evaluation of a parsed query against a JSON value.
//!
//! Identifier and wildcard segments are polymorphic over the shape of the
//! value they receive; unsupported shapes are explicit typed errors, never
//! silent coercions.

use std::fmt;

use itertools::Itertools;
use serde_json::Value;

use crate::combinator::{Kind, Node};
use crate::errors::{QueryError, Result};

/// Value shape names as they appear in type-mismatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Boolean,
            Value::Number(_) => Shape::Number,
            Value::String(_) => Shape::String,
            Value::Array(_) => Shape::Array,
            Value::Object(_) => Shape::Object,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Null => "null",
            Shape::Boolean => "boolean",
            Shape::Number => "number",
            Shape::String => "string",
            Shape::Array => "array",
            Shape::Object => "object",
        };
        f.write_str(name)
    }
}

fn type_mismatch(operation: &str, value: &Value) -> QueryError {
    QueryError::TypeMismatch {
        operation: operation.to_string(),
        shape: Shape::of(value),
    }
}

/// Evaluate `node` against `data`, dispatching on the node kind. Pure and
/// synchronous; the input value is never mutated.
pub fn evaluate(node: &Node, data: &Value) -> Result<Value> {
    match node.kind {
        Kind::String => Ok(Value::String(trim_quotes(&node.raw))),
        Kind::Float | Kind::Int => number_literal(&node.raw),
        Kind::Boolean => Ok(Value::Bool(node.raw == "true")),
        Kind::Identifier => identifier(node, data),
        Kind::Wildcard => wildcard(data),
        Kind::Function => function(node, data),
        Kind::Arguments => Ok(Value::Array(eval_arguments(node, data)?)),
        Kind::Expression => expression(node, data),
        Kind::Char | Kind::Whitespace => Err(QueryError::Unevaluable(node.kind)),
    }
}

/// Strip exactly one leading and one trailing delimiter quote, tolerating
/// raws shorter than two characters.
fn trim_quotes(raw: &str) -> String {
    let mut inner = raw;
    if let Some(rest) = inner.strip_prefix('\'') {
        inner = rest;
    }
    if let Some(rest) = inner.strip_suffix('\'') {
        inner = rest;
    }
    inner.to_string()
}

fn number_literal(raw: &str) -> Result<Value> {
    let n: f64 = raw.parse().map_err(|_| QueryError::Syntax)?;
    Ok(Value::from(n))
}

fn identifier(node: &Node, data: &Value) -> Result<Value> {
    match data {
        Value::Object(map) => Ok(map.get(&node.raw).cloned().unwrap_or(Value::Null)),
        // project the field across every object element; other element
        // shapes are dropped from consideration
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|obj| obj.get(&node.raw).cloned().unwrap_or(Value::Null))
                .collect(),
        )),
        other => Err(type_mismatch("retrieve identifier from", other)),
    }
}

/// Flatten exactly one level of array nesting.
fn wildcard(data: &Value) -> Result<Value> {
    let Value::Array(items) = data else {
        return Err(type_mismatch("iterate over", data));
    };
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

/// Fold the path segments left to right, threading the running value.
fn expression(node: &Node, data: &Value) -> Result<Value> {
    let mut current = data.clone();
    for segment in &node.children {
        current = evaluate(segment, &current)?;
    }
    Ok(current)
}

/// Evaluate each argument independently against the same input value.
/// Arguments cannot observe each other's results.
fn eval_arguments(node: &Node, data: &Value) -> Result<Vec<Value>> {
    node.children
        .iter()
        .map(|child| evaluate(child, data))
        .collect()
}

fn function(node: &Node, data: &Value) -> Result<Value> {
    if node.children.len() > 2 {
        return Err(QueryError::MalformedFunction(node.children.len()));
    }
    let name = node
        .children
        .first()
        .map(|n| n.raw.as_str())
        .ok_or(QueryError::MalformedFunction(0))?;
    match name {
        "add" => math(node, data, |a, b| a + b, "add"),
        "multiply" => math(node, data, |a, b| a * b, "multiply"),
        "join" => join(node, data),
        other => Err(QueryError::UnknownFunction(other.to_string())),
    }
}

fn math(
    node: &Node,
    data: &Value,
    op: impl Fn(f64, f64) -> f64 + Copy,
    name: &str,
) -> Result<Value> {
    match node.children.get(1) {
        Some(args) => math_against_arguments(args, data, op, name),
        None => math_against_value(data, op, name),
    }
}

/// No-argument mode: reduce the input value's numeric members with `op`,
/// seeded from 0. A plain number passes through unchanged.
fn math_against_value(data: &Value, op: impl Fn(f64, f64) -> f64, name: &str) -> Result<Value> {
    match data {
        Value::Number(_) => Ok(data.clone()),
        Value::Array(items) => Ok(reduce_numbers(items.iter(), op)),
        Value::Object(map) => Ok(reduce_numbers(map.values(), op)),
        other => Err(type_mismatch(name, other)),
    }
}

fn reduce_numbers<'v>(
    values: impl Iterator<Item = &'v Value>,
    op: impl Fn(f64, f64) -> f64,
) -> Value {
    let total = values
        .filter_map(Value::as_f64)
        .fold(0.0, |acc, n| op(acc, n));
    Value::from(total)
}

/// With-arguments mode: plain numbers reduce pairwise; once any argument
/// is an array, scalars are broadcast to the widest array length and the
/// operator is applied index-wise.
fn math_against_arguments(
    args: &Node,
    data: &Value,
    op: impl Fn(f64, f64) -> f64,
    name: &str,
) -> Result<Value> {
    let evaluated = eval_arguments(args, data)?;

    let mut max_len = 0;
    let mut all_numbers = true;
    for value in &evaluated {
        match value {
            Value::Number(_) => {}
            Value::Array(items) => {
                max_len = max_len.max(items.len());
                all_numbers = false;
            }
            _ => all_numbers = false,
        }
    }

    if all_numbers {
        let folded = evaluated
            .iter()
            .filter_map(Value::as_f64)
            .reduce(|a, b| op(a, b));
        return folded
            .map(Value::from)
            .ok_or_else(|| QueryError::MalformedFunction(0));
    }

    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(evaluated.len());
    for value in &evaluated {
        if let Some(n) = value.as_f64() {
            columns.push(vec![n; max_len]);
        } else if let Value::Array(items) = value {
            columns.push(items.iter().filter_map(Value::as_f64).collect());
        } else {
            return Err(type_mismatch(name, value));
        }
    }

    let width = columns.first().map(Vec::len).unwrap_or(0);
    if columns.iter().any(|col| col.len() != width) {
        return Err(QueryError::LengthMismatch(name.to_string()));
    }

    let out = (0..width)
        .map(|i| {
            columns
                .iter()
                .map(|col| col[i])
                .reduce(|a, b| op(a, b))
                .map(Value::from)
                .unwrap_or(Value::Null)
        })
        .collect();
    Ok(Value::Array(out))
}

/// Join the string elements of the input array; non-string elements are
/// excluded, not stringified. The separator defaults to a single space.
fn join(node: &Node, data: &Value) -> Result<Value> {
    let Value::Array(items) = data else {
        return Err(type_mismatch("join", data));
    };
    let separator = match node.children.get(1).and_then(|args| args.children.first()) {
        Some(arg) => match evaluate(arg, data)? {
            Value::String(s) => s,
            other => return Err(type_mismatch("join with separator of", &other)),
        },
        None => " ".to_string(),
    };
    Ok(Value::String(
        items.iter().filter_map(Value::as_str).join(&separator),
    ))
}
