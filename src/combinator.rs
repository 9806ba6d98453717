//! Grammar-agnostic parsing operators with PEG-style backtracking: on
//! failure the cursor is rewound to where the combinator started, so a
//! failed sub-match leaves no observable effect.

use serde::Serialize;

use crate::cursor::Cursor;

/// What a parsed query node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Single consumed character or punctuation literal. Internal to the
    /// combinator layer; the grammar filters these out of children.
    Char,
    /// Matched whitespace run, filtered out like punctuation.
    Whitespace,
    Int,
    Float,
    String,
    Boolean,
    Identifier,
    Wildcard,
    Arguments,
    Function,
    Expression,
}

/// A node of the parsed query. `raw` is always the exact source substring
/// the rule consumed, including delimiters and whitespace; `position` is
/// the byte offset where the match began.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: Kind,
    pub raw: String,
    pub position: usize,
    pub children: Vec<Node>,
}

impl Node {
    pub(crate) fn leaf(kind: Kind, raw: String, position: usize) -> Self {
        Self {
            kind,
            raw,
            position,
            children: Vec::new(),
        }
    }
}

/// A single rule can yield one node or a flat run of sibling nodes.
#[derive(Debug)]
pub enum Match {
    One(Node),
    Many(Vec<Node>),
}

impl Match {
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            Match::One(node) => vec![node],
            Match::Many(nodes) => nodes,
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Match::Many(nodes) if nodes.is_empty())
    }
}

pub type MatchResult = Option<Match>;

/// Rules are plain functions over the cursor, so combinators compose by
/// reference without any parser state of their own.
pub type Rule<'a> = &'a dyn Fn(&mut Cursor) -> MatchResult;

/// Consume one character if it is a member of `set`.
pub fn char_in(cursor: &mut Cursor, set: &str) -> MatchResult {
    let checkpoint = cursor.mark("char_in");
    match cursor.next() {
        Some(c) if set.contains(c) => Some(Match::One(Node::leaf(
            Kind::Char,
            c.to_string(),
            checkpoint.offset(),
        ))),
        _ => {
            cursor.reset(checkpoint);
            None
        }
    }
}

/// Consume exactly `text`, character by character. A partial match rewinds
/// fully.
pub fn literal(cursor: &mut Cursor, text: &str) -> MatchResult {
    let checkpoint = cursor.mark("literal");
    for expected in text.chars() {
        if cursor.next() != Some(expected) {
            cursor.reset(checkpoint);
            return None;
        }
    }
    Some(Match::One(Node::leaf(
        Kind::Char,
        text.to_string(),
        checkpoint.offset(),
    )))
}

/// Consume any single character; fails only at end of input.
pub fn any(cursor: &mut Cursor) -> MatchResult {
    let checkpoint = cursor.mark("any");
    match cursor.next() {
        Some(c) => Some(Match::One(Node::leaf(
            Kind::Char,
            c.to_string(),
            checkpoint.offset(),
        ))),
        None => {
            cursor.reset(checkpoint);
            None
        }
    }
}

/// Apply `rule` until it fails, collecting every match. Never fails.
pub fn zero_or_more(cursor: &mut Cursor, rule: Rule) -> Vec<Node> {
    let mut out = Vec::new();
    loop {
        let before = cursor.pos();
        match rule(cursor) {
            Some(Match::One(node)) => out.push(node),
            Some(Match::Many(nodes)) => {
                // a zero-width success would repeat forever
                if nodes.is_empty() && cursor.pos() == before {
                    break;
                }
                out.extend(nodes);
            }
            None => break,
        }
    }
    out
}

/// Like [`zero_or_more`] but fails, rewinding fully, on zero matches. The
/// first application must yield a single node.
pub fn one_or_more(cursor: &mut Cursor, rule: Rule) -> Option<Vec<Node>> {
    let checkpoint = cursor.mark("one_or_more");
    match rule(cursor) {
        Some(Match::One(first)) => {
            let mut out = vec![first];
            out.extend(zero_or_more(cursor, rule));
            Some(out)
        }
        _ => {
            cursor.reset(checkpoint);
            None
        }
    }
}

/// Apply each rule in order against the advancing cursor. If any rule
/// fails the whole sequence rewinds to its entry checkpoint. Sub-runs are
/// flattened into one ordered list.
pub fn sequence(cursor: &mut Cursor, rules: &[Rule]) -> Option<Vec<Node>> {
    let checkpoint = cursor.mark("sequence");
    let mut out = Vec::new();
    for rule in rules {
        match rule(cursor) {
            Some(Match::One(node)) => out.push(node),
            Some(Match::Many(nodes)) => out.extend(nodes),
            None => {
                cursor.reset(checkpoint);
                return None;
            }
        }
    }
    Some(out)
}

/// Try each rule from the same starting point, returning the first
/// non-failing, non-empty match. Ordering is significant: earlier
/// alternatives shadow later ones.
pub fn choice(cursor: &mut Cursor, rules: &[Rule]) -> MatchResult {
    let checkpoint = cursor.mark("choice");
    for rule in rules {
        match rule(cursor) {
            Some(found) if !found.is_empty() => return Some(found),
            _ => continue,
        }
    }
    cursor.reset(checkpoint);
    None
}

/// Apply `rule`, substituting an explicit empty match on failure. Never
/// fails.
pub fn optional(cursor: &mut Cursor, rule: Rule) -> Match {
    rule(cursor).unwrap_or(Match::Many(Vec::new()))
}
