//! The concrete query grammar, composed from the combinator library.
//!
//! Lexical rules (integers, floats, strings, identifiers) never skip
//! whitespace themselves; the compound rules thread optional whitespace
//! through explicitly, so `a . b` and `>add ( 1 , 2 )` parse while a
//! leading space still fails `Int`.

use tracing::trace;

use crate::combinator::{
    any, char_in, choice, literal, one_or_more, optional, sequence, zero_or_more, Kind, Match,
    MatchResult, Node,
};
use crate::cursor::{Checkpoint, Cursor};

const DIGITS: &str = "0123456789";
const STARTERS: &str = "abcdefghijklmnopqrstuvwxyzåäöABCDEFGHIJKLMNOPQRSTUVWXYZÅÄÖ_";
const IDENT_BODY: &str = "abcdefghijklmnopqrstuvwxyzåäöABCDEFGHIJKLMNOPQRSTUVWXYZÅÄÖ_0123456789";
const WHITESPACE: &str = " \t\r\n";

/// Parse a complete query. Empty input fails; trailing text after a valid
/// leading expression is silently ignored.
pub fn parse(text: &str) -> Option<Node> {
    if text.is_empty() {
        return None;
    }
    let mut cursor = Cursor::new(text);
    match expression(&mut cursor)? {
        Match::One(node) => Some(node),
        Match::Many(_) => None,
    }
}

/// Build a node whose raw text is everything consumed since `start`.
fn node(cursor: &Cursor, kind: Kind, start: Checkpoint, children: Vec<Node>) -> MatchResult {
    let raw = cursor.slice_from(start).to_string();
    trace!(kind = ?kind, raw = %raw, "matched");
    Some(Match::One(Node {
        kind,
        raw,
        position: start.offset(),
        children,
    }))
}

fn digit(c: &mut Cursor) -> MatchResult {
    char_in(c, DIGITS)
}

fn ws_char(c: &mut Cursor) -> MatchResult {
    char_in(c, WHITESPACE)
}

fn body_char(c: &mut Cursor) -> MatchResult {
    char_in(c, IDENT_BODY)
}

fn minus(c: &mut Cursor) -> MatchResult {
    literal(c, "-")
}

fn dot(c: &mut Cursor) -> MatchResult {
    literal(c, ".")
}

fn comma(c: &mut Cursor) -> MatchResult {
    literal(c, ",")
}

fn open_paren(c: &mut Cursor) -> MatchResult {
    literal(c, "(")
}

fn close_paren(c: &mut Cursor) -> MatchResult {
    literal(c, ")")
}

fn marker(c: &mut Cursor) -> MatchResult {
    literal(c, ">")
}

fn escaped_quote(c: &mut Cursor) -> MatchResult {
    literal(c, "\\'")
}

fn true_literal(c: &mut Cursor) -> MatchResult {
    literal(c, "true")
}

fn false_literal(c: &mut Cursor) -> MatchResult {
    literal(c, "false")
}

fn whitespace(c: &mut Cursor) -> MatchResult {
    let start = c.mark("whitespace");
    match one_or_more(c, &ws_char) {
        Some(_) => node(c, Kind::Whitespace, start, Vec::new()),
        None => None,
    }
}

fn opt_ws(c: &mut Cursor) -> MatchResult {
    Some(optional(c, &whitespace))
}

fn unsigned_int(c: &mut Cursor) -> MatchResult {
    let start = c.mark("unsigned_int");
    match one_or_more(c, &digit) {
        Some(_) => node(c, Kind::Int, start, Vec::new()),
        None => None,
    }
}

fn int(c: &mut Cursor) -> MatchResult {
    let start = c.mark("int");
    optional(c, &minus);
    match unsigned_int(c) {
        Some(_) => node(c, Kind::Int, start, Vec::new()),
        None => {
            c.reset(start);
            None
        }
    }
}

fn float(c: &mut Cursor) -> MatchResult {
    let start = c.mark("float");
    if int(c).is_none() {
        return None;
    }
    // the fractional part is only attached when a full ".digits" follows
    sequence(c, &[&dot, &unsigned_int]);
    node(c, Kind::Float, start, Vec::new())
}

/// A `'`-delimited string. `\'` inside is consumed as content, any other
/// character as-is. Unterminated strings fail and rewind fully.
fn string(c: &mut Cursor) -> MatchResult {
    let start = c.mark("string");
    if literal(c, "'").is_none() {
        return None;
    }
    loop {
        match choice(c, &[&escaped_quote, &any]) {
            Some(Match::One(n)) if n.raw == "'" => {
                return node(c, Kind::String, start, Vec::new())
            }
            Some(_) => {}
            None => {
                c.reset(start);
                return None;
            }
        }
    }
}

fn boolean(c: &mut Cursor) -> MatchResult {
    let start = c.mark("boolean");
    match choice(c, &[&true_literal, &false_literal]) {
        Some(_) => node(c, Kind::Boolean, start, Vec::new()),
        None => None,
    }
}

fn identifier(c: &mut Cursor) -> MatchResult {
    let start = c.mark("identifier");
    if char_in(c, STARTERS).is_none() {
        return None;
    }
    zero_or_more(c, &body_char);
    node(c, Kind::Identifier, start, Vec::new())
}

fn wildcard(c: &mut Cursor) -> MatchResult {
    let start = c.mark("wildcard");
    match literal(c, "*") {
        Some(_) => node(c, Kind::Wildcard, start, Vec::new()),
        None => None,
    }
}

/// Literal values usable as function arguments. Booleans and strings must
/// be tried before numeric parsing.
fn atom(c: &mut Cursor) -> MatchResult {
    choice(c, &[&boolean, &string, &float])
}

fn argument(c: &mut Cursor) -> MatchResult {
    choice(c, &[&atom, &expression])
}

fn argument_rest(c: &mut Cursor) -> MatchResult {
    sequence(c, &[&opt_ws, &comma, &opt_ws, &argument]).map(Match::Many)
}

fn more_arguments(c: &mut Cursor) -> MatchResult {
    Some(Match::Many(zero_or_more(c, &argument_rest)))
}

fn argument_list(c: &mut Cursor) -> MatchResult {
    sequence(c, &[&argument, &more_arguments, &opt_ws]).map(Match::Many)
}

fn opt_argument_list(c: &mut Cursor) -> MatchResult {
    Some(optional(c, &argument_list))
}

/// `( arg, arg, ... )`. Parentheses, commas and whitespace are consumed
/// into the raw text but discarded from children.
fn arguments(c: &mut Cursor) -> MatchResult {
    let start = c.mark("arguments");
    let matched = sequence(c, &[&open_paren, &opt_ws, &opt_argument_list, &close_paren])?;
    let children = matched
        .into_iter()
        .filter(|n| {
            matches!(
                n.kind,
                Kind::String | Kind::Float | Kind::Boolean | Kind::Expression
            )
        })
        .collect();
    node(c, Kind::Arguments, start, children)
}

fn opt_arguments(c: &mut Cursor) -> MatchResult {
    Some(optional(c, &arguments))
}

/// `>name` or `>name(args)`. An empty argument list is never attached, so
/// a function node has at most an identifier and a non-empty arguments
/// child.
fn function(c: &mut Cursor) -> MatchResult {
    let start = c.mark("function");
    let matched = sequence(c, &[&marker, &identifier, &opt_ws, &opt_arguments])?;
    let children = matched
        .into_iter()
        .filter(|n| {
            n.kind == Kind::Identifier || (n.kind == Kind::Arguments && !n.children.is_empty())
        })
        .collect();
    node(c, Kind::Function, start, children)
}

fn segment(c: &mut Cursor) -> MatchResult {
    choice(c, &[&identifier, &wildcard, &function])
}

fn segment_rest(c: &mut Cursor) -> MatchResult {
    sequence(c, &[&opt_ws, &dot, &opt_ws, &segment]).map(Match::Many)
}

fn more_segments(c: &mut Cursor) -> MatchResult {
    Some(Match::Many(zero_or_more(c, &segment_rest)))
}

/// A dotted path of segments. Children are the segments in order, with
/// the separating dots elided.
fn expression(c: &mut Cursor) -> MatchResult {
    let start = c.mark("expression");
    let matched = sequence(c, &[&opt_ws, &segment, &more_segments, &opt_ws])?;
    let children = matched
        .into_iter()
        .filter(|n| matches!(n.kind, Kind::Identifier | Kind::Wildcard | Kind::Function))
        .collect();
    node(c, Kind::Expression, start, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::Rule;
    use pretty_assertions::assert_eq;

    fn run(rule: Rule, text: &str) -> Option<Node> {
        let mut c = Cursor::new(text);
        match rule(&mut c)? {
            Match::One(node) => Some(node),
            Match::Many(_) => None,
        }
    }

    fn raw_of(rule: Rule, text: &str) -> String {
        run(rule, text).expect("rule should match").raw
    }

    fn kinds(node: &Node) -> Vec<Kind> {
        node.children.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn unsigned_int_takes_digits_only() {
        assert_eq!(raw_of(&unsigned_int, "234 ,true"), "234");
        assert!(run(&unsigned_int, "-234").is_none());
        assert!(run(&unsigned_int, " 234").is_none());
        assert!(run(&unsigned_int, "ssasd").is_none());
    }

    #[test]
    fn int_takes_optional_sign() {
        assert_eq!(raw_of(&int, "-2323789347893292374924"), "-2323789347893292374924");
        assert_eq!(raw_of(&int, "234"), "234");
        let mut c = Cursor::new("-x");
        assert!(int(&mut c).is_none());
        assert_eq!(c.pos(), 0, "lone sign must be rewound");
    }

    #[test]
    fn float_attaches_only_well_formed_decimals() {
        assert_eq!(raw_of(&float, "234.45"), "234.45");
        assert_eq!(raw_of(&float, "-234.23323 "), "-234.23323");
        assert_eq!(raw_of(&float, "234.-23323"), "234");
        assert_eq!(raw_of(&float, "234."), "234");
        assert!(run(&float, " 234").is_none());
    }

    #[test]
    fn string_handles_escaped_quotes() {
        assert_eq!(raw_of(&string, "'hello'"), "'hello'");
        assert_eq!(raw_of(&string, r"'hell\'o wo'rld"), r"'hell\'o wo'");
        assert!(run(&string, "'hello").is_none(), "unterminated");
        assert!(run(&string, "h'ello'").is_none());
    }

    #[test]
    fn identifier_accepts_extended_letters() {
        assert_eq!(raw_of(&identifier, "_false"), "_false");
        assert_eq!(raw_of(&identifier, "påminnelse7.x"), "påminnelse7");
        assert_eq!(raw_of(&identifier, "true"), "true");
        assert!(run(&identifier, "12312yolo").is_none());
    }

    #[test]
    fn atom_prefers_keywords_and_strings_over_numbers() {
        assert_eq!(run(&atom, "true").expect("bool").kind, Kind::Boolean);
        assert_eq!(run(&atom, "'x'").expect("string").kind, Kind::String);
        assert_eq!(run(&atom, "123").expect("number").kind, Kind::Float);
    }

    #[test]
    fn arguments_discard_punctuation_children() {
        let args = run(&arguments, "(arg1,'  ')").expect("arguments");
        assert_eq!(args.raw, "(arg1,'  ')");
        assert_eq!(kinds(&args), vec![Kind::Expression, Kind::String]);
        assert_eq!(args.children[1].position, 6);

        let empty = run(&arguments, "()").expect("arguments");
        assert!(empty.children.is_empty());
    }

    #[test]
    fn function_drops_empty_argument_list() {
        let f = run(&function, ">s()").expect("function");
        assert_eq!(f.raw, ">s()");
        assert_eq!(kinds(&f), vec![Kind::Identifier]);

        let f = run(&function, ">s(arg1)").expect("function");
        assert_eq!(kinds(&f), vec![Kind::Identifier, Kind::Arguments]);
    }

    #[test]
    fn function_ignores_what_follows() {
        let f = run(&function, ">s,trueum").expect("function");
        assert_eq!(f.raw, ">s");
        assert!(run(&function, "234sdfsdfss").is_none());
    }

    #[test]
    fn parse_rejects_empty_and_invalid_starts() {
        assert!(parse("").is_none());
        assert!(parse("12121").is_none());
        assert!(parse("\"d,trueassds").is_none());
    }

    #[test]
    fn parse_single_identifier() {
        let expr = parse("propertyName").expect("expression");
        assert_eq!(expr.kind, Kind::Expression);
        assert_eq!(expr.raw, "propertyName");
        assert_eq!(kinds(&expr), vec![Kind::Identifier]);
        assert_eq!(expr.children[0].raw, "propertyName");
    }

    #[test]
    fn parse_dotted_path_elides_separators() {
        let expr = parse("profile.location.lat").expect("expression");
        let raws: Vec<&str> = expr.children.iter().map(|n| n.raw.as_str()).collect();
        assert_eq!(raws, ["profile", "location", "lat"]);
        assert_eq!(expr.children[1].position, 8);
        assert_eq!(expr.children[2].position, 17);
    }

    #[test]
    fn parse_wildcard_segments() {
        let expr = parse("profile.*.location.lat.*").expect("expression");
        assert_eq!(
            kinds(&expr),
            vec![
                Kind::Identifier,
                Kind::Wildcard,
                Kind::Identifier,
                Kind::Identifier,
                Kind::Wildcard
            ]
        );
    }

    #[test]
    fn parse_function_call_with_arguments() {
        let expr = parse("roles.>join(' ')").expect("expression");
        let func = &expr.children[1];
        assert_eq!(func.kind, Kind::Function);
        assert_eq!(func.raw, ">join(' ')");
        assert_eq!(func.children[0].raw, "join");
        let args = &func.children[1];
        assert_eq!(args.kind, Kind::Arguments);
        assert_eq!(args.children[0].raw, "' '");
    }

    #[test]
    fn parse_multi_argument_function_chain() {
        let expr =
            parse("Account.Order.Product.>multiply(Price,Quantity).>add").expect("expression");
        assert_eq!(expr.children.len(), 5);
        let multiply = &expr.children[3];
        assert_eq!(multiply.raw, ">multiply(Price,Quantity)");
        let args = &multiply.children[1];
        assert_eq!(kinds(args), vec![Kind::Expression, Kind::Expression]);
        assert_eq!(args.children[0].children[0].raw, "Price");
        assert_eq!(args.children[1].children[0].raw, "Quantity");
        assert_eq!(expr.children[4].raw, ">add");
    }

    #[test]
    fn parse_string_argument_containing_comma() {
        let expr = parse("a.>concat(Price,',')").expect("expression");
        let args = &expr.children[1].children[1];
        assert_eq!(kinds(args), vec![Kind::Expression, Kind::String]);
        assert_eq!(args.children[1].raw, "','");
    }

    #[test]
    fn parse_tolerates_whitespace_between_tokens() {
        let text = "  Account   .       Order  .*  .\n  Product . * . >multiply     (   Price\n      , Quantity   )\n  .\n  >add  ";
        let expr = parse(text).expect("expression");
        assert_eq!(expr.raw, text, "raw keeps the matched whitespace");
        let raws: Vec<&str> = expr.children.iter().map(|n| n.raw.as_str()).collect();
        assert_eq!(raws[0], "Account");
        assert_eq!(raws[1], "Order");
        assert_eq!(raws[2], "*");
        assert_eq!(raws[3], "Product");
        assert_eq!(raws[4], "*");
        assert!(raws[5].starts_with(">multiply"));
        assert_eq!(raws[6], ">add  ");
        let args = &expr.children[5].children[1];
        assert_eq!(args.children[0].children[0].raw, "Price");
        assert_eq!(args.children[1].children[0].raw, "Quantity");
    }

    #[test]
    fn lexical_rules_stay_whitespace_intolerant() {
        assert!(run(&int, " 1").is_none());
        assert!(run(&identifier, " a").is_none());
        assert!(run(&string, " 'x'").is_none());
    }

    #[test]
    fn parse_leading_whitespace_before_first_segment() {
        let expr = parse("  dsadsa").expect("expression");
        assert_eq!(expr.raw, "  dsadsa");
        assert_eq!(expr.position, 0);
        assert_eq!(expr.children[0].raw, "dsadsa");
        assert_eq!(expr.children[0].position, 2);
    }

    #[test]
    fn parse_ignores_trailing_unconsumed_input() {
        let expr = parse("name]]junk").expect("expression");
        assert_eq!(expr.raw, "name");
    }
}
