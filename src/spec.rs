//! Input specifier parser.
//!
//! Splits `<base>[:<decorator>]*` into a base-token sequence and a decorator
//! stack. Never fails hard: a segment that matches no recognized decorator
//! shape is kept as an opaque modifier, and a malformed entry is reported
//! through `tracing::warn!` by the categorizer that calls this parser, not
//! by the parser itself.

use crate::condition::{Condition, Op};
use crate::field::Field;

#[derive(Debug, Clone, PartialEq)]
pub enum BaseToken {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decorator {
    Throttle(u64),
    Debounce(u64),
    Now,
    Condition(Condition),
    Else,
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSpecifier {
    pub bases: Vec<BaseToken>,
    pub decorators: Vec<Decorator>,
}

impl ParsedSpecifier {
    /// Space-joined literal/variable chain, e.g. `pop cluck` or `tut $noise`.
    pub fn base_chain(&self) -> String {
        self.bases
            .iter()
            .map(|t| match t {
                BaseToken::Literal(s) => s.as_str(),
                BaseToken::Variable(name) => name.as_str(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_variables(&self) -> bool {
        self.bases.iter().any(|t| matches!(t, BaseToken::Variable(_)))
    }

    pub fn throttle(&self) -> Option<u64> {
        self.decorators.iter().find_map(|d| match d {
            Decorator::Throttle(ms) => Some(*ms),
            _ => None,
        })
    }

    pub fn debounce(&self) -> Option<u64> {
        self.decorators.iter().find_map(|d| match d {
            Decorator::Debounce(ms) => Some(*ms),
            _ => None,
        })
    }

    pub fn now(&self) -> bool {
        self.decorators.iter().any(|d| matches!(d, Decorator::Now))
    }

    pub fn is_else(&self) -> bool {
        self.decorators.iter().any(|d| matches!(d, Decorator::Else))
    }

    pub fn conditions(&self) -> Vec<Condition> {
        self.decorators
            .iter()
            .filter_map(|d| match d {
                Decorator::Condition(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

const DEFAULT_THROTTLE_MS: u64 = 100;
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Parses one specifier string. Any segment that fails every recognition
/// rule is kept verbatim as `Decorator::Opaque`, never rejected.
pub fn parse_specifier(spec: &str) -> ParsedSpecifier {
    let mut segments = spec.split(':');
    let base_segment = segments.next().unwrap_or("");

    let bases = base_segment
        .split_whitespace()
        .map(|tok| {
            if let Some(name) = tok.strip_prefix('$') {
                BaseToken::Variable(name.to_string())
            } else {
                BaseToken::Literal(tok.to_string())
            }
        })
        .collect();

    for tok in base_segment.split_whitespace() {
        if tok.starts_with('$') {
            continue;
        }
        if contains_relational_operator(tok) && parse_condition(tok).is_none() {
            tracing::warn!(
                token = tok,
                "base token looks like an unrecognized condition; did you mean to prefix it with a decorator colon?"
            );
        }
    }

    let decorators = segments.map(parse_decorator_segment).collect();

    ParsedSpecifier { bases, decorators }
}

fn contains_relational_operator(s: &str) -> bool {
    Op::ALL.iter().any(|op| s.contains(op.symbol()))
}

fn parse_decorator_segment(segment: &str) -> Decorator {
    if segment == "now" {
        return Decorator::Now;
    }
    if segment == "else" {
        return Decorator::Else;
    }
    if segment == "th" {
        return Decorator::Throttle(DEFAULT_THROTTLE_MS);
    }
    if let Some(n) = segment.strip_prefix("th_") {
        if let Ok(ms) = n.parse::<u64>() {
            return Decorator::Throttle(ms);
        }
    }
    if segment == "db" {
        return Decorator::Debounce(DEFAULT_DEBOUNCE_MS);
    }
    if let Some(n) = segment.strip_prefix("db_") {
        if let Ok(ms) = n.parse::<u64>() {
            return Decorator::Debounce(ms);
        }
    }
    if let Some(cond) = parse_condition(segment) {
        return Decorator::Condition(cond);
    }
    Decorator::Opaque(segment.to_string())
}

/// Parses `<field><op><num>`, e.g. `x<500` or `value==0`. Operators are
/// tried longest-first so `>=`/`<=` are never shadowed by `>`/`<`.
fn parse_condition(segment: &str) -> Option<Condition> {
    for op in Op::ALL {
        if let Some(idx) = segment.find(op.symbol()) {
            let (field_part, rest) = segment.split_at(idx);
            let num_part = &rest[op.symbol().len()..];
            let field = Field::from_name(field_part)?;
            let threshold: f64 = num_part.parse().ok()?;
            return Some(Condition {
                field,
                op,
                threshold,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_literal() {
        let p = parse_specifier("pop");
        assert_eq!(p.base_chain(), "pop");
        assert!(p.decorators.is_empty());
    }

    #[test]
    fn parses_throttle_with_duration() {
        let p = parse_specifier("cluck:th_100");
        assert_eq!(p.throttle(), Some(100));
    }

    #[test]
    fn parses_default_throttle() {
        let p = parse_specifier("cluck:th");
        assert_eq!(p.throttle(), Some(DEFAULT_THROTTLE_MS));
    }

    #[test]
    fn parses_condition_with_ge() {
        let p = parse_specifier("gaze:x>=500");
        assert_eq!(
            p.conditions(),
            vec![Condition {
                field: Field::X,
                op: Op::Ge,
                threshold: 500.0
            }]
        );
    }

    #[test]
    fn parses_else() {
        let p = parse_specifier("gaze:else");
        assert!(p.is_else());
    }

    #[test]
    fn parses_variable_token() {
        let p = parse_specifier("tut $noise");
        assert!(p.has_variables());
        assert_eq!(p.base_chain(), "tut noise");
    }

    #[test]
    fn parses_multi_token_base() {
        let p = parse_specifier("pop cluck");
        assert_eq!(p.base_chain(), "pop cluck");
    }

    #[test]
    fn unrecognized_segment_is_opaque() {
        let p = parse_specifier("pop:wiggle");
        assert_eq!(p.decorators, vec![Decorator::Opaque("wiggle".to_string())]);
    }
}
