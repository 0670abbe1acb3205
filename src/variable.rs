//! Variable-capturing pattern matcher.
//!
//! Non-placeholder tokens of a base chain match literally; each `$name`
//! token matches one whitespace-delimited word. Anchored at both ends.

use regex::Regex;

use crate::spec::BaseToken;

pub type Captures = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct VariablePattern {
    source: String,
    names: Vec<String>,
    regex: Regex,
}

impl VariablePattern {
    pub fn compile(bases: &[BaseToken]) -> VariablePattern {
        let mut names = Vec::new();
        let mut parts = Vec::with_capacity(bases.len());
        for tok in bases {
            match tok {
                BaseToken::Literal(lit) => parts.push(regex::escape(lit)),
                BaseToken::Variable(name) => {
                    names.push(name.clone());
                    parts.push(r"(\w+)".to_string());
                }
            }
        }
        let source = bases
            .iter()
            .map(|t| match t {
                BaseToken::Literal(s) => s.clone(),
                BaseToken::Variable(n) => format!("${n}"),
            })
            .collect::<Vec<_>>()
            .join(" ");
        let pattern = format!("^{}$", parts.join(r"\s+"));
        let regex = Regex::new(&pattern).expect("pattern built from escaped literals is valid");
        VariablePattern {
            source,
            names,
            regex,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder_count(&self) -> usize {
        self.names.len()
    }

    /// Returns the ordered placeholder-name to captured-substring map, or
    /// `None` if `chain` doesn't match.
    pub fn try_match(&self, chain: &str) -> Option<Captures> {
        let caps = self.regex.captures(chain)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), caps[i + 1].to_string()))
                .collect(),
        )
    }
}

/// First pattern in declaration order to match wins.
pub fn match_first<'a>(
    patterns: impl IntoIterator<Item = &'a (VariablePattern, usize)>,
    chain: &str,
) -> Option<(usize, Captures)> {
    for (pattern, idx) in patterns {
        if let Some(captures) = pattern.try_match(chain) {
            return Some((*idx, captures));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_specifier;

    #[test]
    fn matches_single_placeholder() {
        let p = parse_specifier("tut $noise");
        let pattern = VariablePattern::compile(&p.bases);
        let caps = pattern.try_match("tut hiss").unwrap();
        assert_eq!(caps, vec![("noise".to_string(), "hiss".to_string())]);
    }

    #[test]
    fn rejects_extra_tokens() {
        let p = parse_specifier("tut $noise");
        let pattern = VariablePattern::compile(&p.bases);
        assert!(pattern.try_match("tut hiss extra").is_none());
    }

    #[test]
    fn zero_placeholders_behaves_as_literal() {
        let p = parse_specifier("pop cluck");
        let pattern = VariablePattern::compile(&p.bases);
        assert_eq!(pattern.placeholder_count(), 0);
        assert!(pattern.try_match("pop cluck").is_some());
        assert!(pattern.try_match("pop").is_none());
    }
}
