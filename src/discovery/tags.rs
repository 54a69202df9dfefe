//! Tag filter expressions
//!
//! A filter is a list of expressions that must all match. Each expression is
//! a comma-separated list of terms of which at least one must match, and a
//! term prefixed with `~` matches when the tag is absent.

use std::fmt;
use std::str::FromStr;

use crate::error::RunnerError;
use crate::models::normalize_tag;

#[derive(Clone, Debug, PartialEq, Eq)]
struct TagTerm {
    tag: String,
    negated: bool,
}

impl TagTerm {
    fn parse(raw: &str, expression: &str) -> Result<Self, RunnerError> {
        let raw = raw.trim();
        let (negated, rest) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let tag = normalize_tag(rest);
        if tag.is_empty() {
            return Err(RunnerError::InvalidFilter(format!(
                "empty tag in expression '{expression}'"
            )));
        }

        Ok(Self { tag, negated })
    }

    fn matches(&self, tags: &[String]) -> bool {
        let present = tags.iter().any(|t| normalize_tag(t) == self.tag);
        present != self.negated
    }
}

impl fmt::Display for TagTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~")?;
        }
        write!(f, "@{}", self.tag)
    }
}

/// Parsed tag filter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagFilter {
    clauses: Vec<Vec<TagTerm>>,
}

impl TagFilter {
    /// Parse a list of expressions, e.g. `["~@ignore"]` or `["smoke,books", "~slow"]`
    pub fn parse<S: AsRef<str>>(expressions: &[S]) -> Result<Self, RunnerError> {
        let mut clauses = Vec::with_capacity(expressions.len());

        for expression in expressions {
            let expression = expression.as_ref();
            if expression.trim().is_empty() {
                return Err(RunnerError::InvalidFilter("empty expression".to_string()));
            }
            let terms = expression
                .split(',')
                .map(|raw| TagTerm::parse(raw, expression))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(terms);
        }

        Ok(Self { clauses })
    }

    pub fn matches(&self, tags: &[String]) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.iter().any(|term| term.matches(tags)))
    }
}

impl FromStr for TagFilter {
    type Err = RunnerError;

    /// Parse a single expression
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&[s])
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}
