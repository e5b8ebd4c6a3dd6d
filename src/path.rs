//! Dotted attribute paths such as `e.department.name`.
//!
//! An [`AttributePath`] is the unit the compiler resolves against the schema:
//! the first token names an alias (or, when it does not, the path is taken
//! relative to the enclosing query's alias) and each following token names an
//! attribute of the previous token's type.
//!
//! # Examples
//!
//! ```
//! use mql_lang::AttributePath;
//!
//! let path: AttributePath = "e.department.name".parse().unwrap();
//! assert_eq!(path.len(), 3);
//! assert_eq!(path.first(), "e");
//! assert_eq!(path.to_string(), "e.department.name");
//!
//! let tail = path.slice(1..3).unwrap();
//! assert_eq!(tail.to_string(), "department.name");
//! ```

use std::{fmt, ops::Range, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::MqlError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z$_][A-Za-z$_0-9]*$").expect("identifier pattern compiles")
});

/// Returns true when `token` is a valid path identifier.
pub fn is_identifier(token: &str) -> bool {
    IDENTIFIER.is_match(token)
}

/// An immutable, validated sequence of identifier tokens.
///
/// Equality and ordering compare the token sequences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributePath {
    tokens: Vec<String>,
}

impl AttributePath {
    /// Splits `text` on `.` and validates every token.
    pub fn parse(text: &str) -> Result<Self, MqlError> {
        Self::from_tokens(text.split('.'))
    }

    /// Builds a path from already split tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, MqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(MqlError::syntax("An attribute path cannot be empty"));
        }

        if let Some(bad) = tokens.iter().find(|t| !is_identifier(t)) {
            return Err(MqlError::syntax(format!(
                "'{}' is not a valid identifier in attribute path '{}'",
                bad,
                tokens.join(".")
            )));
        }

        Ok(AttributePath { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false; a path holds at least one token.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn first(&self) -> &str {
        &self.tokens[0]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Returns a new path over a contiguous token subrange, or `None` when the
    /// range is empty or out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<AttributePath> {
        if range.start >= range.end || range.end > self.tokens.len() {
            return None;
        }

        Some(AttributePath {
            tokens: self.tokens[range].to_vec(),
        })
    }

    /// Returns a new path with `alias` in front of this one.
    pub fn prefixed(&self, alias: &str) -> Result<AttributePath, MqlError> {
        Self::from_tokens(std::iter::once(alias).chain(self.iter()))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join("."))
    }
}

impl FromStr for AttributePath {
    type Err = MqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributePath::parse(s)
    }
}
