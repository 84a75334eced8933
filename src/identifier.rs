//! Account-scoped object identifiers.
//!
//! Notification contacts live directly under the account, so they are named by a
//! single-part identifier. The identifier keeps the bare name and decides on
//! quoting only when it is rendered into SQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of an object that is unique within the account.
///
/// Equality and hashing use the bare (unquoted) name, so `"MY_CONTACT"` and
/// `MY_CONTACT` parse to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountObjectIdentifier {
    name: String,
}

impl AccountObjectIdentifier {
    /// Create an identifier from a bare name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The bare name, without any quoting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An identifier is valid when its name is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// The SQL form of the identifier.
    ///
    /// Names made only of upper-case letters, digits, `_` and `$` (not starting
    /// with a digit or `$`) render bare; everything else is double-quoted with
    /// embedded quotes doubled.
    pub fn fully_qualified_name(&self) -> String {
        if needs_quoting(&self.name) {
            format!("\"{}\"", self.name.replace('"', "\"\""))
        } else {
            self.name.clone()
        }
    }

    /// Parse the SQL form produced by [`fully_qualified_name`](Self::fully_qualified_name).
    pub fn parse(input: &str) -> Result<Self, IdentifierParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdentifierParseError::Empty);
        }

        let Some(quoted) = input.strip_prefix('"') else {
            return Ok(Self::new(input));
        };
        let inner = quoted
            .strip_suffix('"')
            .ok_or_else(|| IdentifierParseError::UnterminatedQuote(input.to_string()))?;

        // A lone quote inside means the closing quote came early.
        if inner.replace("\"\"", "").contains('"') {
            return Err(IdentifierParseError::UnterminatedQuote(input.to_string()));
        }
        let name = inner.replace("\"\"", "\"");
        if name.is_empty() {
            return Err(IdentifierParseError::Empty);
        }
        Ok(Self::new(name))
    }
}

fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {},
        _ => return true,
    }
    !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

impl fmt::Display for AccountObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fully_qualified_name())
    }
}

impl FromStr for AccountObjectIdentifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for AccountObjectIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Errors produced when decoding an identifier from its SQL form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierParseError {
    /// The input held no name.
    #[error("identifier cannot be empty")]
    Empty,

    /// The input opened a quote that was never closed.
    #[error("unterminated quoted identifier: {0}")]
    UnterminatedQuote(String),
}
