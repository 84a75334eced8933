//! Clause-list SQL rendering.
//!
//! Each options type describes its statement as an ordered list of [`Clause`]s.
//! Rendering walks the list, drops clauses that are absent, and joins the rest
//! with single spaces. The order of the list is the order of the SQL.
//!
//! # Example
//!
//! ```
//! use notification_contact_provider::identifier::AccountObjectIdentifier;
//! use notification_contact_provider::sql::{render, Clause};
//!
//! let id = AccountObjectIdentifier::new("OPS");
//! let sql = render(&[
//!     Clause::Static("DROP NOTIFICATION CONTACT"),
//!     Clause::keyword("IF EXISTS", true),
//!     Clause::name(&id),
//! ]);
//! assert_eq!(sql, "DROP NOTIFICATION CONTACT IF EXISTS OPS");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::identifier::AccountObjectIdentifier;

/// One fragment of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause<'a> {
    /// A keyword that is always emitted.
    Static(&'static str),

    /// A keyword emitted only when `present` is true.
    Keyword {
        /// The keyword text.
        sql: &'static str,
        /// Whether to emit it.
        present: bool,
    },

    /// `SQL = 'value'`, emitted only when a value is set.
    Parameter {
        /// The parameter name.
        sql: &'static str,
        /// The unquoted value.
        value: Option<&'a str>,
    },

    /// An identifier, optionally preceded by a keyword, emitted only when set.
    Identifier {
        /// Keyword written before the identifier.
        sql: Option<&'static str>,
        /// The identifier.
        value: Option<&'a AccountObjectIdentifier>,
    },

    /// A keyword followed by a group of inner clauses, emitted only when the
    /// group is present.
    Nested {
        /// The keyword introducing the group.
        sql: &'static str,
        /// The inner clauses, `None` when the group is absent.
        clauses: Option<Vec<Clause<'a>>>,
        /// Joins the rendered inner clauses.
        separator: &'static str,
    },

    /// `LIKE 'pattern'`, emitted only when set.
    Like(Option<&'a Like>),
}

impl<'a> Clause<'a> {
    /// Optional keyword.
    pub fn keyword(sql: &'static str, present: bool) -> Self {
        Self::Keyword { sql, present }
    }

    /// Optional single-quoted parameter.
    pub fn parameter(sql: &'static str, value: Option<&'a str>) -> Self {
        Self::Parameter { sql, value }
    }

    /// The object's own name.
    pub fn name(id: &'a AccountObjectIdentifier) -> Self {
        Self::Identifier {
            sql: None,
            value: Some(id),
        }
    }

    /// An optional identifier introduced by a keyword.
    pub fn identifier(sql: &'static str, value: Option<&'a AccountObjectIdentifier>) -> Self {
        Self::Identifier {
            sql: Some(sql),
            value,
        }
    }

    fn render(&self) -> Option<String> {
        match self {
            Self::Static(sql) => Some((*sql).to_string()),
            Self::Keyword { sql, present } => present.then(|| (*sql).to_string()),
            Self::Parameter { sql, value } => {
                value.map(|v| format!("{} = {}", sql, quote_string(v)))
            },
            Self::Identifier { sql, value } => value.map(|id| match sql {
                Some(sql) => format!("{} {}", sql, id.fully_qualified_name()),
                None => id.fully_qualified_name(),
            }),
            Self::Nested {
                sql,
                clauses,
                separator,
            } => clauses.as_ref().map(|inner| {
                let parts: Vec<String> = inner.iter().filter_map(Clause::render).collect();
                if parts.is_empty() {
                    (*sql).to_string()
                } else {
                    format!("{} {}", sql, parts.join(separator))
                }
            }),
            Self::Like(like) => like.map(|l| format!("LIKE {}", quote_string(&l.pattern))),
        }
    }
}

/// A `LIKE` filter. `%` and `_` are wildcards, so it may match more than the
/// literal pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    /// The pattern.
    pub pattern: String,
}

impl Like {
    /// Create a filter from a pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

/// Render clauses into a statement.
pub fn render(clauses: &[Clause<'_>]) -> String {
    clauses
        .iter()
        .filter_map(Clause::render)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap a value in single quotes, escaping backslashes and quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// A validated, render-ready description of one SQL operation.
pub trait Statement {
    /// The statement's clauses, in SQL order.
    fn clauses(&self) -> Vec<Clause<'_>>;

    /// Check structural rules. All violations are reported together.
    fn validate(&self) -> Result<(), SdkError>;

    /// Render the statement. Only meaningful after [`validate`](Self::validate)
    /// has succeeded.
    fn to_sql(&self) -> String {
        render(&self.clauses())
    }
}

/// Validate an options value and render it.
///
/// A missing value is [`SdkError::NilOptions`]; nothing is rendered unless
/// validation passes.
pub fn validate_and_render<S: Statement>(opts: Option<&S>) -> Result<String, SdkError> {
    let opts = opts.ok_or(SdkError::NilOptions)?;
    opts.validate()?;
    Ok(opts.to_sql())
}
