//! Notification contact requests, options and result types.
//!
//! Requests are the user-facing builders. Each converts 1:1 into an options
//! value, which carries the structural rules ([`Statement::validate`]) and the
//! clause order ([`Statement::clauses`]) of one SQL statement:
//!
//! ```text
//! CREATE [OR REPLACE] NOTIFICATION CONTACT [IF NOT EXISTS] <name> EMAIL = '<email>' [COMMENT = '<comment>']
//! ALTER NOTIFICATION CONTACT [IF EXISTS] <name> { SET ... | UNSET ... | RENAME TO <new_name> }
//! DROP NOTIFICATION CONTACT [IF EXISTS] <name>
//! SHOW NOTIFICATION CONTACTS [LIKE '<pattern>']
//! DESCRIBE NOTIFICATION CONTACT <name>
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, ValidationError, ValidationErrors};
use crate::identifier::AccountObjectIdentifier;
use crate::sql::{Clause, Like, Statement};
use crate::validation::{any_value_set, every_value_set, exactly_one_value_set};

const OBJECT_KEYWORD: &str = "NOTIFICATION CONTACT";

// =========================================================================
// Requests
// =========================================================================

/// Request to create a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContactRequest {
    or_replace: bool,
    if_not_exists: bool,
    name: AccountObjectIdentifier,
    email: String,
    comment: Option<String>,
}

impl CreateContactRequest {
    /// Start a request for the given name and email.
    pub fn new(name: AccountObjectIdentifier, email: impl Into<String>) -> Self {
        Self {
            or_replace: false,
            if_not_exists: false,
            name,
            email: email.into(),
            comment: None,
        }
    }

    /// Replace an existing contact of the same name.
    pub fn with_or_replace(mut self, or_replace: bool) -> Self {
        self.or_replace = or_replace;
        self
    }

    /// Succeed without changes when the contact already exists.
    pub fn with_if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }

    /// Attach a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The contact this request targets.
    pub fn name(&self) -> &AccountObjectIdentifier {
        &self.name
    }
}

/// Request to modify a contact. Exactly one of set, unset or rename must be
/// chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterContactRequest {
    if_exists: bool,
    name: AccountObjectIdentifier,
    set: Option<ContactSet>,
    unset: Option<ContactUnset>,
    rename_to: Option<AccountObjectIdentifier>,
}

impl AlterContactRequest {
    /// Start a request for the given contact.
    pub fn new(name: AccountObjectIdentifier) -> Self {
        Self {
            if_exists: false,
            name,
            set: None,
            unset: None,
            rename_to: None,
        }
    }

    /// Succeed without changes when the contact does not exist.
    pub fn with_if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }

    /// Assign properties.
    pub fn with_set(mut self, set: ContactSet) -> Self {
        self.set = Some(set);
        self
    }

    /// Reset properties to their defaults.
    pub fn with_unset(mut self, unset: ContactUnset) -> Self {
        self.unset = Some(unset);
        self
    }

    /// Rename the contact.
    pub fn with_rename_to(mut self, new_name: AccountObjectIdentifier) -> Self {
        self.rename_to = Some(new_name);
        self
    }

    /// The contact this request targets.
    pub fn name(&self) -> &AccountObjectIdentifier {
        &self.name
    }
}

/// Properties assigned by `ALTER ... SET`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSet {
    /// New email address.
    pub email: Option<String>,
    /// New comment.
    pub comment: Option<String>,
}

impl ContactSet {
    /// An empty set; add at least one property before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Properties reset by `ALTER ... UNSET`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactUnset {
    /// Remove the comment.
    pub comment: bool,
}

impl ContactUnset {
    /// An empty unset; add at least one property before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the comment.
    pub fn with_comment(mut self, comment: bool) -> Self {
        self.comment = comment;
        self
    }
}

/// Request to remove a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropContactRequest {
    if_exists: bool,
    name: AccountObjectIdentifier,
}

impl DropContactRequest {
    /// Start a request for the given contact.
    pub fn new(name: AccountObjectIdentifier) -> Self {
        Self {
            if_exists: false,
            name,
        }
    }

    /// Succeed without changes when the contact does not exist.
    pub fn with_if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }

    /// The contact this request targets.
    pub fn name(&self) -> &AccountObjectIdentifier {
        &self.name
    }
}

/// Request to list contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowContactRequest {
    like: Option<Like>,
}

impl ShowContactRequest {
    /// List every visible contact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the listing to names matching a pattern.
    pub fn with_like(mut self, like: Like) -> Self {
        self.like = Some(like);
        self
    }
}

/// Request to list a contact's properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeContactRequest {
    name: AccountObjectIdentifier,
}

impl DescribeContactRequest {
    /// Start a request for the given contact.
    pub fn new(name: AccountObjectIdentifier) -> Self {
        Self { name }
    }

    /// The contact this request targets.
    pub fn name(&self) -> &AccountObjectIdentifier {
        &self.name
    }
}

// =========================================================================
// Options
// =========================================================================

/// Render-ready form of [`CreateContactRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContactOptions {
    /// `OR REPLACE`.
    pub or_replace: bool,
    /// `IF NOT EXISTS`.
    pub if_not_exists: bool,
    /// The contact.
    pub name: AccountObjectIdentifier,
    /// `EMAIL = '...'`.
    pub email: String,
    /// `COMMENT = '...'`.
    pub comment: Option<String>,
}

impl From<CreateContactRequest> for CreateContactOptions {
    fn from(r: CreateContactRequest) -> Self {
        Self {
            or_replace: r.or_replace,
            if_not_exists: r.if_not_exists,
            name: r.name,
            email: r.email,
            comment: r.comment,
        }
    }
}

impl Statement for CreateContactOptions {
    fn clauses(&self) -> Vec<Clause<'_>> {
        vec![
            Clause::Static("CREATE"),
            Clause::keyword("OR REPLACE", self.or_replace),
            Clause::Static(OBJECT_KEYWORD),
            Clause::keyword("IF NOT EXISTS", self.if_not_exists),
            Clause::name(&self.name),
            Clause::parameter("EMAIL", Some(self.email.as_str())),
            Clause::parameter("COMMENT", self.comment.as_deref()),
        ]
    }

    fn validate(&self) -> Result<(), SdkError> {
        let mut errs = ValidationErrors::new();
        if !self.name.is_valid() {
            errs.push(ValidationError::invalid_identifier("CreateContactOptions", "name"));
        }
        if every_value_set(&[self.if_not_exists, self.or_replace]) {
            errs.push(ValidationError::conflicting(
                "CreateContactOptions",
                &["IfNotExists", "OrReplace"],
            ));
        }
        errs.into_result()
    }
}

/// Render-ready form of [`AlterContactRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterContactOptions {
    /// `IF EXISTS`.
    pub if_exists: bool,
    /// The contact.
    pub name: AccountObjectIdentifier,
    /// `SET ...`.
    pub set: Option<ContactSet>,
    /// `UNSET ...`.
    pub unset: Option<ContactUnset>,
    /// `RENAME TO ...`.
    pub rename_to: Option<AccountObjectIdentifier>,
}

impl From<AlterContactRequest> for AlterContactOptions {
    fn from(r: AlterContactRequest) -> Self {
        Self {
            if_exists: r.if_exists,
            name: r.name,
            set: r.set,
            unset: r.unset,
            rename_to: r.rename_to,
        }
    }
}

impl Statement for AlterContactOptions {
    fn clauses(&self) -> Vec<Clause<'_>> {
        vec![
            Clause::Static("ALTER"),
            Clause::Static(OBJECT_KEYWORD),
            Clause::keyword("IF EXISTS", self.if_exists),
            Clause::name(&self.name),
            Clause::Nested {
                sql: "SET",
                clauses: self.set.as_ref().map(|set| {
                    vec![
                        Clause::parameter("EMAIL", set.email.as_deref()),
                        Clause::parameter("COMMENT", set.comment.as_deref()),
                    ]
                }),
                separator: " ",
            },
            Clause::Nested {
                sql: "UNSET",
                clauses: self
                    .unset
                    .map(|unset| vec![Clause::keyword("COMMENT", unset.comment)]),
                separator: ", ",
            },
            Clause::identifier("RENAME TO", self.rename_to.as_ref()),
        ]
    }

    fn validate(&self) -> Result<(), SdkError> {
        let mut errs = ValidationErrors::new();
        if !self.name.is_valid() {
            errs.push(ValidationError::invalid_identifier("AlterContactOptions", "name"));
        }
        if !exactly_one_value_set(&[
            self.set.is_some(),
            self.unset.is_some(),
            self.rename_to.is_some(),
        ]) {
            errs.push(ValidationError::exactly_one_of(
                "AlterContactOptions",
                &["Set", "Unset", "RenameTo"],
            ));
        }
        if let Some(rename_to) = &self.rename_to {
            if !rename_to.is_valid() {
                errs.push(ValidationError::invalid_identifier("AlterContactOptions", "RenameTo"));
            }
        }
        if let Some(set) = &self.set {
            if !any_value_set(&[set.email.is_some(), set.comment.is_some()]) {
                errs.push(ValidationError::at_least_one_of(
                    "AlterContactOptions.Set",
                    &["Email", "Comment"],
                ));
            }
        }
        if let Some(unset) = &self.unset {
            if !any_value_set(&[unset.comment]) {
                errs.push(ValidationError::at_least_one_of(
                    "AlterContactOptions.Unset",
                    &["Comment"],
                ));
            }
        }
        errs.into_result()
    }
}

/// Render-ready form of [`DropContactRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropContactOptions {
    /// `IF EXISTS`.
    pub if_exists: bool,
    /// The contact.
    pub name: AccountObjectIdentifier,
}

impl From<DropContactRequest> for DropContactOptions {
    fn from(r: DropContactRequest) -> Self {
        Self {
            if_exists: r.if_exists,
            name: r.name,
        }
    }
}

impl Statement for DropContactOptions {
    fn clauses(&self) -> Vec<Clause<'_>> {
        vec![
            Clause::Static("DROP"),
            Clause::Static(OBJECT_KEYWORD),
            Clause::keyword("IF EXISTS", self.if_exists),
            Clause::name(&self.name),
        ]
    }

    fn validate(&self) -> Result<(), SdkError> {
        let mut errs = ValidationErrors::new();
        if !self.name.is_valid() {
            errs.push(ValidationError::invalid_identifier("DropContactOptions", "name"));
        }
        errs.into_result()
    }
}

/// Render-ready form of [`ShowContactRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowContactOptions {
    /// `LIKE '...'`.
    pub like: Option<Like>,
}

impl From<ShowContactRequest> for ShowContactOptions {
    fn from(r: ShowContactRequest) -> Self {
        Self { like: r.like }
    }
}

impl Statement for ShowContactOptions {
    fn clauses(&self) -> Vec<Clause<'_>> {
        vec![
            Clause::Static("SHOW"),
            Clause::Static("NOTIFICATION CONTACTS"),
            Clause::Like(self.like.as_ref()),
        ]
    }

    fn validate(&self) -> Result<(), SdkError> {
        Ok(())
    }
}

/// Render-ready form of [`DescribeContactRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeContactOptions {
    /// The contact.
    pub name: AccountObjectIdentifier,
}

impl From<DescribeContactRequest> for DescribeContactOptions {
    fn from(r: DescribeContactRequest) -> Self {
        Self { name: r.name }
    }
}

impl Statement for DescribeContactOptions {
    fn clauses(&self) -> Vec<Clause<'_>> {
        vec![
            Clause::Static("DESCRIBE"),
            Clause::Static(OBJECT_KEYWORD),
            Clause::name(&self.name),
        ]
    }

    fn validate(&self) -> Result<(), SdkError> {
        let mut errs = ValidationErrors::new();
        if !self.name.is_valid() {
            errs.push(ValidationError::invalid_identifier("DescribeContactOptions", "name"));
        }
        errs.into_result()
    }
}

// =========================================================================
// Results
// =========================================================================

/// A contact as reported by `SHOW NOTIFICATION CONTACTS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Bare name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Comment, empty when none was set.
    pub comment: String,
    /// Owning role, empty when not reported.
    pub owner: String,
}

impl Contact {
    /// The contact's identifier.
    pub fn id(&self) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(self.name.clone())
    }
}

/// One `property`/`value` pair from `DESCRIBE NOTIFICATION CONTACT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProperty {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowContactRow {
    created_on: DateTime<Utc>,
    name: String,
    email: String,
    comment: Option<String>,
    owner: Option<String>,
}

impl From<ShowContactRow> for Contact {
    fn from(row: ShowContactRow) -> Self {
        Self {
            created_on: row.created_on,
            name: row.name,
            email: row.email,
            comment: row.comment.unwrap_or_default(),
            owner: row.owner.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeContactRow {
    property: String,
    value: Option<String>,
}

impl From<DescribeContactRow> for ContactProperty {
    fn from(row: DescribeContactRow) -> Self {
        Self {
            name: row.property,
            value: row.value.unwrap_or_default(),
        }
    }
}
