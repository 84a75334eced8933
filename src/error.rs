//! Error types for the contact SDK and the resource layer built on it.

use std::fmt;

use thiserror::Error;

use crate::client::ClientError;

/// A single structural rule broken by an options value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An identifier field is empty.
    #[error("invalid object identifier for {structure}.{field}")]
    InvalidIdentifier {
        /// The options type holding the field.
        structure: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// Fields that may not be set together are all set.
    #[error("{structure} fields: [{}] are incompatible and cannot be set at the same time", .fields.join(", "))]
    ConflictingFields {
        /// The options type holding the fields.
        structure: &'static str,
        /// The conflicting fields.
        fields: Vec<&'static str>,
    },

    /// Zero or several of a mutually exclusive group are set.
    #[error("exactly one of {structure} fields [{}] must be set", .fields.join(", "))]
    ExactlyOneOf {
        /// The options type holding the fields.
        structure: &'static str,
        /// The exclusive group.
        fields: Vec<&'static str>,
    },

    /// None of a group that needs at least one member is set.
    #[error("at least one of the fields [{}] of {structure} must be set", .fields.join(", "))]
    AtLeastOneOf {
        /// The options type holding the fields.
        structure: &'static str,
        /// The group.
        fields: Vec<&'static str>,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidIdentifier`].
    pub fn invalid_identifier(structure: &'static str, field: &'static str) -> Self {
        Self::InvalidIdentifier { structure, field }
    }

    /// Shorthand for [`ValidationError::ConflictingFields`].
    pub fn conflicting(structure: &'static str, fields: &[&'static str]) -> Self {
        Self::ConflictingFields {
            structure,
            fields: fields.to_vec(),
        }
    }

    /// Shorthand for [`ValidationError::ExactlyOneOf`].
    pub fn exactly_one_of(structure: &'static str, fields: &[&'static str]) -> Self {
        Self::ExactlyOneOf {
            structure,
            fields: fields.to_vec(),
        }
    }

    /// Shorthand for [`ValidationError::AtLeastOneOf`].
    pub fn at_least_one_of(structure: &'static str, fields: &[&'static str]) -> Self {
        Self::AtLeastOneOf {
            structure,
            fields: fields.to_vec(),
        }
    }
}

/// Every rule broken by one options value, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a broken rule.
    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    /// Whether no rule was broken.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of broken rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the broken rules.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Whether a specific rule was broken.
    pub fn contains(&self, err: &ValidationError) -> bool {
        self.0.contains(err)
    }

    /// `Ok(())` when empty, otherwise the joined errors.
    pub fn into_result(self) -> Result<(), SdkError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SdkError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors returned by the contact SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No options value was supplied.
    #[error("options cannot be nil")]
    NilOptions,

    /// The options value broke one or more structural rules.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The object is absent (or the caller cannot see it).
    #[error("object does not exist or not authorized: {0}")]
    ObjectNotFound(String),

    /// The transport failed to execute the statement.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A result row did not have the expected shape.
    #[error("failed to map result row: {0}")]
    RowMapping(#[from] serde_json::Error),
}

impl SdkError {
    /// Whether this error means the object is absent, including transport
    /// errors that signal it in their own way.
    pub fn is_object_not_found(&self) -> bool {
        match self {
            Self::ObjectNotFound(_) => true,
            Self::Client(err) => err.is_object_not_found(),
            _ => false,
        }
    }

    /// The validation failures, if this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errs) => Some(errs),
            _ => None,
        }
    }
}

/// Errors surfaced by the resource layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The SDK or its transport failed.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The statement did not finish within the configured timeout.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The state or configuration handed to the provider is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An update failed part-way, after the object had already changed
    /// identity. `state` is what the host should record in place of the prior
    /// state.
    #[error("Update partially applied: {source}")]
    PartialUpdate {
        /// State reflecting the steps that succeeded.
        state: Box<serde_json::Value>,
        /// The failure that stopped the update.
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Sdk(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::DeadlineExceeded(msg) => msg,
            Self::InvalidRequest(msg) => msg,
            Self::PartialUpdate { source, .. } => source.message(),
        }
    }

    /// State to record despite the error, when part of the operation stuck.
    pub fn partial_state(&self) -> Option<&serde_json::Value> {
        match self {
            Self::PartialUpdate { state, .. } => Some(state.as_ref()),
            _ => None,
        }
    }
}

impl From<SdkError> for ProviderError {
    fn from(err: SdkError) -> Self {
        if err.is_object_not_found() {
            return Self::NotFound(err.to_string());
        }
        match err {
            SdkError::Validation(errs) => Self::Validation(errs.to_string()),
            SdkError::RowMapping(err) => Self::Serialization(err),
            other => Self::Sdk(other.to_string()),
        }
    }
}
