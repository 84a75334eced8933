//! Notification Contact Provider
//!
//! Manages *notification contacts*, account-level objects holding an email
//! address alerts are sent to, on a SQL-driven data platform.
//!
//! # Overview
//!
//! The crate is layered:
//!
//! - **Identifiers**: [`AccountObjectIdentifier`] and its quoting rules
//! - **Statements**: typed options that validate themselves and render one
//!   SQL statement each ([`contacts`], built on [`sql`])
//! - **Service**: the [`Contacts`] trait and [`ContactsService`], which run
//!   statements through a [`Client`] and map rows back to [`Contact`]s
//! - **Provider**: [`ContactProvider`], a [`ProviderService`] exposing the
//!   `notification_contact` resource with plan/create/read/update/delete
//!   and import
//! - **Schema and validation**: attribute schemas and diagnostics
//! - **Logging**: `tracing` integration
//!
//! The transport is not part of this crate. Implement [`Client`] over
//! whatever driver holds the connection.
//!
//! # Quick Start
//!
//! ```
//! use notification_contact_provider::{
//!     AccountObjectIdentifier, Contacts, ContactsService, CreateContactRequest,
//!     testing::ScriptedClient,
//! };
//!
//! # tokio_test::block_on(async {
//! let client = ScriptedClient::new();
//! let contacts = ContactsService::new(client.clone());
//!
//! let request = CreateContactRequest::new(AccountObjectIdentifier::new("ON_CALL"), "oncall@example.com")
//!     .with_if_not_exists(true)
//!     .with_comment("primary pager");
//! contacts.create(request).await.unwrap();
//!
//! assert_eq!(
//!     client.statements(),
//!     vec!["CREATE NOTIFICATION CONTACT IF NOT EXISTS ON_CALL EMAIL = 'oncall@example.com' COMMENT = 'primary pager'"]
//! );
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod contacts;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod service;
pub mod sql;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{Client, ClientError, Row};
pub use config::ProviderConfig;
pub use contacts::{
    AlterContactRequest, Contact, ContactProperty, ContactSet, ContactUnset,
    CreateContactRequest, DescribeContactRequest, DropContactRequest, ShowContactRequest,
};
pub use error::{ProviderError, SdkError, ValidationError, ValidationErrors};
pub use identifier::AccountObjectIdentifier;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{ContactProvider, ProviderService, CONTACT_RESOURCE_TYPE};
pub use schema::ProviderSchema;
pub use service::{Contacts, ContactsService};
pub use sql::Like;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
