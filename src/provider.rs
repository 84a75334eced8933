//! The resource layer: turns host requests carrying JSON state into calls
//! on the [`Contacts`] service.
//!
//! [`ProviderService`] is the surface a host drives. [`ContactProvider`]
//! implements it for the `notification_contact` resource over any
//! [`Client`].

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::Client;
use crate::config::ProviderConfig;
use crate::contacts::{
    AlterContactRequest, Contact, ContactSet, ContactUnset, CreateContactRequest,
    DropContactRequest,
};
use crate::error::{ProviderError, SdkError};
use crate::identifier::AccountObjectIdentifier;
use crate::schema::{
    contact_schema, Diagnostic, ProviderSchema, Schema, FULLY_QUALIFIED_NAME_ATTRIBUTE,
    ID_ATTRIBUTE, SHOW_OUTPUT_ATTRIBUTE,
};
use crate::service::{Contacts, ContactsService};
use crate::types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Resource type name of a notification contact.
pub const CONTACT_RESOURCE_TYPE: &str = "notification_contact";

/// Trait that provider implementations must implement.
///
/// State and configuration travel as JSON values shaped by the schema the
/// provider reports.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
        }
    }

    /// Configure the provider. Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource. A null `proposed_state` plans deletion.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// Returns `Value::Null` when the resource no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Sdk(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

/// User-facing attributes of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ContactAttributes {
    name: String,
    email: String,
    #[serde(default)]
    comment: Option<String>,
}

impl ContactAttributes {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        let mut attrs: Self = serde_json::from_value(state.clone()).map_err(|e| {
            ProviderError::InvalidRequest(format!("malformed contact attributes: {}", e))
        })?;
        // `"OPS"` and `OPS` name the same contact.
        if let Ok(id) = AccountObjectIdentifier::parse(&attrs.name) {
            attrs.name = id.name().to_string();
        }
        // An empty comment and an absent one are the same thing.
        attrs.comment = attrs.comment.filter(|c| !c.is_empty());
        Ok(attrs)
    }

    fn id(&self) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(self.name.clone())
    }

    fn comment_value(&self) -> Value {
        self.comment.clone().map(Value::String).unwrap_or(Value::Null)
    }

    fn write_into(&self, state: &mut Map<String, Value>) {
        state.insert("name".to_string(), Value::String(self.name.clone()));
        state.insert("email".to_string(), Value::String(self.email.clone()));
        state.insert("comment".to_string(), self.comment_value());
    }

    /// Attribute changes needed to go from `self` to `desired`.
    fn diff(&self, desired: &Self) -> Vec<AttributeChange> {
        let mut changes = Vec::new();
        if self.name != desired.name {
            changes.push(AttributeChange::modified(
                "name",
                Value::String(self.name.clone()),
                Value::String(desired.name.clone()),
            ));
        }
        if self.email != desired.email {
            changes.push(AttributeChange::modified(
                "email",
                Value::String(self.email.clone()),
                Value::String(desired.email.clone()),
            ));
        }
        if self.comment != desired.comment {
            changes.push(AttributeChange::modified(
                "comment",
                self.comment_value(),
                desired.comment_value(),
            ));
        }
        changes
    }
}

/// State recorded for a contact read back from the platform.
fn contact_state(contact: &Contact) -> Value {
    let fully_qualified_name = contact.id().fully_qualified_name();

    let mut show_output = Map::new();
    show_output.insert(
        "created_on".to_string(),
        Value::String(contact.created_on.to_rfc3339()),
    );
    show_output.insert("name".to_string(), Value::String(contact.name.clone()));
    show_output.insert("email".to_string(), Value::String(contact.email.clone()));
    show_output.insert("comment".to_string(), Value::String(contact.comment.clone()));
    show_output.insert("owner".to_string(), Value::String(contact.owner.clone()));

    let mut state = Map::new();
    state.insert(
        ID_ATTRIBUTE.to_string(),
        Value::String(fully_qualified_name.clone()),
    );
    state.insert("name".to_string(), Value::String(contact.name.clone()));
    state.insert("email".to_string(), Value::String(contact.email.clone()));
    state.insert(
        "comment".to_string(),
        if contact.comment.is_empty() {
            Value::Null
        } else {
            Value::String(contact.comment.clone())
        },
    );
    state.insert(
        FULLY_QUALIFIED_NAME_ATTRIBUTE.to_string(),
        Value::String(fully_qualified_name),
    );
    state.insert(
        SHOW_OUTPUT_ATTRIBUTE.to_string(),
        Value::Array(vec![Value::Object(show_output)]),
    );
    Value::Object(state)
}

/// The identifier recorded under `id` in a state value.
fn state_id(state: &Value) -> Result<AccountObjectIdentifier, ProviderError> {
    let raw = state
        .get(ID_ATTRIBUTE)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidRequest("state has no resource id".to_string()))?;
    AccountObjectIdentifier::parse(raw)
        .map_err(|e| ProviderError::InvalidRequest(format!("invalid resource id '{}': {}", raw, e)))
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == CONTACT_RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

/// Run `operation`, giving up once `timeout` elapses.
async fn bounded<T, F>(timeout: Option<Duration>, operation: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, SdkError>>,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, operation).await.map_err(|_| {
            ProviderError::DeadlineExceeded(format!(
                "statement did not complete within {}s",
                limit.as_secs()
            ))
        })?,
        None => operation.await,
    };
    result.map_err(ProviderError::from)
}

/// Apply the `SET` and `UNSET` parts of an update, skipping empty ones.
async fn apply_properties<C: Client>(
    contacts: &ContactsService<C>,
    timeout: Option<Duration>,
    id: &AccountObjectIdentifier,
    set: ContactSet,
    unset: ContactUnset,
) -> Result<(), ProviderError> {
    if set != ContactSet::new() {
        bounded(
            timeout,
            contacts.alter(AlterContactRequest::new(id.clone()).with_set(set)),
        )
        .await?;
    }
    if unset != ContactUnset::new() {
        bounded(
            timeout,
            contacts.alter(AlterContactRequest::new(id.clone()).with_unset(unset)),
        )
        .await?;
    }
    Ok(())
}

/// `prior` moved over to `id`, with the rest of its attributes untouched.
fn renamed_state(prior: &Value, id: &AccountObjectIdentifier) -> Value {
    let mut state = prior.as_object().cloned().unwrap_or_default();
    let fully_qualified_name = id.fully_qualified_name();
    state.insert(
        ID_ATTRIBUTE.to_string(),
        Value::String(fully_qualified_name.clone()),
    );
    state.insert("name".to_string(), Value::String(id.name().to_string()));
    state.insert(
        FULLY_QUALIFIED_NAME_ATTRIBUTE.to_string(),
        Value::String(fully_qualified_name),
    );
    state.insert(SHOW_OUTPUT_ATTRIBUTE.to_string(), Value::Null);
    Value::Object(state)
}

/// Whether any of `changes` touches an attribute that cannot change in place.
fn requires_replacement(schema: &Schema, changes: &[AttributeChange]) -> bool {
    changes.iter().any(|change| {
        schema
            .attributes
            .get(&change.path)
            .is_some_and(|attr| attr.force_new)
    })
}

/// Manages `notification_contact` resources through a SQL [`Client`].
#[derive(Debug)]
pub struct ContactProvider<C> {
    client: C,
    config: RwLock<ProviderConfig>,
}

impl<C: Client> ContactProvider<C> {
    /// Create a provider with the default configuration.
    pub fn new(client: C) -> Self {
        Self::with_config(client, ProviderConfig::default())
    }

    /// Create a provider with an explicit configuration.
    pub fn with_config(client: C, config: ProviderConfig) -> Self {
        Self {
            client,
            config: RwLock::new(config),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// A snapshot of the active configuration.
    pub async fn config(&self) -> ProviderConfig {
        self.config.read().await.clone()
    }

    fn contacts(&self, config: &ProviderConfig) -> ContactsService<&C> {
        ContactsService::new(&self.client).with_sql_logging(config.log_sql)
    }

    async fn read_contact(
        &self,
        config: &ProviderConfig,
        id: &AccountObjectIdentifier,
    ) -> Result<Option<Value>, ProviderError> {
        let contact = bounded(
            config.statement_timeout(),
            self.contacts(config).show_by_id_safely(id),
        )
        .await?;
        Ok(contact.as_ref().map(contact_state))
    }

    /// Read back a contact that was just written. Losing it is an error.
    async fn read_back(
        &self,
        config: &ProviderConfig,
        id: &AccountObjectIdentifier,
    ) -> Result<Value, ProviderError> {
        self.read_contact(config, id).await?.ok_or_else(|| {
            ProviderError::NotFound(format!(
                "notification contact {} disappeared after it was written",
                id
            ))
        })
    }

    fn plan_create(&self, proposed: &Value) -> Result<PlanResult, ProviderError> {
        let desired = ContactAttributes::from_state(proposed)?;

        let mut planned = Map::new();
        desired.write_into(&mut planned);
        planned.insert(ID_ATTRIBUTE.to_string(), Value::Null);
        planned.insert(FULLY_QUALIFIED_NAME_ATTRIBUTE.to_string(), Value::Null);
        planned.insert(SHOW_OUTPUT_ATTRIBUTE.to_string(), Value::Null);

        let mut changes = vec![
            AttributeChange::added("name", Value::String(desired.name.clone())),
            AttributeChange::added("email", Value::String(desired.email.clone())),
        ];
        if desired.comment.is_some() {
            changes.push(AttributeChange::added("comment", desired.comment_value()));
        }

        Ok(PlanResult::with_changes(Value::Object(planned), changes, false))
    }

    fn plan_update(&self, prior: Value, proposed: &Value) -> Result<PlanResult, ProviderError> {
        let current = ContactAttributes::from_state(&prior)?;
        let desired = ContactAttributes::from_state(proposed)?;

        let changes = current.diff(&desired);
        if changes.is_empty() {
            return Ok(PlanResult::no_change(prior));
        }

        let mut planned = match prior {
            Value::Object(map) => map,
            _ => return Err(ProviderError::InvalidRequest("prior state is not an object".to_string())),
        };
        desired.write_into(&mut planned);
        planned.insert(SHOW_OUTPUT_ATTRIBUTE.to_string(), Value::Null);
        if current.name != desired.name {
            planned.insert(ID_ATTRIBUTE.to_string(), Value::Null);
            planned.insert(FULLY_QUALIFIED_NAME_ATTRIBUTE.to_string(), Value::Null);
        }

        let requires_replace = requires_replacement(&contact_schema(), &changes);
        Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            requires_replace,
        ))
    }

    fn plan_delete(&self, prior: &Value) -> Result<PlanResult, ProviderError> {
        let current = ContactAttributes::from_state(prior)?;
        let mut changes = vec![
            AttributeChange::removed("name", Value::String(current.name.clone())),
            AttributeChange::removed("email", Value::String(current.email.clone())),
        ];
        if current.comment.is_some() {
            changes.push(AttributeChange::removed("comment", current.comment_value()));
        }
        Ok(PlanResult::with_changes(Value::Null, changes, false))
    }
}

#[async_trait::async_trait]
impl<C: Client + 'static> ProviderService for ContactProvider<C> {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(CONTACT_RESOURCE_TYPE, contact_schema())
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
            return Ok(diagnostics);
        }

        match ProviderConfig::from_value(config) {
            Ok(parsed) => {
                info!(
                    statement_timeout_secs = parsed.statement_timeout_secs,
                    log_sql = parsed.log_sql,
                    "Provider configured"
                );
                *self.config.write().await = parsed;
            },
            Err(err) => {
                warn!(error = %err, "Configure completed with errors");
                diagnostics.push(
                    Diagnostic::error("Invalid provider configuration").with_detail(err.message()),
                );
            },
        }
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        check_resource_type(resource_type)?;
        let mut diagnostics = validate(&contact_schema(), &config);

        if let Some(name) = config.get("name").and_then(Value::as_str) {
            if !AccountObjectIdentifier::new(name).is_valid() {
                diagnostics.push(
                    Diagnostic::error("Invalid identifier")
                        .with_detail("The contact name must not be empty")
                        .with_attribute("name"),
                );
            }
        }

        if !diagnostics.is_empty() {
            debug!(resource_type, diagnostics = diagnostics.len(), "Resource config has diagnostics");
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all, fields(resource_type = %resource_type))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;

        let plan = match (prior_state, proposed_state.is_null()) {
            (None, true) => Ok(PlanResult::no_change(Value::Null)),
            (Some(prior), true) => self.plan_delete(&prior),
            (None, false) => self.plan_create(&proposed_state),
            (Some(prior), false) => self.plan_update(prior, &proposed_state),
        }?;

        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan completed"
        );
        Ok(plan)
    }

    #[instrument(skip_all, fields(resource_type = %resource_type))]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let desired = ContactAttributes::from_state(&planned_state)?;
        let id = desired.id();
        let config = self.config().await;

        let mut request = CreateContactRequest::new(id.clone(), desired.email.clone());
        if let Some(comment) = &desired.comment {
            request = request.with_comment(comment.clone());
        }

        bounded(config.statement_timeout(), self.contacts(&config).create(request))
            .await
            .inspect_err(|e| error!(contact = %id, error = %e, "Create failed"))?;
        info!(contact = %id, "Notification contact created");

        self.read_back(&config, &id).await
    }

    #[instrument(skip_all, fields(resource_type = %resource_type))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let id = state_id(&current_state)?;
        let config = self.config().await;

        match self.read_contact(&config, &id).await? {
            Some(state) => Ok(state),
            None => {
                warn!(contact = %id, "Notification contact not found; removing it from state");
                Ok(Value::Null)
            },
        }
    }

    #[instrument(skip_all, fields(resource_type = %resource_type))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let mut id = state_id(&prior_state)?;
        let current = ContactAttributes::from_state(&prior_state)?;
        let desired = ContactAttributes::from_state(&planned_state)?;
        let config = self.config().await;
        let timeout = config.statement_timeout();
        let contacts = self.contacts(&config);

        let renamed = current.name != desired.name;
        if renamed {
            let new_id = desired.id();
            bounded(
                timeout,
                contacts.alter(AlterContactRequest::new(id.clone()).with_rename_to(new_id.clone())),
            )
            .await?;
            info!(from = %id, to = %new_id, "Notification contact renamed");
            id = new_id;
        }

        let mut set = ContactSet::new();
        let mut unset = ContactUnset::new();
        if current.email != desired.email {
            set = set.with_email(desired.email.clone());
        }
        if current.comment != desired.comment {
            match &desired.comment {
                Some(comment) => set = set.with_comment(comment.clone()),
                None => unset = unset.with_comment(true),
            }
        }

        if let Err(err) = apply_properties(&contacts, timeout, &id, set, unset).await {
            if !renamed {
                return Err(err);
            }
            // The platform already knows the contact by its new name.
            error!(contact = %id, error = %err, "Update failed after rename");
            return Err(ProviderError::PartialUpdate {
                state: Box::new(renamed_state(&prior_state, &id)),
                source: Box::new(err),
            });
        }
        info!(contact = %id, "Notification contact updated");

        self.read_back(&config, &id).await
    }

    #[instrument(skip_all, fields(resource_type = %resource_type))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let id = state_id(&current_state)?;
        let config = self.config().await;

        bounded(
            config.statement_timeout(),
            self.contacts(&config).drop(DropContactRequest::new(id.clone())),
        )
        .await
        .inspect_err(|e| error!(contact = %id, error = %e, "Delete failed"))?;
        info!(contact = %id, "Notification contact dropped");
        Ok(())
    }

    #[instrument(skip_all, fields(resource_type = %resource_type, id = %id))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let id = AccountObjectIdentifier::parse(id)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid import id: {}", e)))?;
        let config = self.config().await;

        let contact = bounded(config.statement_timeout(), self.contacts(&config).show_by_id(&id)).await?;
        info!(contact = %id, "Notification contact imported");
        Ok(vec![ImportedResource::new(
            CONTACT_RESOURCE_TYPE,
            contact_state(&contact),
        )])
    }
}
