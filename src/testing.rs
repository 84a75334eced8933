//! Testing utilities.
//!
//! [`ScriptedClient`] stands in for a database connection: it records the
//! SQL it receives and replays responses queued ahead of time.
//! [`ProviderTester`] drives a [`ProviderService`] through the same calls a
//! host makes, without one.
//!
//! # Example
//!
//! ```
//! use notification_contact_provider::provider::{ContactProvider, CONTACT_RESOURCE_TYPE};
//! use notification_contact_provider::testing::{show_row, ProviderTester, ScriptedClient};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let client = ScriptedClient::new();
//! let tester = ProviderTester::new(ContactProvider::new(client.clone()));
//!
//! // Read-back after create, then the read that follows it.
//! client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));
//! client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));
//!
//! let state = tester
//!     .lifecycle_create(CONTACT_RESOURCE_TYPE, json!({"name": "OPS", "email": "ops@example.com"}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["fully_qualified_name"], "OPS");
//! assert_eq!(client.statements()[0], "CREATE NOTIFICATION CONTACT OPS EMAIL = 'ops@example.com'");
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{Client, ClientError, Row};
use crate::error::ProviderError;
use crate::provider::ProviderService;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};

/// `created_on` reported by rows built with [`show_row`].
pub const SHOW_ROW_CREATED_ON: &str = "2024-05-01T12:00:00Z";

/// Owner reported by rows built with [`show_row`].
pub const SHOW_ROW_OWNER: &str = "ACCOUNTADMIN";

#[derive(Debug, Default)]
struct Script {
    exec: VecDeque<Result<(), ClientError>>,
    query: VecDeque<Result<Vec<Row>, ClientError>>,
    statements: Vec<String>,
    delay: Option<Duration>,
}

/// A [`Client`] that replays queued responses.
///
/// Clones share the same script and statement log, so a test can keep one
/// handle while another is moved into the code under test. Once a queue
/// runs dry, `exec` succeeds and `query` returns no rows.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    /// Create a client with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` before answering each statement.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Queue the response for the next `exec`.
    pub fn push_exec(&self, response: Result<(), ClientError>) {
        self.lock().exec.push_back(response);
    }

    /// Queue the response for the next `query`.
    pub fn push_query(&self, response: Result<Vec<Row>, ClientError>) {
        self.lock().query.push_back(response);
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Client for ScriptedClient {
    async fn exec(&self, sql: &str) -> Result<(), ClientError> {
        let (response, delay) = {
            let mut script = self.lock();
            script.statements.push(sql.to_string());
            (script.exec.pop_front().unwrap_or(Ok(())), script.delay)
        };
        Self::pause(delay).await;
        response
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        let (response, delay) = {
            let mut script = self.lock();
            script.statements.push(sql.to_string());
            (script.query.pop_front().unwrap_or_else(|| Ok(Vec::new())), script.delay)
        };
        Self::pause(delay).await;
        response
    }
}

/// A `SHOW NOTIFICATION CONTACTS` row. A `None` comment comes back as null.
pub fn show_row(name: &str, email: &str, comment: Option<&str>) -> Row {
    let mut row = Row::new();
    row.insert("created_on".to_string(), Value::from(SHOW_ROW_CREATED_ON));
    row.insert("name".to_string(), Value::from(name));
    row.insert("email".to_string(), Value::from(email));
    row.insert(
        "comment".to_string(),
        comment.map(Value::from).unwrap_or(Value::Null),
    );
    row.insert("owner".to_string(), Value::from(SHOW_ROW_OWNER));
    row
}

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Run plan, create and read. Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run plan, update and read. Returns the state after the read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run plan and delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Run create, update and delete in turn.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;
        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that a plan creates the resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        plan.has_changes(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan changes the given attribute.
///
/// # Panics
///
/// Panics if the plan does not have a change for `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.change(path).is_some(),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        changed_paths(plan)
    );
}

/// Assert that a plan leaves the given attribute alone.
///
/// # Panics
///
/// Panics if the plan has a change for `path`.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.change(path).is_none(),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "Expected at least one error, but got none"
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContactProvider, CONTACT_RESOURCE_TYPE};
    use serde_json::json;

    fn tester() -> (ProviderTester<ContactProvider<ScriptedClient>>, ScriptedClient) {
        let client = ScriptedClient::new();
        (ProviderTester::new(ContactProvider::new(client.clone())), client)
    }

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedClient::new();
        client.push_exec(Err(ClientError::Connection("first".to_string())));
        client.push_query(Ok(vec![show_row("A", "a@example.com", None)]));

        assert!(client.exec("ONE").await.is_err());
        assert!(client.exec("TWO").await.is_ok());
        assert_eq!(client.query("THREE").await.unwrap().len(), 1);
        assert!(client.query("FOUR").await.unwrap().is_empty());
        assert_eq!(client.statements(), vec!["ONE", "TWO", "THREE", "FOUR"]);
    }

    #[tokio::test]
    async fn test_scripted_client_clones_share_state() {
        let client = ScriptedClient::new();
        let handle = client.clone();
        client.exec("SELECT 1").await.unwrap();
        assert_eq!(handle.statements(), vec!["SELECT 1"]);
    }

    #[test]
    fn test_show_row() {
        let row = show_row("OPS", "ops@example.com", None);
        assert_eq!(row["name"], "OPS");
        assert_eq!(row["comment"], Value::Null);
        assert_eq!(row["created_on"], SHOW_ROW_CREATED_ON);
    }

    #[tokio::test]
    async fn test_tester_schema() {
        let (tester, _) = tester();
        assert!(tester.schema().resources.contains_key(CONTACT_RESOURCE_TYPE));
        assert_eq!(tester.resource_types(), vec![CONTACT_RESOURCE_TYPE.to_string()]);
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let (tester, _) = tester();
        assert!(tester.configure(json!({"log_sql": true})).await.is_ok());

        let err = tester.configure(json!({"verbose": true})).await.unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_error_contains(&diags, "Unsupported attribute"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_tester_validate_resource_config() {
        let (tester, _) = tester();
        assert!(tester
            .validate_resource_config(CONTACT_RESOURCE_TYPE, json!({"name": "OPS", "email": "a@b.c"}))
            .await
            .is_ok());
        assert!(tester
            .validate_resource_config(CONTACT_RESOURCE_TYPE, json!({"name": "OPS"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_tester_plans() {
        let (tester, _) = tester();
        let config = json!({"name": "OPS", "email": "ops@example.com"});

        let plan = tester.plan_create(CONTACT_RESOURCE_TYPE, config).await.unwrap();
        assert_plan_creates(&plan);
        assert_plan_does_not_change_attribute(&plan, "comment");

        let prior = json!({
            "id": "OPS",
            "name": "OPS",
            "email": "ops@example.com",
            "comment": null,
            "fully_qualified_name": "OPS",
            "show_output": [],
        });
        let plan = tester
            .plan_update(
                CONTACT_RESOURCE_TYPE,
                prior.clone(),
                json!({"name": "OPS", "email": "ops@example.com", "comment": "pager"}),
            )
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "comment");
        assert_plan_updates_in_place(&plan);

        let plan = tester
            .plan_update(
                CONTACT_RESOURCE_TYPE,
                prior,
                json!({"name": "OPS", "email": "ops@example.com"}),
            )
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let (tester, client) = tester();
        client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));
        client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));
        client.push_query(Ok(vec![show_row("OPS", "pager@example.com", None)]));
        client.push_query(Ok(vec![show_row("OPS", "pager@example.com", None)]));

        let state = tester
            .lifecycle_crud(
                CONTACT_RESOURCE_TYPE,
                json!({"name": "OPS", "email": "ops@example.com"}),
                json!({"name": "OPS", "email": "pager@example.com"}),
            )
            .await
            .unwrap();

        assert_eq!(state["email"], "pager@example.com");
        assert_eq!(
            client.statements().last().map(String::as_str),
            Some("DROP NOTIFICATION CONTACT OPS")
        );
    }

    #[test]
    fn test_assert_no_errors() {
        assert_no_errors(&[Diagnostic::warning("Just a warning")]);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        assert_no_errors(&[Diagnostic::error("An error")]);
    }

    #[test]
    fn test_assert_has_errors() {
        assert_has_errors(&[Diagnostic::error("An error")]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("name"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("(at name)"));
        assert!(display.contains("More info"));
    }
}
