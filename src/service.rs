//! The contacts service: validates requests, runs them through a [`Client`],
//! and maps result rows back to typed values.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::{Client, Row};
use crate::contacts::{
    AlterContactOptions, AlterContactRequest, Contact, ContactProperty, CreateContactOptions,
    CreateContactRequest, DescribeContactOptions, DescribeContactRequest, DescribeContactRow,
    DropContactOptions, DropContactRequest, ShowContactOptions, ShowContactRequest,
    ShowContactRow,
};
use crate::error::SdkError;
use crate::identifier::AccountObjectIdentifier;
use crate::sql::{validate_and_render, Like, Statement};

/// Operations on notification contacts.
#[async_trait]
pub trait Contacts: Send + Sync {
    /// Create a contact.
    async fn create(&self, request: CreateContactRequest) -> Result<(), SdkError>;

    /// Modify a contact.
    async fn alter(&self, request: AlterContactRequest) -> Result<(), SdkError>;

    /// Remove a contact. Without `IF EXISTS`, a missing contact is an error.
    async fn drop(&self, request: DropContactRequest) -> Result<(), SdkError>;

    /// Remove a contact, treating an already-absent one as success.
    async fn drop_safely(&self, id: &AccountObjectIdentifier) -> Result<(), SdkError>;

    /// List contacts.
    async fn show(&self, request: ShowContactRequest) -> Result<Vec<Contact>, SdkError>;

    /// Fetch the contact whose name is exactly `id`.
    ///
    /// Returns [`SdkError::ObjectNotFound`] when there is none.
    async fn show_by_id(&self, id: &AccountObjectIdentifier) -> Result<Contact, SdkError>;

    /// Like [`show_by_id`](Self::show_by_id), but an absent contact is `Ok(None)`.
    async fn show_by_id_safely(
        &self,
        id: &AccountObjectIdentifier,
    ) -> Result<Option<Contact>, SdkError>;

    /// List a contact's properties.
    async fn describe(&self, id: &AccountObjectIdentifier)
        -> Result<Vec<ContactProperty>, SdkError>;
}

/// [`Contacts`] implementation over a SQL [`Client`].
#[derive(Debug, Clone)]
pub struct ContactsService<C> {
    client: C,
    log_sql: bool,
}

impl<C: Client> ContactsService<C> {
    /// Create a service that executes through `client`.
    pub fn new(client: C) -> Self {
        Self {
            client,
            log_sql: false,
        }
    }

    /// Log rendered statements at `info` instead of `debug`.
    pub fn with_sql_logging(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn log_statement(&self, sql: &str) {
        if self.log_sql {
            info!(sql, "Executing statement");
        } else {
            debug!(sql, "Executing statement");
        }
    }

    async fn validate_and_exec<S: Statement + Sync>(&self, opts: &S) -> Result<(), SdkError> {
        let sql = validate_and_render(Some(opts))?;
        self.log_statement(&sql);
        self.client.exec(&sql).await?;
        Ok(())
    }

    async fn validate_and_query<S, R, T>(&self, opts: &S) -> Result<Vec<T>, SdkError>
    where
        S: Statement + Sync,
        R: DeserializeOwned,
        T: From<R>,
    {
        let sql = validate_and_render(Some(opts))?;
        self.log_statement(&sql);
        let rows = self.client.query(&sql).await?;
        debug!(rows = rows.len(), "Query returned");
        convert_rows::<R, T>(rows)
    }
}

fn convert_rows<R, T>(rows: Vec<Row>) -> Result<Vec<T>, SdkError>
where
    R: DeserializeOwned,
    T: From<R>,
{
    rows.into_iter()
        .map(|row| {
            let row: R = serde_json::from_value(Value::Object(row))?;
            Ok(T::from(row))
        })
        .collect()
}

#[async_trait]
impl<C: Client> Contacts for ContactsService<C> {
    #[instrument(skip_all, fields(contact = %request.name()), name = "contacts.create")]
    async fn create(&self, request: CreateContactRequest) -> Result<(), SdkError> {
        let opts = CreateContactOptions::from(request);
        self.validate_and_exec(&opts).await
    }

    #[instrument(skip_all, fields(contact = %request.name()), name = "contacts.alter")]
    async fn alter(&self, request: AlterContactRequest) -> Result<(), SdkError> {
        let opts = AlterContactOptions::from(request);
        self.validate_and_exec(&opts).await
    }

    #[instrument(skip_all, fields(contact = %request.name()), name = "contacts.drop")]
    async fn drop(&self, request: DropContactRequest) -> Result<(), SdkError> {
        let opts = DropContactOptions::from(request);
        self.validate_and_exec(&opts).await
    }

    #[instrument(skip_all, fields(contact = %id), name = "contacts.drop_safely")]
    async fn drop_safely(&self, id: &AccountObjectIdentifier) -> Result<(), SdkError> {
        match self
            .drop(DropContactRequest::new(id.clone()).with_if_exists(true))
            .await
        {
            Err(err) if err.is_object_not_found() => {
                debug!("Contact already absent");
                Ok(())
            },
            other => other,
        }
    }

    #[instrument(skip_all, name = "contacts.show")]
    async fn show(&self, request: ShowContactRequest) -> Result<Vec<Contact>, SdkError> {
        let opts = ShowContactOptions::from(request);
        self.validate_and_query::<_, ShowContactRow, Contact>(&opts)
            .await
    }

    #[instrument(skip_all, fields(contact = %id), name = "contacts.show_by_id")]
    async fn show_by_id(&self, id: &AccountObjectIdentifier) -> Result<Contact, SdkError> {
        let contacts = self
            .show(ShowContactRequest::new().with_like(Like::new(id.name())))
            .await?;
        // LIKE treats `_` and `%` as wildcards, so keep only the exact name.
        contacts
            .into_iter()
            .find(|c| c.name == id.name())
            .ok_or_else(|| SdkError::ObjectNotFound(id.fully_qualified_name()))
    }

    #[instrument(skip_all, fields(contact = %id), name = "contacts.show_by_id_safely")]
    async fn show_by_id_safely(
        &self,
        id: &AccountObjectIdentifier,
    ) -> Result<Option<Contact>, SdkError> {
        match self.show_by_id(id).await {
            Ok(contact) => Ok(Some(contact)),
            Err(err) if err.is_object_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip_all, fields(contact = %id), name = "contacts.describe")]
    async fn describe(
        &self,
        id: &AccountObjectIdentifier,
    ) -> Result<Vec<ContactProperty>, SdkError> {
        let opts = DescribeContactOptions::from(DescribeContactRequest::new(id.clone()));
        self.validate_and_query::<_, DescribeContactRow, ContactProperty>(&opts)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::contacts::{ContactSet, ContactUnset};
    use crate::testing::{show_row, ScriptedClient};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> (ContactsService<ScriptedClient>, ScriptedClient) {
        let client = ScriptedClient::new();
        (ContactsService::new(client.clone()), client)
    }

    fn id(name: &str) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(name)
    }

    #[tokio::test]
    async fn test_create_executes_rendered_sql() {
        let (service, client) = service();
        client.push_exec(Ok(()));

        let request = CreateContactRequest::new(id("ON_CALL"), "oncall@example.com")
            .with_comment("pager");
        assert_ok!(service.create(request).await);

        assert_eq!(
            client.statements(),
            vec!["CREATE NOTIFICATION CONTACT ON_CALL EMAIL = 'oncall@example.com' COMMENT = 'pager'"]
        );
    }

    #[tokio::test]
    async fn test_validation_errors_never_reach_the_client() {
        let (service, client) = service();

        let err = assert_err!(
            service
                .create(
                    CreateContactRequest::new(id(""), "a@b.c")
                        .with_or_replace(true)
                        .with_if_not_exists(true)
                )
                .await
        );
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(2));

        let err = assert_err!(
            service
                .alter(
                    AlterContactRequest::new(id("X"))
                        .with_set(ContactSet::new().with_comment("c"))
                        .with_unset(ContactUnset::new().with_comment(true))
                )
                .await
        );
        assert!(matches!(err, SdkError::Validation(_)));

        assert!(client.statements().is_empty());
    }

    #[tokio::test]
    async fn test_execution_error_passes_through() {
        let (service, client) = service();
        client.push_exec(Err(ClientError::execution(3001, "Insufficient privileges")));

        let err = assert_err!(service.drop(DropContactRequest::new(id("X"))).await);
        assert!(matches!(
            err,
            SdkError::Client(ClientError::Execution { code: Some(3001), .. })
        ));
    }

    #[tokio::test]
    async fn test_plain_drop_surfaces_not_found() {
        let (service, client) = service();
        client.push_exec(Err(ClientError::execution(2003, "does not exist or not authorized")));

        let err = assert_err!(service.drop(DropContactRequest::new(id("GONE"))).await);
        assert!(err.is_object_not_found());
        assert_eq!(client.statements(), vec!["DROP NOTIFICATION CONTACT GONE"]);
    }

    #[tokio::test]
    async fn test_drop_safely_tolerates_absent_contact() {
        let (service, client) = service();
        client.push_exec(Ok(()));
        client.push_exec(Err(ClientError::ObjectNotFound("GONE".to_string())));

        assert_ok!(service.drop_safely(&id("GONE")).await);
        assert_ok!(service.drop_safely(&id("GONE")).await);
        assert_eq!(
            client.statements(),
            vec![
                "DROP NOTIFICATION CONTACT IF EXISTS GONE",
                "DROP NOTIFICATION CONTACT IF EXISTS GONE"
            ]
        );
    }

    #[tokio::test]
    async fn test_drop_safely_propagates_other_errors() {
        let (service, client) = service();
        client.push_exec(Err(ClientError::Connection("reset".to_string())));

        let err = assert_err!(service.drop_safely(&id("X")).await);
        assert!(matches!(err, SdkError::Client(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_show_maps_rows() {
        let (service, client) = service();
        client.push_query(Ok(vec![
            show_row("A", "a@example.com", Some("first")),
            show_row("B", "b@example.com", None),
        ]));

        let contacts = service.show(ShowContactRequest::new()).await.unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].comment, "first");
        assert_eq!(contacts[1].comment, "");
        assert_eq!(client.statements(), vec!["SHOW NOTIFICATION CONTACTS"]);
    }

    #[tokio::test]
    async fn test_show_rejects_malformed_rows() {
        let (service, client) = service();
        let mut row = show_row("A", "a@example.com", None);
        row.remove("email");
        client.push_query(Ok(vec![row]));

        let err = assert_err!(service.show(ShowContactRequest::new()).await);
        assert!(matches!(err, SdkError::RowMapping(_)));
    }

    #[tokio::test]
    async fn test_show_by_id_excludes_pattern_false_positives() {
        let (service, client) = service();
        // `_` in the pattern matches any character, so the platform returns both.
        client.push_query(Ok(vec![
            show_row("TEAMXA", "wrong@example.com", None),
            show_row("TEAM_A", "right@example.com", None),
        ]));

        let contact = service.show_by_id(&id("TEAM_A")).await.unwrap();
        assert_eq!(contact.email, "right@example.com");
        assert_eq!(
            client.statements(),
            vec!["SHOW NOTIFICATION CONTACTS LIKE 'TEAM_A'"]
        );
    }

    #[tokio::test]
    async fn test_show_by_id_is_case_sensitive() {
        let (service, client) = service();
        client.push_query(Ok(vec![show_row("ops", "ops@example.com", None)]));

        let err = assert_err!(service.show_by_id(&id("OPS")).await);
        assert!(matches!(err, SdkError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_show_by_id_safely() {
        let (service, client) = service();
        client.push_query(Ok(vec![]));
        client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));
        client.push_query(Err(ClientError::Connection("down".to_string())));

        assert_eq!(service.show_by_id_safely(&id("OPS")).await.unwrap(), None);
        assert_eq!(
            service
                .show_by_id_safely(&id("OPS"))
                .await
                .unwrap()
                .map(|c| c.email),
            Some("ops@example.com".to_string())
        );
        let err = assert_err!(service.show_by_id_safely(&id("OPS")).await);
        assert!(!err.is_object_not_found());
    }

    #[tokio::test]
    async fn test_describe() {
        let (service, client) = service();
        client.push_query(Ok(vec![
            json!({"property": "EMAIL", "value": "ops@example.com"})
                .as_object()
                .cloned()
                .unwrap(),
            json!({"property": "COMMENT", "value": null})
                .as_object()
                .cloned()
                .unwrap(),
        ]));

        let properties = service.describe(&id("OPS")).await.unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].name, "EMAIL");
        assert_eq!(properties[1].value, "");
        assert_eq!(client.statements(), vec!["DESCRIBE NOTIFICATION CONTACT OPS"]);
    }

    #[tokio::test]
    async fn test_describe_rejects_invalid_identifier() {
        let (service, client) = service();
        let err = assert_err!(service.describe(&id("")).await);
        assert!(matches!(err, SdkError::Validation(_)));
        assert!(client.statements().is_empty());
    }
}
