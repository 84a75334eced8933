use notification_contact_provider::testing::{
    assert_plan_changes_attribute, assert_plan_creates, assert_plan_does_not_change_attribute,
    assert_plan_updates_in_place, show_row, ProviderTester, ScriptedClient,
};
use notification_contact_provider::{
    ClientError, ContactProvider, ProviderError, CONTACT_RESOURCE_TYPE,
};
use serde_json::{json, Value};

fn tester() -> (ProviderTester<ContactProvider<ScriptedClient>>, ScriptedClient) {
    let client = ScriptedClient::new();
    (ProviderTester::new(ContactProvider::new(client.clone())), client)
}

#[tokio::test]
async fn contact_create_read_update_delete() {
    let (tester, client) = tester();
    tester
        .configure(json!({"statement_timeout_secs": 30}))
        .await
        .unwrap();

    // Create.
    let config = json!({"name": "ON_CALL", "email": "oncall@example.com", "comment": "pager"});
    tester
        .validate_resource_config(CONTACT_RESOURCE_TYPE, config.clone())
        .await
        .unwrap();
    let plan = tester
        .plan_create(CONTACT_RESOURCE_TYPE, config)
        .await
        .unwrap();
    assert_plan_creates(&plan);

    client.push_query(Ok(vec![show_row("ON_CALL", "oncall@example.com", Some("pager"))]));
    let created = tester
        .create(CONTACT_RESOURCE_TYPE, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(created["id"], "ON_CALL");
    assert_eq!(created["show_output"][0]["owner"], "ACCOUNTADMIN");

    // Refresh.
    client.push_query(Ok(vec![show_row("ON_CALL", "oncall@example.com", Some("pager"))]));
    let refreshed = tester
        .read(CONTACT_RESOURCE_TYPE, created.clone())
        .await
        .unwrap();
    assert_eq!(refreshed, created);

    // Rename, change the email and drop the comment.
    let proposed = json!({"name": "Pager Duty", "email": "pager@example.com"});
    let plan = tester
        .plan_update(CONTACT_RESOURCE_TYPE, refreshed.clone(), proposed)
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "name");
    assert_plan_changes_attribute(&plan, "email");
    assert_plan_changes_attribute(&plan, "comment");
    assert_eq!(plan.planned_state["fully_qualified_name"], Value::Null);

    client.push_query(Ok(vec![show_row("Pager Duty", "pager@example.com", None)]));
    let updated = tester
        .update(CONTACT_RESOURCE_TYPE, refreshed, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["id"], "\"Pager Duty\"");
    assert_eq!(updated["comment"], Value::Null);

    // A second plan against the new state is empty.
    let plan = tester
        .plan_update(
            CONTACT_RESOURCE_TYPE,
            updated.clone(),
            json!({"name": "Pager Duty", "email": "pager@example.com"}),
        )
        .await
        .unwrap();
    assert_plan_does_not_change_attribute(&plan, "name");
    assert!(!plan.has_changes());

    // Delete.
    tester
        .lifecycle_delete(CONTACT_RESOURCE_TYPE, updated)
        .await
        .unwrap();

    assert_eq!(
        client.statements(),
        vec![
            "CREATE NOTIFICATION CONTACT ON_CALL EMAIL = 'oncall@example.com' COMMENT = 'pager'",
            "SHOW NOTIFICATION CONTACTS LIKE 'ON_CALL'",
            "SHOW NOTIFICATION CONTACTS LIKE 'ON_CALL'",
            "ALTER NOTIFICATION CONTACT ON_CALL RENAME TO \"Pager Duty\"",
            "ALTER NOTIFICATION CONTACT \"Pager Duty\" SET EMAIL = 'pager@example.com'",
            "ALTER NOTIFICATION CONTACT \"Pager Duty\" UNSET COMMENT",
            "SHOW NOTIFICATION CONTACTS LIKE 'Pager Duty'",
            "DROP NOTIFICATION CONTACT \"Pager Duty\"",
        ]
    );
}

#[tokio::test]
async fn contact_deleted_out_of_band_leaves_state() {
    let (tester, client) = tester();
    client.push_query(Ok(vec![show_row("OPS", "ops@example.com", None)]));

    let state = tester
        .create(
            CONTACT_RESOURCE_TYPE,
            json!({"name": "OPS", "email": "ops@example.com"}),
        )
        .await
        .unwrap();

    // Nothing queued: the next SHOW finds no rows.
    let refreshed = tester.read(CONTACT_RESOURCE_TYPE, state.clone()).await.unwrap();
    assert_eq!(refreshed, Value::Null);

    client.push_exec(Err(ClientError::execution(
        2003,
        "Notification contact 'OPS' does not exist or not authorized.",
    )));
    let err = tester
        .delete(CONTACT_RESOURCE_TYPE, state)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn contact_import() {
    let (tester, client) = tester();
    client.push_query(Ok(vec![
        show_row("OPSX", "other@example.com", None),
        show_row("OPS", "ops@example.com", Some("imported")),
    ]));

    let imported = tester
        .import_resource(CONTACT_RESOURCE_TYPE, "OPS")
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);

    let state = &imported[0].state;
    assert_eq!(state["id"], "OPS");
    assert_eq!(state["email"], "ops@example.com");
    assert_eq!(state["comment"], "imported");
    assert_eq!(state["show_output"][0]["created_on"], "2024-05-01T12:00:00+00:00");
}
