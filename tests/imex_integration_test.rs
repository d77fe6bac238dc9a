mod common;

use httpmock::prelude::*;
use intact_dx::domain::model::Referenced;
use intact_dx::domain::ports::{PublicationRegistry, RegistryStatus};
use intact_dx::{DxError, HttpRegistry, ImexCentralManager, InMemoryRegistry, JsonStore};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn imex_of<'a, T: Referenced>(items: &'a [T], ac: impl Fn(&T) -> &str, wanted: &str) -> Option<&'a str> {
    items.iter().find(|i| ac(i) == wanted).and_then(|i| i.imex_id())
}

#[tokio::test]
async fn test_assign_and_sync_persists_ids_to_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let path = common::write_dataset(temp_dir.path(), &common::export_dataset());

    let store = JsonStore::load(&path).unwrap();
    let registry = InMemoryRegistry::new(1);
    let manager = ImexCentralManager::new(&store, &registry);

    let report = manager.assign_and_sync("EBI-P1").await.unwrap();
    // Registration happened while assigning, before the sync step.
    assert!(!report.registered);
    assert!(report.status_updated && report.group_added);
    assert_eq!(report.imex_id.as_deref(), Some("IM-1"));
    assert_eq!(report.interactions_assigned, 2);
    store.flush().await.unwrap();

    let reloaded = JsonStore::load(&path).unwrap().snapshot().await;
    assert_eq!(imex_of(&reloaded.publications, |p| p.ac.as_str(), "EBI-P1"), Some("IM-1"));
    assert_eq!(imex_of(&reloaded.experiments, |e| e.ac.as_str(), "EBI-E3"), Some("IM-1"));
    assert_eq!(imex_of(&reloaded.interactions, |i| i.ac.as_str(), "EBI-I1"), Some("IM-1-1"));
    assert_eq!(imex_of(&reloaded.interactions, |i| i.ac.as_str(), "EBI-I3"), Some("IM-1-2"));
    assert_eq!(imex_of(&reloaded.interactions, |i| i.ac.as_str(), "EBI-I2"), None);

    let record = registry.get("1001").await.unwrap().unwrap();
    assert_eq!(record.status, RegistryStatus::Released);
    assert_eq!(record.admin_groups, vec!["IntAct".to_string()]);
    assert_eq!(record.admin_users, vec!["curator1".to_string()]);

    // Second run changes nothing.
    let again = manager.assign_and_sync("EBI-P1").await.unwrap();
    assert!(!again.changed());
}

#[tokio::test]
async fn test_update_all_skips_ineligible_publications() {
    let store = JsonStore::new(serde_json::from_value(common::export_dataset()).unwrap());
    let registry = InMemoryRegistry::default();
    let manager = ImexCentralManager::new(&store, &registry);

    let batch = manager.update_all(true).await.unwrap();
    assert_eq!(batch.synchronized.len(), 1);
    assert_eq!(batch.synchronized[0].publication_ac, "EBI-P1");
    assert_eq!(batch.skipped, vec!["EBI-P2".to_string(), "EBI-P3".to_string()]);
    assert!(batch.failed.is_empty());

    let err = manager.assign_and_sync("EBI-P2").await.unwrap_err();
    assert!(matches!(err, DxError::ValidationError { .. }));
}

#[tokio::test]
async fn test_failed_publication_does_not_lose_earlier_ids() {
    let temp_dir = TempDir::new().unwrap();
    let path = common::write_dataset(temp_dir.path(), &common::export_dataset());

    let store = JsonStore::load(&path).unwrap();
    let registry = InMemoryRegistry::new(1);
    let manager = ImexCentralManager::new(&store, &registry);

    let acs = vec!["EBI-P1".to_string(), "EBI-P2".to_string(), "EBI-P404".to_string()];
    let batch = manager.assign_each(&acs, true).await;
    assert_eq!(batch.synchronized.len(), 1);
    assert_eq!(batch.synchronized[0].imex_id.as_deref(), Some("IM-1"));
    let failed: Vec<&str> = batch.failed.iter().map(|(ac, _)| ac.as_str()).collect();
    assert_eq!(failed, vec!["EBI-P2", "EBI-P404"]);

    store.flush().await.unwrap();
    let reloaded = JsonStore::load(&path).unwrap().snapshot().await;
    assert_eq!(imex_of(&reloaded.publications, |p| p.ac.as_str(), "EBI-P1"), Some("IM-1"));
    assert_eq!(imex_of(&reloaded.interactions, |i| i.ac.as_str(), "EBI-I3"), Some("IM-1-2"));
}

#[tokio::test]
async fn test_assign_without_sync_leaves_registry_status() {
    let store = JsonStore::new(serde_json::from_value(common::export_dataset()).unwrap());
    let registry = InMemoryRegistry::new(3);
    let batch = ImexCentralManager::new(&store, &registry)
        .assign_each(&["EBI-P1".to_string()], false)
        .await;
    assert!(batch.failed.is_empty());
    assert_eq!(batch.synchronized[0].imex_id.as_deref(), Some("IM-3"));
    assert_eq!(batch.synchronized[0].interactions_assigned, 2);

    let record = registry.get("1001").await.unwrap().unwrap();
    assert_eq!(record.status, RegistryStatus::New);
    assert!(record.admin_groups.is_empty());
}

fn record(imex_id: Option<&str>, status: &str, groups: &[&str]) -> serde_json::Value {
    json!({
        "identifier": "1001",
        "imex_id": imex_id,
        "status": status,
        "admin_groups": groups,
        "admin_users": []
    })
}

#[tokio::test]
async fn test_http_registry_requests() {
    let server = MockServer::start();
    let auth = "Basic dXNlcjpzZWNyZXQ=";

    let missing = server.mock(|when, then| {
        when.method(GET).path("/api/publications/2002").header("authorization", auth);
        then.status(404);
    });
    let register = server.mock(|when, then| {
        when.method(POST)
            .path("/api/publications")
            .json_body(json!({"identifier": "1001"}));
        then.status(201).json_body(record(None, "NEW", &[]));
    });
    let assign = server.mock(|when, then| {
        when.method(POST).path("/api/publications/1001/imex");
        then.status(200).json_body(record(Some("IM-42"), "NEW", &[]));
    });
    let status = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/publications/1001/status")
            .json_body(json!({"status": "ACCEPTED"}));
        then.status(200).json_body(record(Some("IM-42"), "ACCEPTED", &[]));
    });
    let failing = server.mock(|when, then| {
        when.method(POST).path("/api/publications/1001/admin-groups");
        then.status(500).body("boom");
    });

    let registry = HttpRegistry::new(
        &server.url("/api"),
        Duration::from_secs(5),
        Some(("user".to_string(), "secret".to_string())),
    )
    .unwrap();

    assert!(registry.get("2002").await.unwrap().is_none());
    assert_eq!(registry.register("1001").await.unwrap().status, RegistryStatus::New);
    assert_eq!(
        registry.assign_imex_id("1001").await.unwrap().imex_id.as_deref(),
        Some("IM-42")
    );
    assert_eq!(
        registry
            .update_status("1001", RegistryStatus::Accepted)
            .await
            .unwrap()
            .status,
        RegistryStatus::Accepted
    );
    let err = registry.add_admin_group("1001", "IntAct").await.unwrap_err();
    assert!(matches!(err, DxError::RegistryError { .. }));

    missing.assert();
    register.assert();
    assign.assert();
    status.assert();
    failing.assert();
}

#[tokio::test]
async fn test_sync_over_http_imports_existing_registry_id() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method(GET).path("/api/publications/1001");
        then.status(200).json_body(record(Some("IM-7"), "NEW", &[]));
    });
    let assign = server.mock(|when, then| {
        when.method(POST).path("/api/publications/1001/imex");
        then.status(200).json_body(record(Some("IM-7"), "NEW", &[]));
    });
    let status = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/publications/1001/status")
            .json_body(json!({"status": "RELEASED"}));
        then.status(200).json_body(record(Some("IM-7"), "RELEASED", &[]));
    });
    let group = server.mock(|when, then| {
        when.method(POST)
            .path("/api/publications/1001/admin-groups")
            .json_body(json!({"name": "IntAct"}));
        then.status(200).json_body(record(Some("IM-7"), "RELEASED", &["IntAct"]));
    });
    let user = server.mock(|when, then| {
        when.method(POST)
            .path("/api/publications/1001/admin-users")
            .json_body(json!({"name": "curator1"}));
        then.status(200).json_body(record(Some("IM-7"), "RELEASED", &["IntAct"]));
    });

    let store = JsonStore::new(serde_json::from_value(common::export_dataset()).unwrap());
    let registry = HttpRegistry::new(&server.url("/api"), Duration::from_secs(5), None).unwrap();
    let report = ImexCentralManager::new(&store, &registry)
        .assign_and_sync("EBI-P1")
        .await
        .unwrap();

    assert_eq!(report.imex_id.as_deref(), Some("IM-7"));
    assert!(!report.registered);
    assert!(report.status_updated && report.group_added && report.user_added);
    assert_eq!(report.interactions_assigned, 2);

    lookup.assert_hits(2);
    assign.assert();
    status.assert();
    group.assert();
    user.assert();

    let snapshot = store.snapshot().await;
    assert_eq!(imex_of(&snapshot.interactions, |i| i.ac.as_str(), "EBI-I3"), Some("IM-7-2"));
}
