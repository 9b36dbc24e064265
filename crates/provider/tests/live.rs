//! Live-service tests. Require a running registry and permission store.
//!
//! Run: `GATEKEEP_REGISTRY_URL=... GATEKEEP_STORE_URL=... cargo test -p gatekeep-provider -- --ignored`

use gatekeep_core::{set_action, ActionKey, ModulePermission, PermissionGrant, Role};
use gatekeep_provider::{HttpModuleRegistry, HttpPermissionStore, ModuleRegistry, PermissionStore};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
#[ignore]
async fn registry_lists_modules_for_every_role() {
    let url = std::env::var("GATEKEEP_REGISTRY_URL").expect("Set GATEKEEP_REGISTRY_URL");
    let registry = HttpModuleRegistry::new(&url, TIMEOUT).expect("Bad registry URL");

    for role in [Role::Admin, Role::Clinic, Role::Doctor] {
        let modules = registry
            .fetch_modules(role)
            .await
            .expect("Registry fetch failed");
        for m in &modules {
            assert!(!m.module_key.is_empty(), "moduleKey should not be empty");
        }
        eprintln!("[live] {role}: {} modules", modules.len());
    }
}

#[tokio::test]
#[ignore]
async fn store_save_then_load_roundtrip() {
    let url = std::env::var("GATEKEEP_STORE_URL").expect("Set GATEKEEP_STORE_URL");
    let store = HttpPermissionStore::new(&url, TIMEOUT).expect("Bad store URL");

    let mut grant = PermissionGrant::empty("gatekeep-live-test");
    let mut row = ModulePermission::empty("jobs");
    row.actions = set_action(row.actions, ActionKey::Read, true);
    grant.modules.push(row);

    store.save(&grant).await.expect("Save failed");
    let loaded = store.load(&grant.principal_id).await.expect("Load failed");
    assert_eq!(loaded, grant);
}

#[tokio::test]
#[ignore]
async fn unknown_principal_is_not_found() {
    let url = std::env::var("GATEKEEP_STORE_URL").expect("Set GATEKEEP_STORE_URL");
    let store = HttpPermissionStore::new(&url, TIMEOUT).expect("Bad store URL");

    let err = store
        .load("gatekeep-live-test-does-not-exist")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err}");
}
