//! In-process registry and store. Used by tests and offline tooling.

use crate::{ModuleRegistry, PermissionStore};
use async_trait::async_trait;
use gatekeep_core::error::{GatekeepError, GatekeepResult};
use gatekeep_core::{ModuleDescriptor, PermissionGrant, Role};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Registry backed by per-role descriptor lists.
///
/// Can be switched offline to exercise degraded sessions.
#[derive(Debug, Default)]
pub struct InMemoryModuleRegistry {
    modules: RwLock<HashMap<Role, Vec<ModuleDescriptor>>>,
    offline: AtomicBool,
}

impl InMemoryModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modules(mut self, role: Role, modules: Vec<ModuleDescriptor>) -> Self {
        self.modules.get_mut().insert(role, modules);
        self
    }

    pub async fn set_modules(&self, role: Role, modules: Vec<ModuleDescriptor>) {
        self.modules.write().await.insert(role, modules);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModuleRegistry for InMemoryModuleRegistry {
    async fn fetch_modules(&self, role: Role) -> GatekeepResult<Vec<ModuleDescriptor>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatekeepError::RegistryUnavailable(format!(
                "registry offline (role {role})"
            )));
        }
        Ok(self
            .modules
            .read()
            .await
            .get(&role)
            .cloned()
            .unwrap_or_default())
    }
}

/// Document store keyed by principal id. Writes replace the whole document.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    documents: RwLock<HashMap<String, PermissionGrant>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, grant: PermissionGrant) -> Self {
        self.documents
            .get_mut()
            .insert(grant.principal_id.clone(), grant);
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current document for `principal_id`, if any.
    pub async fn document(&self, principal_id: &str) -> Option<PermissionGrant> {
        self.documents.read().await.get(principal_id).cloned()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn load(&self, principal_id: &str) -> GatekeepResult<PermissionGrant> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatekeepError::Persistence(format!(
                "reading grant for {principal_id}: store unavailable"
            )));
        }
        self.documents
            .read()
            .await
            .get(principal_id)
            .cloned()
            .ok_or_else(|| GatekeepError::NotFound(format!("no grant for {principal_id}")))
    }

    async fn save(&self, grant: &PermissionGrant) -> GatekeepResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatekeepError::Persistence(format!(
                "saving grant for {}: store unavailable",
                grant.principal_id
            )));
        }
        self.documents
            .write()
            .await
            .insert(grant.principal_id.clone(), grant.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
