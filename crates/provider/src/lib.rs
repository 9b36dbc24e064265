//! External collaborators of an edit session: the module registry and the
//! permission store.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use gatekeep_core::error::GatekeepResult;
use gatekeep_core::{ModuleDescriptor, PermissionGrant, Role};

pub use http::{HttpModuleRegistry, HttpPermissionStore};
pub use memory::{InMemoryModuleRegistry, InMemoryPermissionStore};

/// Source of the modules and sub-modules available to a role.
#[async_trait]
pub trait ModuleRegistry: Send + Sync {
    /// Descriptors in registry order. Any failure is reported as
    /// `RegistryUnavailable`.
    async fn fetch_modules(&self, role: Role) -> GatekeepResult<Vec<ModuleDescriptor>>;
}

/// Persists one grant document per principal.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Returns `NotFound` when the principal has no document yet.
    async fn load(&self, principal_id: &str) -> GatekeepResult<PermissionGrant>;

    /// Replaces the principal's document wholesale. Never partially applied.
    async fn save(&self, grant: &PermissionGrant) -> GatekeepResult<()>;
}
