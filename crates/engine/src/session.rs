//! One principal's edit session: load, reconcile, mutate, persist.
//!
//! The session owns the single working copy of the grant. I/O happens only
//! in [`EditSession::open`] and [`EditSession::save`]; everything between is
//! synchronous and in-memory.
//!
//! ```ignore
//! let mut session = EditSession::open(&registry, &store, "agent-7", Role::Clinic).await?;
//! session.apply_module_action("blogs", ActionKey::All, true)?;
//! session.save(&store).await?;
//! ```

use crate::mutator::{Mutation, MutationRequest, PermissionMutator};
use crate::query;
use crate::reconcile::{normalize, reconcile};
use gatekeep_core::error::{GatekeepError, GatekeepResult};
use gatekeep_core::{ActionKey, ModuleDescriptor, PermissionGrant, Role};
use gatekeep_provider::{ModuleRegistry, PermissionStore};

/// Where the working grant is in its lifecycle.
///
/// `Reconciled` and `Mutated` can be re-entered in any order; `Persisted`
/// means the working grant matches the last successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Loaded (or initialized empty) but not reconciled.
    Loaded,
    Reconciled,
    Mutated,
    Persisted,
}

#[derive(Debug)]
pub struct EditSession {
    role: Role,
    /// `None` when the registry could not be reached (degraded mode).
    registry: Option<Vec<ModuleDescriptor>>,
    grant: PermissionGrant,
    state: SessionState,
    applied: Vec<Mutation>,
}

impl EditSession {
    /// Loads the principal's grant and reconciles it against the registry.
    ///
    /// A missing document starts an empty grant. A registry failure is
    /// logged and the session continues degraded with the stored rows.
    /// Store failures and malformed documents are returned.
    pub async fn open<R, S>(
        registry: &R,
        store: &S,
        principal_id: &str,
        role: Role,
    ) -> GatekeepResult<Self>
    where
        R: ModuleRegistry + ?Sized,
        S: PermissionStore + ?Sized,
    {
        if principal_id.trim().is_empty() {
            return Err(GatekeepError::InvalidInput("principal id must not be empty".into()));
        }

        let grant = match store.load(principal_id).await {
            Ok(grant) => {
                grant.validate()?;
                let (grant, repaired) = normalize(&grant);
                if repaired > 0 {
                    tracing::warn!(principal_id, repaired, "repaired inconsistent `all` flags");
                }
                tracing::info!(principal_id, modules = grant.len(), "loaded grant");
                grant
            }
            Err(GatekeepError::NotFound(_)) => {
                tracing::info!(principal_id, "no stored grant, starting empty");
                PermissionGrant::empty(principal_id)
            }
            Err(e) => return Err(e),
        };

        let modules = match registry.fetch_modules(role).await {
            Ok(modules) => Some(modules),
            Err(e) => {
                tracing::warn!(
                    principal_id,
                    %role,
                    error = %e,
                    "module registry unavailable, editing stored rows only"
                );
                None
            }
        };

        Ok(Self::new(grant, role, modules))
    }

    /// Starts a session over an already-loaded grant. Reconciles when a
    /// registry snapshot is given.
    pub fn new(grant: PermissionGrant, role: Role, registry: Option<Vec<ModuleDescriptor>>) -> Self {
        let mut session = Self {
            role,
            registry: None,
            grant,
            state: SessionState::Loaded,
            applied: Vec::new(),
        };
        if let Some(modules) = registry {
            session.reconcile_with(modules);
        }
        session
    }

    /// Replaces the registry snapshot and reconciles against it.
    pub fn reconcile_with(&mut self, modules: Vec<ModuleDescriptor>) {
        self.grant = reconcile(&modules, &self.grant);
        self.registry = Some(modules);
        self.state = SessionState::Reconciled;
    }

    pub fn apply(&mut self, mutation: &Mutation) -> GatekeepResult<&PermissionGrant> {
        let registry = self.registry.as_deref().unwrap_or(&[]);
        let next = PermissionMutator::new(registry).apply(&self.grant, mutation)?;
        self.grant = next;
        self.state = SessionState::Mutated;
        self.applied.push(mutation.clone());
        Ok(&self.grant)
    }

    pub fn apply_request(&mut self, request: &MutationRequest) -> GatekeepResult<&PermissionGrant> {
        let mutation = request.parse()?;
        self.apply(&mutation)
    }

    pub fn apply_module_action(
        &mut self,
        module_key: &str,
        key: ActionKey,
        value: bool,
    ) -> GatekeepResult<&PermissionGrant> {
        self.apply(&Mutation::module(module_key, key, value))
    }

    pub fn apply_sub_module_action(
        &mut self,
        module_key: &str,
        sub_module: &str,
        key: ActionKey,
        value: bool,
    ) -> GatekeepResult<&PermissionGrant> {
        self.apply(&Mutation::sub_module(module_key, sub_module, key, value))
    }

    /// Replaces the stored document with the working grant.
    ///
    /// On failure the working grant and state are kept so the caller can
    /// retry. Concurrent sessions for one principal race: the last save wins.
    pub async fn save<S>(&mut self, store: &S) -> GatekeepResult<()>
    where
        S: PermissionStore + ?Sized,
    {
        match store.save(&self.grant).await {
            Ok(()) => {
                tracing::info!(
                    principal_id = %self.grant.principal_id,
                    mutations = self.applied.len(),
                    "grant saved"
                );
                self.state = SessionState::Persisted;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    principal_id = %self.grant.principal_id,
                    error = %e,
                    "save failed, working grant kept"
                );
                Err(e)
            }
        }
    }

    pub fn is_allowed(&self, module_key: &str, key: ActionKey, sub_module: Option<&str>) -> bool {
        query::is_allowed(&self.grant, module_key, key, sub_module)
    }

    pub fn grant(&self) -> &PermissionGrant {
        &self.grant
    }

    pub fn into_grant(self) -> PermissionGrant {
        self.grant
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True when the registry was unreachable and no snapshot has been
    /// supplied since.
    pub fn is_degraded(&self) -> bool {
        self.registry.is_none()
    }

    pub fn registry(&self) -> Option<&[ModuleDescriptor]> {
        self.registry.as_deref()
    }

    /// Mutations applied in this session, in order.
    pub fn applied(&self) -> &[Mutation] {
        &self.applied
    }
}
