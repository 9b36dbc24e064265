//! Single-toggle mutations on module and sub-module rows.
//!
//! Every operation is copy-on-write: the input grant is never modified and a
//! rejected mutation leaves the caller's value exactly as it was. Missing rows
//! are auto-vivified, seeded from the registry snapshot when it knows them.
//!
//! Module and sub-module `all` flags are independent aggregates. Only a
//! module-level `all` write cascades, and only downward.

use gatekeep_core::error::{GatekeepError, GatekeepResult};
use gatekeep_core::{
    find_descriptor, set_action, ActionKey, ModuleDescriptor, ModulePermission, PermissionGrant,
    SubModulePermission,
};
use serde::{Deserialize, Serialize};

/// A mutation as sent by a client. `action` is untrusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_module: Option<String>,
    pub action: String,
    pub value: bool,
}

impl MutationRequest {
    /// Validates names and parses the action key.
    pub fn parse(&self) -> GatekeepResult<Mutation> {
        let action = self.action.parse::<ActionKey>()?;
        let mutation = Mutation {
            module: self.module.clone(),
            sub_module: self.sub_module.clone(),
            action,
            value: self.value,
        };
        mutation.check_names()?;
        Ok(mutation)
    }
}

/// A validated mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_module: Option<String>,
    pub action: ActionKey,
    pub value: bool,
}

impl Mutation {
    pub fn module(module: impl Into<String>, action: ActionKey, value: bool) -> Self {
        Self {
            module: module.into(),
            sub_module: None,
            action,
            value,
        }
    }

    pub fn sub_module(
        module: impl Into<String>,
        sub_module: impl Into<String>,
        action: ActionKey,
        value: bool,
    ) -> Self {
        Self {
            module: module.into(),
            sub_module: Some(sub_module.into()),
            action,
            value,
        }
    }

    fn check_names(&self) -> GatekeepResult<()> {
        check_name("module", &self.module)?;
        if let Some(name) = &self.sub_module {
            check_name("sub-module", name)?;
        }
        Ok(())
    }
}

fn check_name(what: &str, name: &str) -> GatekeepResult<()> {
    if name.trim().is_empty() {
        return Err(GatekeepError::Validation(format!("{what} name must not be empty")));
    }
    Ok(())
}

/// Applies mutations against a registry snapshot.
///
/// The snapshot only seeds auto-vivified rows; an empty slice is valid and
/// yields placeholder rows.
#[derive(Debug, Clone, Copy)]
pub struct PermissionMutator<'r> {
    registry: &'r [ModuleDescriptor],
}

impl<'r> PermissionMutator<'r> {
    pub fn new(registry: &'r [ModuleDescriptor]) -> Self {
        Self { registry }
    }

    /// Sets `key` on a module row.
    ///
    /// Writing `all` also floods every sub-module row of that module
    /// (including ones just created from the registry). Any other key
    /// leaves sub-modules alone.
    pub fn apply_module_action(
        &self,
        grant: &PermissionGrant,
        module_key: &str,
        key: ActionKey,
        value: bool,
    ) -> GatekeepResult<PermissionGrant> {
        check_name("module", module_key)?;

        let mut next = grant.clone();
        let row = self.module_row(&mut next, module_key);
        row.actions = set_action(row.actions, key, value);

        if key.is_aggregate() {
            for sub in row.sub_modules.iter_mut() {
                sub.actions = set_action(sub.actions, ActionKey::All, value);
            }
        }

        tracing::debug!(module = module_key, action = %key, value, "module action set");
        Ok(next)
    }

    /// Sets `key` on a sub-module row. The parent module's flags, `all`
    /// included, are not touched.
    pub fn apply_sub_module_action(
        &self,
        grant: &PermissionGrant,
        module_key: &str,
        sub_module: &str,
        key: ActionKey,
        value: bool,
    ) -> GatekeepResult<PermissionGrant> {
        check_name("module", module_key)?;
        check_name("sub-module", sub_module)?;

        let mut next = grant.clone();
        let row = self.module_row(&mut next, module_key);
        let sub = self.sub_module_row(row, sub_module);
        sub.actions = set_action(sub.actions, key, value);

        tracing::debug!(
            module = module_key,
            sub_module,
            action = %key,
            value,
            "sub-module action set"
        );
        Ok(next)
    }

    /// Dispatches a validated mutation.
    pub fn apply(&self, grant: &PermissionGrant, mutation: &Mutation) -> GatekeepResult<PermissionGrant> {
        match &mutation.sub_module {
            Some(sub) => self.apply_sub_module_action(
                grant,
                &mutation.module,
                sub,
                mutation.action,
                mutation.value,
            ),
            None => self.apply_module_action(grant, &mutation.module, mutation.action, mutation.value),
        }
    }

    /// Validates and dispatches a client request.
    pub fn apply_request(
        &self,
        grant: &PermissionGrant,
        request: &MutationRequest,
    ) -> GatekeepResult<PermissionGrant> {
        let mutation = request.parse().inspect_err(|e| {
            tracing::warn!(module = %request.module, action = %request.action, error = %e, "mutation rejected");
        })?;
        self.apply(grant, &mutation)
    }

    fn module_row<'g>(&self, grant: &'g mut PermissionGrant, module_key: &str) -> &'g mut ModulePermission {
        let idx = match grant.modules.iter().position(|m| m.module == module_key) {
            Some(idx) => idx,
            None => {
                let row = match find_descriptor(self.registry, module_key) {
                    Some(descriptor) => ModulePermission::from_descriptor(descriptor),
                    None => ModulePermission::empty(module_key),
                };
                tracing::debug!(
                    module = module_key,
                    sub_modules = row.sub_modules.len(),
                    "auto-vivified module row"
                );
                grant.modules.push(row);
                grant.modules.len() - 1
            }
        };
        &mut grant.modules[idx]
    }

    fn sub_module_row<'g>(&self, row: &'g mut ModulePermission, name: &str) -> &'g mut SubModulePermission {
        let idx = match row.sub_modules.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                let sub = find_descriptor(self.registry, &row.module)
                    .and_then(|d| d.sub_module(name))
                    .map(SubModulePermission::from_descriptor)
                    .unwrap_or_else(|| SubModulePermission::placeholder(name));
                tracing::debug!(module = %row.module, sub_module = name, "auto-vivified sub-module row");
                row.sub_modules.push(sub);
                row.sub_modules.len() - 1
            }
        };
        &mut row.sub_modules[idx]
    }
}
