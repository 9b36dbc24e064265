//! Domain types: the module registry schema and per-principal grant rows.

use crate::error::{GatekeepError, GatekeepResult};
use crate::matrix::ActionSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Icon given to sub-module rows created without a registry descriptor.
pub const PLACEHOLDER_ICON: &str = "circle";

// ---------------------------------------------------------------------------
// Registry (read-only input)
// ---------------------------------------------------------------------------

/// Portal role that parameterizes the registry query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Clinic,
    Doctor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Clinic => "clinic",
            Role::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = GatekeepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "clinic" => Ok(Role::Clinic),
            "doctor" => Ok(Role::Doctor),
            other => Err(GatekeepError::InvalidInput(format!(
                "unknown role {other:?}, expected admin, clinic or doctor"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubModuleDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order: i32,
}

/// A navigation module as published by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub module_key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub sub_modules: Vec<SubModuleDescriptor>,
}

impl ModuleDescriptor {
    pub fn sub_module(&self, name: &str) -> Option<&SubModuleDescriptor> {
        self.sub_modules.iter().find(|s| s.name == name)
    }
}

/// Finds the descriptor for `module_key` in a registry snapshot.
pub fn find_descriptor<'a>(
    registry: &'a [ModuleDescriptor],
    module_key: &str,
) -> Option<&'a ModuleDescriptor> {
    registry.iter().find(|d| d.module_key == module_key)
}

// ---------------------------------------------------------------------------
// Grant rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubModulePermission {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub actions: ActionSet,
}

impl SubModulePermission {
    /// All-denied row mirroring a registry descriptor.
    pub fn from_descriptor(descriptor: &SubModuleDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            path: descriptor.path.clone(),
            icon: descriptor.icon.clone(),
            order: descriptor.order,
            actions: ActionSet::DENY_ALL,
        }
    }

    /// All-denied row for a sub-module the registry does not know.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            icon: PLACEHOLDER_ICON.to_string(),
            order: 0,
            actions: ActionSet::DENY_ALL,
        }
    }
}

/// Sub-module rows of one module. Most modules carry only a handful.
pub type SubModuleRows = SmallVec<[SubModulePermission; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulePermission {
    /// The registry `moduleKey` this row grants on.
    pub module: String,
    #[serde(default)]
    pub actions: ActionSet,
    #[serde(default)]
    pub sub_modules: SubModuleRows,
}

impl ModulePermission {
    /// All-denied row with no sub-modules.
    pub fn empty(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            actions: ActionSet::DENY_ALL,
            sub_modules: SmallVec::new(),
        }
    }

    /// All-denied row with one all-denied sub-module per descriptor entry,
    /// in ascending `order`.
    pub fn from_descriptor(descriptor: &ModuleDescriptor) -> Self {
        let mut subs: Vec<&SubModuleDescriptor> = descriptor.sub_modules.iter().collect();
        subs.sort_by_key(|s| s.order);

        let mut row = Self::empty(descriptor.module_key.clone());
        for sub in subs {
            if row.sub_module(&sub.name).is_none() {
                row.sub_modules.push(SubModulePermission::from_descriptor(sub));
            }
        }
        row
    }

    pub fn sub_module(&self, name: &str) -> Option<&SubModulePermission> {
        self.sub_modules.iter().find(|s| s.name == name)
    }

    pub fn sub_module_mut(&mut self, name: &str) -> Option<&mut SubModulePermission> {
        self.sub_modules.iter_mut().find(|s| s.name == name)
    }
}

/// Aggregate root: everything one principal is granted.
///
/// Serializes as the store document `{principalId, permissions}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub principal_id: String,
    #[serde(rename = "permissions", default)]
    pub modules: Vec<ModulePermission>,
}

impl PermissionGrant {
    pub fn empty(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            modules: Vec::new(),
        }
    }

    pub fn module(&self, module_key: &str) -> Option<&ModulePermission> {
        self.modules.iter().find(|m| m.module == module_key)
    }

    pub fn module_mut(&mut self, module_key: &str) -> Option<&mut ModulePermission> {
        self.modules.iter_mut().find(|m| m.module == module_key)
    }

    pub fn sub_module(&self, module_key: &str, name: &str) -> Option<&SubModulePermission> {
        self.module(module_key).and_then(|m| m.sub_module(name))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every action set in the grant, module rows and sub-module rows alike.
    pub fn action_sets(&self) -> impl Iterator<Item = &ActionSet> + '_ {
        self.modules.iter().flat_map(|m| {
            std::iter::once(&m.actions).chain(m.sub_modules.iter().map(|s| &s.actions))
        })
    }

    /// Basic shape checks for a document coming from outside.
    ///
    /// Rejects an empty principal id, empty module keys, duplicate module
    /// keys, and empty or duplicate sub-module names within a module.
    pub fn validate(&self) -> GatekeepResult<()> {
        if self.principal_id.trim().is_empty() {
            return Err(GatekeepError::Validation("principalId must not be empty".into()));
        }

        let mut seen = HashSet::with_capacity(self.modules.len());
        for (i, module) in self.modules.iter().enumerate() {
            if module.module.trim().is_empty() {
                return Err(GatekeepError::Validation(format!(
                    "permissions[{i}]: module key must not be empty"
                )));
            }
            if !seen.insert(module.module.as_str()) {
                return Err(GatekeepError::Validation(format!(
                    "duplicate module {:?}",
                    module.module
                )));
            }

            let mut names = HashSet::with_capacity(module.sub_modules.len());
            for sub in &module.sub_modules {
                if sub.name.trim().is_empty() {
                    return Err(GatekeepError::Validation(format!(
                        "module {:?}: sub-module name must not be empty",
                        module.module
                    )));
                }
                if !names.insert(sub.name.as_str()) {
                    return Err(GatekeepError::Validation(format!(
                        "module {:?}: duplicate sub-module {:?}",
                        module.module, sub.name
                    )));
                }
            }
        }
        Ok(())
    }
}
