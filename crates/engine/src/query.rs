//! Read-only authorization checks for request handlers.
//!
//! Default-deny: a missing module, sub-module or key answers `false`, the
//! same as an explicit denial. None of these functions fail.

use gatekeep_core::{ActionKey, ActionSet, PermissionGrant};

/// Is `key` granted on the module, or on one of its sub-modules?
pub fn is_allowed(
    grant: &PermissionGrant,
    module_key: &str,
    key: ActionKey,
    sub_module: Option<&str>,
) -> bool {
    permitted_actions(grant, module_key, sub_module).get(key)
}

/// [`is_allowed`] for an action key straight off the wire. Keys outside the
/// vocabulary are denied.
pub fn is_allowed_raw(
    grant: &PermissionGrant,
    module_key: &str,
    key: &str,
    sub_module: Option<&str>,
) -> bool {
    match key.parse::<ActionKey>() {
        Ok(key) => is_allowed(grant, module_key, key, sub_module),
        Err(_) => false,
    }
}

/// The action set governing a module or sub-module, or [`ActionSet::DENY_ALL`]
/// when the grant has no such row.
pub fn permitted_actions(
    grant: &PermissionGrant,
    module_key: &str,
    sub_module: Option<&str>,
) -> ActionSet {
    let Some(module) = grant.module(module_key) else {
        return ActionSet::DENY_ALL;
    };
    match sub_module {
        Some(name) => module
            .sub_module(name)
            .map_or(ActionSet::DENY_ALL, |s| s.actions),
        None => module.actions,
    }
}
