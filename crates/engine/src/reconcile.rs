//! Append-only merge of registry modules into a principal's grant.
//!
//! `reconcile` never removes or reorders rows: the input grant's modules are
//! always a prefix of the output. Rows for modules the registry no longer
//! publishes are retained as-is (see [`stale_modules`]).

use gatekeep_core::{ModuleDescriptor, ModulePermission, PermissionGrant};

/// Appends an all-denied row for every registry module the grant lacks.
///
/// Descriptors are visited in ascending `order` (stable for ties). Existing
/// rows, matching the registry or not, are left untouched. Idempotent.
pub fn reconcile(registry: &[ModuleDescriptor], grant: &PermissionGrant) -> PermissionGrant {
    let mut ordered: Vec<&ModuleDescriptor> = registry.iter().collect();
    ordered.sort_by_key(|d| d.order);

    let mut next = grant.clone();
    let mut appended = 0usize;

    for descriptor in ordered {
        if descriptor.module_key.trim().is_empty() {
            tracing::warn!(label = %descriptor.label, "skipping registry module without a key");
            continue;
        }
        if next.module(&descriptor.module_key).is_some() {
            continue;
        }
        next.modules.push(ModulePermission::from_descriptor(descriptor));
        appended += 1;
    }

    tracing::debug!(
        principal_id = %next.principal_id,
        registry = registry.len(),
        appended,
        "reconciled grant"
    );
    next
}

/// Module rows present in the grant but absent from the registry.
pub fn stale_modules<'g>(registry: &[ModuleDescriptor], grant: &'g PermissionGrant) -> Vec<&'g str> {
    grant
        .modules
        .iter()
        .filter(|m| !registry.iter().any(|d| d.module_key == m.module))
        .map(|m| m.module.as_str())
        .collect()
}

/// Recomputes `all` on every action set whose aggregate disagrees with its
/// granular flags. Returns the repaired grant and the number of rows fixed.
pub fn normalize(grant: &PermissionGrant) -> (PermissionGrant, usize) {
    let mut next = grant.clone();
    let mut repaired = 0usize;

    for module in &mut next.modules {
        if !module.actions.is_consistent() {
            module.actions = module.actions.normalized();
            repaired += 1;
        }
        for sub in module.sub_modules.iter_mut() {
            if !sub.actions.is_consistent() {
                sub.actions = sub.actions.normalized();
                repaired += 1;
            }
        }
    }

    (next, repaired)
}
