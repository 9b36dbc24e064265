//! Human-readable rendering of a grant.
//!
//! One row per module, indented rows per sub-module, one column per action
//! key. Rows for modules the registry no longer publishes are flagged.

use crate::reconcile::stale_modules;
use gatekeep_core::{ActionKey, ActionSet, ModuleDescriptor, PermissionGrant};

const NAME_WIDTH: usize = 26;
const WIDTH: usize = 78;

/// Counts over a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantSummary {
    pub modules: usize,
    pub sub_modules: usize,
    /// Granular flags set, across module and sub-module rows.
    pub granted_actions: usize,
    /// Rows whose `all` flag is set.
    pub full_rows: usize,
}

impl GrantSummary {
    pub fn of(grant: &PermissionGrant) -> Self {
        let mut summary = GrantSummary {
            modules: grant.len(),
            ..Default::default()
        };
        for module in &grant.modules {
            summary.sub_modules += module.sub_modules.len();
        }
        for set in grant.action_sets() {
            summary.granted_actions += set.granted().filter(|k| !k.is_aggregate()).count();
            if set.get(ActionKey::All) {
                summary.full_rows += 1;
            }
        }
        summary
    }
}

/// Renders the grant as a fixed-width table. With a registry snapshot, rows
/// the registry no longer lists are marked `(stale)`.
pub fn render_grant(grant: &PermissionGrant, registry: Option<&[ModuleDescriptor]>) -> String {
    let summary = GrantSummary::of(grant);
    let stale = registry.map(|r| stale_modules(r, grant)).unwrap_or_default();
    let rule = "═".repeat(WIDTH);

    let mut out = String::new();
    out.push_str(&format!("╔{rule}╗\n"));
    out.push_str(&format!("║  Principal:   {}\n", grant.principal_id));
    out.push_str(&format!(
        "║  Modules: {}  |  Sub-modules: {}  |  Granted: {}  |  Full rows: {}\n",
        summary.modules, summary.sub_modules, summary.granted_actions, summary.full_rows
    ));
    out.push_str(&format!("╠{rule}╣\n"));

    if grant.is_empty() {
        out.push_str("║  No modules granted.\n");
        out.push_str(&format!("╚{rule}╝\n"));
        return out;
    }

    let mut header = format!("║  {:<NAME_WIDTH$}", "MODULE");
    for key in ActionKey::VOCABULARY {
        header.push_str(&format!("{:>8}", key.as_str()));
    }
    out.push_str(&header);
    out.push('\n');

    for module in &grant.modules {
        let name = if stale.contains(&module.module.as_str()) {
            format!("{} (stale)", module.module)
        } else {
            module.module.clone()
        };
        out.push_str(&row(&name, &module.actions));

        for sub in &module.sub_modules {
            out.push_str(&row(&format!("  └ {}", sub.name), &sub.actions));
        }
    }

    out.push_str(&format!("╚{rule}╝\n"));
    out
}

fn row(name: &str, actions: &ActionSet) -> String {
    let mut line = format!("║  {:<NAME_WIDTH$}", truncate(name, NAME_WIDTH));
    for key in ActionKey::VOCABULARY {
        let mark = if actions.get(key) { "✓" } else { "·" };
        line.push_str(&format!("{mark:>8}"));
    }
    line.push('\n');
    line
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut s: String = name.chars().take(width - 1).collect();
    s.push('…');
    s
}
