//! Property tests: the `all` invariant, reconciliation laws, and replay
//! determinism over arbitrary registries, grants, and mutation sequences.

use gatekeep_core::{ActionKey, ModuleDescriptor, PermissionGrant, SubModuleDescriptor};
use gatekeep_engine::{reconcile, replay, Mutation, MutationRecord, PermissionMutator};
use proptest::prelude::*;

const MODULES: &[&str] = &["blogs", "jobs", "reports", "patients", "billing"];
const SUBS: &[&str] = &["write", "publish", "list", "export-csv"];

fn action_key() -> impl Strategy<Value = ActionKey> {
    proptest::sample::select(ActionKey::VOCABULARY.to_vec())
}

fn descriptor() -> impl Strategy<Value = ModuleDescriptor> {
    (
        proptest::sample::select(MODULES.to_vec()),
        -3i32..3,
        proptest::sample::subsequence(SUBS.to_vec(), 0..=SUBS.len()),
    )
        .prop_map(|(key, order, subs)| ModuleDescriptor {
            module_key: key.to_string(),
            label: key.to_uppercase(),
            icon: "grid".into(),
            order,
            sub_modules: subs
                .into_iter()
                .enumerate()
                .map(|(i, name)| SubModuleDescriptor {
                    name: name.to_string(),
                    path: None,
                    icon: "dot".into(),
                    order: i as i32,
                })
                .collect(),
        })
}

fn registry() -> impl Strategy<Value = Vec<ModuleDescriptor>> {
    proptest::collection::vec(descriptor(), 0..6)
}

fn mutation() -> impl Strategy<Value = Mutation> {
    (
        proptest::sample::select(MODULES.to_vec()),
        proptest::option::of(proptest::sample::select(SUBS.to_vec())),
        action_key(),
        any::<bool>(),
    )
        .prop_map(|(module, sub, action, value)| Mutation {
            module: module.to_string(),
            sub_module: sub.map(str::to_string),
            action,
            value,
        })
}

fn mutations() -> impl Strategy<Value = Vec<Mutation>> {
    proptest::collection::vec(mutation(), 0..40)
}

/// A grant built by mutating an empty grant against one registry, so it
/// carries rows the second registry may not know.
fn grant() -> impl Strategy<Value = PermissionGrant> {
    (registry(), mutations()).prop_map(|(registry, mutations)| {
        let m = PermissionMutator::new(&registry);
        mutations
            .iter()
            .fold(PermissionGrant::empty("p1"), |g, mu| m.apply(&g, mu).unwrap())
    })
}

fn row_keys(grant: &PermissionGrant) -> Vec<(String, Option<String>)> {
    grant
        .modules
        .iter()
        .flat_map(|m| {
            std::iter::once((m.module.clone(), None)).chain(
                m.sub_modules
                    .iter()
                    .map(move |s| (m.module.clone(), Some(s.name.clone()))),
            )
        })
        .collect()
}

proptest! {
    /// Every action set satisfies `all == AND(granular)` after any sequence.
    #[test]
    fn all_invariant_holds(registry in registry(), mutations in mutations()) {
        let m = PermissionMutator::new(&registry);
        let mut g = reconcile(&registry, &PermissionGrant::empty("p1"));
        for mu in &mutations {
            g = m.apply(&g, mu).unwrap();
            prop_assert!(g.action_sets().all(|s| s.is_consistent()));
        }
        prop_assert!(g.validate().is_ok());
    }

    #[test]
    fn reconcile_is_idempotent(registry in registry(), g in grant()) {
        let once = reconcile(&registry, &g);
        let twice = reconcile(&registry, &once);
        prop_assert_eq!(once, twice);
    }

    /// Existing rows survive reconciliation unchanged and in place.
    #[test]
    fn reconcile_is_monotonic(registry in registry(), g in grant()) {
        let out = reconcile(&registry, &g);
        prop_assert!(out.len() >= g.len());
        prop_assert_eq!(&out.modules[..g.len()], &g.modules[..]);

        let after = row_keys(&out);
        for key in row_keys(&g) {
            prop_assert!(after.contains(&key));
        }
        for appended in &out.modules[g.len()..] {
            prop_assert!(appended.actions.is_empty());
            prop_assert!(appended.sub_modules.iter().all(|s| s.actions.is_empty()));
        }
    }

    /// Every registry module is present after reconciliation.
    #[test]
    fn reconcile_covers_registry(registry in registry(), g in grant()) {
        let out = reconcile(&registry, &g);
        for d in &registry {
            prop_assert!(out.module(&d.module_key).is_some());
        }
    }

    #[test]
    fn module_all_cascades_and_granular_does_not(
        registry in registry(),
        g in grant(),
        module in proptest::sample::select(MODULES.to_vec()),
        key in action_key(),
        value in any::<bool>(),
    ) {
        let m = PermissionMutator::new(&registry);
        let out = m.apply_module_action(&g, module, key, value).unwrap();
        let row = out.module(module).unwrap();
        prop_assert_eq!(row.actions.get(key), value);

        if key.is_aggregate() {
            for sub in &row.sub_modules {
                prop_assert!(ActionKey::VOCABULARY.iter().all(|&k| sub.actions.get(k) == value));
            }
        } else if let Some(before) = g.module(module) {
            prop_assert_eq!(&row.sub_modules, &before.sub_modules);
        }
    }

    #[test]
    fn sub_module_toggle_leaves_module_flags(
        registry in registry(),
        g in grant(),
        module in proptest::sample::select(MODULES.to_vec()),
        sub in proptest::sample::select(SUBS.to_vec()),
        key in action_key(),
        value in any::<bool>(),
    ) {
        let m = PermissionMutator::new(&registry);
        let out = m.apply_sub_module_action(&g, module, sub, key, value).unwrap();
        prop_assert_eq!(out.sub_module(module, sub).unwrap().actions.get(key), value);
        if let Some(before) = g.module(module) {
            prop_assert_eq!(out.module(module).unwrap().actions, before.actions);
        }
    }

    /// The same mutation sequence from the same start gives the same grant.
    #[test]
    fn replay_is_deterministic(registry in registry(), mutations in mutations()) {
        let start = reconcile(&registry, &PermissionGrant::empty("p1"));
        let m = PermissionMutator::new(&registry);
        let direct = mutations.iter().fold(start.clone(), |g, mu| m.apply(&g, mu).unwrap());

        let records: Vec<MutationRecord> = mutations
            .into_iter()
            .map(|mutation| MutationRecord { principal_id: "p1".into(), mutation })
            .collect();
        let replayed = replay(&start, &registry, &records).unwrap();
        prop_assert_eq!(direct, replayed);
    }
}
