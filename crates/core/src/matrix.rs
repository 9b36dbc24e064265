//! Action matrix: the eight-flag [`ActionSet`] and the single place where
//! the `all` aggregate is derived.
//!
//! Invariant: `all == create && read && update && delete && print && export && approve`.
//! [`set_action`] restores it on every write. Fields are private so no other
//! code path can write a flag without going through it.

use crate::action::ActionKey;
use serde::{Deserialize, Serialize};

/// Boolean grant per [`ActionKey`].
///
/// Missing keys deserialize as `false`; unknown keys are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionSet {
    all: bool,
    create: bool,
    read: bool,
    update: bool,
    delete: bool,
    print: bool,
    export: bool,
    approve: bool,
}

impl ActionSet {
    /// Every flag `false`.
    pub const DENY_ALL: Self = Self::uniform(false);

    /// Every flag `true`.
    pub const ALLOW_ALL: Self = Self::uniform(true);

    const fn uniform(value: bool) -> Self {
        Self {
            all: value,
            create: value,
            read: value,
            update: value,
            delete: value,
            print: value,
            export: value,
            approve: value,
        }
    }

    #[inline]
    pub fn get(&self, key: ActionKey) -> bool {
        match key {
            ActionKey::All => self.all,
            ActionKey::Create => self.create,
            ActionKey::Read => self.read,
            ActionKey::Update => self.update,
            ActionKey::Delete => self.delete,
            ActionKey::Print => self.print,
            ActionKey::Export => self.export,
            ActionKey::Approve => self.approve,
        }
    }

    #[inline]
    fn slot_mut(&mut self, key: ActionKey) -> &mut bool {
        match key {
            ActionKey::All => &mut self.all,
            ActionKey::Create => &mut self.create,
            ActionKey::Read => &mut self.read,
            ActionKey::Update => &mut self.update,
            ActionKey::Delete => &mut self.delete,
            ActionKey::Print => &mut self.print,
            ActionKey::Export => &mut self.export,
            ActionKey::Approve => &mut self.approve,
        }
    }

    /// AND of the seven granular flags.
    pub fn granular_conjunction(&self) -> bool {
        ActionKey::GRANULAR.iter().all(|&k| self.get(k))
    }

    /// Whether `all` agrees with the granular flags.
    pub fn is_consistent(&self) -> bool {
        self.all == self.granular_conjunction()
    }

    /// Copy with `all` recomputed from the granular flags.
    ///
    /// Used to repair documents written by older clients; never grants more
    /// than the granular flags already do.
    pub fn normalized(mut self) -> Self {
        self.all = self.granular_conjunction();
        self
    }

    /// Keys currently granted, in wire order.
    pub fn granted(&self) -> impl Iterator<Item = ActionKey> + '_ {
        ActionKey::VOCABULARY.into_iter().filter(move |&k| self.get(k))
    }

    pub fn is_empty(&self) -> bool {
        self.granted().next().is_none()
    }
}

/// Returns `set` with `key` written to `value`, `all` kept consistent.
///
/// Writing `all` floods every flag with `value`. Writing any other key
/// recomputes `all` from the seven granular flags.
pub fn set_action(mut set: ActionSet, key: ActionKey, value: bool) -> ActionSet {
    if key.is_aggregate() {
        return ActionSet::uniform(value);
    }
    *set.slot_mut(key) = value;
    set.all = set.granular_conjunction();
    set
}
