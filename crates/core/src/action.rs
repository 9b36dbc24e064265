//! The fixed action vocabulary.

use crate::error::UnknownActionKey;
use serde::{Deserialize, Serialize};

/// One of the eight permission verbs.
///
/// `All` is the derived aggregate; the other seven are granular. The wire
/// form is the lowercase name (`"all"`, `"create"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKey {
    All,
    Create,
    Read,
    Update,
    Delete,
    Print,
    Export,
    Approve,
}

impl ActionKey {
    /// Every key, in wire order.
    pub const VOCABULARY: [ActionKey; 8] = [
        ActionKey::All,
        ActionKey::Create,
        ActionKey::Read,
        ActionKey::Update,
        ActionKey::Delete,
        ActionKey::Print,
        ActionKey::Export,
        ActionKey::Approve,
    ];

    /// The seven keys whose AND defines `All`.
    pub const GRANULAR: [ActionKey; 7] = [
        ActionKey::Create,
        ActionKey::Read,
        ActionKey::Update,
        ActionKey::Delete,
        ActionKey::Print,
        ActionKey::Export,
        ActionKey::Approve,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKey::All => "all",
            ActionKey::Create => "create",
            ActionKey::Read => "read",
            ActionKey::Update => "update",
            ActionKey::Delete => "delete",
            ActionKey::Print => "print",
            ActionKey::Export => "export",
            ActionKey::Approve => "approve",
        }
    }

    #[inline]
    pub fn is_aggregate(self) -> bool {
        self == ActionKey::All
    }
}

impl std::fmt::Display for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership-exact: case and whitespace are not normalized.
impl std::str::FromStr for ActionKey {
    type Err = UnknownActionKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(ActionKey::All),
            "create" => Ok(ActionKey::Create),
            "read" => Ok(ActionKey::Read),
            "update" => Ok(ActionKey::Update),
            "delete" => Ok(ActionKey::Delete),
            "print" => Ok(ActionKey::Print),
            "export" => Ok(ActionKey::Export),
            "approve" => Ok(ActionKey::Approve),
            other => Err(UnknownActionKey(other.to_string())),
        }
    }
}
