//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod action;
pub mod error;
pub mod matrix;
pub mod types;

pub use action::ActionKey;
pub use error::{GatekeepError, GatekeepResult, UnknownActionKey};
pub use matrix::{set_action, ActionSet};
pub use types::{
    find_descriptor, ModuleDescriptor, ModulePermission, PermissionGrant, Role,
    SubModuleDescriptor, SubModulePermission, SubModuleRows, PLACEHOLDER_ICON,
};
