//! Reconciliation, mutation, authorization queries, and edit sessions over
//! permission grants, plus the mutation journal and grant report.

pub mod journal;
pub mod mutator;
pub mod query;
pub mod reconcile;
pub mod report;
pub mod session;

pub use journal::{read_journal, replay, JournalSink, MutationRecord};
pub use mutator::{Mutation, MutationRequest, PermissionMutator};
pub use query::{is_allowed, is_allowed_raw, permitted_actions};
pub use reconcile::{normalize, reconcile, stale_modules};
pub use report::{render_grant, GrantSummary};
pub use session::{EditSession, SessionState};
