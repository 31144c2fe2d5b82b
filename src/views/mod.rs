//! Feature view models.
//!
//! Each view owns its slice of state plus busy flags and an inline error
//! string. User actions never return errors; failures land in `err`.

pub mod assignments;
pub mod dashboard;
pub mod group_detail;
pub mod groups;
pub mod optimistic;

pub use assignments::{AssignmentDraft, AssignmentsView};
pub use dashboard::{DashboardStats, DashboardView};
pub use group_detail::{Decision, GroupDetailView, TabCounts};
pub use groups::GroupsView;
pub use optimistic::{MutationPhase, OptimisticRemoval, Settled};
