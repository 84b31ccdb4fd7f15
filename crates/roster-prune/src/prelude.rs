//! Convenience re-exports for running a prune.
//!
//! ```ignore
//! use roster_prune::prelude::*;
//! ```

pub use crate::api::{AccountSession, ApiEndpoints, ContactFilter, MembershipApi, RetryConfig, WildApricotClient};
pub use crate::error::{ApiError, RunError, Stage};
pub use crate::events::{CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler, RunEvent};
pub use crate::model::{Candidate, Contact, EventRegistration};
pub use crate::plan::{ArchivalPlan, MinimumContacts, PlanDecision};
pub use crate::pruner::{PruneSettings, Pruner, RunOutcome, RunReport};
