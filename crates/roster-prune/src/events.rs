//! Events and handlers for a pruning run.
//!
//! The [`Pruner`](crate::pruner::Pruner) reports every step of a run as a
//! [`RunEvent`]. Callers implement [`EventHandler`] to observe them.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or silent runs |
//! | [`LoggingHandler`] | The human-readable run log via `tracing` |
//! | [`FnEventHandler`] | Quick closures, e.g. recording events in tests |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::model::Candidate;
use crate::plan::ArchivalPlan;
use crate::pruner::RunReport;

/// Events emitted by the pruner during a run.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// The run is starting.
    Started { target: usize, dry_run: bool },
    /// The active-contact count is known and exceeds the target.
    OverTarget { plan: &'a ArchivalPlan },
    /// The active-contact count is at or under the target.
    NoActionRequired { plan: &'a ArchivalPlan },
    /// Minimum contacts plus buffer do not fit under the target.
    CapacityExceeded { plan: &'a ArchivalPlan },
    /// Minimum contacts fit; archiving will proceed.
    MarginAvailable { plan: &'a ArchivalPlan },
    /// A contact's registrations could not be checked.
    RegistrationCheckFailed {
        contact_id: u64,
        error: &'a ApiError,
        /// Whether the contact was kept (excluded from candidates or counted
        /// as a future registrant).
        kept: bool,
    },
    /// The ranked candidate list.
    CandidatesSelected { candidates: &'a [Candidate] },
    /// About to archive a candidate.
    Archiving {
        candidate: &'a Candidate,
        archived_so_far: usize,
        quota: usize,
    },
    /// A candidate was archived (or would have been, in a dry run).
    Archived { contact_id: u64, dry_run: bool },
    /// Archiving a candidate failed; the run continues with the next one.
    ArchiveFailed {
        contact_id: u64,
        error: &'a ApiError,
    },
    /// The removal quota was met.
    QuotaReached { archived: usize },
    /// Candidates ran out before the quota was met.
    CandidatesExhausted { archived: usize, quota: usize },
    /// The run finished.
    Finished { report: &'a RunReport },
}

/// Handler for run events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>) {
        let _ = event;
    }
}

/// A handler that ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
pub struct FnEventHandler<F>(F)
where
    F: Fn(&RunEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&RunEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&RunEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RunEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches each event to several handlers in registration order.
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &RunEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Writes the run log through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Started { target, dry_run } => {
                info!("Starting archival run (target {target} contacts)");
                if *dry_run {
                    info!("Dry run: no contact will be modified");
                }
            }
            RunEvent::OverTarget { plan } => {
                info!(
                    "Currently at {} contacts. Target is {}, attempting to remove {} contacts.",
                    plan.current, plan.target, plan.removal_quota
                );
            }
            RunEvent::NoActionRequired { plan } => {
                info!(
                    "Currently at {} contacts. Target is {}, no action required. Exiting",
                    plan.current, plan.target
                );
            }
            RunEvent::CapacityExceeded { plan } => {
                warn!(
                    "Currently at {} minimum contacts. Target is {}, we have more contacts than the target. Need to consider upgrading our plan.",
                    plan.minimum_required().unwrap_or_default(),
                    plan.target
                );
                log_breakdown(plan);
            }
            RunEvent::MarginAvailable { plan } => {
                info!(
                    "Currently at {} minimum contacts. Target is {}, we have {} contacts margin. Continuing to remove {} contacts.",
                    plan.minimum_required().unwrap_or_default(),
                    plan.target,
                    plan.margin().unwrap_or_default(),
                    plan.removal_quota
                );
                log_breakdown(plan);
            }
            RunEvent::RegistrationCheckFailed {
                contact_id,
                error,
                kept,
            } => {
                warn!(
                    "Unable to check event registrations for contact {contact_id}: {error}{}",
                    if *kept { " (keeping contact)" } else { "" }
                );
            }
            RunEvent::CandidatesSelected { candidates } => {
                info!(
                    "{} total candidates available for archive",
                    candidates.len()
                );
                for (i, c) in candidates.iter().enumerate() {
                    let login = c
                        .last_login
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string());
                    info!("  {:>3}. {} [{}] last login {login}", i + 1, c.id, c.label);
                }
            }
            RunEvent::Archiving { candidate, .. } => {
                info!("Archiving contact {}", candidate.id);
            }
            RunEvent::Archived {
                contact_id,
                dry_run,
            } => {
                if *dry_run {
                    info!("Dry run: contact {contact_id} left unchanged");
                } else {
                    debug!("Contact {contact_id} archived successfully");
                }
            }
            RunEvent::ArchiveFailed { contact_id, error } => {
                warn!("Unable to archive contact {contact_id}: {error}");
            }
            RunEvent::QuotaReached { archived } => {
                info!("Exiting after removing target contacts ({archived} archived)");
            }
            RunEvent::CandidatesExhausted { archived, quota } => {
                warn!("Ran out of candidates after archiving {archived} of {quota} contacts");
            }
            RunEvent::Finished { report } => {
                info!("Archival run finished: {}", report.summary());
            }
        }
    }
}

fn log_breakdown(plan: &ArchivalPlan) {
    if let Some(m) = plan.minimum {
        info!(
            "Minimum contact makeup: members={}, with balance={}, non-members with future registrations={}, buffer={}",
            m.members, m.with_balance, m.future_registrants, plan.buffer
        );
    }
}
