//! The run controller: count, decide, select, archive.
//!
//! [`Pruner::run`] drives one pass over an account through a
//! [`MembershipApi`]:
//!
//! 1. Count active contacts. At or under target, stop with no writes.
//! 2. Count members, balance holders, and future registrants. If those plus
//!    the safety buffer do not fit under the target, stop with a capacity
//!    warning.
//! 3. Select and rank candidates, then archive them in order until the
//!    removal quota is met.

use std::fmt;

use chrono::{DateTime, Local, Utc};

use crate::api::MembershipApi;
use crate::archiver::{ArchiveFailure, Archiver, DEFAULT_ATTRIBUTION};
use crate::dates::note_date;
use crate::error::RunError;
use crate::events::{EventHandler, NoopHandler, RunEvent};
use crate::metrics::{collect_minimum, count_active_contacts};
use crate::plan::{ArchivalPlan, DEFAULT_CONTACT_TARGET, DEFAULT_SAFETY_BUFFER, PlanDecision};
use crate::selector::select_candidates;

/// Policy knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneSettings {
    pub target: usize,
    pub buffer: usize,
    pub attribution: String,
    pub dry_run: bool,
}

impl Default for PruneSettings {
    fn default() -> Self {
        Self {
            target: DEFAULT_CONTACT_TARGET,
            buffer: DEFAULT_SAFETY_BUFFER,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            dry_run: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NoActionRequired,
    CapacityExceeded,
    Completed,
}

/// Everything a finished run decided and did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub plan: ArchivalPlan,
    pub candidates_available: usize,
    pub archived: Vec<u64>,
    pub failed: Vec<ArchiveFailure>,
    pub dry_run: bool,
}

impl RunReport {
    fn stopped(outcome: RunOutcome, plan: ArchivalPlan, dry_run: bool) -> Self {
        Self {
            outcome,
            plan,
            candidates_available: 0,
            archived: Vec::new(),
            failed: Vec::new(),
            dry_run,
        }
    }

    /// Process exit code: 0 done, 2 over capacity, 3 done with failed writes.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::NoActionRequired => 0,
            RunOutcome::CapacityExceeded => 2,
            RunOutcome::Completed if !self.failed.is_empty() => 3,
            RunOutcome::Completed => 0,
        }
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            RunOutcome::NoActionRequired => write!(
                f,
                "no action required ({} of {} contacts)",
                self.plan.current, self.plan.target
            ),
            RunOutcome::CapacityExceeded => write!(
                f,
                "over capacity (minimum {} vs target {})",
                self.plan.minimum_required().unwrap_or_default(),
                self.plan.target
            ),
            RunOutcome::Completed => write!(
                f,
                "{} {} of {} requested ({} candidates, {} failed)",
                if self.dry_run { "would archive" } else { "archived" },
                self.archived.len(),
                self.plan.removal_quota,
                self.candidates_available,
                self.failed.len()
            ),
        }
    }
}

/// Runs the pruning policy against one account.
pub struct Pruner<'a> {
    api: &'a dyn MembershipApi,
    settings: PruneSettings,
    handler: &'a dyn EventHandler,
    now: Option<DateTime<Utc>>,
}

impl<'a> Pruner<'a> {
    pub fn new(api: &'a dyn MembershipApi, settings: PruneSettings) -> Self {
        Self {
            api,
            settings,
            handler: &NoopHandler,
            now: None,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Pin the clock used for registration checks and note dates.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let settings = &self.settings;
        let handler = self.handler;

        handler.on_event(&RunEvent::Started {
            target: settings.target,
            dry_run: settings.dry_run,
        });

        let current = count_active_contacts(self.api).await?;
        let mut plan = ArchivalPlan::new(current, settings.target, settings.buffer);

        if !plan.needs_pruning() {
            handler.on_event(&RunEvent::NoActionRequired { plan: &plan });
            return Ok(self.finish(RunReport::stopped(
                RunOutcome::NoActionRequired,
                plan,
                settings.dry_run,
            )));
        }
        handler.on_event(&RunEvent::OverTarget { plan: &plan });

        let minimum = collect_minimum(self.api, now, handler).await?;
        plan = plan.with_minimum(minimum);

        let quota = match plan.decision() {
            PlanDecision::Prune { removal_quota } => removal_quota,
            PlanDecision::NoAction | PlanDecision::CapacityExceeded => {
                handler.on_event(&RunEvent::CapacityExceeded { plan: &plan });
                return Ok(self.finish(RunReport::stopped(
                    RunOutcome::CapacityExceeded,
                    plan,
                    settings.dry_run,
                )));
            }
        };
        handler.on_event(&RunEvent::MarginAvailable { plan: &plan });

        let candidates = select_candidates(self.api, now, handler).await?;
        handler.on_event(&RunEvent::CandidatesSelected {
            candidates: &candidates,
        });

        let date = note_date(now.with_timezone(&Local));
        let archiver = Archiver::new(settings.attribution.clone()).with_dry_run(settings.dry_run);
        let outcome = archiver
            .archive_until_quota(self.api, &candidates, quota, &date, handler)
            .await;

        Ok(self.finish(RunReport {
            outcome: RunOutcome::Completed,
            plan,
            candidates_available: candidates.len(),
            archived: outcome.archived,
            failed: outcome.failed,
            dry_run: settings.dry_run,
        }))
    }

    fn finish(&self, report: RunReport) -> RunReport {
        self.handler.on_event(&RunEvent::Finished { report: &report });
        report
    }
}
