//! Run-scoped quota arithmetic.
//!
//! An [`ArchivalPlan`] is computed once per run from the active-contact count
//! and, when pruning is needed, the minimum-contact breakdown. It decides
//! whether the run archives anything and how many contacts at most.

/// Contact quota of the current plan tier.
pub const DEFAULT_CONTACT_TARGET: usize = 190;

/// Headroom kept between the unarchivable minimum and the target.
pub const DEFAULT_SAFETY_BUFFER: usize = 10;

/// Number of contacts to archive to get from `current` down to `target`.
pub fn removal_quota(current: usize, target: usize) -> usize {
    current.saturating_sub(target)
}

/// Contacts that can never be archived by this tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinimumContacts {
    pub members: usize,
    pub with_balance: usize,
    pub future_registrants: usize,
}

impl MinimumContacts {
    pub fn total(&self) -> usize {
        self.members + self.with_balance + self.future_registrants
    }
}

/// What the run should do, given the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    /// Already at or under target.
    NoAction,
    /// The unarchivable minimum plus buffer does not fit under the target.
    CapacityExceeded,
    /// Archive up to `removal_quota` contacts.
    Prune { removal_quota: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivalPlan {
    pub current: usize,
    pub target: usize,
    pub buffer: usize,
    pub removal_quota: usize,
    pub minimum: Option<MinimumContacts>,
}

impl ArchivalPlan {
    pub fn new(current: usize, target: usize, buffer: usize) -> Self {
        Self {
            current,
            target,
            buffer,
            removal_quota: removal_quota(current, target),
            minimum: None,
        }
    }

    pub fn needs_pruning(&self) -> bool {
        self.removal_quota > 0
    }

    pub fn with_minimum(mut self, minimum: MinimumContacts) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Unarchivable contacts plus the safety buffer.
    pub fn minimum_required(&self) -> Option<usize> {
        self.minimum.map(|m| m.total() + self.buffer)
    }

    /// `target - minimum_required`; negative when over capacity.
    pub fn margin(&self) -> Option<i64> {
        self.minimum_required()
            .map(|min| self.target as i64 - min as i64)
    }

    /// The decision for this plan. An over-target plan without a minimum
    /// breakdown is never prunable.
    pub fn decision(&self) -> PlanDecision {
        if !self.needs_pruning() {
            return PlanDecision::NoAction;
        }
        match self.margin() {
            Some(m) if m > 0 => PlanDecision::Prune {
                removal_quota: self.removal_quota,
            },
            _ => PlanDecision::CapacityExceeded,
        }
    }
}
