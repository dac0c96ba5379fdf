use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    ActiveStatus, ApplicationRecord, ApplicationStatus, CandidateRef, LegacyStatus, Opening,
};

/// Which records a dispatch call should consider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CandidateScope {
    /// Every new application since the opening's last invite batch.
    #[default]
    Auto,
    /// Exactly the listed candidates, still subject to delivery checks.
    Explicit(Vec<CandidateRef>),
}

impl CandidateScope {
    /// An empty list falls back to auto-selection.
    pub fn from_ids(ids: Vec<CandidateRef>) -> Self {
        if ids.is_empty() {
            Self::Auto
        } else {
            Self::Explicit(ids)
        }
    }
}

/// Why a record was left out of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    AlreadyInvited,
    TestCompleted,
    StatusNotEligible,
    PredatesLastInvite,
}

/// Outcome of a selection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub eligible: Vec<CandidateRef>,
    pub exclusions: BTreeMap<CandidateRef, ExclusionReason>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }

    pub fn already_invited(&self) -> usize {
        self.count(ExclusionReason::AlreadyInvited)
    }

    pub fn completed(&self) -> usize {
        self.count(ExclusionReason::TestCompleted)
    }

    fn count(&self, reason: ExclusionReason) -> usize {
        self.exclusions
            .values()
            .filter(|found| **found == reason)
            .count()
    }

    /// Explain an empty selection.
    pub fn idle_reason(&self, opening: &Opening) -> IdleReason {
        if self.already_invited() > 0 || self.completed() > 0 {
            IdleReason::AllInvitedOrCompleted
        } else if opening.applications.is_empty() {
            IdleReason::NoApplications
        } else {
            IdleReason::NothingNew
        }
    }
}

/// Informational reason returned instead of an error when nobody is eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleReason {
    AllInvitedOrCompleted,
    NoApplications,
    NothingNew,
    NoResolvableCandidates,
}

/// Decides which application records receive an invite on a dispatch call.
#[derive(Debug, Clone)]
pub struct EligibilitySelector {
    legacy_pending_eligible: bool,
}

impl Default for EligibilitySelector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EligibilitySelector {
    pub fn new(legacy_pending_eligible: bool) -> Self {
        Self {
            legacy_pending_eligible,
        }
    }

    pub fn select(&self, opening: &Opening, scope: &CandidateScope) -> Selection {
        let selection = match scope {
            CandidateScope::Explicit(ids) => select_explicit(opening, ids),
            CandidateScope::Auto => self.select_new(opening),
        };

        debug!(
            opening = %opening.id,
            eligible = selection.eligible.len(),
            excluded = selection.exclusions.len(),
            "invite selection computed"
        );
        selection
    }

    fn select_new(&self, opening: &Opening) -> Selection {
        let mut selection = Selection::default();

        for record in &opening.applications {
            let reason = if !self.status_eligible(record.status) {
                Some(ExclusionReason::StatusNotEligible)
            } else if opening
                .last_invite_at
                .is_some_and(|cursor| record.applied_at <= cursor)
            {
                Some(ExclusionReason::PredatesLastInvite)
            } else {
                delivery_exclusion(record)
            };

            match reason {
                Some(reason) => {
                    selection.exclusions.insert(record.candidate.clone(), reason);
                }
                None => selection.eligible.push(record.candidate.clone()),
            }
        }

        selection
    }

    fn status_eligible(&self, status: ApplicationStatus) -> bool {
        match status {
            ApplicationStatus::Active(ActiveStatus::Applied) => true,
            ApplicationStatus::Legacy(LegacyStatus::Pending) => self.legacy_pending_eligible,
            ApplicationStatus::Active(_) | ApplicationStatus::Legacy(_) => false,
        }
    }
}

fn select_explicit(opening: &Opening, ids: &[CandidateRef]) -> Selection {
    let mut selection = Selection::default();
    let mut seen = HashSet::new();

    for id in ids {
        if !seen.insert(id) {
            continue;
        }
        // Ids without a record are dropped without counting.
        let Some(record) = opening.application(id) else {
            continue;
        };

        match delivery_exclusion(record) {
            Some(reason) => {
                selection.exclusions.insert(id.clone(), reason);
            }
            None => selection.eligible.push(id.clone()),
        }
    }

    selection
}

/// Already invited is checked before completed so each record counts once.
fn delivery_exclusion(record: &ApplicationRecord) -> Option<ExclusionReason> {
    if record.is_invited() {
        Some(ExclusionReason::AlreadyInvited)
    } else if record.has_completed_test() {
        Some(ExclusionReason::TestCompleted)
    } else {
        None
    }
}
