use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::dispatch::{BulkDispatcher, DeliveryOutcome};
use super::domain::{
    ApplicationRecord, ApplicationStatusView, ApplicationSubmission, AppliedOpeningView,
    CandidateOverview, CandidateRef, CompletionChange, Opening, OpeningId,
};
use super::lease::{DispatchLeases, LeaseError};
use super::repository::{CandidateDirectory, OpeningRepository, RepositoryError};
use super::selection::{CandidateScope, EligibilitySelector, IdleReason, Selection};
use super::settings::InviteSettings;
use super::templates::{InviteKind, InviteTemplate};
use super::transport::{
    notify_best_effort, ChannelKey, MailTransport, NotificationEvent, NotificationSink,
};

/// Number of applications listed on the candidate overview.
pub const RECENT_APPLICATIONS: usize = 5;

/// Service composing the selector, dispatcher, repository, and notification hooks.
pub struct OpeningInviteService<R, D, M, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    mail: Arc<M>,
    notifications: Arc<N>,
    selector: EligibilitySelector,
    settings: InviteSettings,
    leases: DispatchLeases,
    clock: Arc<dyn Clock>,
}

/// How the completion signal identifies the candidate. The id wins when both are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateLookup {
    Id(CandidateRef),
    Email(String),
}

impl CandidateLookup {
    pub fn from_parts(
        candidate_id: Option<String>,
        email: Option<String>,
    ) -> Result<Self, ValidationError> {
        let candidate_id = candidate_id.filter(|value| !value.trim().is_empty());
        let email = email.filter(|value| !value.trim().is_empty());
        match (candidate_id, email) {
            (Some(id), _) => Ok(Self::Id(CandidateRef(id.trim().to_string()))),
            (None, Some(email)) => Ok(Self::Email(email.trim().to_string())),
            (None, None) => Err(ValidationError::MissingCandidateIdentity),
        }
    }
}

/// Caller-facing summary of a dispatch call. Idle calls are informational, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub opening_id: OpeningId,
    pub kind: InviteKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<IdleReason>,
    pub sent_count: usize,
    pub failed_count: usize,
    pub already_invited_count: usize,
    pub completed_test_count: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchSummary {
    fn idle(
        opening: &Opening,
        kind: InviteKind,
        selection: &Selection,
        reason: IdleReason,
    ) -> Self {
        let already_invited = selection.already_invited();
        let completed = selection.completed();
        let (message, detail) = match reason {
            IdleReason::NoResolvableCandidates => ("No valid candidates found".to_string(), None),
            IdleReason::AllInvitedOrCompleted => (
                format!("No new candidates to send {}", kind.label()),
                Some(format!(
                    "All candidates have either already received an invite ({already_invited}) or completed the test ({completed})."
                )),
            ),
            IdleReason::NoApplications => (
                format!("No new candidates to send {}", kind.label()),
                Some("No applications have been submitted for this opening.".to_string()),
            ),
            IdleReason::NothingNew => (
                format!("No new candidates to send {}", kind.label()),
                Some("All eligible candidates have already been processed.".to_string()),
            ),
        };

        Self {
            opening_id: opening.id.clone(),
            kind,
            message,
            detail,
            idle: Some(reason),
            sent_count: 0,
            failed_count: 0,
            already_invited_count: already_invited,
            completed_test_count: completed,
            outcomes: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle.is_some()
    }
}

/// Acknowledgement for the test-completion signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReceipt {
    pub opening_id: OpeningId,
    pub candidate: CandidateRef,
    pub already_completed: bool,
}

impl<R, D, M, N> OpeningInviteService<R, D, M, N>
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        mail: Arc<M>,
        notifications: Arc<N>,
        settings: InviteSettings,
    ) -> Self {
        Self::with_clock(
            repository,
            directory,
            mail,
            notifications,
            settings,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        repository: Arc<R>,
        directory: Arc<D>,
        mail: Arc<M>,
        notifications: Arc<N>,
        settings: InviteSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let selector = EligibilitySelector::new(settings.legacy_pending_eligible);
        Self {
            repository,
            directory,
            mail,
            notifications,
            selector,
            settings,
            leases: DispatchLeases::default(),
            clock,
        }
    }

    /// Record a candidate's application to an opening.
    pub fn apply(
        &self,
        opening_id: &OpeningId,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, InviteServiceError> {
        require_opening_id(opening_id)?;
        validate_submission(&submission)?;

        self.directory
            .find(&submission.candidate)?
            .ok_or_else(|| InviteServiceError::CandidateNotFound(submission.candidate.0.clone()))?;
        let opening = self.load_opening(opening_id)?;
        if opening.application(&submission.candidate).is_some() {
            return Err(InviteServiceError::DuplicateApplication);
        }

        let now = self.clock.now();
        let record = ApplicationRecord::new(&submission, now);
        self.repository
            .add_application(opening_id, record.clone())
            .map_err(|err| match err {
                RepositoryError::Conflict => InviteServiceError::DuplicateApplication,
                other => InviteServiceError::Repository(other),
            })?;

        let link = format!("/jobs/{}", opening.id);
        notify_best_effort(
            self.notifications.as_ref(),
            ChannelKey(record.candidate.0.clone()),
            NotificationEvent {
                message: format!(
                    "You have successfully applied to: {}",
                    opening.display_title()
                ),
                link: link.clone(),
                created_at: now,
            },
        );
        notify_best_effort(
            self.notifications.as_ref(),
            ChannelKey(opening.created_by.0.clone()),
            NotificationEvent {
                message: format!(
                    "New candidate applied: {} for {}",
                    record.name,
                    opening.display_title()
                ),
                link,
                created_at: now,
            },
        );

        info!(opening = %opening_id, candidate = %record.candidate, "application recorded");
        Ok(record)
    }

    /// Select eligible candidates and send them the given invite.
    pub fn dispatch_invites(
        &self,
        opening_id: &OpeningId,
        scope: CandidateScope,
        template: InviteTemplate,
    ) -> Result<DispatchSummary, InviteServiceError> {
        require_opening_id(opening_id)?;
        let _lease = self.leases.acquire(opening_id)?;

        // Read before the snapshot so an application committed meanwhile stays after the cursor.
        let now = self.clock.now();
        let mut opening = self.load_opening(opening_id)?;
        let kind = template.kind();
        let selection = self.selector.select(&opening, &scope);

        if selection.is_empty() {
            let reason = selection.idle_reason(&opening);
            info!(opening = %opening_id, ?reason, "no candidates eligible for invite");
            return Ok(DispatchSummary::idle(&opening, kind, &selection, reason));
        }

        let dispatcher = BulkDispatcher::new(
            self.repository.as_ref(),
            self.directory.as_ref(),
            self.mail.as_ref(),
            self.notifications.as_ref(),
            &self.settings,
        );
        let report = dispatcher.dispatch(
            &mut opening,
            &selection.eligible,
            &template,
            now,
        )?;

        if report.resolved == 0 {
            return Ok(DispatchSummary::idle(
                &opening,
                kind,
                &selection,
                IdleReason::NoResolvableCandidates,
            ));
        }

        let message = match kind {
            InviteKind::JobLink => {
                format!("Bulk JD invites sent to {} candidates.", report.sent_count)
            }
            InviteKind::ExamSchedule => {
                format!("Test invites sent to {} candidate(s).", report.sent_count)
            }
        };

        Ok(DispatchSummary {
            opening_id: opening.id.clone(),
            kind,
            message,
            detail: None,
            idle: None,
            sent_count: report.sent_count,
            failed_count: report.failed_count(),
            already_invited_count: selection.already_invited(),
            completed_test_count: selection.completed(),
            outcomes: report.outcomes,
        })
    }

    /// Apply the external "test completed" signal.
    pub fn mark_test_completed(
        &self,
        opening_id: &OpeningId,
        lookup: CandidateLookup,
    ) -> Result<CompletionReceipt, InviteServiceError> {
        require_opening_id(opening_id)?;
        let opening = self.load_opening(opening_id)?;

        let candidate = match &lookup {
            CandidateLookup::Id(id) => opening.application(id),
            CandidateLookup::Email(email) => opening.application_by_email(email),
        }
        .map(|record| record.candidate.clone())
        .ok_or(InviteServiceError::ApplicationNotFound)?;

        let now = self.clock.now();
        let mut change = CompletionChange::AlreadyCompleted;
        let updated = self
            .repository
            .modify_application(opening_id, &candidate, &mut |record| {
                change = record.mark_test_completed(now);
            })?;

        if change == CompletionChange::Completed {
            notify_best_effort(
                self.notifications.as_ref(),
                ChannelKey(opening.created_by.0.clone()),
                NotificationEvent {
                    message: format!(
                        "{} completed the test for {}",
                        updated.name,
                        opening.display_title()
                    ),
                    link: format!("/jobs/{}", opening.id),
                    created_at: now,
                },
            );
            info!(opening = %opening_id, candidate = %candidate, "test marked as completed");
        }

        Ok(CompletionReceipt {
            opening_id: opening.id,
            candidate,
            already_completed: change == CompletionChange::AlreadyCompleted,
        })
    }

    /// Application records of an opening with their delivery state.
    pub fn applications(
        &self,
        opening_id: &OpeningId,
    ) -> Result<Vec<ApplicationStatusView>, InviteServiceError> {
        require_opening_id(opening_id)?;
        let opening = self.load_opening(opening_id)?;
        Ok(opening
            .applications
            .iter()
            .map(ApplicationRecord::status_view)
            .collect())
    }

    /// Openings a candidate applied to, with the application date.
    pub fn applied_openings(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<AppliedOpeningView>, InviteServiceError> {
        let openings = self.repository.openings_for_candidate(candidate)?;
        Ok(openings
            .iter()
            .filter_map(|opening| {
                opening
                    .application(candidate)
                    .map(|record| AppliedOpeningView {
                        opening_id: opening.id.clone(),
                        title: opening.display_title().to_string(),
                        company_name: opening.company_name.clone(),
                        applied_at: record.applied_at,
                        status: record.status.label(),
                        mail_status: record.mail_status.label(),
                    })
            })
            .collect())
    }

    /// Applied count plus the latest applications, newest first.
    pub fn candidate_overview(
        &self,
        candidate: &CandidateRef,
    ) -> Result<CandidateOverview, InviteServiceError> {
        let mut latest = self.applied_openings(candidate)?;
        let applied_count = latest.len();
        latest.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        latest.truncate(RECENT_APPLICATIONS);

        Ok(CandidateOverview {
            candidate: candidate.clone(),
            applied_count,
            latest,
        })
    }

    pub fn settings(&self) -> &InviteSettings {
        &self.settings
    }

    fn load_opening(&self, opening_id: &OpeningId) -> Result<Opening, InviteServiceError> {
        self.repository
            .fetch(opening_id)?
            .ok_or_else(|| InviteServiceError::OpeningNotFound(opening_id.clone()))
    }
}

fn require_opening_id(opening_id: &OpeningId) -> Result<(), ValidationError> {
    if opening_id.0.trim().is_empty() {
        return Err(ValidationError::MissingOpeningId);
    }
    Ok(())
}

fn validate_submission(submission: &ApplicationSubmission) -> Result<(), ValidationError> {
    if submission.candidate.0.trim().is_empty() {
        return Err(ValidationError::MissingField("candidate"));
    }
    if submission.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if !submission.email.contains('@') {
        return Err(ValidationError::MissingField("email"));
    }
    Ok(())
}

/// Input problems detected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("opening id is required")]
    MissingOpeningId,
    #[error("either candidate_id or email is required")]
    MissingCandidateIdentity,
    #[error("field '{0}' is missing or invalid")]
    MissingField(&'static str),
}

/// Error raised by the invite service.
#[derive(Debug, thiserror::Error)]
pub enum InviteServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("opening {0} not found")]
    OpeningNotFound(OpeningId),
    #[error("candidate {0} not found")]
    CandidateNotFound(String),
    #[error("candidate not found in this job application")]
    ApplicationNotFound,
    #[error("already applied to this job")]
    DuplicateApplication,
    #[error("an invite dispatch is already running for opening {0}")]
    DispatchInProgress(OpeningId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl InviteServiceError {
    /// HTTP status reported for this error by the router and `AppError`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OpeningNotFound(_) | Self::CandidateNotFound(_) | Self::ApplicationNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::DuplicateApplication | Self::DispatchInProgress(_) => StatusCode::CONFLICT,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LeaseError> for InviteServiceError {
    fn from(value: LeaseError) -> Self {
        match value {
            LeaseError::Busy(opening) => Self::DispatchInProgress(opening),
            LeaseError::Poisoned => Self::Repository(RepositoryError::Unavailable(
                "dispatch lease table poisoned".to_string(),
            )),
        }
    }
}
