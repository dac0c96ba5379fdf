use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for job openings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpeningId(pub String);

/// Non-owning reference to a candidate account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateRef(pub String);

/// Recruiter account that owns an opening.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef(pub String);

impl fmt::Display for OpeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CandidateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statuses produced by the current application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveStatus {
    Applied,
    LinkSent,
    Completed,
}

/// Statuses found on historical records only. New writes never produce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyStatus {
    Pending,
    Filtered,
    Unfiltered,
}

/// Lifecycle status of an application record.
///
/// Serialized as the flat lowercase label (`"applied"`, `"link_sent"`, `"pending"`, ...), so
/// historical documents round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApplicationStatus {
    Active(ActiveStatus),
    Legacy(LegacyStatus),
}

impl ApplicationStatus {
    pub const APPLIED: Self = Self::Active(ActiveStatus::Applied);
    pub const LINK_SENT: Self = Self::Active(ActiveStatus::LinkSent);
    pub const COMPLETED: Self = Self::Active(ActiveStatus::Completed);

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active(ActiveStatus::Applied) => "applied",
            Self::Active(ActiveStatus::LinkSent) => "link_sent",
            Self::Active(ActiveStatus::Completed) => "completed",
            Self::Legacy(LegacyStatus::Pending) => "pending",
            Self::Legacy(LegacyStatus::Filtered) => "filtered",
            Self::Legacy(LegacyStatus::Unfiltered) => "unfiltered",
        }
    }

    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Active(ActiveStatus::Completed))
    }
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        Self::APPLIED
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "applied" => Ok(Self::APPLIED),
            "link_sent" => Ok(Self::LINK_SENT),
            "completed" => Ok(Self::COMPLETED),
            "pending" => Ok(Self::Legacy(LegacyStatus::Pending)),
            "filtered" => Ok(Self::Legacy(LegacyStatus::Filtered)),
            "unfiltered" => Ok(Self::Legacy(LegacyStatus::Unfiltered)),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.label().to_string()
    }
}

/// Delivery state of the invite e-mail for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailStatus {
    #[default]
    NotSent,
    Sent,
    Failed,
    /// Reserved for bounce callbacks; never written by the dispatch engine.
    Bounced,
}

impl MailStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MailStatus::NotSent => "not_sent",
            MailStatus::Sent => "sent",
            MailStatus::Failed => "failed",
            MailStatus::Bounced => "bounced",
        }
    }
}

/// One candidate's application to one opening.
///
/// Mail tracking fields default on load so documents written before delivery tracking
/// existed deserialize as `not_sent` with empty timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub candidate: CandidateRef,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub reallocate: bool,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub mail_status: MailStatus,
    #[serde(default)]
    pub mail_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_explanation: Option<String>,
}

/// Result of applying the test-completion signal to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    Completed,
    AlreadyCompleted,
}

impl ApplicationRecord {
    pub fn new(submission: &ApplicationSubmission, applied_at: DateTime<Utc>) -> Self {
        Self {
            candidate: submission.candidate.clone(),
            name: submission.name.trim().to_string(),
            email: submission.email.trim().to_string(),
            phone: submission.phone.clone(),
            resume: submission.resume.clone(),
            reallocate: submission.reallocate,
            applied_at,
            status: ApplicationStatus::APPLIED,
            mail_status: MailStatus::NotSent,
            mail_sent_at: None,
            invited_at: None,
            test_completed_at: None,
            ai_score: None,
            ai_explanation: None,
        }
    }

    pub fn is_invited(&self) -> bool {
        self.mail_status == MailStatus::Sent
    }

    pub fn has_completed_test(&self) -> bool {
        self.test_completed_at.is_some()
    }

    /// Apply a successful invite delivery. A completed record keeps its status.
    pub fn record_delivery(&mut self, at: DateTime<Utc>) {
        if !self.status.is_completed() {
            self.status = ApplicationStatus::LINK_SENT;
        }
        self.invited_at = Some(at);
        self.mail_status = MailStatus::Sent;
        self.mail_sent_at = Some(at);
    }

    /// Apply a failed delivery attempt. The status is left untouched.
    pub fn record_delivery_failure(&mut self, at: DateTime<Utc>) {
        self.invited_at = Some(at);
        self.mail_status = MailStatus::Failed;
    }

    /// Move the record to `completed`. Repeated signals keep the first completion time.
    pub fn mark_test_completed(&mut self, at: DateTime<Utc>) -> CompletionChange {
        if self.test_completed_at.is_some() {
            self.status = ApplicationStatus::COMPLETED;
            return CompletionChange::AlreadyCompleted;
        }

        self.test_completed_at = Some(at);
        self.status = ApplicationStatus::COMPLETED;
        CompletionChange::Completed
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            candidate: self.candidate.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            status: self.status.label(),
            mail_status: self.mail_status.label(),
            applied_at: self.applied_at,
            invited_at: self.invited_at,
            mail_sent_at: self.mail_sent_at,
            test_completed_at: self.test_completed_at,
        }
    }
}

/// Applicant supplied snapshot captured when a candidate applies to an opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub candidate: CandidateRef,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub reallocate: bool,
}

/// Job opening document with its embedded application records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub id: OpeningId,
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    pub created_by: UserRef,
    /// Invite cursor: applications at or before this instant are no longer "new".
    #[serde(default)]
    pub last_invite_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("candidate {0} already applied to this opening")]
pub struct DuplicateApplication(pub CandidateRef);

impl Opening {
    pub fn new(
        id: OpeningId,
        title: impl Into<String>,
        company_name: impl Into<String>,
        created_by: UserRef,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            company_name: company_name.into(),
            created_by,
            last_invite_at: None,
            applications: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Job Opening"
        } else {
            title
        }
    }

    pub fn application(&self, candidate: &CandidateRef) -> Option<&ApplicationRecord> {
        self.applications
            .iter()
            .find(|record| &record.candidate == candidate)
    }

    pub fn application_mut(&mut self, candidate: &CandidateRef) -> Option<&mut ApplicationRecord> {
        self.applications
            .iter_mut()
            .find(|record| &record.candidate == candidate)
    }

    pub fn application_by_email(&self, email: &str) -> Option<&ApplicationRecord> {
        let email = email.trim();
        self.applications.iter().find(|record| record.email == email)
    }

    /// Append a record, refusing a second application from the same candidate.
    pub fn admit(&mut self, record: ApplicationRecord) -> Result<(), DuplicateApplication> {
        if self.application(&record.candidate).is_some() {
            return Err(DuplicateApplication(record.candidate));
        }
        self.applications.push(record);
        Ok(())
    }

    /// Move the invite cursor forward. Earlier instants are ignored.
    pub fn advance_invite_cursor(&mut self, at: DateTime<Utc>) {
        match self.last_invite_at {
            Some(current) if current >= at => {}
            _ => self.last_invite_at = Some(at),
        }
    }
}

/// Directory entry used to address invite e-mails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: CandidateRef,
    pub name: String,
    pub email: String,
}

/// Sanitized representation of a record's lifecycle and delivery state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatusView {
    pub candidate: CandidateRef,
    pub name: String,
    pub email: String,
    pub status: &'static str,
    pub mail_status: &'static str,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_completed_at: Option<DateTime<Utc>>,
}

/// Opening a candidate applied to, as listed on the candidate dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedOpeningView {
    pub opening_id: OpeningId,
    pub title: String,
    pub company_name: String,
    pub applied_at: DateTime<Utc>,
    pub status: &'static str,
    pub mail_status: &'static str,
}

/// Candidate dashboard counts with the most recent applications first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateOverview {
    pub candidate: CandidateRef,
    pub applied_count: usize,
    pub latest: Vec<AppliedOpeningView>,
}
