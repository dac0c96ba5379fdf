use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{CandidateProfile, CandidateRef, Opening};
use super::repository::{CandidateDirectory, OpeningRepository, RepositoryError};
use super::settings::InviteSettings;
use super::templates::{InviteContext, InviteTemplate};
use super::transport::{
    notify_best_effort, ChannelKey, MailTransport, NotificationEvent, NotificationSink,
    OutboundMail,
};

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub candidate: CandidateRef,
    pub email: String,
    #[serde(flatten)]
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Eligible ids that resolved to a candidate profile.
    pub resolved: usize,
    pub sent_count: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.delivery, Delivery::Failed { .. }))
            .count()
    }
}

/// Sequential send loop over an already selected set of candidates.
///
/// Transport failures are isolated per candidate. Each record is persisted right after its
/// send attempt; the opening's invite cursor is advanced once the loop finishes.
pub struct BulkDispatcher<'a, R, D, M, N> {
    repository: &'a R,
    directory: &'a D,
    mail: &'a M,
    notifications: &'a N,
    settings: &'a InviteSettings,
}

impl<'a, R, D, M, N> BulkDispatcher<'a, R, D, M, N>
where
    R: OpeningRepository,
    D: CandidateDirectory,
    M: MailTransport,
    N: NotificationSink,
{
    pub fn new(
        repository: &'a R,
        directory: &'a D,
        mail: &'a M,
        notifications: &'a N,
        settings: &'a InviteSettings,
    ) -> Self {
        Self {
            repository,
            directory,
            mail,
            notifications,
            settings,
        }
    }

    pub fn dispatch(
        &self,
        opening: &mut Opening,
        eligible: &[CandidateRef],
        template: &InviteTemplate,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport, RepositoryError> {
        let mut profiles: HashMap<CandidateRef, CandidateProfile> = self
            .directory
            .find_many(eligible)?
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        let mut report = DispatchReport::default();
        if profiles.is_empty() {
            return Ok(report);
        }

        let job_title = opening.display_title().to_string();
        let raw_company = opening.company_name.trim().to_string();
        let company_name = if raw_company.is_empty() {
            self.settings.company_fallback.clone()
        } else {
            raw_company.clone()
        };

        for id in eligible {
            let Some(profile) = profiles.remove(id) else {
                continue;
            };
            report.resolved += 1;

            let rendered = template.render(
                &InviteContext {
                    candidate_name: &profile.name,
                    job_title: &job_title,
                    company_name: &company_name,
                    apply_url: &self.settings.apply_url,
                },
                &raw_company,
            );
            let mail = OutboundMail {
                to: profile.email.clone(),
                subject: rendered.subject,
                html_body: rendered.html_body,
            };

            let delivery = match self.mail.send(&mail) {
                Ok(()) => {
                    report.sent_count += 1;
                    Delivery::Sent
                }
                Err(err) => {
                    warn!(opening = %opening.id, candidate = %id, error = %err, "invite send failed");
                    Delivery::Failed {
                        reason: err.to_string(),
                    }
                }
            };

            let updated =
                self.repository
                    .modify_application(&opening.id, id, &mut |record| match delivery {
                        Delivery::Sent => record.record_delivery(now),
                        Delivery::Failed { .. } => record.record_delivery_failure(now),
                    })?;
            if let Some(local) = opening.application_mut(id) {
                *local = updated;
            }

            if delivery == Delivery::Sent {
                notify_best_effort(
                    self.notifications,
                    ChannelKey(id.0.clone()),
                    NotificationEvent {
                        message: format!("Invitation sent for: {job_title}"),
                        link: format!("/jobs/{}", opening.id),
                        created_at: now,
                    },
                );
            }

            report.outcomes.push(DeliveryOutcome {
                candidate: id.clone(),
                email: profile.email,
                delivery,
            });
        }

        self.repository.advance_invite_cursor(&opening.id, now)?;
        opening.advance_invite_cursor(now);

        info!(
            opening = %opening.id,
            kind = template.kind().label(),
            sent = report.sent_count,
            failed = report.failed_count(),
            "invite batch dispatched"
        );
        Ok(report)
    }
}
