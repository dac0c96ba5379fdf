use crate::infra::{
    InMemoryCandidateDirectory, InMemoryNotificationHub, InMemoryOpeningRepository,
    OutboxMailTransport,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use talent_invites::config::AppConfig;
use talent_invites::error::AppError;
use talent_invites::workflows::openings::applications::{
    ApplicationRecord, CandidateLookup, CandidateRef, CandidateScope, Delivery, DispatchSummary,
    ExamWindow, InviteServiceError, InviteTemplate, Opening, OpeningId, OpeningInviteService,
    OpeningRepository, UserRef,
};
use talent_invites::workflows::openings::{ApplicantRoster, RosterEntry};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Applicant roster CSV (candidate_id,name,email,phone,applied_at). Defaults to a built-in sample.
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
    /// Title of the demo opening.
    #[arg(long, default_value = "Backend Engineer")]
    pub(crate) title: String,
    /// Company shown in invites; leave unset to see the configured fallback.
    #[arg(long)]
    pub(crate) company: Option<String>,
    /// Exam start date shown in the scheduled exam invite.
    #[arg(long, default_value = "")]
    pub(crate) exam_date: String,
    /// Exam start time shown in the scheduled exam invite.
    #[arg(long, default_value = "")]
    pub(crate) exam_time: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster,
        title,
        company,
        exam_date,
        exam_time,
    } = args;

    let settings = AppConfig::load()?.invites;
    let entries = match roster {
        Some(path) => ApplicantRoster::from_path(path)?,
        None => sample_roster(),
    };

    let openings = Arc::new(InMemoryOpeningRepository::default());
    let directory = Arc::new(InMemoryCandidateDirectory::default());
    let mail = Arc::new(OutboxMailTransport::default());
    let notifications = Arc::new(InMemoryNotificationHub::default());

    let opening_id = OpeningId("demo-opening".to_string());
    let mut opening = Opening::new(
        opening_id.clone(),
        title,
        company.unwrap_or_default(),
        UserRef("demo-recruiter".to_string()),
    );

    // Rows with an application date are imported as historical records.
    let mut live = Vec::new();
    for entry in &entries {
        directory
            .register(entry.profile())
            .map_err(InviteServiceError::from)?;
        match entry.applied_at {
            Some(applied_at) => {
                let record = ApplicationRecord::new(&entry.submission(), applied_at);
                if let Err(err) = opening.admit(record) {
                    println!("  Skipped roster row: {err}");
                }
            }
            None => live.push(entry),
        }
    }
    let imported = opening.applications.len();
    openings
        .insert(opening)
        .map_err(InviteServiceError::from)?;

    let service = OpeningInviteService::new(
        openings.clone(),
        directory,
        mail.clone(),
        notifications.clone(),
        settings,
    );

    println!("Invite dispatch demo");
    println!(
        "- Opening {} with {} imported application(s)",
        opening_id, imported
    );
    for entry in live {
        match service.apply(&opening_id, entry.submission()) {
            Ok(record) => println!(
                "- {} applied -> status {}",
                record.name,
                record.status.label()
            ),
            Err(err) => println!("- {} rejected: {}", entry.name, err),
        }
    }

    println!("\nJob link invites (auto-select)");
    let summary = service.dispatch_invites(
        &opening_id,
        CandidateScope::Auto,
        InviteTemplate::JobLink,
    )?;
    render_summary(&summary);

    println!("\nRepeat auto-select dispatch");
    let repeat = service.dispatch_invites(
        &opening_id,
        CandidateScope::Auto,
        InviteTemplate::JobLink,
    )?;
    render_summary(&repeat);

    let first = entries.first().map(|entry| entry.candidate.clone());
    if let Some(candidate) = &first {
        let receipt =
            service.mark_test_completed(&opening_id, CandidateLookup::Id(candidate.clone()))?;
        println!(
            "\nTest completion recorded for {} (already completed: {})",
            receipt.candidate, receipt.already_completed
        );
    }

    println!("\nScheduled exam invites (explicit list)");
    let everyone: Vec<CandidateRef> = entries.iter().map(|entry| entry.candidate.clone()).collect();
    let exam = service.dispatch_invites(
        &opening_id,
        CandidateScope::from_ids(everyone),
        InviteTemplate::ExamSchedule(ExamWindow {
            start_date: exam_date,
            start_time: exam_time,
            ..ExamWindow::default()
        }),
    )?;
    render_summary(&exam);

    println!("\nApplication status");
    for view in service.applications(&opening_id)? {
        println!(
            "  - {:<20} {:<10} mail={}",
            view.name, view.status, view.mail_status
        );
    }

    println!(
        "\nOutbox: {} message(s) | live notifications: {}",
        mail.outbox().len(),
        notifications.events().len()
    );
    if let Some(message) = mail.outbox().first() {
        println!("  First subject: {}", message.subject);
    }

    Ok(())
}

fn render_summary(summary: &DispatchSummary) {
    println!("- {}", summary.message);
    if let Some(detail) = &summary.detail {
        println!("  {}", detail);
    }
    println!(
        "  sent {} | failed {} | already invited {} | completed test {}",
        summary.sent_count,
        summary.failed_count,
        summary.already_invited_count,
        summary.completed_test_count
    );
    for outcome in &summary.outcomes {
        match &outcome.delivery {
            Delivery::Sent => println!("    - {} <{}>: sent", outcome.candidate, outcome.email),
            Delivery::Failed { reason } => println!(
                "    - {} <{}>: failed ({})",
                outcome.candidate, outcome.email, reason
            ),
        }
    }
}

fn sample_roster() -> Vec<RosterEntry> {
    [
        ("cand-ada", "Ada Lovelace", "ada@example.com"),
        ("cand-grace", "Grace Hopper", "grace@example.com"),
        ("cand-linus", "Linus Byte", "linus@mail.invalid"),
    ]
    .into_iter()
    .map(|(id, name, email)| RosterEntry {
        candidate: CandidateRef(id.to_string()),
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        applied_at: None,
    })
    .collect()
}
