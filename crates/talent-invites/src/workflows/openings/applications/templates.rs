use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// The two invite flows supported by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteKind {
    JobLink,
    ExamSchedule,
}

impl InviteKind {
    pub const fn label(self) -> &'static str {
        match self {
            InviteKind::JobLink => "job opening invite",
            InviteKind::ExamSchedule => "test invite",
        }
    }
}

/// Exam window as entered by the recruiter; rendered verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamWindow {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub end_time: String,
}

/// Template selection plus the parameters it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteTemplate {
    JobLink,
    ExamSchedule(ExamWindow),
}

/// Values shared by both templates.
#[derive(Debug, Clone)]
pub struct InviteContext<'a> {
    pub candidate_name: &'a str,
    pub job_title: &'a str,
    pub company_name: &'a str,
    pub apply_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInvite {
    pub subject: String,
    pub html_body: String,
}

impl InviteTemplate {
    pub fn kind(&self) -> InviteKind {
        match self {
            InviteTemplate::JobLink => InviteKind::JobLink,
            InviteTemplate::ExamSchedule(_) => InviteKind::ExamSchedule,
        }
    }

    /// `company_name` must already carry the fallback; `subject_company` is the raw
    /// opening company, which the job-link subject prefers over the title when present.
    pub fn render(&self, context: &InviteContext<'_>, subject_company: &str) -> RenderedInvite {
        match self {
            InviteTemplate::JobLink => {
                let headline = if subject_company.trim().is_empty() {
                    context.job_title
                } else {
                    subject_company
                };
                RenderedInvite {
                    subject: format!("New Opening: {headline}"),
                    html_body: render_job_link(context),
                }
            }
            InviteTemplate::ExamSchedule(window) => RenderedInvite {
                subject: format!(
                    "Congratulations! Your Examination is Scheduled - {}",
                    context.job_title
                ),
                html_body: render_exam_schedule(context, window),
            },
        }
    }
}

fn render_job_link(context: &InviteContext<'_>) -> String {
    let mut html = String::new();
    writeln!(html, "<p>Hi {},</p>", escape_html(context.candidate_name)).expect("greeting");
    writeln!(
        html,
        "<p>{} has a new opening that matches your profile: <strong>{}</strong>.</p>",
        escape_html(context.company_name),
        escape_html(context.job_title)
    )
    .expect("opening paragraph");
    writeln!(
        html,
        "<p><a href=\"{}\">Sign in to view the opening and continue your application</a></p>",
        escape_html(context.apply_url)
    )
    .expect("apply link");
    writeln!(
        html,
        "<p>Regards,<br>{} Talent Team</p>",
        escape_html(context.company_name)
    )
    .expect("signature");
    html
}

fn render_exam_schedule(context: &InviteContext<'_>, window: &ExamWindow) -> String {
    let mut html = String::new();
    writeln!(html, "<p>Dear {},</p>", escape_html(context.candidate_name)).expect("greeting");
    writeln!(
        html,
        "<p>You have been shortlisted for <strong>{}</strong> at {}. Your online examination is scheduled as follows:</p>",
        escape_html(context.job_title),
        escape_html(context.company_name)
    )
    .expect("shortlist paragraph");
    html.push_str("<ul>");
    writeln!(
        html,
        "<li>Starts: {}</li>",
        escape_html(&window_slot(&window.start_date, &window.start_time))
    )
    .expect("start slot");
    writeln!(
        html,
        "<li>Ends: {}</li>",
        escape_html(&window_slot(&window.end_date, &window.end_time))
    )
    .expect("end slot");
    html.push_str("</ul>");
    writeln!(
        html,
        "<p><a href=\"{}\">Sign in to take the examination</a></p>",
        escape_html(context.apply_url)
    )
    .expect("exam link");
    writeln!(
        html,
        "<p>Best of luck,<br>{} Talent Team</p>",
        escape_html(context.company_name)
    )
    .expect("signature");
    html
}

fn window_slot(date: &str, time: &str) -> String {
    match (date.trim(), time.trim()) {
        ("", "") => "to be announced".to_string(),
        (date, "") => date.to_string(),
        ("", time) => time.to_string(),
        (date, time) => format!("{date} {time}"),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
