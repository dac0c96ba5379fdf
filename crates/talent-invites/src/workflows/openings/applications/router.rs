use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationSubmission, CandidateRef, OpeningId};
use super::repository::{CandidateDirectory, OpeningRepository};
use super::selection::CandidateScope;
use super::service::{CandidateLookup, InviteServiceError, OpeningInviteService};
use super::templates::{ExamWindow, InviteTemplate};
use super::transport::{MailTransport, NotificationSink};

type SharedService<R, D, M, N> = Arc<OpeningInviteService<R, D, M, N>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JobLinkInviteRequest {
    #[serde(default)]
    pub(crate) candidate_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExamInviteRequest {
    #[serde(default)]
    pub(crate) candidate_ids: Vec<String>,
    #[serde(flatten)]
    pub(crate) window: ExamWindow,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompletionRequest {
    #[serde(default)]
    pub(crate) candidate_id: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

/// Router builder exposing application intake, invite dispatch, and completion endpoints.
pub fn invite_router<R, D, M, N>(service: SharedService<R, D, M, N>) -> Router
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/openings/:opening_id/applications",
            post(apply_handler::<R, D, M, N>).get(applications_handler::<R, D, M, N>),
        )
        .route(
            "/api/v1/openings/:opening_id/invites/job-link",
            post(job_link_handler::<R, D, M, N>),
        )
        .route(
            "/api/v1/openings/:opening_id/invites/exam",
            post(exam_handler::<R, D, M, N>),
        )
        .route(
            "/api/v1/openings/:opening_id/test-completions",
            post(completion_handler::<R, D, M, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/applications",
            get(applied_openings_handler::<R, D, M, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/overview",
            get(candidate_overview_handler::<R, D, M, N>),
        )
        .with_state(service)
}

pub(crate) async fn apply_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(opening_id): Path<String>,
    Json(submission): Json<ApplicationSubmission>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    match service.apply(&OpeningId(opening_id), submission) {
        Ok(record) => (StatusCode::CREATED, Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn applications_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(opening_id): Path<String>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    match service.applications(&OpeningId(opening_id)) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_link_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(opening_id): Path<String>,
    Json(request): Json<JobLinkInviteRequest>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    let scope = scope_from(request.candidate_ids);
    match service.dispatch_invites(&OpeningId(opening_id), scope, InviteTemplate::JobLink) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn exam_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(opening_id): Path<String>,
    Json(request): Json<ExamInviteRequest>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    let scope = scope_from(request.candidate_ids);
    let template = InviteTemplate::ExamSchedule(request.window);
    match service.dispatch_invites(&OpeningId(opening_id), scope, template) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn completion_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(opening_id): Path<String>,
    Json(request): Json<CompletionRequest>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    let lookup = match CandidateLookup::from_parts(request.candidate_id, request.email) {
        Ok(lookup) => lookup,
        Err(err) => return error_response(err.into()),
    };

    match service.mark_test_completed(&OpeningId(opening_id), lookup) {
        Ok(receipt) => {
            let payload = json!({
                "message": "Test marked as completed",
                "opening_id": receipt.opening_id,
                "candidate_id": receipt.candidate,
                "already_completed": receipt.already_completed,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn applied_openings_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    match service.applied_openings(&CandidateRef(candidate_id)) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn candidate_overview_handler<R, D, M, N>(
    State(service): State<SharedService<R, D, M, N>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: OpeningRepository + 'static,
    D: CandidateDirectory + 'static,
    M: MailTransport + 'static,
    N: NotificationSink + 'static,
{
    match service.candidate_overview(&CandidateRef(candidate_id)) {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Any supplied list selects explicit mode, even when every entry is blank.
fn scope_from(candidate_ids: Vec<String>) -> CandidateScope {
    if candidate_ids.is_empty() {
        return CandidateScope::Auto;
    }

    CandidateScope::Explicit(
        candidate_ids
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .map(|id| CandidateRef(id.trim().to_string()))
            .collect(),
    )
}

fn error_response(err: InviteServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (err.status_code(), Json(payload)).into_response()
}
