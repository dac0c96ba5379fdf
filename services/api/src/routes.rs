use crate::infra::{AppState, InviteService, Stores};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use talent_invites::workflows::openings::applications::{
    invite_router, CandidateProfile, CandidateRef, Opening, OpeningId, OpeningRepository,
    RepositoryError, UserRef,
};

#[derive(Debug, Deserialize)]
pub(crate) struct CreateOpeningRequest {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) company_name: String,
    pub(crate) created_by: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterCandidateRequest {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
}

pub(crate) fn with_invite_routes(service: Arc<InviteService>, stores: Stores) -> axum::Router {
    invite_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/openings", post(create_opening_endpoint))
        .route("/api/v1/candidates", post(register_candidate_endpoint))
        .layer(Extension(stores))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn create_opening_endpoint(
    Extension(stores): Extension<Stores>,
    Json(request): Json<CreateOpeningRequest>,
) -> Response {
    if request.id.trim().is_empty() || request.created_by.trim().is_empty() {
        return error_payload(StatusCode::BAD_REQUEST, "id and created_by are required");
    }

    let opening = Opening::new(
        OpeningId(request.id.trim().to_string()),
        request.title,
        request.company_name,
        UserRef(request.created_by.trim().to_string()),
    );
    match stores.openings.insert(opening) {
        Ok(opening) => (StatusCode::CREATED, Json(opening)).into_response(),
        Err(err) => store_error(err),
    }
}

pub(crate) async fn register_candidate_endpoint(
    Extension(stores): Extension<Stores>,
    Json(request): Json<RegisterCandidateRequest>,
) -> Response {
    if request.id.trim().is_empty() || !request.email.contains('@') {
        return error_payload(StatusCode::BAD_REQUEST, "id and a valid email are required");
    }

    let profile = CandidateProfile {
        id: CandidateRef(request.id.trim().to_string()),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
    };
    match stores.directory.register(profile.clone()) {
        Ok(()) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(err) => store_error(err),
    }
}

fn store_error(err: RepositoryError) -> Response {
    let status = match err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, &err.to_string())
}

fn error_payload(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
