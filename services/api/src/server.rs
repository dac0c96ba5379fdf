use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryCandidateDirectory, InMemoryNotificationHub, InMemoryOpeningRepository,
    OutboxMailTransport, Stores,
};
use crate::routes::with_invite_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_invites::config::AppConfig;
use talent_invites::error::AppError;
use talent_invites::telemetry;
use talent_invites::workflows::openings::applications::{
    InviteServiceError, OpeningInviteService,
};
use talent_invites::workflows::openings::ApplicantRoster;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let stores = Stores {
        openings: Arc::new(InMemoryOpeningRepository::default()),
        directory: Arc::new(InMemoryCandidateDirectory::default()),
    };
    if let Some(path) = args.roster.take() {
        let entries = ApplicantRoster::from_path(&path)?;
        for entry in &entries {
            stores
                .directory
                .register(entry.profile())
                .map_err(InviteServiceError::from)?;
        }
        info!(path = %path.display(), candidates = entries.len(), "applicant roster registered");
    }

    let invite_service = Arc::new(OpeningInviteService::new(
        stores.openings.clone(),
        stores.directory.clone(),
        Arc::new(OutboxMailTransport::default()),
        Arc::new(InMemoryNotificationHub::default()),
        config.invites.clone(),
    ));

    let app = with_invite_routes(invite_service, stores)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent invite service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
