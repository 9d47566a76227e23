use crate::cli::ServeArgs;
use crate::demo::sample_requetes;
use crate::infra::{load_directories, AppState, InMemoryRequeteRepository};
use crate::routes::with_affectation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use maltraitance_affectation::config::{AppConfig, AppEnvironment};
use maltraitance_affectation::error::AppError;
use maltraitance_affectation::telemetry;
use maltraitance_affectation::workflows::affectation::AffectationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let (communes, entites) = load_directories(&config.affectation)?;
    // outside production the sample complaints are preloaded
    let repository = if config.environment == AppEnvironment::Production {
        InMemoryRequeteRepository::default()
    } else {
        InMemoryRequeteRepository::seeded(sample_requetes())
    };
    let affectation_service = Arc::new(AffectationService::new(
        Arc::new(repository),
        Arc::new(communes),
        Arc::new(entites),
        &config.affectation,
    ));

    let app = with_affectation_routes(affectation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        fallback_region = %config.affectation.fallback_region_code,
        "complaint routing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
