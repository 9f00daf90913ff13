use crate::cli::ServeArgs;
use crate::infra::{build_intake_service, cors_layer, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_intake::config::AppConfig;
use lead_intake::error::AppError;
use lead_intake::telemetry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        static_dir: Arc::new(config.storage.static_dir.clone()),
    };

    if !config.storage.static_dir.join("index.html").is_file() {
        warn!(
            static_dir = %config.storage.static_dir.display(),
            "frontend build not found, only the API will be served"
        );
    }

    let intake_service = build_intake_service(&config)?;
    info!(
        fund_config = %config.storage.fund_config_path.display(),
        webhook_signing = config.webhook.secret.is_some(),
        "lead intake service configured"
    );

    let app = with_service_routes(intake_service)
        .layer(Extension(app_state))
        .layer(cors_layer(&config.security))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead intake api ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
