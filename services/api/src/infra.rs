use axum::http::{header, HeaderName, HeaderValue, Method};
use lead_intake::config::{AppConfig, SecurityConfig};
use lead_intake::error::AppError;
use lead_intake::intake::{
    evaluate, AdminGuard, EligibilityResult, FundCatalog, FundStore, HttpWebhookTransport,
    IntakeService, JsonFileFundStore, LeadSubmission, LeadValidator, LoginAttemptLimiter,
    WebhookError, WebhookForwarder, WebhookLogBuffer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

pub(crate) type LiveIntakeService = IntakeService<JsonFileFundStore, HttpWebhookTransport>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) static_dir: Arc<PathBuf>,
}

/// Wires the file-backed catalog, HTTP webhook transport and admin guard from configuration.
pub(crate) fn build_intake_service(config: &AppConfig) -> Result<Arc<LiveIntakeService>, AppError> {
    let store = Arc::new(JsonFileFundStore::new(&config.storage.fund_config_path));
    let catalog = Arc::new(FundCatalog::new(store));

    let transport =
        HttpWebhookTransport::new(config.webhook.timeout).map_err(WebhookError::from)?;
    let forwarder = Arc::new(WebhookForwarder::new(
        Arc::new(transport),
        config.webhook.secret.clone(),
    ));

    let limiter = LoginAttemptLimiter::new(
        config.security.max_login_attempts,
        config.security.lockout,
    );
    let guard = Arc::new(
        AdminGuard::new(config.security.admin_api_key.clone(), limiter)
            .trusting_forwarded_for(config.security.trust_forwarded_for),
    );

    Ok(Arc::new(IntakeService::new(
        catalog,
        forwarder,
        Arc::new(WebhookLogBuffer::new(config.webhook.log_capacity)),
        guard,
    )))
}

/// Wildcard origins allow any caller without credentials; explicit lists allow credentials.
pub(crate) fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}

/// Loads a catalog and a lead from disk and classifies the lead.
pub(crate) fn evaluate_files(
    funds_path: &Path,
    lead_path: &Path,
    validate: bool,
) -> Result<EligibilityResult, AppError> {
    let document = JsonFileFundStore::new(funds_path).load()?;
    let raw = std::fs::read_to_string(lead_path)?;
    let mut lead: LeadSubmission = serde_json::from_str(&raw).map_err(std::io::Error::from)?;

    if validate {
        lead = LeadValidator::new().validate(lead)?;
    }

    Ok(evaluate(&lead.profile(), &document.funds))
}
