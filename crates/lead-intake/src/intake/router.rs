use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::catalog::{CatalogError, FundStore};
use super::domain::{utc_timestamp, FormSubmission, FundId, LeadSubmission};
use super::fund::FundDefinition;
use super::guard::{AuthError, ADMIN_KEY_HEADER, ADMIN_KEY_QUERY};
use super::service::{IntakeService, IntakeServiceError};
use super::webhook::WebhookTransport;

const SERVICE_NAME: &str = "lead-intake-api";
const FORWARDED_FOR: &str = "x-forwarded-for";

type SharedService<S, T> = Arc<IntakeService<S, T>>;

#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct FundCreate {
    pub id: String,
    #[serde(rename = "fundo")]
    pub fund: FundDefinition,
}

#[derive(Debug, Deserialize)]
pub struct FundUpdate {
    #[serde(rename = "fundo")]
    pub fund: FundDefinition,
}

/// Router exposing the public form API and the key-protected admin API.
pub fn intake_router<S, T>(service: SharedService<S, T>) -> Router
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let public = Router::new()
        .route("/api", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/form/validate", post(validate_handler::<S, T>))
        .route("/api/form/submit", post(submit_handler::<S, T>))
        .route("/api/form/config", get(form_config_handler::<S, T>))
        .route("/api/form/webhook", post(forward_handler::<S, T>));

    let admin = Router::new()
        .route("/api/admin/webhook", post(update_webhook_handler::<S, T>))
        .route("/api/admin/webhook-logs", get(webhook_logs_handler::<S, T>))
        .route(
            "/api/admin/fundos",
            get(list_funds_handler::<S, T>).post(create_fund_handler::<S, T>),
        )
        .route(
            "/api/admin/fundos/:fund_id",
            get(get_fund_handler::<S, T>)
                .put(update_fund_handler::<S, T>)
                .delete(deactivate_fund_handler::<S, T>),
        )
        .route(
            "/api/admin/avaliar-elegibilidade",
            post(evaluate_handler::<S, T>),
        )
        .route("/api/debug/webhook-test", post(webhook_test_handler::<S, T>))
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            require_admin::<S, T>,
        ));

    public.merge(admin).with_state(service)
}

/// Rejects admin requests lacking a valid key before they reach a handler.
pub(crate) async fn require_admin<S, T>(
    State(service): State<SharedService<S, T>>,
    request: Request,
    next: Next,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let client = client_address(&request, service.trusts_forwarded_for());
    let presented = presented_key(&request);

    match service.authorize(&client, presented.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            let status = match err {
                AuthError::MissingKey => StatusCode::UNAUTHORIZED,
                AuthError::InvalidKey => StatusCode::FORBIDDEN,
                AuthError::LockedOut { .. } => StatusCode::TOO_MANY_REQUESTS,
            };
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

fn presented_key(request: &Request) -> Option<String> {
    if let Some(value) = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return Some(value.to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(ADMIN_KEY_QUERY))
}

/// Socket peer address, or `unknown` when the connection carries none.
///
/// With `trust_forwarded_for` the first `X-Forwarded-For` hop wins; the header
/// is client-controlled unless a proxy overwrites it.
pub fn client_address(request: &Request, trust_forwarded_for: bool) -> String {
    trust_forwarded_for
        .then(|| forwarded_client(request.headers()))
        .flatten()
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) async fn index_handler() -> Response {
    let payload = json!({
        "message": "Lead Intake API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "submit": "/api/form/submit",
            "validate": "/api/form/validate",
            "config": "/api/form/config",
            "webhook": "/api/form/webhook",
            "admin": {
                "webhook": "/api/admin/webhook",
                "webhook_logs": "/api/admin/webhook-logs",
                "fundos": "/api/admin/fundos",
                "avaliar_elegibilidade": "/api/admin/avaliar-elegibilidade"
            }
        }
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn health_handler() -> Response {
    let payload = json!({
        "status": "healthy",
        "timestamp": utc_timestamp(),
        "service": SERVICE_NAME,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn validate_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(lead) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.validate_lead(lead) {
        Ok(lead) => {
            let payload = json!({
                "valid": true,
                "message": "lead data is valid",
                "lead": lead,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<FormSubmission>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    service.record_submission(&submission);
    let payload = json!({
        "success": true,
        "message": "form submitted successfully",
        "idempotency_key": submission.idempotency_key,
        "timestamp": submission.timestamp,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn form_config_handler<S, T>(
    State(service): State<SharedService<S, T>>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    match service.form_config() {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn forward_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<FormSubmission>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.forward_submission(&submission).await {
        Ok(delivery) => {
            let payload = json!({
                "success": true,
                "message": "form forwarded to webhook",
                "idempotency_key": submission.idempotency_key,
                "webhook_status": delivery.status_code,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeServiceError::Webhook(err)) => {
            let payload = json!({
                "error": "failed to forward to webhook",
                "message": "unable to process your submission at this time, please try again",
                "details": err.to_string(),
            });
            (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn update_webhook_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<WebhookUpdate>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.set_webhook_url(&update.webhook_url) {
        Ok(url) => {
            let payload = json!({
                "success": true,
                "message": "webhook url updated",
                "new_webhook_url": url,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn webhook_logs_handler<S, T>(
    State(service): State<SharedService<S, T>>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let payload = json!({
        "success": true,
        "logs": service.webhook_logs(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn list_funds_handler<S, T>(
    State(service): State<SharedService<S, T>>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    match service.list_funds() {
        Ok(listing) => {
            let payload = json!({
                "success": true,
                "fundos": listing.fundos,
                "opcoes_formulario": listing.opcoes_formulario,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_fund_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(fund_id): Path<String>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    match service.get_fund(&FundId(fund_id)) {
        Ok((fund, options)) => {
            let payload = json!({
                "success": true,
                "fundo": fund,
                "opcoes_formulario": options,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_fund_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<FundCreate>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.create_fund(&request.id, request.fund) {
        Ok(id) => {
            let payload = json!({
                "success": true,
                "message": "fund created",
                "fundo_id": id,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_fund_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(fund_id): Path<String>,
    payload: Result<Json<FundUpdate>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.update_fund(&FundId(fund_id), request.fund) {
        Ok(fund) => {
            let payload = json!({
                "success": true,
                "message": "fund updated",
                "fundo": fund,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn deactivate_fund_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(fund_id): Path<String>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    match service.deactivate_fund(&FundId(fund_id)) {
        Ok(()) => {
            let payload = json!({
                "success": true,
                "message": "fund deactivated",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluate_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    let Json(lead) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.evaluate_lead(lead) {
        Ok(result) => {
            let payload = json!({
                "success": true,
                "elegibilidade": result,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Connectivity failures are reported in the body, not as an HTTP error.
pub(crate) async fn webhook_test_handler<S, T>(
    State(service): State<SharedService<S, T>>,
) -> Response
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    match service.test_webhook().await {
        Ok(probe) => {
            let payload = json!({
                "success": probe.success,
                "status_code": probe.status_code,
                "response": probe.response,
                "message": "webhook test sent",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeServiceError::Webhook(err)) => {
            let payload = json!({
                "success": false,
                "error": err.to_string(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": rejection.body_text(),
    });
    (rejection.status(), Json(payload)).into_response()
}

fn error_response(err: IntakeServiceError) -> Response {
    let status = match &err {
        IntakeServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        IntakeServiceError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
        IntakeServiceError::Catalog(CatalogError::Store(_)) => {
            error!(error = %err, "fund catalog store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        IntakeServiceError::Catalog(_) => StatusCode::BAD_REQUEST,
        IntakeServiceError::Webhook(_) => StatusCode::BAD_GATEWAY,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
