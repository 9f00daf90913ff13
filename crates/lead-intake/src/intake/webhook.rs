use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, info, warn};

use super::domain::{utc_timestamp, LeadSubmission};

type HmacSha256 = Hmac<Sha256>;

pub const USER_AGENT: &str = "lead-intake/1.0";
pub const SIGNATURE_HEADER: &str = "X-Intake-Signature";
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_ATTEMPTS: u32 = 2;
const QUOTED_BODY_CHARS: usize = 500;
const PROBE_BODY_CHARS: usize = 200;
const UNKNOWN_LEAD: &str = "Unknown";

/// Outgoing POST prepared by the forwarder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("webhook request timed out")]
    Timeout,
    #[error("webhook request failed: {0}")]
    Request(String),
}

/// Delivers a prepared request to the workflow platform.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, request: WebhookRequest) -> Result<WebhookResponse, TransportError>;
}

/// `reqwest` transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpWebhookTransport {
    client: reqwest::Client,
}

impl HttpWebhookTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(&self, request: WebhookRequest) -> Result<WebhookResponse, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(WebhookResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook url is invalid or not configured")]
    InvalidUrl,
    #[error("payload too large for webhook ({0} bytes)")]
    PayloadTooLarge(usize),
    #[error("failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("HTTP 404: webhook is not active, enable the workflow first")]
    Inactive,
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WebhookError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WebhookError::Inactive => Some(404),
            WebhookError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Inactive | WebhookError::Rejected { .. } | WebhookError::Transport(_)
        )
    }
}

/// Successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status_code: u16,
    pub attempts: u32,
}

/// Result of a single-shot connectivity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub status_code: u16,
    pub response: String,
}

/// Signs, sizes and retries deliveries to the configured webhook.
pub struct WebhookForwarder<T> {
    transport: Arc<T>,
    secret: Option<String>,
    backoff: Duration,
}

impl<T> WebhookForwarder<T>
where
    T: WebhookTransport,
{
    pub fn new(transport: Arc<T>, secret: Option<String>) -> Self {
        Self {
            transport,
            secret,
            backoff: Duration::from_secs(1),
        }
    }

    /// Base delay; attempt `n` waits `n * backoff` before the next try.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn deliver<P>(
        &self,
        url: Option<&str>,
        payload: &P,
        idempotency_key: &str,
    ) -> Result<Delivery, WebhookError>
    where
        P: Serialize + ?Sized,
    {
        let url = checked_url(url)?;
        let body = serde_json::to_vec(payload)?;
        if body.len() > MAX_PAYLOAD_BYTES {
            error!(bytes = body.len(), "webhook payload too large");
            return Err(WebhookError::PayloadTooLarge(body.len()));
        }

        let mut attempt = 1;
        loop {
            let request = self.signed_request(url, &body, idempotency_key);
            match self.attempt(request).await {
                Ok(status_code) => {
                    info!(idempotency_key, status_code, attempt, "webhook delivered");
                    return Ok(Delivery {
                        status_code,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(idempotency_key, attempt, error = %err, "webhook attempt failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(idempotency_key, attempt, error = %err, "webhook delivery failed");
                    return Err(err);
                }
            }
        }
    }

    /// Sends one unsigned test message. Any HTTP status counts as a reachable webhook.
    pub async fn probe<P>(&self, url: Option<&str>, payload: &P) -> Result<ProbeOutcome, WebhookError>
    where
        P: Serialize + ?Sized,
    {
        let url = checked_url(url)?;
        let request = WebhookRequest {
            url: url.to_string(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("User-Agent", USER_AGENT.to_string()),
                ("X-Intake-Test", "true".to_string()),
                ("X-Intake-Timestamp", unix_seconds().to_string()),
                ("X-Intake-Source", "admin-panel".to_string()),
            ],
            body: serde_json::to_vec(payload)?,
        };

        let response = self.transport.post(request).await?;
        if response.status >= 400 {
            warn!(status = response.status, "webhook test answered with an error status");
        }

        Ok(ProbeOutcome {
            success: response.status < 400,
            status_code: response.status,
            response: response.body.chars().take(PROBE_BODY_CHARS).collect(),
        })
    }

    async fn attempt(&self, request: WebhookRequest) -> Result<u16, WebhookError> {
        let response = self.transport.post(request).await?;
        info!(
            status = response.status,
            content_length = response.body.len(),
            "webhook response"
        );

        if response.is_success() {
            Ok(response.status)
        } else if response.status == 404 {
            Err(WebhookError::Inactive)
        } else {
            Err(WebhookError::Rejected {
                status: response.status,
                body: truncate_body(&response.body),
            })
        }
    }

    fn signed_request(&self, url: &str, body: &[u8], idempotency_key: &str) -> WebhookRequest {
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-Request-Id", idempotency_key.to_string()),
            ("User-Agent", USER_AGENT.to_string()),
            ("X-Intake-Timestamp", unix_seconds().to_string()),
            ("X-Intake-Source", "form-api".to_string()),
        ];
        if let Some(secret) = &self.secret {
            headers.push((SIGNATURE_HEADER, sign(secret, body)));
        }

        WebhookRequest {
            url: url.to_string(),
            headers,
            body: body.to_vec(),
        }
    }
}

/// Hex HMAC-SHA256 of the body.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn checked_url(url: Option<&str>) -> Result<&str, WebhookError> {
    match url {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(url),
        other => {
            error!(url = ?other, "webhook url invalid or not configured");
            Err(WebhookError::InvalidUrl)
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > QUOTED_BODY_CHARS {
        let mut quoted: String = body.chars().take(QUOTED_BODY_CHARS).collect();
        quoted.push_str("...");
        quoted
    } else {
        body.to_string()
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// One delivery attempt as shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookLogEntry {
    pub timestamp: String,
    pub idempotency_key: String,
    pub lead_name: String,
    pub lead_email: String,
    pub success: bool,
    pub error: Option<String>,
    pub status_code: Option<u16>,
}

impl WebhookLogEntry {
    pub fn new(
        idempotency_key: &str,
        lead: Option<&LeadSubmission>,
        success: bool,
        error: Option<String>,
        status_code: Option<u16>,
    ) -> Self {
        let (lead_name, lead_email) = match lead {
            Some(lead) => (lead.nome.clone(), lead.email.clone()),
            None => (UNKNOWN_LEAD.to_string(), UNKNOWN_LEAD.to_string()),
        };

        Self {
            timestamp: utc_timestamp(),
            idempotency_key: idempotency_key.to_string(),
            lead_name,
            lead_email,
            success,
            error,
            status_code,
        }
    }
}

/// Bounded, newest-first record of webhook attempts.
#[derive(Debug)]
pub struct WebhookLogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<WebhookLogEntry>>,
}

impl WebhookLogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: WebhookLogEntry) {
        let mut entries = self.entries.lock().expect("webhook log poisoned");
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<WebhookLogEntry> {
        let entries = self.entries.lock().expect("webhook log poisoned");
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("webhook log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
