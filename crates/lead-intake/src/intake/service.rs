use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use super::catalog::{
    form_fields, CatalogError, FormOption, FundCatalog, FundStore, StoreError,
};
use super::domain::{new_idempotency_key, utc_timestamp, FormSubmission, FundId, LeadSubmission};
use super::eligibility::{self, EligibilityResult};
use super::fund::FundDefinition;
use super::guard::{AdminGuard, AuthError};
use super::validation::{LeadValidator, ValidationError};
use super::webhook::{
    Delivery, ProbeOutcome, WebhookError, WebhookForwarder, WebhookLogBuffer, WebhookLogEntry,
    WebhookTransport,
};

/// Option values and full option lists the form renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormConfigView {
    pub fields: IndexMap<String, Vec<String>>,
    pub opcoes_completas: IndexMap<String, Vec<FormOption>>,
    pub webhook_url: String,
}

/// Catalog contents for the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundListing {
    pub fundos: IndexMap<FundId, FundDefinition>,
    pub opcoes_formulario: IndexMap<String, Vec<FormOption>>,
}

/// Service composing validation, the fund catalog, the evaluator and webhook delivery.
pub struct IntakeService<S, T> {
    validator: LeadValidator,
    catalog: Arc<FundCatalog<S>>,
    forwarder: Arc<WebhookForwarder<T>>,
    webhook_logs: Arc<WebhookLogBuffer>,
    guard: Arc<AdminGuard>,
}

impl<S, T> IntakeService<S, T>
where
    S: FundStore + 'static,
    T: WebhookTransport + 'static,
{
    pub fn new(
        catalog: Arc<FundCatalog<S>>,
        forwarder: Arc<WebhookForwarder<T>>,
        webhook_logs: Arc<WebhookLogBuffer>,
        guard: Arc<AdminGuard>,
    ) -> Self {
        Self {
            validator: LeadValidator::new(),
            catalog,
            forwarder,
            webhook_logs,
            guard,
        }
    }

    pub fn authorize(&self, client: &str, presented: Option<&str>) -> Result<(), AuthError> {
        self.guard.authorize(client, presented)
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.guard.trusts_forwarded_for()
    }

    pub fn validate_lead(&self, lead: LeadSubmission) -> Result<LeadSubmission, IntakeServiceError> {
        Ok(self.validator.validate(lead)?)
    }

    /// Acknowledges a submission without forwarding it.
    pub fn record_submission(&self, submission: &FormSubmission) {
        info!(
            idempotency_key = %submission.idempotency_key,
            source = %submission.source,
            score = submission.score_gamificado,
            recommended = submission.eligibility.recomendados.len(),
            "form submission received"
        );
    }

    pub fn form_config(&self) -> Result<FormConfigView, IntakeServiceError> {
        let document = self.catalog.snapshot()?;
        let fields = form_fields(&document);

        Ok(FormConfigView {
            fields,
            opcoes_completas: document.form_options,
            webhook_url: document.settings.webhook_url.unwrap_or_default(),
        })
    }

    /// Forwards a submission to the configured webhook and records the attempt.
    pub async fn forward_submission(
        &self,
        submission: &FormSubmission,
    ) -> Result<Delivery, IntakeServiceError> {
        info!(idempotency_key = %submission.idempotency_key, "forwarding submission to webhook");
        let url = self.catalog.webhook_url()?;

        let outcome = self
            .forwarder
            .deliver(url.as_deref(), submission, &submission.idempotency_key)
            .await;

        let entry = match &outcome {
            Ok(delivery) => WebhookLogEntry::new(
                &submission.idempotency_key,
                Some(&submission.lead),
                true,
                None,
                Some(delivery.status_code),
            ),
            Err(err) => WebhookLogEntry::new(
                &submission.idempotency_key,
                Some(&submission.lead),
                false,
                Some(err.to_string()),
                None,
            ),
        };
        self.webhook_logs.record(entry);

        Ok(outcome?)
    }

    /// Sends a marker payload to the configured webhook and records the attempt.
    pub async fn test_webhook(&self) -> Result<ProbeOutcome, IntakeServiceError> {
        let url = self.catalog.webhook_url()?;
        let idempotency_key = new_idempotency_key();
        let payload = json!({
            "idempotency_key": idempotency_key,
            "timestamp": utc_timestamp(),
            "test": true,
            "message": "webhook test message from the lead intake service",
        });

        let outcome = self.forwarder.probe(url.as_deref(), &payload).await;
        let entry = match &outcome {
            Ok(probe) => WebhookLogEntry::new(
                &idempotency_key,
                None,
                probe.success,
                None,
                Some(probe.status_code),
            ),
            Err(err) => {
                error!(error = %err, "webhook test failed");
                WebhookLogEntry::new(&idempotency_key, None, false, Some(err.to_string()), None)
            }
        };
        self.webhook_logs.record(entry);

        Ok(outcome?)
    }

    pub fn set_webhook_url(&self, url: &str) -> Result<String, IntakeServiceError> {
        Ok(self.catalog.set_webhook_url(url)?)
    }

    pub fn webhook_logs(&self) -> Vec<WebhookLogEntry> {
        self.webhook_logs.entries()
    }

    pub fn list_funds(&self) -> Result<FundListing, IntakeServiceError> {
        let document = self.catalog.snapshot()?;
        Ok(FundListing {
            fundos: document.funds,
            opcoes_formulario: document.form_options,
        })
    }

    pub fn get_fund(
        &self,
        id: &FundId,
    ) -> Result<(FundDefinition, IndexMap<String, Vec<FormOption>>), IntakeServiceError> {
        let document = self.catalog.snapshot()?;
        let fund = document
            .funds
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        Ok((fund, document.form_options))
    }

    pub fn create_fund(&self, id: &str, fund: FundDefinition) -> Result<FundId, IntakeServiceError> {
        Ok(self.catalog.create(id, fund)?)
    }

    pub fn update_fund(
        &self,
        id: &FundId,
        fund: FundDefinition,
    ) -> Result<FundDefinition, IntakeServiceError> {
        Ok(self.catalog.replace(id, fund)?)
    }

    pub fn deactivate_fund(&self, id: &FundId) -> Result<(), IntakeServiceError> {
        Ok(self.catalog.deactivate(id)?)
    }

    /// Classifies the lead as submitted against the active catalog.
    ///
    /// Only the request shape is enforced here; enumerations are not checked so
    /// legacy statuses such as `recuperacao_judicial` still reach the matcher.
    pub fn evaluate_lead(&self, lead: LeadSubmission) -> Result<EligibilityResult, IntakeServiceError> {
        let funds = self.catalog.funds()?;
        let result = eligibility::evaluate(&lead.profile(), &funds);

        info!(
            recommended = result.recommended.len(),
            not_eligible = result.not_eligible.len(),
            "eligibility evaluated"
        );
        Ok(result)
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

impl From<StoreError> for IntakeServiceError {
    fn from(err: StoreError) -> Self {
        IntakeServiceError::Catalog(CatalogError::Store(err))
    }
}
