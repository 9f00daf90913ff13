//! Financing lead intake: form validation, fund eligibility matching, the
//! admin-managed fund catalog, and forwarding of submissions to the workflow
//! webhook.

pub mod catalog;
pub mod domain;
pub mod eligibility;
pub mod fund;
pub mod guard;
pub mod router;
pub mod service;
pub mod validation;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use catalog::{
    CatalogError, FundCatalog, FundCatalogDocument, FundStore, JsonFileFundStore,
    MemoryFundStore, StoreError,
};
pub use domain::{FormSubmission, FundId, LeadProfile, LeadSubmission};
pub use eligibility::{evaluate, EligibilityResult, FundVerdict, Rejection};
pub use fund::{FundCriteria, FundDefinition};
pub use guard::{AdminGuard, AuthError, LoginAttemptLimiter};
pub use router::intake_router;
pub use service::{IntakeService, IntakeServiceError};
pub use validation::{LeadValidator, ValidationError};
pub use webhook::{
    HttpWebhookTransport, WebhookError, WebhookForwarder, WebhookLogBuffer, WebhookLogEntry,
    WebhookTransport,
};
