//! Lead intake backend: applicant validation, fund eligibility matching, and
//! webhook forwarding for the financing intake form.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
