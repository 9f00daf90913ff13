mod labels;
mod rules;

pub use labels::revenue_label;
pub use rules::Rejection;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::domain::{FundId, LeadProfile};
use super::fund::FundDefinition;

pub const ACCEPTED_REASON: &str = "meets all established criteria";

/// One fund's classification for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundVerdict {
    pub id: FundId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "motivo")]
    pub reason: String,
}

/// Partition of the active catalog for a single lead.
///
/// `possibly_atypical` is part of the published contract but nothing
/// classifies funds into it; it always serializes as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    #[serde(rename = "recomendados")]
    pub recommended: Vec<FundVerdict>,
    #[serde(rename = "possiveis_atipicos", default)]
    pub possibly_atypical: Vec<FundVerdict>,
    #[serde(rename = "nao_elegiveis")]
    pub not_eligible: Vec<FundVerdict>,
}

impl EligibilityResult {
    pub fn is_recommended(&self, id: &str) -> bool {
        self.recommended.iter().any(|verdict| verdict.id.as_str() == id)
    }
}

/// Checks one fund, returning the first failed dimension.
pub fn check_fund(lead: &LeadProfile, fund: &FundDefinition) -> Result<(), Rejection> {
    rules::check_criteria(lead, &fund.criteria)
}

/// Classifies every active fund in catalog order. Inactive funds are skipped.
pub fn evaluate(lead: &LeadProfile, funds: &IndexMap<FundId, FundDefinition>) -> EligibilityResult {
    let mut result = EligibilityResult::default();

    for (id, fund) in funds.iter().filter(|(_, fund)| fund.active) {
        match check_fund(lead, fund) {
            Ok(()) => result.recommended.push(FundVerdict {
                id: id.clone(),
                name: fund.display_name(id.as_str()).to_string(),
                reason: ACCEPTED_REASON.to_string(),
            }),
            Err(rejection) => result.not_eligible.push(FundVerdict {
                id: id.clone(),
                name: fund.display_name(id.as_str()).to_string(),
                reason: rejection.summary(),
            }),
        }
    }

    result
}
