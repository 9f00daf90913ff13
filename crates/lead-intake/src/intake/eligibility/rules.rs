use serde::{Deserialize, Serialize};

use super::labels::revenue_label;
use crate::intake::domain::LeadProfile;
use crate::intake::fund::{accepts, accepts_any, is_unconstrained, FundCriteria};

const LEGACY_JUDICIAL_RECOVERY: &str = "recuperacao_judicial";
const HOMOLOGATED_JUDICIAL_RECOVERY: &str = "recuperacao_judicial_homologada";

/// First criteria dimension a lead failed for a given fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    CompanyStatus(String),
    RevenueBracket(String),
    Region(String),
    Segments(Vec<String>),
    Reasons(Vec<String>),
    Collateral(Vec<String>),
    RealEstateSubtype(Option<String>),
}

impl Rejection {
    pub fn summary(&self) -> String {
        match self {
            Rejection::CompanyStatus(status) => {
                format!("company status '{status}' not accepted")
            }
            Rejection::RevenueBracket(code) => {
                format!("revenue bracket '{}' not accepted", revenue_label(code))
            }
            Rejection::Region(region) => format!("region '{region}' not served"),
            Rejection::Segments(tags) => format!("segments [{}] not accepted", tags.join(", ")),
            Rejection::Reasons(tags) => format!("reasons [{}] not accepted", tags.join(", ")),
            Rejection::Collateral(tags) => {
                format!("collateral [{}] not accepted", tags.join(", "))
            }
            Rejection::RealEstateSubtype(subtype) => format!(
                "real estate subtype '{}' not accepted",
                subtype.as_deref().unwrap_or("none")
            ),
        }
    }
}

pub(crate) fn canonical_company_status(status: &str) -> &str {
    if status == LEGACY_JUDICIAL_RECOVERY {
        HOMOLOGATED_JUDICIAL_RECOVERY
    } else {
        status
    }
}

/// Runs the dimension checks in their fixed order, stopping at the first miss.
pub(crate) fn check_criteria(lead: &LeadProfile, criteria: &FundCriteria) -> Result<(), Rejection> {
    let company_status = canonical_company_status(&lead.company_status);
    if !accepts(&criteria.company_status, company_status) {
        return Err(Rejection::CompanyStatus(company_status.to_string()));
    }

    if !accepts(&criteria.revenue_bracket, &lead.revenue_bracket) {
        return Err(Rejection::RevenueBracket(lead.revenue_bracket.clone()));
    }

    if !accepts(&criteria.regions, &lead.region) {
        return Err(Rejection::Region(lead.region.clone()));
    }

    if !accepts_any(&criteria.segments, &lead.segments) {
        return Err(Rejection::Segments(lead.segments.clone()));
    }

    if !accepts_any(&criteria.reasons, &lead.reasons) {
        return Err(Rejection::Reasons(lead.reasons.clone()));
    }

    if !accepts_any(&criteria.collateral, &lead.collateral) {
        return Err(Rejection::Collateral(lead.collateral.clone()));
    }

    if lead.offers_real_estate() && !is_unconstrained(&criteria.real_estate_subtypes) {
        let listed = lead.real_estate_subtype.as_ref().is_some_and(|subtype| {
            criteria
                .real_estate_subtypes
                .iter()
                .any(|candidate| candidate == subtype)
        });
        if !listed {
            return Err(Rejection::RealEstateSubtype(
                lead.real_estate_subtype.clone(),
            ));
        }
    }

    Ok(())
}
