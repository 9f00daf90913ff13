use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Collateral tag that unlocks the real-estate subtype check.
pub const REAL_ESTATE_COLLATERAL: &str = "Imovel";

pub const DEFAULT_SUBMISSION_SOURCE: &str = "investiza-form-gamificado";

/// Identifier wrapper for funds in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundId(pub String);

impl FundId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw applicant data as posted by the intake form.
///
/// Field names follow the form's JSON contract. Legacy fields are accepted so
/// older form builds keep working but are never consulted by the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSubmission {
    pub nome: String,
    #[serde(default)]
    pub nome_empresa: Option<String>,
    pub email: String,
    pub whatsapp: String,
    #[serde(default)]
    pub instagram: Option<String>,
    pub como_chegou: String,
    #[serde(default)]
    pub indicacao_detalhes: Option<String>,
    #[serde(default)]
    pub outros_detalhes: Option<String>,

    pub situacao_empresa: String,
    pub faturamento_renda: String,
    pub local: String,
    #[serde(default)]
    pub municipio_estado: Option<String>,
    pub segmento: Vec<String>,
    #[serde(default)]
    pub segmento_outros: Option<String>,
    pub razao: Vec<String>,
    #[serde(default)]
    pub razao_outros: Option<String>,
    pub garantia: Vec<String>,
    #[serde(default)]
    pub tipo_imovel: Option<String>,
    #[serde(default)]
    pub tipos_imovel: Option<Vec<String>>,
    #[serde(default)]
    pub tipos_imovel_detalhado: Option<Vec<String>>,

    #[serde(default)]
    pub tem_cnpj: Option<String>,
    #[serde(default)]
    pub faturamento: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
}

impl LeadSubmission {
    /// Projects the attributes the eligibility engine matches on.
    pub fn profile(&self) -> LeadProfile {
        LeadProfile {
            company_status: self.situacao_empresa.clone(),
            revenue_bracket: self.faturamento_renda.clone(),
            region: self.local.clone(),
            segments: self.segmento.clone(),
            reasons: self.razao.clone(),
            collateral: self.garantia.clone(),
            real_estate_subtype: self
                .tipo_imovel
                .as_ref()
                .filter(|subtype| !subtype.is_empty())
                .cloned(),
        }
    }
}

/// Applicant attributes consumed by the eligibility engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub company_status: String,
    pub revenue_bracket: String,
    pub region: String,
    pub segments: Vec<String>,
    pub reasons: Vec<String>,
    pub collateral: Vec<String>,
    pub real_estate_subtype: Option<String>,
}

impl LeadProfile {
    pub fn offers_real_estate(&self) -> bool {
        self.collateral
            .iter()
            .any(|tag| tag == REAL_ESTATE_COLLATERAL)
    }
}

/// Eligibility summary computed client-side and echoed with a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedEligibility {
    #[serde(default)]
    pub recomendados: Vec<String>,
    #[serde(default, alias = "possiveisAtipicos")]
    pub possiveis_atipicos: Vec<SubmittedEligibilityItem>,
    #[serde(default, alias = "naoElegiveis")]
    pub nao_elegiveis: Vec<SubmittedEligibilityItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedEligibilityItem {
    pub id: String,
    pub motivo: String,
}

/// Browser and campaign attribution captured by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Complete form submission forwarded to the workflow webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "new_idempotency_key")]
    pub idempotency_key: String,
    #[serde(default = "utc_timestamp")]
    pub timestamp: String,
    pub lead: LeadSubmission,
    pub eligibility: SubmittedEligibility,
    #[serde(default)]
    pub score_gamificado: i64,
    #[serde(default)]
    pub meta: Option<SubmissionMeta>,
}

fn default_source() -> String {
    DEFAULT_SUBMISSION_SOURCE.to_string()
}

pub(crate) fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn utc_timestamp() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submission_defaults_fill_missing_envelope_fields() {
        let payload = json!({
            "lead": {
                "nome": "Maria Souza",
                "email": "maria@example.com",
                "whatsapp": "+55 81 98888-7777",
                "como_chegou": "google",
                "situacao_empresa": "cnpj_antigo",
                "faturamento_renda": "10-80",
                "local": "Nordeste",
                "segmento": ["Agro"],
                "razao": ["Implantacao"],
                "garantia": ["Equipamento"]
            },
            "eligibility": {
                "recomendados": ["BNB_FNE"],
                "possiveisAtipicos": [],
                "naoElegiveis": [{ "id": "BNDES", "motivo": "region" }]
            }
        });

        let submission: FormSubmission = serde_json::from_value(payload).expect("parses");

        assert_eq!(submission.source, DEFAULT_SUBMISSION_SOURCE);
        assert!(uuid::Uuid::parse_str(&submission.idempotency_key).is_ok());
        assert!(!submission.timestamp.is_empty());
        assert_eq!(submission.score_gamificado, 0);
        assert_eq!(submission.eligibility.nao_elegiveis.len(), 1);
        assert_eq!(submission.eligibility.nao_elegiveis[0].id, "BNDES");
    }

    #[test]
    fn profile_drops_blank_subtype() {
        let lead = LeadSubmission {
            garantia: vec![REAL_ESTATE_COLLATERAL.to_string()],
            tipo_imovel: Some(String::new()),
            ..LeadSubmission::default()
        };

        let profile = lead.profile();

        assert!(profile.offers_real_estate());
        assert!(profile.real_estate_subtype.is_none());
    }
}
