use super::domain::{LeadSubmission, REAL_ESTATE_COLLATERAL};

/// Enumerated values the intake form may submit.
pub mod allowed {
    pub const COMPANY_STATUS: &[&str] = &[
        "cnpj_antigo",
        "cnpj_novo",
        "implantacao",
        "pessoa_fisica",
        "recuperacao_judicial_homologada",
        "recuperacao_judicial_nao_homologada",
    ];
    pub const REVENUE_BRACKETS: &[&str] = &[
        "<10", "10-80", ">80", ">300", "nao_tem", "ate_5k", "5k_15k", "15k_50k", "acima_50k",
    ];
    pub const REGIONS: &[&str] = &["Nordeste", "Norte", "Centro-Oeste", "Sudeste", "Sul"];
    pub const CHANNELS: &[&str] = &[
        "instagram",
        "google",
        "linkedin",
        "facebook",
        "youtube",
        "whatsapp",
        "site",
        "indicacao",
        "eventos",
        "outros",
    ];
    pub const SEGMENTS: &[&str] = &[
        "Agro",
        "Industria_Atacado",
        "Construtora",
        "Tecnologia",
        "Servicos_Financeiros",
        "Saude",
        "Educacao",
        "Servico_Publico",
        "Varejo",
        "Outros",
    ];
    pub const REASONS: &[&str] = &[
        "Implantacao",
        "Ampliacao",
        "Giro",
        "Financiamento_Ativo",
        "Modernizacao_Tecnologia",
        "Aquisicao",
        "Safra_Agro",
        "Outros",
    ];
    pub const COLLATERAL: &[&str] = &[
        "Imovel",
        "Veiculo",
        "Equipamento",
        "Recebiveis",
        "CartaFianca",
        "Estoque",
        "NaoSei",
        "Nenhuma",
    ];
    pub const REAL_ESTATE_SUBTYPES: &[&str] =
        &["Residencial", "Comercial", "Industrial", "Rural", "Terreno"];

    /// Regions where the municipality must be informed.
    pub const MUNICIPALITY_REGIONS: &[&str] = &["Sudeste", "Sul"];
}

const REFERRAL_CHANNEL: &str = "indicacao";
const OTHER_CHANNEL: &str = "outros";
const OTHER_SEGMENT: &str = "Outros";
const STRIPPED_CHARACTERS: [char; 5] = ['<', '>', '\'', '"', ';'];

/// Validation errors raised while accepting a lead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid company status")]
    InvalidCompanyStatus,
    #[error("invalid revenue/income bracket")]
    InvalidRevenueBracket,
    #[error("invalid region")]
    InvalidRegion,
    #[error("invalid acquisition channel")]
    InvalidChannel,
    #[error("invalid segments")]
    InvalidSegments,
    #[error("invalid reasons")]
    InvalidReasons,
    #[error("invalid collateral")]
    InvalidCollateral,
    #[error("invalid real estate types")]
    InvalidRealEstateTypes,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("tipo_imovel is required when garantia includes Imovel")]
    MissingRealEstateSubtype,
    #[error("indicacao_detalhes is required when como_chegou is indicacao")]
    MissingReferralDetails,
    #[error("outros_detalhes is required when como_chegou is outros")]
    MissingOtherChannelDetails,
    #[error("segmento_outros is required when segmento is Outros")]
    MissingOtherSegment,
    #[error("municipio_estado is required for Sudeste/Sul locations")]
    MissingMunicipality,
}

/// Sanitizes free text and enforces the form's enumerations and conditional fields.
#[derive(Debug, Clone, Default)]
pub struct LeadValidator;

impl LeadValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the sanitized lead when every rule passes.
    pub fn validate(&self, mut lead: LeadSubmission) -> Result<LeadSubmission, ValidationError> {
        sanitize_fields(&mut lead);

        if !is_member(&lead.situacao_empresa, allowed::COMPANY_STATUS) {
            return Err(ValidationError::InvalidCompanyStatus);
        }
        if !is_member(&lead.faturamento_renda, allowed::REVENUE_BRACKETS) {
            return Err(ValidationError::InvalidRevenueBracket);
        }
        if !is_member(&lead.local, allowed::REGIONS) {
            return Err(ValidationError::InvalidRegion);
        }
        if !is_member(&lead.como_chegou, allowed::CHANNELS) {
            return Err(ValidationError::InvalidChannel);
        }
        if !all_members(&lead.segmento, allowed::SEGMENTS) {
            return Err(ValidationError::InvalidSegments);
        }
        if !all_members(&lead.razao, allowed::REASONS) {
            return Err(ValidationError::InvalidReasons);
        }
        if !all_members(&lead.garantia, allowed::COLLATERAL) {
            return Err(ValidationError::InvalidCollateral);
        }
        if let Some(types) = &lead.tipos_imovel {
            if !all_members(types, allowed::REAL_ESTATE_SUBTYPES) {
                return Err(ValidationError::InvalidRealEstateTypes);
            }
        }

        let missing = missing_fields(&lead);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        if lead.garantia.iter().any(|tag| tag == REAL_ESTATE_COLLATERAL)
            && is_blank(&lead.tipo_imovel)
        {
            return Err(ValidationError::MissingRealEstateSubtype);
        }
        if lead.como_chegou == REFERRAL_CHANNEL && is_blank(&lead.indicacao_detalhes) {
            return Err(ValidationError::MissingReferralDetails);
        }
        if lead.como_chegou == OTHER_CHANNEL && is_blank(&lead.outros_detalhes) {
            return Err(ValidationError::MissingOtherChannelDetails);
        }
        if lead.segmento.iter().any(|tag| tag == OTHER_SEGMENT) && is_blank(&lead.segmento_outros)
        {
            return Err(ValidationError::MissingOtherSegment);
        }
        if allowed::MUNICIPALITY_REGIONS.contains(&lead.local.as_str())
            && is_blank(&lead.municipio_estado)
        {
            return Err(ValidationError::MissingMunicipality);
        }

        Ok(lead)
    }
}

/// Strips markup/quote characters and truncates to `max_chars`.
pub fn sanitize_text(value: &str, max_chars: usize) -> String {
    value
        .chars()
        .filter(|ch| !STRIPPED_CHARACTERS.contains(ch))
        .take(max_chars)
        .collect()
}

fn sanitize_fields(lead: &mut LeadSubmission) {
    lead.nome = sanitize_text(&lead.nome, 150);
    lead.email = sanitize_text(&lead.email, 100);
    lead.whatsapp = sanitize_text(&lead.whatsapp, 20);

    let optional_fields = [
        (&mut lead.nome_empresa, 200),
        (&mut lead.instagram, 50),
        (&mut lead.indicacao_detalhes, 200),
        (&mut lead.outros_detalhes, 200),
        (&mut lead.municipio_estado, 100),
        (&mut lead.segmento_outros, 200),
        (&mut lead.razao_outros, 200),
    ];
    for (field, limit) in optional_fields {
        if let Some(value) = field.as_mut() {
            *value = sanitize_text(value, limit);
        }
    }
}

fn missing_fields(lead: &LeadSubmission) -> Vec<&'static str> {
    let scalars = [
        ("nome", &lead.nome),
        ("email", &lead.email),
        ("whatsapp", &lead.whatsapp),
        ("como_chegou", &lead.como_chegou),
        ("situacao_empresa", &lead.situacao_empresa),
        ("faturamento_renda", &lead.faturamento_renda),
        ("local", &lead.local),
    ];
    let lists = [
        ("segmento", &lead.segmento),
        ("razao", &lead.razao),
        ("garantia", &lead.garantia),
    ];

    scalars
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .chain(
            lists
                .iter()
                .filter(|(_, values)| values.is_empty())
                .map(|(name, _)| *name),
        )
        .collect()
}

fn is_member(value: &str, allowed: &[&str]) -> bool {
    allowed.contains(&value)
}

fn all_members(values: &[String], allowed: &[&str]) -> bool {
    values.iter().all(|value| is_member(value, allowed))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}
