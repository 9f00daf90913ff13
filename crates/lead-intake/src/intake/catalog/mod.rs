mod store;

pub use store::{
    CatalogSettings, FormOption, FundCatalogDocument, FundStore, JsonFileFundStore, MemoryFundStore,
    StoreError,
};

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tracing::{info, warn};

use super::domain::{utc_timestamp, FundId};
use super::fund::{FundDefinition, FUND_KINDS};

const MAX_FUND_ID_CHARS: usize = 30;
const MAX_FUND_NAME_CHARS: usize = 100;
const FUND_NAME_PUNCTUATION: &str = "-_.,()&";
const MAX_WEBHOOK_URL_CHARS: usize = 500;
const WEBHOOK_PATH_PUNCTUATION: &str = "_-.~:/?#[]@!$&'()*+,;=";

/// Webhook hosts known to belong to the workflow platform.
pub const TRUSTED_WEBHOOK_DOMAINS: [&str; 3] =
    ["2n8n.ominicrm.com", "webhook.site", "api.investiza.com"];

/// Form fields whose option values are exposed to the intake form.
const FORM_FIELDS: [&str; 8] = [
    "situacao_empresa",
    "faturamento_renda",
    "regioes",
    "segmentos",
    "razoes",
    "garantias",
    "tipo_imovel",
    "como_chegou",
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("fund {0} not found")]
    NotFound(FundId),
    #[error("fund {0} already exists")]
    AlreadyExists(FundId),
    #[error("fund id contains invalid characters")]
    InvalidId,
    #[error("fund name contains invalid characters")]
    InvalidName,
    #[error("invalid fund type '{0}', expected one of: constitucional, privado, desenvolvimento, pf")]
    InvalidKind(String),
    #[error("invalid webhook url: {0}")]
    InvalidWebhookUrl(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Administrative operations over the fund catalog.
///
/// Mutations run as load-modify-save under a process-wide lock so concurrent
/// admin requests cannot drop each other's writes.
pub struct FundCatalog<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S> FundCatalog<S>
where
    S: FundStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Result<FundCatalogDocument, StoreError> {
        self.store.load()
    }

    pub fn funds(&self) -> Result<IndexMap<FundId, FundDefinition>, StoreError> {
        Ok(self.store.load()?.funds)
    }

    pub fn create(&self, id: &str, mut fund: FundDefinition) -> Result<FundId, CatalogError> {
        let id = FundId(sanitize_fund_id(id)?);
        fund.name = sanitize_fund_name(&fund.name)?;
        if !FUND_KINDS.contains(&fund.kind.as_str()) {
            return Err(CatalogError::InvalidKind(fund.kind));
        }

        self.modify(|document| {
            if document.funds.contains_key(&id) {
                return Err(CatalogError::AlreadyExists(id.clone()));
            }
            document.funds.insert(id.clone(), fund);
            Ok(())
        })?;

        info!(fund_id = %id, "fund created");
        Ok(id)
    }

    pub fn replace(&self, id: &FundId, fund: FundDefinition) -> Result<FundDefinition, CatalogError> {
        let stored = self.modify(|document| match document.funds.get_mut(id) {
            Some(existing) => {
                *existing = fund;
                Ok(existing.clone())
            }
            None => Err(CatalogError::NotFound(id.clone())),
        })?;

        info!(fund_id = %id, "fund updated");
        Ok(stored)
    }

    /// Marks a fund inactive. Funds are never removed from the catalog.
    pub fn deactivate(&self, id: &FundId) -> Result<(), CatalogError> {
        self.modify(|document| match document.funds.get_mut(id) {
            Some(existing) => {
                existing.active = false;
                Ok(())
            }
            None => Err(CatalogError::NotFound(id.clone())),
        })?;

        info!(fund_id = %id, "fund deactivated");
        Ok(())
    }

    pub fn webhook_url(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.load()?.settings.webhook_url)
    }

    pub fn set_webhook_url(&self, url: &str) -> Result<String, CatalogError> {
        validate_webhook_url(url)?;
        if !is_trusted_webhook_host(url) {
            warn!(url, "webhook url points outside the trusted domains");
        }

        let url = url.to_string();
        self.modify(|document| {
            document.settings.webhook_url = Some(url.clone());
            Ok(())
        })?;

        info!(url = %url, "webhook url updated");
        Ok(url)
    }

    fn modify<T>(
        &self,
        apply: impl FnOnce(&mut FundCatalogDocument) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let _guard = self.write_lock.lock().expect("catalog lock poisoned");
        let mut document = self.store.load()?;
        let outcome = apply(&mut document)?;
        document.settings.last_updated = Some(utc_timestamp());
        self.store.save(&document)?;
        Ok(outcome)
    }
}

/// Option values per form field, in the order the form renders them.
pub fn form_fields(document: &FundCatalogDocument) -> IndexMap<String, Vec<String>> {
    FORM_FIELDS
        .iter()
        .map(|field| {
            let values = document
                .form_options
                .get(*field)
                .map(|options| options.iter().map(|option| option.value.clone()).collect())
                .unwrap_or_default();
            (field.to_string(), values)
        })
        .collect()
}

/// Accepts ids made only of letters, digits and underscores, up to 30 characters.
pub fn sanitize_fund_id(raw: &str) -> Result<String, CatalogError> {
    let sanitized: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .take(MAX_FUND_ID_CHARS)
        .collect();

    if sanitized.is_empty() || sanitized != raw {
        return Err(CatalogError::InvalidId);
    }
    Ok(sanitized)
}

pub fn sanitize_fund_name(raw: &str) -> Result<String, CatalogError> {
    let sanitized: String = raw
        .chars()
        .filter(|ch| {
            ch.is_alphanumeric() || ch.is_whitespace() || FUND_NAME_PUNCTUATION.contains(*ch)
        })
        .take(MAX_FUND_NAME_CHARS)
        .collect();

    if sanitized.is_empty() || sanitized != raw {
        return Err(CatalogError::InvalidName);
    }
    Ok(sanitized)
}

pub fn validate_webhook_url(url: &str) -> Result<(), CatalogError> {
    let remainder = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or(CatalogError::InvalidWebhookUrl(
            "url must start with http:// or https://",
        ))?;

    let (authority, path) = match remainder.find('/') {
        Some(index) => remainder.split_at(index),
        None => (remainder, ""),
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    let port_ok = port.map_or(true, |port| {
        !port.is_empty() && port.chars().all(|ch| ch.is_ascii_digit())
    });
    let path_ok = path
        .chars()
        .all(|ch| ch.is_alphanumeric() || WEBHOOK_PATH_PUNCTUATION.contains(ch));

    if !(host_ok && port_ok && path_ok) {
        return Err(CatalogError::InvalidWebhookUrl(
            "url contains invalid characters",
        ));
    }
    if url.chars().count() > MAX_WEBHOOK_URL_CHARS {
        return Err(CatalogError::InvalidWebhookUrl("url is too long"));
    }
    Ok(())
}

fn is_trusted_webhook_host(url: &str) -> bool {
    let remainder = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let authority = remainder.split('/').next().unwrap_or_default();

    TRUSTED_WEBHOOK_DOMAINS.iter().any(|domain| {
        authority == *domain
            || authority
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_ids_reject_punctuation_and_overflow() {
        assert_eq!(sanitize_fund_id("BNB_FNE").expect("valid"), "BNB_FNE");
        assert!(matches!(
            sanitize_fund_id("BNB-FNE"),
            Err(CatalogError::InvalidId)
        ));
        assert!(matches!(sanitize_fund_id(""), Err(CatalogError::InvalidId)));
        assert!(matches!(
            sanitize_fund_id("FUNDO_AÇÃO"),
            Err(CatalogError::InvalidId)
        ));
        assert!(matches!(
            sanitize_fund_id(&"A".repeat(31)),
            Err(CatalogError::InvalidId)
        ));
    }

    #[test]
    fn fund_names_allow_common_punctuation_only() {
        assert!(sanitize_fund_name("BNDES Finame (Máquinas & Equipamentos)").is_ok());
        assert!(matches!(
            sanitize_fund_name("Fundo <script>"),
            Err(CatalogError::InvalidName)
        ));
    }

    #[test]
    fn webhook_urls_are_checked_for_scheme_and_characters() {
        assert!(validate_webhook_url("https://2n8n.ominicrm.com/webhook/650b310d").is_ok());
        assert!(validate_webhook_url("http://localhost:5678/hook?x=1").is_ok());
        assert!(matches!(
            validate_webhook_url("ftp://example.com/hook"),
            Err(CatalogError::InvalidWebhookUrl(_))
        ));
        assert!(matches!(
            validate_webhook_url("https://exa mple.com/hook"),
            Err(CatalogError::InvalidWebhookUrl(_))
        ));
        assert!(matches!(
            validate_webhook_url("https://exämple.com/hook"),
            Err(CatalogError::InvalidWebhookUrl(_))
        ));
        assert!(matches!(
            validate_webhook_url("https://example.com:port/hook"),
            Err(CatalogError::InvalidWebhookUrl(_))
        ));
        let long = format!("https://webhook.site/{}", "a".repeat(500));
        assert!(matches!(
            validate_webhook_url(&long),
            Err(CatalogError::InvalidWebhookUrl("url is too long"))
        ));
    }

    #[test]
    fn trusted_hosts_include_subdomains() {
        assert!(is_trusted_webhook_host("https://webhook.site/abc"));
        assert!(is_trusted_webhook_host("https://hooks.api.investiza.com/x"));
        assert!(!is_trusted_webhook_host("https://evilwebhook.site/abc"));
    }
}
