use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::intake::domain::FundId;
use crate::intake::fund::FundDefinition;

/// Persisted configuration: funds, form option lists, and delivery settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundCatalogDocument {
    #[serde(rename = "fundos", default)]
    pub funds: IndexMap<FundId, FundDefinition>,
    #[serde(rename = "opcoes_formulario", default)]
    pub form_options: IndexMap<String, Vec<FormOption>>,
    #[serde(rename = "configuracao", default)]
    pub settings: CatalogSettings,
}

/// Selectable value rendered by the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(
        rename = "ultima_atualizacao",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Storage abstraction for the catalog document.
pub trait FundStore: Send + Sync {
    fn load(&self) -> Result<FundCatalogDocument, StoreError>;
    fn save(&self, document: &FundCatalogDocument) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode catalog: {0}")]
    Encode(#[source] serde_json::Error),
}

/// JSON file on local disk, written through a sibling temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileFundStore {
    path: PathBuf,
}

impl JsonFileFundStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl FundStore for JsonFileFundStore {
    fn load(&self) -> Result<FundCatalogDocument, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "fund catalog file not found, using empty catalog");
                return Ok(FundCatalogDocument::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, document: &FundCatalogDocument) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(document).map_err(StoreError::Encode)?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, encoded).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))
    }
}

/// Process-local store for embedders that keep the catalog in memory.
#[derive(Debug, Default)]
pub struct MemoryFundStore {
    document: Mutex<FundCatalogDocument>,
}

impl MemoryFundStore {
    pub fn new(document: FundCatalogDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl FundStore for MemoryFundStore {
    fn load(&self) -> Result<FundCatalogDocument, StoreError> {
        let guard = self.document.lock().expect("catalog store poisoned");
        Ok(guard.clone())
    }

    fn save(&self, document: &FundCatalogDocument) -> Result<(), StoreError> {
        let mut guard = self.document.lock().expect("catalog store poisoned");
        *guard = document.clone();
        Ok(())
    }
}
