use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use indexmap::IndexMap;
use serde_json::Value;

use crate::intake::catalog::{
    CatalogSettings, FormOption, FundCatalog, FundCatalogDocument, FundStore, MemoryFundStore,
    StoreError,
};
use crate::intake::domain::{
    FormSubmission, FundId, LeadProfile, LeadSubmission, SubmittedEligibility,
};
use crate::intake::fund::{FundCriteria, FundDefinition};
use crate::intake::guard::{AdminGuard, LoginAttemptLimiter};
use crate::intake::service::IntakeService;
use crate::intake::webhook::{
    TransportError, WebhookForwarder, WebhookLogBuffer, WebhookRequest, WebhookResponse,
    WebhookTransport,
};

pub(super) const ADMIN_KEY: &str = "test-admin-key";
pub(super) const WEBHOOK_URL: &str = "https://webhook.site/intake-test";

pub(super) fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Lead used by the reference scenarios.
pub(super) fn profile() -> LeadProfile {
    LeadProfile {
        company_status: "cnpj_antigo".to_string(),
        revenue_bracket: "10-80".to_string(),
        region: "Nordeste".to_string(),
        segments: tags(&["Agro"]),
        reasons: tags(&["Implantacao"]),
        collateral: tags(&["Equipamento"]),
        real_estate_subtype: None,
    }
}

pub(super) fn lead_submission() -> LeadSubmission {
    LeadSubmission {
        nome: "Maria Souza".to_string(),
        nome_empresa: Some("Souza Agro Ltda".to_string()),
        email: "maria@example.com".to_string(),
        whatsapp: "+55 81 98888-7777".to_string(),
        como_chegou: "google".to_string(),
        situacao_empresa: "cnpj_antigo".to_string(),
        faturamento_renda: "10-80".to_string(),
        local: "Nordeste".to_string(),
        segmento: tags(&["Agro"]),
        razao: tags(&["Implantacao"]),
        garantia: tags(&["Equipamento"]),
        ..LeadSubmission::default()
    }
}

pub(super) fn form_submission() -> FormSubmission {
    FormSubmission {
        source: "investiza-form-gamificado".to_string(),
        idempotency_key: "idem-0001".to_string(),
        timestamp: "2025-03-01T12:00:00.000000".to_string(),
        lead: lead_submission(),
        eligibility: SubmittedEligibility {
            recomendados: tags(&["BNB_FNE"]),
            ..SubmittedEligibility::default()
        },
        score_gamificado: 85,
        meta: None,
    }
}

pub(super) fn fund(name: &str, criteria: FundCriteria) -> FundDefinition {
    FundDefinition {
        name: name.to_string(),
        kind: "privado".to_string(),
        active: true,
        criteria,
    }
}

pub(super) fn open_fund(name: &str) -> FundDefinition {
    fund(name, FundCriteria::default())
}

pub(super) fn funds(entries: Vec<(&str, FundDefinition)>) -> IndexMap<FundId, FundDefinition> {
    entries
        .into_iter()
        .map(|(id, fund)| (FundId(id.to_string()), fund))
        .collect()
}

pub(super) fn document() -> FundCatalogDocument {
    let mut form_options = IndexMap::new();
    form_options.insert(
        "regioes".to_string(),
        vec![
            FormOption {
                value: "Nordeste".to_string(),
                label: "Nordeste".to_string(),
            },
            FormOption {
                value: "Sul".to_string(),
                label: "Sul".to_string(),
            },
        ],
    );

    FundCatalogDocument {
        funds: funds(vec![
            (
                "BNB_FNE",
                fund(
                    "BNB FNE",
                    FundCriteria {
                        regions: tags(&["Nordeste"]),
                        ..FundCriteria::default()
                    },
                ),
            ),
            (
                "BNDES_SUL",
                fund(
                    "BNDES Sul",
                    FundCriteria {
                        regions: tags(&["Sul", "Sudeste"]),
                        ..FundCriteria::default()
                    },
                ),
            ),
        ]),
        form_options,
        settings: CatalogSettings {
            webhook_url: Some(WEBHOOK_URL.to_string()),
            ..CatalogSettings::default()
        },
    }
}

/// Transport replaying scripted responses and recording every request.
#[derive(Default)]
pub(super) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<WebhookResponse, TransportError>>>,
    requests: Mutex<Vec<WebhookRequest>>,
}

impl ScriptedTransport {
    pub(super) fn replying(statuses: &[u16]) -> Self {
        let responses = statuses
            .iter()
            .map(|status| {
                Ok(WebhookResponse {
                    status: *status,
                    body: format!("status {status}"),
                })
            })
            .collect();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn push(&self, response: Result<WebhookResponse, TransportError>) {
        self.responses
            .lock()
            .expect("transport mutex poisoned")
            .push_back(response);
    }

    pub(super) fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl WebhookTransport for ScriptedTransport {
    async fn post(&self, request: WebhookRequest) -> Result<WebhookResponse, TransportError> {
        self.requests
            .lock()
            .expect("transport mutex poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("transport mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_string())))
    }
}

pub(super) struct UnavailableStore;

fn disk_detached() -> StoreError {
    StoreError::Io {
        path: "fundos_criterios.json".into(),
        source: std::io::Error::other("disk detached"),
    }
}

impl FundStore for UnavailableStore {
    fn load(&self) -> Result<FundCatalogDocument, StoreError> {
        Err(disk_detached())
    }

    fn save(&self, _document: &FundCatalogDocument) -> Result<(), StoreError> {
        Err(disk_detached())
    }
}

pub(super) fn forwarder(
    transport: Arc<ScriptedTransport>,
    secret: Option<&str>,
) -> WebhookForwarder<ScriptedTransport> {
    WebhookForwarder::new(transport, secret.map(str::to_string)).with_backoff(Duration::ZERO)
}

pub(super) fn admin_guard() -> AdminGuard {
    AdminGuard::new(
        ADMIN_KEY,
        LoginAttemptLimiter::new(5, Duration::from_secs(900)),
    )
}

pub(super) struct Harness {
    pub(super) service: Arc<IntakeService<MemoryFundStore, ScriptedTransport>>,
    pub(super) store: Arc<MemoryFundStore>,
    pub(super) transport: Arc<ScriptedTransport>,
}

pub(super) fn harness_with(document: FundCatalogDocument, transport: ScriptedTransport) -> Harness {
    harness_with_guard(document, transport, admin_guard())
}

pub(super) fn harness_with_guard(
    document: FundCatalogDocument,
    transport: ScriptedTransport,
    guard: AdminGuard,
) -> Harness {
    let store = Arc::new(MemoryFundStore::new(document));
    let transport = Arc::new(transport);
    let service = Arc::new(IntakeService::new(
        Arc::new(FundCatalog::new(store.clone())),
        Arc::new(forwarder(transport.clone(), None)),
        Arc::new(WebhookLogBuffer::new(100)),
        Arc::new(guard),
    ));

    Harness {
        service,
        store,
        transport,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(document(), ScriptedTransport::default())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
