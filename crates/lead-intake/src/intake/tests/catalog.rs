use std::sync::Arc;

use super::common::*;

use crate::intake::catalog::{
    form_fields, CatalogError, FundCatalog, FundStore, JsonFileFundStore, MemoryFundStore,
};
use crate::intake::domain::FundId;
use crate::intake::fund::{FundCriteria, FundDefinition};

fn stored(catalog: &FundCatalog<MemoryFundStore>, id: &FundId) -> Option<FundDefinition> {
    catalog.funds().expect("loads").shift_remove(id)
}

fn catalog() -> (FundCatalog<MemoryFundStore>, Arc<MemoryFundStore>) {
    let store = Arc::new(MemoryFundStore::new(document()));
    (FundCatalog::new(store.clone()), store)
}

#[test]
fn create_appends_fund_and_stamps_update_time() {
    let (catalog, store) = catalog();
    let mut new_fund = open_fund("Finep Inovacao");
    new_fund.kind = "desenvolvimento".to_string();

    let id = catalog.create("FINEP", new_fund).expect("created");

    let document = store.load().expect("loads");
    let ids: Vec<&str> = document.funds.keys().map(FundId::as_str).collect();
    assert_eq!(id.as_str(), "FINEP");
    assert_eq!(ids, vec!["BNB_FNE", "BNDES_SUL", "FINEP"]);
    assert!(document.settings.last_updated.is_some());
}

#[test]
fn create_rejects_invalid_input_and_duplicates() {
    let (catalog, _) = catalog();

    assert!(matches!(
        catalog.create("FINEP-2", open_fund("Finep")),
        Err(CatalogError::InvalidId)
    ));
    assert!(matches!(
        catalog.create("FINEP", open_fund("Finep <b>")),
        Err(CatalogError::InvalidName)
    ));
    assert!(matches!(
        catalog.create("FINEP", open_fund(&"N".repeat(101))),
        Err(CatalogError::InvalidName)
    ));

    let mut unknown_kind = open_fund("Finep");
    unknown_kind.kind = "cripto".to_string();
    assert!(matches!(
        catalog.create("FINEP", unknown_kind),
        Err(CatalogError::InvalidKind(kind)) if kind == "cripto"
    ));

    assert!(matches!(
        catalog.create("BNB_FNE", open_fund("Outro")),
        Err(CatalogError::AlreadyExists(id)) if id.as_str() == "BNB_FNE"
    ));
}

#[test]
fn replace_swaps_definition_in_place() {
    let (catalog, store) = catalog();
    let id = FundId("BNB_FNE".to_string());
    let updated = fund(
        "BNB FNE Rural",
        FundCriteria {
            segments: tags(&["Agro"]),
            ..FundCriteria::default()
        },
    );

    let replaced = catalog.replace(&id, updated.clone()).expect("replaced");

    assert_eq!(replaced, updated);
    let document = store.load().expect("loads");
    assert_eq!(document.funds.get_index(0).map(|(id, _)| id.as_str()), Some("BNB_FNE"));
    assert_eq!(stored(&catalog, &id), Some(updated));
}

#[test]
fn deactivate_keeps_fund_in_catalog() {
    let (catalog, _) = catalog();
    let id = FundId("BNDES_SUL".to_string());

    catalog.deactivate(&id).expect("deactivated");

    let fund = stored(&catalog, &id).expect("still present");
    assert!(!fund.active);
    assert_eq!(catalog.funds().expect("loads").len(), 2);
}

#[test]
fn missing_funds_are_reported() {
    let (catalog, _) = catalog();
    let id = FundId("NOPE".to_string());

    assert!(stored(&catalog, &id).is_none());
    assert!(matches!(
        catalog.replace(&id, open_fund("Nope")),
        Err(CatalogError::NotFound(_))
    ));
    assert!(matches!(catalog.deactivate(&id), Err(CatalogError::NotFound(_))));
}

#[test]
fn webhook_url_updates_persist_even_for_untrusted_hosts() {
    let (catalog, _) = catalog();

    catalog
        .set_webhook_url("https://hooks.example.org/lead")
        .expect("accepted with warning");
    assert_eq!(
        catalog.webhook_url().expect("loads").as_deref(),
        Some("https://hooks.example.org/lead")
    );

    assert!(matches!(
        catalog.set_webhook_url("javascript:alert(1)"),
        Err(CatalogError::InvalidWebhookUrl(_))
    ));
}

#[test]
fn form_fields_list_values_for_every_field() {
    let fields = form_fields(&document());

    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "situacao_empresa",
            "faturamento_renda",
            "regioes",
            "segmentos",
            "razoes",
            "garantias",
            "tipo_imovel",
            "como_chegou"
        ]
    );
    assert_eq!(fields["regioes"], tags(&["Nordeste", "Sul"]));
    assert!(fields["garantias"].is_empty());
}

#[test]
fn file_backed_catalog_survives_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fundos_criterios.json");
    let store = Arc::new(JsonFileFundStore::new(&path));
    let catalog = FundCatalog::new(store);

    catalog
        .create("PRONAMPE", open_fund("Pronampe"))
        .expect("created");
    catalog
        .set_webhook_url("https://api.investiza.com/hooks/lead")
        .expect("saved");

    let reopened = FundCatalog::new(Arc::new(JsonFileFundStore::new(&path)));
    let document = reopened.snapshot().expect("loads");
    assert!(document.funds.contains_key(&FundId("PRONAMPE".to_string())));
    assert_eq!(
        document.settings.webhook_url.as_deref(),
        Some("https://api.investiza.com/hooks/lead")
    );
}

#[test]
fn store_failures_surface_as_catalog_errors() {
    let catalog = FundCatalog::new(Arc::new(UnavailableStore));

    assert!(matches!(
        catalog.create("NOVO", open_fund("Novo")),
        Err(CatalogError::Store(_))
    ));
}
