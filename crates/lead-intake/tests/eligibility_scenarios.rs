use lead_intake::intake::{evaluate, FundCatalogDocument, LeadProfile};

fn reference_lead() -> LeadProfile {
    LeadProfile {
        company_status: "cnpj_antigo".to_string(),
        revenue_bracket: "10-80".to_string(),
        region: "Nordeste".to_string(),
        segments: vec!["Agro".to_string()],
        reasons: vec!["Implantacao".to_string()],
        collateral: vec!["Equipamento".to_string()],
        real_estate_subtype: None,
    }
}

/// Written as a literal so the fund order survives parsing.
const SEEDED_CATALOG: &str = r#"{
    "fundos": {
        "BNB_FNE": {
            "nome": "BNB FNE",
            "tipo": "constitucional",
            "criterios": {
                "situacao_empresa": ["cnpj_antigo", "cnpj_novo"],
                "faturamento_renda": ["todos"],
                "regioes": ["Nordeste"],
                "segmentos": ["Agro", "Industria_Atacado"],
                "razoes": [],
                "garantias": ["Equipamento", "Imovel"],
                "tipo_imovel": ["Rural"]
            }
        },
        "BNDES_SUDESTE": {
            "nome": "BNDES Sudeste",
            "tipo": "desenvolvimento",
            "criterios": { "regioes": ["Sudeste"] }
        },
        "LEGADO": {
            "nome": "Linha Legada",
            "tipo": "privado",
            "ativo": false,
            "criterios": {}
        },
        "PF_CREDITO": {
            "nome": "Credito PF",
            "tipo": "pf",
            "criterios": {
                "situacao_empresa": ["pessoa_fisica"],
                "regioes": "todas"
            }
        },
        "ABERTO": { "nome": "Fundo Aberto", "tipo": "privado" }
    }
}"#;

fn catalog() -> FundCatalogDocument {
    serde_json::from_str(SEEDED_CATALOG).expect("catalog parses")
}

#[test]
fn reference_lead_against_seeded_catalog() {
    let document = catalog();

    let result = evaluate(&reference_lead(), &document.funds);

    let recommended: Vec<&str> = result.recommended.iter().map(|v| v.id.as_str()).collect();
    let rejected: Vec<(&str, &str)> = result
        .not_eligible
        .iter()
        .map(|v| (v.id.as_str(), v.reason.as_str()))
        .collect();

    assert_eq!(recommended, vec!["BNB_FNE", "ABERTO"]);
    assert_eq!(
        rejected,
        vec![
            ("BNDES_SUDESTE", "region 'Nordeste' not served"),
            (
                "PF_CREDITO",
                "company status 'cnpj_antigo' not accepted"
            ),
        ]
    );
    assert!(result.possibly_atypical.is_empty());
}

#[test]
fn rural_property_passes_subtype_gate_and_urban_does_not() {
    let document = catalog();
    let mut lead = reference_lead();
    lead.collateral = vec!["Imovel".to_string()];

    lead.real_estate_subtype = Some("Rural".to_string());
    assert!(evaluate(&lead, &document.funds).is_recommended("BNB_FNE"));

    lead.real_estate_subtype = Some("Comercial".to_string());
    let result = evaluate(&lead, &document.funds);
    let verdict = result
        .not_eligible
        .iter()
        .find(|v| v.id.as_str() == "BNB_FNE")
        .expect("BNB rejected");
    assert_eq!(verdict.reason, "real estate subtype 'Comercial' not accepted");
}

#[test]
fn every_active_fund_lands_in_exactly_one_bucket() {
    let document = catalog();
    let leads = [
        reference_lead(),
        LeadProfile {
            company_status: "pessoa_fisica".to_string(),
            revenue_bracket: "ate_5k".to_string(),
            region: "Sul".to_string(),
            segments: vec!["Varejo".to_string()],
            reasons: vec!["Giro".to_string()],
            collateral: vec!["Nenhuma".to_string()],
            real_estate_subtype: None,
        },
    ];

    for lead in &leads {
        let result = evaluate(lead, &document.funds);
        let mut seen: Vec<&str> = result
            .recommended
            .iter()
            .chain(result.not_eligible.iter())
            .map(|v| v.id.as_str())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["ABERTO", "BNB_FNE", "BNDES_SUDESTE", "PF_CREDITO"]);
    }
}
