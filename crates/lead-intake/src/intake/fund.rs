use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Values that mark a criteria dimension as open to every lead.
pub const UNCONSTRAINED_SENTINELS: [&str; 2] = ["todos", "all"];

/// Fund categories accepted by the admin catalog.
pub const FUND_KINDS: [&str; 4] = ["constitucional", "privado", "desenvolvimento", "pf"];

/// Financing product offered to leads, as stored in the fund catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundDefinition {
    #[serde(rename = "nome", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "tipo", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(
        rename = "ativo",
        default = "active_by_default",
        deserialize_with = "lenient_flag"
    )]
    pub active: bool,
    #[serde(rename = "criterios", default, deserialize_with = "lenient_criteria")]
    pub criteria: FundCriteria,
}

impl FundDefinition {
    /// Display name, falling back to the catalog key for unnamed funds.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        if self.name.is_empty() {
            id
        } else {
            &self.name
        }
    }
}

fn active_by_default() -> bool {
    true
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Ok(text),
        _ => Ok(String::new()),
    }
}

/// Truthiness of a stored `ativo` value: `null`, `false`, `0`, `""` and empty
/// collections read as inactive, anything else as active.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let active = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    };
    Ok(active)
}

/// A criteria block that is not an object places no restriction on the fund.
fn lenient_criteria<'de, D>(deserializer: D) -> Result<FundCriteria, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => {
            Ok(serde_json::from_value(value).unwrap_or_default())
        }
        _ => Ok(FundCriteria::default()),
    }
}

/// Accepted values per lead dimension. An empty list means unconstrained.
///
/// Each dimension is read leniently: a value that is not a list becomes an
/// empty list and non-string entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundCriteria {
    #[serde(rename = "situacao_empresa", default, deserialize_with = "lenient_list")]
    pub company_status: Vec<String>,
    #[serde(rename = "faturamento_renda", default, deserialize_with = "lenient_list")]
    pub revenue_bracket: Vec<String>,
    #[serde(rename = "regioes", default, deserialize_with = "lenient_list")]
    pub regions: Vec<String>,
    #[serde(rename = "segmentos", default, deserialize_with = "lenient_list")]
    pub segments: Vec<String>,
    #[serde(rename = "razoes", default, deserialize_with = "lenient_list")]
    pub reasons: Vec<String>,
    #[serde(rename = "garantias", default, deserialize_with = "lenient_list")]
    pub collateral: Vec<String>,
    #[serde(rename = "tipo_imovel", default, deserialize_with = "lenient_list")]
    pub real_estate_subtypes: Vec<String>,
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let values = match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(values)
}

/// True when the list places no restriction on the dimension.
pub fn is_unconstrained(accepted: &[String]) -> bool {
    accepted.is_empty()
        || accepted
            .iter()
            .any(|value| UNCONSTRAINED_SENTINELS.contains(&value.as_str()))
}

pub fn accepts(accepted: &[String], value: &str) -> bool {
    is_unconstrained(accepted) || accepted.iter().any(|candidate| candidate == value)
}

/// Intersection match: one shared tag is enough.
pub fn accepts_any(accepted: &[String], values: &[String]) -> bool {
    is_unconstrained(accepted)
        || values
            .iter()
            .any(|value| accepted.iter().any(|candidate| candidate == value))
}
