use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::template::ProposalTemplate;
use crate::models::Role;

/// Canonical shape of a saved proposal.
///
/// Unknown top-level keys are kept in `extra` so a round trip through the
/// builder never drops data written by a newer client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalContent {
    pub system_environment: SystemEnvironment,
    pub features_by_role: IndexMap<String, Vec<MainModule>>,
    pub financial_breakdown: Vec<FinancialSection>,
    pub terms_of_payment: Vec<PaymentTerm>,
    pub terms_and_conditions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemEnvironment {
    pub platforms: Vec<String>,
    pub engines: Vec<String>,
    pub languages: Vec<String>,
    pub pairs: Vec<EnginePair>,
}

/// One engine × programming-language combination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnginePair {
    pub engine: String,
    pub language: String,
}

impl EnginePair {
    pub fn new(engine: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            language: language.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MainModule {
    pub name: String,
    pub sub_modules: Vec<SubModule>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubModule {
    pub name: String,
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feature {
    #[serde(alias = "feature")]
    pub name: String,
    #[serde(deserialize_with = "lenient_number")]
    pub mandays: f64,
    #[serde(deserialize_with = "lenient_strings")]
    pub conditions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialSection {
    pub title: String,
    pub items: Vec<LineItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    pub description: String,
    #[serde(deserialize_with = "lenient_number")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub price: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            description: String::new(),
            quantity: 1.0,
            price: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentTerm {
    #[serde(deserialize_with = "lenient_number")]
    pub percentage: f64,
    pub description: String,
    #[serde(deserialize_with = "lenient_number")]
    pub total: f64,
}

impl LineItem {
    pub fn total(&self) -> f64 {
        self.quantity * self.price
    }
}

impl FinancialSection {
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::total).sum()
    }
}

impl MainModule {
    pub fn mandays(&self) -> f64 {
        self.sub_modules
            .iter()
            .flat_map(|s| s.features.iter())
            .map(|f| f.mandays)
            .sum()
    }
}

impl ProposalContent {
    /// Starting point for a proposal of a project with `roles`: one empty
    /// feature tree per role plus the template's terms and pairs.
    pub fn default_for(roles: &[Role], template: &ProposalTemplate) -> Self {
        let features_by_role = roles
            .iter()
            .map(|role| (role.name.clone(), Vec::new()))
            .collect();

        Self {
            system_environment: SystemEnvironment {
                pairs: template.pairs(),
                ..Default::default()
            },
            features_by_role,
            terms_of_payment: template.terms_of_payment.clone(),
            terms_and_conditions: template.terms_and_conditions.clone(),
            ..Default::default()
        }
    }

    pub fn role_mandays(&self, role: &str) -> f64 {
        self.features_by_role
            .get(role)
            .map(|modules| modules.iter().map(MainModule::mandays).sum())
            .unwrap_or(0.0)
    }

    pub fn total_mandays(&self) -> f64 {
        self.features_by_role
            .keys()
            .map(|role| self.role_mandays(role))
            .sum()
    }

    pub fn financial_total(&self) -> f64 {
        self.financial_breakdown
            .iter()
            .map(FinancialSection::total)
            .sum()
    }

    /// Recompute each payment term's `total` as its share of the financial total.
    pub fn apply_payment_totals(&mut self) {
        let grand_total = self.financial_total();
        for term in &mut self.terms_of_payment {
            term.total = grand_total * term.percentage / 100.0;
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Accept numbers, numeric strings and blanks (as 0) for numeric fields.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Accept a list of strings, a list of `{text}` objects, or a single string.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(strings_from_value(&value))
}

pub(crate) fn strings_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => ["text", "description", "name", "condition"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
