use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::content::{EnginePair, PaymentTerm};

/// Options offered when building a proposal.
///
/// `pairRows` are kept raw because the rows arrive in several encodings; see
/// [`reconstruct_pairs`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalTemplate {
    pub platforms: Vec<String>,
    pub engines: Vec<String>,
    pub languages: Vec<String>,
    pub pair_rows: Vec<Value>,
    pub terms_of_payment: Vec<PaymentTerm>,
    pub terms_and_conditions: Vec<String>,
}

impl ProposalTemplate {
    /// Template served when no template file is configured.
    pub fn builtin() -> Self {
        Self {
            platforms: vec![
                "Android".to_string(),
                "iOS".to_string(),
                "Web".to_string(),
                "Desktop".to_string(),
            ],
            engines: vec![
                "Flutter".to_string(),
                "React Native".to_string(),
                "Laravel".to_string(),
                "Next.js".to_string(),
            ],
            languages: vec![
                "Dart".to_string(),
                "JavaScript".to_string(),
                "PHP".to_string(),
                "TypeScript".to_string(),
            ],
            pair_rows: vec![json!({
                "engines": ["Flutter", "React Native", "Laravel", "Next.js"],
                "languages": ["Dart", "JavaScript", "PHP", "TypeScript"]
            })],
            terms_of_payment: vec![
                PaymentTerm {
                    percentage: 30.0,
                    description: "Down payment after contract signing".to_string(),
                    total: 0.0,
                },
                PaymentTerm {
                    percentage: 40.0,
                    description: "User acceptance testing".to_string(),
                    total: 0.0,
                },
                PaymentTerm {
                    percentage: 30.0,
                    description: "Go live".to_string(),
                    total: 0.0,
                },
            ],
            terms_and_conditions: vec![
                "Prices exclude VAT.".to_string(),
                "This proposal is valid for 30 days.".to_string(),
            ],
        }
    }

    /// Every engine × language pair the template rows describe, duplicates removed.
    pub fn pairs(&self) -> Vec<EnginePair> {
        let mut pairs: Vec<EnginePair> = Vec::new();
        for pair in self.pair_rows.iter().flat_map(reconstruct_pairs) {
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }
}

/// Rebuild engine × language pairs from one template row.
///
/// A row carries `engines`/`engine` and `languages`/`language`, each either an
/// array, a string holding a JSON array, or a comma-separated string. Equal
/// lengths pair up by index; a single value on one side pairs with every value
/// on the other; otherwise the extra values on the longer side are ignored.
pub fn reconstruct_pairs(row: &Value) -> Vec<EnginePair> {
    let engines = list_field(row, &["engines", "engine"]);
    let languages = list_field(row, &["languages", "language", "programmingLanguages"]);

    match (engines.len(), languages.len()) {
        (0, _) | (_, 0) => Vec::new(),
        (1, _) => languages
            .into_iter()
            .map(|language| EnginePair::new(engines[0].clone(), language))
            .collect(),
        (_, 1) => engines
            .into_iter()
            .map(|engine| EnginePair::new(engine, languages[0].clone()))
            .collect(),
        (e, l) => {
            if e != l {
                debug!("pair row has {} engines but {} languages", e, l);
            }
            engines
                .into_iter()
                .zip(languages)
                .map(|(engine, language)| EnginePair::new(engine, language))
                .collect()
        }
    }
}

fn list_field(row: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| row.get(*key))
        .map(decode_list)
        .unwrap_or_default()
}

fn decode_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                    return decode_list(&parsed);
                }
            }
            raw.split(',')
                .map(|part| part.trim().trim_matches('"').to_string())
                .filter(|part| !part.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}
