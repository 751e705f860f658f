//! One-time migration of the flat per-role feature lists that predate
//! `featuresByRole`.

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::content::{strings_from_value, Feature, MainModule, SubModule};

/// Legacy top-level key → role it is migrated into.
pub const LEGACY_FEATURE_KEYS: &[(&str, &str)] = &[
    ("featureSales", "Sales"),
    ("featureAdmin", "Admin"),
];

/// Move every legacy feature list of `content` into `featuresByRole` and drop
/// the legacy keys. Returns true when anything was migrated.
///
/// Legacy values are either flat rows (`mainModule`, `subModule`,
/// `feature`/`name`, `mandays`, `condition`/`conditions`) or an already nested
/// module list. Modules and sub-modules are merged by name into whatever the
/// role already holds.
pub fn migrate_legacy_features(content: &mut Value) -> bool {
    let Some(root) = content.as_object_mut() else {
        return false;
    };

    let mut migrated = false;
    for (legacy_key, role) in LEGACY_FEATURE_KEYS {
        let Some(legacy) = root.remove(*legacy_key) else {
            continue;
        };
        migrated = true;

        let modules = match &legacy {
            Value::Array(rows) => modules_from_rows(rows),
            Value::Null => Vec::new(),
            other => {
                warn!("dropping {} with unexpected shape: {}", legacy_key, other);
                Vec::new()
            }
        };

        let by_role = root
            .entry("featuresByRole")
            .or_insert_with(|| Value::Object(Map::new()));
        if !by_role.is_object() {
            *by_role = Value::Object(Map::new());
        }
        let Some(by_role) = by_role.as_object_mut() else {
            continue;
        };

        let mut existing: Vec<MainModule> = by_role
            .get(*role)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        merge_modules(&mut existing, modules);

        info!("migrated {} into role {}", legacy_key, role);
        by_role.insert(
            role.to_string(),
            serde_json::to_value(existing).unwrap_or(Value::Array(Vec::new())),
        );
    }

    migrated
}

/// True when `content` still carries any legacy key.
pub fn has_legacy_features(content: &Value) -> bool {
    LEGACY_FEATURE_KEYS
        .iter()
        .any(|(key, _)| content.get(*key).is_some())
}

fn modules_from_rows(rows: &[Value]) -> Vec<MainModule> {
    let mut modules: Vec<MainModule> = Vec::new();

    for row in rows {
        if row.get("subModules").is_some() {
            if let Ok(module) = serde_json::from_value::<MainModule>(row.clone()) {
                merge_modules(&mut modules, vec![module]);
            }
            continue;
        }

        let module_name = text(row, &["mainModule", "module"]);
        let sub_name = text(row, &["subModule"]);
        let feature_name = text(row, &["feature", "name"]);
        if module_name.is_empty() && feature_name.is_empty() {
            continue;
        }

        let conditions = ["conditions", "condition"]
            .iter()
            .find_map(|key| row.get(*key))
            .map(strings_from_value)
            .unwrap_or_default();

        let mut features = Vec::new();
        if !feature_name.is_empty() {
            features.push(Feature {
                name: feature_name,
                mandays: number(row.get("mandays")),
                conditions,
            });
        }

        merge_modules(
            &mut modules,
            vec![MainModule {
                name: module_name,
                sub_modules: vec![SubModule {
                    name: sub_name,
                    features,
                }],
            }],
        );
    }

    modules
}

/// Merge `incoming` into `target`, joining modules and sub-modules that share
/// a name and appending features.
pub fn merge_modules(target: &mut Vec<MainModule>, incoming: Vec<MainModule>) {
    for module in incoming {
        match target.iter_mut().find(|m| m.name == module.name) {
            Some(existing) => {
                for sub in module.sub_modules {
                    match existing.sub_modules.iter_mut().find(|s| s.name == sub.name) {
                        Some(existing_sub) => existing_sub.features.extend(sub.features),
                        None => existing.sub_modules.push(sub),
                    }
                }
            }
            None => target.push(module),
        }
    }
}

fn text(row: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| row.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
