//! Legacy grant-format migration.
//!
//! Older source items carry an ad hoc `{grants: {...}, modifiers: {...}}`
//! object: flat wounds/fate formulas, skill/talent/trait/equipment arrays,
//! nested choice objects, and characteristic modifier maps. This module
//! converts that shape into the grant-configuration array the engine
//! consumes, back-filling item entries without a stable reference with an
//! empty uuid and a `_legacyName` override marker.

use serde_json::{json, Value};

use grimward_domain::{
    CharacteristicGrantConfig, CharacteristicGrantEntry, ChoiceGrantConfig, ChoiceOption,
    GrantConfig, GrantKind, ItemGrantConfig, ItemGrantEntry, ResourceGrantConfig,
    ResourceGrantEntry, SkillGrantConfig, SkillGrantEntry, SourceItem, TrainingLevel,
};

/// Read a source item's grant configurations: the new-format array when
/// present, the legacy object migrated otherwise. Malformed elements are
/// reported as strings, never aborting the rest.
pub fn extract_grants(system: &Value) -> (Vec<GrantConfig>, Vec<String>) {
    match system.get("grants") {
        Some(Value::Array(elements)) => {
            let mut configs = Vec::new();
            let mut errors = Vec::new();
            for (index, element) in elements.iter().enumerate() {
                match serde_json::from_value::<GrantConfig>(element.clone()) {
                    Ok(config) => configs.push(config),
                    Err(e) => errors.push(format!("Grant {}: {}", index, e)),
                }
            }
            (configs, errors)
        }
        Some(Value::Object(_)) => migrate_legacy(system),
        _ if system.get("modifiers").is_some() => migrate_legacy(system),
        _ => (Vec::new(), Vec::new()),
    }
}

/// Convert a legacy `{grants, modifiers}` document into the configuration
/// array.
pub fn migrate_legacy(system: &Value) -> (Vec<GrantConfig>, Vec<String>) {
    let mut configs = Vec::new();
    let mut errors = Vec::new();

    if let Some(grants) = system.get("grants").and_then(Value::as_object) {
        for (field, label) in [("wounds", "Wounds"), ("fate", "Fate")] {
            match grants.get(field) {
                Some(value) if !value.is_null() => match formula_string(value) {
                    Some(formula) => configs.push(
                        GrantConfig::new(GrantKind::Resource(ResourceGrantConfig {
                            resources: vec![ResourceGrantEntry {
                                resource_type: field.to_string(),
                                formula,
                                optional: false,
                            }],
                        }))
                        .with_label(label),
                    ),
                    None => errors.push(format!(
                        "Legacy {} formula is neither a string nor a number",
                        field
                    )),
                },
                _ => {}
            }
        }

        if let Some(skills) = grants.get("skills") {
            migrate_skills(skills, &mut configs, &mut errors);
        }

        for (field, label) in [
            ("talents", "Talents"),
            ("traits", "Traits"),
            ("equipment", "Equipment"),
        ] {
            if let Some(items) = grants.get(field) {
                migrate_items(items, field, label, &mut configs, &mut errors);
            }
        }

        if let Some(choices) = grants.get("choices") {
            migrate_choices(choices, &mut configs, &mut errors);
        }
    }

    if let Some(characteristics) = system
        .get("modifiers")
        .and_then(|m| m.get("characteristics"))
        .and_then(Value::as_object)
    {
        let mut entries = Vec::new();
        for (key, value) in characteristics {
            match value.as_i64() {
                Some(delta) if delta != 0 => entries.push(CharacteristicGrantEntry {
                    key: key.clone(),
                    value: delta as i32,
                    optional: false,
                }),
                Some(_) => {}
                None => errors.push(format!(
                    "Legacy characteristic modifier '{}' is not a number",
                    key
                )),
            }
        }
        if !entries.is_empty() {
            configs.push(
                GrantConfig::new(GrantKind::Characteristic(CharacteristicGrantConfig {
                    characteristics: entries,
                }))
                .with_label("Characteristics"),
            );
        }
    }

    (configs, errors)
}

/// Build a source item from a host document, reading (or migrating) its
/// grant array out of the `system` envelope.
pub fn source_item_from_document(name: &str, document: &Value) -> (SourceItem, Vec<String>) {
    let system = document.get("system").unwrap_or(document);
    let (grants, errors) = extract_grants(system);
    (SourceItem::new(name, grants), errors)
}

fn formula_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn migrate_skills(skills: &Value, configs: &mut Vec<GrantConfig>, errors: &mut Vec<String>) {
    let Some(elements) = skills.as_array() else {
        errors.push("Legacy skills value is not an array".to_string());
        return;
    };
    let mut entries = Vec::new();
    for element in elements {
        match element {
            Value::String(key) => entries.push(SkillGrantEntry {
                key: key.clone(),
                specialization: None,
                level: TrainingLevel::Trained,
                optional: false,
            }),
            Value::Object(object) => {
                let Some(key) = object
                    .get("key")
                    .or_else(|| object.get("name"))
                    .and_then(Value::as_str)
                else {
                    errors.push("Legacy skill entry is missing a key".to_string());
                    continue;
                };
                let level = match object.get("level") {
                    Some(value) => match serde_json::from_value::<TrainingLevel>(value.clone()) {
                        Ok(level) => level,
                        Err(_) => {
                            errors.push(format!(
                                "Legacy skill '{}' has an unknown level '{}'",
                                key, value
                            ));
                            continue;
                        }
                    },
                    None => TrainingLevel::Trained,
                };
                entries.push(SkillGrantEntry {
                    key: key.to_string(),
                    specialization: object
                        .get("specialization")
                        .and_then(Value::as_str)
                        .map(String::from),
                    level,
                    optional: false,
                });
            }
            other => errors.push(format!("Legacy skill entry has unexpected shape: {}", other)),
        }
    }
    if !entries.is_empty() {
        configs.push(
            GrantConfig::new(GrantKind::Skill(SkillGrantConfig { skills: entries }))
                .with_label("Skills"),
        );
    }
}

fn migrate_items(
    items: &Value,
    field: &str,
    label: &str,
    configs: &mut Vec<GrantConfig>,
    errors: &mut Vec<String>,
) {
    let Some(elements) = items.as_array() else {
        errors.push(format!("Legacy {} value is not an array", field));
        return;
    };
    let mut entries = Vec::new();
    for element in elements {
        match element {
            Value::String(name) => entries.push(legacy_item_entry("", name)),
            Value::Object(object) => {
                let uuid = object.get("uuid").and_then(Value::as_str).unwrap_or("");
                let name = object.get("name").and_then(Value::as_str).unwrap_or("");
                if uuid.is_empty() && name.is_empty() {
                    errors.push(format!(
                        "Legacy {} entry has neither a uuid nor a name",
                        field
                    ));
                    continue;
                }
                entries.push(legacy_item_entry(uuid, name));
            }
            other => errors.push(format!(
                "Legacy {} entry has unexpected shape: {}",
                field, other
            )),
        }
    }
    if !entries.is_empty() {
        configs.push(
            GrantConfig::new(GrantKind::Item(ItemGrantConfig { items: entries }))
                .with_label(label),
        );
    }
}

/// Best-effort uuid back-fill: entries without a stable reference keep an
/// empty uuid plus a `_legacyName` marker, and are skipped at apply time.
fn legacy_item_entry(uuid: &str, name: &str) -> ItemGrantEntry {
    let overrides = if name.is_empty() {
        None
    } else if uuid.is_empty() {
        Some(json!({ "name": name, "_legacyName": name }))
    } else {
        Some(json!({ "name": name }))
    };
    ItemGrantEntry {
        uuid: uuid.to_string(),
        optional: false,
        overrides,
    }
}

fn migrate_choices(choices: &Value, configs: &mut Vec<GrantConfig>, errors: &mut Vec<String>) {
    let Some(elements) = choices.as_array() else {
        errors.push("Legacy choices value is not an array".to_string());
        return;
    };
    for (index, element) in elements.iter().enumerate() {
        let Some(object) = element.as_object() else {
            errors.push(format!("Legacy choice {} is not an object", index));
            continue;
        };
        let count = object.get("count").and_then(Value::as_u64).unwrap_or(1) as u32;
        let Some(options) = object.get("options").and_then(Value::as_array) else {
            errors.push(format!("Legacy choice {} has no options", index));
            continue;
        };
        let mut migrated_options = Vec::new();
        for (option_index, option) in options.iter().enumerate() {
            let Some(option) = option.as_object() else {
                errors.push(format!(
                    "Legacy choice {} option {} is not an object",
                    index, option_index
                ));
                continue;
            };
            let label = option
                .get("label")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("Option {}", option_index + 1));
            // Option contents are themselves a legacy grants object (or an
            // already-migrated array); route them back through extraction.
            let nested_value = option.get("grants").cloned().unwrap_or(Value::Null);
            let (nested, nested_errors) = extract_grants(&json!({ "grants": nested_value }));
            errors.extend(
                nested_errors
                    .into_iter()
                    .map(|e| format!("Choice option '{}': {}", label, e)),
            );
            migrated_options.push(ChoiceOption {
                label,
                description: option
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
                grants: nested,
            });
        }
        let mut config = GrantConfig::new(GrantKind::Choice(ChoiceGrantConfig {
            count,
            options: migrated_options,
            allow_duplicates: object
                .get("allowDuplicates")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }));
        config.label = object
            .get("label")
            .and_then(Value::as_str)
            .map(String::from);
        configs.push(config);
    }
}
