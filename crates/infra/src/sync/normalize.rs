//! Pure payload normalization, no I/O.
//!
//! Turns the raw upstream JSON into the flat shapes the repositories
//! persist: the nested stats array becomes a name-keyed map, type and
//! ability wrappers collapse to slug lists, and the species payload is
//! reduced to a generation slug plus two flags.

use std::collections::BTreeMap;

use dexsync_domain::{DexError, Result};
use serde_json::Value;

/// Scalar entity fields plus raw slug lists, before reference resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPokemon {
    pub pokeapi_id: u32,
    pub name: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub base_stats: BTreeMap<String, i64>,
    pub type_slugs: Vec<String>,
    pub ability_slugs: Vec<String>,
}

/// Species-level classification: generation slug and rarity flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesFacts {
    pub generation_slug: Option<String>,
    pub is_legendary: bool,
    pub is_mythical: bool,
}

/// Normalize one entity payload. A payload without a numeric `id` and a
/// `name` is rejected before any write happens.
pub fn normalize(payload: &Value) -> Result<NormalizedPokemon> {
    let pokeapi_id = payload
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| DexError::MalformedPayload("entity payload without id".into()))?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DexError::MalformedPayload(format!("entity #{pokeapi_id} without name")))?;

    Ok(NormalizedPokemon {
        pokeapi_id,
        name: name.to_string(),
        height: payload.get("height").and_then(Value::as_i64),
        weight: payload.get("weight").and_then(Value::as_i64),
        base_stats: stat_map(payload),
        type_slugs: wrapped_slugs(payload, "types", "type"),
        ability_slugs: wrapped_slugs(payload, "abilities", "ability"),
    })
}

/// Flatten the stats array (`[{base_stat, stat: {name}}]`) into a map.
/// Entries missing either side are skipped rather than failing the entity.
pub fn stat_map(payload: &Value) -> BTreeMap<String, i64> {
    let mut stats = BTreeMap::new();
    let Some(entries) = payload.get("stats").and_then(Value::as_array) else {
        return stats;
    };
    for entry in entries {
        let name = entry.pointer("/stat/name").and_then(Value::as_str);
        let value = entry.get("base_stat").and_then(Value::as_i64);
        if let (Some(name), Some(value)) = (name, value) {
            stats.insert(name.to_string(), value);
        }
    }
    stats
}

/// The URL of the entity's species record, when the payload carries one.
pub fn species_url(payload: &Value) -> Option<&str> {
    payload.pointer("/species/url").and_then(Value::as_str).filter(|url| !url.is_empty())
}

/// Reduce a species payload to its classification facts. Absent fields
/// default rather than fail: classification is best-effort enrichment.
pub fn species_facts(payload: &Value) -> SpeciesFacts {
    SpeciesFacts {
        generation_slug: payload
            .pointer("/generation/name")
            .and_then(Value::as_str)
            .filter(|slug| !slug.is_empty())
            .map(str::to_string),
        is_legendary: payload.get("is_legendary").and_then(Value::as_bool).unwrap_or(false),
        is_mythical: payload.get("is_mythical").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn wrapped_slugs(payload: &Value, field: &str, wrapper: &str) -> Vec<String> {
    let Some(entries) = payload.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .pointer(&format!("/{wrapper}/name"))
                .and_then(Value::as_str)
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pikachu() -> Value {
        json!({
            "id": 25,
            "name": "pikachu",
            "height": 4,
            "weight": 60,
            "stats": [
                {"base_stat": 35, "stat": {"name": "hp"}},
                {"base_stat": 90, "stat": {"name": "speed"}},
                {"base_stat": 55, "stat": {}}
            ],
            "types": [
                {"slot": 1, "type": {"name": "electric"}}
            ],
            "abilities": [
                {"ability": {"name": "static"}},
                {"ability": {"name": "lightning-rod"}}
            ],
            "species": {"name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/"}
        })
    }

    #[test]
    fn normalizes_a_complete_payload() {
        let normalized = normalize(&pikachu()).unwrap();
        assert_eq!(normalized.pokeapi_id, 25);
        assert_eq!(normalized.name, "pikachu");
        assert_eq!(normalized.height, Some(4));
        assert_eq!(normalized.base_stats, BTreeMap::from([("hp".into(), 35), ("speed".into(), 90)]));
        assert_eq!(normalized.type_slugs, vec!["electric"]);
        assert_eq!(normalized.ability_slugs, vec!["static", "lightning-rod"]);
    }

    #[test]
    fn rejects_payloads_without_id_or_name() {
        assert!(matches!(
            normalize(&json!({"name": "pikachu"})),
            Err(DexError::MalformedPayload(_))
        ));
        assert!(matches!(normalize(&json!({"id": 25})), Err(DexError::MalformedPayload(_))));
        assert!(matches!(
            normalize(&json!({"id": 25, "name": ""})),
            Err(DexError::MalformedPayload(_))
        ));
    }

    #[test]
    fn missing_optional_sections_default_to_empty() {
        let normalized = normalize(&json!({"id": 1, "name": "bulbasaur"})).unwrap();
        assert!(normalized.base_stats.is_empty());
        assert!(normalized.type_slugs.is_empty());
        assert!(normalized.ability_slugs.is_empty());
        assert_eq!(normalized.height, None);
    }

    #[test]
    fn species_url_requires_a_non_empty_value() {
        assert_eq!(
            species_url(&pikachu()),
            Some("https://pokeapi.co/api/v2/pokemon-species/25/")
        );
        assert_eq!(species_url(&json!({"species": {"url": ""}})), None);
        assert_eq!(species_url(&json!({})), None);
    }

    #[test]
    fn species_facts_default_when_fields_are_absent() {
        let facts = species_facts(&json!({
            "generation": {"name": "generation-i"},
            "is_legendary": false,
            "is_mythical": true
        }));
        assert_eq!(facts.generation_slug.as_deref(), Some("generation-i"));
        assert!(!facts.is_legendary);
        assert!(facts.is_mythical);

        assert_eq!(species_facts(&json!({})), SpeciesFacts::default());
    }
}
