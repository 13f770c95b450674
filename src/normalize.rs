//! Raw storage record → [`NormalizedProfile`].
//!
//! The mapping is total: every lookup falls back to the field's default, and a
//! value of the wrong JSON type is treated as absent.

use serde_json::Value;
use store::RawProfileRecord;

use crate::NormalizedProfile;

const ACTIVE_ADDONS: &str = "active_addons";
const DISABLED_ADDONS_IDS: &str = "disabled_addons_ids";
const CITY: &str = "city";
const LOCALE: &str = "locale";
const OS: &str = "os";
const SUBSESSION_LENGTH: &str = "subsession_length";
const BOOKMARKS_COUNT: &str = "places_bookmarks_count";
const TAB_OPEN_COUNT: &str = "scalar_parent_browser_engagement_tab_open_event_count";
const TOTAL_URI_COUNT: &str = "scalar_parent_browser_engagement_total_uri_count";
const UNIQUE_DOMAINS_COUNT: &str = "scalar_parent_browser_engagement_unique_domains_count";

/// Map `raw` into the pipeline schema.
///
/// `client_id` is the identifier the caller asked for; any `client_id` inside
/// the stored record is ignored.
pub fn normalize(client_id: &str, raw: &RawProfileRecord) -> NormalizedProfile {
    NormalizedProfile {
        client_id: client_id.to_string(),
        geo_city: string_field(raw, CITY),
        subsession_length: count_field(raw, SUBSESSION_LENGTH),
        locale: string_field(raw, LOCALE),
        os: string_field(raw, OS),
        installed_addons: installed_addons(raw),
        disabled_addons_ids: string_list(raw, DISABLED_ADDONS_IDS),
        bookmark_count: count_field(raw, BOOKMARKS_COUNT),
        tab_open_count: count_field(raw, TAB_OPEN_COUNT),
        total_uri: count_field(raw, TOTAL_URI_COUNT),
        unique_tlds: count_field(raw, UNIQUE_DOMAINS_COUNT),
    }
}

fn string_field(raw: &RawProfileRecord, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn count_field(raw: &RawProfileRecord, key: &str) -> i64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .unwrap_or_default(),
        _ => 0,
    }
}

fn string_list(raw: &RawProfileRecord, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Ids of `active_addons` entries that are not system add-ons.
fn installed_addons(raw: &RawProfileRecord) -> Vec<String> {
    let Some(addons) = raw.get(ACTIVE_ADDONS).and_then(Value::as_array) else {
        return Vec::new();
    };

    addons
        .iter()
        .filter(|addon| !addon.get("is_system").is_some_and(truthy))
        .filter_map(|addon| addon.get("addon_id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// JSON truthiness: `false`, `0`, `""`, `[]`, `{}` and `null` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
