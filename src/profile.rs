use serde::{Deserialize, Serialize};

/// The profile shape the recommendation pipeline extracts features from.
///
/// Every field except `client_id` has a total default, so a sparse or empty
/// stored record still yields a complete profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedProfile {
    pub client_id: String,
    pub geo_city: String,
    pub subsession_length: i64,
    pub locale: String,
    pub os: String,
    /// Non-system add-on ids, in the order the client reported them.
    pub installed_addons: Vec<String>,
    pub disabled_addons_ids: Vec<String>,
    pub bookmark_count: i64,
    pub tab_open_count: i64,
    pub total_uri: i64,
    pub unique_tlds: i64,
}

impl NormalizedProfile {
    /// The fixed placeholder returned for reserved test client ids.
    pub fn synthetic(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            geo_city: "Toronto".to_string(),
            subsession_length: 42,
            locale: "en-CA".to_string(),
            os: "Linux".to_string(),
            ..Self::default()
        }
    }
}
