//! Client-profile facade for the TAAR recommendation pipeline.
//!
//! This crate stitches the profile store (codec and backends) together with
//! field normalization so callers get a pipeline-ready profile, or nothing,
//! from a single call.
//!
//! ```
//! use serde_json::json;
//! use taar_profile::{BackendConfig, ProfileFetcher};
//!
//! let fetcher = ProfileFetcher::new(BackendConfig::in_memory());
//! let record = json!({
//!     "client_id": "abc123",
//!     "city": "Paris",
//!     "active_addons": [{"addon_id": "ublock"}, {"addon_id": "pocket", "is_system": true}]
//! });
//! fetcher.put(record.as_object().unwrap()).unwrap();
//!
//! let profile = fetcher.get("abc123").unwrap().unwrap();
//! assert_eq!(profile.geo_city, "Paris");
//! assert_eq!(profile.installed_addons, vec!["ublock"]);
//! assert!(fetcher.get("unknown").unwrap().is_none());
//! ```

pub mod config;
mod fetcher;
mod normalize;
mod profile;

pub use config::{AppConfig, BackendKind, ConfigLoadError};
pub use fetcher::{FetchError, ProfileFetcher, TestClientIds};
pub use normalize::normalize;
pub use profile::NormalizedProfile;

pub use store::{
    BackendConfig, KeyValueBackend, KeyValueConfig, Lookup, PayloadCodec, ProfileBackend,
    RawProfileRecord, StoreError, WideColumnBackend, WideColumnConfig,
};
