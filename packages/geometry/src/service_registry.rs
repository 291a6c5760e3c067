//! Compile-time registry of geometry service configurations.
//!
//! Each upstream geometry service is defined in a TOML file under
//! `services/`. The registry embeds these at compile time and exposes the
//! typed per-role configurations via [`nominatim`], [`overpass`] and
//! [`osrm`].

use serde::Deserialize;

/// A geometry service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryService {
    /// Unique identifier (e.g., `"nominatim"`, `"overpass"`, `"osrm"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// API base URL.
        base_url: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
    },
    /// Overpass spatial-tag query endpoint.
    Overpass {
        /// API base URL.
        base_url: String,
        /// Radius for "what street am I standing on" lookups, in meters.
        /// Tight, so disjoint same-named streets never match.
        nearest_radius_m: u32,
        /// Radius for full-street outline lookups, in meters. Loose, so
        /// a street's whole extent is captured for highlighting.
        outline_radius_m: u32,
    },
    /// OSRM routing backend.
    Osrm {
        /// API base URL.
        base_url: String,
        /// Routing profile (e.g., `"driving"`).
        profile: String,
    },
}

const fn default_true() -> bool {
    true
}

impl GeometryService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. }
            | ProviderConfig::Overpass { base_url, .. }
            | ProviderConfig::Osrm { base_url, .. } => base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("overpass", include_str!("../services/overpass.toml")),
    ("osrm", include_str!("../services/osrm.toml")),
];

/// Returns all geometry service configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeometryService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geometry service '{name}': {e}"))
        })
        .collect()
}

fn service_by_id(id: &str) -> GeometryService {
    all_services()
        .into_iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("Missing geometry service '{id}'"))
}

/// The geocoding service configuration.
#[must_use]
pub fn nominatim() -> GeometryService {
    service_by_id("nominatim")
}

/// The spatial-tag query service configuration.
#[must_use]
pub fn overpass() -> GeometryService {
    service_by_id("overpass")
}

/// The routing service configuration.
#[must_use]
pub fn osrm() -> GeometryService {
    service_by_id("osrm")
}
