#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry resolution for the advisor.
//!
//! Turns operator input into validated coordinates and verified street
//! context using three upstream services configured via TOML files in
//! `services/`:
//!
//! 1. **Nominatim**: free-text geocoding scoped to the target city.
//! 2. **Overpass**: radius-bounded spatial-tag queries, a tight radius for
//!    "what street am I standing on", a loose radius for a street's full
//!    outline. The dual-radius policy avoids false matches across disjoint
//!    areas sharing a street name while still capturing a street's extent.
//! 3. **OSRM**: ordered multi-stop route computation.
//!
//! All calls go through the resilience wrapper with the interactive retry
//! policy; rate-limit classification happens here at the transport adapters.

pub mod geocode;
pub mod routing;
pub mod service_registry;
pub mod streets;

use haul_advisor_models::{Coordinate, MAX_WAYPOINTS, RoutePlan, VerifiedStreetContext};
use haul_advisor_resilience::{RetryClass, RetryPolicy, with_retry};
use thiserror::Error;

use crate::service_registry::ProviderConfig;

/// Errors from geometry operations.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The caller's input is invalid (waypoint count out of range).
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },

    /// The routing backend reports no viable route.
    #[error("No route found between the given waypoints")]
    NoRouteFound,
}

impl RetryClass for GeometryError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// The city all geometry queries are scoped to.
#[derive(Debug, Clone)]
pub struct CityScope {
    /// City name appended to geocoding queries.
    pub city: String,
    /// ISO country code for geocoder boundary filtering.
    pub country_code: String,
}

impl CityScope {
    /// The default deployment target.
    #[must_use]
    pub fn cologne() -> Self {
        Self {
            city: "Köln".to_string(),
            country_code: "de".to_string(),
        }
    }
}

/// Resolves operator input into coordinates, street context and routes.
pub struct GeometryResolver {
    client: reqwest::Client,
    scope: CityScope,
    nominatim_url: String,
    overpass_url: String,
    nearest_radius_m: u32,
    outline_radius_m: u32,
    osrm_url: String,
    osrm_profile: String,
}

impl GeometryResolver {
    /// Creates a resolver scoped to `scope`, configured from the embedded
    /// service registry.
    ///
    /// # Panics
    ///
    /// Panics if an embedded service TOML is malformed (a compile-time
    /// guarantee; see [`service_registry`]).
    #[must_use]
    pub fn new(scope: CityScope) -> Self {
        let nominatim = service_registry::nominatim();
        let overpass = service_registry::overpass();
        let osrm = service_registry::osrm();

        let ProviderConfig::Overpass {
            base_url: overpass_url,
            nearest_radius_m,
            outline_radius_m,
        } = overpass.provider
        else {
            panic!("overpass service has wrong provider type");
        };
        let ProviderConfig::Osrm {
            base_url: osrm_url,
            profile: osrm_profile,
        } = osrm.provider
        else {
            panic!("osrm service has wrong provider type");
        };

        Self {
            client: reqwest::Client::new(),
            scope,
            nominatim_url: nominatim.base_url().to_string(),
            overpass_url,
            nearest_radius_m,
            outline_radius_m,
            osrm_url,
            osrm_profile,
        }
    }

    /// Creates a resolver with explicit service endpoints instead of the
    /// registry defaults; radii and the routing profile still come from
    /// the embedded registry. Tests point this at unroutable endpoints,
    /// and self-hosted deployments at their own instances.
    ///
    /// # Panics
    ///
    /// Panics if an embedded service TOML is malformed, as [`Self::new`].
    #[must_use]
    pub fn with_endpoints(
        scope: CityScope,
        nominatim_url: impl Into<String>,
        overpass_url: impl Into<String>,
        osrm_url: impl Into<String>,
    ) -> Self {
        Self {
            nominatim_url: nominatim_url.into(),
            overpass_url: overpass_url.into(),
            osrm_url: osrm_url.into(),
            ..Self::new(scope)
        }
    }

    /// Resolves free text to one coordinate within the target city.
    ///
    /// Returns `Ok(None)` when the upstream search yields zero results:
    /// "not found" is a valid empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] on transport or parse failure.
    pub async fn geocode(&self, text: &str) -> Result<Option<Coordinate>, GeometryError> {
        let query = format!("{text}, {}", self.scope.city);
        with_retry(RetryPolicy::interactive(), "geocode", || {
            geocode::geocode_freeform(
                &self.client,
                &self.nominatim_url,
                &query,
                &self.scope.country_code,
            )
        })
        .await
    }

    /// Finds the nearest tagged roadway within a tight radius of `coord`.
    ///
    /// Returns `Ok(None)` when nothing matches within the radius.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] on transport or parse failure.
    pub async fn nearest_street(
        &self,
        coord: Coordinate,
    ) -> Result<Option<VerifiedStreetContext>, GeometryError> {
        with_retry(RetryPolicy::interactive(), "nearest street", || {
            streets::nearest_street(
                &self.client,
                &self.overpass_url,
                coord,
                self.nearest_radius_m,
            )
        })
        .await
    }

    /// Fetches all roadway segments sharing `name` near `near`, for
    /// highlighting a street's full extent.
    ///
    /// Best-effort: any failure is logged and yields an empty sequence,
    /// never an error, since a missing highlight is cosmetic.
    pub async fn street_outline(&self, name: &str, near: Coordinate) -> Vec<Vec<Coordinate>> {
        let result = with_retry(RetryPolicy::interactive(), "street outline", || {
            streets::street_outline(
                &self.client,
                &self.overpass_url,
                name,
                near,
                self.outline_radius_m,
            )
        })
        .await;

        match result {
            Ok(segments) => segments,
            Err(e) => {
                log::warn!("street outline lookup for {name:?} failed: {e}");
                Vec::new()
            }
        }
    }

    /// Computes an ordered multi-stop route across `waypoints`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidInput`] for fewer than 2 or more
    /// than [`MAX_WAYPOINTS`] waypoints, [`GeometryError::NoRouteFound`]
    /// when the backend reports no viable route, and other variants on
    /// transport/parse failure.
    pub async fn compute_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<RoutePlan, GeometryError> {
        if waypoints.len() < 2 {
            return Err(GeometryError::InvalidInput {
                message: format!("routing requires at least 2 waypoints, got {}", waypoints.len()),
            });
        }
        if waypoints.len() > MAX_WAYPOINTS {
            return Err(GeometryError::InvalidInput {
                message: format!(
                    "routing supports at most {MAX_WAYPOINTS} waypoints, got {}",
                    waypoints.len()
                ),
            });
        }

        with_retry(RetryPolicy::interactive(), "compute route", || {
            routing::compute_route(
                &self.client,
                &self.osrm_url,
                &self.osrm_profile,
                waypoints,
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compute_route_rejects_too_few_waypoints() {
        let resolver = GeometryResolver::new(CityScope::cologne());
        let one = [Coordinate::new(50.94, 6.96).unwrap()];

        let err = resolver.compute_route(&one).await.unwrap_err();
        assert!(matches!(err, GeometryError::InvalidInput { .. }));

        let err = resolver.compute_route(&[]).await.unwrap_err();
        assert!(matches!(err, GeometryError::InvalidInput { .. }));
    }

    fn unroutable_resolver() -> GeometryResolver {
        GeometryResolver::with_endpoints(
            CityScope::cologne(),
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
        )
    }

    #[tokio::test]
    async fn street_outline_failure_yields_empty_outline() {
        let resolver = unroutable_resolver();
        let coord = Coordinate::new(50.94, 6.96).unwrap();
        // Connection refused surfaces as an empty outline, never an error.
        let segments = resolver.street_outline("Hohe Straße", coord).await;
        assert!(segments.is_empty());
    }

    #[tokio::test]
    async fn nearest_street_failure_propagates_to_the_caller() {
        let resolver = unroutable_resolver();
        let coord = Coordinate::new(50.94, 6.96).unwrap();
        let err = resolver.nearest_street(coord).await.unwrap_err();
        assert!(matches!(err, GeometryError::Http(_)));
    }

    #[tokio::test]
    async fn compute_route_rejects_too_many_waypoints() {
        let resolver = GeometryResolver::new(CityScope::cologne());
        let coord = Coordinate::new(50.94, 6.96).unwrap();
        let eleven = vec![coord; 11];

        let err = resolver.compute_route(&eleven).await.unwrap_err();
        assert!(matches!(err, GeometryError::InvalidInput { .. }));
    }
}
