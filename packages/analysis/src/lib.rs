#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street and route suitability analysis.
//!
//! Reconciles ground-truth street geometry with generated judgments under
//! strict consistency rules, and converts every failure into a well-typed
//! fallback. A logistics advisory must always render *something*, so
//! neither [`SuitabilityAnalysisEngine::analyze_street`] nor
//! [`SuitabilityAnalysisEngine::analyze_route`] can fail.
//!
//! The three result shapes are distinguishable by provenance:
//!
//! - **Generated**: validated output from the generative service, merged
//!   with verified data.
//! - **Degraded**: quota exhausted after retries; optimistic placeholder
//!   (assume permitted, neutral congestion).
//! - **Failed**: service unreachable or malformed output; pessimistic
//!   placeholder (assume not permitted, zero congestion).

pub mod prompt;
pub mod validate;

use std::sync::Arc;

use chrono::Utc;
use haul_advisor_generative::providers::GenerativeProvider;
use haul_advisor_models::{
    AnalysisProvenance, CongestionCurve, Coordinate, RouteSuitability, StreetSuitability,
    VehicleClass, VerifiedStreetContext,
};
use haul_advisor_resilience::{RetryClass, RetryPolicy, with_retry};

/// Generates, validates and merges suitability judgments.
pub struct SuitabilityAnalysisEngine {
    provider: Arc<dyn GenerativeProvider>,
    city: String,
}

impl SuitabilityAnalysisEngine {
    /// Creates an engine for the given city.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerativeProvider>, city: impl Into<String>) -> Self {
        Self {
            provider,
            city: city.into(),
        }
    }

    /// Analyzes a single street for the given vehicle class.
    ///
    /// `verified` attributes, when available, are injected into the prompt
    /// as ground truth and outrank generated values during the merge (see
    /// [`validate`]). Never fails: quota exhaustion yields a degraded
    /// result, anything else a failed result.
    pub async fn analyze_street(
        &self,
        coord: Coordinate,
        vehicle_class: VehicleClass,
        verified: Option<&VerifiedStreetContext>,
    ) -> StreetSuitability {
        let street_name = verified.map_or_else(
            || format!("near {:.5}, {:.5}", coord.latitude, coord.longitude),
            |ctx| ctx.name.clone(),
        );

        let prompt = prompt::street_prompt(&self.city, coord, vehicle_class, verified);
        let schema = prompt::street_schema();

        let result = with_retry(RetryPolicy::analysis(), "street analysis", || {
            self.provider.generate_structured(&prompt, &schema)
        })
        .await;

        match result {
            Ok(value) => match validate::street_from_value(&value, &street_name, verified) {
                Ok(suitability) => suitability,
                Err(e) => {
                    log::error!("Street analysis for {street_name:?} returned malformed output: {e}");
                    failed_street(&street_name)
                }
            },
            Err(e) if e.is_rate_limited() => {
                log::warn!("Street analysis for {street_name:?} rate limited, degrading: {e}");
                degraded_street(&street_name)
            }
            Err(e) => {
                log::error!("Street analysis for {street_name:?} failed: {e}");
                failed_street(&street_name)
            }
        }
    }

    /// Analyzes a multi-stop route across the given streets.
    ///
    /// Never fails; the same three-way generated/degraded/failed split as
    /// [`Self::analyze_street`].
    pub async fn analyze_route(
        &self,
        vehicle_class: VehicleClass,
        street_names: &[String],
    ) -> RouteSuitability {
        let prompt = prompt::route_prompt(&self.city, vehicle_class, street_names);
        let schema = prompt::route_schema();

        let result = with_retry(RetryPolicy::analysis(), "route analysis", || {
            self.provider.generate_structured(&prompt, &schema)
        })
        .await;

        match result {
            Ok(value) => match validate::route_from_value(&value) {
                Ok(suitability) => suitability,
                Err(e) => {
                    log::error!("Route analysis returned malformed output: {e}");
                    failed_route()
                }
            },
            Err(e) if e.is_rate_limited() => {
                log::warn!("Route analysis rate limited, degrading: {e}");
                degraded_route()
            }
            Err(e) => {
                log::error!("Route analysis failed: {e}");
                failed_route()
            }
        }
    }
}

/// Optimistic placeholder for quota exhaustion: assume permitted, neutral
/// congestion, and say so in the narrative.
fn degraded_street(street_name: &str) -> StreetSuitability {
    StreetSuitability {
        street_name: street_name.to_string(),
        is_suitable: true,
        restriction_reason: None,
        max_weight_t: None,
        street_width_m: None,
        lane_count: None,
        congestion_score: 3,
        congestion_curve: CongestionCurve::NEUTRAL,
        rush_hour_windows: Vec::new(),
        narrative: "Analysis temporarily unavailable (rate limited). No restrictions are known; \
                    verify signage on site."
            .to_string(),
        alternatives: Vec::new(),
        provenance: AnalysisProvenance::Degraded,
        generated_at: Utc::now(),
    }
}

/// Pessimistic placeholder for hard failures: assume not permitted.
fn failed_street(street_name: &str) -> StreetSuitability {
    StreetSuitability {
        street_name: street_name.to_string(),
        is_suitable: false,
        restriction_reason: Some("Analysis service could not be reached".to_string()),
        max_weight_t: None,
        street_width_m: None,
        lane_count: None,
        congestion_score: 0,
        congestion_curve: CongestionCurve::QUIET,
        rush_hour_windows: Vec::new(),
        narrative: "The analysis service could not be reached. Treat this street as \
                    unverified and do not dispatch without manual checks."
            .to_string(),
        alternatives: Vec::new(),
        provenance: AnalysisProvenance::Failed,
        generated_at: Utc::now(),
    }
}

fn degraded_route() -> RouteSuitability {
    RouteSuitability {
        score: 50,
        is_suitable: true,
        warnings: vec![
            "Route verification incomplete: analysis temporarily unavailable (rate limited)"
                .to_string(),
        ],
        traffic_prediction: "No prediction available".to_string(),
        problematic_streets: Vec::new(),
        duration_adjustment: "unknown".to_string(),
        provenance: AnalysisProvenance::Degraded,
    }
}

fn failed_route() -> RouteSuitability {
    RouteSuitability {
        score: 0,
        is_suitable: false,
        warnings: vec!["Analysis service unavailable; route is unverified".to_string()],
        traffic_prediction: "No prediction available".to_string(),
        problematic_streets: Vec::new(),
        duration_adjustment: "unknown".to_string(),
        provenance: AnalysisProvenance::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_advisor_generative::ProviderError;
    use haul_advisor_generative::providers::GroundedAnswer;

    /// Scripted provider: either returns a fixed value or a fixed error
    /// kind on every call.
    struct FakeProvider {
        response: Result<serde_json::Value, FakeFailure>,
    }

    #[derive(Clone, Copy)]
    enum FakeFailure {
        RateLimited,
        Unreachable,
    }

    #[async_trait::async_trait]
    impl GenerativeProvider for FakeProvider {
        async fn generate_structured(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
        ) -> Result<serde_json::Value, ProviderError> {
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(FakeFailure::RateLimited) => Err(ProviderError::RateLimited),
                Err(FakeFailure::Unreachable) => Err(ProviderError::Provider {
                    message: "connection refused".to_string(),
                }),
            }
        }

        async fn generate_grounded(&self, _prompt: &str) -> Result<GroundedAnswer, ProviderError> {
            unimplemented!("analysis never uses grounded generation")
        }
    }

    fn engine(response: Result<serde_json::Value, FakeFailure>) -> SuitabilityAnalysisEngine {
        SuitabilityAnalysisEngine::new(Arc::new(FakeProvider { response }), "Köln")
    }

    fn coord() -> Coordinate {
        Coordinate::new(50.9364, 6.9528).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_and_failed_street_shapes_are_distinguishable() {
        let degraded = engine(Err(FakeFailure::RateLimited))
            .analyze_street(coord(), VehicleClass::RigidTruck12t, None)
            .await;
        assert!(degraded.is_suitable);
        assert_eq!(degraded.congestion_curve, CongestionCurve::NEUTRAL);
        assert_eq!(degraded.provenance, AnalysisProvenance::Degraded);

        let failed = engine(Err(FakeFailure::Unreachable))
            .analyze_street(coord(), VehicleClass::RigidTruck12t, None)
            .await;
        assert!(!failed.is_suitable);
        assert_eq!(failed.congestion_curve, CongestionCurve::QUIET);
        assert_eq!(failed.provenance, AnalysisProvenance::Failed);

        assert_ne!(degraded.provenance, failed.provenance);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_output_degrades_to_failed_shape() {
        let result = engine(Ok(serde_json::json!({ "isSuitable": "yes" })))
            .analyze_street(coord(), VehicleClass::DeliveryVan, None)
            .await;
        assert_eq!(result.provenance, AnalysisProvenance::Failed);
        assert!(!result.is_suitable);
    }

    #[tokio::test(start_paused = true)]
    async fn merge_does_not_override_generator_on_narrow_street() {
        // Verified width 2.8 m + heaviest class: a compliant generator must
        // report unsuitable, but one that ignores the hint is accepted
        // as-is rather than silently patched.
        let narrow = VerifiedStreetContext {
            name: "Auf dem Berlich".to_string(),
            road_class: "residential".to_string(),
            width_m: Some(2.8),
            lane_count: Some(1),
            speed_limit: None,
            surface: None,
        };
        let noncompliant = serde_json::json!({
            "isSuitable": true,
            "congestionScore": 2,
            "congestionCurve": [1, 1, 1, 1, 2, 3, 3, 3, 3, 2, 1, 1],
            "narrative": "Fine."
        });
        let result = engine(Ok(noncompliant))
            .analyze_street(coord(), VehicleClass::SemiTrailer40t, Some(&narrow))
            .await;
        assert!(result.is_suitable);
        assert_eq!(result.provenance, AnalysisProvenance::Generated);
        // Merge still applies: verified width backfills the omitted field.
        assert_eq!(result.street_width_m, Some(2.8));
    }

    #[tokio::test(start_paused = true)]
    async fn pedestrian_street_is_unsuitable_for_heaviest_class() {
        // A compliant generator honors the pedestrian classification.
        let pedestrian = VerifiedStreetContext {
            name: "Hohe Straße".to_string(),
            road_class: "pedestrian".to_string(),
            width_m: None,
            lane_count: None,
            speed_limit: None,
            surface: Some("paving_stones".to_string()),
        };
        let compliant = serde_json::json!({
            "isSuitable": false,
            "restrictionReason": "Pedestrian zone: motor vehicle access prohibited",
            "congestionScore": 8,
            "congestionCurve": [0, 0, 0, 1, 3, 6, 8, 9, 9, 8, 4, 1],
            "narrative": "Hohe Straße is a pedestrian shopping street.",
            "alternatives": ["Nord-Süd-Fahrt"]
        });
        let result = engine(Ok(compliant))
            .analyze_street(coord(), VehicleClass::SemiTrailer40t, Some(&pedestrian))
            .await;
        assert!(!result.is_suitable);
        assert_eq!(result.street_name, "Hohe Straße");
        assert!(result.restriction_reason.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_and_failed_route_shapes_are_distinguishable() {
        let streets = vec!["Komödienstraße".to_string(), "Hohe Straße".to_string()];

        let degraded = engine(Err(FakeFailure::RateLimited))
            .analyze_route(VehicleClass::SemiTrailer40t, &streets)
            .await;
        assert_eq!(degraded.score, 50);
        assert!(degraded.is_suitable);
        assert_eq!(degraded.provenance, AnalysisProvenance::Degraded);
        assert!(!degraded.warnings.is_empty());

        let failed = engine(Err(FakeFailure::Unreachable))
            .analyze_route(VehicleClass::SemiTrailer40t, &streets)
            .await;
        assert_eq!(failed.score, 0);
        assert!(!failed.is_suitable);
        assert_eq!(failed.provenance, AnalysisProvenance::Failed);
    }
}
