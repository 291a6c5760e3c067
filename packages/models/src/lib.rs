#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data model for heavy-vehicle street suitability advisories.
//!
//! These types cross every package boundary: the geometry resolver produces
//! [`VerifiedStreetContext`] and [`RoutePlan`], the analysis engine produces
//! [`StreetSuitability`] and [`RouteSuitability`], the conditions fetcher
//! produces [`LiveConditionsSnapshot`], and the animator derives
//! [`AnimationState`] from a route polyline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel street name used when the spatial-tag source has no `name` tag.
pub const UNNAMED_ROAD: &str = "Unnamed Road";

/// Maximum number of waypoints in a multi-stop route.
pub const MAX_WAYPOINTS: usize = 10;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, validating that both components are finite and
    /// within WGS84 range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
        {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }
}

/// Heavy-vehicle classes an operator can plan for, lightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    /// Delivery van up to 3.5 t.
    DeliveryVan,
    /// Box truck up to 7.5 t.
    BoxTruck7t5,
    /// Rigid truck up to 12 t.
    RigidTruck12t,
    /// Articulated semi-trailer up to 40 t.
    SemiTrailer40t,
}

impl VehicleClass {
    /// All classes in ascending weight order.
    pub const ALL: &[Self] = &[
        Self::DeliveryVan,
        Self::BoxTruck7t5,
        Self::RigidTruck12t,
        Self::SemiTrailer40t,
    ];

    /// Whether this is the heaviest tier, which triggers the strict
    /// narrow-street override hint during analysis.
    #[must_use]
    pub const fn is_heaviest(self) -> bool {
        matches!(self, Self::SemiTrailer40t)
    }

    /// Human-readable label for prompts and the operator shell.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DeliveryVan => "delivery van (3.5t)",
            Self::BoxTruck7t5 => "box truck (7.5t)",
            Self::RigidTruck12t => "rigid truck (12t)",
            Self::SemiTrailer40t => "semi-trailer (40t)",
        }
    }
}

/// Street attributes sourced from the authoritative geometry/tag database,
/// as opposed to generated or inferred attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedStreetContext {
    /// Street name; [`UNNAMED_ROAD`] when the way carries no name tag.
    pub name: String,
    /// Road classification tag (e.g., `"residential"`, `"pedestrian"`).
    pub road_class: String,
    /// Carriageway width in meters, if tagged.
    pub width_m: Option<f64>,
    /// Number of lanes, if tagged.
    pub lane_count: Option<u32>,
    /// Posted speed limit, verbatim from the tag (units vary by region).
    pub speed_limit: Option<String>,
    /// Surface material, if tagged.
    pub surface: Option<String>,
}

/// A fixed 12-bucket (2-hour interval) profile of expected traffic density
/// over a day, starting at 00:00. Every bucket is in `[0, 10]`.
///
/// The 12-element length invariant is load-bearing for downstream chart
/// rendering, so it is enforced at the type level: there is no way to
/// construct a curve of any other length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CongestionCurve([u8; 12]);

impl CongestionCurve {
    /// Neutral fallback curve: quiet (2) with midday buckets (10:00-16:00)
    /// at 5. Used for degraded analyses and wrong-length generator output.
    pub const NEUTRAL: Self = Self([2, 2, 2, 2, 2, 5, 5, 5, 2, 2, 2, 2]);

    /// All-zero curve, used when the analysis service cannot be reached at
    /// all and no traffic estimate exists.
    pub const QUIET: Self = Self([0; 12]);

    /// Creates a curve, rejecting any bucket outside `[0, 10]`.
    #[must_use]
    pub fn new(buckets: [u8; 12]) -> Option<Self> {
        if buckets.iter().all(|&b| b <= 10) {
            Some(Self(buckets))
        } else {
            None
        }
    }

    /// The 12 bucket values.
    #[must_use]
    pub const fn buckets(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Which path produced an analysis result.
///
/// Degraded and failed fallbacks are deliberately distinguishable: a
/// quota-exhausted analysis is optimistic while an unreachable service is
/// pessimistic, and the operator needs to know which one they are seeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisProvenance {
    /// Well-formed output from the generative service.
    Generated,
    /// Rate-limit fallback: optimistic placeholder.
    Degraded,
    /// Hard-failure fallback: pessimistic placeholder.
    Failed,
}

/// Suitability judgment for a single street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetSuitability {
    /// Street this judgment applies to.
    pub street_name: String,
    /// Whether the selected vehicle class may traverse the street.
    pub is_suitable: bool,
    /// Why not, when `is_suitable` is false. Best-effort: generation
    /// sources may omit it.
    pub restriction_reason: Option<String>,
    /// Posted or inferred weight limit in tonnes.
    pub max_weight_t: Option<f64>,
    /// Street width in meters (generated, falling back to verified).
    pub street_width_m: Option<f64>,
    /// Lane count. Always the verified value when verified context exists.
    pub lane_count: Option<u32>,
    /// Overall congestion score in `[0, 10]`.
    pub congestion_score: u8,
    /// Expected traffic density over a day.
    pub congestion_curve: CongestionCurve,
    /// Rush-hour time ranges (e.g., `"07:00-09:00"`), in order.
    pub rush_hour_windows: Vec<String>,
    /// Free-text assessment for the operator.
    pub narrative: String,
    /// Alternative streets to consider, in order of preference.
    pub alternatives: Vec<String>,
    /// Which path produced this result.
    pub provenance: AnalysisProvenance,
    /// When the judgment was produced.
    pub generated_at: DateTime<Utc>,
}

/// Suitability judgment for a multi-stop route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSuitability {
    /// Route score in `[0, 100]`, higher is better.
    pub score: u8,
    /// Whether the route as a whole is navigable by the vehicle class.
    pub is_suitable: bool,
    /// Warnings the operator should read before dispatching.
    pub warnings: Vec<String>,
    /// Short traffic forecast for the route.
    pub traffic_prediction: String,
    /// Streets on the route flagged as problematic, in traversal order.
    pub problematic_streets: Vec<String>,
    /// Expected duration adjustment (e.g., `"+15 min in the evening peak"`).
    pub duration_adjustment: String,
    /// Which path produced this result.
    pub provenance: AnalysisProvenance,
}

/// A cited web source backing a live-conditions summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source page title.
    pub title: String,
    /// Source URI.
    pub uri: String,
}

/// Current incidents and disruptions relevant to a street or route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveConditionsSnapshot {
    /// Short narrative summary of current conditions.
    pub summary: String,
    /// Cited sources, empty when the fetch degraded.
    pub sources: Vec<SourceRef>,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Ambient weather summary, a background enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Short narrative weather summary.
    pub summary: String,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// A computed multi-stop route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// The operator's stops, in order (2..=10 entries).
    pub waypoints: Vec<Coordinate>,
    /// The route's physical path.
    pub polyline: Vec<Coordinate>,
    /// Unique street names traversed, in first-traversal order.
    pub street_names: Vec<String>,
    /// Total route distance in meters.
    pub total_distance_m: f64,
    /// Total route duration in seconds.
    pub total_duration_s: f64,
}

/// A position along an animated route replay. Derived from the route plan
/// and elapsed time, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    /// Current position on the polyline.
    pub position: Coordinate,
    /// Travel heading in degrees, `[0, 360)`.
    pub heading_degrees: f64,
    /// Fraction of the cycle completed, `[0, 1)`.
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_accepts_valid_range() {
        assert!(Coordinate::new(50.9375, 6.9603).is_some());
        assert!(Coordinate::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_non_finite() {
        assert!(Coordinate::new(90.1, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn curve_rejects_bucket_above_ten() {
        assert!(CongestionCurve::new([11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).is_none());
        assert!(CongestionCurve::new([10; 12]).is_some());
    }

    #[test]
    fn fallback_curves_are_well_formed_and_distinct() {
        for curve in [CongestionCurve::NEUTRAL, CongestionCurve::QUIET] {
            assert_eq!(curve.buckets().len(), 12);
            assert!(curve.buckets().iter().all(|&b| b <= 10));
        }
        assert_ne!(CongestionCurve::NEUTRAL, CongestionCurve::QUIET);
    }

    #[test]
    fn neutral_curve_is_flat_two_with_midday_five() {
        let buckets = CongestionCurve::NEUTRAL.buckets();
        for (i, &b) in buckets.iter().enumerate() {
            if (5..=7).contains(&i) {
                assert_eq!(b, 5, "midday bucket {i}");
            } else {
                assert_eq!(b, 2, "off-peak bucket {i}");
            }
        }
    }

    #[test]
    fn only_semi_trailer_is_heaviest() {
        for class in VehicleClass::ALL {
            assert_eq!(class.is_heaviest(), *class == VehicleClass::SemiTrailer40t);
        }
    }
}
