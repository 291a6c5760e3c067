//! Strict validation and merge of generated analysis output.
//!
//! Generated output is validated against the fixed field schema; a missing
//! or mistyped required field is a hard failure. Presentation-only fields
//! degrade leniently, each with a logged warning: a wrong-length or
//! out-of-range congestion curve falls back to the neutral default (schema
//! enforcement upstream has drifted on array lengths before), non-string
//! list elements are dropped, and a missing duration adjustment gets a
//! placeholder.
//!
//! Merge rules when verified street context exists:
//! - `lane_count` always comes from the verified context.
//! - `street_width_m` falls back to the verified width when the generator
//!   omits it.
//! - `is_suitable` is accepted as generated, even when it contradicts the
//!   narrow-street hint in the prompt.

use chrono::Utc;
use haul_advisor_generative::ProviderError;
use haul_advisor_models::{
    AnalysisProvenance, CongestionCurve, RouteSuitability, StreetSuitability,
    VerifiedStreetContext,
};

/// Validates and merges a generated street analysis.
///
/// # Errors
///
/// Returns [`ProviderError::Malformed`] when a required field is missing or
/// has the wrong type.
pub fn street_from_value(
    value: &serde_json::Value,
    street_name: &str,
    verified: Option<&VerifiedStreetContext>,
) -> Result<StreetSuitability, ProviderError> {
    let is_suitable = require_bool(value, "isSuitable")?;
    let congestion_score = require_bounded_int(value, "congestionScore", 10)?;
    let narrative = require_str(value, "narrative")?;

    let restriction_reason = value["restrictionReason"].as_str().map(String::from);
    if !is_suitable && restriction_reason.is_none() {
        // Best-effort invariant; generation sources violate it at times.
        log::warn!("Generator marked {street_name:?} unsuitable without a restriction reason");
    }

    let lane_count = verified.map_or_else(
        || {
            value["laneCount"]
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
        },
        |ctx| ctx.lane_count,
    );

    Ok(StreetSuitability {
        street_name: street_name.to_string(),
        is_suitable,
        restriction_reason,
        max_weight_t: value["maxWeightTonnes"].as_f64(),
        street_width_m: value["streetWidthMeters"]
            .as_f64()
            .or_else(|| verified.and_then(|ctx| ctx.width_m)),
        lane_count,
        congestion_score,
        congestion_curve: curve_or_neutral(&value["congestionCurve"], street_name),
        rush_hour_windows: string_array(&value["rushHourWindows"], "rushHourWindows"),
        narrative,
        alternatives: string_array(&value["alternatives"], "alternatives"),
        provenance: AnalysisProvenance::Generated,
        generated_at: Utc::now(),
    })
}

/// Validates a generated route analysis.
///
/// # Errors
///
/// Returns [`ProviderError::Malformed`] when a required field is missing or
/// has the wrong type.
pub fn route_from_value(value: &serde_json::Value) -> Result<RouteSuitability, ProviderError> {
    Ok(RouteSuitability {
        score: require_bounded_int(value, "score", 100)?,
        is_suitable: require_bool(value, "isSuitable")?,
        warnings: string_array(&value["warnings"], "warnings"),
        traffic_prediction: require_str(value, "trafficPrediction")?,
        problematic_streets: string_array(&value["problematicStreets"], "problematicStreets"),
        duration_adjustment: value["durationAdjustment"].as_str().map_or_else(
            || {
                log::warn!("Generator omitted durationAdjustment, using placeholder");
                "no estimate".to_string()
            },
            String::from,
        ),
        provenance: AnalysisProvenance::Generated,
    })
}

fn require_bool(value: &serde_json::Value, field: &str) -> Result<bool, ProviderError> {
    value[field].as_bool().ok_or_else(|| ProviderError::Malformed {
        message: format!("missing or non-boolean field: {field}"),
    })
}

fn require_str(value: &serde_json::Value, field: &str) -> Result<String, ProviderError> {
    value[field]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ProviderError::Malformed {
            message: format!("missing or non-string field: {field}"),
        })
}

fn require_bounded_int(
    value: &serde_json::Value,
    field: &str,
    max: u8,
) -> Result<u8, ProviderError> {
    value[field]
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .filter(|&n| n <= max)
        .ok_or_else(|| ProviderError::Malformed {
            message: format!("missing or out-of-range field: {field}"),
        })
}

fn string_array(value: &serde_json::Value, field: &str) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let strings: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    if strings.len() != items.len() {
        log::warn!(
            "Dropped {} non-string element(s) from {field}",
            items.len() - strings.len(),
        );
    }
    strings
}

/// Builds the congestion curve from generated output, falling back to the
/// neutral default when the array has the wrong length or invalid buckets.
fn curve_or_neutral(value: &serde_json::Value, street_name: &str) -> CongestionCurve {
    let parsed = value.as_array().and_then(|items| {
        let buckets: Vec<u8> = items
            .iter()
            .filter_map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect();
        let fixed: [u8; 12] = buckets.try_into().ok()?;
        CongestionCurve::new(fixed)
    });

    parsed.unwrap_or_else(|| {
        log::warn!("Generator returned an invalid congestion curve for {street_name:?}, using neutral default");
        CongestionCurve::NEUTRAL
    })
}
