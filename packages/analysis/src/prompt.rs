//! Prompt construction and output schemas for suitability analysis.
//!
//! Verified street data is injected into the prompt as ground truth. The
//! narrow-street override for the heaviest vehicle class is a *hint to the
//! generator*, not a locally enforced rule: the merge step accepts a
//! disagreeing generated result as-is.

use haul_advisor_models::{Coordinate, VehicleClass, VerifiedStreetContext};

/// Builds the street-analysis prompt.
pub fn street_prompt(
    city: &str,
    coord: Coordinate,
    vehicle_class: VehicleClass,
    verified: Option<&VerifiedStreetContext>,
) -> String {
    let mut prompt = format!(
        "You are a logistics analyst advising whether heavy vehicles can navigate \
         streets in {city}.\n\
         Vehicle class: {label}.\n\
         Location: latitude {lat:.6}, longitude {lon:.6}.\n",
        label = vehicle_class.label(),
        lat = coord.latitude,
        lon = coord.longitude,
    );

    if let Some(ctx) = verified {
        prompt.push_str("\nVerified street data (authoritative ground truth, do not contradict):\n");
        prompt.push_str(&format!("- name: {}\n", ctx.name));
        prompt.push_str(&format!("- classification: {}\n", ctx.road_class));
        if let Some(width) = ctx.width_m {
            prompt.push_str(&format!("- width: {width} m\n"));
        }
        if let Some(lanes) = ctx.lane_count {
            prompt.push_str(&format!("- lanes: {lanes}\n"));
        }
        if let Some(limit) = &ctx.speed_limit {
            prompt.push_str(&format!("- speed limit: {limit}\n"));
        }
        if let Some(surface) = &ctx.surface {
            prompt.push_str(&format!("- surface: {surface}\n"));
        }
    }

    prompt.push_str(
        "\nRules:\n\
         1. Base the judgment on legal restrictions (weight, width, access class) \
         and physical constraints.\n\
         2. Pedestrian zones and footways are never suitable for any class.\n",
    );

    if vehicle_class.is_heaviest() {
        if let Some(width) = verified.and_then(|c| c.width_m) {
            if width < 3.5 {
                prompt.push_str(&format!(
                    "3. The verified width is {width} m, below 3.5 m: for the \
                     semi-trailer class you must report isSuitable = false with a \
                     restriction reason naming the narrow carriageway.\n"
                ));
            }
        }
    }

    prompt.push_str(
        "\nReturn the congestion profile as exactly 12 integers (0-10), one per \
         2-hour bucket starting at 00:00. When unsuitable, always include a \
         restrictionReason and suggest alternative streets.\n",
    );

    prompt
}

/// Builds the route-analysis prompt.
pub fn route_prompt(city: &str, vehicle_class: VehicleClass, street_names: &[String]) -> String {
    format!(
        "You are a logistics analyst advising whether heavy vehicles can navigate \
         a multi-stop route in {city}.\n\
         Vehicle class: {label}.\n\
         Streets traversed, in order: {streets}.\n\n\
         Judge the whole route: score it 0-100 for this vehicle class, flag the \
         problematic streets by name, predict traffic, and estimate a duration \
         adjustment for current conditions.\n",
        label = vehicle_class.label(),
        streets = street_names.join(", "),
    )
}

/// Strict output schema for street analysis.
///
/// The fixed 12-element congestion curve constraint is part of the schema,
/// and re-validated after generation; schema enforcement upstream has
/// drifted before.
#[must_use]
pub fn street_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "isSuitable": { "type": "boolean" },
            "restrictionReason": { "type": "string" },
            "maxWeightTonnes": { "type": "number" },
            "streetWidthMeters": { "type": "number" },
            "laneCount": { "type": "integer", "minimum": 1 },
            "congestionScore": { "type": "integer", "minimum": 0, "maximum": 10 },
            "congestionCurve": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0, "maximum": 10 },
                "minItems": 12,
                "maxItems": 12
            },
            "rushHourWindows": { "type": "array", "items": { "type": "string" } },
            "narrative": { "type": "string" },
            "alternatives": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["isSuitable", "congestionScore", "congestionCurve", "narrative"]
    })
}

/// Strict output schema for route analysis.
#[must_use]
pub fn route_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "isSuitable": { "type": "boolean" },
            "warnings": { "type": "array", "items": { "type": "string" } },
            "trafficPrediction": { "type": "string" },
            "problematicStreets": { "type": "array", "items": { "type": "string" } },
            "durationAdjustment": { "type": "string" }
        },
        "required": ["score", "isSuitable", "trafficPrediction"]
    })
}
