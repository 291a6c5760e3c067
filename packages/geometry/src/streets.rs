//! Overpass spatial-tag queries: nearest street and street outlines.
//!
//! Queries are radius-bounded around a coordinate. The nearest-street
//! lookup uses the tight radius (precision: the way the operator is
//! standing on), the outline lookup uses the loose radius (completeness:
//! every same-named segment worth highlighting).
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API>

use haul_advisor_models::{Coordinate, UNNAMED_ROAD, VerifiedStreetContext};

use crate::GeometryError;

/// Finds the nearest `highway`-tagged way within `radius_m` of `coord`.
///
/// Returns `Ok(None)` when nothing matches within the radius.
///
/// # Errors
///
/// Returns [`GeometryError`] if the HTTP request or response parsing fails,
/// with HTTP 429 mapped to [`GeometryError::RateLimited`].
pub async fn nearest_street(
    client: &reqwest::Client,
    base_url: &str,
    coord: Coordinate,
    radius_m: u32,
) -> Result<Option<VerifiedStreetContext>, GeometryError> {
    let query = format!(
        "[out:json][timeout:25];\
         way(around:{radius_m},{lat},{lon})[highway];\
         out tags 1;",
        lat = coord.latitude,
        lon = coord.longitude,
    );
    let body = run_query(client, base_url, &query).await?;
    Ok(parse_nearest(&body))
}

/// Fetches the geometry of all `highway` ways named `name` within
/// `radius_m` of `near`.
///
/// # Errors
///
/// Returns [`GeometryError`] if the HTTP request or response parsing fails.
/// The resolver converts failures to an empty outline; this function stays
/// fallible so the retry wrapper can see rate limits.
pub async fn street_outline(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    near: Coordinate,
    radius_m: u32,
) -> Result<Vec<Vec<Coordinate>>, GeometryError> {
    let query = format!(
        "[out:json][timeout:25];\
         way(around:{radius_m},{lat},{lon})[highway][name=\"{name}\"];\
         out geometry;",
        lat = near.latitude,
        lon = near.longitude,
        name = escape_ql(name),
    );
    let body = run_query(client, base_url, &query).await?;
    Ok(parse_outline(&body))
}

/// Posts an Overpass QL query and returns the parsed JSON body.
async fn run_query(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<serde_json::Value, GeometryError> {
    let resp = client
        .post(base_url)
        .form(&[("data", query)])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeometryError::RateLimited);
    }

    Ok(resp.json().await?)
}

/// Escapes a street name for embedding in a quoted Overpass QL string.
fn escape_ql(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Maps the first way element's tags into a verified street context.
fn parse_nearest(body: &serde_json::Value) -> Option<VerifiedStreetContext> {
    let elements = body["elements"].as_array()?;
    let tags = elements.iter().find_map(|e| {
        let tags = &e["tags"];
        tags["highway"].as_str().map(|_| tags)
    })?;

    Some(VerifiedStreetContext {
        name: tags["name"]
            .as_str()
            .unwrap_or(UNNAMED_ROAD)
            .to_string(),
        // Guarded by the find_map above.
        road_class: tags["highway"].as_str().unwrap_or_default().to_string(),
        width_m: tags["width"].as_str().and_then(parse_width),
        lane_count: tags["lanes"].as_str().and_then(|s| s.trim().parse().ok()),
        speed_limit: tags["maxspeed"].as_str().map(String::from),
        surface: tags["surface"].as_str().map(String::from),
    })
}

/// Parses a `width` tag leniently: `"4.5"`, `"4.5 m"`, `"4,5"`.
fn parse_width(raw: &str) -> Option<f64> {
    let cleaned = raw
        .trim()
        .trim_end_matches('m')
        .trim()
        .replace(',', ".");
    cleaned.parse().ok().filter(|w: &f64| w.is_finite() && *w > 0.0)
}

/// Maps way geometries into coordinate sequences.
fn parse_outline(body: &serde_json::Value) -> Vec<Vec<Coordinate>> {
    let Some(elements) = body["elements"].as_array() else {
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|e| {
            let geometry = e["geometry"].as_array()?;
            let segment: Vec<Coordinate> = geometry
                .iter()
                .filter_map(|p| {
                    Coordinate::new(p["lat"].as_f64()?, p["lon"].as_f64()?)
                })
                .collect();
            (!segment.is_empty()).then_some(segment)
        })
        .collect()
}
