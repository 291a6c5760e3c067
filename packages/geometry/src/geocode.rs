//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance (see `rate_limit_ms` in the service TOML).
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use haul_advisor_models::Coordinate;

use crate::GeometryError;

/// Geocodes a free-form query using the Nominatim search endpoint.
///
/// Returns `Ok(None)` when the search yields zero results.
///
/// # Errors
///
/// Returns [`GeometryError`] if the HTTP request or response parsing fails,
/// with HTTP 429 mapped to [`GeometryError::RateLimited`].
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    country_code: &str,
) -> Result<Option<Coordinate>, GeometryError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("countrycodes", country_code),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeometryError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a Nominatim JSON response into a validated coordinate.
fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinate>, GeometryError> {
    let results = body.as_array().ok_or_else(|| GeometryError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeometryError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeometryError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let coord = Coordinate::new(lat, lon).ok_or_else(|| GeometryError::Parse {
        message: format!("Coordinate out of range: {lat}, {lon}"),
    })?;

    Ok(Some(coord))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "50.9364",
            "lon": "6.9528",
            "display_name": "Hohe Straße, Altstadt-Nord, Köln, Germany"
        }]);
        let coord = parse_response(&body).unwrap().unwrap();
        assert!((coord.latitude - 50.9364).abs() < 1e-4);
        assert!((coord.longitude - 6.9528).abs() < 1e-4);
    }

    #[test]
    fn empty_result_is_not_found_not_error() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_out_of_range_coordinate() {
        let body = serde_json::json!([{ "lat": "95.0", "lon": "6.95" }]);
        assert!(matches!(
            parse_response(&body),
            Err(GeometryError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({ "error": "unavailable" });
        assert!(matches!(
            parse_response(&body),
            Err(GeometryError::Parse { .. })
        ));
    }
}
