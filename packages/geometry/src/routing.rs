//! OSRM multi-stop routing client.
//!
//! Requests GeoJSON geometry with per-step names so the route's traversed
//! street list can be extracted alongside the polyline.
//!
//! See <http://project-osrm.org/docs/v5.24.0/api/>

use haul_advisor_models::{Coordinate, RoutePlan};

use crate::GeometryError;

/// Computes an ordered route through `waypoints`.
///
/// Waypoint count validation happens in the resolver before any network
/// call; this function assumes 2..=10 stops.
///
/// # Errors
///
/// Returns [`GeometryError::NoRouteFound`] when the backend reports no
/// viable route, and other variants on transport/parse failure.
pub async fn compute_route(
    client: &reqwest::Client,
    base_url: &str,
    profile: &str,
    waypoints: &[Coordinate],
) -> Result<RoutePlan, GeometryError> {
    // OSRM takes lon,lat pairs; the rest of the system is lat,lon.
    let stops = waypoints
        .iter()
        .map(|w| format!("{},{}", w.longitude, w.latitude))
        .collect::<Vec<_>>()
        .join(";");
    let url = format!("{base_url}/route/v1/{profile}/{stops}");

    let resp = client
        .get(&url)
        .query(&[
            ("overview", "full"),
            ("geometries", "geojson"),
            ("steps", "true"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeometryError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body, waypoints)
}

/// Parses an OSRM route response into a [`RoutePlan`].
fn parse_response(
    body: &serde_json::Value,
    waypoints: &[Coordinate],
) -> Result<RoutePlan, GeometryError> {
    match body["code"].as_str() {
        Some("Ok") => {}
        Some("NoRoute" | "NoSegment") => return Err(GeometryError::NoRouteFound),
        Some(other) => {
            return Err(GeometryError::Parse {
                message: format!("OSRM error code: {other}"),
            });
        }
        None => {
            return Err(GeometryError::Parse {
                message: "OSRM response missing code".to_string(),
            });
        }
    }

    let route = body["routes"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or(GeometryError::NoRouteFound)?;

    let polyline = route["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| GeometryError::Parse {
            message: "OSRM route missing GeoJSON coordinates".to_string(),
        })?
        .iter()
        .filter_map(|pair| {
            // GeoJSON order is [lon, lat]; convert to canonical lat/lon.
            let lon = pair[0].as_f64()?;
            let lat = pair[1].as_f64()?;
            Coordinate::new(lat, lon)
        })
        .collect();

    Ok(RoutePlan {
        waypoints: waypoints.to_vec(),
        polyline,
        street_names: extract_street_names(route),
        total_distance_m: route["distance"].as_f64().unwrap_or(0.0),
        total_duration_s: route["duration"].as_f64().unwrap_or(0.0),
    })
}

/// Extracts the unique street names traversed, preserving first-traversal
/// order. Unnamed steps (maneuvers on unnamed link roads) are skipped.
fn extract_street_names(route: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let Some(legs) = route["legs"].as_array() else {
        return names;
    };
    for leg in legs {
        let Some(steps) = leg["steps"].as_array() else {
            continue;
        };
        for step in steps {
            let Some(name) = step["name"].as_str() else {
                continue;
            };
            if name.is_empty() || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_waypoints() -> Vec<Coordinate> {
        vec![
            Coordinate::new(50.9413, 6.9583).unwrap(),
            Coordinate::new(50.9364, 6.9528).unwrap(),
        ]
    }

    #[test]
    fn parses_route_with_deduplicated_street_names() {
        let body = serde_json::json!({
            "code": "Ok",
            "routes": [{
                "geometry": {
                    "coordinates": [[6.9583, 50.9413], [6.9550, 50.9390], [6.9528, 50.9364]]
                },
                "legs": [{
                    "steps": [
                        { "name": "Komödienstraße" },
                        { "name": "" },
                        { "name": "Tunisstraße" },
                        { "name": "Komödienstraße" },
                        { "name": "Hohe Straße" }
                    ]
                }],
                "distance": 1243.5,
                "duration": 312.0
            }]
        });

        let plan = parse_response(&body, &sample_waypoints()).unwrap();
        assert_eq!(
            plan.street_names,
            vec!["Komödienstraße", "Tunisstraße", "Hohe Straße"]
        );
        // GeoJSON [lon, lat] converted to canonical lat/lon.
        assert!((plan.polyline[0].latitude - 50.9413).abs() < 1e-9);
        assert!((plan.polyline[0].longitude - 6.9583).abs() < 1e-9);
        assert!((plan.total_distance_m - 1243.5).abs() < f64::EPSILON);
        assert!((plan.total_duration_s - 312.0).abs() < f64::EPSILON);
        assert_eq!(plan.waypoints, sample_waypoints());
    }

    #[test]
    fn no_route_code_maps_to_no_route_found() {
        let body = serde_json::json!({ "code": "NoRoute" });
        assert!(matches!(
            parse_response(&body, &sample_waypoints()),
            Err(GeometryError::NoRouteFound)
        ));
    }

    #[test]
    fn identical_waypoints_yield_valid_zero_length_plan() {
        let coord = Coordinate::new(50.9364, 6.9528).unwrap();
        let body = serde_json::json!({
            "code": "Ok",
            "routes": [{
                "geometry": { "coordinates": [[6.9528, 50.9364]] },
                "legs": [{ "steps": [] }],
                "distance": 0.0,
                "duration": 0.0
            }]
        });
        let plan = parse_response(&body, &[coord, coord]).unwrap();
        assert!((plan.total_distance_m - 0.0).abs() < f64::EPSILON);
        assert!(plan.street_names.is_empty());
    }

    #[test]
    fn unexpected_code_is_a_parse_error() {
        let body = serde_json::json!({ "code": "InvalidQuery" });
        assert!(matches!(
            parse_response(&body, &sample_waypoints()),
            Err(GeometryError::Parse { .. })
        ));
    }
}
