#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive operator shell for the haul advisor.
//!
//! A thin dialoguer-driven loop over [`haul_advisor_session::Session`]:
//! all business logic lives in the core packages; this binary only maps
//! menu choices to session operations and prints the resulting working
//! set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dialoguer::{Input, Select};
use haul_advisor_analysis::SuitabilityAnalysisEngine;
use haul_advisor_conditions::LiveConditionsFetcher;
use haul_advisor_generative::providers::create_provider_from_env;
use haul_advisor_geometry::{CityScope, GeometryResolver};
use haul_advisor_models::{Coordinate, VehicleClass};
use haul_advisor_session::{Mode, ModeKind, RouteOutcome, Session, SessionEvent, StreetSelection};

/// Menu actions, filtered by mode at render time.
enum Action {
    Search,
    PickCoordinate,
    AddWaypoint,
    ComputeRoute,
    ReplayRoute,
    SwitchMode,
    ChangeVehicle,
    RefreshWeather,
    Quit,
}

impl Action {
    const fn label(&self) -> &'static str {
        match self {
            Self::Search => "Search for a street",
            Self::PickCoordinate => "Enter coordinates",
            Self::AddWaypoint => "Add a waypoint",
            Self::ComputeRoute => "Compute the route",
            Self::ReplayRoute => "Replay the route",
            Self::SwitchMode => "Switch mode",
            Self::ChangeVehicle => "Change vehicle class",
            Self::RefreshWeather => "Refresh weather",
            Self::Quit => "Quit",
        }
    }

    fn for_mode(mode: &Mode) -> Vec<Self> {
        match mode {
            Mode::Explore { .. } => vec![
                Self::Search,
                Self::PickCoordinate,
                Self::SwitchMode,
                Self::ChangeVehicle,
                Self::RefreshWeather,
                Self::Quit,
            ],
            Mode::Route { .. } => vec![
                Self::AddWaypoint,
                Self::ComputeRoute,
                Self::ReplayRoute,
                Self::SwitchMode,
                Self::ChangeVehicle,
                Self::RefreshWeather,
                Self::Quit,
            ],
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let provider = match create_provider_from_env() {
        Ok(provider) => Arc::from(provider),
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Set GEMINI_API_KEY to enable suitability analysis.");
            std::process::exit(1);
        }
    };

    let city = std::env::var("HAUL_CITY").unwrap_or_else(|_| "Köln".to_string());
    let scope = CityScope {
        city: city.clone(),
        country_code: std::env::var("HAUL_COUNTRY").unwrap_or_else(|_| "de".to_string()),
    };

    let mut session = Session::new(
        GeometryResolver::new(scope),
        SuitabilityAnalysisEngine::new(Arc::clone(&provider), city.clone()),
        LiveConditionsFetcher::new(provider, city.clone()),
        VehicleClass::SemiTrailer40t,
    );

    println!("Haul Advisor ({city})");
    println!();

    loop {
        let mode_label = match session.mode() {
            Mode::Explore { .. } => "explore".to_string(),
            Mode::Route { waypoints, .. } => format!("route, {} stop(s)", waypoints.len()),
        };
        let actions = Action::for_mode(session.mode());
        let labels: Vec<&str> = actions.iter().map(Action::label).collect();

        let idx = Select::new()
            .with_prompt(format!(
                "[{mode_label} | {}] What next?",
                session.vehicle_class().label()
            ))
            .items(&labels)
            .default(0)
            .interact()?;

        let event = match actions[idx] {
            Action::Search => {
                let query: String = Input::new().with_prompt("Street or place").interact_text()?;
                session.search(&query).await
            }
            Action::PickCoordinate => match prompt_coordinate()? {
                Some(coord) => session.select_coordinate(coord).await,
                None => SessionEvent::Notice {
                    message: "Invalid coordinate".to_string(),
                },
            },
            Action::AddWaypoint => match prompt_coordinate()? {
                Some(coord) => session.add_waypoint(coord),
                None => SessionEvent::Notice {
                    message: "Invalid coordinate".to_string(),
                },
            },
            Action::ComputeRoute => session.compute_route().await,
            Action::ReplayRoute => {
                replay(&mut session).await;
                continue;
            }
            Action::SwitchMode => {
                let kind = match session.mode() {
                    Mode::Explore { .. } => ModeKind::Route,
                    Mode::Route { .. } => ModeKind::Explore,
                };
                session.set_mode(kind)
            }
            Action::ChangeVehicle => {
                let labels: Vec<&str> =
                    VehicleClass::ALL.iter().map(|c| c.label()).collect();
                let idx = Select::new()
                    .with_prompt("Vehicle class")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                session.set_vehicle_class(VehicleClass::ALL[idx]);
                continue;
            }
            Action::RefreshWeather => session.refresh_weather().await,
            Action::Quit => return Ok(()),
        };

        report(&event, &session);
    }
}

fn prompt_coordinate() -> Result<Option<Coordinate>, dialoguer::Error> {
    let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
    let lon: f64 = Input::new().with_prompt("Longitude").interact_text()?;
    Ok(Coordinate::new(lat, lon))
}

fn report(event: &SessionEvent, session: &Session) {
    match event {
        SessionEvent::SelectionAnalyzed => {
            if let Mode::Explore {
                selection: Some(selection),
            } = session.mode()
            {
                print_selection(selection);
            }
        }
        SessionEvent::RoutePlanned => {
            if let Mode::Route {
                outcome: Some(outcome),
                ..
            } = session.mode()
            {
                print_route(outcome);
            }
        }
        SessionEvent::NotFound { query } => println!("No match for {query:?}."),
        SessionEvent::WaypointAdded { count } => println!("Waypoint {count} added."),
        SessionEvent::WaypointRejected { message } | SessionEvent::Notice { message } => {
            println!("{message}");
        }
        SessionEvent::Superseded => println!("Superseded by a newer request."),
        SessionEvent::ModeChanged => println!("Mode switched."),
        SessionEvent::WeatherRefreshed => {
            if let Some(weather) = session.weather() {
                println!("Weather: {}", weather.summary);
            }
        }
    }
    println!();
}

fn print_selection(selection: &StreetSelection) {
    let analysis = &selection.analysis;
    println!();
    println!("== {} ==", analysis.street_name);
    println!(
        "Suitable: {}{}",
        if analysis.is_suitable { "yes" } else { "NO" },
        analysis
            .restriction_reason
            .as_deref()
            .map(|r| format!(" - {r}"))
            .unwrap_or_default()
    );
    if let Some(width) = analysis.street_width_m {
        println!("Width: {width} m");
    }
    if let Some(lanes) = analysis.lane_count {
        println!("Lanes: {lanes}");
    }
    println!("Congestion: {}/10, curve {:?}", analysis.congestion_score, analysis.congestion_curve.buckets());
    println!("{}", analysis.narrative);
    if !analysis.alternatives.is_empty() {
        println!("Alternatives: {}", analysis.alternatives.join(", "));
    }
    if !selection.outline.is_empty() {
        println!("({} outline segment(s) available)", selection.outline.len());
    }
    println!("Conditions: {}", selection.conditions.summary);
    for source in &selection.conditions.sources {
        println!("  - {} <{}>", source.title, source.uri);
    }
}

fn print_route(outcome: &RouteOutcome) {
    let plan = &outcome.plan;
    let analysis = &outcome.analysis;
    println!();
    println!(
        "== Route: {:.1} km, {:.0} min ==",
        plan.total_distance_m / 1000.0,
        plan.total_duration_s / 60.0
    );
    println!("Streets: {}", plan.street_names.join(" → "));
    println!(
        "Score: {}/100, suitable: {}",
        analysis.score,
        if analysis.is_suitable { "yes" } else { "NO" }
    );
    for warning in &analysis.warnings {
        println!("  ! {warning}");
    }
    if !analysis.problematic_streets.is_empty() {
        println!("Problematic: {}", analysis.problematic_streets.join(", "));
    }
    println!("Traffic: {} ({})", analysis.traffic_prediction, analysis.duration_adjustment);
    println!("Conditions: {}", outcome.conditions.summary);
}

/// Prints a short replay of the computed route polyline.
async fn replay(session: &mut Session) {
    let start = Instant::now();
    let mut printed = false;
    for _ in 0..20 {
        if let Some(state) = session.animator_tick(start.elapsed()) {
            println!(
                "  {:>5.1}%  {:.5}, {:.5}  heading {:>5.1}°",
                state.progress * 100.0,
                state.position.latitude,
                state.position.longitude,
                state.heading_degrees
            );
            printed = true;
        } else {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    if printed {
        println!();
    } else {
        println!("No route to replay; compute a route first.\n");
    }
}
