#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-action session orchestration.
//!
//! A [`Session`] owns the current mode's working set and coordinates the
//! geometry resolver, analysis engine, conditions fetcher and route
//! animator per operator action. The two modes are a tagged enum, each
//! variant carrying only its own state, so switching modes clears the
//! other mode's state by construction.
//!
//! Analysis and live conditions fan out concurrently and join; both
//! branches degrade internally, so the join itself cannot fail. Each
//! operation takes a request generation token at the start and commits its
//! results only if the token is still current; a superseded operation's
//! results are dropped instead of overwriting fresher state.

use std::time::Duration;

use haul_advisor_analysis::SuitabilityAnalysisEngine;
use haul_advisor_animator::RouteAnimator;
use haul_advisor_conditions::LiveConditionsFetcher;
use haul_advisor_geometry::{GeometryError, GeometryResolver};
use haul_advisor_models::{
    AnimationState, Coordinate, LiveConditionsSnapshot, MAX_WAYPOINTS, RoutePlan,
    RouteSuitability, StreetSuitability, VehicleClass, VerifiedStreetContext, WeatherSnapshot,
};

/// The session's current mode and its working set.
#[derive(Debug)]
pub enum Mode {
    /// Single-street exploration: one analyzed selection at a time.
    Explore {
        /// The currently analyzed street, if any.
        selection: Option<Box<StreetSelection>>,
    },
    /// Multi-stop route planning: accumulated waypoints and the latest
    /// computed route.
    Route {
        /// Accumulated stops, append-only, capped at [`MAX_WAYPOINTS`].
        waypoints: Vec<Coordinate>,
        /// The latest computed and analyzed route, if any.
        outcome: Option<Box<RouteOutcome>>,
    },
}

/// Which mode to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Single-street exploration.
    Explore,
    /// Multi-stop route planning.
    Route,
}

/// A fully analyzed single-street selection.
#[derive(Debug)]
pub struct StreetSelection {
    /// Where the operator clicked or searched.
    pub coordinate: Coordinate,
    /// Verified context from the spatial-tag source, when found nearby.
    pub verified: Option<VerifiedStreetContext>,
    /// The suitability judgment (possibly degraded).
    pub analysis: StreetSuitability,
    /// Live conditions around the street (possibly degraded).
    pub conditions: LiveConditionsSnapshot,
    /// Same-named segments for highlighting; empty when lookup failed.
    pub outline: Vec<Vec<Coordinate>>,
}

/// A computed and analyzed multi-stop route.
#[derive(Debug)]
pub struct RouteOutcome {
    /// The computed route.
    pub plan: RoutePlan,
    /// The route-level suitability judgment (possibly degraded).
    pub analysis: RouteSuitability,
    /// Live conditions along the route (possibly degraded).
    pub conditions: LiveConditionsSnapshot,
}

/// Outcome of a session operation, reported to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A street selection was analyzed and committed.
    SelectionAnalyzed,
    /// A route was computed, analyzed and committed.
    RoutePlanned,
    /// A search yielded no match; prior state is intact.
    NotFound {
        /// The query that did not match.
        query: String,
    },
    /// A waypoint was appended.
    WaypointAdded {
        /// Number of waypoints after the append.
        count: usize,
    },
    /// The waypoint cap was hit; the existing set is unmodified.
    WaypointRejected {
        /// User-visible rejection message.
        message: String,
    },
    /// A transient, user-visible notice; prior state is intact.
    Notice {
        /// The message to show.
        message: String,
    },
    /// The operation was superseded by a newer one; its results were
    /// dropped.
    Superseded,
    /// The mode changed; the previous mode's state was cleared.
    ModeChanged,
    /// The ambient weather snapshot was refreshed.
    WeatherRefreshed,
}

/// Top-level controller for one operator session.
pub struct Session {
    resolver: GeometryResolver,
    engine: SuitabilityAnalysisEngine,
    conditions: LiveConditionsFetcher,
    animator: RouteAnimator,
    vehicle_class: VehicleClass,
    mode: Mode,
    weather: Option<WeatherSnapshot>,
    current_request: u64,
}

impl Session {
    /// Creates a session in explore mode.
    #[must_use]
    pub fn new(
        resolver: GeometryResolver,
        engine: SuitabilityAnalysisEngine,
        conditions: LiveConditionsFetcher,
        vehicle_class: VehicleClass,
    ) -> Self {
        Self {
            resolver,
            engine,
            conditions,
            animator: RouteAnimator::new(),
            vehicle_class,
            mode: Mode::Explore { selection: None },
            weather: None,
            current_request: 0,
        }
    }

    /// The current mode and its working set.
    #[must_use]
    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The selected vehicle class.
    #[must_use]
    pub const fn vehicle_class(&self) -> VehicleClass {
        self.vehicle_class
    }

    /// The latest ambient weather snapshot, if fetched.
    #[must_use]
    pub const fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }

    /// Changes the vehicle class for subsequent analyses. Existing results
    /// are left in place; the operator re-analyzes explicitly.
    pub fn set_vehicle_class(&mut self, vehicle_class: VehicleClass) {
        self.vehicle_class = vehicle_class;
    }

    /// Switches modes, clearing the other mode's working set and stopping
    /// the animator. Switching to the current mode is a no-op.
    pub fn set_mode(&mut self, kind: ModeKind) -> SessionEvent {
        let already = matches!(
            (&self.mode, kind),
            (Mode::Explore { .. }, ModeKind::Explore) | (Mode::Route { .. }, ModeKind::Route)
        );
        if already {
            return SessionEvent::Notice {
                message: "Already in that mode".to_string(),
            };
        }

        // Any in-flight operation for the old mode is now stale.
        self.current_request += 1;
        self.animator.clear();
        self.mode = match kind {
            ModeKind::Explore => Mode::Explore { selection: None },
            ModeKind::Route => Mode::Route {
                waypoints: Vec::new(),
                outcome: None,
            },
        };
        SessionEvent::ModeChanged
    }

    /// Resolves free text to a coordinate and analyzes it (explore mode).
    pub async fn search(&mut self, text: &str) -> SessionEvent {
        if !matches!(self.mode, Mode::Explore { .. }) {
            return wrong_mode("Search is an explore-mode action");
        }

        match self.resolver.geocode(text).await {
            Ok(Some(coord)) => self.select_coordinate(coord).await,
            Ok(None) => SessionEvent::NotFound {
                query: text.to_string(),
            },
            Err(e) => {
                log::warn!("Geocoding {text:?} failed: {e}");
                transient(&e)
            }
        }
    }

    /// Analyzes the street at `coord` (explore mode): verified context,
    /// then suitability analysis and live conditions concurrently, then a
    /// best-effort outline for highlighting.
    pub async fn select_coordinate(&mut self, coord: Coordinate) -> SessionEvent {
        if !matches!(self.mode, Mode::Explore { .. }) {
            return wrong_mode("Selecting a street is an explore-mode action");
        }

        let token = self.begin_request();

        // A missing nearest street is reduced context, not a failure: the
        // analysis proceeds coordinate-only.
        let verified = match self.resolver.nearest_street(coord).await {
            Ok(ctx) => ctx,
            Err(e) => {
                log::warn!("Nearest-street lookup failed, proceeding without verified context: {e}");
                None
            }
        };

        let context_label = verified
            .as_ref()
            .map_or_else(|| "the selected location".to_string(), |ctx| ctx.name.clone());

        let (analysis, conditions) = tokio::join!(
            self.engine
                .analyze_street(coord, self.vehicle_class, verified.as_ref()),
            self.conditions.fetch_live_conditions(&context_label),
        );

        let outline = match &verified {
            Some(ctx) => self.resolver.street_outline(&ctx.name, coord).await,
            None => Vec::new(),
        };

        if !self.commit(token) {
            return SessionEvent::Superseded;
        }
        self.mode = Mode::Explore {
            selection: Some(Box::new(StreetSelection {
                coordinate: coord,
                verified,
                analysis,
                conditions,
                outline,
            })),
        };
        SessionEvent::SelectionAnalyzed
    }

    /// Appends a waypoint (route mode). Append-only and capped: the 11th
    /// waypoint is rejected without touching the existing set.
    pub fn add_waypoint(&mut self, coord: Coordinate) -> SessionEvent {
        let Mode::Route { waypoints, .. } = &mut self.mode else {
            return wrong_mode("Waypoints only exist in route mode");
        };

        if waypoints.len() >= MAX_WAYPOINTS {
            return SessionEvent::WaypointRejected {
                message: format!("A route can have at most {MAX_WAYPOINTS} stops"),
            };
        }
        waypoints.push(coord);
        SessionEvent::WaypointAdded {
            count: waypoints.len(),
        }
    }

    /// Computes a route across the accumulated waypoints, then analyzes
    /// it and fetches live conditions concurrently (route mode).
    pub async fn compute_route(&mut self) -> SessionEvent {
        let Mode::Route { waypoints, .. } = &self.mode else {
            return wrong_mode("Route computation is a route-mode action");
        };
        let waypoints = waypoints.clone();

        let token = self.begin_request();

        let plan = match self.resolver.compute_route(&waypoints).await {
            Ok(plan) => plan,
            Err(e) => {
                log::warn!("Route computation failed: {e}");
                return transient(&e);
            }
        };

        let context_label = plan.street_names.join(", ");
        let (analysis, conditions) = tokio::join!(
            self.engine
                .analyze_route(self.vehicle_class, &plan.street_names),
            self.conditions.fetch_live_conditions(&context_label),
        );

        if !self.commit(token) {
            return SessionEvent::Superseded;
        }
        self.animator.set_route(plan.polyline.clone());
        self.mode = Mode::Route {
            waypoints,
            outcome: Some(Box::new(RouteOutcome {
                plan,
                analysis,
                conditions,
            })),
        };
        SessionEvent::RoutePlanned
    }

    /// Refreshes the ambient weather snapshot (background enrichment).
    pub async fn refresh_weather(&mut self) -> SessionEvent {
        self.weather = Some(self.conditions.fetch_ambient_weather().await);
        SessionEvent::WeatherRefreshed
    }

    /// Advances the route replay to `now`. `None` while no route polyline
    /// is loaded.
    pub fn animator_tick(&mut self, now: Duration) -> Option<AnimationState> {
        self.animator.tick(now)
    }

    /// Takes a fresh request generation token, invalidating all earlier
    /// ones.
    fn begin_request(&mut self) -> u64 {
        self.current_request += 1;
        self.current_request
    }

    /// Whether results for `token` may still be committed.
    fn commit(&self, token: u64) -> bool {
        let current = self.current_request == token;
        if !current {
            log::info!("Dropping results of superseded request {token} (current {})", self.current_request);
        }
        current
    }
}

fn wrong_mode(message: &str) -> SessionEvent {
    SessionEvent::Notice {
        message: message.to_string(),
    }
}

/// Maps a resolver failure to a single user-visible transient notice.
fn transient(e: &GeometryError) -> SessionEvent {
    let message = match e {
        GeometryError::InvalidInput { message } => message.clone(),
        GeometryError::NoRouteFound => {
            "No viable route between these stops".to_string()
        }
        GeometryError::RateLimited => {
            "The mapping service is busy; try again shortly".to_string()
        }
        GeometryError::Http(_) | GeometryError::Parse { .. } => {
            "The mapping service is temporarily unavailable".to_string()
        }
    };
    SessionEvent::Notice { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_advisor_analysis::SuitabilityAnalysisEngine;
    use haul_advisor_generative::ProviderError;
    use haul_advisor_generative::providers::{GenerativeProvider, GroundedAnswer};
    use haul_advisor_geometry::CityScope;
    use haul_advisor_models::AnalysisProvenance;
    use std::sync::Arc;

    /// Provider that always rate-limits; session tests never need real
    /// generation, only the degraded paths.
    struct StubProvider;

    #[async_trait::async_trait]
    impl GenerativeProvider for StubProvider {
        async fn generate_structured(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
        ) -> Result<serde_json::Value, ProviderError> {
            Err(ProviderError::RateLimited)
        }

        async fn generate_grounded(&self, _prompt: &str) -> Result<GroundedAnswer, ProviderError> {
            Err(ProviderError::RateLimited)
        }
    }

    /// Session whose resolver points at unroutable endpoints, so every
    /// geometry call fails with connection refused instead of touching
    /// the network.
    fn session() -> Session {
        let provider: Arc<dyn GenerativeProvider> = Arc::new(StubProvider);
        Session::new(
            GeometryResolver::with_endpoints(
                CityScope::cologne(),
                "http://127.0.0.1:1",
                "http://127.0.0.1:1",
                "http://127.0.0.1:1",
            ),
            SuitabilityAnalysisEngine::new(Arc::clone(&provider), "Köln"),
            LiveConditionsFetcher::new(provider, "Köln"),
            VehicleClass::SemiTrailer40t,
        )
    }

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn eleventh_waypoint_is_rejected_without_mutation() {
        let mut session = session();
        session.set_mode(ModeKind::Route);

        for i in 0_u8..10 {
            let event = session.add_waypoint(coord(50.9, 6.9 + f64::from(i) * 0.001));
            assert_eq!(event, SessionEvent::WaypointAdded { count: usize::from(i) + 1 });
        }

        let before = match session.mode() {
            Mode::Route { waypoints, .. } => waypoints.clone(),
            Mode::Explore { .. } => unreachable!(),
        };

        let event = session.add_waypoint(coord(51.0, 7.0));
        assert!(matches!(event, SessionEvent::WaypointRejected { .. }));

        let Mode::Route { waypoints, .. } = session.mode() else {
            unreachable!()
        };
        assert_eq!(*waypoints, before);
    }

    #[test]
    fn switching_modes_clears_the_other_working_set() {
        let mut session = session();
        session.set_mode(ModeKind::Route);
        session.add_waypoint(coord(50.9, 6.9));
        session.add_waypoint(coord(50.95, 6.95));

        assert_eq!(session.set_mode(ModeKind::Explore), SessionEvent::ModeChanged);
        assert!(matches!(
            session.mode(),
            Mode::Explore { selection: None }
        ));

        // Back to route mode: the previous waypoints are gone.
        session.set_mode(ModeKind::Route);
        let Mode::Route { waypoints, outcome } = session.mode() else {
            unreachable!()
        };
        assert!(waypoints.is_empty());
        assert!(outcome.is_none());
    }

    #[test]
    fn switching_to_the_current_mode_is_a_noop() {
        let mut session = session();
        session.set_mode(ModeKind::Route);
        session.add_waypoint(coord(50.9, 6.9));

        assert!(matches!(
            session.set_mode(ModeKind::Route),
            SessionEvent::Notice { .. }
        ));
        let Mode::Route { waypoints, .. } = session.mode() else {
            unreachable!()
        };
        assert_eq!(waypoints.len(), 1);
    }

    #[test]
    fn stale_request_tokens_are_rejected_at_commit() {
        let mut session = session();
        let first = session.begin_request();
        let second = session.begin_request();
        assert!(!session.commit(first));
        assert!(session.commit(second));

        // A mode switch invalidates every outstanding token.
        session.set_mode(ModeKind::Route);
        assert!(!session.commit(second));
    }

    #[tokio::test]
    async fn route_actions_in_explore_mode_leave_state_intact() {
        let mut session = session();
        assert!(matches!(
            session.add_waypoint(coord(50.9, 6.9)),
            SessionEvent::Notice { .. }
        ));
        assert!(matches!(
            session.compute_route().await,
            SessionEvent::Notice { .. }
        ));
        assert!(matches!(session.mode(), Mode::Explore { selection: None }));
    }

    #[tokio::test(start_paused = true)]
    async fn selection_proceeds_without_verified_context_when_lookup_fails() {
        let mut session = session();
        let event = session.select_coordinate(coord(50.9364, 6.9528)).await;
        assert_eq!(event, SessionEvent::SelectionAnalyzed);

        let Mode::Explore {
            selection: Some(selection),
        } = session.mode()
        else {
            panic!("expected a committed selection");
        };
        // Nearest-street lookup failed: analysis ran coordinate-only.
        assert!(selection.verified.is_none());
        assert!(selection.outline.is_empty());
        assert_eq!(selection.analysis.provenance, AnalysisProvenance::Degraded);
    }

    #[tokio::test]
    async fn failed_search_leaves_prior_state_intact() {
        let mut session = session();
        let event = session.search("Hohe Straße").await;
        assert!(matches!(event, SessionEvent::Notice { .. }));
        assert!(matches!(session.mode(), Mode::Explore { selection: None }));
    }

    #[tokio::test]
    async fn compute_route_with_one_waypoint_is_a_notice_not_a_crash() {
        let mut session = session();
        session.set_mode(ModeKind::Route);
        session.add_waypoint(coord(50.9, 6.9));

        // Waypoint validation fires before any network call.
        let event = session.compute_route().await;
        assert!(matches!(event, SessionEvent::Notice { .. }));
        let Mode::Route { waypoints, outcome } = session.mode() else {
            unreachable!()
        };
        assert_eq!(waypoints.len(), 1);
        assert!(outcome.is_none());
    }
}
