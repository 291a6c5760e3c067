#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic replay of a route polyline as a moving position + heading.
//!
//! The animator is a small state machine (`Idle` ⇄ `Playing`) driven by an
//! externally supplied monotonic timestamp, so it is pausable and testable
//! without a real clock. Cumulative great-circle distances are precomputed
//! at each vertex; a tick maps elapsed time modulo the cycle duration to a
//! fractional distance along the path, locates the bounding segment and
//! interpolates linearly within it. Heading is the initial bearing of the
//! bounding segment. The replay loops indefinitely while `Playing`;
//! replacing the polyline resets progress to the start.

use std::time::Duration;

use geo::{Bearing, Distance, Haversine, Point};
use haul_advisor_models::{AnimationState, Coordinate};

/// One full traversal of the polyline takes this long.
pub const CYCLE: Duration = Duration::from_secs(10);

/// Precomputed playback data for one polyline.
struct Playback {
    polyline: Vec<Coordinate>,
    /// Cumulative great-circle distance in meters at each vertex.
    cumulative: Vec<f64>,
    total_m: f64,
    /// Timestamp of the first tick after the route was set.
    origin: Option<Duration>,
}

/// Replays a route polyline over time.
///
/// `Idle` when no polyline (or a degenerate one) is loaded; `Playing`
/// otherwise. The animator owns no clock: callers pass a monotonic `now`
/// into [`RouteAnimator::tick`].
pub struct RouteAnimator {
    playback: Option<Playback>,
}

impl Default for RouteAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteAnimator {
    /// Creates an idle animator.
    #[must_use]
    pub const fn new() -> Self {
        Self { playback: None }
    }

    /// Whether a route is loaded and replaying.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// Loads a polyline and restarts the replay from the beginning.
    ///
    /// Polylines with fewer than 2 points cannot be animated and leave the
    /// animator `Idle`.
    pub fn set_route(&mut self, polyline: Vec<Coordinate>) {
        if polyline.len() < 2 {
            log::debug!(
                "Polyline with {} point(s) cannot be animated; animator idle",
                polyline.len()
            );
            self.playback = None;
            return;
        }

        let mut cumulative = Vec::with_capacity(polyline.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in polyline.windows(2) {
            total += Haversine.distance(to_point(pair[0]), to_point(pair[1]));
            cumulative.push(total);
        }

        self.playback = Some(Playback {
            polyline,
            cumulative,
            total_m: total,
            origin: None,
        });
    }

    /// Stops the replay and unloads the polyline.
    pub fn clear(&mut self) {
        self.playback = None;
    }

    /// Advances the replay to `now` (any monotonic timestamp; the first
    /// tick after a route is set defines the cycle origin).
    ///
    /// Returns `None` while `Idle`.
    pub fn tick(&mut self, now: Duration) -> Option<AnimationState> {
        let playback = self.playback.as_mut()?;
        let origin = *playback.origin.get_or_insert(now);
        let elapsed = now.checked_sub(origin).unwrap_or(Duration::ZERO);

        let progress = elapsed.as_secs_f64() % CYCLE.as_secs_f64() / CYCLE.as_secs_f64();
        Some(playback.state_at_distance(progress * playback.total_m, progress))
    }
}

impl Playback {
    /// Computes position and heading at a target distance along the path.
    fn state_at_distance(&self, target_m: f64, progress: f64) -> AnimationState {
        // Degenerate path (all vertices identical): pin to the start.
        if self.total_m <= 0.0 {
            return AnimationState {
                position: self.polyline[0],
                heading_degrees: 0.0,
                progress,
            };
        }

        // Find the bounding segment: the first whose far end lies strictly
        // beyond the target. Zero-length segments are never selected, so
        // at a vertex boundary the heading is the *next* segment's bearing
        // while the interpolated position stays on the shared vertex.
        let mut seg = self.polyline.len() - 2;
        for i in 0..self.polyline.len() - 1 {
            if target_m < self.cumulative[i + 1] {
                seg = i;
                break;
            }
        }

        let start = self.polyline[seg];
        let end = self.polyline[seg + 1];
        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        let fraction = if seg_len > 0.0 {
            ((target_m - self.cumulative[seg]) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let position = Coordinate {
            latitude: start.latitude + (end.latitude - start.latitude) * fraction,
            longitude: start.longitude + (end.longitude - start.longitude) * fraction,
        };
        let heading = Haversine
            .bearing(to_point(start), to_point(end))
            .rem_euclid(360.0);

        AnimationState {
            position,
            heading_degrees: heading,
            progress,
        }
    }
}

fn to_point(coord: Coordinate) -> Point<f64> {
    Point::new(coord.longitude, coord.latitude)
}
