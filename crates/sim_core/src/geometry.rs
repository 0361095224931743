//! Route/leg/step/pose containers and time-based truncation.
//!
//! A [`Route`] is a plan from one point to another, expressed hierarchically
//! as legs, steps, and poses so that it can be truncated at an arbitrary
//! point in time (see [`truncate_route_by_time`]). Distances are carried in
//! metres, durations in milliseconds.

use serde::{Deserialize, Serialize};

/// A geographic position. `lon` in `[-180, 180)`, `lat` in `[-90, 90]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pos {
    pub lon: f64,
    pub lat: f64,
}

impl Pos {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when the position lies within the area bounds (spec §3, §6.3).
    pub fn in_area(&self, lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> bool {
        self.lon >= lon_min && self.lon < lon_max && self.lat >= lat_min && self.lat <= lat_max
    }

    fn manhattan_to(&self, other: &Pos) -> f64 {
        (self.lat - other.lat).abs() + (self.lon - other.lon).abs()
    }

    fn lerp(&self, other: &Pos, ratio: f64) -> Pos {
        Pos {
            lon: self.lon + ratio * (other.lon - self.lon),
            lat: self.lat + ratio * (other.lat - self.lat),
        }
    }
}

/// A contiguous polyline of at least 2 poses with a total distance (m) and
/// duration (ms). Both are strictly positive for a non-empty step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub poses: Vec<Pos>,
    pub distance_m: f64,
    pub duration_ms: u64,
}

impl Step {
    pub fn new(poses: Vec<Pos>, distance_m: f64, duration_ms: u64) -> Self {
        debug_assert!(poses.len() >= 2, "step must have at least 2 poses");
        Self {
            poses,
            distance_m,
            duration_ms,
        }
    }
}

/// Ordered sequence of steps. Distance/duration are the sum over steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub steps: Vec<Step>,
    pub distance_m: f64,
    pub duration_ms: u64,
}

impl Leg {
    pub fn new(steps: Vec<Step>) -> Self {
        let distance_m = steps.iter().map(|s| s.distance_m).sum();
        let duration_ms = steps.iter().map(|s| s.duration_ms).sum();
        Self {
            steps,
            distance_m,
            duration_ms,
        }
    }
}

/// Ordered sequence of legs. A "time-only" route has empty legs but
/// populated totals (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<Leg>,
    pub distance_m: f64,
    pub duration_ms: u64,
}

impl Route {
    pub fn new(legs: Vec<Leg>) -> Self {
        let distance_m = legs.iter().map(|l| l.distance_m).sum();
        let duration_ms = legs.iter().map(|l| l.duration_ms).sum();
        Self {
            legs,
            distance_m,
            duration_ms,
        }
    }

    /// A time-only route: no geometry, just totals.
    pub fn time_only(distance_m: f64, duration_ms: u64) -> Self {
        Self {
            legs: Vec::new(),
            distance_m,
            duration_ms,
        }
    }

    /// The first pose of the first step of the first leg, if any geometry is present.
    pub fn first_pose(&self) -> Option<Pos> {
        self.legs.first()?.steps.first()?.poses.first().copied()
    }
}

/// Truncate `step` so only the last `(1 - ratio)` fraction of it survives,
/// where `ratio = time_ms / step.duration_ms`. Uses Manhattan distance
/// between consecutive poses as a surrogate for arc length (spec §4.1,
/// §9 "Manhattan-proportional interpolation" note — a known approximation,
/// inconsistent with the router's geodesic distances but kept for parity
/// with the source this behavior was distilled from).
fn truncate_step_by_time(step: &mut Step, time_ms: u64) {
    debug_assert!(step.poses.len() >= 2);
    debug_assert!(step.distance_m > 0.0);
    debug_assert!(step.duration_ms > 0);

    let ratio = time_ms as f64 / step.duration_ms as f64;
    debug_assert!((0.0..1.0).contains(&ratio));

    if ratio == 0.0 {
        return;
    }

    let total_dist: f64 = step
        .poses
        .windows(2)
        .map(|w| w[0].manhattan_to(&w[1]))
        .sum();
    let truncated_dist = total_dist * ratio;

    let mut accumulated = 0.0;
    for i in 0..step.poses.len() - 1 {
        let dist = step.poses[i].manhattan_to(&step.poses[i + 1]);

        if accumulated + dist > truncated_dist {
            let subratio = (truncated_dist - accumulated) / dist;
            let new_pose = step.poses[i].lerp(&step.poses[i + 1], subratio);
            step.poses.splice(0..=i, [new_pose]);
            break;
        }

        accumulated += dist;
    }

    step.distance_m *= 1.0 - ratio;
    step.duration_ms = (step.duration_ms as f64 * (1.0 - ratio)).round() as u64;

    debug_assert!(step.poses.len() >= 2);
}

fn truncate_leg_by_time(leg: &mut Leg, mut time_ms: u64) {
    debug_assert!(!leg.steps.is_empty());
    debug_assert!(time_ms < leg.duration_ms);

    if time_ms == 0 {
        return;
    }

    for i in 0..leg.steps.len() {
        let step_duration = leg.steps[i].duration_ms;
        if step_duration <= time_ms {
            time_ms -= step_duration;
            continue;
        }

        truncate_step_by_time(&mut leg.steps[i], time_ms);
        leg.steps.drain(0..i);
        break;
    }

    leg.distance_m = leg.steps.iter().map(|s| s.distance_m).sum();
    leg.duration_ms = leg.steps.iter().map(|s| s.duration_ms).sum();

    debug_assert!(!leg.steps.is_empty());
}

/// Remove the first `time_ms` milliseconds of travel from `route`, mutating
/// it so only the remainder survives (spec §4.1). Preconditions:
/// `0 <= time_ms < route.duration_ms`. `time_ms == 0` is a no-op.
pub fn truncate_route_by_time(route: &mut Route, mut time_ms: u64) {
    debug_assert!(!route.legs.is_empty(), "cannot truncate a time-only route");
    debug_assert!(time_ms < route.duration_ms);

    if time_ms == 0 {
        return;
    }

    for i in 0..route.legs.len() {
        let leg_duration = route.legs[i].duration_ms;
        if leg_duration <= time_ms {
            time_ms -= leg_duration;
            continue;
        }

        truncate_leg_by_time(&mut route.legs[i], time_ms);
        route.legs.drain(0..i);
        break;
    }

    route.distance_m = route.legs.iter().map(|l| l.distance_m).sum();
    route.duration_ms = route.legs.iter().map(|l| l.duration_ms).sum();

    debug_assert!(!route.legs.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_with_one_step(poses: Vec<Pos>, distance_m: f64, duration_ms: u64) -> Route {
        Route::new(vec![Leg::new(vec![Step::new(poses, distance_m, duration_ms)])])
    }

    #[test]
    fn truncate_zero_is_no_op() {
        let mut route = route_with_one_step(
            vec![Pos::new(0.0, 0.0), Pos::new(0.0, 5.0), Pos::new(5.0, 5.0)],
            10.0,
            2000,
        );
        let before = route.clone();
        truncate_route_by_time(&mut route, 0);
        assert_eq!(route, before);
    }

    #[test]
    fn truncate_mid_step_scenario_5() {
        // Scenario 5 from spec §8: poses [(0,0),(0,5),(5,5)], Manhattan length 10,
        // duration 2s. Truncate by 0.5s (ratio 0.25).
        let mut route = route_with_one_step(
            vec![Pos::new(0.0, 0.0), Pos::new(0.0, 5.0), Pos::new(5.0, 5.0)],
            10.0,
            2000,
        );

        truncate_route_by_time(&mut route, 500);

        let step = &route.legs[0].steps[0];
        assert_eq!(step.poses.len(), 3);
        assert!((step.poses[0].lon - 0.0).abs() < 1e-9);
        assert!((step.poses[0].lat - 2.5).abs() < 1e-9);
        assert_eq!(step.poses[1], Pos::new(0.0, 5.0));
        assert_eq!(step.poses[2], Pos::new(5.0, 5.0));
        assert!((step.distance_m - 7.5).abs() < 1e-9);
        assert_eq!(step.duration_ms, 1500);
        assert!((route.distance_m - 7.5).abs() < 1e-9);
        assert_eq!(route.duration_ms, 1500);
    }

    #[test]
    fn truncate_drops_whole_leading_legs() {
        let leg_a = Leg::new(vec![Step::new(
            vec![Pos::new(0.0, 0.0), Pos::new(1.0, 0.0)],
            100.0,
            1000,
        )]);
        let leg_b = Leg::new(vec![Step::new(
            vec![Pos::new(1.0, 0.0), Pos::new(2.0, 0.0)],
            100.0,
            1000,
        )]);
        let mut route = Route::new(vec![leg_a, leg_b]);

        truncate_route_by_time(&mut route, 1000);

        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.duration_ms, 1000);
        assert_eq!(route.legs[0].steps[0].poses[0], Pos::new(1.0, 0.0));
    }

    #[test]
    fn truncate_additivity() {
        let mut once = route_with_one_step(
            vec![
                Pos::new(0.0, 0.0),
                Pos::new(0.0, 4.0),
                Pos::new(0.0, 8.0),
                Pos::new(4.0, 8.0),
            ],
            16.0,
            4000,
        );
        let mut twice = once.clone();

        truncate_route_by_time(&mut once, 2500);

        truncate_route_by_time(&mut twice, 1000);
        truncate_route_by_time(&mut twice, 1500);

        assert!((once.distance_m - twice.distance_m).abs() < 1e-6);
        assert_eq!(once.duration_ms, twice.duration_ms);
    }
}
