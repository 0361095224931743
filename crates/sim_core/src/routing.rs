//! Pluggable routing backend (spec §6.1). The core only depends on the
//! [`RouteProvider`] trait; concrete implementations (HTTP OSRM client,
//! straight-line fallback) live in [`crate::osrm_router`] and the `sim_cli`
//! crate respectively.

use crate::geometry::{Pos, Route};

/// Whether a route query needs full geometry or just totals (spec §4.3,
/// §6.1). The dispatcher requests `TimeOnly` while searching and
/// `FullRoute` once per committed insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    TimeOnly,
    FullRoute,
}

/// Outcome of a routing request. `Empty` and `Error` are both treated by the
/// core as "this candidate insertion is infeasible" (spec §6.1, §7).
#[derive(Debug, Clone)]
pub enum RouteResponse {
    Ok(Route),
    Empty,
    Error(String),
}

impl RouteResponse {
    pub fn ok(self) -> Option<Route> {
        match self {
            RouteResponse::Ok(route) => Some(route),
            RouteResponse::Empty | RouteResponse::Error(_) => None,
        }
    }
}

/// Abstract routing backend: origin/destination → route. Implementations
/// must guarantee that a `FullRoute` response has >=2 poses per step and a
/// `TimeOnly` response has populated `distance_m`/`duration_ms` (spec §6.1).
pub trait RouteProvider {
    fn route(&self, origin: Pos, destination: Pos, mode: RouteMode) -> RouteResponse;
}

/// Zero-dependency `RouteProvider`: straight-line (haversine) distance at a
/// fixed average speed, with `FullRoute` geometry being just the origin and
/// destination poses. Analogous to the teacher's zero-dependency
/// `H3GridRouteProvider` — a fallback for environments without a reachable
/// OSRM endpoint, and a convenient test double.
#[derive(Debug, Clone, Copy)]
pub struct StaticSpeedRouter {
    pub avg_speed_mps: f64,
}

impl StaticSpeedRouter {
    pub fn new(avg_speed_mps: f64) -> Self {
        assert!(avg_speed_mps > 0.0, "average speed must be positive");
        Self { avg_speed_mps }
    }

    fn haversine_distance_m(origin: Pos, destination: Pos) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let lat1 = origin.lat.to_radians();
        let lat2 = destination.lat.to_radians();
        let dlat = (destination.lat - origin.lat).to_radians();
        let dlon = (destination.lon - origin.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_M * c
    }
}

impl RouteProvider for StaticSpeedRouter {
    fn route(&self, origin: Pos, destination: Pos, mode: RouteMode) -> RouteResponse {
        let distance_m = Self::haversine_distance_m(origin, destination).max(1.0);
        let duration_ms = ((distance_m / self.avg_speed_mps) * 1000.0).round().max(1.0) as u64;

        let route = match mode {
            RouteMode::TimeOnly => crate::geometry::Route::time_only(distance_m, duration_ms),
            RouteMode::FullRoute => crate::geometry::Route::new(vec![crate::geometry::Leg::new(
                vec![crate::geometry::Step::new(
                    vec![origin, destination],
                    distance_m,
                    duration_ms,
                )],
            )]),
        };

        RouteResponse::Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_speed_router_time_only_has_no_geometry() {
        let router = StaticSpeedRouter::new(10.0);
        let response = router.route(Pos::new(0.0, 0.0), Pos::new(0.0, 1.0), RouteMode::TimeOnly);
        let route = response.ok().unwrap();
        assert!(route.legs.is_empty());
        assert!(route.duration_ms > 0);
    }

    #[test]
    fn static_speed_router_full_route_has_geometry() {
        let router = StaticSpeedRouter::new(10.0);
        let response = router.route(Pos::new(0.0, 0.0), Pos::new(0.0, 1.0), RouteMode::FullRoute);
        let route = response.ok().unwrap();
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.legs[0].steps[0].poses.len(), 2);
    }

    #[test]
    fn same_point_still_yields_positive_distance_and_duration() {
        let router = StaticSpeedRouter::new(10.0);
        let response = router.route(Pos::new(1.0, 1.0), Pos::new(1.0, 1.0), RouteMode::FullRoute);
        let route = response.ok().unwrap();
        assert!(route.distance_m > 0.0);
        assert!(route.duration_ms > 0);
    }
}
