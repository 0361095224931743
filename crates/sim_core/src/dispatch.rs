//! Insertion-heuristic dispatcher (spec §4.3): for each pending trip,
//! enumerate insertion slots in every vehicle, validate pickup-deadline and
//! capacity feasibility, and commit the minimum marginal-cost insertion
//! across the fleet.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::agents::{Vehicle, Waypoint, WaypointOp};
use crate::geometry::Pos;
use crate::routing::{RouteMode, RouteProvider, RouteResponse};
use crate::trip::{Trip, TripStatus};

/// Wraps a [`RouteProvider`] and memoizes (origin, destination, mode) → route
/// for the lifetime of one dispatch call (spec §9: waypoint-plan
/// construction calls the router twice per candidate pair; memoizing the
/// pairwise O/D query per cycle is an optimization, not a contract change).
struct MemoizingRouter<'a> {
    inner: &'a dyn RouteProvider,
    cache: RefCell<HashMap<(u64, u64, u64, u64, bool), RouteResponse>>,
}

impl<'a> MemoizingRouter<'a> {
    fn new(inner: &'a dyn RouteProvider) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn route(&self, origin: Pos, destination: Pos, mode: RouteMode) -> RouteResponse {
        let key = (
            origin.lon.to_bits(),
            origin.lat.to_bits(),
            destination.lon.to_bits(),
            destination.lat.to_bits(),
            mode == RouteMode::FullRoute,
        );

        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }

        let response = self.inner.route(origin, destination, mode);
        self.cache.borrow_mut().insert(key, response.clone());
        response
    }
}

/// Sum, over all Dropoff waypoints, of the cumulative elapsed time from "now"
/// to that dropoff (spec §4.3 cost function).
fn plan_cost_ms(waypoints: &[Waypoint]) -> u64 {
    let mut cumulative_ms = 0u64;
    let mut total_ms = 0u64;
    for wp in waypoints {
        cumulative_ms += wp.route.duration_ms;
        if wp.op == WaypointOp::Dropoff {
            total_ms += cumulative_ms;
        }
    }
    total_ms
}

/// Walk a candidate plan in order, accumulating elapsed time and load from
/// the vehicle's current state. Rejects a deadline miss, capacity overflow,
/// or negative load (spec §4.3 "Feasibility validation").
fn validate_waypoints(
    waypoints: &[Waypoint],
    trips: &[Trip],
    current_load: u32,
    capacity: u32,
    now_ms: u64,
) -> bool {
    let mut load: i64 = current_load as i64;
    let mut cumulative_ms = now_ms;

    for wp in waypoints {
        cumulative_ms += wp.route.duration_ms;

        match wp.op {
            WaypointOp::Pickup => {
                if cumulative_ms > trips[wp.trip_id].max_pickup_time_ms {
                    return false;
                }
                load += 1;
                if load > capacity as i64 {
                    return false;
                }
            }
            WaypointOp::Dropoff => {
                load -= 1;
                if load < 0 {
                    return false;
                }
            }
        }
    }

    true
}

/// The pickup time if `trip.origin` were inserted at `pickup_index`: time to
/// reach that slot along the vehicle's current plan, plus routing time from
/// there to the pickup (spec §4.3 "Per-vehicle search").
fn pickup_time_for_index(
    vehicle: &Vehicle,
    trip_origin: Pos,
    pickup_index: usize,
    router: &MemoizingRouter,
    now_ms: u64,
) -> Option<u64> {
    let mut cumulative_ms = now_ms;
    let mut cursor = vehicle.pos;

    for wp in &vehicle.waypoints[..pickup_index] {
        cumulative_ms += wp.route.duration_ms;
        cursor = wp.pos;
    }

    match router.route(cursor, trip_origin, RouteMode::TimeOnly) {
        RouteResponse::Ok(route) => Some(cumulative_ms + route.duration_ms),
        RouteResponse::Empty | RouteResponse::Error(_) => None,
    }
}

/// Build the waypoint list that results from inserting `trip`'s pickup at
/// `pickup_index` and dropoff at `dropoff_index` into `vehicle`'s current
/// plan (spec §4.3 "Waypoint-list construction"). All originally-following
/// waypoints keep their op and trip id but have their embedded route
/// re-queried from `cursor`. Returns `None` if any routing call fails.
fn build_waypoints(
    vehicle: &Vehicle,
    trip_id: usize,
    trip_origin: Pos,
    trip_destination: Pos,
    pickup_index: usize,
    dropoff_index: usize,
    router: &MemoizingRouter,
    mode: RouteMode,
) -> Option<Vec<Waypoint>> {
    let n = vehicle.waypoints.len();
    let mut result = Vec::with_capacity(n + 2);
    let mut cursor = vehicle.pos;

    for i in 0..=n {
        if i == pickup_index {
            let route = router.route(cursor, trip_origin, mode).ok()?;
            cursor = trip_origin;
            result.push(Waypoint {
                pos: trip_origin,
                op: WaypointOp::Pickup,
                trip_id,
                route,
            });
        }
        if i == dropoff_index {
            let route = router.route(cursor, trip_destination, mode).ok()?;
            cursor = trip_destination;
            result.push(Waypoint {
                pos: trip_destination,
                op: WaypointOp::Dropoff,
                trip_id,
                route,
            });
        }
        if i < n {
            let original = &vehicle.waypoints[i];
            let route = router.route(cursor, original.pos, mode).ok()?;
            cursor = original.pos;
            result.push(Waypoint {
                pos: original.pos,
                op: original.op,
                trip_id: original.trip_id,
                route,
            });
        }
    }

    Some(result)
}

/// One fleet-wide candidate: the cheapest feasible insertion found for a
/// trip so far.
struct BestInsertion {
    vehicle_index: usize,
    pickup_index: usize,
    dropoff_index: usize,
    marginal_cost_ms: u64,
}

/// Search every (pickup_index, dropoff_index) pair for `vehicle`, returning
/// the minimum-cost feasible insertion, if any (spec §4.3 "Per-vehicle
/// search"). Uses time-only routes: no geometry is needed for
/// feasibility/cost.
fn best_insertion_for_vehicle(
    vehicle: &Vehicle,
    trip: &Trip,
    trips: &[Trip],
    now_ms: u64,
    router: &MemoizingRouter,
) -> Option<(usize, usize, u64)> {
    let n = vehicle.waypoints.len();
    let current_cost_ms = plan_cost_ms(&vehicle.waypoints);
    let mut best: Option<(usize, usize, u64)> = None;

    for pickup_index in 0..=n {
        let pickup_time_ms =
            match pickup_time_for_index(vehicle, trip.origin, pickup_index, router, now_ms) {
                Some(t) => t,
                None => continue,
            };

        // Monotonicity pruning (spec §4.3, §8): pickup_time_for_index is
        // non-decreasing in pickup_index, so once the deadline is missed no
        // larger index can recover.
        if pickup_time_ms > trip.max_pickup_time_ms {
            break;
        }

        for dropoff_index in pickup_index..=n {
            let Some(candidate) = build_waypoints(
                vehicle,
                trip.id,
                trip.origin,
                trip.destination,
                pickup_index,
                dropoff_index,
                router,
                RouteMode::TimeOnly,
            ) else {
                continue;
            };

            if !validate_waypoints(&candidate, trips, vehicle.load, vehicle.capacity, now_ms) {
                continue;
            }

            let marginal_ms = plan_cost_ms(&candidate).saturating_sub(current_cost_ms);

            if best.map(|(_, _, best_ms)| marginal_ms < best_ms).unwrap_or(true) {
                best = Some((pickup_index, dropoff_index, marginal_ms));
            }
        }
    }

    best
}

/// Assign one pending trip to the fleet, mutating `trips[trip_id]` and (on
/// success) the chosen vehicle's waypoints (spec §4.3 "Commit"). Ties in
/// marginal cost resolve by first-seen (ascending) vehicle id, since
/// vehicles are scanned in order and a later candidate only replaces the
/// best on a strictly lower cost.
fn assign_trip(
    trip_id: usize,
    trips: &mut [Trip],
    vehicles: &mut [Vehicle],
    now_ms: u64,
    router: &MemoizingRouter,
) {
    let trip = trips[trip_id].clone();

    let mut best: Option<BestInsertion> = None;
    for (vehicle_index, vehicle) in vehicles.iter().enumerate() {
        if let Some((pickup_index, dropoff_index, marginal_cost_ms)) =
            best_insertion_for_vehicle(vehicle, &trip, trips, now_ms, router)
        {
            let replace = best
                .as_ref()
                .map(|b| marginal_cost_ms < b.marginal_cost_ms)
                .unwrap_or(true);
            if replace {
                best = Some(BestInsertion {
                    vehicle_index,
                    pickup_index,
                    dropoff_index,
                    marginal_cost_ms,
                });
            }
        }
    }

    let Some(best) = best else {
        trips[trip_id].status = TripStatus::Walkaway;
        return;
    };

    let committed = build_waypoints(
        &vehicles[best.vehicle_index],
        trip.id,
        trip.origin,
        trip.destination,
        best.pickup_index,
        best.dropoff_index,
        router,
        RouteMode::FullRoute,
    );

    match committed {
        Some(plan) => {
            vehicles[best.vehicle_index].waypoints = plan;
            trips[trip_id].status = TripStatus::Dispatched;
        }
        // The full-geometry commit query failed even though the time-only
        // search succeeded (router flaked between search and commit);
        // treated as no feasible assignment (spec §7 routing errors).
        None => trips[trip_id].status = TripStatus::Walkaway,
    }
}

/// Assign every pending trip in `pending_trip_ids` (processed in the given
/// order — the arrival/Poisson order, spec §4.3 "Ordering") to the fleet.
pub fn dispatch_pending_trips(
    pending_trip_ids: &[usize],
    trips: &mut [Trip],
    vehicles: &mut [Vehicle],
    now_ms: u64,
    router: &dyn RouteProvider,
) {
    let memo = MemoizingRouter::new(router);
    for &trip_id in pending_trip_ids {
        assign_trip(trip_id, trips, vehicles, now_ms, &memo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Vehicle;
    use crate::geometry::{Leg, Route, Step};
    use crate::trip::Request;

    /// A router that routes at a fixed speed along a straight line, always
    /// succeeding (spec §6.1 `FullRoute`/`TimeOnly` contract).
    struct StraightLineRouter {
        speed_mps: f64,
    }

    impl RouteProvider for StraightLineRouter {
        fn route(&self, origin: Pos, destination: Pos, mode: RouteMode) -> RouteResponse {
            let distance_m =
                ((destination.lon - origin.lon).powi(2) + (destination.lat - origin.lat).powi(2))
                    .sqrt()
                    * 111_000.0;
            let duration_ms = ((distance_m / self.speed_mps) * 1000.0).round() as u64;

            let route = match mode {
                RouteMode::TimeOnly => Route::time_only(distance_m, duration_ms.max(1)),
                RouteMode::FullRoute => Route::new(vec![Leg::new(vec![Step::new(
                    vec![origin, destination],
                    distance_m.max(1.0),
                    duration_ms.max(1),
                )])]),
            };
            RouteResponse::Ok(route)
        }
    }

    /// A router that always fails (every candidate insertion is infeasible).
    struct NullRouter;

    impl RouteProvider for NullRouter {
        fn route(&self, _origin: Pos, _destination: Pos, _mode: RouteMode) -> RouteResponse {
            RouteResponse::Empty
        }
    }

    fn trip_at(id: usize, origin: Pos, destination: Pos, max_wait_ms: u64) -> Trip {
        Trip::new(
            id,
            Request {
                origin,
                destination,
                request_time_ms: 0,
            },
            max_wait_ms,
        )
    }

    #[test]
    fn scenario_1_single_vehicle_single_request_feasible() {
        let router = StraightLineRouter { speed_mps: 10.0 };
        let mut vehicles = vec![Vehicle::new(0, Pos::new(0.0, 0.0), 1)];
        let mut trips = vec![trip_at(0, Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 600_000)];

        dispatch_pending_trips(&[0], &mut trips, &mut vehicles, 0, &router);

        assert_eq!(trips[0].status, TripStatus::Dispatched);
        assert_eq!(vehicles[0].waypoints.len(), 2);
        assert_eq!(vehicles[0].waypoints[0].op, WaypointOp::Pickup);
        assert_eq!(vehicles[0].waypoints[1].op, WaypointOp::Dropoff);
    }

    #[test]
    fn scenario_2_capacity_rejection_walks_away() {
        let router = StraightLineRouter { speed_mps: 10.0 };
        let mut vehicles = vec![Vehicle::new(0, Pos::new(0.0, 0.0), 1)];
        vehicles[0].load = 1; // already carrying one passenger, capacity 1

        let mut trips = vec![trip_at(0, Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 600_000)];

        dispatch_pending_trips(&[0], &mut trips, &mut vehicles, 0, &router);

        assert_eq!(trips[0].status, TripStatus::Walkaway);
        assert!(vehicles[0].waypoints.is_empty());
    }

    #[test]
    fn no_feasible_vehicle_walks_away() {
        let router = NullRouter;
        let mut vehicles = vec![Vehicle::new(0, Pos::new(0.0, 0.0), 1)];
        let mut trips = vec![trip_at(0, Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 600_000)];

        dispatch_pending_trips(&[0], &mut trips, &mut vehicles, 0, &router);

        assert_eq!(trips[0].status, TripStatus::Walkaway);
    }

    #[test]
    fn scenario_3_deadline_pruning_rejects_impossible_pickup() {
        let router = StraightLineRouter { speed_mps: 1.0 };
        // A very tight deadline that no vehicle far away can meet.
        let mut vehicles = vec![Vehicle::new(0, Pos::new(10.0, 10.0), 1)];
        let mut trips = vec![trip_at(0, Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 1)];

        dispatch_pending_trips(&[0], &mut trips, &mut vehicles, 0, &router);

        assert_eq!(trips[0].status, TripStatus::Walkaway);
    }

    #[test]
    fn scenario_4_tie_break_prefers_smaller_vehicle_id() {
        let router = StraightLineRouter { speed_mps: 10.0 };
        let mut vehicles = vec![
            Vehicle::new(0, Pos::new(0.0, 0.0), 1),
            Vehicle::new(1, Pos::new(0.0, 0.0), 1),
        ];
        let mut trips = vec![trip_at(0, Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 600_000)];

        dispatch_pending_trips(&[0], &mut trips, &mut vehicles, 0, &router);

        assert_eq!(trips[0].status, TripStatus::Dispatched);
        assert!(!vehicles[0].waypoints.is_empty());
        assert!(vehicles[1].waypoints.is_empty());
    }

    #[test]
    fn pickup_time_is_monotonic_in_pickup_index() {
        // Algebraic property (spec §8): pickup-time as a function of
        // pickup_index is non-decreasing, justifying the dispatcher's early
        // break once the deadline is exceeded.
        let router = StraightLineRouter { speed_mps: 10.0 };
        let memo = MemoizingRouter::new(&router);
        let mut vehicle = Vehicle::new(0, Pos::new(0.0, 0.0), 4);

        let leg_router = StraightLineRouter { speed_mps: 10.0 };
        let mut cursor = Pos::new(0.0, 0.0);
        for i in 0..4 {
            let pos = Pos::new(i as f64 + 1.0, 0.0);
            let route = match leg_router.route(cursor, pos, RouteMode::FullRoute) {
                RouteResponse::Ok(r) => r,
                _ => unreachable!(),
            };
            vehicle.waypoints.push(Waypoint {
                pos,
                op: WaypointOp::Dropoff,
                trip_id: i,
                route,
            });
            cursor = pos;
        }

        let mut last = 0u64;
        for pickup_index in 0..=vehicle.waypoints.len() {
            let t = pickup_time_for_index(&vehicle, Pos::new(5.0, 5.0), pickup_index, &memo, 0)
                .expect("route always succeeds");
            assert!(t >= last, "pickup time must be non-decreasing in index");
            last = t;
        }
    }
}
