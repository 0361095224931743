//! Vehicle-advance subsystem (spec §4.2): progresses a vehicle along its
//! waypoint plan by a time slice, firing pickup/dropoff side-effects and
//! accumulating distance statistics.

use crate::agents::{Vehicle, WaypointOp};
use crate::geometry::truncate_route_by_time;
use crate::trip::{Trip, TripStatus};

/// Consume at most `delta_ms` milliseconds of `vehicle`'s plan, starting at
/// simulation time `now_ms`. Distance statistics are only accumulated when
/// `in_main_window` is true (spec §4.2, §4.4).
pub fn advance_vehicle(
    vehicle: &mut Vehicle,
    trips: &mut [Trip],
    now_ms: u64,
    mut delta_ms: u64,
    in_main_window: bool,
) {
    if delta_ms == 0 {
        return;
    }

    let mut elapsed_ms: u64 = 0;

    while !vehicle.waypoints.is_empty() && vehicle.waypoints[0].route.duration_ms <= delta_ms {
        let wp = vehicle.waypoints.remove(0);

        delta_ms -= wp.route.duration_ms;
        elapsed_ms += wp.route.duration_ms;

        if in_main_window {
            vehicle.dist_traveled_m += wp.route.distance_m;
            vehicle.loaded_dist_traveled_m += wp.route.distance_m * vehicle.load as f64;
        }

        vehicle.pos = wp.pos;

        match wp.op {
            WaypointOp::Pickup => {
                assert!(
                    vehicle.load < vehicle.capacity,
                    "vehicle {} load would exceed capacity on pickup of trip {}",
                    vehicle.id,
                    wp.trip_id
                );
                vehicle.load += 1;
                let trip = &mut trips[wp.trip_id];
                trip.pickup_time_ms = Some(now_ms + elapsed_ms);
                trip.status = TripStatus::PickedUp;
            }
            WaypointOp::Dropoff => {
                assert!(
                    vehicle.load > 0,
                    "vehicle {} load would go negative on dropoff of trip {}",
                    vehicle.id,
                    wp.trip_id
                );
                vehicle.load -= 1;
                let trip = &mut trips[wp.trip_id];
                trip.dropoff_time_ms = Some(now_ms + elapsed_ms);
                trip.status = TripStatus::DroppedOff;
            }
        }
    }

    if let Some(head) = vehicle.waypoints.first_mut() {
        if delta_ms > 0 {
            let consumed_fraction = delta_ms as f64 / head.route.duration_ms as f64;
            if in_main_window {
                vehicle.dist_traveled_m += head.route.distance_m * consumed_fraction;
                vehicle.loaded_dist_traveled_m +=
                    head.route.distance_m * consumed_fraction * vehicle.load as f64;
            }

            truncate_route_by_time(&mut head.route, delta_ms);
            vehicle.pos = head
                .route
                .first_pose()
                .expect("truncated route must retain geometry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Waypoint;
    use crate::geometry::{Leg, Pos, Route, Step};
    use crate::trip::Request;

    fn straight_route(from: Pos, to: Pos, speed_mps: f64) -> Route {
        let distance_m = ((to.lon - from.lon).powi(2) + (to.lat - from.lat).powi(2)).sqrt()
            * 111_000.0;
        let duration_ms = ((distance_m / speed_mps) * 1000.0).round() as u64;
        Route::new(vec![Leg::new(vec![Step::new(
            vec![from, to],
            distance_m,
            duration_ms.max(1),
        )])])
    }

    fn trip_with(id: usize, max_pickup_wait_ms: u64) -> Trip {
        Trip::new(
            id,
            Request {
                origin: Pos::new(0.0, 0.0),
                destination: Pos::new(1.0, 0.0),
                request_time_ms: 0,
            },
            max_pickup_wait_ms,
        )
    }

    #[test]
    fn scenario_1_single_vehicle_feasible_pickup_and_dropoff() {
        let mut vehicle = Vehicle::new(0, Pos::new(0.0, 0.0), 1);
        let mut trips = vec![trip_with(0, 600_000)];

        let pickup_route = straight_route(Pos::new(0.0, 0.0), Pos::new(0.0, 0.0), 10.0);
        let dropoff_route = straight_route(Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 10.0);
        let dropoff_duration = dropoff_route.duration_ms;

        vehicle.waypoints.push(Waypoint {
            pos: Pos::new(0.0, 0.0),
            op: WaypointOp::Pickup,
            trip_id: 0,
            route: pickup_route,
        });
        vehicle.waypoints.push(Waypoint {
            pos: Pos::new(1.0, 0.0),
            op: WaypointOp::Dropoff,
            trip_id: 0,
            route: dropoff_route,
        });

        advance_vehicle(&mut vehicle, &mut trips, 0, dropoff_duration + 1, true);

        assert!(vehicle.waypoints.is_empty());
        assert_eq!(vehicle.load, 0);
        assert_eq!(trips[0].status, TripStatus::DroppedOff);
        assert!(trips[0].pickup_time_ms.is_some());
        assert!(trips[0].dropoff_time_ms.is_some());
    }

    #[test]
    fn partial_advance_truncates_head_waypoint_and_stops() {
        let mut vehicle = Vehicle::new(0, Pos::new(0.0, 0.0), 1);
        let mut trips = vec![trip_with(0, 600_000)];

        let route = straight_route(Pos::new(0.0, 0.0), Pos::new(0.0, 10.0), 1.0);
        let full_duration = route.duration_ms;

        vehicle.waypoints.push(Waypoint {
            pos: Pos::new(0.0, 10.0),
            op: WaypointOp::Dropoff,
            trip_id: 0,
            route,
        });
        vehicle.load = 1;

        advance_vehicle(&mut vehicle, &mut trips, 0, full_duration / 2, true);

        assert_eq!(vehicle.waypoints.len(), 1);
        assert_eq!(trips[0].status, TripStatus::Requested);
        assert!(vehicle.dist_traveled_m > 0.0);
        assert!((vehicle.pos.lat - 5.0).abs() < 0.5);
    }

    #[test]
    fn idle_vehicle_does_not_move() {
        let mut vehicle = Vehicle::new(0, Pos::new(1.0, 1.0), 1);
        let mut trips: Vec<Trip> = Vec::new();

        advance_vehicle(&mut vehicle, &mut trips, 0, 5000, true);

        assert_eq!(vehicle.pos, Pos::new(1.0, 1.0));
        assert_eq!(vehicle.dist_traveled_m, 0.0);
    }

    #[test]
    fn warmup_window_does_not_accumulate_distance() {
        let mut vehicle = Vehicle::new(0, Pos::new(0.0, 0.0), 1);
        let mut trips = vec![trip_with(0, 600_000)];

        let route = straight_route(Pos::new(0.0, 0.0), Pos::new(1.0, 0.0), 10.0);
        let duration = route.duration_ms;

        vehicle.waypoints.push(Waypoint {
            pos: Pos::new(1.0, 0.0),
            op: WaypointOp::Dropoff,
            trip_id: 0,
            route,
        });
        vehicle.load = 1;

        advance_vehicle(&mut vehicle, &mut trips, 0, duration + 1, false);

        assert_eq!(vehicle.dist_traveled_m, 0.0);
        assert_eq!(trips[0].status, TripStatus::DroppedOff);
    }
}
