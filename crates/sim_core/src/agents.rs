//! Vehicles and waypoints (spec §3).

use crate::geometry::{Pos, Route};

/// The operation a waypoint performs when the vehicle reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointOp {
    Pickup,
    Dropoff,
}

/// One planned stop. `route` is the path from the *previous* waypoint (or
/// the vehicle's current position, for the head waypoint) to `pos`. A
/// waypoint is consumed atomically: once the vehicle traverses its route,
/// the side-effect fires and the waypoint is popped (spec §3).
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub pos: Pos,
    pub op: WaypointOp,
    pub trip_id: usize,
    pub route: Route,
}

/// One vehicle in the fleet. Invariants (spec §3, §8):
///
/// - `0 <= load <= capacity`
/// - prefix `#pickups - #dropoffs + load` stays within `[0, capacity]`
/// - every pickup's matching dropoff appears later in `waypoints`
/// - the head waypoint's route begins at `pos`
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: usize,
    pub pos: Pos,
    pub capacity: u32,
    pub load: u32,
    pub waypoints: Vec<Waypoint>,
    pub dist_traveled_m: f64,
    pub loaded_dist_traveled_m: f64,
}

impl Vehicle {
    pub fn new(id: usize, pos: Pos, capacity: u32) -> Self {
        Self {
            id,
            pos,
            capacity,
            load: 0,
            waypoints: Vec::new(),
            dist_traveled_m: 0.0,
            loaded_dist_traveled_m: 0.0,
        }
    }

    /// Number of free seats, used by the dispatcher's feasibility check.
    pub fn free_capacity(&self) -> u32 {
        self.capacity - self.load
    }
}
