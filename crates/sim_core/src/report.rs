//! End-of-run summary report (spec §6.6).

use std::fmt;

use crate::agents::Vehicle;
use crate::config::PlatformConfig;
use crate::trip::{Trip, TripStatus};

/// Metrics computed once, at the end of a run, from the final trip and
/// vehicle vectors. Only main-window trips/distance contribute (spec §4.4):
/// callers must already have excluded warm-up and wind-down activity before
/// calling [`Report::compute`].
#[derive(Debug, Clone)]
pub struct Report {
    pub config: PlatformConfig,
    pub wall_clock_ms: u64,

    pub trips_requested: usize,
    /// Every trip that was not turned away, i.e. `Dispatched | PickedUp |
    /// DroppedOff` (spec §6.6, `platform_impl.hpp::create_report`'s
    /// `dispatched_trip_count`) — a strict superset of `trips_completed`.
    pub trips_dispatched: usize,
    pub trips_completed: usize,
    pub trips_walkaway: usize,

    pub avg_wait_time_ms: f64,
    pub avg_travel_time_ms: f64,

    pub fleet_size: usize,
    pub avg_dist_traveled_m: f64,
    pub dist_traveled_per_hour_m: f64,
    pub avg_load_factor: f64,
}

impl Report {
    pub fn compute(
        trips: &[Trip],
        vehicles: &[Vehicle],
        config: &PlatformConfig,
        wall_clock_ms: u64,
    ) -> Self {
        let trips_requested = trips.len();
        let mut trips_dispatched = 0usize;
        let mut trips_completed = 0usize;
        let mut trips_walkaway = 0usize;
        let mut wait_time_total_ms = 0u64;
        let mut travel_time_total_ms = 0u64;

        for trip in trips {
            if trip.status == TripStatus::Walkaway {
                trips_walkaway += 1;
                continue;
            }

            trips_dispatched += 1;

            if trip.status == TripStatus::DroppedOff {
                trips_completed += 1;
                let pickup_ms = trip.pickup_time_ms.expect("dropped-off trip was picked up");
                let dropoff_ms = trip.dropoff_time_ms.expect("dropped-off trip has a time");
                wait_time_total_ms += pickup_ms - trip.request_time_ms;
                travel_time_total_ms += dropoff_ms - pickup_ms;
            }
        }

        let avg_wait_time_ms = if trips_completed > 0 {
            wait_time_total_ms as f64 / trips_completed as f64
        } else {
            0.0
        };
        let avg_travel_time_ms = if trips_completed > 0 {
            travel_time_total_ms as f64 / trips_completed as f64
        } else {
            0.0
        };

        let fleet_size = vehicles.len();
        let total_dist_m: f64 = vehicles.iter().map(|v| v.dist_traveled_m).sum();
        let total_loaded_dist_m: f64 = vehicles.iter().map(|v| v.loaded_dist_traveled_m).sum();

        let avg_dist_traveled_m = if fleet_size > 0 {
            total_dist_m / fleet_size as f64
        } else {
            0.0
        };
        let duration_hours = config.simulation_config.simulation_duration_ms() as f64 / 3_600_000.0;
        let dist_traveled_per_hour_m = if duration_hours > 0.0 {
            total_dist_m / duration_hours
        } else {
            0.0
        };
        let avg_load_factor = if total_dist_m > 0.0 {
            total_loaded_dist_m / total_dist_m
        } else {
            0.0
        };

        Report {
            config: config.clone(),
            wall_clock_ms,
            trips_requested,
            trips_dispatched,
            trips_completed,
            trips_walkaway,
            avg_wait_time_ms,
            avg_travel_time_ms,
            fleet_size,
            avg_dist_traveled_m,
            dist_traveled_per_hour_m,
            avg_load_factor,
        }
    }

    pub fn service_rate(&self) -> f64 {
        if self.trips_requested == 0 {
            0.0
        } else {
            self.trips_completed as f64 / self.trips_requested as f64
        }
    }

    fn dispatched_rate(&self) -> f64 {
        if self.trips_requested == 0 {
            0.0
        } else {
            self.trips_dispatched as f64 / self.trips_requested as f64
        }
    }

    fn walkaway_rate(&self) -> f64 {
        if self.trips_requested == 0 {
            0.0
        } else {
            self.trips_walkaway as f64 / self.trips_requested as f64
        }
    }

    /// Total configured duration, warm-up + main + wind-down (spec §6.6,
    /// `platform_impl.hpp`'s `total_simulation_time_s`).
    fn total_duration_ms(&self) -> u64 {
        let sim = &self.config.simulation_config;
        sim.warmup_duration_ms() + sim.simulation_duration_ms() + sim.winddown_duration_ms()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sim = &self.config.simulation_config;
        let fleet = &self.config.mod_system_config.fleet_config;
        let request = &self.config.mod_system_config.request_config;
        let output = &self.config.output_config;

        writeln!(f, "=== Simulation Report ===")?;
        writeln!(f)?;
        writeln!(f, "# System Configurations")?;
        writeln!(
            f,
            " - simulation duration: {}s ({}s warm-up + {}s main + {}s wind-down)",
            self.total_duration_ms() / 1000,
            sim.warmup_duration_s,
            sim.simulation_duration_s,
            sim.winddown_duration_s
        )?;
        writeln!(
            f,
            " - fleet config: fleet_size = {}, vehicle_capacity = {}",
            fleet.fleet_size, fleet.veh_capacity
        )?;
        writeln!(
            f,
            " - request config: max_pickup_wait_time = {}s",
            request.max_pickup_wait_time_s
        )?;
        writeln!(
            f,
            " - output config: output_datalog = {}, render_video = {}",
            output.datalog_config.output_datalog, output.video_config.render_video
        )?;
        writeln!(f)?;

        writeln!(f, "# Simulation Runtime")?;
        writeln!(
            f,
            " - wall clock runtime: {:.1} s ({:.3} s per simulated second)",
            self.wall_clock_ms as f64 / 1000.0,
            self.wall_clock_ms as f64 / self.total_duration_ms().max(1) as f64
        )?;
        writeln!(f)?;

        writeln!(f, "# Trips")?;
        writeln!(
            f,
            " - total trips: requested = {} (of which {} dispatched [{:.1}%] + {} walked away [{:.1}%])",
            self.trips_requested,
            self.trips_dispatched,
            self.dispatched_rate() * 100.0,
            self.trips_walkaway,
            self.walkaway_rate() * 100.0
        )?;
        writeln!(
            f,
            " - trips completed: {} ({:.1}%)",
            self.trips_completed,
            self.service_rate() * 100.0
        )?;
        writeln!(f, " - avg wait time:   {:.1} s", self.avg_wait_time_ms / 1000.0)?;
        writeln!(
            f,
            " - avg travel time: {:.1} s",
            self.avg_travel_time_ms / 1000.0
        )?;
        writeln!(f)?;

        writeln!(f, "# Vehicles")?;
        writeln!(f, " - fleet size:           {}", self.fleet_size)?;
        writeln!(
            f,
            " - avg dist traveled:    {:.1} m",
            self.avg_dist_traveled_m
        )?;
        writeln!(
            f,
            " - dist traveled / hour: {:.1} m/h",
            self.dist_traveled_per_hour_m
        )?;
        writeln!(f, " - avg load factor:      {:.3}", self.avg_load_factor)?;
        Ok(())
    }
}
