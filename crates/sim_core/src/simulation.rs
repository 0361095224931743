//! Simulation driver (spec §4.4): the outer cycle clock tying geometry,
//! kinematics, demand, and dispatch together, bracketed by warm-up and
//! wind-down phases during which statistics are not counted.

use std::time::Instant;

use crate::agents::Vehicle;
use crate::config::PlatformConfig;
use crate::datalog::DatalogWriter;
use crate::demand::DemandSource;
use crate::dispatch::dispatch_pending_trips;
use crate::error::SimError;
use crate::geometry::Pos;
use crate::kinematics::advance_vehicle;
use crate::report::Report;
use crate::routing::RouteProvider;
use crate::trip::{Trip, TripStatus};

/// Owns the trip list and the vehicle list exclusively and passes mutable
/// borrows into the dispatcher and the kinematics function (spec §3
/// "Ownership", §5).
pub struct SimulationDriver {
    config: PlatformConfig,
    trips: Vec<Trip>,
    vehicles: Vec<Vehicle>,
    router: Box<dyn RouteProvider>,
    demand: Box<dyn DemandSource>,
    datalog: Option<DatalogWriter>,
    system_time_ms: u64,
}

impl SimulationDriver {
    /// Construct a driver with a freshly spawned fleet, all vehicles at the
    /// fleet's configured initial position (spec §6.3 "Fleet").
    pub fn new(
        config: PlatformConfig,
        router: Box<dyn RouteProvider>,
        demand: Box<dyn DemandSource>,
    ) -> Result<Self, SimError> {
        let fleet = &config.mod_system_config.fleet_config;
        let initial_pos = Pos::new(fleet.initial_lon, fleet.initial_lat);
        let vehicles = (0..fleet.fleet_size)
            .map(|id| Vehicle::new(id as usize, initial_pos, fleet.veh_capacity))
            .collect();

        let datalog_config = &config.output_config.datalog_config;
        let datalog = if datalog_config.output_datalog {
            log::info!(
                "[INFO] opening datalog stream at {}",
                datalog_config.path_to_output_datalog
            );
            Some(
                DatalogWriter::create(&datalog_config.path_to_output_datalog)
                    .map_err(SimError::Datalog)?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            trips: Vec::new(),
            vehicles,
            router,
            demand,
            datalog,
            system_time_ms: 0,
        })
    }

    /// Number of equal-length frames each cycle is subdivided into for
    /// animation (spec §4.4, §6.3 "Output"). `1` when video rendering is
    /// disabled: the whole cycle advances as a single frame.
    fn frames_per_cycle(&self) -> u64 {
        let video = &self.config.output_config.video_config;
        if video.render_video {
            video.frames_per_cycle as u64
        } else {
            1
        }
    }

    /// True when `clock` lies in the main measurement window (spec §4.4
    /// "Phases"): not warm-up, not wind-down.
    fn in_main_window(clock_ms: u64, main_start_ms: u64, main_end_ms: u64) -> bool {
        main_start_ms <= clock_ms && clock_ms < main_end_ms
    }

    /// Run the cycle loop to completion, returning the end-of-run report
    /// (spec §4.4, §6.6) or a [`SimError`] on a datalog I/O failure.
    /// Configuration and invariant failures are not representable here:
    /// configuration is validated before `new`, and invariant violations
    /// `panic!` per §7.
    pub fn run(mut self) -> Result<Report, SimError> {
        let sim = self.config.simulation_config.clone();
        let main_start_ms = sim.warmup_duration_ms();
        let main_end_ms = main_start_ms + sim.simulation_duration_ms();
        let shutdown_ms = main_end_ms + sim.winddown_duration_ms();
        let cycle_ms = sim.cycle_ms();

        let frames = self.frames_per_cycle();
        assert!(
            frames > 0 && cycle_ms % frames == 0,
            "cycle_s must be evenly divisible by frames_per_cycle when animation is enabled"
        );
        let frame_ms = cycle_ms / frames;

        let max_pickup_wait_ms = self
            .config
            .mod_system_config
            .request_config
            .max_pickup_wait_ms();

        log::info!(
            "[INFO] starting simulation: warmup={}ms main=[{}, {})ms shutdown={}ms cycle={}ms frames/cycle={}",
            main_start_ms, main_start_ms, main_end_ms, shutdown_ms, cycle_ms, frames
        );

        let start_instant = Instant::now();

        while self.system_time_ms < shutdown_ms {
            for _ in 0..frames {
                let in_main =
                    Self::in_main_window(self.system_time_ms, main_start_ms, main_end_ms);

                for vehicle in &mut self.vehicles {
                    advance_vehicle(vehicle, &mut self.trips, self.system_time_ms, frame_ms, in_main);
                }
                self.system_time_ms += frame_ms;

                if in_main {
                    if let Some(writer) = self.datalog.as_mut() {
                        writer
                            .write_state_snapshot(self.system_time_ms, &self.vehicles)
                            .map_err(SimError::Datalog)?;
                    }
                }
            }

            let requests = self.demand.drain_until(self.system_time_ms);
            let mut pending = Vec::with_capacity(requests.len());
            for request in requests {
                assert!(
                    self.config.area_config.in_area(request.origin),
                    "demand source produced an out-of-area origin: {:?}",
                    request.origin
                );
                assert!(
                    self.config.area_config.in_area(request.destination),
                    "demand source produced an out-of-area destination: {:?}",
                    request.destination
                );

                let trip_id = self.trips.len();
                self.trips.push(Trip::new(trip_id, request, max_pickup_wait_ms));
                pending.push(trip_id);
            }

            if !pending.is_empty() {
                log::debug!(
                    "[DEBUG] T = {}ms: dispatching {} pending trip(s)",
                    self.system_time_ms,
                    pending.len()
                );
                dispatch_pending_trips(
                    &pending,
                    &mut self.trips,
                    &mut self.vehicles,
                    self.system_time_ms,
                    self.router.as_ref(),
                );
            }
        }

        let wall_clock_ms = start_instant.elapsed().as_millis() as u64;

        let main_window_trip_ids: Vec<usize> = self
            .trips
            .iter()
            .filter(|t| t.request_time_ms >= main_start_ms && t.request_time_ms < main_end_ms)
            .map(|t| t.id)
            .collect();

        if let Some(mut writer) = self.datalog.take() {
            let main_trips: Vec<&Trip> = main_window_trip_ids
                .iter()
                .map(|&id| &self.trips[id])
                .collect();
            writer
                .write_terminal_trip_list(&main_trips)
                .map_err(SimError::Datalog)?;
            writer.close().map_err(SimError::Datalog)?;
        }

        let main_trips: Vec<Trip> = main_window_trip_ids
            .into_iter()
            .map(|id| self.trips[id].clone())
            .collect();

        log::info!(
            "[INFO] simulation complete: {} wall-clock ms, {} main-window trips",
            wall_clock_ms,
            main_trips.len()
        );

        Ok(Report::compute(
            &main_trips,
            &self.vehicles,
            &self.config,
            wall_clock_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AreaConfig, DatalogConfig, FleetConfig, ModSystemConfig, OutputConfig, RequestConfig,
        SimulationConfig, VideoConfig,
    };
    use crate::demand::DemandSource;
    use crate::routing::StaticSpeedRouter;
    use crate::trip::Request;

    fn test_config(warmup_s: u64, main_s: u64, winddown_s: u64, cycle_s: u64) -> PlatformConfig {
        PlatformConfig {
            area_config: AreaConfig {
                lon_min: -10.0,
                lon_max: 10.0,
                lat_min: -10.0,
                lat_max: 10.0,
            },
            mod_system_config: ModSystemConfig {
                fleet_config: FleetConfig {
                    fleet_size: 1,
                    veh_capacity: 1,
                    initial_lon: 0.0,
                    initial_lat: 0.0,
                },
                request_config: RequestConfig {
                    max_dispatch_wait_time_s: 300,
                    max_pickup_wait_time_s: 600,
                },
            },
            simulation_config: SimulationConfig {
                cycle_s,
                simulation_duration_s: main_s,
                warmup_duration_s: warmup_s,
                winddown_duration_s: winddown_s,
            },
            output_config: OutputConfig {
                datalog_config: DatalogConfig::default(),
                video_config: VideoConfig::default(),
            },
        }
    }

    /// A demand source that emits one fixed request at a given time, then
    /// nothing (spec §6.2 mock-friendliness — "Template-over-router/demand-source").
    struct SingleRequestDemand {
        request: Option<Request>,
    }

    impl DemandSource for SingleRequestDemand {
        fn drain_until(&mut self, target_time_ms: u64) -> Vec<Request> {
            match self.request.take() {
                Some(req) if req.request_time_ms <= target_time_ms => vec![req],
                Some(req) => {
                    self.request = Some(req);
                    Vec::new()
                }
                None => Vec::new(),
            }
        }
    }

    struct NoDemand;
    impl DemandSource for NoDemand {
        fn drain_until(&mut self, _target_time_ms: u64) -> Vec<Request> {
            Vec::new()
        }
    }

    #[test]
    fn scenario_6_warmup_exclusion() {
        // Warm-up 100s, main 100s, wind-down 0s. A trip requested at t=50s
        // (during warm-up) is omitted from the final report (spec §8
        // scenario 6).
        let config = test_config(100, 100, 0, 10);
        let router = Box::new(StaticSpeedRouter::new(20.0));
        let demand = Box::new(SingleRequestDemand {
            request: Some(Request {
                origin: Pos::new(0.0, 0.0),
                destination: Pos::new(0.01, 0.0),
                request_time_ms: 50_000,
            }),
        });

        let driver = SimulationDriver::new(config, router, demand).unwrap();
        let report = driver.run().unwrap();

        assert_eq!(report.trips_requested, 0);
    }

    #[test]
    fn main_window_trip_is_counted() {
        let config = test_config(10, 100, 0, 10);
        let router = Box::new(StaticSpeedRouter::new(50.0));
        let demand = Box::new(SingleRequestDemand {
            request: Some(Request {
                origin: Pos::new(0.0, 0.0),
                destination: Pos::new(0.01, 0.0),
                request_time_ms: 15_000,
            }),
        });

        let driver = SimulationDriver::new(config, router, demand).unwrap();
        let report = driver.run().unwrap();

        assert_eq!(report.trips_requested, 1);
    }

    #[test]
    fn empty_run_produces_zeroed_report() {
        let config = test_config(0, 10, 0, 10);
        let router = Box::new(StaticSpeedRouter::new(10.0));
        let demand = Box::new(NoDemand);

        let driver = SimulationDriver::new(config, router, demand).unwrap();
        let report = driver.run().unwrap();

        assert_eq!(report.trips_requested, 0);
        assert_eq!(report.fleet_size, 1);
    }

    #[test]
    #[should_panic(expected = "out-of-area")]
    fn out_of_area_request_panics() {
        let config = test_config(0, 10, 0, 10);
        let router = Box::new(StaticSpeedRouter::new(10.0));
        let demand = Box::new(SingleRequestDemand {
            request: Some(Request {
                origin: Pos::new(999.0, 0.0),
                destination: Pos::new(0.0, 0.0),
                request_time_ms: 0,
            }),
        });

        let driver = SimulationDriver::new(config, router, demand).unwrap();
        driver.run().unwrap();
    }
}
