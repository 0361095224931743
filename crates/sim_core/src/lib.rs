//! # Mobility-on-Demand Fleet Simulation Core
//!
//! A cycle-based simulation engine for a ride-hailing fleet operating under
//! an insertion-heuristic dispatcher.
//!
//! ## Overview
//!
//! This crate provides the core simulation engine, including:
//!
//! - **Geometry**: Hierarchical route/leg/step/pose containers with
//!   time-based truncation
//! - **Kinematics**: Per-vehicle advancement along a waypoint plan
//! - **Dispatch**: Insertion-heuristic trip-to-vehicle assignment
//! - **Demand**: Pluggable trip-request generation
//! - **Routing**: Pluggable origin/destination routing
//! - **Simulation**: The cycle clock tying every module together
//! - **Datalog / Report**: Run artifacts (state snapshots, summary metrics)
//!
//! ## Key Concepts
//!
//! - **Plain ownership**: the driver owns `Vec<Trip>` and `Vec<Vehicle>`
//!   directly and passes mutable borrows into the dispatcher and the
//!   kinematics function — there is no entity-component framework here.
//! - **Millisecond time**: every duration and timestamp in the core is an
//!   integer count of milliseconds, never a floating-point second count.
//! - **Deterministic**: a seeded RNG and single-threaded cycle loop make a
//!   run fully reproducible from its config and seed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sim_core::config::PlatformConfig;
//! use sim_core::simulation::SimulationDriver;
//!
//! # fn example(
//! #     config: PlatformConfig,
//! #     router: Box<dyn sim_core::routing::RouteProvider>,
//! #     demand: Box<dyn sim_core::demand::DemandSource>,
//! # ) -> Result<(), sim_core::error::SimError> {
//! let driver = SimulationDriver::new(config, router, demand)?;
//! let report = driver.run()?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod config;
pub mod datalog;
pub mod demand;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod kinematics;
pub mod poisson_demand;
pub mod report;
pub mod routing;
pub mod simulation;
pub mod trip;
