//! Concrete [`DemandSource`]: weighted origin/destination pairs, Poisson
//! arrivals (spec §6.2, §9 "Demand source interface").
//!
//! Loaded from a YAML list of `{origin, destination, trips_per_hour}`
//! entries, mirroring `demand_generator.cpp`'s accumulated-probability
//! table: each OD pair's `accumulated_prob` is the running sum of
//! `trips_per_hour` up to and including that entry, divided by the total.
//! A uniform draw in `[0, 1)` is mapped to an OD pair by finding the first
//! entry whose `accumulated_prob` is not less than the draw.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::demand::DemandSource;
use crate::error::ConfigError;
use crate::geometry::Pos;
use crate::trip::Request;

#[derive(Debug, Clone, Deserialize)]
struct OdEntryYaml {
    origin: Pos,
    destination: Pos,
    trips_per_hour: f64,
}

#[derive(Debug, Clone)]
struct OdWithProb {
    origin: Pos,
    destination: Pos,
    accumulated_prob: f64,
}

/// Poisson-process demand generator over a weighted set of OD pairs (spec
/// §6.2, §9). Deterministic given a seed: all randomness is drawn from a
/// single [`StdRng`] owned by the source.
#[derive(Debug)]
pub struct PoissonDemandSource {
    ods: Vec<OdWithProb>,
    trips_per_hour_total: f64,
    rng: StdRng,
    /// A request already generated but not yet due (its time exceeds the
    /// last `target_time_ms` asked for); carried over to the next call.
    pending: Option<Request>,
    last_target_ms: u64,
}

impl PoissonDemandSource {
    /// Load and validate a demand-config YAML file (spec §6.2, §6.5
    /// `<demand_config.yml>`).
    pub fn load(path: impl AsRef<Path>, seed: u64) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<OdEntryYaml> = serde_yaml::from_str(&text)?;

        if entries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "demand_config",
                reason: "must contain at least one origin/destination pair".into(),
            });
        }

        let trips_per_hour_total: f64 = entries.iter().map(|e| e.trips_per_hour).sum();
        if trips_per_hour_total <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "demand_config",
                reason: "total trips_per_hour must be positive".into(),
            });
        }

        let mut accumulated = 0.0;
        let ods = entries
            .into_iter()
            .map(|entry| {
                accumulated += entry.trips_per_hour;
                OdWithProb {
                    origin: entry.origin,
                    destination: entry.destination,
                    accumulated_prob: accumulated / trips_per_hour_total,
                }
            })
            .collect();

        log::info!(
            "[INFO] loaded demand config with {} OD pairs, {:.2} trips/hour total",
            ods.len(),
            trips_per_hour_total
        );

        Ok(Self {
            ods,
            trips_per_hour_total,
            rng: StdRng::seed_from_u64(seed),
            pending: None,
            last_target_ms: 0,
        })
    }

    fn pick_od(&mut self) -> (Pos, Pos) {
        let draw: f64 = self.rng.gen();
        let idx = self
            .ods
            .partition_point(|od| od.accumulated_prob < draw)
            .min(self.ods.len() - 1);
        let od = &self.ods[idx];
        (od.origin, od.destination)
    }

    /// Sample the next request's absolute request time, given the previous
    /// one, by drawing an exponential inter-arrival interval (spec §9,
    /// grounded on the teacher's `ExponentialInterArrival::sample_ms`).
    fn next_request_time_ms(&mut self, after_ms: u64) -> u64 {
        let u: f64 = self.rng.gen::<f64>().max(1e-10);
        let interval_s = -((1.0 - u).ln()) / self.trips_per_hour_total * 3600.0;
        after_ms + (interval_s * 1000.0).round() as u64
    }

    fn generate_next(&mut self, after_ms: u64) -> Request {
        let (origin, destination) = self.pick_od();
        let request_time_ms = self.next_request_time_ms(after_ms);
        Request {
            origin,
            destination,
            request_time_ms,
        }
    }
}

impl DemandSource for PoissonDemandSource {
    fn drain_until(&mut self, target_time_ms: u64) -> Vec<Request> {
        debug_assert!(
            target_time_ms >= self.last_target_ms,
            "drain_until called with a smaller target_time than a previous call"
        );
        self.last_target_ms = target_time_ms;

        let mut requests = Vec::new();

        if let Some(pending) = self.pending {
            if pending.request_time_ms > target_time_ms {
                return requests;
            }
            requests.push(pending);
            self.pending = None;
        }

        loop {
            let after_ms = requests.last().map(|r| r.request_time_ms).unwrap_or(0);
            let candidate = self.generate_next(after_ms);

            if candidate.request_time_ms > target_time_ms {
                self.pending = Some(candidate);
                break;
            }

            requests.push(candidate);
        }

        log::debug!(
            "[DEBUG] T = {}: generated {} request(s) this cycle",
            target_time_ms,
            requests.len()
        );

        requests
    }
}
