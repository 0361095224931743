//! Platform configuration: YAML schema, loading, and validation (spec §6.3).
//!
//! The schema mirrors the nesting of the source this platform was modeled
//! on: `area_config`, `mod_system_config.{fleet_config,request_config}`,
//! `simulation_config`, and `output_config.{datalog_config,video_config}`.
//! All durations in the file are whole seconds; the core works exclusively
//! in milliseconds, so every `*_s` field has a `*_ms()` accessor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl AreaConfig {
    pub fn in_area(&self, pos: crate::geometry::Pos) -> bool {
        pos.in_area(self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub fleet_size: u32,
    pub veh_capacity: u32,
    pub initial_lon: f64,
    pub initial_lat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub max_dispatch_wait_time_s: u64,
    pub max_pickup_wait_time_s: u64,
}

impl RequestConfig {
    pub fn max_pickup_wait_ms(&self) -> u64 {
        self.max_pickup_wait_time_s * 1000
    }

    pub fn max_dispatch_wait_ms(&self) -> u64 {
        self.max_dispatch_wait_time_s * 1000
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModSystemConfig {
    pub fleet_config: FleetConfig,
    pub request_config: RequestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub cycle_s: u64,
    pub simulation_duration_s: u64,
    pub warmup_duration_s: u64,
    pub winddown_duration_s: u64,
}

impl SimulationConfig {
    pub fn cycle_ms(&self) -> u64 {
        self.cycle_s * 1000
    }

    pub fn simulation_duration_ms(&self) -> u64 {
        self.simulation_duration_s * 1000
    }

    pub fn warmup_duration_ms(&self) -> u64 {
        self.warmup_duration_s * 1000
    }

    pub fn winddown_duration_ms(&self) -> u64 {
        self.winddown_duration_s * 1000
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatalogConfig {
    pub output_datalog: bool,
    #[serde(default)]
    pub path_to_output_datalog: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoConfig {
    pub render_video: bool,
    #[serde(default)]
    pub path_to_output_video: String,
    #[serde(default)]
    pub frames_per_cycle: u32,
    #[serde(default)]
    pub replay_speed: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub datalog_config: DatalogConfig,
    pub video_config: VideoConfig,
}

/// The full platform configuration document (spec §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub area_config: AreaConfig,
    pub mod_system_config: ModSystemConfig,
    pub simulation_config: SimulationConfig,
    pub output_config: OutputConfig,
}

impl PlatformConfig {
    /// Read and parse a YAML config file, then validate it (spec §6.3,
    /// §7 — sanity checks run once at startup and fail fast).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: PlatformConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let area = &self.area_config;
        if area.lon_min >= area.lon_max {
            return Err(ConfigError::InvalidValue {
                field: "area_config.lon_min",
                reason: "must be less than lon_max".into(),
            });
        }
        if area.lat_min >= area.lat_max {
            return Err(ConfigError::InvalidValue {
                field: "area_config.lat_min",
                reason: "must be less than lat_max".into(),
            });
        }

        let fleet = &self.mod_system_config.fleet_config;
        if fleet.fleet_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mod_system_config.fleet_config.fleet_size",
                reason: "must be positive".into(),
            });
        }
        if fleet.veh_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mod_system_config.fleet_config.veh_capacity",
                reason: "must be positive".into(),
            });
        }

        let sim = &self.simulation_config;
        if sim.cycle_s == 0 {
            return Err(ConfigError::InvalidValue {
                field: "simulation_config.cycle_s",
                reason: "must be positive".into(),
            });
        }
        if sim.simulation_duration_s == 0 {
            return Err(ConfigError::InvalidValue {
                field: "simulation_config.simulation_duration_s",
                reason: "must be positive".into(),
            });
        }

        let datalog = &self.output_config.datalog_config;
        if datalog.output_datalog && datalog.path_to_output_datalog.is_empty() {
            return Err(ConfigError::MissingOutputPath {
                field: "output_config.datalog_config.path_to_output_datalog",
            });
        }

        let video = &self.output_config.video_config;
        if video.render_video {
            if !datalog.output_datalog {
                return Err(ConfigError::InvalidValue {
                    field: "output_config.video_config.render_video",
                    reason: "requires output_config.datalog_config.output_datalog".into(),
                });
            }
            if video.path_to_output_video.is_empty() {
                return Err(ConfigError::MissingOutputPath {
                    field: "output_config.video_config.path_to_output_video",
                });
            }
            if video.frames_per_cycle == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "output_config.video_config.frames_per_cycle",
                    reason: "must be positive".into(),
                });
            }
            if video.replay_speed <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "output_config.video_config.replay_speed",
                    reason: "must be positive".into(),
                });
            }
        }

        Ok(())
    }
}
