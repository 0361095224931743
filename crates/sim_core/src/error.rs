//! Error types (spec §7). Configuration and I/O failures are recoverable
//! `Result`s; invariant violations panic (fail fast, per §7).

use std::fmt;

/// Failures loading or validating a [`crate::config::PlatformConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    /// A required output path is missing when a flag implies it (§6.3, §7).
    MissingOutputPath { field: &'static str },
    /// A numeric field failed its range/positivity check.
    InvalidValue { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config yaml: {err}"),
            ConfigError::MissingOutputPath { field } => {
                write!(f, "config implies output but `{field}` is empty")
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid config value for `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Top-level error returned by [`crate::simulation::SimulationDriver::run`]
/// and the CLI's `main` (§6.5: non-zero exit on missing arguments or
/// unparseable configuration).
#[derive(Debug)]
pub enum SimError {
    Config(ConfigError),
    Datalog(std::io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(err) => write!(f, "{err}"),
            SimError::Datalog(err) => write!(f, "failed to write datalog: {err}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Config(err) => Some(err),
            SimError::Datalog(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        SimError::Config(err)
    }
}
