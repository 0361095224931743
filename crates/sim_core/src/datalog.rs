//! Persisted run state: a stream of YAML documents, one per cycle (or per
//! frame when animating), plus a terminal trip-list document (spec §6.4).
//!
//! Positions are rounded to 6 decimal places before serialization, matching
//! the source's `fmt::format!("{:.6}", ...)` rendering.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::agents::Vehicle;
use crate::geometry::Pos;
use crate::trip::Trip;

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone, Serialize)]
struct PosDoc {
    lon: f64,
    lat: f64,
}

impl From<Pos> for PosDoc {
    fn from(pos: Pos) -> Self {
        PosDoc {
            lon: round6(pos.lon),
            lat: round6(pos.lat),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct VehicleSnapshot {
    pos: PosDoc,
    /// One entry per waypoint; each entry is the polyline of poses along
    /// that waypoint's embedded route (spec §6.4 `waypoints: [[{lon, lat}, ...]]`).
    waypoints: Vec<Vec<PosDoc>>,
}

impl VehicleSnapshot {
    fn from_vehicle(vehicle: &Vehicle) -> Self {
        let waypoints = vehicle
            .waypoints
            .iter()
            .map(|wp| {
                wp.route
                    .legs
                    .iter()
                    .flat_map(|leg| leg.steps.iter())
                    .flat_map(|step| step.poses.iter())
                    .map(|pos| PosDoc::from(*pos))
                    .collect()
            })
            .collect();

        VehicleSnapshot {
            pos: PosDoc::from(vehicle.pos),
            waypoints,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct StateDoc {
    system_time_ms: u64,
    vehicles: Vec<VehicleSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
struct TripDoc {
    id: usize,
    origin: PosDoc,
    destination: PosDoc,
    status: &'static str,
    request_time_ms: u64,
    max_pickup_time_ms: u64,
    pickup_time_ms: Option<u64>,
    dropoff_time_ms: Option<u64>,
}

impl TripDoc {
    fn from_trip(trip: &Trip) -> Self {
        TripDoc {
            id: trip.id,
            origin: PosDoc::from(trip.origin),
            destination: PosDoc::from(trip.destination),
            status: trip.status.as_str(),
            request_time_ms: trip.request_time_ms,
            max_pickup_time_ms: trip.max_pickup_time_ms,
            pickup_time_ms: trip.pickup_time_ms,
            dropoff_time_ms: trip.dropoff_time_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct TripListDoc {
    trips: Vec<TripDoc>,
}

/// A scoped output stream the driver appends to on cycle/frame boundaries
/// and closes deterministically at the end of `run` (spec §5 "Resource
/// policy", §6.4).
pub struct DatalogWriter {
    writer: BufWriter<File>,
}

impl DatalogWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_document<T: Serialize>(&mut self, doc: &T) -> io::Result<()> {
        let yaml = serde_yaml::to_string(doc)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.writer.write_all(yaml.as_bytes())?;
        self.writer.write_all(b"---\n")?;
        Ok(())
    }

    /// Append one per-cycle (or per-frame) state snapshot (spec §6.4).
    pub fn write_state_snapshot(&mut self, system_time_ms: u64, vehicles: &[Vehicle]) -> io::Result<()> {
        let doc = StateDoc {
            system_time_ms,
            vehicles: vehicles.iter().map(VehicleSnapshot::from_vehicle).collect(),
        };
        self.write_document(&doc)
    }

    /// Append the terminal document: every main-window trip's id, origin,
    /// destination, status, and request/pickup/dropoff times (spec §6.4).
    pub fn write_terminal_trip_list(&mut self, trips: &[&Trip]) -> io::Result<()> {
        let doc = TripListDoc {
            trips: trips.iter().map(|t| TripDoc::from_trip(t)).collect(),
        };
        self.write_document(&doc)
    }

    /// Flush and drop the underlying file handle (spec §5: closed
    /// deterministically at the end of `run`).
    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::Request;

    #[test]
    fn round6_snaps_to_six_decimal_places() {
        assert!((round6(37.123_456_789) - 37.123_457).abs() < 1e-9);
    }

    #[test]
    fn writes_state_snapshot_and_trip_list_as_a_yaml_document_stream() {
        let path = std::env::temp_dir().join("sim_core_datalog_test.yml");
        let mut writer = DatalogWriter::create(&path).unwrap();

        let vehicle = Vehicle::new(0, Pos::new(1.0, 2.0), 4);
        writer.write_state_snapshot(1_000, std::slice::from_ref(&vehicle)).unwrap();

        let trip = Trip::new(
            0,
            Request {
                origin: Pos::new(0.0, 0.0),
                destination: Pos::new(1.0, 0.0),
                request_time_ms: 500,
            },
            600_000,
        );
        writer.write_terminal_trip_list(&[&trip]).unwrap();
        writer.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("system_time_ms: 1000"));
        assert!(contents.contains("---"));
        assert!(contents.contains("request_time_ms: 500"));

        std::fs::remove_file(&path).ok();
    }
}
