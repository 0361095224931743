//! Trips and requests (spec §3).

use crate::geometry::Pos;

/// The demand source's raw output, promoted to a [`Trip`] by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub origin: Pos,
    pub destination: Pos,
    pub request_time_ms: u64,
}

/// Lifecycle of a trip (spec §3):
///
/// ```text
/// Requested ─dispatch success→ Dispatched ─pickup→ PickedUp ─dropoff→ DroppedOff
///           └─dispatch fail──→ Walkaway (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    Requested,
    Dispatched,
    PickedUp,
    DroppedOff,
    Walkaway,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Requested => "REQUESTED",
            TripStatus::Dispatched => "DISPATCHED",
            TripStatus::PickedUp => "PICKED_UP",
            TripStatus::DroppedOff => "DROPPED_OFF",
            TripStatus::Walkaway => "WALKAWAY",
        }
    }
}

/// One trip. `id` equals its index in the driver's trip vector at creation
/// time (trips are append-only and never deleted — spec §3 "Ownership").
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: usize,
    pub origin: Pos,
    pub destination: Pos,
    pub status: TripStatus,
    pub request_time_ms: u64,
    pub max_pickup_time_ms: u64,
    pub pickup_time_ms: Option<u64>,
    pub dropoff_time_ms: Option<u64>,
}

impl Trip {
    pub fn new(id: usize, request: Request, max_pickup_wait_ms: u64) -> Self {
        Self {
            id,
            origin: request.origin,
            destination: request.destination,
            status: TripStatus::Requested,
            request_time_ms: request.request_time_ms,
            max_pickup_time_ms: request.request_time_ms + max_pickup_wait_ms,
            pickup_time_ms: None,
            dropoff_time_ms: None,
        }
    }
}
