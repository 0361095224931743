//! Abstract demand source (spec §6.2).

use crate::trip::Request;

/// Emits trip requests up to a target simulation time. Contract: successive
/// calls must use a monotonically non-decreasing `target_time_ms`; a call
/// with a smaller value than a previous one is a programming error.
pub trait DemandSource {
    /// Return all requests with `request_time_ms <= target_time_ms` not
    /// previously returned, in ascending request-time order.
    fn drain_until(&mut self, target_time_ms: u64) -> Vec<Request>;
}
