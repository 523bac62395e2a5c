//! Snapshot source trait

use crate::Result;
use crate::telemetry::TelemetrySnapshot;

/// Trait for anything the sampler can pull telemetry snapshots from.
///
/// [`TelemetryDecoder`](crate::telemetry::TelemetryDecoder) is the live
/// implementation; tests and replays provide their own.
pub trait SnapshotSource: Send + 'static {
    /// Whether the source is ready to produce snapshots.
    fn is_connected(&self) -> bool;

    /// Get the current snapshot
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` - a snapshot was decoded
    /// - `Ok(None)` - nothing usable this cycle (decode failure already logged)
    /// - `Err(e)` - the source itself is unusable, the sampler backs off
    fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>>;
}
