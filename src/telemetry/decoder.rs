//! Memory-mapped telemetry decoder
//!
//! Maps the plugin's shared memory file read-only and decodes a
//! [`TelemetrySnapshot`] from it on demand. The decoder never retries;
//! reconnect and backoff policy belong to the sampler.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::layout;
use super::snapshot::TelemetrySnapshot;
use crate::source::SnapshotSource;
use crate::{Result, TelemetryError};

/// Live mapping of the telemetry file.
struct Region {
    file: File,
    map: Mmap,
}

/// Read-only decoder over the SCS telemetry shared memory file.
pub struct TelemetryDecoder {
    path: PathBuf,
    region: Option<Region>,
}

impl TelemetryDecoder {
    /// Create a disconnected decoder for the given shared memory path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), region: None }
    }

    /// Path of the shared memory file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map the telemetry file read-only.
    ///
    /// Calling this while connected is a no-op.
    ///
    /// # Errors
    ///
    /// - [`TelemetryError::Unavailable`] when the file does not exist
    /// - [`TelemetryError::TooSmall`] when the region cannot hold every field
    /// - [`TelemetryError::File`] when the file cannot be opened or mapped
    pub fn connect(&mut self) -> Result<()> {
        if self.region.is_some() {
            return Ok(());
        }

        if !self.path.exists() {
            return Err(TelemetryError::unavailable(&self.path));
        }

        let file =
            File::open(&self.path).map_err(|e| TelemetryError::file_error(self.path.clone(), e))?;
        let len = file
            .metadata()
            .map_err(|e| TelemetryError::file_error(self.path.clone(), e))?
            .len() as usize;
        if len < layout::MIN_SIZE {
            return Err(TelemetryError::too_small(&self.path, layout::MIN_SIZE, len));
        }

        // SAFETY: the mapping is read-only and every access is bounds checked
        // against the mapped length. The plugin may rewrite values concurrently,
        // which at worst yields a torn snapshot.
        let map = unsafe { MmapOptions::new().map(&file) }
            .map_err(|e| TelemetryError::file_error(self.path.clone(), e))?;
        if map.len() < layout::MIN_SIZE {
            return Err(TelemetryError::too_small(&self.path, layout::MIN_SIZE, map.len()));
        }

        info!(path = %self.path.display(), size = map.len(), "Connected to telemetry source");
        self.region = Some(Region { file, map });
        Ok(())
    }

    /// Decode a snapshot from the mapped region.
    ///
    /// Returns `None` when disconnected or when any field fails to decode.
    /// Failures are logged, never raised.
    pub fn decode(&self) -> Option<TelemetrySnapshot> {
        let Some(region) = &self.region else {
            debug!("Decode requested while disconnected");
            return None;
        };

        // The plugin may have truncated the file since it was mapped.
        match region.file.metadata() {
            Ok(meta) if (meta.len() as usize) < layout::MIN_SIZE => {
                warn!(size = meta.len(), "Telemetry region shrank below the required size");
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Failed to stat telemetry source");
                return None;
            }
        }

        match TelemetrySnapshot::decode(&region.map) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Failed to decode telemetry snapshot");
                None
            }
        }
    }

    /// Release the mapping and the file descriptor. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.region.take().is_some() {
            info!(path = %self.path.display(), "Disconnected from telemetry source");
        }
    }

    /// Whether the region is currently mapped.
    pub fn is_connected(&self) -> bool {
        self.region.is_some()
    }
}

impl Drop for TelemetryDecoder {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl SnapshotSource for TelemetryDecoder {
    fn is_connected(&self) -> bool {
        TelemetryDecoder::is_connected(self)
    }

    fn next_snapshot(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if !TelemetryDecoder::is_connected(self) {
            return Err(TelemetryError::NotConnected);
        }
        Ok(self.decode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Position;
    use std::io::Write;

    fn region_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_source_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut decoder = TelemetryDecoder::new(dir.path().join("SCSTelemetry"));

        assert!(matches!(decoder.connect(), Err(TelemetryError::Unavailable { .. })));
        assert!(!decoder.is_connected());
        assert!(decoder.decode().is_none());
    }

    #[test]
    fn undersized_source_is_rejected() {
        let file = region_file(&[0u8; 128]);
        let mut decoder = TelemetryDecoder::new(file.path());

        match decoder.connect() {
            Err(TelemetryError::TooSmall { required, actual, .. }) => {
                assert_eq!(required, layout::MIN_SIZE);
                assert_eq!(actual, 128);
            }
            other => panic!("Expected TooSmall, got {other:?}"),
        }
        assert!(!decoder.is_connected());
    }

    #[test]
    fn connect_is_idempotent_and_decodes_live_values() {
        let snapshot = TelemetrySnapshot {
            position: Position { x: 8_500.0, y: 45.0, z: -25_200.0 },
            ..Default::default()
        };
        let file = region_file(&snapshot.encode());
        let mut decoder = TelemetryDecoder::new(file.path());

        decoder.connect().unwrap();
        decoder.connect().unwrap();
        assert!(decoder.is_connected());

        let decoded = decoder.decode().expect("snapshot");
        assert_eq!(decoded.position, snapshot.position);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let file = region_file(&TelemetrySnapshot::default().encode());
        let mut decoder = TelemetryDecoder::new(file.path());
        decoder.connect().unwrap();

        decoder.disconnect();
        decoder.disconnect();
        assert!(!decoder.is_connected());
        assert!(decoder.decode().is_none());
        assert!(matches!(decoder.next_snapshot(), Err(TelemetryError::NotConnected)));
    }

    #[test]
    fn shrunk_source_yields_no_snapshot() {
        let file = region_file(&TelemetrySnapshot::default().encode());
        let mut decoder = TelemetryDecoder::new(file.path());
        decoder.connect().unwrap();

        file.as_file().set_len(16).unwrap();
        assert!(decoder.decode().is_none());
        assert!(decoder.is_connected());
    }
}
