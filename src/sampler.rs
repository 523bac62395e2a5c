//! Background sampler driving the decode and ingest pipeline

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::controller::RadioController;
use crate::source::SnapshotSource;
use crate::telemetry::TelemetrySnapshot;
use crate::{Result, TelemetryError};

/// What [`Sampler::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy)]
struct Cadence {
    update_interval: Duration,
    error_backoff: Duration,
    stop_timeout: Duration,
}

struct Running {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Periodically pulls a snapshot from a source and feeds it to the controller.
///
/// The loop runs as a tokio task. Each cycle decodes one snapshot, ingests
/// it and publishes it to [`Sampler::snapshots`] subscribers, then sleeps for
/// the update interval. A failing or panicking cycle is logged and followed
/// by the longer error backoff; it never ends the loop.
pub struct Sampler<S: SnapshotSource> {
    source: Arc<Mutex<S>>,
    controller: Arc<RadioController>,
    cadence: Cadence,
    snapshots: watch::Sender<Option<Arc<TelemetrySnapshot>>>,
    running: Option<Running>,
}

impl<S: SnapshotSource> Sampler<S> {
    pub fn new(source: S, controller: Arc<RadioController>, config: &Config) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            source: Arc::new(Mutex::new(source)),
            controller,
            cadence: Cadence {
                update_interval: config.update_interval,
                error_backoff: config.error_backoff,
                stop_timeout: config.stop_timeout,
            },
            snapshots,
            running: None,
        }
    }

    /// Shared handle to the source, locked by the loop once per cycle.
    pub fn source(&self) -> &Arc<Mutex<S>> {
        &self.source
    }

    /// Spawn the sample loop on the current tokio runtime.
    ///
    /// Fails with [`TelemetryError::NotConnected`] when the source is not
    /// connected and with [`TelemetryError::Runtime`] outside a runtime.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.is_running() {
            debug!("Sampler already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if !self.source.lock().is_connected() {
            return Err(TelemetryError::NotConnected);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TelemetryError::runtime(format!("sampler needs a tokio runtime: {e}")))?;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(sample_loop(
            self.source.clone(),
            self.controller.clone(),
            self.snapshots.clone(),
            self.cadence,
            cancel.clone(),
        ));
        self.running = Some(Running { handle, cancel });
        info!(interval = ?self.cadence.update_interval, "Sampler started");
        Ok(StartOutcome::Started)
    }

    /// Signal the loop to stop and wait for it, up to the stop timeout.
    ///
    /// No-op when the sampler is not running. A loop still busy after the
    /// timeout keeps running until its current cycle returns.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();

        match tokio::time::timeout(self.cadence.stop_timeout, &mut running.handle).await {
            Ok(Ok(())) => info!("Sampler stopped"),
            Ok(Err(e)) => warn!(error = %e, "Sampler task ended abnormally"),
            Err(_) => {
                warn!(timeout = ?self.cadence.stop_timeout, "Sampler did not stop in time");
                self.running = Some(running);
            }
        }
    }

    /// Whether the loop task is alive.
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Stream of decoded snapshots.
    ///
    /// Yields the latest snapshot right away when there is one, then every
    /// new one. Slow consumers skip intermediate snapshots.
    pub fn snapshots(&self) -> impl Stream<Item = Arc<TelemetrySnapshot>> + Send + 'static {
        WatchStream::new(self.snapshots.subscribe()).filter_map(|opt| async move { opt })
    }

    pub fn latest_snapshot(&self) -> Option<Arc<TelemetrySnapshot>> {
        self.snapshots.borrow().clone()
    }
}

impl<S: SnapshotSource> Drop for Sampler<S> {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

async fn sample_loop<S: SnapshotSource>(
    source: Arc<Mutex<S>>,
    controller: Arc<RadioController>,
    snapshots: watch::Sender<Option<Arc<TelemetrySnapshot>>>,
    cadence: Cadence,
    cancel: CancellationToken,
) {
    let mut cycles = 0u64;
    let mut consecutive_errors = 0u32;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let cycle = std::panic::catch_unwind(AssertUnwindSafe(|| sample_once(&source, &controller)));
        let delay = match cycle {
            Ok(Ok(Some(snapshot))) => {
                cycles += 1;
                consecutive_errors = 0;
                trace!(cycle = cycles, speed = snapshot.drivetrain.speed, "Sampled");
                snapshots.send_replace(Some(snapshot));
                cadence.update_interval
            }
            Ok(Ok(None)) => {
                trace!("No snapshot this cycle");
                cadence.update_interval
            }
            Ok(Err(e)) => {
                consecutive_errors += 1;
                error!(error = %e, consecutive_errors, "Sampler cycle failed");
                cadence.error_backoff
            }
            Err(_) => {
                consecutive_errors += 1;
                error!(consecutive_errors, "Sampler cycle panicked");
                cadence.error_backoff
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!(cycles, "Sampler loop ended");
}

fn sample_once<S: SnapshotSource>(
    source: &Mutex<S>,
    controller: &RadioController,
) -> Result<Option<Arc<TelemetrySnapshot>>> {
    let Some(snapshot) = source.lock().next_snapshot()? else {
        return Ok(None);
    };
    controller.ingest(&snapshot);
    Ok(Some(Arc::new(snapshot)))
}
