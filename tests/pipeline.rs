//! End-to-end tests: shared memory file -> decoder -> sampler -> controller.

use futures::StreamExt;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::Duration;

use roadcast::config::Config;
use roadcast::geo::{GeoIndex, LocationRecord};
use roadcast::{
    AlertKind, RadioController, Roadcast, Sampler, StartOutcome, StationTable, TelemetryDecoder,
    TelemetryError, TelemetrySnapshot, TrackingMode,
};

/// Built-in Berlin transmitter position.
const BERLIN: (f64, f64) = (18_600.0, -27_500.0);

fn near_berlin() -> TelemetrySnapshot {
    let mut s = TelemetrySnapshot::default();
    s.sdk_active = true;
    s.position.x = BERLIN.0 + 1_000.0;
    s.position.z = BERLIN.1;
    s.drivetrain.speed = 90.0;
    s.drivetrain.speed_limit = 80.0;
    s.brand = "Volvo".into();
    s
}

fn overwrite(file: &mut std::fs::File, snapshot: &TelemetrySnapshot) {
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&snapshot.encode()).unwrap();
    file.flush().unwrap();
}

fn fast_config(path: &std::path::Path) -> Config {
    Config {
        telemetry_path: path.to_path_buf(),
        update_interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(20),
        ..Config::default()
    }
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn telemetry_drives_location_jobs_and_alerts() {
    let mut region = tempfile::NamedTempFile::new().unwrap();
    overwrite(region.as_file_mut(), &near_berlin());

    let mut app = Roadcast::new(fast_config(region.path()));
    assert_eq!(app.initialize().unwrap(), TrackingMode::Plugin);
    assert!(app.is_sampling());

    let mut snapshots = Box::pin(app.snapshots());
    let first = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
        .await
        .expect("no snapshot published")
        .expect("stream ended");
    assert_eq!(first.brand, "Volvo");

    let controller = app.controller().clone();
    wait_until("location", || controller.status().location.is_some()).await;

    let status = controller.status();
    assert_eq!(status.location.as_ref().unwrap().name, "Berlin");
    assert_eq!(status.country.as_deref(), Some("germany"));
    assert_eq!(status.tracking_mode, TrackingMode::Plugin);
    assert_eq!(status.suggested_station.unwrap().country, "Germany");
    assert!((status.truck.speed - 90.0).abs() < 1e-3);

    let alerts = controller.consume_alerts();
    assert_eq!(alerts.iter().filter(|a| a.kind == AlertKind::Speed).count(), 1);

    let mut on_job = near_berlin();
    on_job.job.cargo = "Steel".into();
    on_job.job.city_src = "Berlin".into();
    on_job.job.city_dst = "Paris".into();
    on_job.job.planned_distance_km = 1_050;
    on_job.job.income = 8_400;
    // Job details land before the flag flips.
    overwrite(region.as_file_mut(), &on_job);
    on_job.job.on_job = true;
    overwrite(region.as_file_mut(), &on_job);
    wait_until("job start", || controller.status().active_job.is_some()).await;
    assert_eq!(controller.status().active_job.unwrap().destination_city, "Paris");

    let mut delivered = on_job.clone();
    delivered.job.delivered = true;
    delivered.wear.cargo = 0.03;
    overwrite(region.as_file_mut(), &delivered);
    let log = app.travel_log().clone();
    wait_until("job delivery", || !log.job_history(5).is_empty()).await;

    let job = &log.job_history(5)[0];
    assert_eq!(job.job.cargo, "Steel");
    assert_eq!(log.recent_visits(5)[0].city, "Berlin");

    app.shutdown().await;
    assert!(!app.is_sampling());
    assert_eq!(controller.status().tracking_mode, TrackingMode::Manual);

    let sessions = log.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].stats.as_ref().unwrap().jobs_completed, 1);
    assert_eq!(sessions[0].stats.as_ref().unwrap().total_income, 8_400);
}

#[tokio::test]
async fn sampler_follows_a_moving_truck() {
    let mut region = tempfile::NamedTempFile::new().unwrap();
    overwrite(region.as_file_mut(), &near_berlin());

    let mut decoder = TelemetryDecoder::new(region.path());
    decoder.connect().unwrap();

    let index = GeoIndex::new(
        vec![
            LocationRecord::new("Berlin", "germany", BERLIN.0, 0.0, BERLIN.1),
            LocationRecord::new("Paris", "france", BERLIN.0 + 500_000.0, 0.0, BERLIN.1),
        ],
        Default::default(),
    );
    let controller = Arc::new(RadioController::new(
        Arc::new(index),
        Arc::new(StationTable::fallback()),
        None,
        &Config::default(),
    ));
    let mut sampler = Sampler::new(decoder, controller.clone(), &fast_config(region.path()));
    assert_eq!(sampler.start().unwrap(), StartOutcome::Started);
    wait_until("Berlin", || controller.status().country.as_deref() == Some("germany")).await;

    // Out of every range: location clears, country stays.
    let mut between = near_berlin();
    between.position.x += 250_000.0;
    overwrite(region.as_file_mut(), &between);
    wait_until("leaving coverage", || controller.status().location.is_none()).await;
    assert_eq!(controller.status().country.as_deref(), Some("germany"));
    assert_eq!(controller.status().signal_strength, 0.0);

    let mut paris = near_berlin();
    paris.position.x += 500_000.0;
    overwrite(region.as_file_mut(), &paris);
    wait_until("Paris", || controller.status().country.as_deref() == Some("france")).await;
    assert_eq!(controller.status().location.unwrap().name, "Paris");

    sampler.stop().await;
    assert!(!sampler.is_running());
}

#[tokio::test]
async fn sampler_needs_a_connected_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let decoder = TelemetryDecoder::new(dir.path().join("missing"));
    let controller = Arc::new(RadioController::new(
        Arc::new(GeoIndex::fallback(Default::default())),
        Arc::new(StationTable::fallback()),
        None,
        &Config::default(),
    ));
    let mut sampler = Sampler::new(decoder, controller, &Config::default());
    assert!(matches!(sampler.start(), Err(TelemetryError::NotConnected)));

    let err = sampler.source().lock().connect().unwrap_err();
    assert!(matches!(err, TelemetryError::Unavailable { .. }));
    assert!(err.is_retryable());
}
