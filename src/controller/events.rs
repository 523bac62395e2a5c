//! Edge detection, alert conditions and deferred travel-log events

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::state::AlertKind;
use crate::telemetry::TelemetrySnapshot;
use crate::travel_log::{JobStart, TravelLog};

/// Rising edges seen in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub job_started: bool,
    pub job_delivered: bool,
    pub fined: bool,
}

/// Previous values of the edge-triggered flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTracker {
    on_job: bool,
    delivered: bool,
    fined: bool,
}

impl EdgeTracker {
    /// Report false to true transitions and remember the new values.
    pub fn observe(&mut self, on_job: bool, delivered: bool, fined: bool) -> Edges {
        let edges = Edges {
            job_started: on_job && !self.on_job,
            job_delivered: delivered && !self.delivered,
            fined: fined && !self.fined,
        };
        *self = Self { on_job, delivered, fined };
        edges
    }
}

/// Per-kind cooldown clock for level-triggered alerts.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    window: Duration,
    last_fired: HashMap<AlertKind, Instant>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self { window, last_fired: HashMap::new() }
    }

    /// Whether `kind` may fire at `now`; firing restarts its clock.
    pub fn try_fire(&mut self, kind: AlertKind, now: Instant) -> bool {
        let cooling = self
            .last_fired
            .get(&kind)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.window);
        if cooling {
            return false;
        }
        self.last_fired.insert(kind, now);
        true
    }
}

/// Thresholds for level-triggered alerts.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub speeding_margin_kmh: f32,
    pub low_fuel_ratio: f32,
}

/// Alerts whose condition holds for this snapshot, before cooldowns.
pub fn alert_conditions(s: &TelemetrySnapshot, thresholds: AlertThresholds) -> Vec<(AlertKind, String)> {
    let mut alerts = Vec::new();
    let drive = &s.drivetrain;

    if drive.speed_limit > 0.0 && drive.speed > drive.speed_limit + thresholds.speeding_margin_kmh {
        alerts.push((
            AlertKind::Speed,
            format!("Speeding! {:.0} km/h in a {:.0} km/h zone", drive.speed, drive.speed_limit),
        ));
    }

    if let Some(ratio) = s.fuel.ratio().filter(|r| *r < thresholds.low_fuel_ratio) {
        if s.switches.engine_enabled {
            alerts.push((AlertKind::Fuel, format!("Low fuel! {:.0}% remaining", ratio * 100.0)));
        }
    }

    if s.job.rest_stop > 0 {
        alerts.push((AlertKind::Rest, "Rest stop needed soon".to_string()));
    }

    alerts
}

/// Travel-log call collected under the session lock and sent after it is released.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Visit { city: String, country: String, x: f64, z: f64, signal: f64 },
    JobStart(JobStart),
    JobComplete { cargo_damage: f32 },
    Fine { amount: i64, city: String, country: String },
}

impl LogEvent {
    pub fn dispatch(&self, log: &dyn TravelLog) -> anyhow::Result<()> {
        match self {
            Self::Visit { city, country, x, z, signal } => log.record_visit(city, country, *x, *z, *signal),
            Self::JobStart(job) => log.record_job_start(job),
            Self::JobComplete { cargo_damage } => log.record_job_complete(*cargo_damage),
            Self::Fine { amount, city, country } => log.record_fine(*amount, city, country),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Visit { .. } => "visit",
            Self::JobStart(_) => "job_start",
            Self::JobComplete { .. } => "job_complete",
            Self::Fine { .. } => "fine",
        }
    }
}
