//! Travel log collaborator.
//!
//! The controller reports visits, jobs and fines through [`TravelLog`]. Calls
//! are fire-and-forget: the controller logs a failed call and moves on.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::telemetry::unix_now;

/// Job descriptor captured when a job starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStart {
    pub cargo: String,
    pub source_city: String,
    pub source_company: String,
    pub destination_city: String,
    pub destination_company: String,
    pub distance_km: u32,
    pub income: u64,
}

/// Aggregated travel statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TravelStats {
    /// Planned distance of completed jobs, in km.
    pub total_distance: u64,
    pub cities_visited: usize,
    pub countries_visited: usize,
    pub jobs_completed: usize,
    pub total_income: u64,
    pub total_fines: i64,
}

/// Sink for travel events.
pub trait TravelLog: Send + Sync {
    fn record_visit(&self, city: &str, country: &str, x: f64, z: f64, signal: f64) -> anyhow::Result<()>;

    fn record_job_start(&self, job: &JobStart) -> anyhow::Result<()>;

    /// Complete the job started last. No-op when no job is open.
    fn record_job_complete(&self, cargo_damage: f32) -> anyhow::Result<()>;

    fn record_fine(&self, amount: i64, city: &str, country: &str) -> anyhow::Result<()>;

    fn start_session(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Close the open session with the given totals.
    fn end_session(&self, _stats: &TravelStats) -> anyhow::Result<()> {
        Ok(())
    }

    fn stats(&self) -> anyhow::Result<TravelStats>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub timestamp: f64,
    pub city: String,
    pub country: String,
    pub x: f64,
    pub z: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    #[serde(flatten)]
    pub job: JobStart,
    pub started_at: f64,
    pub completed_at: Option<f64>,
    pub cargo_damage: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineRecord {
    pub timestamp: f64,
    pub amount: i64,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub started_at: f64,
    pub ended_at: Option<f64>,
    pub stats: Option<TravelStats>,
}

#[derive(Debug, Default)]
struct LogBook {
    visits: Vec<Visit>,
    jobs: Vec<JobRecord>,
    fines: Vec<FineRecord>,
    sessions: Vec<SessionRecord>,
    open_job: Option<usize>,
    open_session: Option<usize>,
}

/// Process-lifetime travel log kept in memory.
#[derive(Debug, Default)]
pub struct MemoryTravelLog {
    book: Mutex<LogBook>,
}

impl MemoryTravelLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent visits first.
    pub fn recent_visits(&self, limit: usize) -> Vec<Visit> {
        self.book.lock().visits.iter().rev().take(limit).cloned().collect()
    }

    /// Completed jobs, most recent first.
    pub fn job_history(&self, limit: usize) -> Vec<JobRecord> {
        self.book
            .lock()
            .jobs
            .iter()
            .rev()
            .filter(|job| job.completed_at.is_some())
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn fines(&self) -> Vec<FineRecord> {
        self.book.lock().fines.clone()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.book.lock().sessions.clone()
    }
}

impl TravelLog for MemoryTravelLog {
    fn record_visit(&self, city: &str, country: &str, x: f64, z: f64, signal: f64) -> anyhow::Result<()> {
        self.book.lock().visits.push(Visit {
            timestamp: unix_now(),
            city: city.to_string(),
            country: country.to_string(),
            x,
            z,
            signal_strength: signal,
        });
        Ok(())
    }

    fn record_job_start(&self, job: &JobStart) -> anyhow::Result<()> {
        let mut book = self.book.lock();
        book.jobs.push(JobRecord {
            job: job.clone(),
            started_at: unix_now(),
            completed_at: None,
            cargo_damage: None,
        });
        book.open_job = Some(book.jobs.len() - 1);
        Ok(())
    }

    fn record_job_complete(&self, cargo_damage: f32) -> anyhow::Result<()> {
        let mut book = self.book.lock();
        let Some(idx) = book.open_job.take() else {
            debug!("Job completion without a recorded start");
            return Ok(());
        };
        if let Some(job) = book.jobs.get_mut(idx) {
            job.completed_at = Some(unix_now());
            job.cargo_damage = Some(cargo_damage);
        }
        Ok(())
    }

    fn record_fine(&self, amount: i64, city: &str, country: &str) -> anyhow::Result<()> {
        self.book.lock().fines.push(FineRecord {
            timestamp: unix_now(),
            amount,
            city: city.to_string(),
            country: country.to_string(),
        });
        Ok(())
    }

    fn start_session(&self) -> anyhow::Result<()> {
        let mut book = self.book.lock();
        book.sessions.push(SessionRecord { started_at: unix_now(), ended_at: None, stats: None });
        book.open_session = Some(book.sessions.len() - 1);
        Ok(())
    }

    fn end_session(&self, stats: &TravelStats) -> anyhow::Result<()> {
        let mut book = self.book.lock();
        let Some(idx) = book.open_session.take() else {
            return Ok(());
        };
        if let Some(session) = book.sessions.get_mut(idx) {
            session.ended_at = Some(unix_now());
            session.stats = Some(stats.clone());
        }
        Ok(())
    }

    fn stats(&self) -> anyhow::Result<TravelStats> {
        let book = self.book.lock();
        let cities: HashSet<&str> = book.visits.iter().map(|v| v.city.as_str()).collect();
        let countries: HashSet<&str> = book.visits.iter().map(|v| v.country.as_str()).collect();
        let completed = book.jobs.iter().filter(|job| job.completed_at.is_some());

        let mut stats = TravelStats {
            cities_visited: cities.len(),
            countries_visited: countries.len(),
            total_fines: book.fines.iter().map(|f| f.amount).sum(),
            ..TravelStats::default()
        };
        for job in completed {
            stats.jobs_completed += 1;
            stats.total_income += job.job.income;
            stats.total_distance += u64::from(job.job.distance_km);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steel_job() -> JobStart {
        JobStart {
            cargo: "Steel".into(),
            source_city: "Berlin".into(),
            source_company: "Stahlwerk".into(),
            destination_city: "Paris".into(),
            destination_company: "Acier".into(),
            distance_km: 1050,
            income: 12_000,
        }
    }

    #[test]
    fn stats_count_only_completed_jobs() {
        let log = MemoryTravelLog::new();
        log.record_job_start(&steel_job()).unwrap();
        assert_eq!(log.stats().unwrap().jobs_completed, 0);

        log.record_job_complete(0.02).unwrap();
        let stats = log.stats().unwrap();
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.total_income, 12_000);
        assert_eq!(stats.total_distance, 1050);

        let history = log.job_history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].cargo_damage, Some(0.02));
    }

    #[test]
    fn completion_without_start_is_ignored() {
        let log = MemoryTravelLog::new();
        log.record_job_complete(0.5).unwrap();
        assert!(log.job_history(10).is_empty());
    }

    #[test]
    fn visits_and_fines_aggregate() {
        let log = MemoryTravelLog::new();
        log.record_visit("Berlin", "germany", 0.0, 0.0, 0.9).unwrap();
        log.record_visit("Hamburg", "germany", 0.0, 0.0, 0.7).unwrap();
        log.record_visit("Berlin", "germany", 0.0, 0.0, 1.0).unwrap();
        log.record_fine(300, "Berlin", "germany").unwrap();
        log.record_fine(150, "Unknown", "Unknown").unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.cities_visited, 2);
        assert_eq!(stats.countries_visited, 1);
        assert_eq!(stats.total_fines, 450);

        let recent = log.recent_visits(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].signal_strength, 1.0);
    }

    #[test]
    fn sessions_open_and_close_once() {
        let log = MemoryTravelLog::new();
        log.start_session().unwrap();
        let stats = TravelStats { jobs_completed: 3, ..TravelStats::default() };
        log.end_session(&stats).unwrap();
        log.end_session(&TravelStats::default()).unwrap();

        let sessions = log.sessions();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].ended_at.is_some());
        assert_eq!(sessions[0].stats.as_ref().unwrap().jobs_completed, 3);
    }
}
