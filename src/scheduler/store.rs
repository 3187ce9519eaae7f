use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::scheduler::job::{Job, JobSpec, JobStatus, LastReport};

/// A progress report from a worker.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub worker_id: String,
    pub label: String,
    pub progress: u32,
}

/// What recording a progress report did to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Progress recorded, status unchanged.
    Updated,
    /// The job moved from `assigned` to `done`; its grants must be released.
    Completed,
    /// The job was already `done`; nothing changed.
    AlreadyDone,
}

/// Every job ever submitted, keyed by id
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<Uuid, Job>,
    order: Vec<Uuid>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `queued` job with a generated id.
    pub fn create(&mut self, spec: JobSpec) -> &mut Job {
        let job = Job::new(spec);
        let id = job.id;
        self.order.push(id);
        self.jobs.entry(id).or_insert(job)
    }

    pub fn get(&self, id: &Uuid) -> Result<&Job> {
        self.jobs
            .get(id)
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Result<&mut Job> {
        self.jobs
            .get_mut(id)
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    /// Record a progress report.
    ///
    /// Only an `assigned` job reaching 100 transitions to `done`, and it does
    /// so once: later reports on a `done` job are ignored, so capacity can
    /// never be released twice. A `queued` job is not fully granted yet, so
    /// only the report itself is kept; its progress stays where it was.
    pub fn record_progress(
        &mut self,
        id: &Uuid,
        report: ProgressReport,
    ) -> Result<ProgressOutcome> {
        let job = self.get_mut(id)?;

        if job.status == JobStatus::Done {
            return Ok(ProgressOutcome::AlreadyDone);
        }

        let now = Utc::now();
        job.last_report = Some(LastReport {
            worker_id: report.worker_id,
            label: report.label,
            at: now,
        });
        if job.status == JobStatus::Queued {
            return Ok(ProgressOutcome::Updated);
        }

        job.progress = report.progress.min(100);
        if job.progress >= 100 && job.status == JobStatus::Assigned {
            job.status = JobStatus::Done;
            job.completed_at = Some(now);
            return Ok(ProgressOutcome::Completed);
        }

        Ok(ProgressOutcome::Updated)
    }

    /// All jobs in submission order
    pub fn all(&self) -> Vec<&Job> {
        self.order.iter().filter_map(|id| self.jobs.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
