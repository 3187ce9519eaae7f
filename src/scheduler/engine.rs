use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::scheduler::allocator::{candidates, plan_allocation};
use crate::scheduler::job::{Job, JobSpec, JobStatus};
use crate::scheduler::queue::PendingQueue;
use crate::scheduler::registry::WorkerRegistry;
use crate::scheduler::store::{JobStore, ProgressOutcome, ProgressReport};

/// Scheduler shared between request handlers. Every mutating call holds the
/// write lock for its whole read-modify-write sequence.
pub type SharedScheduler = Arc<RwLock<Scheduler>>;

/// A worker's self-report.
#[derive(Debug, Clone)]
pub struct WorkerRegistration {
    pub worker_id: String,
    pub categories: Vec<String>,
    pub capacity: BTreeMap<String, u32>,
    pub address: String,
}

/// Owns worker capacity, jobs and the pending queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    workers: WorkerRegistry,
    jobs: JobStore,
    pending: PendingQueue,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedScheduler {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Register or re-register a worker.
    ///
    /// Queued jobs are not retried here; only a job completion triggers a
    /// re-dispatch pass.
    pub fn register_worker(&mut self, registration: WorkerRegistration) {
        self.workers.register(
            registration.worker_id,
            registration.categories,
            registration.capacity,
            registration.address,
        );
    }

    /// Create a job and try to allocate it right away.
    pub fn submit_job(&mut self, spec: JobSpec) -> Result<Job> {
        let id = self.jobs.create(spec).id;
        {
            let job = self.jobs.get(&id)?;
            tracing::info!(
                job_id = %id,
                category = %job.spec.category,
                quantity = job.spec.quantity,
                targets = job.spec.targets.len(),
                method = %job.spec.method,
                "Job submitted"
            );
        }
        self.dispatch(id)?;
        Ok(self.jobs.get(&id)?.clone())
    }

    pub fn get_job(&self, id: &Uuid) -> Result<&Job> {
        self.jobs.get(id)
    }

    /// Record a worker's progress report. Completing an assigned job returns
    /// its capacity and retries every queued job.
    pub fn report_progress(&mut self, job_id: &Uuid, report: ProgressReport) -> Result<()> {
        let worker_id = report.worker_id.clone();
        match self.jobs.record_progress(job_id, report)? {
            ProgressOutcome::Completed => {
                tracing::info!(job_id = %job_id, worker_id = %worker_id, "Job done");
                self.release_and_redispatch(job_id)?;
            }
            ProgressOutcome::AlreadyDone => {
                tracing::debug!(
                    job_id = %job_id,
                    worker_id = %worker_id,
                    "Report for finished job ignored"
                );
            }
            ProgressOutcome::Updated => {}
        }
        Ok(())
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Try to satisfy the outstanding part of a job's request.
    ///
    /// Jobs that are not `queued` are left untouched. A job that stays short
    /// of its request is put on the pending queue (once).
    fn dispatch(&mut self, id: Uuid) -> Result<JobStatus> {
        let job = self.jobs.get(&id)?;
        if job.status != JobStatus::Queued {
            return Ok(job.status);
        }

        let category = job.spec.category.clone();
        let needed = job.outstanding();
        let plan = {
            let workers = self.workers.list_by_category(&category);
            plan_allocation(&candidates(&workers, &category), needed)
        };

        let job = self.jobs.get_mut(&id)?;
        for (worker_id, amount) in &plan.grants {
            if self.workers.grant(worker_id, &category, *amount) {
                job.add_grant(worker_id, *amount);
                tracing::debug!(
                    job_id = %id,
                    worker_id = %worker_id,
                    category = %category,
                    amount,
                    "Capacity granted"
                );
            } else {
                tracing::error!(
                    job_id = %id,
                    worker_id = %worker_id,
                    category = %category,
                    amount,
                    "Planned grant exceeds idle capacity, skipped"
                );
            }
        }

        if job.is_satisfied() {
            job.status = JobStatus::Assigned;
            tracing::info!(job_id = %id, grants = ?job.grants, "Job assigned");
        } else {
            job.status = JobStatus::Queued;
            self.pending.enqueue(id);
            tracing::info!(
                job_id = %id,
                granted = job.granted(),
                quantity = job.spec.quantity,
                "Insufficient capacity, job queued"
            );
        }

        Ok(job.status)
    }

    /// Hand a finished job's grants back to its workers, then retry every job
    /// that was queued when the pass started.
    fn release_and_redispatch(&mut self, id: &Uuid) -> Result<()> {
        let job = self.jobs.get(id)?;
        let category = job.spec.category.clone();
        let grants = job.grants.clone();

        for (worker_id, amount) in &grants {
            self.workers.release(worker_id, &category, *amount);
        }
        tracing::info!(job_id = %id, category = %category, grants = ?grants, "Capacity released");

        let queued = self.pending.take_all();
        if queued.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = queued.len(), "Re-dispatching queued jobs");

        for queued_id in queued {
            self.dispatch(queued_id)?;
        }
        Ok(())
    }
}
