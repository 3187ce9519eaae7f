use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Assigned,
    Done,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Assigned => write!(f, "assigned"),
            JobStatus::Done => write!(f, "done"),
        }
    }
}

/// What the submitter asked for. `targets`, `duration` and `method` are
/// carried through unchanged and have no effect on allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub method: String,
}

impl JobSpec {
    pub fn new(category: impl Into<String>, quantity: u32) -> Self {
        Self {
            category: category.into(),
            quantity,
            targets: Vec::new(),
            duration: 0,
            method: String::new(),
        }
    }
}

/// Latest progress report received for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastReport {
    pub worker_id: String,
    pub label: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub spec: JobSpec,
    /// Worker id -> quantity currently reserved for this job.
    pub grants: BTreeMap<String, u32>,
    pub status: JobStatus,
    pub progress: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_report: Option<LastReport>,
}

impl Job {
    pub fn new(spec: JobSpec) -> Self {
        Self::with_id(Uuid::new_v4(), spec, Utc::now())
    }

    pub fn with_id(id: Uuid, spec: JobSpec, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            spec,
            grants: BTreeMap::new(),
            status: JobStatus::Queued,
            progress: 0,
            created_at,
            completed_at: None,
            last_report: None,
        }
    }

    pub fn granted(&self) -> u32 {
        self.grants.values().sum()
    }

    /// Quantity still missing before the request is fully satisfied.
    pub fn outstanding(&self) -> u32 {
        self.spec.quantity.saturating_sub(self.granted())
    }

    pub fn is_satisfied(&self) -> bool {
        self.granted() == self.spec.quantity
    }

    /// Merge a grant into any prior grant from the same worker.
    pub fn add_grant(&mut self, worker_id: &str, amount: u32) {
        *self.grants.entry(worker_id.to_string()).or_insert(0) += amount;
    }
}
