//! Greedy largest-idle-first allocation.
//!
//! Planning is a pure function over a snapshot of candidate workers, so the
//! caller can compute and apply a plan inside one critical section.

use crate::scheduler::registry::Worker;

/// A worker's idle capacity in one category at the time of planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub worker_id: String,
    pub idle: u32,
}

impl Candidate {
    pub fn new(worker_id: impl Into<String>, idle: u32) -> Self {
        Self {
            worker_id: worker_id.into(),
            idle,
        }
    }
}

/// Grants to make for one dispatch attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    /// (worker id, amount) in the order they were picked.
    pub grants: Vec<(String, u32)>,
    pub total: u32,
}

impl AllocationPlan {
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Snapshot the idle capacity of `workers` for `category`.
///
/// `workers` is expected in registration order; it is preserved so that the
/// stable sort in [`plan_allocation`] breaks ties by it.
pub fn candidates(workers: &[&Worker], category: &str) -> Vec<Candidate> {
    workers
        .iter()
        .map(|w| Candidate::new(w.id.clone(), w.idle_for(category)))
        .collect()
}

/// Pick grants covering up to `needed`, largest idle capacity first.
///
/// Workers with nothing idle are skipped and the walk stops as soon as
/// `needed` is covered. The plan total is less than `needed` only when the
/// candidates together do not have enough.
pub fn plan_allocation(candidates: &[Candidate], needed: u32) -> AllocationPlan {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| b.idle.cmp(&a.idle));

    let mut plan = AllocationPlan::default();
    for candidate in ordered {
        if plan.total >= needed {
            break;
        }
        if candidate.idle == 0 {
            continue;
        }
        let take = candidate.idle.min(needed - plan.total);
        plan.grants.push((candidate.worker_id.clone(), take));
        plan.total += take;
    }
    plan
}
