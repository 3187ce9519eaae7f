use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A worker's self-reported capacity and what is still free of it.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    pub id: String,
    pub categories: BTreeSet<String>,
    /// Declared ceiling per category.
    pub capacity: BTreeMap<String, u32>,
    /// Portion of `capacity` not granted to any job.
    pub idle: BTreeMap<String, u32>,
    pub address: String,
    pub registered_at: DateTime<Utc>,
    #[serde(skip)]
    seq: u64,
}

impl Worker {
    pub fn serves(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn capacity_for(&self, category: &str) -> u32 {
        self.capacity.get(category).copied().unwrap_or(0)
    }

    pub fn idle_for(&self, category: &str) -> u32 {
        self.idle.get(category).copied().unwrap_or(0)
    }

    /// First-registration order, used as the stable tie-break.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Registered workers keyed by id
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Worker>,
    next_seq: u64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a worker. Idle capacity is reset to the declared
    /// capacity even if grants to earlier jobs are still outstanding.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        categories: impl IntoIterator<Item = String>,
        capacity: BTreeMap<String, u32>,
        address: impl Into<String>,
    ) -> &Worker {
        let id = id.into();
        let seq = match self.workers.get(&id) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };

        let worker = Worker {
            id: id.clone(),
            categories: categories.into_iter().collect(),
            idle: capacity.clone(),
            capacity,
            address: address.into(),
            registered_at: Utc::now(),
            seq,
        };

        tracing::info!(
            worker_id = %worker.id,
            address = %worker.address,
            categories = ?worker.categories,
            capacity = ?worker.capacity,
            "Worker registered"
        );

        self.workers.insert(id.clone(), worker);
        &self.workers[&id]
    }

    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Workers serving `category`, in registration order.
    pub fn list_by_category(&self, category: &str) -> Vec<&Worker> {
        let mut workers: Vec<&Worker> = self
            .workers
            .values()
            .filter(|w| w.serves(category))
            .collect();
        workers.sort_by_key(|w| w.seq);
        workers
    }

    /// All workers in registration order.
    pub fn all(&self) -> Vec<&Worker> {
        let mut workers: Vec<&Worker> = self.workers.values().collect();
        workers.sort_by_key(|w| w.seq);
        workers
    }

    /// Take `amount` out of a worker's idle capacity.
    ///
    /// Returns false without touching anything if the worker is unknown or
    /// has less than `amount` idle.
    pub fn grant(&mut self, worker_id: &str, category: &str, amount: u32) -> bool {
        let Some(worker) = self.workers.get_mut(worker_id) else {
            return false;
        };
        let idle = worker.idle_for(category);
        if amount > idle {
            return false;
        }
        worker.idle.insert(category.to_string(), idle - amount);
        true
    }

    /// Return `amount` to a worker's idle capacity, capped at its current
    /// declared capacity (the worker may have re-registered with less).
    pub fn release(&mut self, worker_id: &str, category: &str, amount: u32) {
        let Some(worker) = self.workers.get_mut(worker_id) else {
            tracing::warn!(worker_id, category, amount, "Release for unknown worker ignored");
            return;
        };
        let ceiling = worker.capacity_for(category);
        let idle = worker.idle_for(category).saturating_add(amount).min(ceiling);
        worker.idle.insert(category.to_string(), idle);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn cats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn register_sets_idle_to_capacity() {
        let mut registry = WorkerRegistry::new();
        registry.register("w1", cats(&["L4", "L7"]), caps(&[("L4", 10), ("L7", 100)]), "10.0.0.1");

        let w = registry.get("w1").unwrap();
        assert_eq!(w.idle_for("L7"), 100);
        assert_eq!(w.idle_for("L4"), 10);
        assert_eq!(w.idle_for("L3"), 0);
        assert!(w.serves("L4"));
    }

    #[test]
    fn list_by_category_filters_and_keeps_registration_order() {
        let mut registry = WorkerRegistry::new();
        registry.register("b", cats(&["L7"]), caps(&[("L7", 1)]), "");
        registry.register("a", cats(&["L4"]), caps(&[("L4", 1)]), "");
        registry.register("c", cats(&["L7"]), caps(&[("L7", 1)]), "");

        let ids: Vec<&str> = registry
            .list_by_category("L7")
            .iter()
            .map(|w| w.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(registry.list_by_category("L3").is_empty());
    }

    #[test]
    fn grant_refuses_more_than_idle() {
        let mut registry = WorkerRegistry::new();
        registry.register("w1", cats(&["L7"]), caps(&[("L7", 10)]), "");

        assert!(registry.grant("w1", "L7", 6));
        assert!(!registry.grant("w1", "L7", 5));
        assert_eq!(registry.get("w1").unwrap().idle_for("L7"), 4);
        assert!(!registry.grant("missing", "L7", 1));
    }

    #[test]
    fn release_is_capped_at_capacity() {
        let mut registry = WorkerRegistry::new();
        registry.register("w1", cats(&["L7"]), caps(&[("L7", 100)]), "");
        assert!(registry.grant("w1", "L7", 60));

        // Re-register with a smaller ceiling while 60 is still granted.
        registry.register("w1", cats(&["L7"]), caps(&[("L7", 30)]), "");
        assert_eq!(registry.get("w1").unwrap().idle_for("L7"), 30);

        registry.release("w1", "L7", 60);
        assert_eq!(registry.get("w1").unwrap().idle_for("L7"), 30);
    }

    #[test]
    fn reregistration_keeps_first_sequence() {
        let mut registry = WorkerRegistry::new();
        registry.register("w1", cats(&["L7"]), caps(&[("L7", 1)]), "");
        registry.register("w2", cats(&["L7"]), caps(&[("L7", 1)]), "");
        registry.register("w1", cats(&["L7"]), caps(&[("L7", 5)]), "10.0.0.9");

        assert_eq!(registry.len(), 2);
        let w1 = registry.get("w1").unwrap();
        assert_eq!(w1.seq(), 0);
        assert_eq!(w1.address, "10.0.0.9");
        assert_eq!(registry.all()[0].id, "w1");
    }

    #[test]
    fn release_unknown_worker_is_ignored() {
        let mut registry = WorkerRegistry::new();
        registry.release("ghost", "L7", 10);
        assert!(registry.is_empty());
    }
}
