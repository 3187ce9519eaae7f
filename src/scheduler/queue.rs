use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// Jobs waiting for more capacity, in the order they were queued.
///
/// An id appears at most once.
#[derive(Debug, Default)]
pub struct PendingQueue {
    order: VecDeque<Uuid>,
    members: HashSet<Uuid>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job id. Returns false if it was already queued.
    pub fn enqueue(&mut self, id: Uuid) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Swap out the current contents and return them front to back.
    ///
    /// Ids enqueued while the caller works through the result land in the
    /// now-empty queue and wait for the next pass.
    pub fn take_all(&mut self) -> Vec<Uuid> {
        self.members.clear();
        std::mem::take(&mut self.order).into()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.members.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_ignores_duplicates() {
        let mut queue = PendingQueue::new();
        let id = Uuid::new_v4();

        assert!(queue.enqueue(id));
        assert!(!queue.enqueue(id));
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(&id));
    }

    #[test]
    fn take_all_is_fifo_and_empties_queue() {
        let mut queue = PendingQueue::new();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            queue.enqueue(*id);
        }

        let taken = queue.take_all();
        assert_eq!(taken, ids);
        assert!(queue.is_empty());

        // Taken ids may be queued again for the next pass.
        assert!(queue.enqueue(ids[0]));
        assert_eq!(queue.ids().copied().collect::<Vec<_>>(), vec![ids[0]]);
    }
}
