//! Bounded, time-indexed snapshot ring buffer.
//!
//! Snapshots are pushed in tick order, so the buffer is sorted by
//! timestamp; when full the oldest entry is evicted first.

use std::collections::VecDeque;

use crate::snapshot::Snapshot;

pub struct Vault {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl Vault {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, snapshot: Snapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    /// The snapshot whose timestamp is closest to `timestamp`.
    pub fn closest(&self, timestamp: f64) -> Option<&Snapshot> {
        self.snapshots.iter().min_by(|a, b| {
            let da = (a.timestamp - timestamp).abs();
            let db = (b.timestamp - timestamp).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Remove and return, in chronological order, every snapshot newer
    /// than `timestamp`.
    pub fn drain_newer(&mut self, timestamp: f64) -> Vec<Snapshot> {
        let split = self
            .snapshots
            .iter()
            .position(|s| s.timestamp > timestamp)
            .unwrap_or(self.snapshots.len());
        self.snapshots.split_off(split).into()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::bare_snapshot;

    #[test]
    fn evicts_oldest_first_when_full() {
        let mut vault = Vault::new(3);
        for frame in 0..4 {
            vault.add(bare_snapshot(frame, frame as f64 * 16.0));
        }
        assert_eq!(vault.len(), 3);
        assert_eq!(vault.oldest().unwrap().frame, 1);
        assert_eq!(vault.latest().unwrap().frame, 3);
    }

    #[test]
    fn closest_picks_the_nearest_timestamp() {
        let mut vault = Vault::new(10);
        for frame in 0..5 {
            vault.add(bare_snapshot(frame, frame as f64 * 100.0));
        }
        assert_eq!(vault.closest(149.0).unwrap().frame, 1);
        assert_eq!(vault.closest(151.0).unwrap().frame, 2);
        assert_eq!(vault.closest(-50.0).unwrap().frame, 0);
        assert_eq!(vault.closest(10_000.0).unwrap().frame, 4);
    }

    #[test]
    fn closest_on_empty_vault_is_none() {
        let vault = Vault::new(4);
        assert!(vault.closest(0.0).is_none());
    }

    #[test]
    fn drain_newer_removes_and_returns_in_order() {
        let mut vault = Vault::new(10);
        for frame in 0..5 {
            vault.add(bare_snapshot(frame, frame as f64 * 100.0));
        }

        let drained = vault.drain_newer(200.0);
        let frames: Vec<u64> = drained.iter().map(|s| s.frame).collect();
        assert_eq!(frames, vec![3, 4]);
        assert_eq!(vault.len(), 3);
        assert_eq!(vault.latest().unwrap().frame, 2);
    }

    #[test]
    fn drain_newer_with_future_timestamp_is_empty() {
        let mut vault = Vault::new(10);
        vault.add(bare_snapshot(0, 0.0));
        assert!(vault.drain_newer(50.0).is_empty());
        assert_eq!(vault.len(), 1);
    }
}
