use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{Profile, ScanResult};

/// Live projection of the last scan. Only shrinks, by id, in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    traitors: Vec<Profile>,
    total_followers: u32,
    total_following: u32,
    scan_time_ms: u64,
    completed_at: DateTime<Utc>,
    removed: u32,
}

/// Counters shown above the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub total_followers: u32,
    /// Following count minus the accounts unfollowed since the scan.
    pub total_following: u32,
    pub traitors: u32,
    pub scan_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl ResultSet {
    pub fn traitors(&self) -> &[Profile] {
        &self.traitors
    }

    pub fn len(&self) -> usize {
        self.traitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traitors.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.traitors.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.traitors.iter().find(|p| p.id == id)
    }

    /// Remove the entry with `id`. Returns `false` (and changes nothing) when
    /// it is already gone.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.traitors.iter().position(|p| p.id == id) {
            Some(index) => {
                self.traitors.remove(index);
                self.removed += 1;
                true
            }
            None => false,
        }
    }

    pub fn remaining_following(&self) -> u32 {
        self.total_following.saturating_sub(self.removed)
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            total_followers: self.total_followers,
            total_following: self.remaining_following(),
            traitors: self.traitors.len() as u32,
            scan_time_ms: self.scan_time_ms,
            completed_at: self.completed_at,
        }
    }
}

impl From<ScanResult> for ResultSet {
    fn from(result: ScanResult) -> Self {
        Self {
            traitors: result.traitors,
            total_followers: result.total_followers,
            total_following: result.total_following,
            scan_time_ms: result.scan_time_ms,
            completed_at: Utc::now(),
            removed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::profile;

    fn sample() -> ResultSet {
        ResultSet::from(ScanResult {
            traitors: vec![profile("1", "a"), profile("2", "b"), profile("3", "c")],
            total_followers: 10,
            total_following: 12,
            scan_time_ms: 4200,
        })
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut set = sample();
        assert!(set.remove("2"));
        let after_first = set.clone();
        assert!(!set.remove("2"));
        assert_eq!(set, after_first);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = sample();
        set.remove("1");
        let ids: Vec<_> = set.traitors().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_stats_track_removals() {
        let mut set = sample();
        set.remove("3");
        set.remove("missing");
        let stats = set.stats();
        assert_eq!(stats.total_following, 11);
        assert_eq!(stats.traitors, 2);
        assert_eq!(stats.total_followers, 10);
    }
}
