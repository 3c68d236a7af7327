// Beacon - a location tracker for messaging-bot reporters
// Copyright (C) 2017-2018  Datong Sun (dndx@idndx.com)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::*;
use std::sync::RwLock;

/// Per-reporter records ordered by `recorded_at`.
#[derive(Debug, Default)]
pub struct Index {
    reporters: HashMap<String, Vec<LocationRecord>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `record` could be inserted without breaking an invariant.
    pub fn check(&self, record: &LocationRecord) -> Result<(), StorageError> {
        if !record.position.is_valid() {
            return Err(StorageError::OutOfRange(record.position));
        }

        let taken = self.reporters
            .get(&record.reporter_id)
            .map_or(false, |v| {
                v.binary_search_by_key(&record.recorded_at, |r| r.recorded_at)
                    .is_ok()
            });

        if taken {
            return Err(StorageError::Duplicate {
                reporter_id: record.reporter_id.clone(),
                recorded_at: record.recorded_at,
            });
        }

        Ok(())
    }

    pub fn insert(&mut self, record: LocationRecord) -> Result<(), StorageError> {
        self.check(&record)?;

        let records = self.reporters
            .entry(record.reporter_id.clone())
            .or_insert_with(Vec::new);

        match records.binary_search_by_key(&record.recorded_at, |r| r.recorded_at) {
            Ok(_) => {
                return Err(StorageError::Duplicate {
                    reporter_id: record.reporter_id,
                    recorded_at: record.recorded_at,
                })
            }
            Err(pos) => records.insert(pos, record),
        }

        Ok(())
    }

    pub fn most_recent(&self, reporter_id: &str) -> Option<LocationRecord> {
        self.reporters
            .get(reporter_id)
            .and_then(|v| v.last())
            .cloned()
    }

    pub fn history_for(&self, reporter_id: &str) -> History {
        History::new(self.reporters.get(reporter_id).cloned().unwrap_or_default())
    }

    pub fn all_latest(&self) -> HashMap<String, LocationRecord> {
        self.reporters
            .iter()
            .filter_map(|(k, v)| v.last().map(|r| (k.clone(), r.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reporters.values().map(Vec::len).sum()
    }
}

/// Keeps everything in process memory, nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    index: RwLock<Index>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationStore for MemoryStore {
    fn append(&self, record: &LocationRecord) -> Result<(), StorageError> {
        let mut index = self.index.write().map_err(|_| StorageError::Poisoned)?;

        index.insert(record.clone())
    }

    fn most_recent(&self, reporter_id: &str) -> Result<Option<LocationRecord>, StorageError> {
        let index = self.index.read().map_err(|_| StorageError::Poisoned)?;

        Ok(index.most_recent(reporter_id))
    }

    fn history_for(&self, reporter_id: &str) -> Result<History, StorageError> {
        let index = self.index.read().map_err(|_| StorageError::Poisoned)?;

        Ok(index.history_for(reporter_id))
    }

    fn all_latest(&self) -> Result<HashMap<String, LocationRecord>, StorageError> {
        let index = self.index.read().map_err(|_| StorageError::Poisoned)?;

        Ok(index.all_latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, lat: f64, secs: i64) -> LocationRecord {
        let t0 = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        let report = PositionReport::new(id, "Ann", lat, 0_f64, t0);

        LocationRecord::new(&report, t0 + Duration::seconds(secs))
    }

    #[test]
    fn test_unknown_reporter() {
        let s = MemoryStore::new();

        assert_eq!(s.most_recent("nobody").unwrap(), None);
        assert!(s.history_for("nobody").unwrap().is_empty());
        assert!(s.all_latest().unwrap().is_empty());
    }

    #[test]
    fn test_most_recent_and_history() {
        let s = MemoryStore::new();

        s.append(&record("u1", 1_f64, 0)).unwrap();
        s.append(&record("u1", 2_f64, 10)).unwrap();
        s.append(&record("u2", 3_f64, 5)).unwrap();

        assert_eq!(s.most_recent("u1").unwrap(), Some(record("u1", 2_f64, 10)));

        let h = s.history_for("u1").unwrap();
        let lats: Vec<f64> = h.iter().map(|r| r.position.latitude).collect();
        assert_eq!(lats, vec![1_f64, 2_f64]);
        // walking it again yields the same sequence
        assert_eq!(h.iter().count(), 2);
        assert_eq!((&h).into_iter().count(), 2);

        let latest = s.all_latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["u1"], record("u1", 2_f64, 10));
        assert_eq!(latest["u2"], record("u2", 3_f64, 5));
    }

    #[test]
    fn test_out_of_order_insert_keeps_order() {
        let mut index = Index::new();

        index.insert(record("u1", 1_f64, 10)).unwrap();
        index.insert(record("u1", 2_f64, 0)).unwrap();
        index.insert(record("u1", 3_f64, 5)).unwrap();

        let lats: Vec<f64> = index
            .history_for("u1")
            .iter()
            .map(|r| r.position.latitude)
            .collect();
        assert_eq!(lats, vec![2_f64, 3_f64, 1_f64]);
        assert_eq!(index.most_recent("u1"), Some(record("u1", 1_f64, 10)));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_and_out_of_range() {
        let s = MemoryStore::new();

        s.append(&record("u1", 1_f64, 0)).unwrap();

        match s.append(&record("u1", 5_f64, 0)) {
            Err(StorageError::Duplicate { ref reporter_id, .. }) => assert_eq!(reporter_id, "u1"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            s.append(&record("u1", 91_f64, 1)),
            Err(StorageError::OutOfRange(_))
        ));
        assert_eq!(s.history_for("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_deep_in_history() {
        let mut index = Index::new();

        for i in 0..1000 {
            index.insert(record("u1", 1_f64, i * 2)).unwrap();
        }

        assert!(matches!(
            index.insert(record("u1", 2_f64, 500)),
            Err(StorageError::Duplicate { .. })
        ));
        index.insert(record("u1", 3_f64, 501)).unwrap();

        let h = index.history_for("u1");
        assert_eq!(h.len(), 1001);
        assert!(h.iter().zip(h.iter().skip(1)).all(|(a, b)| a.recorded_at < b.recorded_at));
    }
}
