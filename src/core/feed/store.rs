use std::collections::{BTreeMap, HashSet};

use crate::core::model::LogRecord;

/// Deduplicated, ordered collection of log records. Both the historical and
/// the live path may observe the same record; the first write wins and a
/// later arrival of a known id is a no-op.
///
/// Records are kept in a map keyed `(time, id)` so the view is produced by
/// reverse iteration instead of a sort per read.
#[derive(Debug, Default)]
pub struct RecordStore {
    by_time: BTreeMap<(i64, i64), LogRecord>,
    ids: HashSet<i64>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every record whose id is not yet present. Known ids are left
    /// untouched.
    pub fn merge<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = LogRecord>,
    {
        for record in records {
            if self.ids.insert(record.id) {
                self.by_time.insert((record.time, record.id), record);
            }
        }
    }

    /// Snapshot sorted by time descending, ties broken by id descending.
    pub fn view(&self) -> Vec<LogRecord> {
        self.by_time.values().rev().cloned().collect()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_time.clear();
        self.ids.clear();
    }
}
