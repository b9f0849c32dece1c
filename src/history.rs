//! Hosted-anchor history, persisted across sessions.
//!
//! A successful hosting task appends one record. Records are kept in a sled
//! tree under monotonically increasing big-endian sequence keys, so `load`
//! returns them in insertion order without a sort.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::CloudAnchorId;

/// One hosted anchor the user can later resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Display name, derived from the history size at hosting time.
    pub name: String,
    pub cloud_anchor_id: CloudAnchorId,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(name: impl Into<String>, cloud_anchor_id: CloudAnchorId) -> Self {
        HistoryRecord {
            name: name.into(),
            cloud_anchor_id,
            created_at: Utc::now(),
        }
    }
}

/// Sled-backed history store.
pub struct HistoryStore {
    db: sled::Db,
}

impl HistoryStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(HistoryStore { db })
    }

    /// All records in insertion order.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.db.iter() {
            let (key, value) = entry?;
            let seq = decode_seq(&key)?;
            let record: HistoryRecord =
                bincode::deserialize(&value).map_err(|e| StoreError::Corrupt {
                    seq,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of persisted records.
    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Append a record under the next sequence key.
    pub fn append(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let seq = self.next_seq()?;
        let value = bincode::serialize(record).map_err(|e| StoreError::Corrupt {
            seq,
            reason: e.to_string(),
        })?;
        self.db.insert(seq.to_be_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    /// Remove every record.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    fn next_seq(&self) -> Result<u64, StoreError> {
        match self.db.last()? {
            Some((key, _)) => Ok(decode_seq(&key)? + 1),
            None => Ok(0),
        }
    }
}

fn decode_seq(key: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StoreError::Corrupt {
        seq: 0,
        reason: format!("invalid sequence key of {} bytes", key.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (HistoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::open(dir.path().join("history")).unwrap();
        (store, dir)
    }

    #[test]
    fn empty_store_loads_nothing() {
        let (store, _dir) = open_store();
        assert_eq!(store.count(), 0);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_insertion_order() {
        let (store, _dir) = open_store();
        for i in 0..5 {
            let record = HistoryRecord::new(
                format!("CloudAnchor{}", i),
                CloudAnchorId(format!("ua-{}", i)),
            );
            store.append(&record).unwrap();
        }
        let records = store.load().unwrap();
        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.name, format!("CloudAnchor{}", i));
        }
    }

    #[test]
    fn clear_empties_the_store() {
        let (store, _dir) = open_store();
        store
            .append(&HistoryRecord::new("CloudAnchor0", CloudAnchorId::from("ua-0")))
            .unwrap();
        assert_eq!(store.count(), 1);
        store.clear().unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn sequence_continues_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history");
        {
            let store = HistoryStore::open(&path).unwrap();
            store
                .append(&HistoryRecord::new("CloudAnchor0", CloudAnchorId::from("ua-0")))
                .unwrap();
        }
        let store = HistoryStore::open(&path).unwrap();
        store
            .append(&HistoryRecord::new("CloudAnchor1", CloudAnchorId::from("ua-1")))
            .unwrap();
        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "CloudAnchor1");
    }
}
