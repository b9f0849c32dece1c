//! History store persistence across process lifetimes.

use anchorage::history::{HistoryRecord, HistoryStore};
use anchorage::types::CloudAnchorId;
use tempfile::TempDir;

#[test]
fn records_survive_reopen_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history");

    {
        let store = HistoryStore::open(&path).unwrap();
        for i in 0..20 {
            store
                .append(&HistoryRecord::new(
                    format!("CloudAnchor{}", i),
                    CloudAnchorId(format!("ua-{:03}", i)),
                ))
                .unwrap();
        }
    }

    let store = HistoryStore::open(&path).unwrap();
    let records = store.load().unwrap();
    assert_eq!(records.len(), 20);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.name, format!("CloudAnchor{}", i));
        assert_eq!(record.cloud_anchor_id.as_str(), format!("ua-{:03}", i));
    }
}

#[test]
fn clear_resets_sequential_naming_input() {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::open(dir.path().join("history")).unwrap();

    for i in 0..3 {
        store
            .append(&HistoryRecord::new(
                format!("CloudAnchor{}", i),
                CloudAnchorId(format!("ua-{}", i)),
            ))
            .unwrap();
    }
    assert_eq!(store.count(), 3);

    store.clear().unwrap();
    assert_eq!(store.count(), 0);

    // The next session derives its name from the now-empty collection.
    store
        .append(&HistoryRecord::new(
            format!("CloudAnchor{}", store.count()),
            CloudAnchorId::from("ua-after-clear"),
        ))
        .unwrap();
    let records = store.load().unwrap();
    assert_eq!(records[0].name, "CloudAnchor0");
}

#[test]
fn created_at_is_preserved_through_persistence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history");

    let original = HistoryRecord::new("CloudAnchor0", CloudAnchorId::from("ua-ts"));
    {
        let store = HistoryStore::open(&path).unwrap();
        store.append(&original).unwrap();
    }

    let store = HistoryStore::open(&path).unwrap();
    let loaded = &store.load().unwrap()[0];
    assert_eq!(loaded.created_at, original.created_at);
    assert_eq!(loaded, &original);
}
