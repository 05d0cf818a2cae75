use chrono::{TimeZone, Utc};

use crate::evaluation::{EvaluationResult, MetricStatus};

use super::{MemoryStatusStore, SledStatusStore, StatusStore};

fn sample_status(value: &str) -> MetricStatus {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    MetricStatus {
        value: value.to_string(),
        raw_value: value.as_bytes().to_vec(),
        last_updated: Some(at),
        err_msg: String::new(),
        interval_results: vec![EvaluationResult::success(value.to_string(), None, at)],
    }
}

#[tokio::test]
async fn sled_store_round_trips_status_json() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = SledStatusStore::open(temp.path()).expect("open store");

    assert!(store.read_status("api-latency").await.expect("read").is_none());
    store
        .write_status("api-latency", &sample_status("42"))
        .await
        .expect("write status");

    let status = store
        .read_status("api-latency")
        .await
        .expect("read status")
        .expect("status should exist");
    assert_eq!(status, sample_status("42"));
    assert!(store.read_status("other").await.expect("read").is_none());
}

#[tokio::test]
async fn sled_store_overwrites_and_removes() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = SledStatusStore::open(temp.path()).expect("open store");

    store.write_status("m", &sample_status("1")).await.expect("write");
    store.write_status("m", &sample_status("2")).await.expect("write");
    let status = store.read_status("m").await.expect("read").expect("present");
    assert_eq!(status.value, "2");

    store.remove_status("m").await.expect("remove");
    assert!(store.read_status("m").await.expect("read").is_none());
    assert!(store.remove_status("never-written").await.is_ok());
}

#[tokio::test]
async fn memory_store_counts_writes() {
    let store = MemoryStatusStore::new();
    store.write_status("a", &sample_status("1")).await.expect("write");
    store.write_status("a", &sample_status("2")).await.expect("write");
    store.write_status("b", &sample_status("3")).await.expect("write");

    assert_eq!(store.len().await, 2);
    assert_eq!(store.write_count().await, 3);
    assert_eq!(store.get("a").await.map(|status| status.value), Some("2".to_string()));

    store.remove_status("a").await.expect("remove");
    assert!(store.read_status("a").await.expect("read").is_none());
}
