//! Sync between nodes on different backends.

use std::sync::Arc;

use idec_core::{PointIdentity, Submission};
use idec_store::{SqliteStore, Store, StoreExt, TxtStore};
use idec_sync::{LoopbackRemote, SyncClient, SyncConfig, TossingService};

async fn post(store: Arc<dyn Store>, echoarea: &str, n: usize) {
    let tosser = TossingService::new(store);
    let point = PointIdentity::new("dave", "3");
    for i in 0..n {
        let sub = Submission::new(echoarea, "All", format!("topic {i}"), format!("line {i}"));
        tosser.toss_at(&point, &sub, 1_700_000_000 + i as i64).await.unwrap();
    }
}

#[tokio::test]
async fn test_txt_uplink_to_sqlite_downlink() {
    let dir = tempfile::tempdir().unwrap();
    let uplink: Arc<dyn Store> = Arc::new(TxtStore::open(dir.path()).unwrap());
    let downlink: Arc<dyn Store> = Arc::new(SqliteStore::open_memory().unwrap());
    post(uplink.clone(), "ii.test.14", 7).await;
    post(uplink.clone(), "chat", 2).await;

    let remote = Arc::new(LoopbackRemote::over_store(uplink.clone()));
    let mut client = SyncClient::new(downlink.clone(), remote).with_config(SyncConfig {
        bundle_batch_size: 3,
        ..SyncConfig::default()
    });
    client.add_echoareas(["ii.test.14", "chat"]).unwrap();

    let report = client.sync_once().await.unwrap();
    assert_eq!(report.depth, 7);
    assert_eq!(report.saved, 9);

    for echoarea in ["ii.test.14", "chat"] {
        let theirs = uplink.index_for(&[echoarea.to_string()]).await.unwrap();
        let ours = downlink.index_for(&[echoarea.to_string()]).await.unwrap();
        assert_eq!(theirs, ours);
        for id in &theirs {
            assert_eq!(
                uplink.fetch(id).await.unwrap(),
                downlink.fetch(id).await.unwrap()
            );
        }
    }
}

#[tokio::test]
async fn test_partial_catch_up() {
    let uplink: Arc<dyn Store> = Arc::new(SqliteStore::open_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let downlink: Arc<dyn Store> = Arc::new(TxtStore::open(dir.path()).unwrap());

    post(uplink.clone(), "ii.test.14", 5).await;
    let remote = Arc::new(LoopbackRemote::over_store(uplink.clone()));
    let mut client = SyncClient::new(downlink.clone(), remote);
    client.add_echoarea("ii.test.14").unwrap();
    assert_eq!(client.sync_once().await.unwrap().saved, 5);

    post(uplink.clone(), "ii.test.14", 8).await;
    assert_eq!(client.catch_up_depth().await.unwrap(), 3);

    let report = client.sync_once().await.unwrap();
    assert_eq!(report.requested, 3);
    assert_eq!(report.saved, 3);
    assert_eq!(downlink.count("ii.test.14").await.unwrap(), 8);
    assert_eq!(client.catch_up_depth().await.unwrap(), 0);
}
