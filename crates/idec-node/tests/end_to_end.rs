//! Nodes talking to each other through their HTTP surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use idec_core::{msgid_for, Submission};
use idec_node::config::{EchoareaConfig, UplinkConfig};
use idec_node::{router_remote, Node, NodeConfig};
use idec_store::{SqliteStore, Store, StoreExt, TxtStore};
use idec_sync::RemoteNode;

fn uplink_config(echoareas: &[&str], auth: Option<String>) -> NodeConfig {
    NodeConfig {
        uplink: Some(UplinkConfig {
            echoareas: echoareas.iter().map(|e| e.to_string()).collect(),
            auth,
            ..UplinkConfig::default()
        }),
        ..NodeConfig::default()
    }
}

fn memory_node(config: NodeConfig) -> Node {
    Node::with_store(config, Arc::new(SqliteStore::open_memory().unwrap()))
}

/// Makes every tossed message distinct even when two land in the same second.
static SERIAL: AtomicUsize = AtomicUsize::new(0);

async fn toss_over_http(node: &Node, authstr: &str, echoarea: &str, n: usize) {
    let remote = router_remote(node.router());
    for _ in 0..n {
        let i = SERIAL.fetch_add(1, Ordering::Relaxed);
        let tmsg = Submission::new(echoarea, "All", format!("subject {i}"), format!("body {i}"))
            .encode();
        let status = remote.post_point_message(authstr, &tmsg).await.unwrap();
        assert!(status.starts_with("msg ok:"), "unexpected status {status}");
    }
}

#[tokio::test]
async fn test_two_nodes_sync_over_router() {
    let upstream = memory_node(NodeConfig::default());
    let authstr = upstream.register_point("alice").await.unwrap().into_token();
    toss_over_http(&upstream, &authstr, "ii.test.14", 12).await;
    toss_over_http(&upstream, &authstr, "chat", 3).await;

    let dir = tempfile::tempdir().unwrap();
    let downstream = Node::with_store(
        uplink_config(&["ii.test.14", "chat"], None),
        Arc::new(TxtStore::open(dir.path()).unwrap()),
    );
    let client = downstream
        .sync_client(Arc::new(router_remote(upstream.router())))
        .unwrap();

    assert_eq!(client.catch_up_depth().await.unwrap(), 12);
    let report = client.sync_once().await.unwrap();
    assert_eq!(report.saved, 15);

    for echoarea in ["ii.test.14", "chat"] {
        let theirs = upstream.store().index_for(&[echoarea.into()]).await.unwrap();
        let ours = downstream.store().index_for(&[echoarea.into()]).await.unwrap();
        assert_eq!(theirs, ours);
        for id in &ours {
            let record = downstream.store().fetch(id).await.unwrap();
            assert_eq!(&msgid_for(&record), id);
        }
    }

    assert_eq!(client.sync_once().await.unwrap().saved, 0);
}

#[tokio::test]
async fn test_incremental_sync_and_send() {
    let upstream = memory_node(NodeConfig::default());
    let authstr = upstream.register_point("bob").await.unwrap().into_token();
    toss_over_http(&upstream, &authstr, "ii.test.14", 4).await;

    let downstream = memory_node(uplink_config(&["ii.test.14"], Some(authstr.clone())));
    let client = downstream
        .sync_client(Arc::new(router_remote(upstream.router())))
        .unwrap();
    assert_eq!(client.sync_once().await.unwrap().saved, 4);

    let status = client
        .send(&Submission::new("ii.test.14", "bob", "from downstream", "hello"))
        .await
        .unwrap();
    assert!(status.starts_with("msg ok:"));
    toss_over_http(&upstream, &authstr, "ii.test.14", 2).await;

    assert_eq!(client.catch_up_depth().await.unwrap(), 3);
    let report = client.sync_once().await.unwrap();
    assert_eq!(report.requested, 3);
    assert_eq!(downstream.store().count("ii.test.14").await.unwrap(), 7);
}

#[tokio::test]
async fn test_blacklisted_messages_do_not_propagate() {
    let sqlite = Arc::new(SqliteStore::open_memory().unwrap());
    let upstream = Node::with_store(NodeConfig::default(), sqlite.clone());
    let authstr = upstream.register_point("carol").await.unwrap().into_token();
    toss_over_http(&upstream, &authstr, "chat", 3).await;

    let ids = sqlite.index_for(&["chat".into()]).await.unwrap();
    assert!(sqlite.blacklist_message(&ids[0]).await.unwrap());

    let remote = router_remote(upstream.router());
    assert!(remote.blacklist().await.unwrap().contains(&ids[0]));
    assert_eq!(remote.message(&ids[0]).await.unwrap(), None);

    let downstream = memory_node(uplink_config(&["chat"], None));
    let client = downstream.sync_client(Arc::new(remote)).unwrap();
    let report = client.sync_once().await.unwrap();
    assert_eq!(report.saved, 2);
    assert!(!downstream.store().exists(&ids[0]).await.unwrap());
}

#[tokio::test]
async fn test_registration_gates_tossing() {
    let node = memory_node(NodeConfig::default());
    let remote = router_remote(node.router());
    let tmsg = Submission::new("chat", "All", "hi", "hello").encode();

    assert_eq!(
        remote.post_point_message("unknown", &tmsg).await.unwrap(),
        "error: no auth"
    );
    let authstr = node.register_point("dave").await.unwrap().into_token();
    assert!(node.register_point("dave").await.unwrap().into_token().is_empty());
    assert_eq!(
        remote.post_point_message(&authstr, "%%%").await.unwrap(),
        "error: wrong message"
    );
    assert!(remote
        .post_point_message(&authstr, &tmsg)
        .await
        .unwrap()
        .starts_with("msg ok:"));
    assert_eq!(node.store().count("chat").await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_txt_over_router() {
    let config = NodeConfig {
        echoareas: vec![
            EchoareaConfig {
                name: "ii.test.14".into(),
                description: "test area".into(),
            },
            EchoareaConfig {
                name: "chat".into(),
                description: String::new(),
            },
        ],
        ..NodeConfig::default()
    };
    let node = memory_node(config);
    let authstr = node.register_point("erin").await.unwrap().into_token();
    toss_over_http(&node, &authstr, "chat", 2).await;

    let list = router_remote(node.router()).echoarea_list().await.unwrap();
    let summary: Vec<(String, usize, String)> = list
        .into_iter()
        .map(|e| (e.name, e.count, e.description))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("ii.test.14".to_string(), 0, "test area".to_string()),
            ("chat".to_string(), 2, String::new()),
        ]
    );
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let node = Arc::new(memory_node(NodeConfig::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn({
        let node = node.clone();
        async move {
            node.serve_on(listener, async move {
                let _ = stopped.await;
            })
            .await
        }
    });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /x/c/chat HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("chat:0\n\n"));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_fetch_from_uplink_over_tcp() {
    let upstream = Arc::new(memory_node(NodeConfig::default()));
    let authstr = upstream.register_point("frank").await.unwrap().into_token();
    toss_over_http(&upstream, &authstr, "ii.test.14", 5).await;
    toss_over_http(&upstream, &authstr, "chat", 2).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn({
        let upstream = upstream.clone();
        async move {
            upstream
                .serve_on(listener, async move {
                    let _ = stopped.await;
                })
                .await
        }
    });

    let mut config = uplink_config(&["ii.test.14", "chat"], None);
    if let Some(uplink) = config.uplink.as_mut() {
        uplink.url = Some(format!("http://{addr}"));
    }
    let downstream = memory_node(config);

    let report = downstream.fetch().await.unwrap();
    assert_eq!(report.saved, 7);
    for echoarea in ["ii.test.14", "chat"] {
        let theirs = upstream.store().index_for(&[echoarea.into()]).await.unwrap();
        let ours = downstream.store().index_for(&[echoarea.into()]).await.unwrap();
        assert_eq!(theirs, ours);
    }
    assert_eq!(downstream.fetch().await.unwrap().saved, 0);

    let remote = downstream.uplink_remote().unwrap();
    let missing = msgid_for("not stored anywhere");
    assert_eq!(remote.message(&missing).await.unwrap(), None);

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
