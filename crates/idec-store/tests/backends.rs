//! Behaviour both backends must share.
//!
//! Every check runs once against SQLite and once against the flat-file store.

use std::sync::Arc;

use idec_core::{msgid_for, BundleEntry, MsgId};
use idec_store::{open, Backend, InsertResult, Registration, Store, StoreError, StoreExt};

fn record(echoarea: &str, n: usize) -> String {
    format!("ii/ok\n{echoarea}\n{}\n{echoarea}\nbob\n1\nAll\nmsg {n}\n\nbody {n}", 1_600_000_000 + n)
}

fn entry(record: &str) -> BundleEntry {
    BundleEntry::from_record(msgid_for(record), record)
}

fn stores() -> Vec<(tempfile::TempDir, Arc<dyn Store>)> {
    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite = open(Backend::Sqlite, sqlite_dir.path().join("idec.db")).unwrap();
    let txt_dir = tempfile::tempdir().unwrap();
    let txt = open(Backend::Txt, txt_dir.path()).unwrap();
    vec![(sqlite_dir, sqlite), (txt_dir, txt)]
}

#[tokio::test]
async fn test_put_get_exact_record() {
    for (_dir, store) in stores() {
        store.ensure_initialized().await.unwrap();
        let text = record("chat", 1);
        let id = msgid_for(&text);

        assert!(!store.exists(&id).await.unwrap());
        assert_eq!(store.get(&id).await.unwrap(), None);

        assert_eq!(
            store.put("chat", &id, &text).await.unwrap(),
            InsertResult::Inserted
        );
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.fetch(&id).await.unwrap(), text);
    }
}

#[tokio::test]
async fn test_fetch_missing_is_not_found() {
    for (_dir, store) in stores() {
        let id = MsgId::parse("AAAAAAAAAAAAAAAAAAAA").unwrap();
        assert!(matches!(
            store.fetch(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_duplicate_put_changes_nothing() {
    for (_dir, store) in stores() {
        let text = record("chat", 1);
        let id = msgid_for(&text);
        store.put("chat", &id, &text).await.unwrap();

        let before = store.index_for(&["chat".into()]).await.unwrap();
        assert_eq!(
            store.put("chat", &id, &text).await.unwrap(),
            InsertResult::AlreadyExists
        );
        let after = store.index_for(&["chat".into()]).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(store.count("chat").await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_msgid_is_write_once_across_echoareas() {
    for (_dir, store) in stores() {
        let text = record("chat", 1);
        let id = msgid_for(&text);
        store.put("chat", &id, &text).await.unwrap();

        let other = record("misc", 1).replace("body 1", "REPLACED");
        assert_eq!(
            store.put("misc", &id, &other).await.unwrap(),
            InsertResult::AlreadyExists
        );

        let moved = record("other", 1).replace("body 1", "VIA BATCH");
        let batch = [BundleEntry::from_record(id.clone(), &moved)];
        assert_eq!(store.put_batch(&batch).await.unwrap(), 0);

        assert_eq!(store.fetch(&id).await.unwrap(), text);
        let counts = store
            .count_for(&["chat".into(), "misc".into(), "other".into()])
            .await
            .unwrap();
        assert_eq!(counts["chat"], 1);
        assert_eq!(counts["misc"], 0);
        assert_eq!(counts["other"], 0);
    }
}

#[tokio::test]
async fn test_index_is_append_ordered_and_concatenated() {
    for (_dir, store) in stores() {
        let mut chat = Vec::new();
        for n in 0..5 {
            let text = record("chat", n);
            let id = msgid_for(&text);
            store.put("chat", &id, &text).await.unwrap();
            chat.push(id);
        }
        let misc_text = record("misc", 0);
        let misc = msgid_for(&misc_text);
        store.put("misc", &misc, &misc_text).await.unwrap();

        let index = store
            .index_for(&["chat".into(), "misc".into()])
            .await
            .unwrap();
        let mut expected = chat.clone();
        expected.push(misc);
        assert_eq!(index, expected);

        let counts = store
            .count_for(&["chat".into(), "misc".into(), "void".into()])
            .await
            .unwrap();
        assert_eq!(counts["chat"], 5);
        assert_eq!(counts["misc"], 1);
        assert_eq!(counts["void"], 0);
        assert_eq!(store.echoareas().await.unwrap(), vec!["chat", "misc"]);
    }
}

#[tokio::test]
async fn test_put_batch_uses_each_records_echoarea() {
    for (_dir, store) in stores() {
        let a = record("alpha", 1);
        let b = record("beta", 2);
        let saved = store.put_batch(&[entry(&a), entry(&b)]).await.unwrap();
        assert_eq!(saved, 2);

        assert_eq!(
            store.index_for(&["alpha".into()]).await.unwrap(),
            vec![msgid_for(&a)]
        );
        assert_eq!(
            store.index_for(&["beta".into()]).await.unwrap(),
            vec![msgid_for(&b)]
        );
    }
}

#[tokio::test]
async fn test_put_batch_is_idempotent() {
    for (_dir, store) in stores() {
        let batch: Vec<BundleEntry> = (0..7).map(|n| entry(&record("chat", n))).collect();
        assert_eq!(store.put_batch(&batch).await.unwrap(), 7);
        assert_eq!(store.put_batch(&batch).await.unwrap(), 0);
        assert_eq!(store.count("chat").await.unwrap(), 7);
    }
}

#[tokio::test]
async fn test_put_batch_skips_malformed_entries() {
    for (_dir, store) in stores() {
        let good = record("chat", 1);
        let bad = BundleEntry {
            msgid: MsgId::parse("BBBBBBBBBBBBBBBBBBBB").unwrap(),
            encoded: "***".to_string(),
        };
        let saved = store.put_batch(&[bad, entry(&good)]).await.unwrap();
        assert_eq!(saved, 1);
        assert!(store.exists(&msgid_for(&good)).await.unwrap());
    }
}

#[tokio::test]
async fn test_points() {
    for (_dir, store) in stores() {
        let token = match store.register_point("alice").await.unwrap() {
            Registration::Created(token) => token,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(token.len(), 8);
        assert!(store.find_point("alice").await.unwrap());

        let again = store.register_point("alice").await.unwrap();
        assert_eq!(again.into_token(), "");

        let point = store.authenticate(&token).await.unwrap().unwrap();
        assert_eq!(point.name, "alice");
        assert_eq!(point.address, "1");

        assert!(store.register_point("bad:name").await.is_err());
        assert_eq!(store.list_points().await.unwrap(), vec!["alice"]);
    }
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let text = record("chat", 1);
    let id = msgid_for(&text);

    let dir = tempfile::tempdir().unwrap();
    for (backend, path) in [
        (Backend::Sqlite, dir.path().join("idec.db")),
        (Backend::Txt, dir.path().join("base")),
    ] {
        {
            let store = open(backend, &path).unwrap();
            store.put("chat", &id, &text).await.unwrap();
            store.register_point("alice").await.unwrap();
        }
        let store = open(backend, &path).unwrap();
        assert_eq!(store.get(&id).await.unwrap().as_deref(), Some(text.as_str()));
        assert!(store.find_point("alice").await.unwrap());
    }
}
