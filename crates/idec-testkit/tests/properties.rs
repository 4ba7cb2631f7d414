//! Properties that hold for any admitted message, on every backend.

use proptest::prelude::*;

use idec_core::{msgid_for, BundleEntry, Message, Submission};
use idec_store::{InsertResult, Registration, Store, StoreExt};
use idec_testkit::generators::{admitted_from_params, SubmissionParams};
use idec_testkit::TestFixture;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn msgid_is_deterministic(params: SubmissionParams) {
        let first = admitted_from_params(&params);
        let second = admitted_from_params(&params);
        prop_assert_eq!(&first.record, &second.record);
        prop_assert_eq!(&first.msgid, &second.msgid);
        prop_assert_eq!(msgid_for(&first.record), first.msgid);
    }

    #[test]
    fn msgid_changes_with_any_byte(
        params in any::<SubmissionParams>(),
        position in any::<prop::sample::Index>(),
    ) {
        let admitted = admitted_from_params(&params);
        let mut bytes = admitted.record.clone().into_bytes();
        let i = position.index(bytes.len());
        // Flip to another ASCII byte so the record stays valid text.
        if !bytes[i].is_ascii() {
            return Ok(());
        }
        bytes[i] = if bytes[i] == b'a' { b'b' } else { b'a' };
        let changed = String::from_utf8(bytes).unwrap();
        prop_assert_ne!(msgid_for(&changed), admitted.msgid);
    }

    #[test]
    fn admitted_record_parses_back(params: SubmissionParams) {
        let admitted = admitted_from_params(&params);
        let message = Message::parse(&admitted.record).unwrap();
        prop_assert_eq!(&message.echoarea, &params.submission.echoarea);
        prop_assert_eq!(&message.distribution, &params.submission.echoarea);
        prop_assert_eq!(message.date, params.date);
        prop_assert_eq!(&message.from, &params.point.name);
        prop_assert_eq!(&message.subject, &params.submission.subject);
        prop_assert_eq!(&message.body, &params.submission.body);
        prop_assert_eq!(
            message.repto(),
            params.submission.repto.as_ref().map(|id| id.as_str())
        );
    }

    #[test]
    fn tmsg_survives_transport(params: SubmissionParams) {
        let decoded = Submission::decode(&params.submission.encode()).unwrap();
        prop_assert_eq!(decoded, params.submission);
    }

    #[test]
    fn put_is_idempotent_on_every_backend(params: SubmissionParams) {
        let admitted = admitted_from_params(&params);
        runtime().block_on(async {
            for fixture in TestFixture::all_backends().unwrap() {
                let store = &fixture.store;
                let first = store
                    .put(&admitted.echoarea, &admitted.msgid, &admitted.record)
                    .await
                    .unwrap();
                let second = store
                    .put(&admitted.echoarea, &admitted.msgid, &admitted.record)
                    .await
                    .unwrap();
                assert_eq!(first, InsertResult::Inserted);
                assert_eq!(second, InsertResult::AlreadyExists);
                assert_eq!(store.count(&admitted.echoarea).await.unwrap(), 1);
                assert_eq!(
                    store.fetch(&admitted.msgid).await.unwrap(),
                    admitted.record,
                    "{}",
                    fixture.backend
                );

                let batch = [BundleEntry::from_record(admitted.msgid.clone(), &admitted.record)];
                assert_eq!(store.put_batch(&batch).await.unwrap(), 0);
            }
        });
    }
}

#[tokio::test]
async fn test_registration_on_every_backend() {
    for fixture in TestFixture::all_backends().unwrap() {
        let store = &fixture.store;
        let authstr = match store.register_point("alice").await.unwrap() {
            Registration::Created(authstr) => authstr,
            Registration::AlreadyExists => panic!("fresh store already knows alice"),
        };
        assert_eq!(authstr.len(), 8);
        assert!(store
            .register_point("alice")
            .await
            .unwrap()
            .into_token()
            .is_empty());

        let identity = store.authenticate(&authstr).await.unwrap().unwrap();
        assert_eq!(identity.name, "alice");
        assert!(!identity.address.is_empty());
        assert_eq!(store.authenticate("nope").await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_toss_end_to_end_on_every_backend() {
    for fixture in TestFixture::all_backends().unwrap() {
        let fixture = fixture.with_point(idec_core::PointIdentity::new("bob", "1"));
        let response = fixture
            .tosser()
            .toss(&fixture.point, &Submission::new("chat", "All", "hi", "hello"))
            .await
            .unwrap();
        let status = response.to_string();
        assert!(status.starts_with("msg ok:"));
        assert_eq!(status.len(), "msg ok:".len() + 20);

        let msgid = response.msgid().unwrap();
        let record = fixture.store.fetch(msgid).await.unwrap();
        let message = Message::parse(&record).unwrap();
        assert_eq!(message.echoarea, "chat");
        assert_eq!(record.lines().last(), Some("hello"));
    }
}
