use std::sync::Arc;

use proptest::prelude::*;

use secretd_crypto::{Algorithm, Secret};
use secretd_service::{ItemProperties, SecretService, ServiceConfig};
use secretd_store::Attributes;

fn service() -> SecretService {
    SecretService::new(ServiceConfig::default()).unwrap()
}

fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn plain(value: &[u8]) -> Secret {
    Secret::new("plain", Vec::new(), value.to_vec())
}

#[test]
fn plain_session_lock_and_search_walkthrough() {
    let service = service();

    let session = service.open_session("plain", &[]).unwrap();
    assert_eq!(session.algorithm, Algorithm::Plain);

    let c1 = service.create_collection("work", false).unwrap();

    let everything = service.search_collections(&Attributes::new());
    assert!(everything.unlocked.is_empty());
    assert!(everything.locked.is_empty());

    let item = service
        .create_item(
            &session.handle,
            c1,
            ItemProperties {
                label: "alice at work".to_string(),
                attributes: attrs(&[("user", "alice")]),
                content_type: None,
            },
            &plain(b"pa55word"),
            false,
        )
        .unwrap();

    let found = service.search_collections(&attrs(&[("user", "alice")]));
    assert_eq!(found.unlocked, vec![item]);
    assert!(found.locked.is_empty());

    service.lock_service();

    let found = service.search_collections(&attrs(&[("user", "alice")]));
    assert!(found.unlocked.is_empty());
    assert_eq!(found.locked, vec![item]);
}

#[test]
fn lock_outlives_session_teardown() {
    let service = service();
    let session = service.open_session("plain", &[]).unwrap();
    let c = service.create_collection("work", false).unwrap();
    service
        .create_item(
            &session.handle,
            c,
            ItemProperties {
                label: "x".to_string(),
                attributes: attrs(&[("k", "v")]),
                content_type: None,
            },
            &plain(b"x"),
            false,
        )
        .unwrap();

    service.lock_service();
    service.close_session(&session.handle);
    service.close_session(&session.handle);

    assert!(service.list_collections()[0].locked);
    assert_eq!(service.search_collections(&Attributes::new()).locked.len(), 1);
}

#[test]
fn search_never_mixes_lock_states() {
    let service = Arc::new(service());
    let session = service.open_session("plain", &[]).unwrap();

    for c in 0..4 {
        let collection = service
            .create_collection(&format!("c{}", c), false)
            .unwrap();
        for i in 0..25 {
            service
                .create_item(
                    &session.handle,
                    collection,
                    ItemProperties {
                        label: format!("item {}", i),
                        attributes: attrs(&[("kind", "login")]),
                        content_type: None,
                    },
                    &plain(b"pw"),
                    false,
                )
                .unwrap();
        }
    }

    std::thread::scope(|scope| {
        let locker = Arc::clone(&service);
        scope.spawn(move || locker.lock_service());

        for _ in 0..4 {
            let searcher = Arc::clone(&service);
            scope.spawn(move || {
                for _ in 0..50 {
                    let result = searcher.search_collections(&attrs(&[("kind", "login")]));
                    assert_eq!(result.len(), 100);
                    // one snapshot per call: all before the lock or all after
                    assert!(result.unlocked.is_empty() || result.locked.is_empty());
                }
            });
        }
    });

    assert_eq!(service.search_collections(&Attributes::new()).locked.len(), 100);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn create_collection_appears_once(label in "[a-zA-Z][a-zA-Z0-9 ]{0,15}", private in any::<bool>()) {
        let service = service();
        let before = service.list_collections().len();

        let first = service.create_collection(&label, private).unwrap();
        let listed = service.list_collections();
        prop_assert_eq!(listed.len(), before + 1);
        let created: Vec<_> = listed.iter().filter(|c| c.id == first).collect();
        prop_assert_eq!(created.len(), 1);
        prop_assert_eq!(&created[0].label, &label);
        prop_assert_eq!(created[0].private, private);

        let second = service.create_collection(&label, private).unwrap();
        prop_assert_ne!(first, second);
    }

    #[test]
    fn lock_service_locks_every_item(layout in proptest::collection::vec(0usize..5, 0..5)) {
        let service = service();
        let session = service.open_session("plain", &[]).unwrap();

        let mut total = 0;
        for (c, count) in layout.iter().enumerate() {
            let collection = service.create_collection(&format!("c{}", c), c % 2 == 0).unwrap();
            for i in 0..*count {
                let index = i.to_string();
                service
                    .create_item(
                        &session.handle,
                        collection,
                        ItemProperties {
                            label: format!("item {}", i),
                            attributes: attrs(&[("index", index.as_str())]),
                            content_type: None,
                        },
                        &plain(b"pw"),
                        false,
                    )
                    .unwrap();
                total += 1;
            }
        }

        service.lock_service();
        let result = service.search_collections(&Attributes::new());
        prop_assert!(result.unlocked.is_empty());
        prop_assert_eq!(result.locked.len(), total);
    }
}
