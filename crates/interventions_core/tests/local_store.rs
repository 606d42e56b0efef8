use interventions_core::{Field, Intervention, InterventionDraft, LocalStore, PushEvent, Store};
use std::sync::mpsc;

fn record(id: &str, date: &str) -> Intervention {
    Intervention::from_draft(
        id,
        InterventionDraft::new()
            .with_field(Field::Date, date)
            .with_field(Field::Brand, "Komatsu")
            .with_field(Field::Model, "PC200")
            .with_field(Field::SerialNumber, "SN-0042")
            .with_field(Field::MeterReading, "1250")
            .with_field(Field::Fault, "oil leak")
            .with_field(Field::Resolution, "seal replaced")
            .with_field(Field::Comment, "line 1\nline 2; \"quoted\""),
    )
}

#[test]
fn create_then_list_keeps_every_field() {
    let store = LocalStore::open_in_memory().unwrap();
    let stored = store.create(&record("a", "2024-01-01")).unwrap();

    assert_eq!(stored, record("a", "2024-01-01"));
    assert_eq!(store.list().unwrap(), vec![record("a", "2024-01-01")]);
    assert_eq!(store.get("a").unwrap(), Some(record("a", "2024-01-01")));
    assert_eq!(store.get("missing").unwrap(), None);
}

#[test]
fn list_returns_insertion_order() {
    let store = LocalStore::open_in_memory().unwrap();
    store.create(&record("a", "2024-01-01")).unwrap();
    store.create(&record("b", "2024-05-01")).unwrap();
    store.create(&record("c", "2023-12-31")).unwrap();

    let ids = store
        .list()
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn create_with_existing_id_returns_stored_row() {
    let store = LocalStore::open_in_memory().unwrap();
    store.create(&record("a", "2024-01-01")).unwrap();

    let retry = store.create(&record("a", "2099-01-01")).unwrap();
    assert_eq!(retry.date, "2024-01-01");
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn create_without_id_assigns_one() {
    let store = LocalStore::open_in_memory().unwrap();
    let stored = store.create(&record("", "2024-01-01")).unwrap();

    assert!(!stored.id.is_empty());
    assert_eq!(store.get(&stored.id).unwrap(), Some(stored));
}

#[test]
fn delete_of_absent_row_succeeds() {
    let store = LocalStore::open_in_memory().unwrap();
    store.create(&record("a", "2024-01-01")).unwrap();

    store.delete("missing").unwrap();
    store.delete("a").unwrap();
    store.delete("a").unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interventions.sqlite3");

    {
        let store = LocalStore::open(&path).unwrap();
        store.create(&record("a", "2024-01-01")).unwrap();
        store.create(&record("b", "2024-02-01")).unwrap();
        store.delete("a").unwrap();
    }

    let reopened = LocalStore::open(&path).unwrap();
    assert_eq!(reopened.list().unwrap(), vec![record("b", "2024-02-01")]);
}

#[test]
fn committed_mutations_reach_subscribers_once() {
    let store = LocalStore::open_in_memory().unwrap();
    let (tx, rx) = mpsc::channel();
    let subscription = store.subscribe(tx).unwrap().unwrap();

    store.create(&record("a", "2024-01-01")).unwrap();
    store.create(&record("a", "2024-01-01")).unwrap();
    store.delete("a").unwrap();
    store.delete("a").unwrap();

    let events = rx.try_iter().collect::<Vec<_>>();
    assert_eq!(
        events,
        vec![
            PushEvent::Inserted(record("a", "2024-01-01")),
            PushEvent::Deleted("a".to_string()),
        ]
    );

    drop(subscription);
    assert_eq!(store.change_feed().subscriber_count(), 0);
}
