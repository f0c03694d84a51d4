use slate_core::clock::FixedClock;
use slate_core::notice::Warning;
use slate_core::persistence::{DEFAULT_STORAGE_KEY, Persistence};
use slate_core::storage::{FileStorage, MemoryStorage, SlotStorage};
use slate_core::store::TaskStore;
use slate_core::task::{MAX_TEXT_CHARS, Priority};
use slate_core::view::{SortMode, StatusFilter};
use tempfile::tempdir;

const START: i64 = 1_717_000_000_000;

fn memory_store(clock: &FixedClock) -> TaskStore<MemoryStorage, &FixedClock> {
    TaskStore::open(
        Persistence::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY),
        clock,
    )
}

fn projected_texts<S: SlotStorage>(store: &TaskStore<S, &FixedClock>) -> Vec<String> {
    store
        .projected_tasks()
        .iter()
        .map(|task| task.text.clone())
        .collect()
}

#[test]
fn new_task_shows_first_with_default_selection() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);

    for (text, priority) in [("one", "low"), ("two", "high"), ("three", "medium")] {
        assert!(store.add(text, priority));
        assert_eq!(store.projected_tasks()[0].text, text);
        clock.advance_millis(10);
    }
    assert_eq!(store.revision(), 3);
}

#[test]
fn rejected_input_leaves_collection_alone() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);
    store.add("keep", "medium");

    assert!(!store.add("", "high"));
    assert!(!store.add(" ", "low"));
    assert!(!store.add(&"y".repeat(MAX_TEXT_CHARS + 1), "high"));
    assert!(store.add(&"y".repeat(MAX_TEXT_CHARS), "high"));

    assert_eq!(store.tasks().len(), 2);
}

#[test]
fn toggle_twice_restores_state_and_delete_is_idempotent() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);
    store.add("flip me", "medium");
    let id = store.tasks()[0].id.clone();

    assert!(store.toggle(&id));
    assert!(store.get(&id).expect("task").completed);
    assert!(store.toggle(&id));
    assert!(!store.get(&id).expect("task").completed);

    assert!(!store.toggle("missing"));

    assert!(store.delete(&id));
    let after_first = store.persistence().storage().raw(DEFAULT_STORAGE_KEY).map(str::to_string);
    assert_eq!(after_first.as_deref(), Some("[]"));
    let revision = store.revision();
    assert!(!store.delete(&id));
    assert_eq!(store.revision(), revision);
    assert_eq!(
        store.persistence().storage().raw(DEFAULT_STORAGE_KEY).map(str::to_string),
        after_first
    );
    assert!(store.tasks().is_empty());
}

#[test]
fn file_backed_store_roundtrips_across_sessions() {
    let temp = tempdir().expect("tempdir");
    let clock = FixedClock::at_millis(START);

    let saved = {
        let storage = FileStorage::open(temp.path()).expect("open storage");
        let mut store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);
        store.add("Buy milk", "high");
        clock.advance_millis(5);
        store.add("Call Bob", "low");
        let id = store.tasks()[1].id.clone();
        store.toggle(&id);
        store.tasks().to_vec()
    };

    clock.advance_millis(60_000);
    let storage = FileStorage::open(temp.path()).expect("reopen storage");
    let store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);

    assert_eq!(store.tasks(), saved.as_slice());
    assert_eq!(store.tasks()[1].created_at, START);
    assert_eq!(store.tasks()[1].priority, Priority::High);
    assert!(store.tasks()[1].completed);
    assert_eq!(store.active_count(), 1);
}

#[test]
fn deleted_task_stays_gone_after_reopen() {
    let temp = tempdir().expect("tempdir");
    let clock = FixedClock::at_millis(START);

    let (gone, kept) = {
        let storage = FileStorage::open(temp.path()).expect("open storage");
        let mut store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);
        store.add("keep", "low");
        clock.advance_millis(1);
        store.add("drop", "high");
        let gone = store.tasks()[0].id.clone();
        let kept = store.tasks()[1].id.clone();

        assert!(store.delete(&gone));
        let stored = store
            .persistence()
            .storage()
            .get_item(DEFAULT_STORAGE_KEY)
            .expect("read slot")
            .expect("slot written");
        assert!(!stored.contains(&gone));
        assert!(stored.contains(&kept));
        (gone, kept)
    };

    let storage = FileStorage::open(temp.path()).expect("reopen storage");
    let store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);
    assert!(store.get(&gone).is_none());
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].id, kept);
}

#[test]
fn unusable_storage_key_is_reported_as_unavailable() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let clock = FixedClock::at_millis(START);
    let mut store = TaskStore::open(Persistence::open(storage, "my tasks"), &clock);

    assert!(!store.storage_available());
    assert_eq!(store.take_notices(), vec![Warning::StorageUnavailable]);
    assert!(store.add("still works", "medium"));
    assert!(store.take_notices().is_empty());
}

#[test]
fn corrupted_payload_loads_empty_and_clears_key() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open storage");
    storage
        .set_item(DEFAULT_STORAGE_KEY, "this is not json")
        .expect("seed corrupt payload");

    let clock = FixedClock::at_millis(START);
    let mut store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);

    assert!(store.tasks().is_empty());
    assert_eq!(store.take_notices(), vec![Warning::StorageCorrupted]);
    assert_eq!(
        store
            .persistence()
            .storage()
            .get_item(DEFAULT_STORAGE_KEY)
            .expect("read slot"),
        None
    );
    assert!(store.storage_available());
}

#[test]
fn unavailable_storage_still_works_in_memory() {
    let mut storage = MemoryStorage::new();
    storage.set_read_only(true);
    let clock = FixedClock::at_millis(START);
    let mut store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);

    assert!(!store.storage_available());
    assert_eq!(store.take_notices(), vec![Warning::StorageUnavailable]);

    assert!(store.add("offline", "high"));
    assert_eq!(store.tasks().len(), 1);
    assert!(store.take_notices().is_empty());
    assert!(store.persistence().storage().is_empty());
}

#[test]
fn quota_exceeded_reports_save_failure() {
    let clock = FixedClock::at_millis(START);
    let storage = MemoryStorage::with_quota(150);
    let mut store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);

    assert!(store.add("short", "low"));
    assert!(store.take_notices().is_empty());

    assert!(store.add(&"z".repeat(150), "low"));
    assert_eq!(store.take_notices(), vec![Warning::SaveFailed]);
    assert_eq!(store.tasks().len(), 2);
    let stored = store
        .persistence()
        .storage()
        .raw(DEFAULT_STORAGE_KEY)
        .expect("first save landed");
    assert!(!stored.contains("zzz"));
}

#[test]
fn priority_sort_orders_ranks_then_recency() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);
    for (text, priority) in [
        ("old low", "low"),
        ("old high", "high"),
        ("medium", "medium"),
        ("new low", "low"),
        ("new high", "high"),
    ] {
        store.add(text, priority);
        clock.advance_millis(1);
    }

    assert!(store.set_sort(SortMode::Priority));
    assert_eq!(
        projected_texts(&store),
        vec!["new high", "old high", "medium", "new low", "old low"]
    );
    assert_eq!(store.tasks()[0].text, "new high");
    assert_eq!(store.tasks()[4].text, "old low");
}

#[test]
fn scenario_priority_sort_of_two_tasks() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);

    store.add("Buy milk", "high");
    clock.advance_millis(1);
    store.add("Call Bob", "low");
    store.set_sort(SortMode::Priority);

    assert_eq!(projected_texts(&store), vec!["Buy milk", "Call Bob"]);
}

#[test]
fn scenario_completion_filters() {
    let clock = FixedClock::at_millis(START);
    let mut store = memory_store(&clock);

    store.add("A", "medium");
    let id = store.tasks()[0].id.clone();
    store.toggle(&id);

    assert!(store.set_filter(StatusFilter::Active));
    assert!(projected_texts(&store).is_empty());

    assert!(store.set_filter(StatusFilter::Completed));
    assert_eq!(projected_texts(&store), vec!["A"]);
}

#[test]
fn loaded_records_are_sanitized() {
    let raw = r#"[
        {"id": "1", "text": "  ok  ", "completed": 1, "createdAt": 10, "priority": "HIGH"},
        {"id": "2", "text": ""},
        42,
        {"text": "no id", "createdAt": "soon"}
    ]"#;
    let storage = MemoryStorage::new().with_item(DEFAULT_STORAGE_KEY, raw);
    let clock = FixedClock::at_millis(START);
    let store = TaskStore::open(Persistence::open(storage, DEFAULT_STORAGE_KEY), &clock);

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].text, "ok");
    assert!(tasks[0].completed);
    assert_eq!(tasks[0].priority, Priority::Medium);
    assert_eq!(tasks[1].created_at, START);
    assert!(tasks[1].id.starts_with(&START.to_string()));
}
