//! Record store scenarios: creation, validation, and the archive/restore
//! lifecycle.

use crate::records::{BackendCsv, Collection, RecordDraft, RecordStore, StoreError};

fn draft(description: &str) -> RecordDraft {
    RecordDraft {
        description: description.to_string(),
        screenshot_ref: Some("img1.png".to_string()),
        original_link: "http://example.com/a".to_string(),
        additional_links: String::new(),
    }
}

#[test]
fn test_create_assigns_monotonic_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let first = store.create(Collection::News, draft("first")).unwrap();
    let second = store.create(Collection::News, draft("second")).unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert!(second.created_at >= first.created_at);
}

#[test]
fn test_create_validates_required_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let missing_description = RecordDraft {
        description: "   ".to_string(),
        ..draft("x")
    };
    assert!(matches!(
        store.create(Collection::News, missing_description),
        Err(StoreError::Validation("description"))
    ));

    let missing_screenshot = RecordDraft {
        screenshot_ref: None,
        ..draft("desc")
    };
    assert!(matches!(
        store.create(Collection::News, missing_screenshot),
        Err(StoreError::Validation("screenshot"))
    ));

    let missing_link = RecordDraft {
        original_link: String::new(),
        ..draft("desc")
    };
    assert!(matches!(
        store.create(Collection::News, missing_link),
        Err(StoreError::Validation("original_link"))
    ));

    // nothing slipped into the table
    assert!(store.list_active(Collection::News).unwrap().is_empty());
}

#[test]
fn test_collections_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let news = store.create(Collection::News, draft("a news item")).unwrap();
    let instruction = store
        .create(Collection::Instructions, draft("an instruction"))
        .unwrap();

    // separate id spaces
    assert_eq!(news.id, 1);
    assert_eq!(instruction.id, 1);

    assert!(store.archive(Collection::News, news.id).unwrap());
    assert_eq!(store.list_active(Collection::News).unwrap().len(), 0);
    assert_eq!(store.list_active(Collection::Instructions).unwrap().len(), 1);
}

#[test]
fn test_archive_and_restore_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let original = store
        .create(
            Collection::News,
            RecordDraft {
                description: "Flood warning".to_string(),
                screenshot_ref: Some("img1.png".to_string()),
                original_link: "http://a".to_string(),
                additional_links: "http://b, http://c".to_string(),
            },
        )
        .unwrap();

    assert!(store.archive(Collection::News, original.id).unwrap());

    let archived = store.list_archived(Collection::News).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].record.id, original.id);
    assert_eq!(archived[0].record.description, original.description);
    assert_eq!(archived[0].record.screenshot_ref, original.screenshot_ref);
    assert_eq!(archived[0].record.original_link, original.original_link);
    assert_eq!(archived[0].record.additional_links, original.additional_links);
    assert_eq!(archived[0].record.created_at, original.created_at);
    assert!(archived[0].deleted_at >= original.created_at);

    assert!(store.restore(Collection::News, original.id).unwrap());

    let active = store.list_active(Collection::News).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0], original);
    assert_eq!(active[0].description, original.description);
    assert_eq!(active[0].created_at, original.created_at);
    assert!(store.list_archived(Collection::News).unwrap().is_empty());
}

#[test]
fn test_record_is_never_in_both_tables() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let record = store.create(Collection::News, draft("only one place")).unwrap();

    let in_both = |store: &BackendCsv| {
        let active = store.list_active(Collection::News).unwrap();
        let archived = store.list_archived(Collection::News).unwrap();
        active.iter().any(|r| r.id == record.id)
            && archived.iter().any(|a| a.record.id == record.id)
    };

    assert!(!in_both(&store));
    store.archive(Collection::News, record.id).unwrap();
    assert!(!in_both(&store));
    store.restore(Collection::News, record.id).unwrap();
    assert!(!in_both(&store));
}

#[test]
fn test_archive_unknown_id_returns_false_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    store.create(Collection::News, draft("keeper")).unwrap();

    assert!(!store.archive(Collection::News, 7).unwrap());
    assert_eq!(store.list_active(Collection::News).unwrap().len(), 1);
    assert!(store.list_archived(Collection::News).unwrap().is_empty());

    assert!(!store.restore(Collection::News, 7).unwrap());
    assert_eq!(store.list_active(Collection::News).unwrap().len(), 1);
}

#[test]
fn test_archive_is_not_double_applied() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let record = store.create(Collection::News, draft("once")).unwrap();

    assert!(store.archive(Collection::News, record.id).unwrap());
    // already archived: not an active record any more
    assert!(!store.archive(Collection::News, record.id).unwrap());
}

#[test]
fn test_restored_id_is_never_reassigned() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    let first = store.create(Collection::News, draft("first")).unwrap();
    store.create(Collection::News, draft("second")).unwrap();

    store.archive(Collection::News, first.id).unwrap();

    // the archived id must not be handed out again
    let third = store.create(Collection::News, draft("third")).unwrap();
    assert_eq!(third.id, 3);

    store.restore(Collection::News, first.id).unwrap();
    let active = store.list_active(Collection::News).unwrap();
    let ids: Vec<u64> = active.iter().map(|r| r.id).collect();
    assert!(ids.contains(&first.id));
    assert_eq!(ids.iter().filter(|id| **id == first.id).count(), 1);
}

#[test]
fn test_state_survives_reload() {
    let dir = tempfile::tempdir().unwrap();

    let (first, second) = {
        let store = BackendCsv::load(dir.path()).unwrap();
        let first = store.create(Collection::News, draft("persisted")).unwrap();
        let second = store.create(Collection::News, draft("archived one")).unwrap();
        store.archive(Collection::News, second.id).unwrap();
        (first, second)
    };

    let store = BackendCsv::load(dir.path()).unwrap();

    let active = store.list_active(Collection::News).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, first.id);
    assert_eq!(active[0].description, "persisted");
    assert_eq!(active[0].created_at, first.created_at);

    let archived = store.list_archived(Collection::News).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].record.id, second.id);

    // high-water mark reloaded too
    let next = store.create(Collection::News, draft("next")).unwrap();
    assert_eq!(next.id, 3);
}

#[test]
fn test_list_active_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(dir.path()).unwrap();

    store.create(Collection::News, draft("older")).unwrap();
    store.create(Collection::News, draft("newer")).unwrap();

    let active = store.list_active(Collection::News).unwrap();
    assert_eq!(active[0].description, "newer");
    assert_eq!(active[1].description, "older");
}
