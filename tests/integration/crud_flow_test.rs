// Integration tests for the create/read/update/delete contract of the
// generic repository, run against the in-memory backend.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use restnucleus::{AppError, Query};

#[tokio::test]
async fn test_add_assigns_id_to_unidentified_entity() {
    let (backend, mut repository) = memory_repository();
    let mut ada = Person::new("Ada", 36);

    let id = repository.add(&mut ada).await.unwrap();

    assert_eq!(ada.id, Some(id));
    assert_eq!(backend.row_count("Person").await, 1);
}

#[tokio::test]
async fn test_full_lifecycle_create_read_delete() {
    let (_backend, mut repository) = memory_repository();
    let mut ada = Person::new("Ada", 36);

    repository.add(&mut ada).await.unwrap();
    let id = ada.id.unwrap();
    assert_eq!(id, 1);

    let loaded: Person = repository.get_by_id(id).await.unwrap();
    assert_eq!(loaded, ada);

    repository.delete::<Person>(id).await.unwrap();

    let err = repository.get_by_id::<Person>(id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "No entity found with id: 1");
    assert!(!repository.exists::<Person>(Some(id)).await.unwrap());
}

#[tokio::test]
async fn test_add_with_preset_id_conflicts_and_writes_nothing() {
    let (backend, mut repository) = memory_repository();
    let mut preset = Person::new("Preset", 50);
    preset.id = Some(5);

    let err = repository.add(&mut preset).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(ref message) if message == "object contains id already!"));
    assert_eq!(backend.row_count("Person").await, 0);
    assert!(!repository.exists::<Person>(Some(5)).await.unwrap());
    assert_eq!(preset.id, Some(5));
}

#[tokio::test]
async fn test_missing_id_is_not_found_and_does_not_exist() {
    let (_backend, mut repository) = memory_repository();

    for id in [1, 42, i64::MAX] {
        let err = repository.get_by_id::<Person>(id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repository.find_by_id::<Person>(id).await.unwrap().is_none());
        assert!(!repository.exists::<Person>(Some(id)).await.unwrap());
    }
}

#[tokio::test]
async fn test_exists_without_id_is_false() {
    let (_backend, mut repository) = memory_repository();
    assert!(!repository.exists::<Person>(None).await.unwrap());
}

#[tokio::test]
async fn test_update_merges_fields_onto_persisted_instance() {
    let (_backend, mut repository) = memory_repository();
    let mut ada = Person::new("Ada", 36);
    repository.add(&mut ada).await.unwrap();

    let mut changes = ada.clone();
    changes.name = "Ada Lovelace".to_string();
    changes.age = 37;
    changes.active = false;

    let updated = repository.update(&changes).await.unwrap();
    assert_eq!(updated.id, ada.id);
    assert_eq!(updated.name, "Ada Lovelace");

    let reloaded: Person = repository.get_by_id(ada.id.unwrap()).await.unwrap();
    assert_eq!(reloaded, updated);
    assert_eq!(reloaded.age, 37);
    assert!(!reloaded.active);
}

#[tokio::test]
async fn test_update_keeps_persisted_id_when_merge_replaces_record() {
    let (backend, mut repository) = memory_repository();
    let mut draft = Snapshot::new("draft", 1);
    let id = repository.add(&mut draft).await.unwrap();

    let mut revised = draft.clone();
    revised.title = "final".to_string();
    revised.version = 2;

    let merged = repository.update(&revised).await.unwrap();
    assert_eq!(merged.id, Some(id));
    assert_eq!(merged.title, "final");

    let reloaded: Snapshot = repository.get_by_id(id).await.unwrap();
    assert_eq!(reloaded, merged);
    assert_eq!(backend.row_count("Snapshot").await, 1);
}

#[tokio::test]
async fn test_lookups_without_id_are_bad_request() {
    let (_backend, mut repository) = memory_repository();
    seed_people(&mut repository).await;

    let err = repository.get_by_id::<Person>(None).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "id == null");

    let err = repository.find_by_id::<Person>(None).await.unwrap_err();
    assert!(err.is_bad_request());

    let err = repository.delete::<Person>(None).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(repository.count::<Person>(None).await.unwrap(), 5);

    let ada: Person = repository.get_by_id(Some(1)).await.unwrap();
    assert_eq!(ada.name, "Ada");
}

#[tokio::test]
async fn test_update_without_id_is_bad_request() {
    let (_backend, mut repository) = memory_repository();
    let err = repository.update(&Person::new("Nobody", 1)).await.unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "id == null");
}

#[tokio::test]
async fn test_update_of_missing_row_is_not_found() {
    let (_backend, mut repository) = memory_repository();
    let mut ghost = Person::new("Ghost", 1);
    ghost.id = Some(99);

    let err = repository.update(&ghost).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!repository.exists::<Person>(Some(99)).await.unwrap());
}

#[tokio::test]
async fn test_delete_of_missing_row_is_not_found() {
    let (_backend, mut repository) = memory_repository();
    let err = repository.delete::<Person>(7).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_entity_kinds_are_isolated() {
    let (backend, mut repository) = memory_repository();
    let mut ada = Person::new("Ada", 36);
    let mut tag = Tag::new("pioneer");

    repository.add(&mut ada).await.unwrap();
    repository.add(&mut tag).await.unwrap();

    assert_eq!(ada.id, Some(1));
    assert_eq!(tag.id, Some(1));
    assert_eq!(backend.row_count("Person").await, 1);
    assert_eq!(backend.row_count("Tag").await, 1);
    assert_eq!(repository.count::<Tag>(None).await.unwrap(), 1);

    let loaded: Tag = repository.get_by_id(1).await.unwrap();
    assert_eq!(loaded.label, "pioneer");
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let (_backend, mut repository) = memory_repository();
    let mut first = Person::new("First", 1);
    repository.add(&mut first).await.unwrap();
    repository.delete::<Person>(first.id.unwrap()).await.unwrap();

    let mut second = Person::new("Second", 2);
    repository.add(&mut second).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(repository.count::<Person>(Some(&Query::all())).await.unwrap(), 1);
}
