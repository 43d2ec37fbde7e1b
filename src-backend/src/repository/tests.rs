//! Repository Integration Tests
//!
//! Tests for SqliteDealRepository with in-memory SQLite database.

use crate::domain::{Deal, DealFilter, DealId, DealPatch, DomainError, Priority, Stage};
use crate::repository::{init_db, DealStore, Repository, SqliteDealRepository};
use std::path::Path;

async fn setup_test_db() -> SqliteDealRepository {
    // Use in-memory database for tests
    let db_state = init_db(Path::new(":memory:")).await.expect("Failed to init test DB");
    SqliteDealRepository::new(db_state.conn)
}

fn deal(id: &str, stage: &str, order_index: i64) -> Deal {
    Deal::new(id, format!("Deal {}", id), Stage::from(stage), order_index)
}

#[tokio::test]
async fn test_create_deal() {
    let repo = setup_test_db().await;

    let created = repo
        .create(&deal("d-1", "lead", 0).with_value(2500.0).with_priority(Priority::High))
        .await
        .expect("Failed to create");

    assert_eq!(created.id.as_str(), "d-1");
    assert!(created.created_at.is_some());

    let found = repo.find_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(found.value, 2500.0);
    assert_eq!(found.priority, Priority::High);
}

#[tokio::test]
async fn test_create_generates_id_when_empty() {
    let repo = setup_test_db().await;

    let created = repo.create(&deal("", "lead", 0)).await.unwrap();
    assert_eq!(created.id.as_str().len(), 32);
}

#[tokio::test]
async fn test_create_duplicate_is_conflict() {
    let repo = setup_test_db().await;

    repo.create(&deal("d-1", "lead", 0)).await.unwrap();
    let result = repo.create(&deal("d-1", "lead", 1)).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_list_is_ordered_and_filtered() {
    let repo = setup_test_db().await;

    repo.create(&deal("c", "lead", 2)).await.unwrap();
    repo.create(&deal("a", "lead", 0)).await.unwrap();
    repo.create(&deal("w", "won", 0)).await.unwrap();
    repo.create(&deal("b", "lead", 0)).await.unwrap();

    let all = repo.list(&DealFilter::all()).await.expect("List failed");
    let ids: Vec<_> = all.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "w", "c"]);

    let leads = repo.list(&DealFilter::stage(Stage::from("lead"))).await.unwrap();
    assert_eq!(leads.len(), 3);
    assert!(leads.iter().all(|d| d.stage.as_str() == "lead"));
}

#[tokio::test]
async fn test_list_by_contact() {
    let repo = setup_test_db().await;

    repo.create(&deal("a", "lead", 0).with_contact("Ana")).await.unwrap();
    repo.create(&deal("b", "lead", 1).with_contact("Bruno")).await.unwrap();

    let filter = DealFilter {
        contact_name: Some("Ana".to_string()),
        ..Default::default()
    };
    let found = repo.list(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "a");
}

#[tokio::test]
async fn test_update_partial_fields() {
    let repo = setup_test_db().await;

    repo.create(&deal("d-1", "lead", 0).with_value(10.0)).await.unwrap();
    repo.update(&DealId::from("d-1"), &DealPatch::position(Stage::from("won"), 4))
        .await
        .expect("Update failed");

    let found = repo.find_by_id(&DealId::from("d-1")).await.unwrap().unwrap();
    assert_eq!(found.stage.as_str(), "won");
    assert_eq!(found.order_index, 4);
    assert_eq!(found.value, 10.0);
}

#[tokio::test]
async fn test_update_missing_deal_is_not_found() {
    let repo = setup_test_db().await;

    let result = repo.update(&DealId::from("ghost"), &DealPatch::order(1)).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_empty_patch_is_rejected() {
    let repo = setup_test_db().await;

    repo.create(&deal("d-1", "lead", 0)).await.unwrap();
    let result = repo.update(&DealId::from("d-1"), &DealPatch::default()).await;
    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn test_update_bumps_updated_at() {
    let repo = setup_test_db().await;

    let created = repo.create(&deal("d-1", "lead", 0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    repo.update(&DealId::from("d-1"), &DealPatch::order(3)).await.unwrap();

    let found = repo.find_by_id(&DealId::from("d-1")).await.unwrap().unwrap();
    assert!(found.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_delete_deal() {
    let repo = setup_test_db().await;

    repo.create(&deal("d-1", "lead", 0)).await.unwrap();
    repo.delete(&DealId::from("d-1")).await.expect("Delete failed");

    let found = repo.find_by_id(&DealId::from("d-1")).await.expect("Find failed");
    assert!(found.is_none());
}

#[tokio::test]
async fn test_next_order_index() {
    let repo = setup_test_db().await;
    let lead = Stage::from("lead");

    assert_eq!(repo.next_order_index(&lead).await.unwrap(), 0);
    repo.create(&deal("a", "lead", 3)).await.unwrap();
    repo.create(&deal("b", "lead", -2)).await.unwrap();
    assert_eq!(repo.next_order_index(&lead).await.unwrap(), 4);
}

#[tokio::test]
async fn test_renumber_stage_keeps_order_and_removes_duplicates() {
    let repo = setup_test_db().await;
    let lead = Stage::from("lead");

    repo.create(&deal("a", "lead", -1)).await.unwrap();
    repo.create(&deal("b", "lead", 7)).await.unwrap();
    repo.create(&deal("c", "lead", 7)).await.unwrap();
    repo.create(&deal("w", "won", 9)).await.unwrap();

    let changed = repo.renumber_stage(&lead).await.unwrap();
    assert_eq!(changed, 3);

    let leads = repo.list(&DealFilter::stage(lead.clone())).await.unwrap();
    let order: Vec<_> = leads.iter().map(|d| (d.id.as_str(), d.order_index)).collect();
    assert_eq!(order, vec![("a", 0), ("b", 1), ("c", 2)]);

    // Other stages are untouched, a second pass is a no-op
    let won = repo.find_by_id(&DealId::from("w")).await.unwrap().unwrap();
    assert_eq!(won.order_index, 9);
    assert_eq!(repo.renumber_stage(&lead).await.unwrap(), 0);
}
