//! Unit tests for `GroupRepo` persistence.

use std::sync::Arc;

use template_broadcast::models::contact::NewContact;
use template_broadcast::persistence::contact_repo::ContactRepo;
use template_broadcast::persistence::db;
use template_broadcast::persistence::group_repo::{GroupRepo, UNCATEGORIZED_GROUP_ID};
use template_broadcast::AppError;

#[tokio::test]
async fn uncategorized_group_is_seeded() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let groups = GroupRepo::new(database).list().await.expect("list");

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, UNCATEGORIZED_GROUP_ID);
    assert_eq!(groups[0].name, "Uncategorized");
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let database = db::connect_memory().await.expect("db");
    template_broadcast::persistence::schema::bootstrap_schema(&database)
        .await
        .expect("second bootstrap");
    let groups = GroupRepo::new(Arc::new(database)).list().await.expect("list");
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
async fn duplicate_name_is_conflict() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let repo = GroupRepo::new(database);

    repo.create("Clinic A").await.expect("create");
    let err = repo.create("Clinic A").await.expect_err("duplicate");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn blank_name_is_invalid() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let err = GroupRepo::new(database)
        .create("   ")
        .await
        .expect_err("blank");
    assert!(matches!(err, AppError::Invalid(_)));
}

#[tokio::test]
async fn counts_contacts_per_group() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let groups = GroupRepo::new(Arc::clone(&database));
    let contacts = ContactRepo::new(Arc::clone(&database));

    let group = groups.create("Clinic A").await.expect("create");
    contacts
        .insert_many(
            group.id,
            &[
                NewContact {
                    name: None,
                    phone: "2348011111111".into(),
                },
                NewContact {
                    name: None,
                    phone: "2348022222222".into(),
                },
            ],
        )
        .await
        .expect("insert");

    assert_eq!(groups.get_by_id(group.id).await.expect("get").contact_count, 2);
}

#[tokio::test]
async fn delete_removes_group_and_contacts() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let groups = GroupRepo::new(Arc::clone(&database));
    let contacts = ContactRepo::new(Arc::clone(&database));

    let group = groups.create("Clinic B").await.expect("create");
    contacts
        .insert_many(
            group.id,
            &[NewContact {
                name: Some("Ada".into()),
                phone: "2348011111111".into(),
            }],
        )
        .await
        .expect("insert");

    groups.delete(group.id).await.expect("delete");

    assert!(matches!(
        groups.get_by_id(group.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(contacts.list(Some(group.id)).await.expect("list").is_empty());
}

#[tokio::test]
async fn delete_unknown_group_is_not_found() {
    let database = Arc::new(db::connect_memory().await.expect("db"));
    let err = GroupRepo::new(database)
        .delete(999)
        .await
        .expect_err("unknown");
    assert!(matches!(err, AppError::NotFound(_)));
}
