mod common;

use stagebook_db::{ApprovalStatus, ArtistFilter, ArtistUpdate, ARTISTS_KEY};
use stagebook_store::{FileStore, KvStore};
use tempfile::TempDir;

#[tokio::test]
async fn artists_survive_a_new_repository() {
    let tmp = TempDir::new().unwrap();

    let created = {
        let repo = common::file_repository(tmp.path());
        repo.add(common::new_artist("Asha", "asha@example.com"))
            .await
            .unwrap()
    };

    let reopened = common::file_repository(tmp.path());
    let artists = reopened.list().await.unwrap();
    assert_eq!(artists, vec![created.clone()]);
    assert_eq!(reopened.get(&created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn review_round_trip_on_disk() {
    let tmp = TempDir::new().unwrap();
    let repo = common::file_repository(tmp.path());

    let created = repo
        .add(common::new_artist("Ravi", "ravi@example.com"))
        .await
        .unwrap();
    repo.update(
        &created.id,
        ArtistUpdate::review(
            ApprovalStatus::Rejected,
            Some("Audition video missing".to_string()),
            "curator@example.com",
        ),
    )
    .await
    .unwrap();

    let reopened = common::file_repository(tmp.path());
    let stored = reopened.get(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApprovalStatus::Rejected);
    assert_eq!(
        stored.rejection_reason.as_deref(),
        Some("Audition video missing")
    );
    assert_eq!(stored.created_at, created.created_at);

    let rejected = reopened
        .search(&ArtistFilter {
            status: Some(ApprovalStatus::Rejected),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
}

#[tokio::test]
async fn corrupted_file_is_reset() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("artists.json"), "[object Object]").unwrap();

    let repo = common::file_repository(tmp.path());
    assert!(repo.list().await.unwrap().is_empty());

    let store = FileStore::new(tmp.path());
    assert_eq!(
        store.get(ARTISTS_KEY).await.unwrap(),
        Some(serde_json::json!([]))
    );

    repo.add(common::new_artist("Meera", "meera@example.com"))
        .await
        .unwrap();
    assert_eq!(repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn hand_edited_file_is_sanitized() {
    let tmp = TempDir::new().unwrap();
    let raw = serde_json::json!([
        {
            "id": "legacy-1",
            "name": "Imported",
            "email": "imported@example.com",
            "languages": "Marathi, Konkani",
            "fee": "₹12,500",
            "createdAt": "2024-11-02T10:00:00Z"
        },
        { "name": "missing id" }
    ]);
    std::fs::write(tmp.path().join("artists.json"), raw.to_string()).unwrap();

    let repo = common::file_repository(tmp.path());
    let artists = repo.list().await.unwrap();
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].languages, vec!["Marathi", "Konkani"]);
    assert_eq!(artists[0].fee, 12500);
    assert_eq!(artists[0].category, "Other");

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(tmp.path().join("artists.json")).unwrap()).unwrap();
    assert_eq!(on_disk.as_array().unwrap().len(), 1);
    assert_eq!(on_disk[0]["fee"], 12500);
}
