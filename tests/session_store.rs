use std::collections::HashMap;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use seatmap::entity::admin_session;
use seatmap::migration::{Migrator, MigratorTrait};
use seatmap::SeaOrmStore;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tower_sessions::{session::Id, session::Record, ExpiredDeletion, SessionStore};

async fn setup() -> (SeaOrmStore, DatabaseConnection) {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (SeaOrmStore::new(db.clone()), db)
}

fn record(expires_in: Duration) -> Record {
    Record {
        id: Id::default(),
        data: HashMap::from([("token".to_string(), json!("abc.def.ghi"))]),
        expiry_date: OffsetDateTime::now_utc() + expires_in,
    }
}

async fn stored_rows(db: &DatabaseConnection) -> u64 {
    admin_session::Entity::find().count(db).await.unwrap()
}

#[tokio::test]
async fn create_then_load() {
    let (store, _) = setup().await;
    let mut created = record(Duration::hours(1));
    store.create(&mut created).await.unwrap();

    let loaded = store.load(&created.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.data, created.data);
}

#[tokio::test]
async fn create_draws_new_id_on_collision() {
    let (store, db) = setup().await;
    let first = record(Duration::hours(1));
    store.save(&first).await.unwrap();

    let mut second = record(Duration::hours(1));
    second.id = first.id;
    store.create(&mut second).await.unwrap();

    assert_ne!(second.id, first.id);
    assert_eq!(stored_rows(&db).await, 2);
}

#[tokio::test]
async fn save_updates_existing_record() {
    let (store, db) = setup().await;
    let mut saved = record(Duration::hours(1));
    store.save(&saved).await.unwrap();

    saved
        .data
        .insert("token".to_string(), json!("rotated"));
    store.save(&saved).await.unwrap();

    let loaded = store.load(&saved.id).await.unwrap().unwrap();
    assert_eq!(loaded.data["token"], json!("rotated"));
    assert_eq!(stored_rows(&db).await, 1);
}

#[tokio::test]
async fn expired_records_do_not_load_and_get_purged() {
    let (store, db) = setup().await;
    let expired = record(Duration::hours(-1));
    let live = record(Duration::hours(1));
    store.save(&expired).await.unwrap();
    store.save(&live).await.unwrap();

    assert!(store.load(&expired.id).await.unwrap().is_none());

    store.delete_expired().await.unwrap();
    assert_eq!(stored_rows(&db).await, 1);
    assert!(store.load(&live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_removes_record() {
    let (store, db) = setup().await;
    let mut created = record(Duration::hours(1));
    store.create(&mut created).await.unwrap();

    store.delete(&created.id).await.unwrap();
    assert!(store.load(&created.id).await.unwrap().is_none());
    assert_eq!(stored_rows(&db).await, 0);

    store.delete(&created.id).await.unwrap();
}
