//! Cache adapter persistence tests

use stagedoc::cache_adapter::CacheAdapter;
use stagedoc::types::{ImageRef, Place, SectionKind};
use stagedoc_cache_adapter_sqlite::CacheAdapterSqlite;
use tempfile::TempDir;

async fn create_test_adapter() -> (CacheAdapterSqlite, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = CacheAdapterSqlite::new(temp_dir.path().join("cache.db"))
		.await
		.expect("Failed to create adapter");
	(adapter, temp_dir)
}

fn sample_places() -> Vec<Place> {
	let mut place = Place::new("Hall A");
	place.sections.set_text(SectionKind::Wiring, "FOH snake on stage left");
	place.sections.images_mut(SectionKind::Wiring).push(ImageRef::embedded("rack.jpg", b"jpeg"));
	vec![place, Place::new("Hall B")]
}

#[tokio::test]
async fn empty_database_loads_empty_set() {
	let (adapter, _temp) = create_test_adapter().await;
	let places = adapter.load().await.expect("Should load");
	assert!(places.is_empty());
}

#[tokio::test]
async fn save_then_load_round_trips() {
	let (adapter, _temp) = create_test_adapter().await;
	let places = sample_places();

	adapter.save(&places).await.expect("Should save");
	let loaded = adapter.load().await.expect("Should load");
	assert_eq!(loaded, places);
}

#[tokio::test]
async fn save_overwrites_previous_set() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.save(&sample_places()).await.expect("Should save");
	adapter.save(&[]).await.expect("Should save empty");
	assert!(adapter.load().await.expect("Should load").is_empty());
}

#[tokio::test]
async fn survives_reopening_the_database() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("cache.db");
	let places = sample_places();

	let adapter = CacheAdapterSqlite::new(&path).await.expect("Failed to create adapter");
	adapter.save(&places).await.expect("Should save");
	drop(adapter);

	let reopened = CacheAdapterSqlite::new(&path).await.expect("Failed to reopen adapter");
	assert_eq!(reopened.load().await.expect("Should load"), places);
}

#[tokio::test]
async fn corrupt_slot_loads_empty() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("cache.db");

	let adapter = CacheAdapterSqlite::new(&path).await.expect("Failed to create adapter");
	adapter.save(&sample_places()).await.expect("Should save");

	// Scribble over the slot behind the adapter's back.
	let db = sqlx::sqlite::SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(sqlx::sqlite::SqliteConnectOptions::new().filename(&path))
		.await
		.expect("Should open raw pool");
	sqlx::query("UPDATE cache SET value = '{broken json'")
		.execute(&db)
		.await
		.expect("Should corrupt slot");

	let places = adapter.load().await.expect("Corrupt data should not error");
	assert!(places.is_empty());
}

#[tokio::test]
async fn slots_are_isolated() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("cache.db");

	let main = CacheAdapterSqlite::new(&path).await.expect("Failed to create adapter");
	let scratch = CacheAdapterSqlite::new(&path)
		.await
		.expect("Failed to create adapter")
		.with_slot("scratch");

	main.save(&sample_places()).await.expect("Should save");
	assert!(scratch.load().await.expect("Should load").is_empty());

	scratch.save(&[Place::new("Rehearsal room")]).await.expect("Should save");
	assert_eq!(main.load().await.expect("Should load").len(), 2);
	assert_eq!(scratch.load().await.expect("Should load").len(), 1);
}

// vim: ts=4
