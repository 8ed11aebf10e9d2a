//! SQLite-backed local cache adapter
//!
//! Persists the full document set as one JSON value in a single named slot,
//! the durable equivalent of a browser storage key. Missing and corrupt
//! slots both load as an empty set — the cache never fails a reader over
//! recoverable state.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{sqlite, Row};

use stagedoc::{cache_adapter, prelude::*, types::Place};

const DEFAULT_SLOT: &str = "places_v1";

async fn init_db(db: &sqlite::SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS cache (
			slot text NOT NULL,
			value text,
			updated_at datetime DEFAULT (unixepoch()),
			PRIMARY KEY(slot)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await
}

#[derive(Debug)]
pub struct CacheAdapterSqlite {
	db: sqlite::SqlitePool,
	slot: Box<str>,
}

impl CacheAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> SdResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| warn!("DB: {:#?}", err))
			.or(Err(Error::DbError))?;

		init_db(&db).await.inspect_err(|err| warn!("DB: {:#?}", err)).or(Err(Error::DbError))?;

		Ok(Self { db, slot: DEFAULT_SLOT.into() })
	}

	/// Use a different slot name (isolated document sets on one database).
	pub fn with_slot(mut self, slot: &str) -> Self {
		self.slot = slot.into();
		self
	}
}

#[async_trait]
impl cache_adapter::CacheAdapter for CacheAdapterSqlite {
	async fn load(&self) -> SdResult<Vec<Place>> {
		let row = sqlx::query("SELECT value FROM cache WHERE slot = ?")
			.bind(self.slot.as_ref())
			.fetch_optional(&self.db)
			.await
			.inspect_err(|err| warn!("DB: {:#?}", err))
			.map_err(|_| Error::DbError)?;

		let Some(row) = row else { return Ok(Vec::new()) };
		let value: Option<String> = row.get("value");

		// Corrupt slots fail soft: the caller gets an empty set, not an error.
		Ok(value
			.and_then(|raw| {
				serde_json::from_str(&raw)
					.inspect_err(|err| warn!("Discarding corrupt cache slot: {}", err))
					.ok()
			})
			.unwrap_or_default())
	}

	async fn save(&self, places: &[Place]) -> SdResult<()> {
		let value = serde_json::to_string(places)?;

		sqlx::query(
			"INSERT INTO cache (slot, value, updated_at) VALUES (?, ?, unixepoch())
			ON CONFLICT(slot) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
		)
		.bind(self.slot.as_ref())
		.bind(value)
		.execute(&self.db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

		Ok(())
	}
}

// vim: ts=4
