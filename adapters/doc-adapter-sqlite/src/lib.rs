//! SQLite-backed shared document adapter
//!
//! Holds the one shared snapshot in a single-row table keyed by the fixed
//! document identifier, and fans a change notice out to subscribers on every
//! replace. Fetch failures and a missing document both surface as `None` —
//! callers cannot (and need not) tell them apart.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{sqlite, Row};
use tokio::sync::broadcast;

use stagedoc::{
	doc_adapter::{self, ChangeNotice, ChangeStream, SharedDoc},
	prelude::*,
};

/// Adapter configuration options
#[derive(Debug, Clone)]
pub struct AdapterConfig {
	/// Document identifier; one row per deployment
	pub doc_id: Box<str>,

	/// Broadcast channel capacity for change notices
	pub broadcast_capacity: usize,
}

impl Default for AdapterConfig {
	fn default() -> Self {
		Self { doc_id: doc_adapter::DOC_ID.into(), broadcast_capacity: 64 }
	}
}

async fn init_db(db: &sqlite::SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS shared_doc (
			doc_id text NOT NULL,
			version integer NOT NULL,
			data text,
			updated_at datetime DEFAULT (unixepoch()),
			PRIMARY KEY(doc_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await
}

#[derive(Debug)]
pub struct DocAdapterSqlite {
	db: sqlite::SqlitePool,
	config: AdapterConfig,
	change_tx: broadcast::Sender<ChangeNotice>,
}

impl DocAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>, config: AdapterConfig) -> SdResult<Self> {
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

		let (change_tx, _) = broadcast::channel(config.broadcast_capacity);
		Ok(Self { db, config, change_tx })
	}
}

#[async_trait]
impl doc_adapter::DocAdapter for DocAdapterSqlite {
	async fn fetch_snapshot(&self) -> Option<SharedDoc> {
		let row = sqlx::query("SELECT version, data FROM shared_doc WHERE doc_id = ?")
			.bind(self.config.doc_id.as_ref())
			.fetch_optional(&self.db)
			.await
			.inspect_err(|err| warn!("DB: {:#?}", err))
			.ok()??;

		let data: Option<String> = row.get("data");
		data.and_then(|raw| {
			serde_json::from_str(&raw)
				.inspect_err(|err| warn!("Discarding unreadable shared document: {}", err))
				.ok()
		})
	}

	async fn replace_snapshot(&self, doc: &SharedDoc) -> SdResult<()> {
		let data = serde_json::to_string(doc)?;

		sqlx::query(
			"INSERT INTO shared_doc (doc_id, version, data, updated_at)
			VALUES (?, ?, ?, unixepoch())
			ON CONFLICT(doc_id) DO UPDATE
			SET version = excluded.version, data = excluded.data, updated_at = excluded.updated_at",
		)
		.bind(self.config.doc_id.as_ref())
		.bind(i64::from(doc.version))
		.bind(data)
		.execute(&self.db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

		// No receivers is fine: nobody is listening yet.
		let _ = self.change_tx.send(ChangeNotice { doc_id: self.config.doc_id.clone() });
		Ok(())
	}

	async fn subscribe_changes(&self) -> SdResult<ChangeStream> {
		let mut rx = self.change_tx.subscribe();
		let doc_id = self.config.doc_id.clone();

		let stream = async_stream::stream! {
			loop {
				match rx.recv().await {
					Ok(notice) => {
						if notice.doc_id == doc_id {
							yield notice;
						}
					}
					Err(broadcast::error::RecvError::Lagged(n)) => {
						// A lost notice only costs one refresh; the next
						// one carries the same information.
						warn!("Change subscription lagged, missed {} notices", n);
						continue;
					}
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		};

		Ok(Box::pin(stream))
	}
}

// vim: ts=4
