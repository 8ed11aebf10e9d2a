//! Minimal stagedoc wiring: sqlite cache, filesystem blobs, sqlite shared
//! document. Prints the current document set; pass a name to create a place.
//!
//! Configuration via environment:
//! - `DATA_DIR`         storage directory (default `./data`)
//! - `STAGEDOC_SHARED`  `1` enables shared mode (remote sync + listener)
//! - `STAGEDOC_ADMIN`   `1` grants delete privileges

use std::{env, path::PathBuf, sync::Arc};

use stagedoc_blob_adapter_fs::BlobAdapterFs;
use stagedoc_cache_adapter_sqlite::CacheAdapterSqlite;
use stagedoc_doc_adapter_sqlite::{AdapterConfig, DocAdapterSqlite};
use stagedoc_store::{PlaceStore, StoreOpts};
use stagedoc_types::access::StaticGate;
use stagedoc_types::blob_adapter::BlobAdapter;
use stagedoc_types::doc_adapter::DocAdapter;

pub struct Config {
	pub data_dir: PathBuf,
	pub shared: bool,
	pub admin: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let config = Config {
		data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or("./data".to_string())),
		shared: env::var("STAGEDOC_SHARED").is_ok_and(|v| v == "1"),
		admin: env::var("STAGEDOC_ADMIN").is_ok_and(|v| v == "1"),
	};

	let cache: Arc<CacheAdapterSqlite> =
		Arc::new(CacheAdapterSqlite::new(config.data_dir.join("cache.db")).await.unwrap());

	let (blobs, docs): (Option<Arc<dyn BlobAdapter>>, Option<Arc<dyn DocAdapter>>) = if config
		.shared
	{
		let blobs = BlobAdapterFs::new(config.data_dir.join("blobs").into_boxed_path())
			.await
			.unwrap();
		let docs = DocAdapterSqlite::new(config.data_dir.join("shared.db"), AdapterConfig::default())
			.await
			.unwrap();
		(Some(Arc::new(blobs)), Some(Arc::new(docs)))
	} else {
		(None, None)
	};

	let store = PlaceStore::open(StoreOpts {
		cache,
		blobs,
		docs,
		gate: Arc::new(StaticGate(config.admin)),
	})
	.await
	.unwrap();

	if config.shared {
		store.refresh().await;
		store.start_listener().unwrap();
	}

	if let Some(name) = env::args().nth(1) {
		store.create_place(&name).await.unwrap();
	}

	let places = store.places().await;
	println!("{}", serde_json::to_string_pretty(&places).unwrap());

	// Let any enqueued remote sync finish before exiting.
	store.flush_sync().await;
}

// vim: ts=4
