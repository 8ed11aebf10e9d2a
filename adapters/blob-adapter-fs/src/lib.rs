//! Filesystem-backed blob storage adapter
//!
//! Stores image payloads under a base directory, addressed by the
//! hierarchical blob path (place / section kind / owning item / image id).
//! The locator handed back to the engine is the relative path; `resolve`
//! maps it under an optional public base URL for serving.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{
	fs::{create_dir_all, metadata, remove_file, rename, File},
	io::AsyncWriteExt,
};

use stagedoc::{blob_adapter, prelude::*, utils::random_id};

/// Rejects locators that would escape the base directory.
fn safe_relative(blob_id: &str) -> bool {
	!blob_id.starts_with('/') && blob_id.split('/').all(|seg| !seg.is_empty() && seg != "..")
}

#[derive(Debug)]
pub struct BlobAdapterFs {
	base_dir: Box<Path>,
	public_base: Option<Box<str>>,
}

impl BlobAdapterFs {
	pub async fn new(base_dir: Box<Path>) -> Result<Self, Error> {
		create_dir_all(&base_dir).await?;
		Ok(Self { base_dir, public_base: None })
	}

	/// Base URL under which the blob directory is served; `resolve` joins
	/// locators onto it.
	pub fn with_public_base(mut self, public_base: &str) -> Self {
		self.public_base = Some(public_base.trim_end_matches('/').into());
		self
	}

	async fn write_blob(&self, file_path: &PathBuf, data: &[u8]) -> SdResult<()> {
		let Some(dir) = file_path.parent() else { return Err(Error::Parse) };
		create_dir_all(dir).await?;

		// Write through a temp file and rename so a crashed upload never
		// leaves a half-written blob at a valid locator.
		let tmp_path = dir.join(format!("tmp-{}", random_id()?));
		let mut file = File::create(&tmp_path).await?;

		let res = async {
			file.write_all(data).await?;
			file.sync_all().await?;
			rename(&tmp_path, file_path).await?;
			Ok::<(), Error>(())
		}
		.await;

		if res.is_err() {
			debug!("Blob write failed, removing tmpfile: {:?}", &tmp_path);
			let _ = remove_file(&tmp_path).await;
		}
		res
	}
}

#[async_trait]
impl blob_adapter::BlobAdapter for BlobAdapterFs {
	async fn upload(
		&self,
		path: &blob_adapter::BlobPath,
		name: &str,
		data: &[u8],
	) -> Option<Box<str>> {
		let key = path.key();
		let file_path = self.base_dir.join(&key);
		info!("upload: {} ({}, {} bytes)", key, name, data.len());

		match self.write_blob(&file_path, data).await {
			Ok(()) => Some(key.into_boxed_str()),
			Err(err) => {
				warn!("Blob upload failed for {}: {}", key, err);
				None
			}
		}
	}

	async fn resolve(&self, blob_id: &str) -> Box<str> {
		if !safe_relative(blob_id) || metadata(self.base_dir.join(blob_id)).await.is_err() {
			// Unknown or unreachable blob: hand the locator back unchanged
			// so the caller can retry later.
			return blob_id.into();
		}

		match &self.public_base {
			Some(base) => format!("{}/{}", base, blob_id).into_boxed_str(),
			None => self.base_dir.join(blob_id).to_string_lossy().into_owned().into_boxed_str(),
		}
	}
}


// vim: ts=4
