//! Uploading the build output.
//!
//! Every file is uploaded on every run. HTML is never cached so a deploy takes
//! effect immediately; anything under an `assets` directory carries a content
//! hash in its name and is cached forever.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;
use crate::provider::{ObjectStorage, ObjectUpload};

/// `Cache-Control` for HTML documents.
pub const HTML_CACHE_CONTROL: &str = "no-cache";

/// `Cache-Control` for fingerprinted assets.
pub const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Content type when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns the `Cache-Control` header for an object key.
#[must_use]
pub fn cache_control_for(key: &str) -> Option<&'static str> {
    let file_name = key.rsplit('/').next().unwrap_or(key).to_ascii_lowercase();
    if file_name.ends_with(".html") || file_name.ends_with(".htm") {
        return Some(HTML_CACHE_CONTROL);
    }

    let mut directories = key.split('/').rev().skip(1);
    if directories.any(|segment| segment == "assets") {
        return Some(ASSET_CACHE_CONTROL);
    }

    None
}

/// Returns the MIME type guessed from the key's extension.
#[must_use]
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Builds the upload for one file below the output directory.
fn object_for(output_dir: &Path, path: PathBuf) -> Option<ObjectUpload> {
    let relative = path.strip_prefix(output_dir).ok()?;
    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Some(ObjectUpload {
        content_type: content_type_for(&key),
        cache_control: cache_control_for(&key).map(str::to_string),
        key,
        path,
    })
}

/// Walks the output directory and returns every file, sorted by key.
///
/// # Errors
///
/// Returns an IO error if a directory cannot be read.
pub async fn collect_uploads(output_dir: &Path) -> Result<Vec<ObjectUpload>> {
    let mut pending = vec![output_dir.to_path_buf()];
    let mut objects = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = fs::metadata(&path).await?;
            if metadata.is_dir() {
                pending.push(path);
            } else if metadata.is_file() {
                if let Some(object) = object_for(output_dir, path) {
                    objects.push(object);
                }
            }
        }
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    debug!("Found {} files in {}", objects.len(), output_dir.display());
    Ok(objects)
}

/// Uploads objects with bounded concurrency. The first failure aborts the
/// remaining uploads.
///
/// # Errors
///
/// Returns the first upload error.
pub async fn upload_all(
    storage: &dyn ObjectStorage,
    bucket: &str,
    objects: &[ObjectUpload],
    concurrency: usize,
) -> Result<usize> {
    info!("Uploading {} files to s3://{bucket}/", objects.len());

    let mut uploads = stream::iter(objects)
        .map(|object| async move {
            storage.put_object(bucket, object).await?;
            Ok::<_, crate::error::SpaDeployError>(object)
        })
        .buffer_unordered(concurrency.max(1));

    let mut uploaded = 0;
    while let Some(result) = uploads.next().await {
        let object = result?;
        uploaded += 1;
        debug!(
            "[{uploaded}/{}] {} ({})",
            objects.len(),
            object.key,
            object.content_type
        );
    }

    info!("Upload complete");
    Ok(uploaded)
}
