//! Folder set operations on the local filesystem.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::FolderConfig;
use crate::document;

use super::error::MailboxError;

/// Format of the suffix appended on a name collision.
const COLLISION_SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The inbound, processed, failed and order response folders.
#[derive(Debug, Clone)]
pub struct Mailbox {
    folders: FolderConfig,
}

impl Mailbox {
    pub fn new(folders: FolderConfig) -> Self {
        Self { folders }
    }

    pub fn folders(&self) -> &FolderConfig {
        &self.folders
    }

    /// Create every folder that does not exist yet.
    pub async fn ensure_directories(&self) -> Result<(), MailboxError> {
        for dir in [
            &self.folders.inbound_orders,
            &self.folders.processed_orders,
            &self.folders.failed_orders,
            &self.folders.order_responses,
        ] {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| MailboxError::DirectoryCreationFailed {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// List `*.xml` files in the inbound folder (non-recursive), sorted by name.
    pub async fn list_inbound(&self) -> Result<Vec<PathBuf>, MailboxError> {
        let dir = &self.folders.inbound_orders;
        let list_failed = |source| MailboxError::ListFailed {
            path: dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(dir).await.map_err(list_failed)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
            let path = entry.path();
            if !has_xml_extension(&path) {
                continue;
            }
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        files.sort();
        Ok(files)
    }

    /// Move a file into the processed folder.
    pub async fn move_to_processed(&self, path: &Path) -> Result<PathBuf, MailboxError> {
        relocate(path, &self.folders.processed_orders).await
    }

    /// Move a file into the failed folder.
    pub async fn move_to_failed(&self, path: &Path) -> Result<PathBuf, MailboxError> {
        relocate(path, &self.folders.failed_orders).await
    }

    /// Persist an order response as `<order_number>.xml`.
    ///
    /// The payload is written to a temporary file and renamed into place, so
    /// readers of the folder never see a partial document. An existing file
    /// for the same order number is replaced.
    pub async fn write_response(
        &self,
        order_number: &str,
        xml: &[u8],
    ) -> Result<PathBuf, MailboxError> {
        let file_name = response_file_name(order_number)?;
        document::validate_xml(xml)?;

        let dir = &self.folders.order_responses;
        let destination = dir.join(&file_name);
        let temp = dir.join(format!(".{}.tmp", file_name));

        let write = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(xml).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp).await;
            return Err(MailboxError::write_failed(destination, e));
        }

        if let Err(e) = fs::rename(&temp, &destination).await {
            let _ = fs::remove_file(&temp).await;
            return Err(MailboxError::write_failed(destination, e));
        }

        Ok(destination)
    }
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xml")
}

/// Validate an order number and turn it into a response file name.
fn response_file_name(order_number: &str) -> Result<String, MailboxError> {
    let trimmed = order_number.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0']);
    if invalid {
        return Err(MailboxError::InvalidOrderNumber(order_number.to_string()));
    }
    Ok(format!("{}.xml", trimmed))
}

/// Move `source` into `dest_dir`, keeping its name unless that name is taken.
///
/// On collision the name gets a `_YYYYMMDD_HHMMSS` suffix before the
/// extension; if that is taken too, `_2`, `_3`, ... is appended after the
/// timestamp. Existing files are never overwritten.
pub async fn relocate(source: &Path, dest_dir: &Path) -> Result<PathBuf, MailboxError> {
    let file_name = source.file_name().ok_or_else(|| MailboxError::NoFileName {
        path: source.to_path_buf(),
    })?;

    let destination = free_destination(dest_dir, Path::new(file_name), Local::now().naive_local());
    move_file(source, &destination).await?;
    debug!("Moved {} to {}", source.display(), destination.display());
    Ok(destination)
}

/// First non-existing destination for `file_name` in `dir`.
fn free_destination(dir: &Path, file_name: &Path, now: NaiveDateTime) -> PathBuf {
    let plain = dir.join(file_name);
    if !plain.exists() {
        return plain;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = now.format(COLLISION_SUFFIX_FORMAT);

    let stamped = dir.join(format!("{}_{}{}", stem, stamp, ext));
    if !stamped.exists() {
        return stamped;
    }

    (2u32..)
        .map(|n| dir.join(format!("{}_{}_{}{}", stem, stamp, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(stamped)
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_file(source: &Path, destination: &Path) -> Result<(), MailboxError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        // Cross-filesystem moves fail with EXDEV (18 on Linux)
        Err(e)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) =>
        {
            fs::copy(source, destination).await.map_err(|error| {
                MailboxError::move_failed(source.to_path_buf(), destination.to_path_buf(), error)
            })?;
            fs::remove_file(source).await.map_err(|error| {
                MailboxError::move_failed(source.to_path_buf(), destination.to_path_buf(), error)
            })
        }
        Err(e) => Err(MailboxError::move_failed(
            source.to_path_buf(),
            destination.to_path_buf(),
            e,
        )),
    }
}
