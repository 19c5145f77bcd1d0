//! Filesystem attachment store.
//!
//! Uploaded files are validated against the configured size limit and
//! extension allow-list, then written under a random generated name inside
//! a single storage root:
//! - Names are 128 random bits, hex encoded, plus the validated extension
//! - Writes are atomic (temp file + rename) with 0644 permissions
//! - Removal is best-effort: failures are logged and swallowed
//! - Downloads resolve only base names and must canonicalize to a regular
//!   file strictly inside the canonical root
//!
//! ## Example
//!
//! ```rust,ignore
//! use helpdesk_db::{AttachmentConfig, AttachmentStore};
//!
//! let store = AttachmentStore::open(AttachmentConfig::new("/var/helpdesk/uploads")).await?;
//! let name = store.store(&bytes, "screenshot.PNG", bytes.len() as u64).await?;
//! let path = store.resolve(&name).await?;
//! store.remove(&name).await;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use helpdesk_core::{defaults, AttachmentConfig, Error, Result};
use rand::RngCore;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Attempts at drawing an unused name before giving up.
const NAME_ATTEMPTS: usize = 4;

/// Stores, serves and removes attachment files under one root directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    config: Arc<AttachmentConfig>,
}

impl AttachmentStore {
    /// Open a store, creating the root directory if it is missing.
    pub async fn open(config: AttachmentConfig) -> Result<Self> {
        fs::create_dir_all(&config.root).await.map_err(|e| {
            warn!(
                subsystem = "attachments",
                component = "store",
                root = %config.root.display(),
                error = %e,
                "create_dir_all failed"
            );
            e
        })?;
        debug!(
            subsystem = "attachments",
            component = "store",
            root = %config.root.display(),
            max_size_bytes = config.max_size_bytes,
            allowed = ?config.allowed_extensions,
            "Attachment store opened"
        );
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &AttachmentConfig {
        &self.config
    }

    /// Validate and persist an upload, returning its generated name.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if `size_bytes` exceeds the limit or the
    ///   extension of `original_name` is not allowed. Nothing is written.
    /// - `Error::Io` if the file cannot be written. No partial file remains.
    pub async fn store(&self, data: &[u8], original_name: &str, size_bytes: u64) -> Result<String> {
        if size_bytes > self.config.max_size_bytes {
            return Err(Error::Validation(format!(
                "File too large: {} bytes exceeds maximum of {} bytes",
                size_bytes, self.config.max_size_bytes
            )));
        }

        let ext = extension_of(original_name)
            .filter(|ext| self.config.is_extension_allowed(ext))
            .ok_or_else(|| Error::Validation("File type not allowed".to_string()))?;

        let mut stored_name = None;
        for _ in 0..NAME_ATTEMPTS {
            let candidate = generate_stored_name(&ext);
            if !fs::try_exists(self.config.root.join(&candidate)).await? {
                stored_name = Some(candidate);
                break;
            }
        }
        let stored_name = stored_name
            .ok_or_else(|| Error::Internal("could not allocate an unused file name".into()))?;

        self.write_atomic(&stored_name, data).await?;

        info!(
            subsystem = "attachments",
            component = "store",
            op = "store",
            stored_name = %stored_name,
            size_bytes = data.len(),
            "Attachment stored"
        );
        Ok(stored_name)
    }

    async fn write_atomic(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.config.root.join(stored_name);
        let temp_path = self.config.root.join(format!(".{}.tmp", stored_name));

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &full_path).await?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            warn!(
                subsystem = "attachments",
                component = "store",
                op = "write",
                path = %full_path.display(),
                error = %e,
                "Attachment write failed"
            );
            let _ = fs::remove_file(&temp_path).await;
            let _ = fs::remove_file(&full_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Best-effort deletion of a stored file. Never fails.
    pub async fn remove(&self, stored_name: &str) {
        let Some(name) = base_name(stored_name) else {
            debug!(
                subsystem = "attachments",
                component = "store",
                op = "remove",
                stored_name = %stored_name,
                "Ignoring removal of invalid name"
            );
            return;
        };

        match fs::remove_file(self.config.root.join(name)).await {
            Ok(()) => info!(
                subsystem = "attachments",
                component = "store",
                op = "remove",
                stored_name = %name,
                "Attachment removed"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => debug!(
                subsystem = "attachments",
                component = "store",
                op = "remove",
                stored_name = %name,
                "Attachment already gone"
            ),
            Err(e) => warn!(
                subsystem = "attachments",
                component = "store",
                op = "remove",
                stored_name = %name,
                error = %e,
                "Attachment removal failed; file left orphaned"
            ),
        }
    }

    /// Resolve a client-supplied name to the absolute path of a stored file.
    ///
    /// Only the base-name component of `requested` is used. The joined path
    /// is canonicalized and must be a regular file strictly inside the
    /// canonical storage root.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for every failure, including traversal
    /// attempts, so callers learn nothing about the filesystem.
    pub async fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let not_found = || Error::NotFound(format!("Attachment {} not found", requested));

        let name = base_name(requested).ok_or_else(not_found)?;
        let root = fs::canonicalize(&self.config.root)
            .await
            .map_err(|_| not_found())?;
        let candidate = fs::canonicalize(root.join(name))
            .await
            .map_err(|_| not_found())?;

        if candidate == root || !candidate.starts_with(&root) {
            warn!(
                subsystem = "attachments",
                component = "store",
                op = "resolve",
                requested = %requested,
                resolved = %candidate.display(),
                "Rejected path outside storage root"
            );
            return Err(not_found());
        }

        let metadata = fs::metadata(&candidate).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        debug!(
            subsystem = "attachments",
            component = "store",
            op = "resolve",
            requested = %requested,
            resolved = %candidate.display(),
            "Attachment resolved"
        );
        Ok(candidate)
    }

    /// Resolve and read a stored file.
    ///
    /// Returns the file's base name and contents.
    pub async fn read(&self, requested: &str) -> Result<(String, Vec<u8>)> {
        let path = self.resolve(requested).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("Attachment {} not found", requested)))?;
        let data = fs::read(&path).await?;
        Ok((name, data))
    }

    /// Validate that the storage root can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch permission errors and
    /// missing volumes early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.config.root.join(".health-check.tmp");

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

/// Final path component of a client-supplied name.
///
/// Both `/` and `\` count as separators. Empty names, names starting with
/// a dot (covers `.`, `..` and in-flight temp files) and names containing
/// NUL are rejected.
pub fn base_name(requested: &str) -> Option<&str> {
    let name = requested.rsplit(['/', '\\']).next()?;
    if name.is_empty() || name.starts_with('.') || name.contains('\0') {
        return None;
    }
    Some(name)
}

/// Lowercase extension of an uploaded file's original name.
pub fn extension_of(original_name: &str) -> Option<String> {
    let name = original_name.rsplit(['/', '\\']).next()?;
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| !ext.is_empty())
}

/// Random stored name with the given extension.
///
/// Format: `{32-hex-chars}.{ext}`. Independent of the original filename.
pub fn generate_stored_name(ext: &str) -> String {
    let mut bytes = [0u8; defaults::STORED_NAME_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}.{}", hex::encode(bytes), ext)
}
