//! Attachment storage configuration.
//!
//! Built once at startup and handed to the attachment store at
//! construction; nothing downstream reads the environment.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::defaults;

/// Limits and location for attachment files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentConfig {
    /// Directory that holds every stored attachment.
    pub root: PathBuf,
    /// Largest accepted upload in bytes.
    pub max_size_bytes: u64,
    /// Accepted extensions, lowercase without the leading dot.
    pub allowed_extensions: BTreeSet<String>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(defaults::UPLOAD_DIR),
            max_size_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_extensions: defaults::ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl AttachmentConfig {
    /// Create a configuration rooted at `root` with default limits.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the maximum upload size.
    pub fn max_size_bytes(mut self, max: u64) -> Self {
        self.max_size_bytes = max;
        self
    }

    /// Replace the extension allow-list.
    ///
    /// Entries are lower-cased and stripped of a leading dot; blanks are
    /// dropped.
    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Whether `ext` (any case, with or without dot) is accepted.
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        normalize_extension(ext)
            .map(|ext| self.allowed_extensions.contains(&ext))
            .unwrap_or(false)
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
