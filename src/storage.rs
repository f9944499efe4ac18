use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
/// Directory under the static root that holds uploads.
pub const UPLOAD_SUBDIR: &str = "uploads";
pub const PUBLIC_PREFIX: &str = "/static/uploads";

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Stores an image and returns its public URL, or `None` when the file
    /// name does not carry an accepted image extension.
    async fn save_image(&self, original_name: &str, body: Bytes) -> anyhow::Result<Option<String>>;
}

/// Writes uploads into a directory served under [`PUBLIC_PREFIX`].
#[derive(Clone)]
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    #[cfg(test)]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save_image(&self, original_name: &str, body: Bytes) -> anyhow::Result<Option<String>> {
        if !allowed_file(original_name) {
            tracing::debug!(file = original_name, "ignoring upload with unsupported extension");
            return Ok(None);
        }
        let name = format!("{}_{}", Uuid::new_v4().simple(), secure_filename(original_name));
        let path = self.root.join(&name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;
        tracing::info!(file = %name, bytes = body.len(), "upload stored");
        Ok(Some(format!("{}/{}", PUBLIC_PREFIX, name)))
    }
}

pub fn allowed_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied name to `[A-Za-z0-9._-]`, without directory
/// components or leading dots.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(&['.', '_'][..]).to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
