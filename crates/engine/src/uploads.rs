use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use prismchat_shared::RouteMode;
use snafu::ResultExt;

use crate::error::{ApiResult, RedactionSnafu, StorageSnafu};
use crate::redaction::{IncomingFile, Redactor};

/// URL prefix stored files are served under.
pub const UPLOADS_PATH: &str = "/uploads";

/// Writes uploaded images to disk, redacting them first on the prismguard
/// route.
pub struct UploadStore {
    dir: PathBuf,
    redactor: Arc<dyn Redactor>,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, redactor: Arc<dyn Redactor>) -> Self {
        Self {
            dir: dir.into(),
            redactor,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn redactor_name(&self) -> &'static str {
        self.redactor.name()
    }

    /// Stores every file and returns their URLs in input order. If any file
    /// fails, the ones already written for this batch are removed.
    pub async fn store_batch(
        &self,
        files: Vec<IncomingFile>,
        route: RouteMode,
    ) -> ApiResult<Vec<String>> {
        let mut written = Vec::with_capacity(files.len());
        let mut urls = Vec::with_capacity(files.len());

        for file in files {
            match self.store_one(file, route).await {
                Ok((path, url)) => {
                    written.push(path);
                    urls.push(url);
                }
                Err(e) => {
                    for path in &written {
                        if let Err(remove_err) = tokio::fs::remove_file(path).await {
                            tracing::warn!(path = %path.display(), error = %remove_err, "failed to roll back upload");
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(urls)
    }

    async fn store_one(&self, file: IncomingFile, route: RouteMode) -> ApiResult<(PathBuf, String)> {
        let (bytes, extension) = if route.redacts() {
            let redacted = self
                .redactor
                .redact(&file)
                .await
                .context(RedactionSnafu {
                    name: file.file_name.clone(),
                })?;
            (redacted.bytes, redacted.extension)
        } else {
            (file.bytes, None)
        };

        let name = stored_name(&file.file_name, extension);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context(StorageSnafu { name: name.clone() })?;

        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .context(StorageSnafu { name: name.clone() })?;

        tracing::debug!(file = %name, bytes = bytes.len(), %route, "stored upload");
        Ok((path, format!("{}/{}", UPLOADS_PATH, name)))
    }
}

/// `{unix_millis}-{short id}-{sanitized name}`, with the extension swapped
/// when redaction re-encoded the image.
pub fn stored_name(original: &str, extension: Option<&str>) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let short_id = uuid::Uuid::new_v4().simple().to_string();

    let mut name = sanitize_file_name(original);
    if let Some(ext) = extension {
        let stem = match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name.clone(),
        };
        name = format!("{}.{}", stem, ext);
    }

    format!("{}-{}-{}", millis, &short_id[..8], name)
}

fn sanitize_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    // A name left with only an extension keeps it under a generic stem.
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else if trimmed.len() != cleaned.len() {
        format!("image.{}", trimmed)
    } else {
        trimmed.to_string()
    }
}
