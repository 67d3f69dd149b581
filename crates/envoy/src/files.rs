use std::path::Path;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use snafu::ResultExt;

use crate::error::{ClientResult, ReadFileSnafu};

/// An image picked on this machine, staged for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    /// Content type is guessed from the file name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.context(ReadFileSnafu {
            path: path.display().to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(name, bytes))
    }

    /// `data:` URL of the original bytes, for echoing the file back to the
    /// sender without a round trip.
    pub fn preview_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}
