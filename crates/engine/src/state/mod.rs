use std::sync::Arc;

use crate::config::EngineConfig;
use crate::redaction::{PassthroughRedactor, Redactor, VisionRedactor};
use crate::store::MockStore;
use crate::uploads::UploadStore;

/// Everything the handlers share. Created once at startup; dropping it
/// drops every conversation.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MockStore>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(store: MockStore, uploads: UploadStore) -> Self {
        Self {
            store: Arc::new(store),
            uploads: Arc::new(uploads),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let redactor: Arc<dyn Redactor> = match &config.vision_url {
            Some(url) => Arc::new(VisionRedactor::new(url.clone())),
            None => Arc::new(PassthroughRedactor),
        };

        Self::new(
            MockStore::new(),
            UploadStore::new(config.upload_dir.clone(), redactor),
        )
    }
}
