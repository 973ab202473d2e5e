use std::sync::Arc;

use crate::services::validation::UploadRules;
use crate::services::worker::EnrichmentWorker;
use crate::store::MetadataStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetadataStore>,
    pub worker: EnrichmentWorker,
    pub upload_rules: Arc<UploadRules>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        worker: EnrichmentWorker,
        upload_rules: UploadRules,
    ) -> Self {
        Self {
            store,
            worker,
            upload_rules: Arc::new(upload_rules),
        }
    }
}
