use crate::auth_client::AuthClient;
use crate::storage_client::StorageClient;
use sift_pipeline::config::TopicConfig;
use sift_pipeline::ContentProducer;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthClient,
    pub storage: StorageClient,
    pub producer: Arc<ContentProducer>,
    pub topics: TopicConfig,
}
