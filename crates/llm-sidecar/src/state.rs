use std::sync::Arc;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::inference::InferenceEngine;
use crate::memory::MemoryStore;
use crate::runtime_client::RuntimeClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub inference: Arc<InferenceEngine>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let profiles = crate::classifier::build_profiles(&config.profiles);
        let classifier = Classifier::new(config.classifier.clone());
        let memory = MemoryStore::new(&config.embedding, &config.vector_db);
        if let Err(e) = memory.ensure_collections().await {
            tracing::warn!(error = %e, "failed to ensure memory collections at startup");
        }
        let runtime = RuntimeClient::new(&config.runtime.base_url, config.runtime.timeout_ms);

        let inference = Arc::new(InferenceEngine::new(
            classifier,
            memory,
            runtime,
            config.runtime.clone(),
            profiles,
            config.memory.chat_top_k,
        ));

        Ok(Self {
            config: Arc::new(config),
            inference,
        })
    }
}
