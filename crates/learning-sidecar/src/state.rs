use std::sync::Arc;

use crate::config::Config;
use crate::correction_store::CorrectionStore;
use crate::llm_client::LlmSidecarClient;
use crate::notifier::Notifier;
use crate::pipeline::Pipeline;
use crate::vendor_client::VendorClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = CorrectionStore::open(&config.storage.base_path)?;
        let notifier = Notifier::new(&config.notification);
        let llm = LlmSidecarClient::new(&config.llm_sidecar);
        let vendor = VendorClient::new(&config.vendor);

        let pipeline = Arc::new(Pipeline::new(store, notifier, llm, vendor, config.clone()));

        Ok(Self {
            config: Arc::new(config),
            pipeline,
        })
    }
}
