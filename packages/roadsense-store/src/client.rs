use crate::types::{CreateResponse, ProcessedAgentData};
use tracing::{error, info};

/// HTTP client used by upstream consumers to hand processed batches to the store
#[derive(Clone)]
pub struct StoreApiClient {
    http: reqwest::Client,
    api_base_url: String,
}

impl StoreApiClient {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Save a processed batch. Returns true if the store accepted it.
    pub async fn save_data(&self, batch: &[ProcessedAgentData]) -> bool {
        let url = format!("{}/processed_agent_data/", self.api_base_url);

        let response = match self.http.post(&url).json(batch).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to reach store at {}: {}", url, e);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Store rejected batch of {} records: {}", batch.len(), status);
            return false;
        }

        match response.json::<CreateResponse>().await {
            Ok(ack) => {
                info!("Store accepted {} records: {}", ack.ids.len(), ack.message);
                true
            }
            Err(e) => {
                error!("Unexpected store acknowledgement: {}", e);
                false
            }
        }
    }
}
