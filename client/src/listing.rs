use async_trait::async_trait;
use kiosk_core::FeedError;
use kiosk_core::ListingSource;
use serde::Deserialize;
use tracing::trace;

/// Body of the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListingPayload {
    pub files: Vec<String>,
}

/// `GET <endpoint>` returning `{ "files": [...] }`.
#[derive(Clone, Debug)]
pub struct HttpListingSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpListingSource {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_listing(&self) -> Result<Vec<String>, FeedError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|err| FeedError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FeedError::Fetch(err.to_string()))?;
        let payload: ListingPayload = serde_json::from_slice(&body)
            .map_err(|err| FeedError::MalformedPayload(err.to_string()))?;
        trace!(count = payload.files.len(), "listing fetched");
        Ok(payload.files)
    }
}
