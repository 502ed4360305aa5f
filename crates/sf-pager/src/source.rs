use anyhow::Context;
use async_trait::async_trait;
use sf_api_types::Item;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("item source transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("item source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("item source payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A paginated list backend. A page shorter than `limit` means the list is exhausted.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: usize) -> Result<Vec<Item>, FetchError>;
}

/// `GET <endpoint>?_page=<n>&_limit=<limit>` returning a JSON array of items.
pub struct HttpItemSource {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpItemSource {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build item source http client")?;
        Ok(Self::with_client(endpoint, http))
    }

    pub fn with_client(endpoint: &str, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            http,
        }
    }

    fn page_url(&self, page: u32, limit: usize) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}_page={}&_limit={}", self.endpoint, separator, page, limit)
    }
}

#[async_trait]
impl ItemSource for HttpItemSource {
    async fn fetch_page(&self, page: u32, limit: usize) -> Result<Vec<Item>, FetchError> {
        let response = self.http.get(self.page_url(page, limit)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
