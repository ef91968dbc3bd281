use super::PullSource;
use crate::protocol::{PullQuery, PullResponse};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Pull source over HTTP GET
#[derive(Debug, Clone)]
pub struct HttpPullSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpPullSource {
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl PullSource for HttpPullSource {
    async fn fetch(&self, query: &PullQuery) -> Result<PullResponse> {
        let limit = query.limit.to_string();
        let response = self
            .client
            .get(self.url.clone())
            .query(&[("region", query.region.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .with_context(|| format!("Pull request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Pull source returned {}: {}", status, body);
        }

        response
            .json::<PullResponse>()
            .await
            .context("Failed to parse pull response")
    }
}
