// src/session.rs
use crate::types::{Config, HarvestError};
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct Session {
    pub client: Client,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HarvestError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session { client })
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, HarvestError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::NetworkError(e.to_string()))
    }

    pub async fn get_text(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.get(url).await?;

        if !response.status().is_success() {
            return Err(HarvestError::NetworkError(format!(
                "HTTP error: {} for {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| HarvestError::NetworkError(e.to_string()))
    }

    pub async fn get_text_with_retry(
        &self,
        url: &str,
        max_retries: u32,
    ) -> Result<String, HarvestError> {
        let mut retries = 0;
        loop {
            match self.get_text(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if retries >= max_retries {
                        return Err(e);
                    }
                    retries += 1;

                    // Exponential backoff
                    let delay = Duration::from_millis(100 * 2u64.pow(retries));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
