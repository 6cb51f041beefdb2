use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use super::PageFetcher;

pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> ScrapeResult<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// One GET. Any non-2xx status is a fetch failure.
    async fn get_once(&self, url: &str) -> ScrapeResult<String> {
        debug!("GET {}", url);
        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::fetch(url, format!("HTTP {}", status)));
        }

        resp.text()
            .await
            .map_err(|e| ScrapeError::fetch(url, format!("failed to read body: {}", e)))
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        if self.config.request_delay_ms == 0 && self.config.jitter_ms == 0 {
            return;
        }
        let jitter_ms = rand::random_range(0..=self.config.jitter_ms);
        sleep(Duration::from_millis(self.config.request_delay_ms + jitter_ms)).await;
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> ScrapeResult<String> {
        self.polite_delay().await;

        if self.config.max_retries == 0 {
            return self.get_once(url).await;
        }

        // 2^n * factor ms: 500, 1000, 2000, ...
        let factor = self.config.request_delay_ms.max(250);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(Duration::from_secs(30))
            .map(jitter)
            .take(self.config.max_retries);

        Retry::start(strategy, || async {
            self.get_once(url).await.inspect_err(|e| warn!("{}", e))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        let client = HttpClient::new(&ScraperConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let cfg = ScraperConfig {
            timeout_secs: 2,
            ..ScraperConfig::default()
        };
        let client = HttpClient::new(&cfg).unwrap();
        let err = client.fetch("http://127.0.0.1:9/races.html").await.unwrap_err();
        assert!(err.is_fetch(), "{:?}", err);
    }

    #[tokio::test]
    async fn test_retries_give_up_with_fetch_error() {
        let cfg = ScraperConfig {
            timeout_secs: 2,
            request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 2,
            ..ScraperConfig::default()
        };
        let client = HttpClient::new(&cfg).unwrap();
        let err = client.fetch("http://127.0.0.1:9/races.html").await.unwrap_err();
        assert!(err.is_fetch(), "{:?}", err);
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
