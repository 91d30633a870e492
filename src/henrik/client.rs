use std::{fmt::Debug, num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;

use super::metrics::RequestMetrics;
use super::types::{Envelope, HenrikApiError, HenrikApiResponse, parse_retry_after};
use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HenrikClient {
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    base_url: String,
    /// HenrikDev API Key
    key: String,
    pub metrics: Arc<RequestMetrics>,
}

impl Debug for HenrikClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HenrikClient")
            .field("base_url", &self.base_url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl HenrikClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.henrikdev.xyz";

    pub fn new(
        key: impl Into<String>,
        base_url: impl Into<String>,
        budget_rpm: NonZeroU32,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::direct(Quota::per_minute(budget_rpm)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            metrics: RequestMetrics::new(),
        })
    }

    /// Spawn a task logging periodic metrics about requests.
    pub fn start_metrics_logging(&self) {
        let metrics = self.metrics.clone();
        tokio::spawn(async move { metrics.log_loop().await });
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Shared request logic: waits for the rate limiter, authenticates and unwraps the `data` envelope.
    pub(super) async fn get<T>(&self, url: String, query: &[(&str, String)]) -> HenrikApiResponse<T>
    where
        T: DeserializeOwned + Default + Debug,
    {
        // Ensure we do not exceed the provider budget before doing any request
        self.limiter.until_ready().await;
        self.metrics.inc();

        tracing::trace!(%url, "[HENRIK::CLIENT] GET");

        let res = self
            .client
            .get(url)
            .query(query)
            .header("Authorization", &self.key)
            .send()
            .await?;

        match res.status() {
            status if status.is_success() => {
                let envelope: Envelope<T> = res.json().await?;
                Ok(envelope.data.unwrap_or_default())
            }
            status => {
                let retry_after = res
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);

                if status == StatusCode::TOO_MANY_REQUESTS {
                    self.metrics.inc_rate_limited();
                }

                Err(HenrikApiError::Status {
                    status,
                    retry_after,
                })
            }
        }
    }
}
