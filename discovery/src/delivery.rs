//! Batched delivery of the inventory to the discovery endpoint.
//!
//! Batches are posted one after another with a fixed pause in between. A failed batch is logged
//! and counted; it never stops the remaining batches and is never retried.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use url::Url;

use crate::config::DeliveryConfig;
use crate::model::DiscoveredApi;

const API_KEY_HEADER: &str = "x-api-key";
const MAX_IDLE_CONNECTIONS: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
/// Posts one batch. Anything other than a 2xx answer is an error.
pub trait BatchSender: Send + Sync {
    async fn send_batch(&self, batch: &[DiscoveredApi]) -> anyhow::Result<()>;
}

/// HTTPS implementation of [`BatchSender`] over one pooled keep-alive client.
#[derive(Clone)]
pub struct HttpBatchSender {
    endpoint: Url,
    api_key: String,
    user_agent: String,
    http: reqwest::Client,
}

impl HttpBatchSender {
    pub fn new(cfg: &DeliveryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .tcp_keepalive(IDLE_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build delivery http client")?;

        Ok(Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            user_agent: cfg.user_agent.clone(),
            http,
        })
    }
}

#[async_trait]
impl BatchSender for HttpBatchSender {
    async fn send_batch(&self, batch: &[DiscoveredApi]) -> anyhow::Result<()> {
        let body = Bytes::from(serde_json::to_vec(batch)?);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .header(API_KEY_HEADER, &self.api_key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {text}", status.as_u16());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Per-invocation delivery tally.
pub struct DeliveryReport {
    pub batches_delivered: usize,
    pub batches_failed: usize,
}

/// Split `apis` into consecutive batches of at most `batch_size` items.
pub fn batches(apis: &[DiscoveredApi], batch_size: usize) -> std::slice::Chunks<'_, DiscoveredApi> {
    apis.chunks(batch_size.max(1))
}

/// Sequential batch delivery with pacing.
pub struct Delivery {
    sender: Box<dyn BatchSender>,
    batch_size: usize,
    batch_delay: Duration,
}

impl Delivery {
    pub fn new(sender: Box<dyn BatchSender>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            sender,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// HTTPS delivery configured from `cfg`.
    pub fn http(cfg: &DeliveryConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            Box::new(HttpBatchSender::new(cfg)?),
            cfg.batch_size,
            cfg.batch_delay,
        ))
    }

    pub async fn deliver(&self, apis: &[DiscoveredApi]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if apis.is_empty() {
            tracing::info!("no APIs to send");
            return report;
        }

        let total = apis.len().div_ceil(self.batch_size);
        tracing::info!(apis = apis.len(), batches = total, "sending APIs in batches");

        for (idx, batch) in batches(apis, self.batch_size).enumerate() {
            let n = idx + 1;
            tracing::info!(batch = n, of = total, size = batch.len(), "sending batch");

            match self.sender.send_batch(batch).await {
                Ok(()) => {
                    report.batches_delivered += 1;
                    tracing::info!(batch = n, "batch sent");
                }
                Err(err) => {
                    report.batches_failed += 1;
                    tracing::error!(batch = n, error = %format!("{err:#}"), "error sending batch");
                }
            }

            if n < total {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        report
    }
}
