//! HTTP client for the destination tag-list collection endpoint.
//!
//! - Read:   `GET  {base_url}?details=true`
//! - Update: `PUT  {base_url}` with [`ListPayload::update`]
//! - Create: `POST {base_url}` with [`ListPayload::create`]

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info, warn};
use tsync_reconcile::snapshot_adapter::RawDestinationList;
use tsync_reconcile::Entry;

use crate::payload::ListPayload;
use crate::writer::{DestinationError, DestinationReader, DestinationWriter, WriteOutcome};

/// Connection settings. The token is passed in already resolved; never log it.
#[derive(Clone)]
pub struct TopicListConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TopicListConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicListConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TopicListClient {
    cfg: TopicListConfig,
    http: reqwest::Client,
}

impl TopicListClient {
    pub fn new(cfg: TopicListConfig) -> Result<Self, DestinationError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| DestinationError::Transport(format!("client build failed: {e}")))?;
        Ok(Self { cfg, http })
    }

    async fn send_write(
        &self,
        method: reqwest::Method,
        payload: &ListPayload<'_>,
    ) -> Result<WriteOutcome, DestinationError> {
        let resp = self
            .http
            .request(method.clone(), &self.cfg.base_url)
            .bearer_auth(&self.cfg.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| DestinationError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            info!(%method, label = payload.label, entries = payload.entities.len(), "list written");
            return Ok(WriteOutcome::Applied);
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(
            %method,
            label = payload.label,
            status = status.as_u16(),
            body = %body,
            "list write rejected"
        );
        Ok(WriteOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl DestinationReader for TopicListClient {
    async fn fetch_lists(&self) -> Result<Vec<RawDestinationList>, DestinationError> {
        debug!("fetching destination lists");
        let resp = self
            .http
            .get(&self.cfg.base_url)
            .bearer_auth(&self.cfg.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("details", "true")])
            .send()
            .await
            .map_err(|e| DestinationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DestinationError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let lists: Vec<RawDestinationList> = resp
            .json()
            .await
            .map_err(|e| DestinationError::Decode(e.to_string()))?;
        info!(lists = lists.len(), "destination lists fetched");
        Ok(lists)
    }
}

#[async_trait::async_trait]
impl DestinationWriter for TopicListClient {
    async fn update(
        &self,
        id: &str,
        label: &str,
        entries: &[Entry],
    ) -> Result<WriteOutcome, DestinationError> {
        self.send_write(reqwest::Method::PUT, &ListPayload::update(id, label, entries))
            .await
    }

    async fn create(
        &self,
        label: &str,
        entries: &[Entry],
    ) -> Result<WriteOutcome, DestinationError> {
        self.send_write(reqwest::Method::POST, &ListPayload::create(label, entries))
            .await
    }
}
