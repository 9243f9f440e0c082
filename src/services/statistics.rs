//! Statistics feed: polls the remote `statistics` endpoint and keeps the
//! latest summary for the dashboard.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Request timeout for a single poll.
const POLL_TIMEOUT_SECS: u64 = 10;

/// Aggregate numbers served by the statistics endpoint. Every field is
/// optional on the wire; a missing or `null` field reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticsSummary {
    #[serde(deserialize_with = "null_as_zero")]
    pub processed: u64,
    #[serde(deserialize_with = "null_as_zero")]
    pub active_sessions: u64,
    #[serde(deserialize_with = "null_as_zero")]
    pub success_rate: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub total_shares: u64,
}

fn null_as_zero<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StatisticsSummary {
    /// Decodes a response body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(sonic_rs::from_slice(body)?)
    }
}

/// The most recent successful poll, shared between the poller and the HTTP
/// handlers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub summary: StatisticsSummary,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Shared holder for the latest statistics snapshot.
#[derive(Clone, Default)]
pub struct StatisticsBoard {
    latest: Arc<RwLock<StatisticsSnapshot>>,
}

impl StatisticsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, summary: StatisticsSummary) -> Result<()> {
        let mut latest = self.latest.write()?;
        *latest = StatisticsSnapshot {
            summary,
            updated_at: Some(Utc::now()),
        };
        Ok(())
    }

    pub fn snapshot(&self) -> Result<StatisticsSnapshot> {
        Ok(self.latest.read()?.clone())
    }
}

/// HTTP client for the statistics endpoint.
#[derive(Clone)]
pub struct StatisticsClient {
    client: reqwest::Client,
    url: String,
}

impl StatisticsClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs one `GET` against the endpoint.
    pub async fn fetch(&self) -> Result<StatisticsSummary> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        StatisticsSummary::from_json(&body)
    }
}
