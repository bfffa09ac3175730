//! HTTP client for the wagering backend REST API.
//!
//! Wire shapes are camelCase JSON:
//! - market read: `{ id, question, poolYes, poolNo, minStake, maxStake,
//!   winningSide? }`
//! - stake placement: POST `{ side, amount }` →
//!   `{ stakeId, poolYes, poolNo, acceptedAt }`
//! - resolution read: `{ winningSide: "yes" | "no" | "voided" | null }`
//!
//! Reads are public; placements carry a bearer key when one is
//! configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::WagerBackend;
use crate::types::{MarketSnapshot, Outcome, Pool, StakeBounds, StakeProposal, StakeReceipt};

const BACKEND_NAME: &str = "wager-api";

// ---------------------------------------------------------------------------
// Wire types (backend JSON → Rust)
// ---------------------------------------------------------------------------

/// Market/pool read. We only deserialize the fields we need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketDto {
    id: String,
    #[serde(default)]
    question: String,
    pool_yes: Decimal,
    pool_no: Decimal,
    min_stake: Decimal,
    max_stake: Decimal,
    /// Present once the market is resolved or voided.
    #[serde(default)]
    winning_side: Option<Outcome>,
}

impl MarketDto {
    fn into_snapshot(self, fetched_at: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot {
            id: self.id,
            question: self.question,
            pool: Pool::new(self.pool_yes, self.pool_no),
            bounds: StakeBounds {
                min: self.min_stake,
                max: self.max_stake,
            },
            resolution: self.winning_side,
            fetched_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceStakeDto {
    side: crate::types::Side,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeAcceptedDto {
    stake_id: String,
    pool_yes: Decimal,
    pool_no: Decimal,
    #[serde(default)]
    accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionDto {
    winning_side: Option<Outcome>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Backend REST client.
pub struct HttpBackend {
    http: Client,
    base_url: String,
    /// Bearer key for stake placement. Reads work without one.
    api_key: Option<SecretString>,
}

impl HttpBackend {
    /// Create a new backend client.
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("WAGERPOOL/0.1.0 (odds-service)")
            .build()
            .context("Failed to build HTTP client for wager backend")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach the bearer key to a request when one is configured.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key.expose_secret()),
            None => req,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "Backend GET");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Backend API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Backend API error {status}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse backend response from {path}"))
    }
}

#[async_trait]
impl WagerBackend for HttpBackend {
    async fn fetch_markets(&self) -> Result<Vec<MarketSnapshot>> {
        let markets: Vec<MarketDto> = self.get_json("/markets").await?;
        let now = Utc::now();
        Ok(markets.into_iter().map(|m| m.into_snapshot(now)).collect())
    }

    async fn fetch_market(&self, market_id: &str) -> Result<MarketSnapshot> {
        let market: MarketDto = self.get_json(&format!("/markets/{market_id}")).await?;
        Ok(market.into_snapshot(Utc::now()))
    }

    async fn place_stake(
        &self,
        market_id: &str,
        proposal: &StakeProposal,
    ) -> Result<StakeReceipt> {
        let url = self.url(&format!("/markets/{market_id}/stakes"));
        debug!(url = %url, proposal = %proposal, "Placing stake");

        let body = PlaceStakeDto {
            side: proposal.side,
            amount: proposal.amount,
        };

        let resp = self
            .authorize(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .context("Stake placement request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Stake rejected by backend ({status}): {body}");
        }

        let accepted: StakeAcceptedDto = resp
            .json()
            .await
            .context("Failed to parse stake placement response")?;

        Ok(StakeReceipt {
            stake_id: accepted.stake_id,
            market_id: market_id.to_string(),
            side: proposal.side,
            amount: proposal.amount,
            pool_after: Pool::new(accepted.pool_yes, accepted.pool_no),
            accepted_at: accepted.accepted_at.unwrap_or_else(Utc::now),
        })
    }

    async fn fetch_resolution(&self, market_id: &str) -> Result<Option<Outcome>> {
        let resolution: ResolutionDto = self
            .get_json(&format!("/markets/{market_id}/resolution"))
            .await?;
        Ok(resolution.winning_side)
    }

    fn name(&self) -> &str {
        BACKEND_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
