//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Pricing failures map to distinct statuses so the UI can tell "no
//! such market" (404) from "market not seeded yet" (409) apart.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::WagerBackend;
use crate::board::SharedBoard;
use crate::odds::settlement::{settle, PLATFORM_FEE_RATE};
use crate::odds::{quote as price_pool, MarketQuote};
use crate::types::{
    MarketSnapshot, Outcome, Stake, StakeProposal, SettlementResult, StakeReceipt, WagerError,
};
use crate::wallet::WalletStore;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub board: SharedBoard,
    pub backend: Arc<dyn WagerBackend>,
    pub wallet: Arc<WalletStore>,
    /// Participant identity attached to stakes placed through this API.
    pub participant: Uuid,
    pub currency: String,
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEntry {
    #[serde(flatten)]
    pub market: MarketSnapshot,
    /// Absent while the market has no stake to price against.
    pub quote: Option<MarketQuote>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub market_id: String,
    pub proposal: StakeProposal,
    /// Gross payout at the displayed (pre-trade) odds.
    pub projected_payout: Decimal,
    /// Gross payout once the stake's own dilution is accounted for.
    pub diluted_payout: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub winning_side: Outcome,
    pub stakes: Vec<Stake>,
    /// Defaults to the fixed platform rate.
    #[serde(default)]
    pub fee_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub balance: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Map domain errors onto HTTP statuses.
fn error_response(err: WagerError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        WagerError::MarketNotFound(_) => StatusCode::NOT_FOUND,
        WagerError::EmptyPool(_) | WagerError::MarketClosed(_) => StatusCode::CONFLICT,
        WagerError::StakeOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WagerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        WagerError::Backend { .. } => StatusCode::BAD_GATEWAY,
        WagerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/markets
pub async fn get_markets(State(state): State<AppState>) -> Json<Vec<MarketEntry>> {
    let markets = state.board.list().await;
    let entries = markets
        .into_iter()
        .map(|market| {
            let quote = price_pool(&market.pool).ok();
            MarketEntry { market, quote }
        })
        .collect();
    Json(entries)
}

/// GET /api/markets/:id/quote
pub async fn get_quote(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<MarketQuote>, (StatusCode, Json<ErrorBody>)> {
    state
        .board
        .quote(&market_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/markets/:id/project
pub async fn post_project(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(proposal): Json<StakeProposal>,
) -> Result<Json<ProjectionResponse>, (StatusCode, Json<ErrorBody>)> {
    let projected = state
        .board
        .project(&market_id, &proposal)
        .await
        .map_err(error_response)?;

    let market = state
        .board
        .get(&market_id)
        .await
        .ok_or_else(|| error_response(WagerError::MarketNotFound(market_id.clone())))?;
    let diluted = crate::odds::quote::projected_payout_diluted(&market.pool, &proposal);

    Ok(Json(ProjectionResponse {
        market_id,
        proposal,
        projected_payout: projected.round_dp(2),
        diluted_payout: diluted.round_dp(2),
    }))
}

/// POST /api/markets/:id/stakes
///
/// Validate, debit the wallet, and forward the stake to the backend.
pub async fn post_stake(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(proposal): Json<StakeProposal>,
) -> Result<Json<StakeReceipt>, (StatusCode, Json<ErrorBody>)> {
    state
        .board
        .place_stake(
            state.backend.as_ref(),
            &state.wallet,
            state.participant,
            &market_id,
            &proposal,
        )
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/settle
///
/// Pure computation over the submitted stake list — the payouts map is
/// what the backend's ledger executes. Nothing is persisted here.
pub async fn post_settle(Json(request): Json<SettleRequest>) -> Json<SettlementResult> {
    let fee_rate = request.fee_rate.unwrap_or(PLATFORM_FEE_RATE);
    Json(settle(&request.stakes, request.winning_side, fee_rate))
}

/// GET /api/wallet
pub async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    Json(WalletResponse {
        balance: state.wallet.balance(),
        currency: state.currency.clone(),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
