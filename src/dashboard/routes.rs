//! Dashboard API route handlers.
//!
//! All endpoints return JSON. Amounts cross this boundary as decimal
//! currency values and are converted to integer minor units before any
//! arithmetic; responses convert back for presentation. State is shared
//! via `Arc<ApiContext>`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::ledger::Ledger;
use crate::storage;
use crate::types::{
    from_minor_units, to_minor_units, LedgerError, Transaction, TransactionKind,
    TransactionStatus, Wallet,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiContext {
    pub ledger: Ledger,
    pub currency_exponent: u32,
    /// Snapshot written after each committed mutation. `None` disables
    /// persistence (tests).
    pub snapshot_path: Option<String>,
}

pub type AppState = Arc<ApiContext>;

impl ApiContext {
    pub fn new(ledger: Ledger, currency_exponent: u32, snapshot_path: Option<String>) -> Self {
        Self {
            ledger,
            currency_exponent,
            snapshot_path,
        }
    }

    /// Persist committed state, best-effort. The operation has already
    /// succeeded; a failed snapshot is logged, not surfaced to the caller.
    fn persist(&self) {
        if let Some(path) = &self.snapshot_path {
            if let Err(e) = storage::save_snapshot(&self.ledger.snapshot(), Some(path)) {
                error!(error = %e, path, "Failed to save ledger snapshot");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wraps `LedgerError` for the HTTP boundary. All ledger failures are
/// rejections before mutation, so they map to client-side status codes.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
            LedgerError::SameAccount(_) => (StatusCode::BAD_REQUEST, "same_account"),
            LedgerError::InsufficientFunds { .. } => {
                (StatusCode::CONFLICT, "insufficient_funds")
            }
        };
        let body = Json(serde_json::json!({
            "error": code,
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FundDealRequest {
    pub investor_id: String,
    pub entrepreneur_id: String,
    pub deal_id: String,
    pub deal_name: String,
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WalletResponse {
    pub user_id: String,
    pub balance: Decimal,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: u64,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub deal_id: Option<String>,
    pub deal_name: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CashResponse {
    pub transaction: TransactionResponse,
    pub wallet: WalletResponse,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transaction: TransactionResponse,
    pub sender_wallet: WalletResponse,
    pub receiver_wallet: WalletResponse,
}

#[derive(Debug, Serialize)]
pub struct FundDealResponse {
    pub transaction: TransactionResponse,
    pub receipt: TransactionResponse,
    pub investor_wallet: WalletResponse,
    pub entrepreneur_wallet: WalletResponse,
}

fn wallet_response(wallet: &Wallet, exponent: u32) -> WalletResponse {
    WalletResponse {
        user_id: wallet.user_id.clone(),
        balance: from_minor_units(wallet.balance, exponent),
        currency: wallet.currency.clone(),
        updated_at: wallet.updated_at,
    }
}

fn txn_response(txn: &Transaction, exponent: u32) -> TransactionResponse {
    TransactionResponse {
        id: txn.id,
        user_id: txn.user_id.clone(),
        kind: txn.kind,
        amount: from_minor_units(txn.amount, exponent),
        currency: txn.currency.clone(),
        status: txn.status,
        sender_id: txn.sender_id.clone(),
        receiver_id: txn.receiver_id.clone(),
        deal_id: txn.deal_id.clone(),
        deal_name: txn.deal_name.clone(),
        description: txn.description.clone(),
        created_at: txn.created_at,
        updated_at: txn.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/wallets/:user_id
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .ledger
        .wallet(&user_id)
        .ok_or(LedgerError::UserNotFound(user_id))?;
    Ok(Json(wallet_response(&wallet, state.currency_exponent)))
}

/// GET /api/wallets/:user_id/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(filter): Query<TransactionFilter>,
) -> Json<Vec<TransactionResponse>> {
    let txns = state.ledger.transactions(&user_id, filter.status);
    Json(
        txns.iter()
            .map(|t| txn_response(t, state.currency_exponent))
            .collect(),
    )
}

/// POST /api/deposit
pub async fn deposit(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<CashResponse>, ApiError> {
    let amount = to_minor_units(req.amount, state.currency_exponent)?;
    let outcome = state
        .ledger
        .deposit(&req.user_id, amount, req.description.as_deref())?;
    state.persist();
    Ok(Json(CashResponse {
        transaction: txn_response(&outcome.transaction, state.currency_exponent),
        wallet: wallet_response(&outcome.wallet, state.currency_exponent),
    }))
}

/// POST /api/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<CashResponse>, ApiError> {
    let amount = to_minor_units(req.amount, state.currency_exponent)?;
    let outcome = state
        .ledger
        .withdraw(&req.user_id, amount, req.description.as_deref())?;
    state.persist();
    Ok(Json(CashResponse {
        transaction: txn_response(&outcome.transaction, state.currency_exponent),
        wallet: wallet_response(&outcome.wallet, state.currency_exponent),
    }))
}

/// POST /api/transfer
pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let amount = to_minor_units(req.amount, state.currency_exponent)?;
    let outcome = state.ledger.transfer(
        &req.sender_id,
        &req.receiver_id,
        amount,
        req.description.as_deref(),
    )?;
    state.persist();
    Ok(Json(TransferResponse {
        transaction: txn_response(&outcome.debit, state.currency_exponent),
        sender_wallet: wallet_response(&outcome.sender_wallet, state.currency_exponent),
        receiver_wallet: wallet_response(&outcome.receiver_wallet, state.currency_exponent),
    }))
}

/// POST /api/deals/fund
pub async fn fund_deal(
    State(state): State<AppState>,
    Json(req): Json<FundDealRequest>,
) -> Result<Json<FundDealResponse>, ApiError> {
    let amount = to_minor_units(req.amount, state.currency_exponent)?;
    let outcome = state.ledger.fund_deal(
        &req.investor_id,
        &req.entrepreneur_id,
        &req.deal_id,
        &req.deal_name,
        amount,
    )?;
    state.persist();
    Ok(Json(FundDealResponse {
        transaction: txn_response(&outcome.debit, state.currency_exponent),
        receipt: txn_response(&outcome.credit, state.currency_exponent),
        investor_wallet: wallet_response(&outcome.sender_wallet, state.currency_exponent),
        entrepreneur_wallet: wallet_response(&outcome.receiver_wallet, state.currency_exponent),
    }))
}
