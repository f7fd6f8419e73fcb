// Payment history (authenticated) and on-chain tip ingestion.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthClaims;
use crate::error::ApiError;
use crate::models::{Pagination, Payment, SnapshotDelta};
use crate::sui::wait_for_transaction;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub total_amount: f64,
    pub total_payments: u64,
    pub average_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub pagination: Pagination,
    pub summary: PaymentSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub tx_hash: Option<String>,
    pub creator_id: Option<String>,
    pub message: Option<String>,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub message: String,
    pub payment: Payment,
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as midnight UTC).
fn parse_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        .map_err(|_| ApiError::bad_request("Invalid date format"))
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let start = query.start_date.as_deref().map(parse_date).transpose()?;
    let end = query.end_date.as_deref().map(parse_date).transpose()?;

    let all = state
        .store
        .payments_for_creator(&claims.creator_id, start, end)
        .await?;

    let total_amount: f64 = all.iter().map(|p| p.amount).sum();
    let total_payments = all.len() as u64;
    let summary = PaymentSummary {
        total_amount,
        total_payments,
        average_amount: if total_payments > 0 {
            total_amount / total_payments as f64
        } else {
            0.0
        },
    };

    let offset = (page - 1) as usize * limit as usize;
    let payments: Vec<Payment> = all
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    Ok(Json(PaymentListResponse {
        payments,
        pagination: Pagination::new(page, limit, total_payments),
        summary,
    }))
}

/// Verifies a submitted transaction digest against the chain and records the
/// tip. The recorded amount is what the creator's wallet actually received,
/// never what the client claims.
pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), ApiError> {
    let (Some(tx_hash), Some(creator_id)) = (req.tx_hash, req.creator_id) else {
        return Err(ApiError::bad_request(
            "Transaction hash and creator ID are required",
        ));
    };

    if state.store.payment_by_tx_hash(&tx_hash).await?.is_some() {
        return Err(ApiError::conflict("Payment already recorded"));
    }

    let creator = state
        .store
        .creator_by_id(&creator_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Creator not found"))?;

    let details = if state.wait_for_confirmation {
        wait_for_transaction(state.chain.as_ref(), &tx_hash).await?
    } else {
        state.chain.transaction_details(&tx_hash).await?
    };

    let amount = details
        .sui_received_by(&creator.wallet_address)
        .ok_or_else(|| ApiError::bad_request("No valid payment found in transaction"))?;

    let mut payment = Payment::new(
        tx_hash,
        amount,
        details.sender,
        creator.wallet_address,
        details.checkpoint,
        details.timestamp,
        creator.id,
    );
    payment.message = req.message;
    payment.is_anonymous = req.is_anonymous;
    if !req.is_anonymous {
        payment.donor_name = req.donor_name;
        payment.donor_email = req.donor_email;
    }

    let payment = state.store.insert_payment(payment).await?;
    info!(
        "Recorded payment {} of {} SUI for creator {}",
        payment.tx_hash, payment.amount, payment.creator_id
    );

    // Rollup maintenance is best effort; the payment itself is already durable.
    if let Err(err) = state
        .store
        .bump_snapshot(
            &payment.creator_id,
            payment.timestamp.date_naive(),
            SnapshotDelta::payment(payment.amount),
        )
        .await
    {
        warn!("Failed to update analytics snapshot: {err}");
    }

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse {
            message: "Payment recorded successfully".to_string(),
            payment,
        }),
    ))
}
