// Authenticated analytics endpoint

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::analytics::{self, DEFAULT_PERIOD_DAYS};
use crate::auth::AuthClaims;
use crate::error::ApiError;
use crate::AppState;

const MAX_PERIOD_DAYS: u32 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let period = query
        .period
        .unwrap_or(DEFAULT_PERIOD_DAYS)
        .clamp(1, MAX_PERIOD_DAYS);

    let report = analytics::creator_analytics(state.store.as_ref(), &claims.creator_id, period)
        .await?;

    match query.kind.as_deref().unwrap_or("overview") {
        "overview" => Ok(Json(serde_json::json!({
            "overview": report.overview,
            "recentPayments": report.recent_payments,
            "chartData": report.chart_data,
        }))),
        "payments" => Ok(Json(serde_json::json!({
            "payments": analytics::daily_payment_stats(&report.chart_data),
            "period": period,
        }))),
        "donors" => {
            let payments = state
                .store
                .payments_for_creator(
                    &claims.creator_id,
                    Some(analytics::window_start(chrono::Utc::now(), period)),
                    Some(chrono::Utc::now()),
                )
                .await?;
            Ok(Json(serde_json::json!({
                "topDonors": analytics::top_donors(&payments),
                "period": period,
            })))
        }
        _ => Err(ApiError::bad_request("Invalid analytics type")),
    }
}
