// SuiNS validation and resolution endpoints

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::sui::{normalize_suins_name, validate_and_resolve};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub name_or_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Classifies a recipient string as a wallet address or a SuiNS name and
/// resolves it either way.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let input = req
        .name_or_address
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Name or address is required"))?;

    let resolution = validate_and_resolve(state.names.as_ref(), input.trim()).await?;

    let mut body = serde_json::to_value(&resolution)
        .map_err(|e| ApiError::Internal(e.into()))?;
    body["input"] = serde_json::Value::String(input);
    body["timestamp"] = serde_json::Value::String(Utc::now().to_rfc3339());
    Ok(Json(body))
}

/// Direct lookups: `?name=` resolves a SuiNS name to its address, `?address=`
/// reverse-resolves an address to its primary name.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(name) = query.name.filter(|s| !s.trim().is_empty()) {
        let normalized = normalize_suins_name(&name);
        let resolved = match &normalized {
            Some(n) => state.names.resolve_name(n).await?,
            None => None,
        };
        let is_registered = resolved.is_some();
        return Ok(Json(serde_json::json!({
            "name": normalized.unwrap_or(name),
            "address": resolved,
            "isRegistered": is_registered,
        })));
    }

    if let Some(address) = query.address.filter(|s| !s.trim().is_empty()) {
        let name = state.names.name_for_address(&address).await?;
        let has_name = name.is_some();
        return Ok(Json(serde_json::json!({
            "address": address,
            "name": name,
            "hasName": has_name,
        })));
    }

    Err(ApiError::bad_request("Name or address parameter is required"))
}
