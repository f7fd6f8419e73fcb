// Sui collaborators: chain inspection and SuiNS resolution over JSON-RPC.
//
// The rest of the app only sees the ChainInspector and NameService traits;
// SuiClient implements both against a configured fullnode.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// MIST per SUI: the chain's base unit vs the display unit.
pub const MIST_PER_SUI: f64 = 1_000_000_000.0;

const CONFIRMATION_ATTEMPTS: u32 = 30;
const CONFIRMATION_SPACING: Duration = Duration::from_secs(2);

pub fn mist_to_sui(mist: i128) -> f64 {
    mist as f64 / MIST_PER_SUI
}

#[derive(Debug, Error)]
pub enum SuiError {
    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    #[error("RPC error: {message} ({code})")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("confirmation timeout for {0}")]
    ConfirmationTimeout(String),
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// One entry of a transaction's balance-change list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    /// Owner descriptor as returned by the node, e.g. `{"AddressOwner": "0x.."}`.
    pub owner: Value,
    pub coin_type: String,
    /// Signed base-unit amount as a decimal string.
    pub amount: String,
}

impl BalanceChange {
    pub fn address(&self) -> Option<&str> {
        self.owner["AddressOwner"].as_str()
    }

    pub fn amount_mist(&self) -> i128 {
        self.amount.parse().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBlock {
    digest: String,
    transaction: Option<Value>,
    balance_changes: Option<Vec<BalanceChange>>,
    timestamp_ms: Option<String>,
    checkpoint: Option<String>,
}

/// What the app needs from a confirmed transaction.
#[derive(Debug, Clone)]
pub struct TransactionDetails {
    pub digest: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    pub checkpoint: Option<i64>,
    pub balance_changes: Vec<BalanceChange>,
}

impl TransactionDetails {
    /// The positive SUI amount (display units) transferred to `address`, if any.
    pub fn sui_received_by(&self, address: &str) -> Option<f64> {
        self.balance_changes
            .iter()
            .filter(|c| c.coin_type == "0x2::sui::SUI")
            .filter(|c| c.address() == Some(address))
            .map(|c| c.amount_mist())
            .find(|&mist| mist > 0)
            .map(mist_to_sui)
    }
}

impl From<TransactionBlock> for TransactionDetails {
    fn from(block: TransactionBlock) -> Self {
        let sender = block
            .transaction
            .as_ref()
            .and_then(|tx| tx["data"]["sender"].as_str())
            .unwrap_or_default()
            .to_string();
        let timestamp = block
            .timestamp_ms
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);
        let checkpoint = block
            .checkpoint
            .as_deref()
            .and_then(|c| c.parse::<i64>().ok());
        Self {
            digest: block.digest,
            sender,
            timestamp,
            checkpoint,
            balance_changes: block.balance_changes.unwrap_or_default(),
        }
    }
}

/// Inspection of confirmed on-chain transfers.
#[async_trait]
pub trait ChainInspector: Send + Sync {
    async fn transaction_details(&self, digest: &str) -> Result<TransactionDetails, SuiError>;

    /// Reachability probe for the health endpoint.
    async fn ping(&self) -> bool {
        true
    }
}

/// Human-readable handle <-> wallet address resolution.
#[async_trait]
pub trait NameService: Send + Sync {
    /// Resolves a SuiNS name to a wallet address, `None` when unregistered.
    async fn resolve_name(&self, name: &str) -> Result<Option<String>, SuiError>;
    /// Reverse lookup: the primary SuiNS name for an address, if any.
    async fn name_for_address(&self, address: &str) -> Result<Option<String>, SuiError>;
}

pub struct SuiClient {
    http: HttpClient,
    rpc_url: String,
}

impl SuiClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            http: HttpClient::new(),
            rpc_url,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SuiError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self.http.post(&self.rpc_url).json(&payload).send().await?;
        let rpc_resp: RpcResponse<T> = resp.json().await?;

        if let Some(error) = rpc_resp.error {
            return Err(SuiError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        rpc_resp.result.ok_or(SuiError::Rpc {
            code: 0,
            message: "no result in RPC response".to_string(),
        })
    }
}

#[async_trait]
impl ChainInspector for SuiClient {
    async fn ping(&self) -> bool {
        self.call::<String>("sui_getChainIdentifier", json!([]))
            .await
            .is_ok()
    }

    async fn transaction_details(&self, digest: &str) -> Result<TransactionDetails, SuiError> {
        let params = json!([digest, { "showInput": true, "showBalanceChanges": true }]);
        match self
            .call::<TransactionBlock>("sui_getTransactionBlock", params)
            .await
        {
            Ok(block) => Ok(block.into()),
            // The node reports an unknown digest as an RPC-level error.
            Err(SuiError::Rpc { message, .. }) if message.contains("Could not find") => {
                Err(SuiError::TransactionNotFound(digest.to_string()))
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl NameService for SuiClient {
    async fn resolve_name(&self, name: &str) -> Result<Option<String>, SuiError> {
        let Some(normalized) = normalize_suins_name(name) else {
            return Ok(None);
        };
        let resolved: Option<String> = self
            .call("suix_resolveNameServiceAddress", json!([normalized]))
            .await?;
        info!("Resolved SuiNS name {} -> {:?}", normalized, resolved);
        Ok(resolved)
    }

    async fn name_for_address(&self, address: &str) -> Result<Option<String>, SuiError> {
        #[derive(Deserialize)]
        struct NamePage {
            data: Vec<String>,
        }
        let page: NamePage = self
            .call("suix_resolveNameServiceNames", json!([address]))
            .await?;
        Ok(page.data.into_iter().next())
    }
}

/// Polls for a transaction until the node knows it: up to 30 attempts,
/// 2 seconds apart. Any lookup failure counts as "not confirmed yet".
pub async fn wait_for_transaction(
    chain: &dyn ChainInspector,
    digest: &str,
) -> Result<TransactionDetails, SuiError> {
    for _ in 0..CONFIRMATION_ATTEMPTS {
        if let Ok(details) = chain.transaction_details(digest).await {
            return Ok(details);
        }
        tokio::time::sleep(CONFIRMATION_SPACING).await;
    }
    Err(SuiError::ConfirmationTimeout(digest.to_string()))
}

/// Strips a leading `@` and any `.sui` suffix, lowercases, and appends `.sui`.
/// Returns `None` for names that cannot be a SuiNS label.
pub fn normalize_suins_name(name: &str) -> Option<String> {
    let label = name
        .trim()
        .trim_start_matches('@')
        .trim_end_matches(".sui")
        .to_lowercase();
    let valid_label = !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid_label.then(|| format!("{label}.sui"))
}

/// Accepts `0x`-prefixed hex of 40 to 64 digits (20- or 32-byte forms).
pub fn is_valid_sui_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(rest) => {
            (40..=64).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

pub fn normalize_sui_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    let with_prefix = if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{address}")
    };
    with_prefix.to_lowercase()
}

/// Short display form: `0x1234...abcd`.
pub fn format_sui_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Classification of a user-supplied recipient string.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResolutionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    Address,
    Suins,
    Invalid,
}

/// Validates a wallet address or resolves a SuiNS name, as the input dictates.
pub async fn validate_and_resolve(
    names: &dyn NameService,
    name_or_address: &str,
) -> Result<Resolution, SuiError> {
    if name_or_address.is_empty() {
        return Ok(Resolution {
            is_valid: false,
            resolved_address: None,
            display_name: None,
            kind: ResolutionKind::Invalid,
        });
    }

    if is_valid_sui_address(name_or_address) {
        let suins_name = names.name_for_address(name_or_address).await?;
        return Ok(Resolution {
            is_valid: true,
            resolved_address: Some(normalize_sui_address(name_or_address)),
            display_name: Some(
                suins_name.unwrap_or_else(|| format_sui_address(name_or_address)),
            ),
            kind: ResolutionKind::Address,
        });
    }

    if let Some(normalized) = normalize_suins_name(name_or_address) {
        if let Some(resolved) = names.resolve_name(&normalized).await? {
            return Ok(Resolution {
                is_valid: true,
                resolved_address: Some(resolved),
                display_name: Some(format!("@{normalized}")),
                kind: ResolutionKind::Suins,
            });
        }
    }

    Ok(Resolution {
        is_valid: false,
        resolved_address: None,
        display_name: None,
        kind: ResolutionKind::Invalid,
    })
}
