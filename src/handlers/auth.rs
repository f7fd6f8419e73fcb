// Registration, login, logout

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::models::Creator;
use crate::sui::is_valid_sui_address;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub wallet_address: Option<String>,
    pub sui_name_service: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub creator: Creator,
    pub token: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (Some(email), Some(username), Some(display_name), Some(wallet_address)) = (
        req.email,
        req.username,
        req.display_name,
        req.wallet_address,
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    if !is_valid_sui_address(&wallet_address) {
        return Err(ApiError::bad_request("Invalid wallet address"));
    }

    // Check-then-act: not atomic, two concurrent registrations with the same
    // key can both pass. The postgres backend's unique indexes backstop this.
    if state.store.creator_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Creator with this email already exists"));
    }
    if state
        .store
        .creator_by_username(&username.to_lowercase())
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "Creator with this username already exists",
        ));
    }
    if state
        .store
        .creator_by_wallet(&wallet_address)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "Creator with this wallet address already exists",
        ));
    }

    if let Some(name) = &req.sui_name_service {
        if let Some(resolved) = state.names.resolve_name(name).await? {
            if resolved != wallet_address {
                return Err(ApiError::bad_request(
                    "SUI Name Service does not resolve to provided wallet address",
                ));
            }
        }
    }

    let creator = state
        .store
        .insert_creator(Creator::new(
            email,
            username,
            display_name,
            wallet_address,
            req.sui_name_service,
            req.bio,
            req.avatar,
        ))
        .await?;

    info!("Registered creator {} ({})", creator.username, creator.id);

    let token = state
        .auth
        .issue(&creator.id, &creator.email, &creator.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Creator registered successfully".to_string(),
            creator,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let creator = if let Some(email) = &req.email {
        state.store.creator_by_email(email).await?
    } else if let Some(wallet) = &req.wallet_address {
        state.store.creator_by_wallet(wallet).await?
    } else {
        return Err(ApiError::bad_request("Email or wallet address is required"));
    };

    let creator = creator.ok_or_else(|| ApiError::not_found("Creator not found"))?;

    let token = state
        .auth
        .issue(&creator.id, &creator.email, &creator.username);

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        creator,
        token,
    }))
}

/// No server-side session state exists, so logout only acknowledges the
/// client-side discard; the token stays valid until its natural expiry.
pub async fn logout(headers: HeaderMap) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    ) {
        info!("Logout requested; token discarded client-side ({} bytes)", token.len());
    }

    Json(serde_json::json!({ "message": "Logout successful" }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::TokenSigner;
    use crate::store::MemoryStore;
    use crate::sui::{ChainInspector, NameService, SuiError, TransactionDetails};
    use async_trait::async_trait;

    struct NoChain;

    #[async_trait]
    impl ChainInspector for NoChain {
        async fn transaction_details(
            &self,
            digest: &str,
        ) -> Result<TransactionDetails, SuiError> {
            Err(SuiError::TransactionNotFound(digest.to_string()))
        }
    }

    struct NoNames;

    #[async_trait]
    impl NameService for NoNames {
        async fn resolve_name(&self, _name: &str) -> Result<Option<String>, SuiError> {
            Ok(None)
        }

        async fn name_for_address(&self, _address: &str) -> Result<Option<String>, SuiError> {
            Ok(None)
        }
    }

    pub(crate) fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            store: Arc::new(MemoryStore::new()),
            chain: Arc::new(NoChain),
            names: Arc::new(NoNames),
            auth: Arc::new(TokenSigner::new(*b"unit-test-secret-unit-test-secre")),
            wait_for_confirmation: false,
        })
    }

    pub(crate) fn register_request(email: &str, username: &str, wallet: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.into()),
            username: Some(username.into()),
            display_name: Some(username.into()),
            wallet_address: Some(wallet.into()),
            sui_name_service: None,
            bio: None,
            avatar: None,
        }
    }

    pub(crate) fn wallet(fill: char) -> String {
        format!("0x{}", fill.to_string().repeat(64))
    }

    #[tokio::test]
    async fn register_issues_a_validating_token() {
        let state = test_state();
        let (status, Json(resp)) = register(
            State(state.clone()),
            Json(register_request("a@x.com", "Alice", &wallet('a'))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(!resp.token.is_empty());
        assert_eq!(resp.creator.username, "alice");

        let claims = state.auth.validate(&resp.token).unwrap();
        assert_eq!(claims.creator_id, resp.creator.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_regardless_of_other_fields() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(register_request("a@x.com", "alice", &wallet('a'))),
        )
        .await
        .unwrap();

        let err = register(
            State(state.clone()),
            Json(register_request("a@x.com", "bob", &wallet('b'))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_username_and_wallet_conflict() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(register_request("a@x.com", "alice", &wallet('a'))),
        )
        .await
        .unwrap();

        let err = register(
            State(state.clone()),
            Json(register_request("b@x.com", "ALICE", &wallet('b'))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = register(
            State(state.clone()),
            Json(register_request("c@x.com", "carol", &wallet('a'))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_bad_address() {
        let state = test_state();

        let mut req = register_request("a@x.com", "alice", &wallet('a'));
        req.email = None;
        let err = register(State(state.clone()), Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = register(
            State(state.clone()),
            Json(register_request("a@x.com", "alice", "0xshort")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_by_email_or_wallet() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(register_request("a@x.com", "alice", &wallet('a'))),
        )
        .await
        .unwrap();

        let Json(by_email) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("a@x.com".into()),
                wallet_address: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_email.creator.username, "alice");

        let Json(by_wallet) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: None,
                wallet_address: Some(wallet('a')),
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_wallet.creator.username, "alice");

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: None,
                wallet_address: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = login(
            State(state),
            Json(LoginRequest {
                email: Some("nobody@x.com".into()),
                wallet_address: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn logout_succeeds_without_a_token() {
        let Json(body) = logout(HeaderMap::new()).await;
        assert_eq!(body["message"], "Logout successful");
    }
}
