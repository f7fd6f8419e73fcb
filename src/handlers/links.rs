// Shareable link management (authenticated, ownership-checked)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthClaims;
use crate::error::ApiError;
use crate::models::{LinkPatch, ShareableLink};
use crate::slug::{slugify, unique_slug};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub button_text: Option<String>,
    pub theme: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<ShareableLink>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub message: String,
    pub link: ShareableLink,
}

pub async fn list_links(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
) -> Result<Json<LinksResponse>, ApiError> {
    let links = state.store.links_for_creator(&claims.creator_id).await?;
    Ok(Json(LinksResponse { links }))
}

pub async fn create_link(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;

    // An all-punctuation title derives an empty slug, which no public route
    // could ever resolve.
    if slugify(&title).is_empty() {
        return Err(ApiError::bad_request(
            "Title must contain at least one letter or number",
        ));
    }

    let slug = unique_slug(state.store.as_ref(), &title).await?;
    let link = state
        .store
        .insert_link(ShareableLink::new(
            slug,
            title,
            req.description,
            req.button_text,
            req.theme,
            claims.creator_id,
        ))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            message: "Link created successfully".to_string(),
            link,
        }),
    ))
}

/// Loads a link and rejects with not-found when it is missing or belongs to
/// another creator. Ownership failures are indistinguishable from absence.
async fn owned_link(
    state: &AppState,
    link_id: &str,
    owner_id: &str,
) -> Result<ShareableLink, ApiError> {
    state
        .store
        .link_by_id(link_id)
        .await?
        .filter(|link| link.creator_id == owner_id)
        .ok_or_else(|| ApiError::not_found("Link not found"))
}

pub async fn update_link(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Path(link_id): Path<String>,
    Json(patch): Json<LinkPatch>,
) -> Result<Json<LinkResponse>, ApiError> {
    owned_link(&state, &link_id, &claims.creator_id).await?;

    let link = state
        .store
        .update_link(&link_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Link not found"))?;

    Ok(Json(LinkResponse {
        message: "Link updated successfully".to_string(),
        link,
    }))
}

pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Path(link_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    owned_link(&state, &link_id, &claims.creator_id).await?;

    state.store.delete_link(&link_id).await?;

    Ok(Json(serde_json::json!({
        "message": "Link deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::auth::tests::{register_request, test_state, wallet};
    use crate::handlers::auth::register;

    async fn claims_for(state: &Arc<AppState>, email: &str, username: &str, w: char) -> AuthClaims {
        let (_, Json(resp)) = register(
            State(state.clone()),
            Json(register_request(email, username, &wallet(w))),
        )
        .await
        .unwrap();
        state.auth.validate(&resp.token).unwrap()
    }

    fn titled(title: &str) -> CreateLinkRequest {
        CreateLinkRequest {
            title: Some(title.into()),
            description: None,
            button_text: None,
            theme: None,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_slug() {
        let state = test_state();
        let claims = claims_for(&state, "a@x.com", "alice", 'a').await;

        let (status, Json(resp)) =
            create_link(State(state.clone()), claims, Json(titled("Support My Work!!!")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp.link.slug, "support-my-work");
        assert_eq!(resp.link.button_text, "Support Me");
        assert_eq!(resp.link.theme, "default");
        assert!(resp.link.is_active);
        assert_eq!(resp.link.click_count, 0);
    }

    #[tokio::test]
    async fn same_title_twice_gets_suffixed_slug() {
        let state = test_state();
        let claims = claims_for(&state, "a@x.com", "alice", 'a').await;

        let (_, Json(first)) = create_link(
            State(state.clone()),
            claims.clone(),
            Json(titled("Support My Work!!!")),
        )
        .await
        .unwrap();
        let (_, Json(second)) = create_link(
            State(state.clone()),
            claims,
            Json(titled("Support My Work!!!")),
        )
        .await
        .unwrap();

        assert_eq!(first.link.slug, "support-my-work");
        assert_eq!(second.link.slug, "support-my-work-1");
    }

    #[tokio::test]
    async fn missing_title_is_rejected() {
        let state = test_state();
        let claims = claims_for(&state, "a@x.com", "alice", 'a').await;

        let err = create_link(
            State(state),
            claims,
            Json(CreateLinkRequest {
                title: None,
                description: None,
                button_text: None,
                theme: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn all_punctuation_title_is_rejected() {
        let state = test_state();
        let claims = claims_for(&state, "a@x.com", "alice", 'a').await;

        let err = create_link(State(state.clone()), claims, Json(titled("!!!")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(state.store.link_by_slug("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_creators_cannot_touch_a_link() {
        let state = test_state();
        let alice = claims_for(&state, "a@x.com", "alice", 'a').await;
        let bob = claims_for(&state, "b@x.com", "bob", 'b').await;

        let (_, Json(created)) =
            create_link(State(state.clone()), alice.clone(), Json(titled("Mine")))
                .await
                .unwrap();

        let err = update_link(
            State(state.clone()),
            bob.clone(),
            Path(created.link.id.clone()),
            Json(LinkPatch::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = delete_link(State(state.clone()), bob, Path(created.link.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // The owner still can.
        let patch = LinkPatch {
            is_active: Some(false),
            ..Default::default()
        };
        let Json(updated) = update_link(
            State(state.clone()),
            alice.clone(),
            Path(created.link.id.clone()),
            Json(patch),
        )
        .await
        .unwrap();
        assert!(!updated.link.is_active);

        delete_link(State(state.clone()), alice, Path(created.link.id.clone()))
            .await
            .unwrap();
        assert!(state
            .store
            .link_by_id(&created.link.id)
            .await
            .unwrap()
            .is_none());
    }
}
