// Authenticated creator profile endpoints

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthClaims;
use crate::error::ApiError;
use crate::models::{Creator, CreatorPatch};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileCounts {
    pub payments: u64,
    pub links: u64,
}

#[derive(Debug, Serialize)]
pub struct CreatorWithCounts {
    #[serde(flatten)]
    pub creator: Creator,
    #[serde(rename = "_count")]
    pub counts: ProfileCounts,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub creator: CreatorWithCounts,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub creator: Creator,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
) -> Result<Json<ProfileResponse>, ApiError> {
    let creator = state
        .store
        .creator_by_id(&claims.creator_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Creator not found"))?;

    let payments = state.store.count_payments(&creator.id).await?;
    let links = state.store.links_for_creator(&creator.id).await?;

    Ok(Json(ProfileResponse {
        creator: CreatorWithCounts {
            creator,
            counts: ProfileCounts {
                payments,
                links: links.len() as u64,
            },
        },
    }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    claims: AuthClaims,
    Json(patch): Json<CreatorPatch>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let creator = state
        .store
        .update_creator(&claims.creator_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Creator not found"))?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        creator,
    }))
}
