// Unauthenticated creator pages and shareable-link resolution.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::models::{PublicCreator, PublicPayment, ShareableLink, SnapshotDelta};
use crate::AppState;

const RECENT_FEED_LEN: usize = 5;

#[derive(Debug, Serialize)]
pub struct PublicCounts {
    pub payments: usize,
    pub links: usize,
}

#[derive(Debug, Serialize)]
pub struct PublicCreatorWithCounts {
    #[serde(flatten)]
    pub creator: PublicCreator,
    #[serde(rename = "_count")]
    pub counts: PublicCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStats {
    pub total_payments: u64,
    pub total_amount: f64,
    pub supporters: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCreatorResponse {
    pub creator: PublicCreatorWithCounts,
    pub recent_payments: Vec<PublicPayment>,
    pub stats: PublicStats,
}

#[derive(Debug, Serialize)]
pub struct PublicLinkResponse {
    pub link: ShareableLink,
    pub creator: PublicCreator,
}

pub async fn get_public_creator(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicCreatorResponse>, ApiError> {
    let creator = state
        .store
        .creator_by_username(&username.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::not_found("Creator not found"))?;

    let payments = state
        .store
        .payments_for_creator(&creator.id, None, None)
        .await?;
    let links = state.store.links_for_creator(&creator.id).await?;

    let recent_payments: Vec<PublicPayment> = payments
        .iter()
        .filter(|p| !p.is_anonymous)
        .take(RECENT_FEED_LEN)
        .map(PublicPayment::from)
        .collect();

    let stats = PublicStats {
        total_payments: payments.len() as u64,
        total_amount: payments.iter().map(|p| p.amount).sum(),
        supporters: payments
            .iter()
            .map(|p| p.from_address.as_str())
            .collect::<HashSet<_>>()
            .len() as u64,
    };

    // View counting never blocks the page.
    if let Err(err) = state
        .store
        .bump_snapshot(
            &creator.id,
            chrono::Utc::now().date_naive(),
            SnapshotDelta::profile_view(),
        )
        .await
    {
        warn!("Failed to count profile view: {err}");
    }

    Ok(Json(PublicCreatorResponse {
        creator: PublicCreatorWithCounts {
            counts: PublicCounts {
                payments: payments.len(),
                links: links.len(),
            },
            creator: PublicCreator::from(&creator),
        },
        recent_payments,
        stats,
    }))
}

pub async fn get_public_link(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<PublicLinkResponse>, ApiError> {
    let link = state
        .store
        .link_by_slug(&slug)
        .await?
        .filter(|l| l.is_active)
        .ok_or_else(|| ApiError::not_found("Link not found or inactive"))?;

    let creator = state
        .store
        .creator_by_id(&link.creator_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Link not found or inactive"))?;

    // The response carries the pre-visit count; the increment lands after.
    if let Err(err) = state.store.increment_link_clicks(&link.id).await {
        warn!("Failed to count link click: {err}");
    }
    if let Err(err) = state
        .store
        .bump_snapshot(
            &creator.id,
            chrono::Utc::now().date_naive(),
            SnapshotDelta::link_click(),
        )
        .await
    {
        warn!("Failed to count link click in snapshot: {err}");
    }

    Ok(Json(PublicLinkResponse {
        link,
        creator: PublicCreator::from(&creator),
    }))
}
