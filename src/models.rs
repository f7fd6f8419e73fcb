// Data model for the tipping backend

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// A registered payee who receives tips and owns links/payments.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub id: String,
    pub email: String,
    /// Stored lowercase; unique across all creators.
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub wallet_address: String,
    pub sui_name_service: Option<String>,
    pub is_verified: bool,
    pub twitter_handle: Option<String>,
    pub website_url: Option<String>,
    pub min_donation_amount: f64,
    pub custom_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Creator {
    pub fn new(
        email: String,
        username: String,
        display_name: String,
        wallet_address: String,
        sui_name_service: Option<String>,
        bio: Option<String>,
        avatar: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            email,
            username: username.to_lowercase(),
            display_name,
            bio,
            avatar,
            wallet_address,
            sui_name_service: sui_name_service.map(|n| n.to_lowercase()),
            is_verified: false,
            twitter_handle: None,
            website_url: None,
            min_donation_amount: 1.0,
            custom_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile edit. Absent fields leave the record untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorPatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub twitter_handle: Option<String>,
    pub website_url: Option<String>,
    pub min_donation_amount: Option<f64>,
    pub custom_message: Option<String>,
}

impl CreatorPatch {
    pub fn apply(&self, creator: &mut Creator) {
        if let Some(v) = &self.display_name {
            creator.display_name = v.clone();
        }
        if let Some(v) = &self.bio {
            creator.bio = Some(v.clone());
        }
        if let Some(v) = &self.avatar {
            creator.avatar = Some(v.clone());
        }
        if let Some(v) = &self.twitter_handle {
            creator.twitter_handle = Some(v.clone());
        }
        if let Some(v) = &self.website_url {
            creator.website_url = Some(v.clone());
        }
        if let Some(v) = self.min_donation_amount {
            creator.min_donation_amount = v;
        }
        if let Some(v) = &self.custom_message {
            creator.custom_message = Some(v.clone());
        }
        creator.updated_at = Utc::now();
    }
}

/// Public projection of a creator, safe for unauthenticated responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCreator {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub wallet_address: String,
    pub sui_name_service: Option<String>,
    pub min_donation_amount: f64,
    pub custom_message: Option<String>,
    pub twitter_handle: Option<String>,
    pub website_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Creator> for PublicCreator {
    fn from(c: &Creator) -> Self {
        Self {
            id: c.id.clone(),
            username: c.username.clone(),
            display_name: c.display_name.clone(),
            bio: c.bio.clone(),
            avatar: c.avatar.clone(),
            wallet_address: c.wallet_address.clone(),
            sui_name_service: c.sui_name_service.clone(),
            min_donation_amount: c.min_donation_amount,
            custom_message: c.custom_message.clone(),
            twitter_handle: c.twitter_handle.clone(),
            website_url: c.website_url.clone(),
            is_verified: c.is_verified,
            created_at: c.created_at,
        }
    }
}

/// Immutable record of a received on-chain tip.
///
/// `tx_hash` is the idempotency key: a transaction is recorded at most once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub tx_hash: String,
    /// Display units (SUI), converted from on-chain MIST.
    pub amount: f64,
    pub currency: String,
    pub message: Option<String>,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub is_anonymous: bool,
    pub from_address: String,
    pub to_address: String,
    pub block_height: Option<i64>,
    /// Event time from the chain, not ingestion time.
    pub timestamp: DateTime<Utc>,
    pub creator_id: String,
}

impl Payment {
    pub fn new(
        tx_hash: String,
        amount: f64,
        from_address: String,
        to_address: String,
        block_height: Option<i64>,
        timestamp: DateTime<Utc>,
        creator_id: String,
    ) -> Self {
        Self {
            id: generate_id(),
            tx_hash,
            amount,
            currency: "SUI".to_string(),
            message: None,
            donor_name: None,
            donor_email: None,
            is_anonymous: false,
            from_address,
            to_address,
            block_height,
            timestamp,
            creator_id,
        }
    }
}

/// Public projection of a payment. Donor contact details are never included;
/// anonymous payments are filtered out before this projection is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPayment {
    pub id: String,
    pub amount: f64,
    pub message: Option<String>,
    pub donor_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Payment> for PublicPayment {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id.clone(),
            amount: p.amount,
            message: p.message.clone(),
            donor_name: p.donor_name.clone(),
            timestamp: p.timestamp,
        }
    }
}

/// A public vanity entry point to a creator's payment page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShareableLink {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub button_text: String,
    pub theme: String,
    pub click_count: i64,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShareableLink {
    pub fn new(
        slug: String,
        title: String,
        description: Option<String>,
        button_text: Option<String>,
        theme: Option<String>,
        creator_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            slug,
            title,
            description,
            is_active: true,
            button_text: button_text.unwrap_or_else(|| "Support Me".to_string()),
            theme: theme.unwrap_or_else(|| "default".to_string()),
            click_count: 0,
            creator_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial link edit. Ownership is checked by the handler before applying.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub button_text: Option<String>,
    pub theme: Option<String>,
    pub is_active: Option<bool>,
}

impl LinkPatch {
    pub fn apply(&self, link: &mut ShareableLink) {
        if let Some(v) = &self.title {
            link.title = v.clone();
        }
        if let Some(v) = &self.description {
            link.description = Some(v.clone());
        }
        if let Some(v) = &self.button_text {
            link.button_text = v.clone();
        }
        if let Some(v) = &self.theme {
            link.theme = v.clone();
        }
        if let Some(v) = self.is_active {
            link.is_active = v;
        }
        link.updated_at = Utc::now();
    }
}

/// Per-creator, per-day rollup. At most one row per (creator_id, date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub id: String,
    pub creator_id: String,
    pub date: NaiveDate,
    pub total_payments: i64,
    pub total_amount: f64,
    /// Approximate: incremented per payment, not a recomputed distinct count.
    pub unique_donors: i64,
    pub average_amount: f64,
    pub profile_views: i64,
    pub link_clicks: i64,
}

impl AnalyticsSnapshot {
    pub fn new(creator_id: String, date: NaiveDate) -> Self {
        Self {
            id: generate_id(),
            creator_id,
            date,
            total_payments: 0,
            total_amount: 0.0,
            unique_donors: 0,
            average_amount: 0.0,
            profile_views: 0,
            link_clicks: 0,
        }
    }

    pub fn apply(&mut self, delta: &SnapshotDelta) {
        self.total_payments += delta.payments;
        self.total_amount += delta.amount;
        self.unique_donors += delta.unique_donors;
        self.profile_views += delta.profile_views;
        self.link_clicks += delta.link_clicks;
        self.average_amount = if self.total_payments > 0 {
            self.total_amount / self.total_payments as f64
        } else {
            0.0
        };
    }
}

/// Counter increments applied to a day's snapshot (upsert semantics).
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDelta {
    pub payments: i64,
    pub amount: f64,
    pub unique_donors: i64,
    pub profile_views: i64,
    pub link_clicks: i64,
}

impl SnapshotDelta {
    pub fn payment(amount: f64) -> Self {
        Self {
            payments: 1,
            amount,
            unique_donors: 1,
            ..Default::default()
        }
    }

    pub fn profile_view() -> Self {
        Self {
            profile_views: 1,
            ..Default::default()
        }
    }

    pub fn link_click() -> Self {
        Self {
            profile_views: 1,
            link_clicks: 1,
            ..Default::default()
        }
    }
}

/// Offset pagination metadata returned by list endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}
