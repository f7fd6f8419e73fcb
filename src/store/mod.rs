// Storage layer: one capability contract, three interchangeable backends.
//
// Uniqueness of email/username/wallet/slug/tx-hash is enforced check-then-act
// in the handler layer, so two concurrent writers with the same key can both
// pass the check. The postgres schema carries unique indexes as a backstop;
// the memory and file backends do not.

mod file;
mod memory;
mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{
    AnalyticsSnapshot, Creator, CreatorPatch, LinkPatch, Payment, ShareableLink, SnapshotDelta,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD contract over the four entity collections, uniform across backends.
///
/// Backends perform no uniqueness or schema validation; callers pre-check.
#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity probe for the health endpoint. Backends without an
    /// external dependency are always reachable.
    async fn ping(&self) -> bool {
        true
    }

    // Creators
    async fn insert_creator(&self, creator: Creator) -> StoreResult<Creator>;
    async fn creator_by_id(&self, id: &str) -> StoreResult<Option<Creator>>;
    async fn creator_by_email(&self, email: &str) -> StoreResult<Option<Creator>>;
    async fn creator_by_username(&self, username: &str) -> StoreResult<Option<Creator>>;
    async fn creator_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Creator>>;
    async fn update_creator(&self, id: &str, patch: CreatorPatch)
        -> StoreResult<Option<Creator>>;

    // Payments
    async fn insert_payment(&self, payment: Payment) -> StoreResult<Payment>;
    async fn payment_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<Payment>>;
    /// All payments for a creator within the optional time range, newest first.
    async fn payments_for_creator(
        &self,
        creator_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Payment>>;
    async fn count_payments(&self, creator_id: &str) -> StoreResult<u64>;

    // Shareable links
    async fn insert_link(&self, link: ShareableLink) -> StoreResult<ShareableLink>;
    async fn link_by_id(&self, id: &str) -> StoreResult<Option<ShareableLink>>;
    async fn link_by_slug(&self, slug: &str) -> StoreResult<Option<ShareableLink>>;
    /// All links owned by a creator, newest first.
    async fn links_for_creator(&self, creator_id: &str) -> StoreResult<Vec<ShareableLink>>;
    async fn update_link(&self, id: &str, patch: LinkPatch)
        -> StoreResult<Option<ShareableLink>>;
    /// Returns whether a row was removed.
    async fn delete_link(&self, id: &str) -> StoreResult<bool>;
    async fn increment_link_clicks(&self, id: &str) -> StoreResult<()>;

    // Analytics snapshots
    /// Upsert: adds the delta counters to the (creator_id, date) rollup,
    /// creating it when absent.
    async fn bump_snapshot(
        &self,
        creator_id: &str,
        date: NaiveDate,
        delta: SnapshotDelta,
    ) -> StoreResult<()>;
    async fn snapshots_for_creator(
        &self,
        creator_id: &str,
    ) -> StoreResult<Vec<AnalyticsSnapshot>>;
}
