// In-memory backend: RwLock-guarded vectors, one per collection.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::models::{
    AnalyticsSnapshot, Creator, CreatorPatch, LinkPatch, Payment, ShareableLink, SnapshotDelta,
};
use crate::store::{Store, StoreResult};

#[derive(Default)]
struct Collections {
    creators: Vec<Creator>,
    payments: Vec<Payment>,
    links: Vec<ShareableLink>,
    snapshots: Vec<AnalyticsSnapshot>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_creator(&self, creator: Creator) -> StoreResult<Creator> {
        let mut inner = self.inner.write().await;
        inner.creators.push(creator.clone());
        Ok(creator)
    }

    async fn creator_by_id(&self, id: &str) -> StoreResult<Option<Creator>> {
        let inner = self.inner.read().await;
        Ok(inner.creators.iter().find(|c| c.id == id).cloned())
    }

    async fn creator_by_email(&self, email: &str) -> StoreResult<Option<Creator>> {
        let inner = self.inner.read().await;
        Ok(inner.creators.iter().find(|c| c.email == email).cloned())
    }

    async fn creator_by_username(&self, username: &str) -> StoreResult<Option<Creator>> {
        let inner = self.inner.read().await;
        Ok(inner
            .creators
            .iter()
            .find(|c| c.username == username)
            .cloned())
    }

    async fn creator_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Creator>> {
        let inner = self.inner.read().await;
        Ok(inner
            .creators
            .iter()
            .find(|c| c.wallet_address == wallet_address)
            .cloned())
    }

    async fn update_creator(
        &self,
        id: &str,
        patch: CreatorPatch,
    ) -> StoreResult<Option<Creator>> {
        let mut inner = self.inner.write().await;
        match inner.creators.iter_mut().find(|c| c.id == id) {
            Some(creator) => {
                patch.apply(creator);
                Ok(Some(creator.clone()))
            }
            None => Ok(None),
        }
    }

    async fn insert_payment(&self, payment: Payment) -> StoreResult<Payment> {
        let mut inner = self.inner.write().await;
        inner.payments.push(payment.clone());
        Ok(payment)
    }

    async fn payment_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.iter().find(|p| p.tx_hash == tx_hash).cloned())
    }

    async fn payments_for_creator(
        &self,
        creator_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Payment>> {
        let inner = self.inner.read().await;
        let mut payments: Vec<Payment> = inner
            .payments
            .iter()
            .filter(|p| p.creator_id == creator_id)
            .filter(|p| start.map_or(true, |s| p.timestamp >= s))
            .filter(|p| end.map_or(true, |e| p.timestamp <= e))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(payments)
    }

    async fn count_payments(&self, creator_id: &str) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.creator_id == creator_id)
            .count() as u64)
    }

    async fn insert_link(&self, link: ShareableLink) -> StoreResult<ShareableLink> {
        let mut inner = self.inner.write().await;
        inner.links.push(link.clone());
        Ok(link)
    }

    async fn link_by_id(&self, id: &str) -> StoreResult<Option<ShareableLink>> {
        let inner = self.inner.read().await;
        Ok(inner.links.iter().find(|l| l.id == id).cloned())
    }

    async fn link_by_slug(&self, slug: &str) -> StoreResult<Option<ShareableLink>> {
        let inner = self.inner.read().await;
        Ok(inner.links.iter().find(|l| l.slug == slug).cloned())
    }

    async fn links_for_creator(&self, creator_id: &str) -> StoreResult<Vec<ShareableLink>> {
        let inner = self.inner.read().await;
        let mut links: Vec<ShareableLink> = inner
            .links
            .iter()
            .filter(|l| l.creator_id == creator_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn update_link(&self, id: &str, patch: LinkPatch) -> StoreResult<Option<ShareableLink>> {
        let mut inner = self.inner.write().await;
        match inner.links.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                patch.apply(link);
                Ok(Some(link.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_link(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.links.len();
        inner.links.retain(|l| l.id != id);
        Ok(inner.links.len() < before)
    }

    async fn increment_link_clicks(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(link) = inner.links.iter_mut().find(|l| l.id == id) {
            link.click_count += 1;
        }
        Ok(())
    }

    async fn bump_snapshot(
        &self,
        creator_id: &str,
        date: NaiveDate,
        delta: SnapshotDelta,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .snapshots
            .iter_mut()
            .find(|s| s.creator_id == creator_id && s.date == date)
        {
            Some(snapshot) => snapshot.apply(&delta),
            None => {
                let mut snapshot = AnalyticsSnapshot::new(creator_id.to_string(), date);
                snapshot.apply(&delta);
                inner.snapshots.push(snapshot);
            }
        }
        Ok(())
    }

    async fn snapshots_for_creator(
        &self,
        creator_id: &str,
    ) -> StoreResult<Vec<AnalyticsSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .iter()
            .filter(|s| s.creator_id == creator_id)
            .cloned()
            .collect())
    }
}
