// Flat-file backend: one JSON array file per collection.
//
// All operations are best-effort: I/O failures are logged and degrade to
// empty reads or dropped writes rather than surfacing errors. A Mutex
// serializes the read-modify-write cycle within one process; nothing guards
// against a second process on the same data directory.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::error;

use crate::models::{
    AnalyticsSnapshot, Creator, CreatorPatch, LinkPatch, Payment, ShareableLink, SnapshotDelta,
};
use crate::store::{Store, StoreError, StoreResult};

const CREATORS_FILE: &str = "creators.json";
const PAYMENTS_FILE: &str = "payments.json";
const LINKS_FILE: &str = "links.json";
const ANALYTICS_FILE: &str = "analytics.json";

pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Reads a whole collection. Missing files yield an empty collection;
    /// read or parse failures are logged and also yield empty.
    fn load<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        match read_collection(&self.path(name)) {
            Ok(items) => items,
            Err(err) => {
                error!("Failed to read {}: {}", name, err);
                Vec::new()
            }
        }
    }

    /// Rewrites a whole collection. Failures are logged and the write is lost.
    fn save<T: Serialize>(&self, name: &str, items: &[T]) {
        if let Err(err) = write_collection(&self.dir, &self.path(name), items) {
            error!("Failed to write {}: {}", name, err);
        }
    }
}

fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_collection<T: Serialize>(
    dir: &Path,
    path: &Path,
    items: &[T],
) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    let data = serde_json::to_string_pretty(items)?;
    fs::write(path, data)?;
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn insert_creator(&self, creator: Creator) -> StoreResult<Creator> {
        let _guard = self.lock.lock().await;
        let mut creators: Vec<Creator> = self.load(CREATORS_FILE);
        creators.push(creator.clone());
        self.save(CREATORS_FILE, &creators);
        Ok(creator)
    }

    async fn creator_by_id(&self, id: &str) -> StoreResult<Option<Creator>> {
        let _guard = self.lock.lock().await;
        let creators: Vec<Creator> = self.load(CREATORS_FILE);
        Ok(creators.into_iter().find(|c| c.id == id))
    }

    async fn creator_by_email(&self, email: &str) -> StoreResult<Option<Creator>> {
        let _guard = self.lock.lock().await;
        let creators: Vec<Creator> = self.load(CREATORS_FILE);
        Ok(creators.into_iter().find(|c| c.email == email))
    }

    async fn creator_by_username(&self, username: &str) -> StoreResult<Option<Creator>> {
        let _guard = self.lock.lock().await;
        let creators: Vec<Creator> = self.load(CREATORS_FILE);
        Ok(creators.into_iter().find(|c| c.username == username))
    }

    async fn creator_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Creator>> {
        let _guard = self.lock.lock().await;
        let creators: Vec<Creator> = self.load(CREATORS_FILE);
        Ok(creators
            .into_iter()
            .find(|c| c.wallet_address == wallet_address))
    }

    async fn update_creator(
        &self,
        id: &str,
        patch: CreatorPatch,
    ) -> StoreResult<Option<Creator>> {
        let _guard = self.lock.lock().await;
        let mut creators: Vec<Creator> = self.load(CREATORS_FILE);
        let updated = match creators.iter_mut().find(|c| c.id == id) {
            Some(creator) => {
                patch.apply(creator);
                Some(creator.clone())
            }
            None => None,
        };
        if updated.is_some() {
            self.save(CREATORS_FILE, &creators);
        }
        Ok(updated)
    }

    async fn insert_payment(&self, payment: Payment) -> StoreResult<Payment> {
        let _guard = self.lock.lock().await;
        let mut payments: Vec<Payment> = self.load(PAYMENTS_FILE);
        payments.push(payment.clone());
        self.save(PAYMENTS_FILE, &payments);
        Ok(payment)
    }

    async fn payment_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<Payment>> {
        let _guard = self.lock.lock().await;
        let payments: Vec<Payment> = self.load(PAYMENTS_FILE);
        Ok(payments.into_iter().find(|p| p.tx_hash == tx_hash))
    }

    async fn payments_for_creator(
        &self,
        creator_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Payment>> {
        let _guard = self.lock.lock().await;
        let payments: Vec<Payment> = self.load(PAYMENTS_FILE);
        let mut payments: Vec<Payment> = payments
            .into_iter()
            .filter(|p| p.creator_id == creator_id)
            .filter(|p| start.map_or(true, |s| p.timestamp >= s))
            .filter(|p| end.map_or(true, |e| p.timestamp <= e))
            .collect();
        payments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(payments)
    }

    async fn count_payments(&self, creator_id: &str) -> StoreResult<u64> {
        let _guard = self.lock.lock().await;
        let payments: Vec<Payment> = self.load(PAYMENTS_FILE);
        Ok(payments
            .iter()
            .filter(|p| p.creator_id == creator_id)
            .count() as u64)
    }

    async fn insert_link(&self, link: ShareableLink) -> StoreResult<ShareableLink> {
        let _guard = self.lock.lock().await;
        let mut links: Vec<ShareableLink> = self.load(LINKS_FILE);
        links.push(link.clone());
        self.save(LINKS_FILE, &links);
        Ok(link)
    }

    async fn link_by_id(&self, id: &str) -> StoreResult<Option<ShareableLink>> {
        let _guard = self.lock.lock().await;
        let links: Vec<ShareableLink> = self.load(LINKS_FILE);
        Ok(links.into_iter().find(|l| l.id == id))
    }

    async fn link_by_slug(&self, slug: &str) -> StoreResult<Option<ShareableLink>> {
        let _guard = self.lock.lock().await;
        let links: Vec<ShareableLink> = self.load(LINKS_FILE);
        Ok(links.into_iter().find(|l| l.slug == slug))
    }

    async fn links_for_creator(&self, creator_id: &str) -> StoreResult<Vec<ShareableLink>> {
        let _guard = self.lock.lock().await;
        let links: Vec<ShareableLink> = self.load(LINKS_FILE);
        let mut links: Vec<ShareableLink> = links
            .into_iter()
            .filter(|l| l.creator_id == creator_id)
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn update_link(&self, id: &str, patch: LinkPatch) -> StoreResult<Option<ShareableLink>> {
        let _guard = self.lock.lock().await;
        let mut links: Vec<ShareableLink> = self.load(LINKS_FILE);
        let updated = match links.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                patch.apply(link);
                Some(link.clone())
            }
            None => None,
        };
        if updated.is_some() {
            self.save(LINKS_FILE, &links);
        }
        Ok(updated)
    }

    async fn delete_link(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        let mut links: Vec<ShareableLink> = self.load(LINKS_FILE);
        let before = links.len();
        links.retain(|l| l.id != id);
        let removed = links.len() < before;
        if removed {
            self.save(LINKS_FILE, &links);
        }
        Ok(removed)
    }

    async fn increment_link_clicks(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut links: Vec<ShareableLink> = self.load(LINKS_FILE);
        if let Some(link) = links.iter_mut().find(|l| l.id == id) {
            link.click_count += 1;
            self.save(LINKS_FILE, &links);
        }
        Ok(())
    }

    async fn bump_snapshot(
        &self,
        creator_id: &str,
        date: NaiveDate,
        delta: SnapshotDelta,
    ) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut snapshots: Vec<AnalyticsSnapshot> = self.load(ANALYTICS_FILE);
        match snapshots
            .iter_mut()
            .find(|s| s.creator_id == creator_id && s.date == date)
        {
            Some(snapshot) => snapshot.apply(&delta),
            None => {
                let mut snapshot = AnalyticsSnapshot::new(creator_id.to_string(), date);
                snapshot.apply(&delta);
                snapshots.push(snapshot);
            }
        }
        self.save(ANALYTICS_FILE, &snapshots);
        Ok(())
    }

    async fn snapshots_for_creator(
        &self,
        creator_id: &str,
    ) -> StoreResult<Vec<AnalyticsSnapshot>> {
        let _guard = self.lock.lock().await;
        let snapshots: Vec<AnalyticsSnapshot> = self.load(ANALYTICS_FILE);
        Ok(snapshots
            .into_iter()
            .filter(|s| s.creator_id == creator_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creator(email: &str, username: &str) -> Creator {
        Creator::new(
            email.into(),
            username.into(),
            "Test".into(),
            format!("0x{username}"),
            None,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn collections_survive_a_store_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::new(dir.path());
        let c = store
            .insert_creator(creator("a@x.com", "alice"))
            .await
            .unwrap();
        store
            .insert_link(ShareableLink::new(
                "my-page".into(),
                "My Page".into(),
                None,
                None,
                None,
                c.id.clone(),
            ))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::new(dir.path());
        let found = reopened.creator_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, c.id);
        assert!(reopened.link_by_slug("my-page").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_data_dir_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created"));
        assert!(store.creator_by_email("a@x.com").await.unwrap().is_none());
        assert!(store
            .payments_for_creator("c1", None, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CREATORS_FILE), "not json").unwrap();

        let store = FileStore::new(dir.path());
        assert!(store.creator_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_rewrites_only_on_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let c = store
            .insert_creator(creator("a@x.com", "alice"))
            .await
            .unwrap();

        let missing = store
            .update_creator("nope", CreatorPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());

        let patch = CreatorPatch {
            bio: Some("painter".into()),
            ..Default::default()
        };
        let updated = store.update_creator(&c.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.bio.as_deref(), Some("painter"));
    }
}
