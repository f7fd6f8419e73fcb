// Relational backend: sqlx Postgres pool with embedded migrations.
//
// Unlike the other backends the schema carries unique indexes on the
// check-then-act keys (email, username, wallet, slug, tx_hash), so a lost
// race surfaces as a database error instead of a silent duplicate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::{
    AnalyticsSnapshot, Creator, CreatorPatch, LinkPatch, Payment, ShareableLink, SnapshotDelta,
};
use crate::store::{Store, StoreResult};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, runs migrations, and returns the store.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        info!("Connecting to database: {}", database_url);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    async fn fetch_creator(&self, id: &str) -> StoreResult<Option<Creator>> {
        let creator = sqlx::query_as::<_, Creator>("SELECT * FROM creators WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(creator)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn insert_creator(&self, creator: Creator) -> StoreResult<Creator> {
        sqlx::query(
            r#"
            INSERT INTO creators (
                id, email, username, display_name, bio, avatar, wallet_address,
                sui_name_service, is_verified, twitter_handle, website_url,
                min_donation_amount, custom_message, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(&creator.id)
        .bind(&creator.email)
        .bind(&creator.username)
        .bind(&creator.display_name)
        .bind(&creator.bio)
        .bind(&creator.avatar)
        .bind(&creator.wallet_address)
        .bind(&creator.sui_name_service)
        .bind(creator.is_verified)
        .bind(&creator.twitter_handle)
        .bind(&creator.website_url)
        .bind(creator.min_donation_amount)
        .bind(&creator.custom_message)
        .bind(creator.created_at)
        .bind(creator.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(creator)
    }

    async fn creator_by_id(&self, id: &str) -> StoreResult<Option<Creator>> {
        self.fetch_creator(id).await
    }

    async fn creator_by_email(&self, email: &str) -> StoreResult<Option<Creator>> {
        let creator = sqlx::query_as::<_, Creator>("SELECT * FROM creators WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(creator)
    }

    async fn creator_by_username(&self, username: &str) -> StoreResult<Option<Creator>> {
        let creator = sqlx::query_as::<_, Creator>("SELECT * FROM creators WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(creator)
    }

    async fn creator_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Creator>> {
        let creator =
            sqlx::query_as::<_, Creator>("SELECT * FROM creators WHERE wallet_address = $1")
                .bind(wallet_address)
                .fetch_optional(&self.pool)
                .await?;
        Ok(creator)
    }

    async fn update_creator(
        &self,
        id: &str,
        patch: CreatorPatch,
    ) -> StoreResult<Option<Creator>> {
        let Some(mut creator) = self.fetch_creator(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut creator);

        sqlx::query(
            r#"
            UPDATE creators SET
                display_name = $2, bio = $3, avatar = $4, twitter_handle = $5,
                website_url = $6, min_donation_amount = $7, custom_message = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(&creator.id)
        .bind(&creator.display_name)
        .bind(&creator.bio)
        .bind(&creator.avatar)
        .bind(&creator.twitter_handle)
        .bind(&creator.website_url)
        .bind(creator.min_donation_amount)
        .bind(&creator.custom_message)
        .bind(creator.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(Some(creator))
    }

    async fn insert_payment(&self, payment: Payment) -> StoreResult<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, tx_hash, amount, currency, message, donor_name, donor_email,
                is_anonymous, from_address, to_address, block_height, "timestamp",
                creator_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.tx_hash)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.message)
        .bind(&payment.donor_name)
        .bind(&payment.donor_email)
        .bind(payment.is_anonymous)
        .bind(&payment.from_address)
        .bind(&payment.to_address)
        .bind(payment.block_height)
        .bind(payment.timestamp)
        .bind(&payment.creator_id)
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn payment_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE tx_hash = $1")
            .bind(tx_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    async fn payments_for_creator(
        &self,
        creator_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE creator_id = $1
              AND ($2::timestamptz IS NULL OR "timestamp" >= $2)
              AND ($3::timestamptz IS NULL OR "timestamp" <= $3)
            ORDER BY "timestamp" DESC
            "#,
        )
        .bind(creator_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    async fn count_payments(&self, creator_id: &str) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE creator_id = $1")
                .bind(creator_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn insert_link(&self, link: ShareableLink) -> StoreResult<ShareableLink> {
        sqlx::query(
            r#"
            INSERT INTO links (
                id, slug, title, description, is_active, button_text, theme,
                click_count, creator_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&link.id)
        .bind(&link.slug)
        .bind(&link.title)
        .bind(&link.description)
        .bind(link.is_active)
        .bind(&link.button_text)
        .bind(&link.theme)
        .bind(link.click_count)
        .bind(&link.creator_id)
        .bind(link.created_at)
        .bind(link.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(link)
    }

    async fn link_by_id(&self, id: &str) -> StoreResult<Option<ShareableLink>> {
        let link = sqlx::query_as::<_, ShareableLink>("SELECT * FROM links WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn link_by_slug(&self, slug: &str) -> StoreResult<Option<ShareableLink>> {
        let link = sqlx::query_as::<_, ShareableLink>("SELECT * FROM links WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn links_for_creator(&self, creator_id: &str) -> StoreResult<Vec<ShareableLink>> {
        let links = sqlx::query_as::<_, ShareableLink>(
            "SELECT * FROM links WHERE creator_id = $1 ORDER BY created_at DESC",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn update_link(&self, id: &str, patch: LinkPatch) -> StoreResult<Option<ShareableLink>> {
        let existing = sqlx::query_as::<_, ShareableLink>("SELECT * FROM links WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(mut link) = existing else {
            return Ok(None);
        };
        patch.apply(&mut link);

        sqlx::query(
            r#"
            UPDATE links SET
                title = $2, description = $3, is_active = $4, button_text = $5,
                theme = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(&link.id)
        .bind(&link.title)
        .bind(&link.description)
        .bind(link.is_active)
        .bind(&link.button_text)
        .bind(&link.theme)
        .bind(link.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(Some(link))
    }

    async fn delete_link(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_link_clicks(&self, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE links SET click_count = click_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn bump_snapshot(
        &self,
        creator_id: &str,
        date: NaiveDate,
        delta: SnapshotDelta,
    ) -> StoreResult<()> {
        let mut fresh = AnalyticsSnapshot::new(creator_id.to_string(), date);
        fresh.apply(&delta);

        sqlx::query(
            r#"
            INSERT INTO analytics (
                id, creator_id, date, total_payments, total_amount, unique_donors,
                average_amount, profile_views, link_clicks
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (creator_id, date) DO UPDATE SET
                total_payments = analytics.total_payments + EXCLUDED.total_payments,
                total_amount = analytics.total_amount + EXCLUDED.total_amount,
                unique_donors = analytics.unique_donors + EXCLUDED.unique_donors,
                profile_views = analytics.profile_views + EXCLUDED.profile_views,
                link_clicks = analytics.link_clicks + EXCLUDED.link_clicks,
                average_amount = CASE
                    WHEN analytics.total_payments + EXCLUDED.total_payments > 0
                    THEN (analytics.total_amount + EXCLUDED.total_amount)
                         / (analytics.total_payments + EXCLUDED.total_payments)
                    ELSE 0
                END
            "#,
        )
        .bind(&fresh.id)
        .bind(creator_id)
        .bind(date)
        .bind(fresh.total_payments)
        .bind(fresh.total_amount)
        .bind(fresh.unique_donors)
        .bind(fresh.average_amount)
        .bind(fresh.profile_views)
        .bind(fresh.link_clicks)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn snapshots_for_creator(
        &self,
        creator_id: &str,
    ) -> StoreResult<Vec<AnalyticsSnapshot>> {
        let snapshots = sqlx::query_as::<_, AnalyticsSnapshot>(
            "SELECT * FROM analytics WHERE creator_id = $1 ORDER BY date",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(snapshots)
    }
}
