//! PostgreSQL Strategy Repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::entities::{
    BidStrategy, BillingType, NewStrategy, StrategyCreative, StrategyFilter, StrategyStats,
    StrategyStatus, StrategyUpdate,
};
use crate::domain::repository::StrategyRepository;
use crate::error::{BiddingError, BiddingResult};

/// PostgreSQL-backed strategy catalog
#[derive(Clone)]
pub struct PgStrategyRepository {
    pool: PgPool,
}

impl PgStrategyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: i64) -> BiddingResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bid_strategies WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

impl StrategyRepository for PgStrategyRepository {
    async fn list(&self, filter: &StrategyFilter) -> BiddingResult<(Vec<BidStrategy>, u64)> {
        let filter = filter.clone().normalized();
        let bid_type = filter.bid_type.map(|t| t.code());
        let enabled = filter.enabled_only.then_some(StrategyStatus::Enabled.id());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bid_strategies
            WHERE ($1::TEXT IS NULL OR bid_type = $1)
              AND ($2::DOUBLE PRECISION IS NULL OR price >= $2)
              AND ($3::DOUBLE PRECISION IS NULL OR price <= $3)
              AND ($4::SMALLINT IS NULL OR status = $4)
            "#,
        )
        .bind(bid_type)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, StrategyRow>(
            r#"
            SELECT
                id,
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            FROM bid_strategies
            WHERE ($1::TEXT IS NULL OR bid_type = $1)
              AND ($2::DOUBLE PRECISION IS NULL OR price >= $2)
              AND ($3::DOUBLE PRECISION IS NULL OR price <= $3)
              AND ($4::SMALLINT IS NULL OR status = $4)
            ORDER BY id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(bid_type)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(enabled)
        .bind(i64::from(filter.page_size))
        .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let strategies = rows
            .into_iter()
            .map(StrategyRow::into_strategy)
            .collect::<BiddingResult<Vec<_>>>()?;
        Ok((strategies, total.max(0) as u64))
    }

    async fn get(&self, id: i64) -> BiddingResult<Option<BidStrategy>> {
        let row = sqlx::query_as::<_, StrategyRow>(
            r#"
            SELECT
                id,
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            FROM bid_strategies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StrategyRow::into_strategy).transpose()
    }

    async fn create(&self, strategy: &NewStrategy) -> BiddingResult<BidStrategy> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, StrategyRow>(
            r#"
            INSERT INTO bid_strategies (
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING
                id,
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            "#,
        )
        .bind(&strategy.name)
        .bind(strategy.bid_type.code())
        .bind(strategy.price)
        .bind(strategy.daily_budget)
        .bind(strategy.status.id())
        .bind(strategy.is_price_locked)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.into_strategy()
    }

    async fn update(&self, id: i64, update: &StrategyUpdate) -> BiddingResult<BidStrategy> {
        // Locked prices are kept in the same statement, no read-modify-write
        let row = sqlx::query_as::<_, StrategyRow>(
            r#"
            UPDATE bid_strategies SET
                name = $2,
                price = CASE WHEN is_price_locked THEN price ELSE $3 END,
                daily_budget = $4,
                status = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING
                id,
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.price)
        .bind(update.daily_budget)
        .bind(update.status.id())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(BiddingError::StrategyNotFound(id))?.into_strategy()
    }

    async fn delete(&self, id: i64) -> BiddingResult<()> {
        let mut tx = self.pool.begin().await?;

        let links = sqlx::query("DELETE FROM bid_strategy_creatives WHERE strategy_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM bid_strategies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(BiddingError::StrategyNotFound(id));
        }
        tx.commit().await?;

        tracing::info!(strategy_id = id, creative_links = links, "Strategy deleted");
        Ok(())
    }

    async fn update_status(&self, id: i64, status: StrategyStatus) -> BiddingResult<BidStrategy> {
        let row = sqlx::query_as::<_, StrategyRow>(
            r#"
            UPDATE bid_strategies SET
                status = $2,
                updated_at = $3
            WHERE id = $1
            RETURNING
                id,
                name,
                bid_type,
                price,
                daily_budget,
                status,
                is_price_locked,
                created_at,
                updated_at
            "#,
        )
        .bind(id)
        .bind(status.id())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(BiddingError::StrategyNotFound(id))?.into_strategy()
    }

    async fn add_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<StrategyCreative> {
        if !self.exists(strategy_id).await? {
            return Err(BiddingError::StrategyNotFound(strategy_id));
        }

        let now = Utc::now();
        let row = sqlx::query_as::<_, CreativeRow>(
            r#"
            INSERT INTO bid_strategy_creatives (
                strategy_id,
                creative_id,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (strategy_id, creative_id) DO NOTHING
            RETURNING id, strategy_id, creative_id, status, created_at, updated_at
            "#,
        )
        .bind(strategy_id)
        .bind(creative_id)
        .bind(StrategyStatus::Enabled.id())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CreativeRow::into_creative)
            .ok_or(BiddingError::CreativeAlreadyLinked {
                strategy_id,
                creative_id,
            })
    }

    async fn remove_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM bid_strategy_creatives WHERE strategy_id = $1 AND creative_id = $2",
        )
        .bind(strategy_id)
        .bind(creative_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(BiddingError::CreativeNotLinked {
                strategy_id,
                creative_id,
            });
        }
        Ok(())
    }

    async fn list_creatives(&self, strategy_id: i64) -> BiddingResult<Vec<StrategyCreative>> {
        if !self.exists(strategy_id).await? {
            return Err(BiddingError::StrategyNotFound(strategy_id));
        }

        let rows = sqlx::query_as::<_, CreativeRow>(
            r#"
            SELECT id, strategy_id, creative_id, status, created_at, updated_at
            FROM bid_strategy_creatives
            WHERE strategy_id = $1
            ORDER BY id
            "#,
        )
        .bind(strategy_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CreativeRow::into_creative).collect())
    }

    async fn get_strategy_stats(
        &self,
        strategy_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BiddingResult<Vec<StrategyStats>> {
        let rows = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                stat_date,
                SUM(impressions)::BIGINT AS impressions,
                SUM(clicks)::BIGINT AS clicks,
                SUM(spend)::DOUBLE PRECISION AS spend
            FROM bid_strategy_stats
            WHERE strategy_id = $1
              AND stat_date BETWEEN $2 AND $3
            GROUP BY stat_date
            ORDER BY stat_date DESC
            "#,
        )
        .bind(strategy_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StrategyStats {
                strategy_id,
                impressions: r.impressions,
                clicks: r.clicks,
                spend: r.spend,
                date: r.stat_date,
            })
            .collect())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct StrategyRow {
    id: i64,
    name: String,
    bid_type: String,
    price: f64,
    daily_budget: f64,
    status: i16,
    is_price_locked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StrategyRow {
    fn into_strategy(self) -> BiddingResult<BidStrategy> {
        let bid_type = BillingType::from_code(&self.bid_type).ok_or_else(|| {
            BiddingError::Internal(format!(
                "Invalid bid_type '{}' on strategy {}",
                self.bid_type, self.id
            ))
        })?;

        Ok(BidStrategy {
            id: self.id,
            name: self.name,
            bid_type,
            price: self.price,
            daily_budget: self.daily_budget,
            status: StrategyStatus::from_id(self.status).unwrap_or_default(),
            is_price_locked: self.is_price_locked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CreativeRow {
    id: i64,
    strategy_id: i64,
    creative_id: i64,
    status: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CreativeRow {
    fn into_creative(self) -> StrategyCreative {
        StrategyCreative {
            id: self.id,
            strategy_id: self.strategy_id,
            creative_id: self.creative_id,
            status: StrategyStatus::from_id(self.status).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    stat_date: NaiveDate,
    impressions: i64,
    clicks: i64,
    spend: f64,
}
