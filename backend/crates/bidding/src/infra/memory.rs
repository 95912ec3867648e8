//! In-memory strategy catalog
//!
//! Same contract as the PostgreSQL repository; used by tests and local runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};

use crate::domain::entities::{
    BidStrategy, NewStrategy, StrategyCreative, StrategyFilter, StrategyStats, StrategyStatus,
    StrategyUpdate,
};
use crate::domain::repository::StrategyRepository;
use crate::error::{BiddingError, BiddingResult};

#[derive(Default)]
struct Catalog {
    next_strategy_id: i64,
    next_link_id: i64,
    strategies: BTreeMap<i64, BidStrategy>,
    creatives: Vec<StrategyCreative>,
    stats: Vec<StrategyStats>,
}

#[derive(Default)]
pub struct InMemoryStrategyRepository {
    catalog: Mutex<Catalog>,
}

impl InMemoryStrategyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add delivery to a day's row, creating it if needed
    pub fn record_stats(
        &self,
        strategy_id: i64,
        date: NaiveDate,
        impressions: i64,
        clicks: i64,
        spend: f64,
    ) {
        let mut catalog = self.catalog();
        match catalog
            .stats
            .iter_mut()
            .find(|s| s.strategy_id == strategy_id && s.date == date)
        {
            Some(row) => {
                row.impressions += impressions;
                row.clicks += clicks;
                row.spend += spend;
            }
            None => catalog.stats.push(StrategyStats {
                strategy_id,
                impressions,
                clicks,
                spend,
                date,
            }),
        }
    }
}

impl StrategyRepository for InMemoryStrategyRepository {
    async fn list(&self, filter: &StrategyFilter) -> BiddingResult<(Vec<BidStrategy>, u64)> {
        let filter = filter.clone().normalized();
        let catalog = self.catalog();

        let matching: Vec<&BidStrategy> = catalog
            .strategies
            .values()
            .rev()
            .filter(|s| filter.matches(s))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.page_size as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get(&self, id: i64) -> BiddingResult<Option<BidStrategy>> {
        Ok(self.catalog().strategies.get(&id).cloned())
    }

    async fn create(&self, strategy: &NewStrategy) -> BiddingResult<BidStrategy> {
        let mut catalog = self.catalog();
        catalog.next_strategy_id += 1;
        let now = Utc::now();
        let created = BidStrategy {
            id: catalog.next_strategy_id,
            name: strategy.name.clone(),
            bid_type: strategy.bid_type,
            price: strategy.price,
            daily_budget: strategy.daily_budget,
            status: strategy.status,
            is_price_locked: strategy.is_price_locked,
            created_at: now,
            updated_at: now,
        };
        catalog.strategies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, update: &StrategyUpdate) -> BiddingResult<BidStrategy> {
        let mut catalog = self.catalog();
        let strategy = catalog
            .strategies
            .get_mut(&id)
            .ok_or(BiddingError::StrategyNotFound(id))?;

        strategy.name = update.name.clone();
        if !strategy.is_price_locked {
            strategy.price = update.price;
        }
        strategy.daily_budget = update.daily_budget;
        strategy.status = update.status;
        strategy.updated_at = Utc::now();
        Ok(strategy.clone())
    }

    async fn delete(&self, id: i64) -> BiddingResult<()> {
        let mut catalog = self.catalog();
        catalog
            .strategies
            .remove(&id)
            .ok_or(BiddingError::StrategyNotFound(id))?;
        catalog.creatives.retain(|c| c.strategy_id != id);
        Ok(())
    }

    async fn update_status(&self, id: i64, status: StrategyStatus) -> BiddingResult<BidStrategy> {
        let mut catalog = self.catalog();
        let strategy = catalog
            .strategies
            .get_mut(&id)
            .ok_or(BiddingError::StrategyNotFound(id))?;
        strategy.status = status;
        strategy.updated_at = Utc::now();
        Ok(strategy.clone())
    }

    async fn add_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<StrategyCreative> {
        let mut catalog = self.catalog();
        if !catalog.strategies.contains_key(&strategy_id) {
            return Err(BiddingError::StrategyNotFound(strategy_id));
        }
        if catalog
            .creatives
            .iter()
            .any(|c| c.strategy_id == strategy_id && c.creative_id == creative_id)
        {
            return Err(BiddingError::CreativeAlreadyLinked {
                strategy_id,
                creative_id,
            });
        }

        catalog.next_link_id += 1;
        let now = Utc::now();
        let link = StrategyCreative {
            id: catalog.next_link_id,
            strategy_id,
            creative_id,
            status: StrategyStatus::Enabled,
            created_at: now,
            updated_at: now,
        };
        catalog.creatives.push(link.clone());
        Ok(link)
    }

    async fn remove_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<()> {
        let mut catalog = self.catalog();
        let before = catalog.creatives.len();
        catalog
            .creatives
            .retain(|c| !(c.strategy_id == strategy_id && c.creative_id == creative_id));
        if catalog.creatives.len() == before {
            return Err(BiddingError::CreativeNotLinked {
                strategy_id,
                creative_id,
            });
        }
        Ok(())
    }

    async fn list_creatives(&self, strategy_id: i64) -> BiddingResult<Vec<StrategyCreative>> {
        let catalog = self.catalog();
        if !catalog.strategies.contains_key(&strategy_id) {
            return Err(BiddingError::StrategyNotFound(strategy_id));
        }
        Ok(catalog
            .creatives
            .iter()
            .filter(|c| c.strategy_id == strategy_id)
            .cloned()
            .collect())
    }

    async fn get_strategy_stats(
        &self,
        strategy_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BiddingResult<Vec<StrategyStats>> {
        let mut rows: Vec<StrategyStats> = self
            .catalog()
            .stats
            .iter()
            .filter(|s| s.strategy_id == strategy_id && s.date >= start && s.date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }
}
