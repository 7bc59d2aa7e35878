pub mod aggregate;
pub mod catalog;
pub mod logs;
pub mod schema;
pub mod search;
pub mod similarity;
pub mod store;

use crate::aggregate::{MealLine, NutrientTotals, CALORIE_NUTRIENT_ID};
use crate::catalog::{CatalogCache, FoodSummary, NutrientReading, ServingWeight};
use crate::logs::LogEntry;
use crate::store::{CatalogStore, UserStore};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Owns the two database connections and the process-lifetime catalog cache.
///
/// One instance is created at startup and handed to whatever composes the
/// application; there is no hidden global state. All operations run to
/// completion on the calling thread.
pub struct NutritionEngine {
    catalog_store: CatalogStore,
    user_store: UserStore,
    cache: Mutex<CatalogCache>,
}

impl NutritionEngine {
    /// Open the reference catalog and user database, creating any missing
    /// user tables.
    pub fn open(catalog_path: &Path, user_path: &Path) -> Result<Self> {
        let catalog = Connection::open(catalog_path)?;
        let user = Connection::open(user_path)?;
        user.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::init_catalog(&catalog)?;
        schema::init_user(&user)?;
        Ok(Self::from_connections(catalog, user))
    }

    /// Two fresh in-memory databases with empty schemas. Test and demo use.
    pub fn in_memory() -> Result<Self> {
        let catalog = Connection::open_in_memory()?;
        let user = Connection::open_in_memory()?;
        schema::init_catalog(&catalog)?;
        schema::init_user(&user)?;
        Ok(Self::from_connections(catalog, user))
    }

    fn from_connections(catalog: Connection, user: Connection) -> Self {
        Self {
            catalog_store: CatalogStore::new(Arc::new(Mutex::new(catalog))),
            user_store: UserStore::new(Arc::new(Mutex::new(user))),
            cache: Mutex::new(CatalogCache::default()),
        }
    }

    pub fn catalog_store(&self) -> &CatalogStore {
        &self.catalog_store
    }

    pub fn user_store(&self) -> &UserStore {
        &self.user_store
    }

    pub fn catalog_db(&self) -> &Arc<Mutex<Connection>> {
        self.catalog_store.db()
    }

    pub fn user_db(&self) -> &Arc<Mutex<Connection>> {
        self.user_store.db()
    }

    fn cache(&self) -> Result<MutexGuard<'_, CatalogCache>> {
        self.cache.lock().map_err(|e| anyhow::anyhow!("{e}"))
    }

    fn loaded_cache(&self) -> Result<MutexGuard<'_, CatalogCache>> {
        let mut cache = self.cache()?;
        cache.ensure_loaded(&self.catalog_store, &self.user_store)?;
        Ok(cache)
    }

    /// Ranked fuzzy search over the catalog. Empty result is a valid outcome;
    /// a failure to reach the reference store is the error channel.
    pub fn search(&self, query: &str) -> Result<Vec<FoodSummary>> {
        let cache = self.loaded_cache()?;
        search::search(&cache, &self.catalog_store, query)
    }

    /// Per-100g nutrient vector for a food, with percent-of-RDA attached for
    /// nutrients that have a defined RDA.
    pub fn food_nutrients(&self, food_id: i64) -> Result<Vec<NutrientReading>> {
        let cache = self.loaded_cache()?;
        let mut readings = self.catalog_store.fetch_nutrient_vector(food_id)?;
        for reading in &mut readings {
            reading.rda_percent = cache
                .rda()
                .get(&reading.id)
                .filter(|rda| **rda > 0.0)
                .map(|rda| (reading.amount / rda) * 100.0);
        }
        Ok(readings)
    }

    pub fn servings(&self, food_id: i64) -> Result<Vec<ServingWeight>> {
        self.catalog_store.fetch_servings(food_id)
    }

    /// Best-effort totals over the given lines; see `aggregate::aggregate`.
    pub fn aggregate(&self, lines: &[MealLine]) -> NutrientTotals {
        aggregate::aggregate(lines, &self.catalog_store)
    }

    pub fn percentage_of_rda(&self, totals: &NutrientTotals) -> Result<HashMap<i64, f64>> {
        let cache = self.loaded_cache()?;
        Ok(aggregate::percentage_of_rda(totals, cache.rda()))
    }

    pub fn project(&self, totals: &NutrientTotals, goal_kcal: f64) -> (f64, NutrientTotals) {
        aggregate::project(totals, goal_kcal, CALORIE_NUTRIENT_ID)
    }

    /// The merged RDA table (reference defaults with user overrides applied).
    pub fn merged_rda(&self) -> Result<HashMap<i64, f64>> {
        let cache = self.loaded_cache()?;
        Ok(cache.rda().clone())
    }

    pub fn set_rda_override(&self, nutrient_id: i64, value: f64) -> Result<()> {
        let mut cache = self.loaded_cache()?;
        cache.set_override(&self.user_store, nutrient_id, value)
    }

    pub fn add_log_entry(
        &self,
        food_id: i64,
        grams: f64,
        meal_id: i64,
        date: NaiveDate,
    ) -> Result<()> {
        logs::add_entry(&self.user_store, food_id, grams, meal_id, date)
    }

    pub fn daily_log(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        logs::entries_for_day(&self.user_store, &self.catalog_store, date)
    }

    pub fn remove_log_entry(&self, log_id: i64) -> Result<()> {
        logs::remove_entry(&self.user_store, log_id)
    }

    pub fn clear_day(&self, date: NaiveDate) -> Result<()> {
        logs::clear_day(&self.user_store, date)
    }

    /// Nutrient totals for everything logged on `date`.
    pub fn daily_totals(&self, date: NaiveDate) -> Result<NutrientTotals> {
        let lines: Vec<MealLine> = self
            .daily_log(date)?
            .into_iter()
            .map(|entry| MealLine {
                food_id: entry.food_id,
                food_name: entry.food_name,
                grams: entry.grams,
                meal_label: Some(entry.meal_name),
            })
            .collect();
        Ok(self.aggregate(&lines))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// An in-memory engine with a tiny three-food catalog:
    /// 1 "Apple, raw" (kcal 52, protein 0.3), 2 "Apple juice" (kcal 46),
    /// 3 "Banana" (kcal 89, protein 1.1). Reference RDAs: kcal 2000,
    /// protein 50.
    pub fn seeded_engine() -> NutritionEngine {
        let engine = NutritionEngine::in_memory().unwrap();
        engine
            .catalog_db()
            .lock()
            .unwrap()
            .execute_batch(
                "INSERT INTO fdgrp (id, fdgrp_desc) VALUES
                     (9, 'Fruits'),
                     (14, 'Beverages');
                 INSERT INTO food_des (id, long_desc, fdgrp_id) VALUES
                     (1, 'Apple, raw', 9),
                     (2, 'Apple juice', 14),
                     (3, 'Banana', 9);
                 INSERT INTO nutr_def (id, nutr_desc, unit, flav_class) VALUES
                     (208, 'Energy', 'kcal', NULL),
                     (203, 'Protein', 'g', NULL);
                 INSERT INTO nut_data (food_id, nutr_id, nutr_val) VALUES
                     (1, 208, 52.0),
                     (1, 203, 0.3),
                     (2, 208, 46.0),
                     (3, 208, 89.0),
                     (3, 203, 1.1);
                 INSERT INTO nutrients_overview (id, rda) VALUES
                     (208, 2000.0),
                     (203, 50.0);",
            )
            .unwrap();
        engine
    }
}
