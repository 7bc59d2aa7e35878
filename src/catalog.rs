// nutrack-engine/src/catalog.rs
use crate::store::{CatalogStore, UserStore};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// The profile all user-store reads and writes are scoped to.
pub const ACTIVE_PROFILE_ID: i64 = 1;

/// One row of the reference catalog, as held by the cache.
///
/// The facet counts loaded with the snapshot are placeholders for display;
/// search overwrites them on its result copies with exact batched counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodSummary {
    pub id: i64,
    pub description: String,
    pub group_label: String,
    pub group_code: i64,
    pub nutrient_count: i64,
    pub amino_count: i64,
    pub flav_count: i64,
    /// Relevance score attached by search; 0 on cache entries.
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientDefinition {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

/// A single nutrient amount per 100 g of a food.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientReading {
    pub id: i64,
    pub amount: f64,
    pub name: String,
    pub unit: String,
    /// `None` when no RDA is defined for this nutrient.
    pub rda_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingWeight {
    pub description: String,
    pub grams: f64,
}

/// Lazily-built snapshot of the reference catalog plus the merged RDA table.
///
/// Loaded once and reused for the process lifetime. The only mutation after
/// load is `set_override`, which writes through to the user store before it
/// touches the in-memory table.
#[derive(Default)]
pub struct CatalogCache {
    foods: Vec<FoodSummary>,
    definitions: HashMap<i64, NutrientDefinition>,
    rda: HashMap<i64, f64>,
    loaded: bool,
}

impl CatalogCache {
    /// Load the catalog snapshot, nutrient definitions, and merged RDA table.
    /// Idempotent; subsequent calls are no-ops.
    pub fn ensure_loaded(&mut self, catalog: &CatalogStore, user: &UserStore) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let counts = catalog.fetch_nutrient_counts()?;
        let mut foods = catalog.fetch_snapshot()?;
        for food in &mut foods {
            food.nutrient_count = counts.get(&food.id).copied().unwrap_or(0);
        }

        let definitions: HashMap<i64, NutrientDefinition> = catalog
            .fetch_definitions()?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        // Reference defaults first, then user overrides on top (override wins).
        let mut rda = catalog.fetch_reference_rda()?;
        rda.extend(user.fetch_rda_overrides()?);

        // Nothing is assigned until every fetch has succeeded; a failed load
        // leaves the cache empty and retryable.
        self.foods = foods;
        self.definitions = definitions;
        self.rda = rda;
        self.loaded = true;
        debug!(
            foods = self.foods.len(),
            definitions = self.definitions.len(),
            "catalog cache loaded"
        );
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn foods(&self) -> &[FoodSummary] {
        &self.foods
    }

    /// The two-layer-merged RDA table (nutrient id -> daily amount).
    pub fn rda(&self) -> &HashMap<i64, f64> {
        &self.rda
    }

    pub fn nutrient_name(&self, nutrient_id: i64) -> String {
        match self.definitions.get(&nutrient_id) {
            Some(def) => def.name.clone(),
            None => format!("Unknown Nutrient ({nutrient_id})"),
        }
    }

    pub fn nutrient_unit(&self, nutrient_id: i64) -> String {
        match self.definitions.get(&nutrient_id) {
            Some(def) => def.unit.clone(),
            None => "?".to_string(),
        }
    }

    /// Persist a user RDA override and update the merged table.
    ///
    /// The in-memory table changes only after the write succeeds, so a failed
    /// write leaves the merged view untouched.
    pub fn set_override(&mut self, user: &UserStore, nutrient_id: i64, value: f64) -> Result<()> {
        user.write_rda_override(nutrient_id, value)?;
        self.rda.insert(nutrient_id, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_engine;

    #[test]
    fn loads_snapshot_with_counts_and_definitions() {
        let engine = seeded_engine();
        let mut cache = CatalogCache::default();
        cache
            .ensure_loaded(engine.catalog_store(), engine.user_store())
            .unwrap();

        assert!(cache.is_loaded());
        assert_eq!(cache.foods().len(), 3);

        let apple = cache.foods().iter().find(|f| f.id == 1).unwrap();
        assert_eq!(apple.description, "Apple, raw");
        assert_eq!(apple.group_label, "Fruits");
        // Apple has kcal + protein rows seeded.
        assert_eq!(apple.nutrient_count, 2);

        assert_eq!(cache.nutrient_name(208), "Energy");
        assert_eq!(cache.nutrient_unit(208), "kcal");
        assert_eq!(cache.nutrient_name(9999), "Unknown Nutrient (9999)");
        assert_eq!(cache.nutrient_unit(9999), "?");
    }

    #[test]
    fn ensure_loaded_is_idempotent() {
        let engine = seeded_engine();
        let mut cache = CatalogCache::default();
        cache
            .ensure_loaded(engine.catalog_store(), engine.user_store())
            .unwrap();
        let foods_before = cache.foods().len();
        let rda_before = cache.rda().clone();

        cache
            .ensure_loaded(engine.catalog_store(), engine.user_store())
            .unwrap();
        assert_eq!(cache.foods().len(), foods_before);
        assert_eq!(cache.rda(), &rda_before);
    }

    #[test]
    fn user_override_wins_over_reference_rda() {
        let engine = seeded_engine();
        // Reference says 2000 kcal; the user store carries an override.
        engine
            .user_store()
            .write_rda_override(208, 1800.0)
            .unwrap();

        let mut cache = CatalogCache::default();
        cache
            .ensure_loaded(engine.catalog_store(), engine.user_store())
            .unwrap();
        assert_eq!(cache.rda().get(&208), Some(&1800.0));
        // Protein has no override; reference default survives.
        assert_eq!(cache.rda().get(&203), Some(&50.0));
    }

    #[test]
    fn set_override_updates_store_and_merged_table() {
        let engine = seeded_engine();
        let mut cache = CatalogCache::default();
        cache
            .ensure_loaded(engine.catalog_store(), engine.user_store())
            .unwrap();

        cache.set_override(engine.user_store(), 203, 75.0).unwrap();
        assert_eq!(cache.rda().get(&203), Some(&75.0));

        let persisted = engine.user_store().fetch_rda_overrides().unwrap();
        assert_eq!(persisted.get(&203), Some(&75.0));
    }

    #[test]
    fn load_failure_leaves_cache_empty() {
        // A user database without the rda table makes the load fail; the
        // cache must stay unloaded so a later call can retry.
        let engine = crate::NutritionEngine::in_memory().unwrap();
        engine
            .user_db()
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE rda;")
            .unwrap();

        let mut cache = CatalogCache::default();
        let result = cache.ensure_loaded(engine.catalog_store(), engine.user_store());
        assert!(result.is_err());
        assert!(!cache.is_loaded());
        assert!(cache.foods().is_empty());
    }
}
