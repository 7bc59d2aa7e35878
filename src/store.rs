// nutrack-engine/src/store.rs
//! Typed query layer over the two databases.
//!
//! `CatalogStore` reads the large reference catalog; `UserStore` owns the
//! small read-write user database (RDA overrides, food log, meal slots).
//! Rows that fail to decode are skipped individually with a warning so one
//! bad row never aborts a batch.

use crate::aggregate::NutrientSource;
use crate::catalog::{
    FoodSummary, NutrientDefinition, NutrientReading, ServingWeight, ACTIVE_PROFILE_ID,
};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Exact nutrient-composition facet counts for one food.
#[derive(Debug, Clone, Copy)]
pub struct FacetCounts {
    pub total: i64,
    pub amino: i64,
    pub flav: i64,
}

fn collect_rows<T>(rows: impl Iterator<Item = rusqlite::Result<T>>, what: &str) -> Vec<T> {
    let mut out = Vec::new();
    for row in rows {
        match row {
            Ok(value) => out.push(value),
            Err(e) => warn!("skipping malformed {what} row: {e}"),
        }
    }
    out
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub struct CatalogStore {
    db: Arc<Mutex<Connection>>,
}

impl CatalogStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Full catalog scan joined with group labels, in stable id order.
    /// Facet counts come back as placeholders (0).
    pub fn fetch_snapshot(&self) -> Result<Vec<FoodSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.long_desc, g.fdgrp_desc, f.fdgrp_id
             FROM food_des f
             JOIN fdgrp g ON f.fdgrp_id = g.id
             ORDER BY f.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FoodSummary {
                id: row.get(0)?,
                description: row.get(1)?,
                group_label: row.get(2)?,
                group_code: row.get(3)?,
                nutrient_count: 0,
                amino_count: 0,
                flav_count: 0,
                score: 0,
            })
        })?;
        Ok(collect_rows(rows, "food summary"))
    }

    /// Bulk nutrient-row counts, one pass over nut_data.
    pub fn fetch_nutrient_counts(&self) -> Result<HashMap<i64, i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT food_id, COUNT(*) FROM nut_data GROUP BY food_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        Ok(collect_rows(rows, "nutrient count").into_iter().collect())
    }

    pub fn fetch_definitions(&self) -> Result<Vec<NutrientDefinition>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, nutr_desc, unit FROM nutr_def")?;
        let rows = stmt.query_map([], |row| {
            Ok(NutrientDefinition {
                id: row.get(0)?,
                name: row.get(1)?,
                unit: row.get(2)?,
            })
        })?;
        Ok(collect_rows(rows, "nutrient definition"))
    }

    /// Per-100g nutrient vector for one food. RDA percentages are not
    /// attached here; the engine decorates readings against the merged table.
    pub fn fetch_nutrient_vector(&self, food_id: i64) -> Result<Vec<NutrientReading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT n.nutr_id, n.nutr_val, d.nutr_desc, d.unit
             FROM nut_data n
             JOIN nutr_def d ON n.nutr_id = d.id
             WHERE n.food_id = ?1",
        )?;
        let rows = stmt.query_map(params![food_id], |row| {
            Ok(NutrientReading {
                id: row.get(0)?,
                amount: row.get(1)?,
                name: row.get(2)?,
                unit: row.get(3)?,
                rda_percent: None,
            })
        })?;
        Ok(collect_rows(rows, "nutrient reading"))
    }

    /// Batched form of `fetch_nutrient_vector`, one query for many foods.
    /// Foods with no nutrient rows are absent from the result.
    pub fn fetch_nutrient_vectors_batch(
        &self,
        food_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<NutrientReading>>> {
        if food_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT n.food_id, n.nutr_id, n.nutr_val, d.nutr_desc, d.unit
             FROM nut_data n
             JOIN nutr_def d ON n.nutr_id = d.id
             WHERE n.food_id IN ({})",
            join_ids(food_ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                NutrientReading {
                    id: row.get(1)?,
                    amount: row.get(2)?,
                    name: row.get(3)?,
                    unit: row.get(4)?,
                    rda_percent: None,
                },
            ))
        })?;
        let mut vectors: HashMap<i64, Vec<NutrientReading>> = HashMap::new();
        for (food_id, reading) in collect_rows(rows, "nutrient reading") {
            vectors.entry(food_id).or_default().push(reading);
        }
        Ok(vectors)
    }

    /// One batched facet-count query for the surviving search results:
    /// total nutrient rows, amino-acid range (501-521), flavonoid classes.
    pub fn fetch_facet_counts(&self, food_ids: &[i64]) -> Result<HashMap<i64, FacetCounts>> {
        if food_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT n.food_id,
                    COUNT(n.nutr_id),
                    SUM(CASE WHEN n.nutr_id BETWEEN 501 AND 521 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN d.flav_class IS NOT NULL AND d.flav_class != '' THEN 1 ELSE 0 END)
             FROM nut_data n
             JOIN nutr_def d ON n.nutr_id = d.id
             WHERE n.food_id IN ({})
             GROUP BY n.food_id",
            join_ids(food_ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                FacetCounts {
                    total: row.get(1)?,
                    amino: row.get(2)?,
                    flav: row.get(3)?,
                },
            ))
        })?;
        Ok(collect_rows(rows, "facet count").into_iter().collect())
    }

    /// Catalog-wide RDA defaults. Nutrients without a defined RDA are absent.
    pub fn fetch_reference_rda(&self) -> Result<HashMap<i64, f64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, rda FROM nutrients_overview WHERE rda IS NOT NULL")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?;
        Ok(collect_rows(rows, "reference rda").into_iter().collect())
    }

    pub fn fetch_servings(&self, food_id: i64) -> Result<Vec<ServingWeight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT d.msre_desc, s.grams
             FROM serving s
             JOIN serv_desc d ON s.msre_id = d.id
             WHERE s.food_id = ?1",
        )?;
        let rows = stmt.query_map(params![food_id], |row| {
            Ok(ServingWeight {
                description: row.get(0)?,
                grams: row.get(1)?,
            })
        })?;
        Ok(collect_rows(rows, "serving weight"))
    }

    /// Batched description lookup, used to hydrate log entries.
    pub fn fetch_food_names(&self, food_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if food_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, long_desc FROM food_des WHERE id IN ({})",
            join_ids(food_ids)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows =
            stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        Ok(collect_rows(rows, "food name").into_iter().collect())
    }
}

impl NutrientSource for CatalogStore {
    fn nutrient_vector(&self, food_id: i64) -> Result<Vec<NutrientReading>> {
        self.fetch_nutrient_vector(food_id)
    }
}

pub struct UserStore {
    db: Arc<Mutex<Connection>>,
}

impl UserStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| anyhow::anyhow!("{e}"))
    }

    pub fn fetch_rda_overrides(&self) -> Result<HashMap<i64, f64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT nutr_id, rda FROM rda WHERE profile_id = ?1")?;
        let rows = stmt.query_map(params![ACTIVE_PROFILE_ID], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(collect_rows(rows, "rda override").into_iter().collect())
    }

    pub fn write_rda_override(&self, nutrient_id: i64, value: f64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO rda (profile_id, nutr_id, rda) VALUES (?1, ?2, ?3)",
            params![ACTIVE_PROFILE_ID, nutrient_id, value],
        )?;
        Ok(())
    }

    pub fn fetch_meal_names(&self) -> Result<HashMap<i64, String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM meal_name")?;
        let rows =
            stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        Ok(collect_rows(rows, "meal name").into_iter().collect())
    }

    pub fn insert_log(
        &self,
        timestamp: i64,
        meal_id: i64,
        food_id: i64,
        grams: f64,
    ) -> Result<()> {
        let conn = self.conn()?;
        // msre_id 0 means the amount is already in grams.
        conn.execute(
            "INSERT INTO log_food (profile_id, date, meal_id, food_id, msre_id, amt)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![ACTIVE_PROFILE_ID, timestamp, meal_id, food_id, grams],
        )?;
        Ok(())
    }

    /// Raw log rows in a timestamp range: (id, food_id, meal_id, grams).
    pub fn fetch_log_rows(&self, start: i64, end: i64) -> Result<Vec<(i64, i64, i64, f64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, food_id, meal_id, amt FROM log_food
             WHERE date >= ?1 AND date <= ?2 AND profile_id = ?3",
        )?;
        let rows = stmt.query_map(params![start, end, ACTIVE_PROFILE_ID], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        Ok(collect_rows(rows, "food log"))
    }

    pub fn delete_log(&self, log_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM log_food WHERE id = ?1", params![log_id])?;
        Ok(())
    }

    pub fn delete_log_range(&self, start: i64, end: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM log_food WHERE date >= ?1 AND date <= ?2 AND profile_id = ?3",
            params![start, end, ACTIVE_PROFILE_ID],
        )?;
        Ok(())
    }
}
