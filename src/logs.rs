// nutrack-engine/src/logs.rs
//! Daily food log: user-store rows hydrated with catalog food names.

use crate::store::{CatalogStore, UserStore};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One logged food on a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub food_id: i64,
    pub food_name: String,
    pub meal_id: i64,
    pub meal_name: String,
    pub grams: f64,
}

fn day_bounds(date: NaiveDate) -> Result<(i64, i64)> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .context("invalid date")?
        .and_utc()
        .timestamp();
    let end = date
        .and_hms_opt(23, 59, 59)
        .context("invalid date")?
        .and_utc()
        .timestamp();
    Ok((start, end))
}

/// Log a food. Entries for today carry the current time; backdated entries
/// are stamped at noon of their day. Non-positive grams are a no-op.
pub fn add_entry(
    user: &UserStore,
    food_id: i64,
    grams: f64,
    meal_id: i64,
    date: NaiveDate,
) -> Result<()> {
    if grams <= 0.0 {
        debug!(food_id, grams, "ignoring log entry with non-positive grams");
        return Ok(());
    }
    let timestamp = if date == Utc::now().date_naive() {
        Utc::now().timestamp()
    } else {
        date.and_hms_opt(12, 0, 0)
            .context("invalid date")?
            .and_utc()
            .timestamp()
    };
    user.insert_log(timestamp, meal_id, food_id, grams)
}

/// All entries for one day, with meal and food names resolved.
pub fn entries_for_day(
    user: &UserStore,
    catalog: &CatalogStore,
    date: NaiveDate,
) -> Result<Vec<LogEntry>> {
    let (start, end) = day_bounds(date)?;
    let rows = user.fetch_log_rows(start, end)?;
    let meal_names = user.fetch_meal_names()?;

    let food_ids: Vec<i64> = rows.iter().map(|(_, food_id, _, _)| *food_id).collect();
    let food_names = catalog.fetch_food_names(&food_ids)?;

    let entries = rows
        .into_iter()
        .map(|(id, food_id, meal_id, grams)| LogEntry {
            id,
            food_id,
            food_name: food_names
                .get(&food_id)
                .cloned()
                .unwrap_or_else(|| "Unknown Food".to_string()),
            meal_id,
            meal_name: meal_names
                .get(&meal_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            grams,
        })
        .collect();
    Ok(entries)
}

pub fn remove_entry(user: &UserStore, log_id: i64) -> Result<()> {
    user.delete_log(log_id)
}

pub fn clear_day(user: &UserStore, date: NaiveDate) -> Result<()> {
    let (start, end) = day_bounds(date)?;
    user.delete_log_range(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_engine;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn entries_come_back_hydrated() {
        let engine = seeded_engine();
        let date = day(2026, 3, 14);
        add_entry(engine.user_store(), 1, 150.0, 1, date).unwrap();
        add_entry(engine.user_store(), 3, 120.0, 2, date).unwrap();

        let entries =
            entries_for_day(engine.user_store(), engine.catalog_store(), date).unwrap();
        assert_eq!(entries.len(), 2);

        let apple = entries.iter().find(|e| e.food_id == 1).unwrap();
        assert_eq!(apple.food_name, "Apple, raw");
        assert_eq!(apple.meal_name, "Breakfast");
        assert_eq!(apple.grams, 150.0);
    }

    #[test]
    fn unknown_food_and_meal_get_fallback_names() {
        let engine = seeded_engine();
        let date = day(2026, 3, 14);
        // Food 999 is not in the catalog; meal 77 has no name.
        add_entry(engine.user_store(), 999, 80.0, 77, date).unwrap();

        let entries =
            entries_for_day(engine.user_store(), engine.catalog_store(), date).unwrap();
        assert_eq!(entries[0].food_name, "Unknown Food");
        assert_eq!(entries[0].meal_name, "Unknown");
    }

    #[test]
    fn backdated_entries_stay_on_their_day() {
        let engine = seeded_engine();
        let logged = day(2026, 3, 14);
        add_entry(engine.user_store(), 1, 100.0, 1, logged).unwrap();

        let same_day =
            entries_for_day(engine.user_store(), engine.catalog_store(), logged).unwrap();
        assert_eq!(same_day.len(), 1);

        let next_day =
            entries_for_day(engine.user_store(), engine.catalog_store(), day(2026, 3, 15))
                .unwrap();
        assert!(next_day.is_empty());
    }

    #[test]
    fn non_positive_grams_insert_nothing() {
        let engine = seeded_engine();
        let date = day(2026, 3, 14);
        add_entry(engine.user_store(), 1, 0.0, 1, date).unwrap();
        add_entry(engine.user_store(), 1, -5.0, 1, date).unwrap();
        let entries =
            entries_for_day(engine.user_store(), engine.catalog_store(), date).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let engine = seeded_engine();
        let date = day(2026, 3, 14);
        add_entry(engine.user_store(), 1, 100.0, 1, date).unwrap();
        add_entry(engine.user_store(), 2, 200.0, 2, date).unwrap();

        let entries =
            entries_for_day(engine.user_store(), engine.catalog_store(), date).unwrap();
        remove_entry(engine.user_store(), entries[0].id).unwrap();
        assert_eq!(
            entries_for_day(engine.user_store(), engine.catalog_store(), date)
                .unwrap()
                .len(),
            1
        );

        clear_day(engine.user_store(), date).unwrap();
        assert!(entries_for_day(engine.user_store(), engine.catalog_store(), date)
            .unwrap()
            .is_empty());
    }
}
