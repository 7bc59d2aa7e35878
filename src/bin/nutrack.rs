use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use nutrack_engine::aggregate::RdaBand;
use nutrack_engine::NutritionEngine;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nutrack", about = "Food search and nutrient tracking over a USDA-style catalog")]
struct Cli {
    /// Path to the reference catalog database.
    #[arg(long, default_value = "catalog.db")]
    catalog: PathBuf,
    /// Path to the user database (created if missing).
    #[arg(long, default_value = "user.db")]
    user: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fuzzy-search the food catalog.
    Search { query: String },
    /// Show a food's per-100g nutrient vector with percent of RDA.
    Nutrients { food_id: i64 },
    /// Show household serving weights for a food.
    Servings { food_id: i64 },
    /// Set a personal RDA override for a nutrient.
    Rda { nutrient_id: i64, value: f64 },
    /// Log a food in grams.
    Log {
        food_id: i64,
        grams: f64,
        /// Meal slot id (1 Breakfast, 2 Lunch, 3 Dinner, 4 Snack).
        #[arg(long, default_value_t = 1)]
        meal: i64,
        /// Day to log on, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Summarize a day: entries, totals, percent of RDA, optional projection.
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Calorie goal to project the day's intake against.
        #[arg(long)]
        goal: Option<f64>,
    },
    /// Clear all log entries for a day.
    ClearDay {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let engine = NutritionEngine::open(&cli.catalog, &cli.user)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Search { query } => {
            let results = engine.search(&query)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Nutrients { food_id } => {
            let readings = engine.food_nutrients(food_id)?;
            println!("{}", serde_json::to_string_pretty(&readings)?);
        }
        Command::Servings { food_id } => {
            let servings = engine.servings(food_id)?;
            println!("{}", serde_json::to_string_pretty(&servings)?);
        }
        Command::Rda { nutrient_id, value } => {
            engine.set_rda_override(nutrient_id, value)?;
            println!("rda override set: nutrient {nutrient_id} -> {value}");
        }
        Command::Log {
            food_id,
            grams,
            meal,
            date,
        } => {
            engine.add_log_entry(food_id, grams, meal, date.unwrap_or(today))?;
            println!("logged food {food_id}: {grams} g");
        }
        Command::Day { date, goal } => {
            let date = date.unwrap_or(today);
            let entries = engine.daily_log(date)?;
            let totals = engine.daily_totals(date)?;
            let percents = engine.percentage_of_rda(&totals)?;

            let mut summary = json!({
                "date": date.to_string(),
                "entries": entries,
                "totals": totals,
                "percent_of_rda": percents,
                "bands": percents
                    .iter()
                    .map(|(id, pct)| {
                        let band = RdaBand::for_percent(*pct).as_str();
                        (id.to_string(), serde_json::Value::from(band))
                    })
                    .collect::<serde_json::Map<_, _>>(),
            });
            if let Some(goal) = goal {
                let (multiplier, projected) = engine.project(&totals, goal);
                summary["projection"] = json!({
                    "goal_kcal": goal,
                    "multiplier": multiplier,
                    "totals": projected,
                });
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ClearDay { date } => {
            let date = date.unwrap_or(today);
            engine.clear_day(date)?;
            println!("cleared log for {date}");
        }
    }
    Ok(())
}
