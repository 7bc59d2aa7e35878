// nutrack-engine/src/search.rs
//! Ranked fuzzy search over the cached catalog.

use crate::catalog::{CatalogCache, FoodSummary};
use crate::similarity::fuzzy_score;
use crate::store::CatalogStore;
use anyhow::Result;
use tracing::{debug, warn};

/// Scores at or below this are noise and never surface.
pub const SCORE_THRESHOLD: i32 = 40;
/// Result cap after ranking.
pub const MAX_RESULTS: usize = 100;

struct ScoredCandidate<'a> {
    food: &'a FoodSummary,
    score: i32,
}

/// Score every cached food against the query, rank, truncate, then enrich
/// the survivors with exact facet counts in one batched fetch.
///
/// The cache's own entries are never mutated; enrichment happens on result
/// copies. A failed facet fetch degrades to unenriched results.
pub fn search(cache: &CatalogCache, store: &CatalogStore, query: &str) -> Result<Vec<FoodSummary>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates: Vec<ScoredCandidate<'_>> = Vec::new();
    for food in cache.foods() {
        let score = fuzzy_score(query, &food.description);
        if score > SCORE_THRESHOLD {
            candidates.push(ScoredCandidate { food, score });
        }
    }

    // Stable sort: equal scores keep catalog order. Contract, not accident.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates.truncate(MAX_RESULTS);

    let mut results: Vec<FoodSummary> = candidates
        .iter()
        .map(|c| {
            let mut food = c.food.clone();
            food.score = c.score;
            food
        })
        .collect();

    let ids: Vec<i64> = results.iter().map(|f| f.id).collect();
    if !ids.is_empty() {
        match store.fetch_facet_counts(&ids) {
            Ok(facets) => {
                for food in &mut results {
                    if let Some(counts) = facets.get(&food.id) {
                        food.nutrient_count = counts.total;
                        food.amino_count = counts.amino;
                        food.flav_count = counts.flav;
                    }
                }
            }
            Err(e) => warn!("facet enrichment failed, returning bare results: {e}"),
        }
    }

    debug!(query, results = results.len(), "search complete");
    Ok(results)
}
