// nutrack-engine/src/similarity.rs
//! Fuzzy text matching for catalog search.
//!
//! Scores are integers in [0, 100]. Exact and substring matches dominate so
//! that typing a prefix of a known name gives deterministic top placement;
//! the token fallback tolerates word-order differences and small typos
//! (e.g. "grass fed beef" against "Beef, grass-fed").

/// A target token that starts with the query token scores this much.
const PREFIX_TOKEN_SCORE: i32 = 95;
/// Per-token scores above this count the token as matched.
const TOKEN_MATCH_FLOOR: i32 = 60;
/// Flat penalty when at least one query token failed to match any target token.
const UNMATCHED_PENALTY: i32 = 20;

/// Classic Levenshtein distance (insert / delete / substitute, unit cost).
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

fn tokens(s: &str) -> Vec<&str> {
    s.split(|c: char| c.is_whitespace() || c == ',' || c == '-')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Score `query` against `target`, case-insensitively.
///
/// Rule cascade, first match wins:
/// 1. either side empty -> 0
/// 2. equal -> 100
/// 3. target contains query -> 90
/// 4. token fallback: best per-token score averaged over query tokens,
///    minus a flat penalty when any token scored <= 60, clamped to >= 0.
pub fn fuzzy_score(query: &str, target: &str) -> i32 {
    if query.is_empty() || target.is_empty() {
        return 0;
    }

    let q = query.to_lowercase();
    let t = target.to_lowercase();

    if t == q {
        return 100;
    }
    if t.contains(&q) {
        return 90;
    }

    let query_tokens = tokens(&q);
    let target_tokens = tokens(&t);
    if query_tokens.is_empty() {
        return 0;
    }

    let mut total_score = 0i32;
    let mut matched_tokens = 0usize;

    for q_tok in &query_tokens {
        let mut best = 0i32;
        for t_tok in &target_tokens {
            let max_len = q_tok.chars().count().max(t_tok.chars().count());
            if max_len == 0 {
                continue;
            }
            let score = if t_tok.starts_with(q_tok) {
                PREFIX_TOKEN_SCORE
            } else {
                let dist = edit_distance(q_tok, t_tok);
                let ratio = 1.0 - (dist as f64 / max_len as f64);
                (ratio * 100.0).round() as i32
            };
            best = best.max(score);
        }
        total_score += best;
        if best > TOKEN_MATCH_FLOOR {
            matched_tokens += 1;
        }
    }

    // Average first, then penalize, then clamp. The order matters near zero.
    let mut average = total_score / query_tokens.len() as i32;
    if matched_tokens < query_tokens.len() {
        average -= UNMATCHED_PENALTY;
    }
    average.max(0)
}
