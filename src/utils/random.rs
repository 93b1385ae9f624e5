//! Date-seeded randomness.
//!
//! Every generator draws from its own [`StdRng`] seeded from the run date,
//! so re-running a week with the same inputs reproduces the same records.

use chrono::{Datelike, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::types::{LedgerError, LedgerResult};

/// Seed for a run date: `year * 10000 + iso_week * 100 + iso_weekday`
pub fn week_seed(run_date: NaiveDate) -> u64 {
    let iso = run_date.iso_week();
    let weekday = run_date.weekday().number_from_monday();
    (iso.year() as u64) * 10_000 + (iso.week() as u64) * 100 + weekday as u64
}

/// Fresh deterministic stream for a run date
pub fn seeded_rng(run_date: NaiveDate) -> StdRng {
    StdRng::seed_from_u64(week_seed(run_date))
}

/// Index drawn in proportion to `weights`.
///
/// Falls back to a uniform pick when the weights cannot form a
/// distribution (all zero, negative or non-finite).
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => rng.gen_range(0..weights.len().max(1)),
    }
}

/// Draw up to `count` distinct indices, removing each pick and
/// renormalising the remaining weights before the next draw.
pub fn weighted_sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    count: usize,
) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..weights.len()).collect();
    let mut picked = Vec::with_capacity(count.min(weights.len()));
    while picked.len() < count && !remaining.is_empty() {
        let current: Vec<f64> = remaining.iter().map(|&i| weights[i]).collect();
        let slot = weighted_index(rng, &current);
        picked.push(remaining.remove(slot));
    }
    picked
}

/// `cents * bp / 10000`, failing when the product leaves `i64`
fn scale_bp(cents: i64, bp: i64) -> LedgerResult<i64> {
    cents
        .checked_mul(bp)
        .map(|scaled| scaled / 10_000)
        .ok_or_else(|| LedgerError::Validation(format!("Amount out of range: {} cents", cents)))
}

/// Multiply `cents` by a uniform factor in `1 ± spread_bp / 10000`
pub fn apply_variance<R: Rng + ?Sized>(rng: &mut R, cents: i64, spread_bp: i64) -> LedgerResult<i64> {
    let factor_bp = 10_000 + rng.gen_range(-spread_bp..=spread_bp);
    scale_bp(cents, factor_bp)
}

/// Share of `cents` drawn uniformly between two basis-point bounds
pub fn uniform_share<R: Rng + ?Sized>(
    rng: &mut R,
    cents: i64,
    min_bp: i64,
    max_bp: i64,
) -> LedgerResult<i64> {
    scale_bp(cents, rng.gen_range(min_bp..=max_bp))
}

/// NEFT transfer reference such as `NEFT/ABC/12345`
pub fn payment_reference<R: Rng + ?Sized>(rng: &mut R) -> String {
    let code: String = (0..3)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect();
    format!("NEFT/{}/{}", code, rng.gen_range(10_000..100_000))
}
