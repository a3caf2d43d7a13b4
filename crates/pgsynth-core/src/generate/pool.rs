use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use rand_distr::Exp1;
use tracing::debug;

use crate::generate::providers::{
    history_start, random_date, random_number, templated_word, NumericBounds, NumericSpec,
    ProviderSettings,
};
use crate::generate::value::Value;
use crate::schema::types::{ColumnProfile, ColumnStatistics, TypeKind};

/// Weighted set of candidate values for one column.
///
/// Values and weights always have the same non-zero length. Weights are
/// relative; they need not sum to one.
#[derive(Debug, Clone)]
pub struct ValuePool {
    values: Vec<Value>,
    weights: Vec<f64>,
    index: Option<WeightedIndex<f64>>,
}

impl ValuePool {
    /// Returns `None` for an empty or length-mismatched input.
    pub fn new(values: Vec<Value>, weights: Vec<f64>) -> Option<Self> {
        if values.is_empty() || values.len() != weights.len() {
            return None;
        }
        let weights: Vec<f64> = weights
            .into_iter()
            .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 })
            .collect();
        // All-zero weights leave no index; draws fall back to uniform.
        let index = WeightedIndex::new(weights.iter().copied()).ok();
        Some(Self {
            values,
            weights,
            index,
        })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weighted draw: each value is picked with probability weight / total.
    pub fn draw(&self, rng: &mut impl Rng) -> Value {
        let i = match &self.index {
            Some(index) => index.sample(rng),
            None => rng.random_range(0..self.values.len()),
        };
        self.values[i].clone()
    }
}

/// Number of distinct values the column should have in a table of
/// `target_rows` rows, never fewer than its common values.
///
/// A positive estimate is an absolute count. A negative one is minus the
/// fraction of rows that are distinct.
pub fn resolve_distinct_count(distinct_estimate: f64, target_rows: u64, common_len: usize) -> usize {
    let resolved = if distinct_estimate > 0.0 {
        distinct_estimate.round()
    } else if distinct_estimate < 0.0 {
        (-distinct_estimate * target_rows as f64).round()
    } else {
        0.0
    };
    let resolved = if resolved.is_finite() && resolved > 0.0 {
        resolved as usize
    } else {
        0
    };
    resolved.max(common_len)
}

/// Split `total` across `k` slots with a symmetric Dirichlet(1, ..., 1) draw.
///
/// The parts are non-negative and sum to `total` up to rounding.
pub fn dirichlet_partition(k: usize, total: f64, rng: &mut impl Rng) -> Vec<f64> {
    if k == 0 {
        return Vec::new();
    }
    let draws: Vec<f64> = (0..k).map(|_| Exp1.sample(rng)).collect();
    let sum: f64 = draws.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        draws.into_iter().map(|d| d / sum * total).collect()
    } else {
        vec![total / k as f64; k]
    }
}

/// Build the value pool of a column from its planner statistics.
///
/// The pool is the column's common values plus synthetic long-tail values
/// that share the probability mass the common values leave over. Returns
/// `None` when the statistics carry no common values.
pub fn synthesize_pool(
    profile: &ColumnProfile,
    stats: &ColumnStatistics,
    target_rows: u64,
    bounds: NumericBounds,
    settings: &ProviderSettings,
    rng: &mut impl Rng,
) -> Option<ValuePool> {
    if !stats.has_common_values() {
        return None;
    }

    let common_len = stats.common_values.len();
    let k = match profile.kind {
        TypeKind::Boolean => 0,
        _ => resolve_distinct_count(stats.distinct_estimate, target_rows, common_len) - common_len,
    };
    let leftover = (1.0 - stats.common_freqs.iter().sum::<f64>()).max(0.0);
    let tail_weights = dirichlet_partition(k, leftover, rng);

    let mut values = stats.common_values.clone();
    let mut weights = stats.common_freqs.clone();
    values.reserve(k);
    for weight in tail_weights {
        values.push(long_tail_value(profile, stats, bounds, settings, rng));
        weights.push(weight);
    }

    debug!(
        "{}.{}: pool of {} values ({} common, {} synthetic, leftover {:.4})",
        profile.table_name,
        profile.column_name,
        values.len(),
        common_len,
        k,
        leftover
    );

    ValuePool::new(values, weights)
}

fn long_tail_value(
    profile: &ColumnProfile,
    stats: &ColumnStatistics,
    bounds: NumericBounds,
    settings: &ProviderSettings,
    rng: &mut impl Rng,
) -> Value {
    match profile.kind {
        TypeKind::Numeric => {
            let spec = NumericSpec {
                precision: profile.numeric_precision,
                radix: profile.numeric_precision_radix,
                scale: profile.numeric_scale,
            };
            random_number(&spec, bounds, settings.numeric_safety_margin, rng)
        }
        TypeKind::Temporal => Value::Date(random_date(history_start(), settings.today, rng)),
        TypeKind::Text | TypeKind::Unsupported | TypeKind::Boolean => {
            let template = &stats.common_values[rng.random_range(0..stats.common_values.len())];
            let length = (stats.avg_width - 1).max(0) as usize;
            Value::Text(templated_word(
                length,
                template.as_str(),
                profile.max_length,
                rng,
            ))
        }
    }
}
