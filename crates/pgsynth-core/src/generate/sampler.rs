use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::generate::pool::ValuePool;
use crate::generate::providers::{Fallback, ProviderSettings};
use crate::generate::value::Value;

/// How the null-injection fraction is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullDraw {
    /// One fraction per row, shared by every column of that row.
    #[default]
    PerRow,
    /// An independent fraction for each column.
    PerColumn,
}

/// Where a column's values come from.
#[derive(Debug, Clone)]
pub enum ColumnSource {
    Pool { pool: ValuePool, null_frac: f64 },
    Fallback(Fallback),
}

#[derive(Debug, Clone)]
pub struct ColumnGenerator {
    pub column_name: String,
    pub source: ColumnSource,
}

impl ColumnGenerator {
    /// Produce one value given the row's null fraction draw `r`.
    ///
    /// Only pooled columns with a positive null fraction can emit NULL.
    pub fn generate(&self, r: f64, settings: &ProviderSettings, rng: &mut impl Rng) -> Value {
        match &self.source {
            ColumnSource::Pool { pool, null_frac } => {
                if *null_frac > 0.0 && r <= *null_frac {
                    Value::Null
                } else {
                    pool.draw(rng)
                }
            }
            ColumnSource::Fallback(fallback) => fallback.generate(settings, rng),
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.source, ColumnSource::Pool { .. })
    }
}

/// Produces rows for one table, one value per column in fixed order.
#[derive(Debug, Clone)]
pub struct RowSampler {
    columns: Vec<ColumnGenerator>,
    null_draw: NullDraw,
    settings: ProviderSettings,
}

impl RowSampler {
    pub fn new(columns: Vec<ColumnGenerator>, null_draw: NullDraw, settings: ProviderSettings) -> Self {
        Self {
            columns,
            null_draw,
            settings,
        }
    }

    pub fn columns(&self) -> &[ColumnGenerator] {
        &self.columns
    }

    pub fn sample_row(&self, rng: &mut impl Rng) -> Vec<Value> {
        let shared: f64 = rng.random();
        self.columns
            .iter()
            .map(|column| {
                let r = match self.null_draw {
                    NullDraw::PerRow => shared,
                    NullDraw::PerColumn => rng.random(),
                };
                column.generate(r, &self.settings, rng)
            })
            .collect()
    }

    pub fn sample_rows(&self, count: usize, rng: &mut impl Rng) -> Vec<Vec<Value>> {
        (0..count).map(|_| self.sample_row(rng)).collect()
    }
}
