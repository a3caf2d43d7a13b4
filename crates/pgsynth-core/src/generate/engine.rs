use std::collections::HashSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SynthError};
use crate::generate::pool::synthesize_pool;
use crate::generate::providers::{
    Fallback, NumericBounds, ProviderSettings, DEFAULT_TEXT_LENGTH, NUMERIC_SAFETY_MARGIN,
};
use crate::generate::sampler::{ColumnGenerator, ColumnSource, NullDraw, RowSampler};
use crate::generate::value::Value;
use crate::schema::introspect::{gather_table_catalog, CatalogSource};
use crate::schema::profile::build_table_profile;
use crate::schema::types::{ColumnProfile, TableCatalog, TableProfile};

/// Rows assumed for a source table whose size cannot be read.
pub const DEFAULT_ROW_COUNT: u64 = 100;

/// Knobs for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthOptions {
    /// Target rows per table = source rows x this factor.
    pub multiplication_factor: f64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Restrict the run to these tables, in catalog order.
    pub tables: Option<Vec<String>>,
    pub null_draw: NullDraw,
    pub default_row_count: u64,
    pub default_text_length: usize,
    pub numeric_safety_margin: f64,
    pub skip_foreign_key_columns: bool,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            multiplication_factor: 1.0,
            seed: None,
            tables: None,
            null_draw: NullDraw::PerRow,
            default_row_count: DEFAULT_ROW_COUNT,
            default_text_length: DEFAULT_TEXT_LENGTH,
            numeric_safety_margin: NUMERIC_SAFETY_MARGIN,
            skip_foreign_key_columns: false,
        }
    }
}

/// What to generate for one table.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub table_name: String,
    pub target_row_count: u64,
    pub column_names: Vec<String>,
    pub columns: IndexMap<String, ColumnProfile>,
}

/// Generated rows of one table, ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertBatch {
    pub table_name: String,
    pub columns: Vec<String>,
    /// Declared type of each column, parallel to `columns`.
    pub column_types: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertBatch {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Where a table ended up in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Generated { rows: usize },
    Inserted { rows: u64 },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub table_name: String,
    pub outcome: TableOutcome,
}

/// Per-table outcomes of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tables: Vec<TableReport>,
}

impl RunSummary {
    pub fn record(&mut self, table_name: &str, outcome: TableOutcome) {
        match self.tables.iter_mut().find(|r| r.table_name == table_name) {
            Some(report) => report.outcome = outcome,
            None => self.tables.push(TableReport {
                table_name: table_name.to_string(),
                outcome,
            }),
        }
    }

    pub fn outcome(&self, table_name: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|r| r.table_name == table_name)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&TableOutcome) -> bool) -> usize {
        self.tables.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Generated { .. }))
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Inserted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Failed { .. }))
    }

    pub fn rows_inserted(&self) -> u64 {
        self.tables
            .iter()
            .map(|r| match r.outcome {
                TableOutcome::Inserted { rows } => rows,
                _ => 0,
            })
            .sum()
    }
}

/// Batches produced by a run plus the outcome of every table.
#[derive(Debug, Default)]
pub struct GenerationRun {
    pub batches: Vec<InsertBatch>,
    pub summary: RunSummary,
}

/// State scoped to a single generation run.
///
/// Holds the RNG, the run date and the profiles of every table seen so far.
/// Nothing survives past the run.
#[derive(Debug)]
pub struct RunContext {
    pub options: SynthOptions,
    settings: ProviderSettings,
    rng: StdRng,
    profiles: IndexMap<String, TableProfile>,
}

impl RunContext {
    pub fn new(options: SynthOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let settings = ProviderSettings {
            today: chrono::Local::now().date_naive(),
            numeric_safety_margin: options.numeric_safety_margin,
            default_text_length: options.default_text_length,
        };
        Self {
            options,
            settings,
            rng,
            profiles: IndexMap::new(),
        }
    }

    /// Pin the latest date generated for temporal columns.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.settings.today = today;
        self
    }

    pub fn profiles(&self) -> &IndexMap<String, TableProfile> {
        &self.profiles
    }

    /// round(source rows x factor), with unknown sizes read as the default.
    pub fn target_row_count(&self, live_rows: Option<u64>) -> u64 {
        let source_rows = live_rows.unwrap_or(self.options.default_row_count);
        let target = (source_rows as f64 * self.options.multiplication_factor).round();
        if target.is_finite() && target > 0.0 {
            target as u64
        } else {
            0
        }
    }

    /// Profile a table and decide what to generate for it.
    ///
    /// Returns `Ok(None)` when the table has no generatable columns, and an
    /// `UnsupportedType` error when one of them has a type with no generator.
    pub fn plan_table(&mut self, catalog: &TableCatalog) -> Result<Option<GenerationRequest>> {
        let profile = build_table_profile(catalog, self.options.skip_foreign_key_columns);

        if let Some(column) = profile.first_unsupported() {
            return Err(SynthError::UnsupportedType {
                table: column.table_name.clone(),
                column: column.column_name.clone(),
                type_name: column.type_name.clone(),
            });
        }

        let request = if profile.columns.is_empty() {
            warn!("{}: no generatable columns, skipping", catalog.table_name);
            None
        } else {
            Some(GenerationRequest {
                table_name: catalog.table_name.clone(),
                target_row_count: self.target_row_count(catalog.live_rows),
                column_names: profile.column_names(),
                columns: profile.columns.clone(),
            })
        };

        self.profiles.insert(catalog.table_name.clone(), profile);
        Ok(request)
    }

    /// Plan a table and build the row sampler for it.
    pub fn sampler_for(
        &mut self,
        catalog: &TableCatalog,
    ) -> Result<Option<(GenerationRequest, RowSampler)>> {
        let Some(request) = self.plan_table(catalog)? else {
            return Ok(None);
        };
        let Some(profile) = self.profiles.get(&request.table_name) else {
            return Ok(None);
        };

        let mut generators = Vec::with_capacity(request.columns.len());
        for column in request.columns.values() {
            let source = match profile.statistics.get(&column.column_name) {
                Some(stats) => {
                    let bounds = catalog
                        .numeric_bounds
                        .get(&column.column_name)
                        .map(|&(min, max)| NumericBounds { min, max })
                        .unwrap_or_default();
                    synthesize_pool(
                        column,
                        stats,
                        request.target_row_count,
                        bounds,
                        &self.settings,
                        &mut self.rng,
                    )
                    .map(|pool| ColumnSource::Pool {
                        pool,
                        null_frac: stats.null_frac,
                    })
                }
                None => None,
            };
            let source = match source {
                Some(pooled) => pooled,
                None => {
                    debug!(
                        "{}.{}: no common values, using {} fallback",
                        column.table_name, column.column_name, column.kind
                    );
                    match Fallback::for_column(column) {
                        Some(fallback) => ColumnSource::Fallback(fallback),
                        None => {
                            return Err(SynthError::UnsupportedType {
                                table: column.table_name.clone(),
                                column: column.column_name.clone(),
                                type_name: column.type_name.clone(),
                            })
                        }
                    }
                }
            };
            generators.push(ColumnGenerator {
                column_name: column.column_name.clone(),
                source,
            });
        }

        let sampler = RowSampler::new(generators, self.options.null_draw, self.settings);
        Ok(Some((request, sampler)))
    }

    /// Generate the full batch of one table.
    pub fn generate_table(&mut self, catalog: &TableCatalog) -> Result<Option<InsertBatch>> {
        self.generate_rows(catalog, None)
    }

    /// Generate `row_count` rows of a table, or its target row count when
    /// `None`. Value pools are sized for the target either way.
    pub fn generate_rows(
        &mut self,
        catalog: &TableCatalog,
        row_count: Option<usize>,
    ) -> Result<Option<InsertBatch>> {
        let Some((request, sampler)) = self.sampler_for(catalog)? else {
            return Ok(None);
        };

        let count = row_count.unwrap_or(request.target_row_count as usize);
        let rows = sampler.sample_rows(count, &mut self.rng);
        let column_types = request
            .columns
            .values()
            .map(|c| c.type_name.clone())
            .collect();

        info!("{}: generated {} rows", request.table_name, rows.len());
        Ok(Some(InsertBatch {
            table_name: request.table_name,
            columns: request.column_names,
            column_types,
            rows,
        }))
    }
}

/// Generate batches for every selected table of the source.
///
/// All batches are produced before anything is inserted. Failing to list
/// tables or losing the connection aborts the run; any other error only
/// marks its table as skipped or failed.
pub async fn generate_all<C: CatalogSource>(
    ctx: &mut RunContext,
    source: &C,
    progress_callback: Option<&(dyn Fn(&str, usize, usize) + Send + Sync)>,
) -> Result<GenerationRun> {
    let all_tables = source.list_tables().await?;
    let tables = select_tables(&all_tables, ctx.options.tables.as_deref());

    let mut run = GenerationRun::default();
    let total = tables.len();

    for (i, table) in tables.iter().enumerate() {
        if let Some(cb) = progress_callback {
            cb(table, i, total);
        }

        let catalog = match gather_table_catalog(source, table).await {
            Ok(catalog) => catalog,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}: {}", table, e);
                run.summary.record(table, TableOutcome::Failed {
                    error: e.to_string(),
                });
                continue;
            }
        };

        match ctx.generate_table(&catalog) {
            Ok(Some(batch)) => {
                run.summary.record(table, TableOutcome::Generated {
                    rows: batch.row_count(),
                });
                run.batches.push(batch);
            }
            Ok(None) => run.summary.record(table, TableOutcome::Skipped {
                reason: "no generatable columns".to_string(),
            }),
            Err(e) => {
                warn!("{}: {}", table, e);
                run.summary.record(table, TableOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Some(cb) = progress_callback {
        cb("", total, total);
    }

    Ok(run)
}

fn select_tables(all_tables: &[String], wanted: Option<&[String]>) -> Vec<String> {
    let Some(wanted) = wanted else {
        return all_tables.to_vec();
    };
    let present: HashSet<&str> = all_tables.iter().map(String::as_str).collect();
    for name in wanted {
        if !present.contains(name.as_str()) {
            warn!("table '{}' not found in source schema", name);
        }
    }
    all_tables
        .iter()
        .filter(|t| wanted.contains(t))
        .cloned()
        .collect()
}
