use std::collections::BTreeSet;
use std::sync::Mutex;

use indexmap::IndexMap;
use pgsynth_core::error::{Result, SynthError};
use pgsynth_core::generate::engine::InsertBatch;
use pgsynth_core::output::sink::BatchSink;
use pgsynth_core::schema::introspect::CatalogSource;
use pgsynth_core::schema::types::*;

/// In-memory catalog serving fixed table catalogs.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    tables: IndexMap<String, TableCatalog>,
    failing: BTreeSet<String>,
    unreachable: bool,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, catalog: TableCatalog) -> Self {
        self.tables.insert(catalog.table_name.clone(), catalog);
        self
    }

    /// Column listing of `table` fails with a catalog error.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    /// Every call fails as if the server were gone.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn table(&self, table: &str) -> Result<&TableCatalog> {
        if self.unreachable {
            return Err(connection_lost());
        }
        self.tables.get(table).ok_or_else(|| SynthError::Catalog {
            query: format!("columns of {}", table),
            source: sqlx::Error::RowNotFound,
        })
    }
}

fn connection_lost() -> SynthError {
    SynthError::Connection {
        message: "server unreachable".to_string(),
        connection_hint: "postgres://localhost/test".to_string(),
        source: sqlx::Error::PoolClosed,
    }
}

impl CatalogSource for StaticCatalog {
    async fn list_tables(&self) -> Result<Vec<String>> {
        if self.unreachable {
            return Err(connection_lost());
        }
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        if self.failing.contains(table) {
            return Err(SynthError::Catalog {
                query: format!("columns of {}", table),
                source: sqlx::Error::Protocol("relation does not exist".to_string()),
            });
        }
        Ok(self.table(table)?.columns.clone())
    }

    async fn list_primary_keys(&self, table: &str) -> Result<BTreeSet<String>> {
        Ok(self.table(table)?.primary_keys.clone())
    }

    async fn list_foreign_key_columns(&self, table: &str) -> Result<BTreeSet<String>> {
        Ok(self.table(table)?.foreign_key_columns.clone())
    }

    async fn list_column_statistics(&self, table: &str) -> Result<Vec<RawStatistics>> {
        Ok(self.table(table)?.statistics.clone())
    }

    async fn live_row_count(&self, table: &str) -> Result<Option<u64>> {
        Ok(self.table(table)?.live_rows)
    }

    async fn min_max(&self, table: &str, column: &str) -> Result<(Option<f64>, Option<f64>)> {
        Ok(self
            .table(table)?
            .numeric_bounds
            .get(column)
            .copied()
            .unwrap_or((None, None)))
    }
}

/// Sink that keeps every submitted batch in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<InsertBatch>>,
    failing: BTreeSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions for `table` fail as if the INSERT were rejected.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    pub fn batches(&self) -> Vec<InsertBatch> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn tables(&self) -> Vec<String> {
        self.batches().into_iter().map(|b| b.table_name).collect()
    }
}

impl BatchSink for RecordingSink {
    async fn submit(&self, batch: &InsertBatch) -> Result<u64> {
        if self.failing.contains(&batch.table_name) {
            return Err(SynthError::InsertFailed {
                table: batch.table_name.clone(),
                row_index: 0,
                message: "Batched INSERT failed".to_string(),
                source: sqlx::Error::Protocol("violates check constraint".to_string()),
            });
        }
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.clone());
        }
        Ok(batch.rows.len() as u64)
    }
}

fn column(name: &str, type_name: &str) -> RawColumn {
    RawColumn::new(name, type_name)
}

fn serial(name: &str, sequence: &str) -> RawColumn {
    let mut c = RawColumn::new(name, "integer");
    c.default_expr = Some(format!("nextval('{}'::regclass)", sequence));
    c.numeric_precision = Some(32);
    c.numeric_precision_radix = Some(2);
    c.numeric_scale = Some(0);
    c
}

fn varchar(name: &str, max_length: u32) -> RawColumn {
    let mut c = RawColumn::new(name, "character varying");
    c.max_length = Some(max_length);
    c
}

fn smallint(name: &str) -> RawColumn {
    let mut c = RawColumn::new(name, "smallint");
    c.numeric_precision = Some(16);
    c.numeric_precision_radix = Some(2);
    c.numeric_scale = Some(0);
    c
}

fn last_update() -> RawColumn {
    let mut c = RawColumn::new("last_update", "timestamp without time zone");
    c.default_expr = Some("now()".to_string());
    c
}

fn text_stats(column: &str, values: &[&str], freqs: &[f64], distinct: f64, avg_width: i32) -> RawStatistics {
    RawStatistics {
        column_name: column.to_string(),
        null_frac: 0.0,
        avg_width,
        n_distinct: distinct,
        most_common_vals: Some(values.iter().map(|v| Some(v.to_string())).collect()),
        most_common_freqs: Some(freqs.to_vec()),
        histogram_bounds: None,
        correlation: None,
    }
}

/// `actor`: serial key, two names with statistics, defaulted timestamp.
pub fn actor_catalog() -> TableCatalog {
    let mut catalog = TableCatalog::new("actor");
    catalog.columns = vec![
        serial("actor_id", "actor_actor_id_seq"),
        varchar("first_name", 45),
        varchar("last_name", 45),
        last_update(),
    ];
    catalog.primary_keys.insert("actor_id".to_string());
    catalog.statistics = vec![
        text_stats(
            "first_name",
            &["KENNETH", "PENELOPE", "JULIA"],
            &[0.02, 0.02, 0.02],
            128.0,
            6,
        ),
        text_stats("last_name", &["KILMER", "NOLTE"], &[0.025, 0.02], -0.605, 7),
    ];
    catalog.live_rows = Some(200);
    catalog
}

/// `film`: carries a `tsvector` column with no default, so it cannot be generated.
pub fn film_catalog() -> TableCatalog {
    let mut catalog = TableCatalog::new("film");
    catalog.columns = vec![
        serial("film_id", "film_film_id_seq"),
        varchar("title", 255),
        column("description", "text"),
        column("fulltext", "tsvector"),
    ];
    catalog.primary_keys.insert("film_id".to_string());
    catalog.live_rows = Some(1000);
    catalog
}

/// `film_category`: every column is part of the primary key.
pub fn film_category_catalog() -> TableCatalog {
    let mut catalog = TableCatalog::new("film_category");
    catalog.columns = vec![smallint("film_id"), smallint("category_id"), last_update()];
    catalog.primary_keys.insert("film_id".to_string());
    catalog.primary_keys.insert("category_id".to_string());
    catalog.foreign_key_columns.insert("film_id".to_string());
    catalog.foreign_key_columns.insert("category_id".to_string());
    catalog.live_rows = Some(1000);
    catalog
}

/// `payment`: numeric amount with live bounds, nullable date, foreign keys.
pub fn payment_catalog() -> TableCatalog {
    let mut catalog = TableCatalog::new("payment");
    let mut amount = column("amount", "numeric");
    amount.numeric_precision = Some(5);
    amount.numeric_precision_radix = Some(10);
    amount.numeric_scale = Some(2);
    catalog.columns = vec![
        serial("payment_id", "payment_payment_id_seq"),
        smallint("customer_id"),
        amount,
        column("payment_date", "timestamp without time zone"),
        column("refunded", "boolean"),
    ];
    catalog.primary_keys.insert("payment_id".to_string());
    catalog.foreign_key_columns.insert("customer_id".to_string());
    catalog.statistics = vec![
        RawStatistics {
            column_name: "amount".to_string(),
            null_frac: 0.0,
            avg_width: 6,
            n_distinct: 19.0,
            most_common_vals: Some(vec![
                Some("4.99".to_string()),
                Some("2.99".to_string()),
                Some("0.99".to_string()),
            ]),
            most_common_freqs: Some(vec![0.23, 0.22, 0.17]),
            histogram_bounds: None,
            correlation: Some(0.01),
        },
        RawStatistics {
            column_name: "payment_date".to_string(),
            null_frac: 0.25,
            avg_width: 8,
            n_distinct: -0.98,
            most_common_vals: Some(vec![Some("2007-04-30 01:10:44".to_string())]),
            most_common_freqs: Some(vec![0.001]),
            histogram_bounds: Some(vec![
                Some("2007-02-14 21:21:59".to_string()),
                Some("2007-05-14 13:44:29".to_string()),
            ]),
            correlation: Some(0.98),
        },
    ];
    catalog
        .numeric_bounds
        .insert("amount".to_string(), (Some(0.0), Some(11.99)));
    catalog.live_rows = Some(400);
    catalog
}

/// A small dvdrental-like source covering every table shape.
pub fn dvdrental() -> StaticCatalog {
    StaticCatalog::new()
        .with_table(actor_catalog())
        .with_table(film_catalog())
        .with_table(film_category_catalog())
        .with_table(payment_catalog())
}
