use std::collections::BTreeSet;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::error::{Result, SynthError};
use crate::output::direct::{quote_identifier, sanitize_url};
use crate::schema::array::parse_array_literal;
use crate::schema::introspect::CatalogSource;
use crate::schema::types::{RawColumn, RawStatistics};

/// Catalog of a PostgreSQL schema, read through `information_schema` and
/// `pg_stats`.
pub struct PostgresCatalog {
    pool: PgPool,
    schema_name: String,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_name: "public".to_string(),
        }
    }

    pub fn with_schema(pool: PgPool, schema_name: String) -> Self {
        Self { pool, schema_name }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    fn qualified(&self, table: &str) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema_name),
            quote_identifier(table)
        )
    }

    async fn column_set(&self, query: &str, label: &str, table: &str) -> Result<BTreeSet<String>> {
        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| catalog_error(label, table, e))?;
        Ok(rows.iter().map(|row| row.get("column_name")).collect())
    }
}

/// Open a connection pool, mapping failure to a connection error with the
/// password hidden.
pub async fn connect(db_url: &str, purpose: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .map_err(|e| SynthError::Connection {
            message: format!("Failed to connect to {}", purpose),
            connection_hint: sanitize_url(db_url),
            source: e,
        })
}

fn catalog_error(label: &str, table: &str, source: sqlx::Error) -> SynthError {
    if matches!(
        source,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Tls(_)
    ) {
        return SynthError::Connection {
            message: format!("Lost connection while reading {} of {}", label, table),
            connection_hint: String::new(),
            source,
        };
    }
    SynthError::Catalog {
        query: format!("{} of {}", label, table),
        source,
    }
}

fn to_u32(v: Option<i32>) -> Option<u32> {
    v.and_then(|v| u32::try_from(v).ok())
}

impl CatalogSource for PostgresCatalog {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let query = "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";
        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthError::Catalog {
                query: "fetch tables".to_string(),
                source: e,
            })?;
        Ok(rows.iter().map(|row| row.get("table_name")).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<RawColumn>> {
        let query = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.character_maximum_length::int4 AS character_maximum_length,
                c.column_default::text AS column_default,
                c.numeric_precision::int4 AS numeric_precision,
                c.numeric_precision_radix::int4 AS numeric_precision_radix,
                c.numeric_scale::int4 AS numeric_scale
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| catalog_error("columns", table, e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let mut column = RawColumn::new(&name, &data_type);
            column.max_length = to_u32(row.get("character_maximum_length"));
            column.default_expr = row.get("column_default");
            column.numeric_precision = to_u32(row.get("numeric_precision"));
            column.numeric_precision_radix = to_u32(row.get("numeric_precision_radix"));
            column.numeric_scale = to_u32(row.get("numeric_scale"));
            columns.push(column);
        }
        Ok(columns)
    }

    async fn list_primary_keys(&self, table: &str) -> Result<BTreeSet<String>> {
        let query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1
                AND tc.table_name = $2
                AND tc.constraint_type = 'PRIMARY KEY'
        "#;
        self.column_set(query, "primary keys", table).await
    }

    async fn list_foreign_key_columns(&self, table: &str) -> Result<BTreeSet<String>> {
        let query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1
                AND tc.table_name = $2
                AND tc.constraint_type = 'FOREIGN KEY'
        "#;
        self.column_set(query, "foreign keys", table).await
    }

    async fn list_column_statistics(&self, table: &str) -> Result<Vec<RawStatistics>> {
        // anyarray columns have no client-side type; read them as text.
        let query = r#"
            SELECT
                attname::text AS column_name,
                null_frac::float8 AS null_frac,
                avg_width,
                n_distinct::float8 AS n_distinct,
                most_common_vals::text AS most_common_vals,
                most_common_freqs::float8[] AS most_common_freqs,
                histogram_bounds::text AS histogram_bounds,
                correlation::float8 AS correlation
            FROM pg_stats
            WHERE schemaname = $1 AND tablename = $2
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| catalog_error("statistics", table, e))?;

        let mut statistics = Vec::with_capacity(rows.len());
        for row in rows {
            let most_common_vals: Option<String> = row.get("most_common_vals");
            let histogram_bounds: Option<String> = row.get("histogram_bounds");
            statistics.push(RawStatistics {
                column_name: row.get("column_name"),
                null_frac: row.get::<Option<f64>, _>("null_frac").unwrap_or(0.0),
                avg_width: row.get::<Option<i32>, _>("avg_width").unwrap_or(0),
                n_distinct: row.get::<Option<f64>, _>("n_distinct").unwrap_or(0.0),
                most_common_vals: most_common_vals.as_deref().and_then(parse_array_literal),
                most_common_freqs: row.get("most_common_freqs"),
                histogram_bounds: histogram_bounds.as_deref().and_then(parse_array_literal),
                correlation: row.get("correlation"),
            });
        }
        Ok(statistics)
    }

    async fn live_row_count(&self, table: &str) -> Result<Option<u64>> {
        let query = format!("SELECT COUNT(*) AS row_count FROM {}", self.qualified(table));
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| catalog_error("row count", table, e))?;
        let count: Option<i64> = row.get("row_count");
        Ok(count.and_then(|c| u64::try_from(c).ok()))
    }

    async fn min_max(&self, table: &str, column: &str) -> Result<(Option<f64>, Option<f64>)> {
        let column = quote_identifier(column);
        let query = format!(
            "SELECT MIN({col})::float8 AS min_value, MAX({col})::float8 AS max_value FROM {}",
            self.qualified(table),
            col = column
        );
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| catalog_error("bounds", table, e))?;
        Ok((row.get("min_value"), row.get("max_value")))
    }
}
