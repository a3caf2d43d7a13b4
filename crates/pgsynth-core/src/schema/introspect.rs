use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::types::{RawColumn, RawStatistics, TableCatalog, TypeKind};

/// Read access to the catalog of the source database.
/// Each backend implements this to expose schema rows and planner statistics.
pub trait CatalogSource: Send + Sync {
    /// Base tables of the configured schema, ordered by name.
    fn list_tables(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Columns of a table in ordinal order.
    fn list_columns(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Vec<RawColumn>>> + Send;

    fn list_primary_keys(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<BTreeSet<String>>> + Send;

    fn list_foreign_key_columns(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<BTreeSet<String>>> + Send;

    /// One entry per analyzed column; columns never analyzed are absent.
    fn list_column_statistics(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Vec<RawStatistics>>> + Send;

    /// Current row count of the table, `None` when it cannot be determined.
    fn live_row_count(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Option<u64>>> + Send;

    /// Live `MIN` and `MAX` of a numeric column.
    fn min_max(
        &self,
        table: &str,
        column: &str,
    ) -> impl std::future::Future<Output = Result<(Option<f64>, Option<f64>)>> + Send;
}

/// Fetch everything needed to generate one table.
///
/// Structural queries (columns, keys, statistics) propagate their errors.
/// The row count and numeric bounds only refine generation, so a failure
/// there is logged and the value treated as unknown.
pub async fn gather_table_catalog<C: CatalogSource>(source: &C, table: &str) -> Result<TableCatalog> {
    let mut catalog = TableCatalog::new(table);
    catalog.columns = source.list_columns(table).await?;
    catalog.primary_keys = source.list_primary_keys(table).await?;
    catalog.foreign_key_columns = source.list_foreign_key_columns(table).await?;
    catalog.statistics = source.list_column_statistics(table).await?;

    catalog.live_rows = match source.live_row_count(table).await {
        Ok(rows) => rows,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("{}: row count unavailable, using default: {}", table, e);
            None
        }
    };

    // Bounds feed long-tail synthesis, so only columns with common values need them.
    let with_common_values: Vec<&str> = catalog
        .statistics
        .iter()
        .filter(|s| s.most_common_vals.as_ref().is_some_and(|v| !v.is_empty()))
        .map(|s| s.column_name.as_str())
        .collect();
    for column in &catalog.columns {
        if TypeKind::classify(&column.type_name) != TypeKind::Numeric
            || !with_common_values.contains(&column.name.as_str())
        {
            continue;
        }
        match source.min_max(table, &column.name).await {
            Ok(bounds) => {
                catalog.numeric_bounds.insert(column.name.clone(), bounds);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("{}.{}: bounds unavailable: {}", table, column.name, e),
        }
    }

    debug!(
        "{}: {} columns, {} statistics rows, {:?} live rows",
        table,
        catalog.columns.len(),
        catalog.statistics.len(),
        catalog.live_rows
    );
    Ok(catalog)
}
