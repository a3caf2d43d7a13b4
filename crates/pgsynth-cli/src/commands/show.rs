use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use serde::Serialize;

use pgsynth_core::schema::introspect::{gather_table_catalog, CatalogSource};
use pgsynth_core::schema::profile::build_table_profile;
use pgsynth_core::schema::types::{TableCatalog, TypeKind};

use crate::args::{ShowArgs, ShowFormat};
use crate::commands::{load_config, resolve_db_url, resolve_schema, source_catalog, spinner, truncate_cell};

#[derive(Debug, Serialize)]
struct TableSummary {
    table: String,
    live_rows: Option<u64>,
    columns: Vec<ColumnSummary>,
}

#[derive(Debug, Serialize)]
struct ColumnSummary {
    name: String,
    data_type: String,
    kind: TypeKind,
    /// "generated", or why the database fills the column.
    role: String,
    null_frac: Option<f64>,
    n_distinct: Option<f64>,
    common_values: Vec<String>,
    bounds: Option<(Option<f64>, Option<f64>)>,
}

pub async fn run(args: &ShowArgs) -> Result<()> {
    let config = load_config()?;
    let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;
    let schema = resolve_schema(args.schema.as_deref(), config.as_ref());
    let catalog = source_catalog(&db_url, schema).await?;

    let pb = spinner("1/1", "Reading statistics...");
    let mut tables = catalog
        .list_tables()
        .await
        .context("Failed to list source tables")?;
    if !args.tables.is_empty() {
        tables.retain(|t| args.tables.contains(t));
    }

    let mut summaries = Vec::with_capacity(tables.len());
    for table in &tables {
        pb.set_message(format!("Reading statistics... {}", table));
        match gather_table_catalog(&catalog, table).await {
            Ok(table_catalog) => summaries.push(summarize(&table_catalog)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => tracing::warn!("{}: {}", table, e),
        }
    }
    pb.finish_with_message(format!("Reading statistics... ✓ {} tables", summaries.len()));

    match args.format {
        ShowFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        ShowFormat::Table => {
            for summary in &summaries {
                print_table(summary);
            }
        }
    }

    Ok(())
}

fn summarize(catalog: &TableCatalog) -> TableSummary {
    let profile = build_table_profile(catalog, false);

    let columns = catalog
        .columns
        .iter()
        .map(|column| {
            let role = profile
                .excluded
                .iter()
                .find(|(name, _)| name == &column.name)
                .map(|(_, reason)| reason.to_string())
                .unwrap_or_else(|| "generated".to_string());
            let stats = catalog
                .statistics
                .iter()
                .find(|s| s.column_name == column.name);

            ColumnSummary {
                name: column.name.clone(),
                data_type: column.type_name.clone(),
                kind: TypeKind::classify(&column.type_name),
                role,
                null_frac: stats.map(|s| s.null_frac),
                n_distinct: stats.map(|s| s.n_distinct),
                common_values: stats
                    .and_then(|s| s.most_common_vals.as_ref())
                    .map(|vals| {
                        vals.iter()
                            .map(|v| v.clone().unwrap_or_else(|| "NULL".to_string()))
                            .collect()
                    })
                    .unwrap_or_default(),
                bounds: catalog.numeric_bounds.get(&column.name).copied(),
            }
        })
        .collect();

    TableSummary {
        table: catalog.table_name.clone(),
        live_rows: catalog.live_rows,
        columns,
    }
}

fn print_table(summary: &TableSummary) {
    match summary.live_rows {
        Some(rows) => println!("━━━ {} ({} rows) ━━━", summary.table, rows),
        None => println!("━━━ {} (row count unknown) ━━━", summary.table),
    }

    let mut t = ComfyTable::new();
    t.set_header(vec![
        "Column", "Type", "Kind", "Role", "Null %", "Distinct", "Common values", "Range",
    ]);

    for column in &summary.columns {
        let null_pct = column
            .null_frac
            .map(|f| format!("{:.1}", f * 100.0))
            .unwrap_or_default();
        let distinct = column.n_distinct.map(format_distinct).unwrap_or_default();
        let common = truncate_cell(&column.common_values.join(", "), 40);
        let range = match column.bounds {
            Some((Some(min), Some(max))) => format!("{} .. {}", min, max),
            _ => String::new(),
        };

        t.add_row(vec![
            Cell::new(&column.name),
            Cell::new(&column.data_type),
            Cell::new(column.kind.to_string()),
            Cell::new(&column.role),
            Cell::new(null_pct),
            Cell::new(distinct),
            Cell::new(common),
            Cell::new(range),
        ]);
    }

    println!("{}", t);
    println!();
}

/// Negative `n_distinct` is a fraction of the row count.
fn format_distinct(n_distinct: f64) -> String {
    if n_distinct < 0.0 {
        format!("{:.0}% of rows", -n_distinct * 100.0)
    } else {
        format!("{}", n_distinct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgsynth_core::schema::types::{RawColumn, RawStatistics};

    #[test]
    fn test_format_distinct() {
        assert_eq!(format_distinct(-0.5), "50% of rows");
        assert_eq!(format_distinct(19.0), "19");
    }

    #[test]
    fn test_summarize_marks_roles() {
        let mut catalog = TableCatalog::new("actor");
        let mut actor_id = RawColumn::new("actor_id", "integer");
        actor_id.default_expr = Some("nextval('actor_actor_id_seq'::regclass)".to_string());
        catalog.columns = vec![actor_id, RawColumn::new("first_name", "text")];
        catalog.primary_keys.insert("actor_id".to_string());
        catalog.statistics = vec![RawStatistics {
            column_name: "first_name".to_string(),
            null_frac: 0.1,
            n_distinct: -0.6,
            most_common_vals: Some(vec![Some("KENNETH".to_string()), None]),
            most_common_freqs: Some(vec![0.02, 0.01]),
            ..Default::default()
        }];
        catalog.live_rows = Some(200);

        let summary = summarize(&catalog);
        assert_eq!(summary.columns[0].role, "primary key");
        assert_eq!(summary.columns[1].role, "generated");
        assert_eq!(summary.columns[1].kind, TypeKind::Text);
        assert_eq!(summary.columns[1].common_values, vec!["KENNETH", "NULL"]);
        assert_eq!(summary.columns[0].null_frac, None);
    }
}
