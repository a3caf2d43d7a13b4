use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use pgsynth_core::config::validate_factor;
use pgsynth_core::generate::engine::{RunContext, SynthOptions};
use pgsynth_core::schema::introspect::gather_table_catalog;

use crate::args::PreviewArgs;
use crate::commands::{load_config, resolve_db_url, resolve_schema, source_catalog, truncate_cell};

pub async fn run(args: &PreviewArgs) -> Result<()> {
    let config = load_config()?;
    let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;
    let schema = resolve_schema(args.schema.as_deref(), config.as_ref());
    let catalog = source_catalog(&db_url, schema).await?;

    let mut options = config
        .as_ref()
        .map(|c| c.synth_options())
        .unwrap_or_default();
    if let Some(factor) = args.factor {
        validate_factor(factor)?;
        options.multiplication_factor = factor;
    }
    // Fixed seed unless one is given, so repeated previews agree
    options.seed = Some(args.seed.or(options.seed).unwrap_or(42));
    let mut ctx = RunContext::new(SynthOptions {
        tables: None,
        ..options
    });

    let table_catalog = gather_table_catalog(&catalog, &args.table)
        .await
        .with_context(|| format!("Failed to read the catalog of table '{}'", args.table))?;
    if table_catalog.columns.is_empty() {
        anyhow::bail!("Table '{}' not found in the source schema", args.table);
    }

    let Some(batch) = ctx.generate_rows(&table_catalog, Some(args.rows))? else {
        println!("{}: no generatable columns", args.table);
        return Ok(());
    };

    println!(
        "━━━ {} ({} rows, target {}) ━━━",
        batch.table_name,
        batch.row_count(),
        ctx.target_row_count(table_catalog.live_rows)
    );

    let mut t = ComfyTable::new();
    t.set_header(batch.columns.iter().map(|c| c.as_str()).collect::<Vec<_>>());
    for row in &batch.rows {
        t.add_row(
            row.iter()
                .map(|v| truncate_cell(&v.to_string(), 40))
                .collect::<Vec<_>>(),
        );
    }
    println!("{}\n", t);

    Ok(())
}
