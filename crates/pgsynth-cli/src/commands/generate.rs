use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use pgsynth_core::config::{validate_factor, PgSynthConfig};
use pgsynth_core::generate::engine::{generate_all, RunContext, RunSummary, SynthOptions, TableOutcome};
use pgsynth_core::output::direct::{sanitize_url, PostgresSink};
use pgsynth_core::output::sink::submit_all;
use pgsynth_core::schema::clone::{clone_schema, create_database, database_url};
use pgsynth_core::schema::postgres;

use crate::args::GenerateArgs;
use crate::commands::{load_config, resolve_db_url, resolve_schema, source_catalog, spinner, truncate_cell};

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let config = load_config()?;
    let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;
    let schema = resolve_schema(args.schema.as_deref(), config.as_ref());
    let target = resolve_target(args, config.as_ref())?;
    let owner = args
        .owner
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.target.owner.clone()));
    let options = synth_options(args, config.as_ref())?;
    let target_url = database_url(&db_url, &target)?;

    // Phase 1: Create the target database
    let pb = spinner("1/4", "Creating target database...");
    if args.no_create {
        pb.finish_with_message(format!("Creating target database... skipped, using \"{}\"", target));
    } else {
        let admin_pool = postgres::connect(&db_url, "source database").await?;
        create_database(&admin_pool, &target, owner.as_deref())
            .await
            .with_context(|| format!("Failed to create database \"{}\"", target))?;
        admin_pool.close().await;
        pb.finish_with_message(format!("Creating target database... ✓ \"{}\"", target));
    }

    // Phase 2: Copy the schema
    let pb2 = spinner("2/4", "Cloning schema...");
    if args.no_clone {
        pb2.finish_with_message("Cloning schema... skipped");
    } else {
        clone_schema(&db_url, &target_url)
            .await
            .context("Failed to clone the source schema")?;
        pb2.finish_with_message("Cloning schema... ✓");
    }

    // Phase 3: Generate every batch from the source statistics
    let catalog = source_catalog(&db_url, schema).await?;
    let mut ctx = RunContext::new(options);
    let pb3 = spinner("3/4", "Generating rows...");
    let generate_progress = |table: &str, done: usize, total: usize| {
        if !table.is_empty() {
            pb3.set_message(format!("Generating rows... {} ({}/{})", table, done + 1, total));
        }
    };
    let mut run = generate_all(&mut ctx, &catalog, Some(&generate_progress)).await?;
    let generated_rows: usize = run.batches.iter().map(|b| b.row_count()).sum();
    pb3.finish_with_message(format!(
        "Generating rows... ✓ {} rows across {} tables",
        generated_rows,
        run.batches.len()
    ));

    // Phase 4: Insert
    let pb4 = spinner("4/4", "Inserting rows...");
    let sink = PostgresSink::connect(&target_url).await?;
    let insert_progress = |table: &str, done: usize, total: usize| {
        if !table.is_empty() {
            pb4.set_message(format!("Inserting rows... {} ({}/{})", table, done + 1, total));
        }
    };
    submit_all(&sink, &mut run, Some(&insert_progress)).await;
    pb4.finish_with_message(format!(
        "Inserting rows... ✓ {} rows into {}",
        run.summary.rows_inserted(),
        sanitize_url(&target_url)
    ));

    println!();
    println!("{}", summary_table(&run.summary));
    println!(
        "{} inserted, {} skipped, {} failed",
        run.summary.inserted(),
        run.summary.skipped(),
        run.summary.failed()
    );

    if run.summary.failed() > 0 && run.summary.inserted() == 0 {
        bail!("No table could be filled; see the summary above");
    }

    Ok(())
}

fn resolve_target(args: &GenerateArgs, config: Option<&PgSynthConfig>) -> Result<String> {
    args.target
        .clone()
        .or_else(|| config.and_then(|c| c.target.database.clone()))
        .context("No target database name. Pass --target or set [target] database in pgsynth.toml")
}

/// Config-file options with command-line flags applied on top.
fn synth_options(args: &GenerateArgs, config: Option<&PgSynthConfig>) -> Result<SynthOptions> {
    let mut options = config.map(|c| c.synth_options()).unwrap_or_default();
    if let Some(factor) = args.factor {
        validate_factor(factor)?;
        options.multiplication_factor = factor;
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    if !args.tables.is_empty() {
        options.tables = Some(args.tables.clone());
    }
    if let Some(null_draw) = args.null_draw {
        options.null_draw = null_draw.into();
    }
    if args.skip_foreign_keys {
        options.skip_foreign_key_columns = true;
    }
    Ok(options)
}

fn summary_table(summary: &RunSummary) -> ComfyTable {
    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Status", "Rows", "Detail"]);
    for report in &summary.tables {
        let (status, rows, detail) = match &report.outcome {
            TableOutcome::Generated { rows } => ("generated", rows.to_string(), String::new()),
            TableOutcome::Inserted { rows } => ("inserted", rows.to_string(), String::new()),
            TableOutcome::Skipped { reason } => ("skipped", String::new(), reason.clone()),
            TableOutcome::Failed { error } => ("failed", String::new(), error.clone()),
        };
        t.add_row(vec![
            Cell::new(&report.table_name),
            Cell::new(status),
            Cell::new(rows),
            Cell::new(truncate_cell(&detail, 80)),
        ]);
    }
    t
}
