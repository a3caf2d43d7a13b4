//! Creation of the target database and copy of the source schema into it.
//!
//! The structure is copied with the PostgreSQL client tools: `pg_dump -s -Fc`
//! writes a schema-only custom-format archive to a temporary file, and
//! `pg_restore` replays it into the target. Both tools must be on `PATH`.

use std::path::Path;

use sqlx::postgres::PgPool;
use sqlx::Row;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SynthError};
use crate::output::direct::{quote_identifier, sanitize_url};

/// True when a database of this name exists on the server.
pub async fn database_exists(pool: &PgPool, name: &str) -> Result<bool> {
    let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_database WHERE datname = $1) AS present")
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| SynthError::Catalog {
            query: "pg_database lookup".to_string(),
            source: e,
        })?;
    Ok(row.get("present"))
}

/// `CREATE DATABASE` statement with quoted identifiers.
pub fn create_database_sql(name: &str, owner: Option<&str>) -> String {
    match owner {
        Some(owner) => format!(
            "CREATE DATABASE {} OWNER {}",
            quote_identifier(name),
            quote_identifier(owner)
        ),
        None => format!("CREATE DATABASE {}", quote_identifier(name)),
    }
}

/// Create an empty database. An existing database of the same name is an
/// error; its contents are never touched.
pub async fn create_database(admin_pool: &PgPool, name: &str, owner: Option<&str>) -> Result<()> {
    if database_exists(admin_pool, name).await? {
        return Err(SynthError::CreateDatabase {
            database: name.to_string(),
            message: "a database with this name already exists".to_string(),
        });
    }

    sqlx::query(&create_database_sql(name, owner))
        .execute(admin_pool)
        .await
        .map_err(|e| SynthError::CreateDatabase {
            database: name.to_string(),
            message: e.to_string(),
        })?;

    info!("created database \"{}\"", name);
    Ok(())
}

/// The source connection URL pointed at another database on the same server.
pub fn database_url(source_url: &str, database: &str) -> Result<String> {
    let mut parsed = url::Url::parse(source_url).map_err(|e| SynthError::Config {
        message: format!("Invalid database URL {}: {}", sanitize_url(source_url), e),
    })?;
    parsed.set_path(&format!("/{}", database));
    Ok(parsed.to_string())
}

/// Copy the table definitions of the source database into the target.
pub async fn clone_schema(source_url: &str, target_url: &str) -> Result<()> {
    let archive = tempfile::Builder::new()
        .prefix("pgsynth-schema-")
        .suffix(".dump")
        .tempfile()
        .map_err(|e| SynthError::Output {
            message: "Failed to create schema archive".to_string(),
            source: e,
        })?;
    let archive_path = archive.path().to_string_lossy().into_owned();

    let source_arg = format!("--dbname={}", source_url);
    let target_arg = format!("--dbname={}", target_url);
    run_tool(
        "pg_dump",
        &[source_arg.as_str(), "-s", "-Fc", "-f", archive_path.as_str()],
    )
    .await?;
    run_tool("pg_restore", &[target_arg.as_str(), archive_path.as_str()]).await?;

    info!("copied schema into {}", sanitize_url(target_url));
    Ok(())
}

/// Run a client tool to completion, failing with its stderr on a non-zero exit.
pub async fn run_tool(tool: &str, args: &[&str]) -> Result<()> {
    debug!("running {}", tool);
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|e| SynthError::SchemaClone {
            tool: tool.to_string(),
            message: format!("could not start: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SynthError::SchemaClone {
            tool: tool.to_string(),
            message: format!("{} ({})", stderr.trim(), output.status),
        });
    }
    Ok(())
}

/// True when `tool` can be found on `PATH`.
pub fn tool_available(tool: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| Path::new(&dir).join(tool).is_file()))
        .unwrap_or(false)
}
