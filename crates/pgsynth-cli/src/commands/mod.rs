pub mod generate;
pub mod preview;
pub mod show;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use pgsynth_core::config::PgSynthConfig;
use pgsynth_core::schema::postgres::{self, PostgresCatalog};
use pgsynth_core::SynthError;

/// Load the optional pgsynth.toml from the working directory.
pub fn load_config() -> Result<Option<PgSynthConfig>> {
    Ok(pgsynth_core::config::read_config(Path::new("."))?)
}

/// Resolve the source URL from args, env, .env file, or pgsynth.toml.
///
/// `explicit` already carries `DATABASE_URL` through clap's `env`, and the
/// `.env` file is loaded before parsing.
pub fn resolve_db_url(explicit: Option<&str>, config: Option<&PgSynthConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }
    if let Some(url) = config.and_then(|c| c.source.url.as_ref()) {
        return Ok(url.clone());
    }
    Err(SynthError::NoDatabaseUrl.into())
}

/// Schema name from args or pgsynth.toml, `public` otherwise.
pub fn resolve_schema(explicit: Option<&str>, config: Option<&PgSynthConfig>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.source.schema.clone()))
        .unwrap_or_else(|| "public".to_string())
}

/// Connect to the source and wrap it in a catalog reader.
pub async fn source_catalog(db_url: &str, schema: String) -> Result<PostgresCatalog> {
    let pool = postgres::connect(db_url, "source database").await?;
    Ok(PostgresCatalog::with_schema(pool, schema))
}

pub fn spinner(prefix: &str, message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Shorten a cell for terminal output.
pub fn truncate_cell(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_url_wins_over_config() {
        let config: PgSynthConfig =
            toml::from_str("[source]\nurl = \"postgres://from-config/db\"\n").unwrap();
        assert_eq!(
            resolve_db_url(Some("postgres://flag/db"), Some(&config)).unwrap(),
            "postgres://flag/db"
        );
        assert_eq!(
            resolve_db_url(None, Some(&config)).unwrap(),
            "postgres://from-config/db"
        );
        assert!(resolve_db_url(None, None).is_err());
    }

    #[test]
    fn test_schema_defaults_to_public() {
        assert_eq!(resolve_schema(None, None), "public");
        assert_eq!(resolve_schema(Some("sales"), None), "sales");
    }

    #[test]
    fn test_truncate_cell_counts_chars() {
        assert_eq!(truncate_cell("short", 10), "short");
        assert_eq!(truncate_cell("ééééééééééé", 6), "ééé...");
    }
}
