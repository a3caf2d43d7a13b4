use clap::{Parser, Subcommand, ValueEnum};

use pgsynth_core::generate::sampler::NullDraw;

#[derive(Parser, Debug)]
#[command(
    name = "pgsynth",
    about = "Clone a PostgreSQL schema and fill it with rows shaped like the source statistics",
    version,
    after_help = "Examples:\n  pgsynth show --db postgres://localhost/dvdrental\n  pgsynth preview --db postgres://localhost/dvdrental --table actor --rows 10\n  pgsynth generate --db postgres://localhost/dvdrental --target dvdrental_synth --factor 2\n  pgsynth generate --target dvdrental_synth --tables actor,film --seed 42   # DATABASE_URL from .env"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize the planner statistics of every table in the source
    Show(ShowArgs),

    /// Generate sample rows for one table without inserting them
    Preview(PreviewArgs),

    /// Create the target database, clone the schema and insert synthetic rows
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Source database connection URL
    /// Falls back to DATABASE_URL env var, .env file or pgsynth.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema name to read (default: public)
    #[arg(long)]
    pub schema: Option<String>,

    /// Only show these tables
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: ShowFormat,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Source database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema name
    #[arg(long)]
    pub schema: Option<String>,

    /// Table to preview
    #[arg(long)]
    pub table: String,

    /// Number of sample rows to print
    #[arg(long, default_value = "5")]
    pub rows: usize,

    /// Multiplication factor used to size the value pools
    #[arg(long)]
    pub factor: Option<f64>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Source database connection URL
    /// Falls back to DATABASE_URL env var, .env file or pgsynth.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Name of the database to create and fill
    #[arg(long)]
    pub target: Option<String>,

    /// Owner of the created database
    #[arg(long)]
    pub owner: Option<String>,

    /// Target rows per table as a multiple of the source row count
    #[arg(long)]
    pub factor: Option<f64>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Only generate data for these tables
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Schema name to read (default: public)
    #[arg(long)]
    pub schema: Option<String>,

    /// How nulls are drawn: per-row or per-column
    #[arg(long)]
    pub null_draw: Option<NullDrawArg>,

    /// Leave foreign key columns to the database
    #[arg(long)]
    pub skip_foreign_keys: bool,

    /// Use an existing target database instead of creating it
    #[arg(long)]
    pub no_create: bool,

    /// Skip copying the source schema into the target
    #[arg(long)]
    pub no_clone: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ShowFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NullDrawArg {
    PerRow,
    PerColumn,
}

impl From<NullDrawArg> for NullDraw {
    fn from(arg: NullDrawArg) -> Self {
        match arg {
            NullDrawArg::PerRow => NullDraw::PerRow,
            NullDrawArg::PerColumn => NullDraw::PerColumn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_flags() {
        let cli = Cli::parse_from([
            "pgsynth",
            "generate",
            "--db",
            "postgres://localhost/dvdrental",
            "--target",
            "dvdrental_synth",
            "--tables",
            "actor,film",
            "--factor",
            "2.5",
            "--null-draw",
            "per-column",
            "--no-clone",
        ]);
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.target.as_deref(), Some("dvdrental_synth"));
                assert_eq!(args.tables, vec!["actor", "film"]);
                assert_eq!(args.factor, Some(2.5));
                assert!(matches!(args.null_draw, Some(NullDrawArg::PerColumn)));
                assert!(args.no_clone);
                assert!(!args.no_create);
            }
            other => panic!("Expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_requires_table() {
        assert!(Cli::try_parse_from(["pgsynth", "preview", "--rows", "3"]).is_err());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["pgsynth", "show", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Show(ShowArgs {
                format: ShowFormat::Json,
                ..
            })
        ));
    }
}
