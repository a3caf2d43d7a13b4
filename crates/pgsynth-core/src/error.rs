//! # Error Types
//!
//! Defines `SynthError`, the unified error enum for every failure mode in
//! the pgsynth pipeline. Variants carry the table (and column, type, or tool
//! name) involved so a per-table diagnostic can be printed without digging
//! through logs.

use thiserror::Error;

/// All errors that can occur in pgsynth operations.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Catalog query failed on '{query}': {source}")]
    Catalog {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No database URL provided. pgsynth looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. .env file with DATABASE_URL\n  4. pgsynth.toml [source] section\n\nExample: pgsynth generate --db postgres://localhost/dvdrental --target dvdrental_synth")]
    NoDatabaseUrl,

    #[error("The \"{type_name}\" data type of column {table}.{column} is not supported. Skipping the \"{table}\" table")]
    UnsupportedType {
        table: String,
        column: String,
        type_name: String,
    },

    #[error("Insert failed on {table} at row {row_index}: {message}\n  DB error: {source}")]
    InsertFailed {
        table: String,
        row_index: usize,
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database \"{database}\" could not be created: {message}")]
    CreateDatabase { database: String, message: String },

    #[error("Database structure could not be copied: {tool} failed: {message}")]
    SchemaClone { tool: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl SynthError {
    /// True when the error means the database cannot be reached at all,
    /// which aborts the whole run instead of a single table.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SynthError::Connection { .. } | SynthError::NoDatabaseUrl)
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_message_names_table_and_type() {
        let err = SynthError::UnsupportedType {
            table: "film".to_string(),
            column: "fulltext".to_string(),
            type_name: "tsvector".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"tsvector\""));
        assert!(msg.contains("film.fulltext"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_connection_error_is_fatal() {
        let err = SynthError::Connection {
            message: "refused".to_string(),
            connection_hint: "postgres://localhost/db".to_string(),
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(err.is_fatal());
    }
}
