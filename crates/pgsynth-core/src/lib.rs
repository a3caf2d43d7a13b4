pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod schema;

// Re-export key types for convenience
pub use error::{Result, SynthError};
pub use generate::engine::{InsertBatch, RunContext, RunSummary, SynthOptions, TableOutcome};
pub use generate::value::Value;
