use tracing::{info, warn};

use crate::error::Result;
use crate::generate::engine::{GenerationRun, InsertBatch, TableOutcome};

/// Destination for generated batches.
/// Each submission is all-or-nothing for its table.
pub trait BatchSink: Send + Sync {
    /// Insert the whole batch and return the number of rows written.
    fn submit(&self, batch: &InsertBatch) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// Submit every batch of a run, recording one outcome per table.
///
/// A failed table is reported in the summary and the remaining batches are
/// still submitted.
pub async fn submit_all<S: BatchSink>(
    sink: &S,
    run: &mut GenerationRun,
    progress_callback: Option<&(dyn Fn(&str, usize, usize) + Send + Sync)>,
) {
    let total = run.batches.len();
    for (i, batch) in run.batches.iter().enumerate() {
        if let Some(cb) = progress_callback {
            cb(&batch.table_name, i, total);
        }
        match sink.submit(batch).await {
            Ok(rows) => {
                info!("{}: inserted {} rows", batch.table_name, rows);
                run.summary
                    .record(&batch.table_name, TableOutcome::Inserted { rows });
            }
            Err(e) => {
                warn!("{}: {}", batch.table_name, e);
                run.summary.record(&batch.table_name, TableOutcome::Failed {
                    error: e.to_string(),
                });
            }
        }
    }
    if let Some(cb) = progress_callback {
        cb("", total, total);
    }
}
