// Copyright 2026 Oxide Computer Company

//! Concurrent batch processing.

use crate::{BatchError, IdentifiedFile, MetadataBackend, identify};
use git_file_id::{BatchInput, BatchOutcome, BatchResult, IdentifierOptions};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

/// The number of items in flight when no concurrency is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Called with `(completed, total)` each time a batch item finishes.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options controlling a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// The maximum number of items in flight. Zero is treated as one.
    pub concurrency: usize,
    /// If true, a failed item is recorded in its result and the batch
    /// carries on. If false, the first failure aborts the batch.
    pub continue_on_error: bool,
    /// How identifiers are generated.
    pub identifier: IdentifierOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            concurrency: DEFAULT_CONCURRENCY,
            continue_on_error: true,
            identifier: IdentifierOptions::default(),
        }
    }
}

/// Identifies every input, at most `options.concurrency` at a time.
///
/// All inputs are validated before any work starts. Results are returned
/// in input order, whatever order the items complete in. `on_progress`
/// is called once per completed item, successful or not, with a strictly
/// increasing completed count.
///
/// Returns an error if an input is invalid, if an item fails while
/// `continue_on_error` is off, or if a worker task panics. Items still in
/// flight when an error is returned are cancelled.
pub async fn run_batch<B>(
    backend: Arc<B>,
    inputs: Vec<BatchInput>,
    options: &BatchOptions,
    on_progress: Option<ProgressCallback>,
) -> Result<Vec<BatchResult>, BatchError>
where
    B: MetadataBackend + ?Sized + 'static,
{
    for (index, input) in inputs.iter().enumerate() {
        input.validate(index)?;
    }
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let total = inputs.len();
    let concurrency = options.concurrency.max(1);
    info!(total, concurrency, "starting batch");

    // Every slot is overwritten when its task completes.
    let mut results: Vec<BatchResult> = inputs
        .iter()
        .map(|input| BatchResult::error(input.file_path(), "not processed"))
        .collect();

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let progress = Arc::new(Progress::new(total, on_progress));
    let identifier_options = options.identifier;
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let backend = backend.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();

        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = identify(&*backend, &input, &identifier_options).await;

            let completed = progress.advance();
            debug!(
                index,
                file_path = input.file_path(),
                ok = outcome.is_ok(),
                completed,
                total,
                "batch item finished"
            );
            (index, input, outcome)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (index, input, outcome) = joined.map_err(BatchError::TaskFailed)?;
        let file_path = input.file_path().to_owned();
        results[index] = match outcome {
            Ok(IdentifiedFile { identifier, metadata }) => {
                let (identifier, short) = identifier.into_parts();
                BatchResult {
                    file_path,
                    outcome: BatchOutcome::Success { identifier, short, metadata },
                }
            }
            Err(error) => {
                warn!(index, file_path = %file_path, error = %error, "batch item failed");
                if !options.continue_on_error {
                    // Dropping the join set aborts the remaining tasks.
                    return Err(BatchError::ItemFailed { index, file_path, error });
                }
                failed += 1;
                BatchResult::error(file_path, error.to_string())
            }
        };
    }

    info!(total, succeeded = total - failed, failed, "finished batch");
    Ok(results)
}

/// Counts completed items and reports each completion.
struct Progress {
    completed: Mutex<usize>,
    total: usize,
    callback: Option<ProgressCallback>,
}

impl Progress {
    fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Progress { completed: Mutex::new(0), total, callback }
    }

    /// Records one completed item, calls the callback and returns the new
    /// count.
    ///
    /// The count and the callback share the lock so that callbacks observe
    /// strictly increasing counts. A callback that panicked poisons the
    /// lock but leaves the count intact, so later items still report.
    fn advance(&self) -> usize {
        let mut count =
            self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        if let Some(callback) = &self.callback {
            callback(*count, self.total);
        }
        *count
    }
}

/// A reusable batch configuration with any number of progress listeners.
///
/// ```
/// use git_file_id_backend::{BatchOptions, BatchProcessor};
///
/// let processor = BatchProcessor::new(BatchOptions { concurrency: 4, ..Default::default() })
///     .on_progress(|done, total| eprintln!("{done}/{total}"));
/// assert_eq!(processor.options().concurrency, 4);
/// ```
#[derive(Clone, Default)]
pub struct BatchProcessor {
    options: BatchOptions,
    callbacks: Vec<ProgressCallback>,
}

impl BatchProcessor {
    /// Creates a processor with `options` and no listeners.
    pub fn new(options: BatchOptions) -> Self {
        BatchProcessor { options, callbacks: Vec::new() }
    }

    /// Adds a progress listener. Every listener is called for every
    /// completed item, in registration order.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Returns the processor's options.
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Runs [`run_batch`] with this processor's options and listeners.
    pub async fn process<B>(
        &self,
        backend: Arc<B>,
        inputs: Vec<BatchInput>,
    ) -> Result<Vec<BatchResult>, BatchError>
    where
        B: MetadataBackend + ?Sized + 'static,
    {
        let on_progress: Option<ProgressCallback> = if self.callbacks.is_empty() {
            None
        } else {
            let callbacks = self.callbacks.clone();
            Some(Arc::new(move |done: usize, total: usize| {
                for callback in &callbacks {
                    callback(done, total);
                }
            }))
        };
        run_batch(backend, inputs, &self.options, on_progress).await
    }
}
