// Concurrent fan-out of records from a source through a transform and a sink.
//
// One driving task pulls records from the source. Every record gets its own
// task that runs transform then sink and reports exactly one outcome.
// Outcomes arrive in completion order, not in source order.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;

use crate::data::record::{BatchResult, ProcessingOutcome, Record};
use crate::error::ApiError;
use crate::processing::traits::{RecordSource, RecordStep};

/// Handle on a started run.
///
/// `outcomes` yields results as records complete and closes once every
/// dispatched record has reported. `done` then resolves with the run's
/// terminal status.
pub struct FanOutRun {
    pub outcomes: mpsc::UnboundedReceiver<ProcessingOutcome>,
    pub done: oneshot::Receiver<BatchResult>,
}

impl FanOutRun {
    /// Drain the run, handing each outcome to `on_outcome`, and return the
    /// terminal result.
    pub async fn for_each<F>(mut self, mut on_outcome: F) -> BatchResult
    where
        F: FnMut(ProcessingOutcome),
    {
        while let Some(outcome) = self.outcomes.recv().await {
            on_outcome(outcome);
        }
        match self.done.await {
            Ok(result) => result,
            Err(_) => BatchResult {
                terminal_error: Some(ApiError::internal("fan-out run ended without a result")),
            },
        }
    }
}

/// Fan-out engine. Unbounded by default; with `max_concurrency` set, at most
/// that many records are inside transform/sink at once. Either way each
/// record yields exactly one outcome; a step that panics reports `Internal`.
///
/// A run cannot be cancelled: once started it drains its source and waits
/// for every dispatched record.
#[derive(Debug, Clone, Default)]
pub struct FanOutRunner {
    max_concurrency: Option<usize>,
}

impl FanOutRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(max_concurrency: Option<usize>) -> Self {
        Self {
            max_concurrency: max_concurrency.filter(|n| *n > 0),
        }
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Start a run. The returned handle is usable immediately, before the
    /// source has produced anything.
    pub fn run(
        &self,
        source: Box<dyn RecordSource>,
        transform: Arc<dyn RecordStep>,
        sink: Arc<dyn RecordStep>,
    ) -> FanOutRun {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let permits = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        tokio::spawn(async move {
            let started = Instant::now();
            let source_name = source.name();
            let mut tasks = JoinSet::new();
            let mut dispatched = 0usize;

            let source_result = {
                let mut dispatch = |record: Record| -> Result<(), ApiError> {
                    let outcome_tx = outcome_tx.clone();
                    let transform = transform.clone();
                    let sink = sink.clone();
                    let permits = permits.clone();

                    tasks.spawn(async move {
                        let _permit = match permits {
                            Some(sem) => sem.acquire_owned().await.ok(),
                            None => None,
                        };
                        let record_id = record.id();
                        let work = process_record(record, transform.as_ref(), sink.as_ref());
                        let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                tracing::error!(record_id = %record_id, "Fan-out task panicked");
                                ProcessingOutcome {
                                    record_id,
                                    transformed: Record::empty(),
                                    error: Some(ApiError::internal("record processing panicked")),
                                }
                            }
                        };
                        // Receiver gone means the caller stopped listening
                        let _ = outcome_tx.send(outcome);
                    });
                    dispatched += 1;
                    Ok(())
                };
                source.provide(&mut dispatch).await
            };

            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Fan-out task failed: {}", e);
                }
            }
            drop(outcome_tx);

            if let Err(err) = &source_result {
                tracing::warn!("Fan-out source {} failed: {}", source_name, err);
            }
            tracing::debug!(
                "Fan-out run over {} finished: {} records in {:?}",
                source_name,
                dispatched,
                started.elapsed()
            );

            let _ = done_tx.send(BatchResult {
                terminal_error: source_result.err(),
            });
        });

        FanOutRun {
            outcomes: outcome_rx,
            done: done_rx,
        }
    }
}

async fn process_record(
    record: Record,
    transform: &dyn RecordStep,
    sink: &dyn RecordStep,
) -> ProcessingOutcome {
    let record_id = record.id();

    let result = match transform.apply(record).await {
        Ok(transformed) => sink.apply(transformed).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(transformed) => ProcessingOutcome {
            record_id,
            transformed,
            error: None,
        },
        Err(err) => ProcessingOutcome {
            record_id,
            transformed: Record::empty(),
            error: Some(err),
        },
    }
}
