use crate::{
    cancel::Controller,
    dns::{HickorySource, RecordSource},
    resolver::Resolver,
    types::{ConfigError, ProbeConfig, ProbeResult},
};
use futures::future::join_all;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinError,
};
use tracing::{debug, info};

/// Candidates buffered between the producer and the worker pool.
pub const QUEUE_CAPACITY: usize = 16;

/// Receives one tick per candidate a worker finished with.
pub trait Progress: Send + Sync {
    fn increment(&self);
    fn finish(&self);
}

#[derive(Debug, Default)]
pub struct Counter {
    done: AtomicU64,
    finished: AtomicBool,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Progress for Counter {
    fn increment(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

#[derive(Debug, Error)]
pub enum ProberError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Probe task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Output lines in the order workers finished them.
    pub lines: Vec<String>,
    pub processed: u64,
    pub outcome: Outcome,
}

impl RunReport {
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Completed => 0,
            // 128 + SIGINT
            Outcome::Cancelled => 130,
        }
    }
}

pub struct Prober<S = HickorySource> {
    resolver: Resolver<S>,
    config: Arc<ProbeConfig>,
}

impl Prober<HickorySource> {
    pub fn new(config: ProbeConfig) -> Result<Self, ProberError> {
        let source = HickorySource::new(config.timeout);
        Self::with_source(config, source)
    }
}

impl<S: RecordSource> Prober<S> {
    pub fn with_source(config: ProbeConfig, source: S) -> Result<Self, ProberError> {
        Self::with_shared_source(config, Arc::new(source))
    }

    pub fn with_shared_source(config: ProbeConfig, source: Arc<S>) -> Result<Self, ProberError> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            resolver: Resolver::new(source, Arc::clone(&config)),
            config,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Resolves a single candidate, ignoring the whitelist.
    pub async fn probe_one(&self, candidate: &str) -> ProbeResult {
        ProbeResult {
            candidate: candidate.to_string(),
            findings: self.resolver.resolve(candidate).await,
        }
    }

    /// Feeds `candidates` through the worker pool until they run out or the
    /// controller is interrupted.
    ///
    /// Returns only after every worker has exited and every result line has
    /// been collected.
    pub async fn run<I>(
        &self,
        candidates: I,
        controller: &Controller,
        progress: Arc<dyn Progress>,
    ) -> Result<RunReport, ProberError>
    where
        I: IntoIterator<Item = String>,
    {
        let (task_tx, task_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<String>();
        let processed = Arc::new(AtomicU64::new(0));

        info!(workers = self.config.workers, "Starting probe run");

        let aggregator = tokio::spawn(async move {
            let mut buffer = Vec::new();
            while let Some(line) = result_rx.recv().await {
                buffer.push(line);
            }
            buffer
        });

        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: Arc::clone(&task_rx),
                    results: result_tx.clone(),
                    resolver: self.resolver.clone(),
                    config: Arc::clone(&self.config),
                    controller: controller.clone(),
                    progress: Arc::clone(&progress),
                    processed: Arc::clone(&processed),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        // Workers hold the only senders now; the stream closes when the last exits.
        drop(result_tx);

        let cancelled = controller.token();
        for candidate in candidates {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    debug!("Producer stopped by cancellation");
                    break;
                }
                sent = task_tx.send(candidate) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(task_tx);

        for joined in join_all(workers).await {
            joined?;
        }
        let lines = aggregator.await?;
        progress.finish();

        let outcome = if controller.is_cancelled() {
            Outcome::Cancelled
        } else {
            Outcome::Completed
        };
        controller.stop();

        let processed = processed.load(Ordering::Relaxed);
        info!(processed, lines = lines.len(), ?outcome, "Probe run finished");

        Ok(RunReport {
            lines,
            processed,
            outcome,
        })
    }
}

struct Worker<S> {
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::UnboundedSender<String>,
    resolver: Resolver<S>,
    config: Arc<ProbeConfig>,
    controller: Controller,
    progress: Arc<dyn Progress>,
    processed: Arc<AtomicU64>,
}

impl<S: RecordSource> Worker<S> {
    async fn run(self) {
        loop {
            let next = self.queue.lock().await.recv().await;
            let Some(candidate) = next else {
                break;
            };

            if self.controller.is_cancelled() {
                debug!(worker = self.id, candidate = %candidate, "Stopping worker");
                break;
            }

            if !self.config.in_whitelist(&candidate) {
                let findings = self.resolver.resolve(&candidate).await;
                let result = ProbeResult { candidate, findings };
                if let Some(line) = result.output_line(self.config.verbose) {
                    // The aggregator outlives every worker.
                    let _ = self.results.send(line);
                }
            }

            self.progress.increment();
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let mut report = RunReport {
            lines: vec!["a: A".to_string(), "b".to_string()],
            processed: 2,
            outcome: Outcome::Completed,
        };
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.output(), "a: A\nb");

        report.outcome = Outcome::Cancelled;
        assert_eq!(report.exit_code(), 130);
    }

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.increment();
        counter.increment();
        counter.finish();
        assert_eq!(counter.get(), 2);
        assert!(counter.is_finished());
    }
}
