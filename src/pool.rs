//! Parallel page processing
//!
//! A fixed-size pool of worker threads that run the extractor over batches
//! of pages and hand the serialized records back in submission order, so the
//! driver can write sinks in input order regardless of worker count.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::config::ExtractOptions;
use crate::emit::{page_records, RecordSet};
use crate::extract::Extractor;
use crate::repair::repair_name;

/// Batch size of parsed pages shipped to the pool per worker, per dispatch.
pub const ARTICLES_PER_JOB: usize = 50;

/// One page's worth of work: identity plus the NFKD-normalized body.
#[derive(Debug, Clone)]
pub struct PageJob {
    /// Raw page title (repaired lazily where needed)
    pub title: String,
    /// Page id as it appeared in the dump
    pub id: String,
    /// Normalized article body
    pub body: String,
}

/// Extract and serialize one page.
///
/// Failures never escape: a page that runs past the rule budget, panics a
/// handler, or cannot be serialized is logged and yields an empty record
/// set, and processing moves on to the next article.
pub fn process_page(extractor: &Extractor, job: &PageJob) -> RecordSet {
    let extraction = match catch_unwind(AssertUnwindSafe(|| extractor.extract(&job.body))) {
        Ok(Ok(extraction)) => extraction,
        Ok(Err(error)) => {
            tracing::warn!("skipping article \"{}\": {error}", repair_name(&job.title));
            return RecordSet::default();
        }
        Err(_) => {
            tracing::warn!(
                "skipping article \"{}\": unexpected extraction failure",
                repair_name(&job.title)
            );
            return RecordSet::default();
        }
    };
    match page_records(&job.id, &job.title, &extraction, extractor.options()) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!("skipping article \"{}\": {error}", repair_name(&job.title));
            RecordSet::default()
        }
    }
}

/// Fixed-size worker pool with order-preserving batch dispatch.
///
/// Workers are spawned once and share nothing mutable; each holds its own
/// extractor over the process-wide compiled rule table. The bounded channels
/// cap outstanding work at one batch, which is the driver's backpressure.
pub struct WorkerPool {
    jobs: Option<Sender<(usize, PageJob)>>,
    results: Receiver<(usize, RecordSet)>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` threads extracting with the given options.
    pub fn new(workers: usize, options: ExtractOptions) -> Self {
        let capacity = workers * ARTICLES_PER_JOB;
        let (jobs_tx, jobs_rx) = bounded::<(usize, PageJob)>(capacity);
        let (results_tx, results_rx) = bounded::<(usize, RecordSet)>(capacity);

        let handles = (0..workers)
            .map(|_| {
                let jobs_rx = jobs_rx.clone();
                let results_tx = results_tx.clone();
                thread::spawn(move || {
                    let extractor = Extractor::new(options);
                    while let Ok((seq, job)) = jobs_rx.recv() {
                        let records = process_page(&extractor, &job);
                        if results_tx.send((seq, records)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            jobs: Some(jobs_tx),
            results: results_rx,
            workers: handles,
        }
    }

    /// The largest batch [`process_batch`](Self::process_batch) accepts
    /// without risking a full channel.
    pub fn batch_capacity(&self) -> usize {
        self.workers.len() * ARTICLES_PER_JOB
    }

    /// Run one batch through the pool, returning records in submission order.
    pub fn process_batch(&self, batch: Vec<PageJob>) -> Result<Vec<RecordSet>> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("worker pool already shut down"))?;
        let count = batch.len();
        for (seq, job) in batch.into_iter().enumerate() {
            jobs.send((seq, job))
                .map_err(|_| anyhow!("worker pool shut down unexpectedly"))?;
        }

        let mut slots: Vec<Option<RecordSet>> = vec![None; count];
        for _ in 0..count {
            let (seq, records) = self
                .results
                .recv()
                .map_err(|_| anyhow!("worker pool shut down unexpectedly"))?;
            slots[seq] = Some(records);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channel lets the workers drain and exit.
        drop(self.jobs.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32, body: &str) -> PageJob {
        PageJob {
            title: format!("Page {id}"),
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_batch_preserves_order() {
        let pool = WorkerPool::new(4, ExtractOptions::default());
        let batch: Vec<PageJob> = (0..40).map(|i| job(i, &format!("body {i}"))).collect();
        let records = pool.process_batch(batch).unwrap();
        assert_eq!(records.len(), 40);
        for (i, records) in records.iter().enumerate() {
            let article = records.article.as_ref().expect("missing article");
            let text = std::str::from_utf8(article).unwrap();
            assert!(text.contains(&format!("<id>{i}</id>")), "out of order at {i}");
        }
    }

    #[test]
    fn test_several_batches_reuse_workers() {
        let pool = WorkerPool::new(2, ExtractOptions::default());
        for _ in 0..3 {
            let records = pool.process_batch(vec![job(1, "one"), job(2, "two")]).unwrap();
            assert_eq!(records.len(), 2);
        }
    }

    #[test]
    fn test_empty_batch() {
        let pool = WorkerPool::new(1, ExtractOptions::default());
        assert!(pool.process_batch(Vec::new()).unwrap().is_empty());
    }
}
