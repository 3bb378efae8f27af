//! Off-thread comparisons with a single-slot queue.

use crate::core::session::{Comparison, PendingComparison};
use crate::core::similarity::SimilarityEngine;
use crate::error::CompareError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result delivered by the worker for one job
pub type WorkerResult = Result<Comparison, CompareError>;

/// Runs comparisons on a dedicated thread.
///
/// At most one job is queued behind the one being computed. Submitting
/// while the slot is occupied replaces the queued job, so a slow comparison
/// never builds a backlog of stale frames. The thread is joined on drop.
pub struct ComparisonWorker {
    jobs: Option<Sender<PendingComparison>>,
    // Second handle on the job queue, used only to evict a stale job
    queued: Receiver<PendingComparison>,
    results: Receiver<WorkerResult>,
    handle: Option<JoinHandle<()>>,
    superseded: u64,
}

impl ComparisonWorker {
    /// Start the worker thread
    pub fn spawn(engine: SimilarityEngine) -> Self {
        let (jobs, queue) = bounded::<PendingComparison>(1);
        let (result_sender, results) = unbounded();
        let worker_queue = queue.clone();

        let handle = thread::spawn(move || {
            for job in worker_queue.iter() {
                if result_sender.send(job.run(&engine)).is_err() {
                    break;
                }
            }
            tracing::debug!("Comparison worker stopped");
        });

        Self {
            jobs: Some(jobs),
            queued: queue,
            results,
            handle: Some(handle),
            superseded: 0,
        }
    }

    /// Queue a comparison, evicting a queued one if present
    pub fn submit(&mut self, job: PendingComparison) {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };

        let mut job = job;
        loop {
            match jobs.try_send(job) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = self.queued.try_recv() {
                        self.superseded += 1;
                        tracing::debug!(
                            frame = stale.frame_sequence(),
                            "Superseded queued comparison"
                        );
                    }
                    job = rejected;
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::warn!("Comparison worker is gone; dropping job");
                    return;
                }
            }
        }
    }

    /// Results finished since the last poll, oldest first
    pub fn poll(&self) -> Vec<WorkerResult> {
        self.results.try_iter().collect()
    }

    /// Wait up to `timeout` for the next result
    pub fn wait(&self, timeout: Duration) -> Option<WorkerResult> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Number of queued jobs replaced by newer ones
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

impl Drop for ComparisonWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Comparison worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Frame;
    use crate::core::session::SessionState;
    use image::{Rgb, RgbImage};

    fn frame(sequence: u64) -> Frame {
        Frame::with_sequence(
            RgbImage::from_fn(320, 240, |x, y| {
                let v = ((x / 10 + y / 10) % 2) as u8 * 180;
                Rgb([v, v, v])
            }),
            sequence,
        )
    }

    fn collect_until(worker: &ComparisonWorker, last: u64) -> Vec<WorkerResult> {
        let mut results = Vec::new();
        while let Some(result) = worker.wait(Duration::from_secs(10)) {
            let done = matches!(&result, Ok(c) if c.frame_sequence == last);
            results.push(result);
            if done {
                break;
            }
        }
        results
    }

    #[test]
    fn worker_returns_comparison() {
        let mut session = SessionState::default();
        session.capture(&frame(0)).unwrap();

        let mut worker = ComparisonWorker::spawn(session.engine().clone());
        worker.submit(session.prepare_comparison(&frame(1)).unwrap());

        let comparison = worker.wait(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(comparison.frame_sequence, 1);
        assert_eq!(comparison.result.score(), 1.0);
    }

    #[test]
    fn newest_job_is_never_dropped() {
        let mut session = SessionState::default();
        session.capture(&frame(0)).unwrap();
        let mut worker = ComparisonWorker::spawn(session.engine().clone());

        let total = 20;
        for sequence in 1..=total {
            worker.submit(session.prepare_comparison(&frame(sequence)).unwrap());
        }

        let results = collect_until(&worker, total);
        let sequences: Vec<u64> = results
            .iter()
            .map(|r| r.as_ref().unwrap().frame_sequence)
            .collect();

        assert_eq!(sequences.last(), Some(&total));
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sequences.len() as u64 + worker.superseded(), total);
    }

    #[test]
    fn dimension_mismatch_is_reported_as_result() {
        let mut session = SessionState::default();
        session.capture(&frame(0)).unwrap();
        let job = session
            .prepare_comparison(&Frame::new(RgbImage::new(100, 100)))
            .unwrap();

        let mut worker = ComparisonWorker::spawn(session.engine().clone());
        worker.submit(job);

        let result = worker.wait(Duration::from_secs(10)).unwrap();
        assert!(matches!(result, Err(CompareError::DimensionMismatch { .. })));
    }

    #[test]
    fn drop_joins_worker() {
        let worker = ComparisonWorker::spawn(SimilarityEngine::default());
        drop(worker);
    }
}
