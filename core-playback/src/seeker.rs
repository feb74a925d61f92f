//! # Time Seeker
//!
//! Turns a high-frequency stream of desired times (a scrubbing gesture, for
//! example) into as few engine seeks as possible.
//!
//! At most one seek is in flight. While it runs, new targets only overwrite the
//! queued target; when the in-flight seek completes, one more seek is issued to
//! the latest queued target if it differs from where the play head just landed.
//! A burst of N requests during one seek therefore costs at most two engine
//! seeks, and the play head never chases an intermediate target.
//!
//! Completions arrive on engine threads; they are posted to the seeker's
//! coordination queue and applied by [`TimeSeeker::pump`].

use bridge_traits::{MediaTime, PlayerEngine, SeekResult};
use core_runtime::dispatch::{CoordinationQueue, CoordinationSignal};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Identifies one engine seek issued by a [`TimeSeeker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekToken(u64);

#[derive(Debug)]
struct SeekCompleted {
    token: SeekToken,
    result: SeekResult,
}

#[derive(Debug, Clone, Copy)]
struct InFlightSeek {
    token: SeekToken,
    target: MediaTime,
}

/// Outcome of a completed seek worth reporting upward.
///
/// Interrupted seeks are not reported; they are superseded, not failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekReport {
    Finished { target: MediaTime },
    Failed { target: MediaTime, message: String },
}

pub struct TimeSeeker {
    engine: Arc<dyn PlayerEngine>,
    queue: CoordinationQueue<SeekCompleted>,
    in_flight: Option<InFlightSeek>,
    queued: Option<MediaTime>,
    next_token: u64,
    seeks_issued: u64,
}

impl TimeSeeker {
    pub fn new(engine: Arc<dyn PlayerEngine>, signal: CoordinationSignal) -> Self {
        Self {
            engine,
            queue: CoordinationQueue::with_signal(signal),
            in_flight: None,
            queued: None,
            next_token: 0,
            seeks_issued: 0,
        }
    }

    /// Move the play head to `time`, coalescing with any seek in progress.
    pub fn smoothly_seek(&mut self, time: MediaTime) {
        if self.in_flight.is_some() {
            trace!(target_time = %time, "Seek in flight, queueing target");
            self.queued = Some(time);
        } else {
            self.start_seek(time);
        }
    }

    /// Forget the queued target. The in-flight seek finishes but triggers no
    /// follow-up seek.
    pub fn cancel_pending_seeks(&mut self) {
        if let Some(dropped) = self.queued.take() {
            debug!(target_time = %dropped, "Dropped queued seek");
        }
    }

    /// True while a seek is in flight or queued.
    pub fn is_seeking(&self) -> bool {
        self.in_flight.is_some() || self.queued.is_some()
    }

    /// The most recent desired time, if a seek is pending.
    pub fn target(&self) -> Option<MediaTime> {
        self.queued.or(self.in_flight.map(|seek| seek.target))
    }

    /// Number of engine seeks issued so far.
    pub fn seeks_issued(&self) -> u64 {
        self.seeks_issued
    }

    /// Apply completions posted by the engine. Returns reportable outcomes.
    pub fn pump(&mut self) -> Vec<SeekReport> {
        let mut reports = Vec::new();
        for completed in self.queue.drain() {
            if let Some(report) = self.complete(completed) {
                reports.push(report);
            }
        }
        reports
    }

    /// Invalidate every seek. Completions that arrive later are ignored.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.queued = None;
    }

    fn start_seek(&mut self, target: MediaTime) {
        let token = SeekToken(self.next_token);
        self.next_token += 1;
        self.seeks_issued += 1;
        self.in_flight = Some(InFlightSeek { token, target });

        debug!(target_time = %target, token = token.0, "Issuing seek");

        let handle = self.queue.handle();
        self.engine.seek(
            target,
            Box::new(move |result| {
                if handle.post(SeekCompleted { token, result }).is_err() {
                    trace!("Seek completed after seeker was dropped");
                }
            }),
        );
    }

    fn complete(&mut self, completed: SeekCompleted) -> Option<SeekReport> {
        let finished = match self.in_flight {
            Some(seek) if seek.token == completed.token => seek,
            _ => {
                trace!(token = completed.token.0, "Ignoring stale seek completion");
                return None;
            }
        };
        self.in_flight = None;

        let landed = matches!(completed.result, SeekResult::Finished);
        let report = match completed.result {
            SeekResult::Finished => Some(SeekReport::Finished {
                target: finished.target,
            }),
            SeekResult::Interrupted => None,
            SeekResult::Failed(message) => {
                warn!(target_time = %finished.target, %message, "Seek failed");
                Some(SeekReport::Failed {
                    target: finished.target,
                    message,
                })
            }
        };

        if let Some(next) = self.queued.take() {
            if !landed || next != finished.target {
                self.start_seek(next);
            }
        }

        report
    }
}

impl std::fmt::Debug for TimeSeeker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSeeker")
            .field("in_flight", &self.in_flight.map(|seek| seek.target))
            .field("queued", &self.queued)
            .field("seeks_issued", &self.seeks_issued)
            .finish()
    }
}
