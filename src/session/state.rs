//! Session state machine
//!
//! Decides per completed stroke whether to store it as training data, drop it
//! because the phase is full, or submit it for live verification.
//!
//! ```text
//! Uninitialized ──initialize(Training)──▶ Training { cap, count }
//!       │                                        │ stroke: count < cap → store, count += 1
//!       │                                        │ stroke: count == cap → drop silently
//!       └──────initialize(Free)─────────▶ Free { count }
//!                                                │ stroke: authenticate, count frozen
//! reset() from any state ──▶ Uninitialized
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::TouchprintError;
use crate::session::dispatch::{Completion, Dispatcher, Job, JobResult};
use crate::session::listener::SessionListener;
use crate::stroke::{FeatureExtractor, Stroke, StrokeAssembler, TouchEvent, TouchSample};
use crate::wire::{MatchService, WireClient};

/// Operating mode, fixed for the lifetime of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Accumulate up to `phase_cap` strokes and store them
    Training,
    /// Authenticate every stroke
    Free,
}

/// Current state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Training { cap: u32, count: u32 },
    /// `count` is the starting count, never advanced in free mode
    Free { count: u32 },
}

impl Phase {
    pub fn mode(&self) -> Option<Mode> {
        match self {
            Phase::Uninitialized => None,
            Phase::Training { .. } => Some(Mode::Training),
            Phase::Free { .. } => Some(Mode::Free),
        }
    }
}

/// What the session did with a completed stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StrokeOutcome {
    /// Accepted as training data; `count` is the new phase total
    Stored { count: u32 },
    /// Training phase already full; stroke dropped
    CapReached,
    /// Sent for verification
    Submitted,
    /// No stroke in flight, or no active phase
    Discarded,
}

/// Point-in-time view of the session for hosts and reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: Option<i64>,
    pub mode: Option<Mode>,
    pub phase_stroke_count: u32,
    /// `None` outside training; free mode has no cap
    pub phase_cap: Option<u32>,
    pub matched_count: u32,
    pub not_matched_count: u32,
    pub pending_requests: usize,
    pub started_at: Option<DateTime<Utc>>,
}

/// Stroke collection and verification session.
///
/// Owned by a single thread. Network exchanges run in the background and their
/// results are applied only when that thread calls
/// [`process_completions`](Session::process_completions) or
/// [`settle`](Session::settle).
pub struct Session {
    extractor: FeatureExtractor,
    dispatcher: Dispatcher,
    listener: Box<dyn SessionListener>,
    user_id: Option<i64>,
    phase: Phase,
    matched_count: u32,
    not_matched_count: u32,
    strokes: StrokeAssembler,
    /// Bumped on every initialize/reset; stale completions are ignored
    generation: u64,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(service: Arc<dyn MatchService>, listener: impl SessionListener + 'static) -> Self {
        Self::with_extractor(service, listener, FeatureExtractor::default())
    }

    pub fn with_extractor(
        service: Arc<dyn MatchService>,
        listener: impl SessionListener + 'static,
        extractor: FeatureExtractor,
    ) -> Self {
        Self {
            extractor,
            dispatcher: Dispatcher::new(service),
            listener: Box::new(listener),
            user_id: None,
            phase: Phase::Uninitialized,
            matched_count: 0,
            not_matched_count: 0,
            strokes: StrokeAssembler::new(),
            generation: 0,
            started_at: None,
        }
    }

    /// Session talking to the store and matcher described by `config`
    pub fn from_config(config: ClientConfig, listener: impl SessionListener + 'static) -> Self {
        let extractor = FeatureExtractor::new(config.velocity_percentile);
        Self::with_extractor(Arc::new(WireClient::new(config)), listener, extractor)
    }

    /// Start a new phase for `user_id`.
    ///
    /// Always discards the previous phase. On an invalid user the session is
    /// left uninitialized.
    pub fn initialize(
        &mut self,
        user_id: i64,
        mode: Mode,
        phase_cap: u32,
        starting_count: u32,
    ) -> Result<(), TouchprintError> {
        self.reset();
        if user_id < 0 {
            warn!(user_id, "Refusing to initialize session for invalid user");
            return Err(TouchprintError::InvalidUser(user_id));
        }

        self.user_id = Some(user_id);
        self.phase = match mode {
            Mode::Training => Phase::Training {
                cap: phase_cap,
                count: starting_count,
            },
            Mode::Free => Phase::Free {
                count: starting_count,
            },
        };
        self.started_at = Some(Utc::now());
        info!(
            user_id,
            mode = ?mode,
            phase_cap,
            starting_count,
            "Session initialized"
        );
        Ok(())
    }

    /// Return to `Uninitialized`, clearing counters and any in-flight stroke
    pub fn reset(&mut self) {
        if self.phase != Phase::Uninitialized {
            info!(user_id = ?self.user_id, "Session reset");
        }
        self.generation += 1;
        self.user_id = None;
        self.phase = Phase::Uninitialized;
        self.matched_count = 0;
        self.not_matched_count = 0;
        self.strokes.clear();
        self.started_at = None;
    }

    /// Touch-down: begin a new stroke, dropping any unfinished one
    pub fn touch_down(&mut self, sample: TouchSample) {
        if let Some(dropped) = self.strokes.down(sample) {
            debug!(
                samples = dropped.len(),
                "Touch-down while a stroke was in flight; previous stroke discarded"
            );
        }
    }

    /// Touch-move: extend the current stroke (starting one if the down was missed)
    pub fn touch_move(&mut self, sample: TouchSample) {
        self.strokes.move_to(sample);
    }

    /// Touch-up: seal the current stroke and act on it
    pub fn touch_up(&mut self, timestamp: i64) -> StrokeOutcome {
        let Some(stroke) = self.strokes.up(timestamp) else {
            debug!("Touch-up without a stroke in flight");
            return StrokeOutcome::Discarded;
        };
        self.complete_stroke(stroke)
    }

    /// Route a raw touch event; returns the outcome when the event ends a stroke
    pub fn handle_event(&mut self, event: TouchEvent) -> Option<StrokeOutcome> {
        match event {
            TouchEvent::Down(sample) => {
                self.touch_down(sample);
                None
            }
            TouchEvent::Move(sample) => {
                self.touch_move(sample);
                None
            }
            TouchEvent::Up { timestamp } => Some(self.touch_up(timestamp)),
        }
    }

    fn complete_stroke(&mut self, stroke: Stroke) -> StrokeOutcome {
        let Some(user_id) = self.user_id else {
            debug!(samples = stroke.len(), "Stroke completed with no active phase; dropped");
            return StrokeOutcome::Discarded;
        };

        match self.phase {
            Phase::Uninitialized => StrokeOutcome::Discarded,
            Phase::Training { cap, count } => {
                if count >= cap {
                    return StrokeOutcome::CapReached;
                }
                let record = self.extractor.extract(user_id, &stroke);
                let count = count + 1;
                self.phase = Phase::Training { cap, count };
                debug!(user_id, count, cap, "Training stroke accepted");
                self.listener.on_stroke_count_updated(count);
                self.submit(Job::Store(record));
                StrokeOutcome::Stored { count }
            }
            Phase::Free { .. } => {
                let record = self.extractor.extract(user_id, &stroke);
                self.submit(Job::Authenticate(record));
                StrokeOutcome::Submitted
            }
        }
    }

    /// Ask the store how many strokes it holds for the current user.
    ///
    /// The answer arrives as `on_stored_count`; it never changes the phase counter.
    pub fn refresh_count(&mut self) -> Result<(), TouchprintError> {
        let user_id = self.user_id.ok_or(TouchprintError::NotInitialized)?;
        self.submit(Job::Count(user_id));
        Ok(())
    }

    fn submit(&mut self, job: Job) {
        if let Err(err) = self.dispatcher.submit(self.generation, job) {
            warn!(error = %err, "Could not start network exchange");
            self.listener.on_error(&err);
        }
    }

    /// Apply every finished exchange without blocking. Returns how many were applied.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.dispatcher.try_next() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Block until no exchanges are pending or `timeout` elapses, applying
    /// results as they arrive. Returns how many were applied.
    pub fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = 0;
        while self.dispatcher.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.dispatcher.next_timeout(remaining) {
                Some(completion) => {
                    self.apply(completion);
                    applied += 1;
                }
                None => break,
            }
        }
        applied + self.process_completions()
    }

    fn apply(&mut self, completion: Completion) {
        if completion.generation != self.generation {
            debug!(
                generation = completion.generation,
                current = self.generation,
                "Dropping result from a previous phase"
            );
            return;
        }

        match completion.result {
            JobResult::Stored(Ok(_)) => {}
            JobResult::Stored(Err(err)) => {
                warn!(error = %err, user_id = ?self.user_id, "Failed to store training stroke");
                self.listener.on_error(&err);
            }
            JobResult::Counted(Ok(count)) => {
                self.listener.on_stored_count(count);
            }
            JobResult::Counted(Err(err)) => {
                warn!(error = %err, user_id = ?self.user_id, "Failed to fetch stored stroke count");
                self.listener.on_error(&err);
            }
            JobResult::Authenticated(Ok(verdict)) => {
                debug!(
                    matched = verdict.matched,
                    message = %verdict.message,
                    "Verification result"
                );
                self.record_verdict(verdict.matched);
            }
            JobResult::Authenticated(Err(
                err @ (TouchprintError::ServerFault { .. } | TouchprintError::ProtocolFailure(_)),
            )) => {
                warn!(error = %err, "Matcher gave no usable verdict; counting as not matched");
                self.record_verdict(false);
                self.listener.on_error(&err);
            }
            JobResult::Authenticated(Err(err)) => {
                warn!(error = %err, "Authentication request failed");
                self.listener.on_error(&err);
            }
        }
    }

    fn record_verdict(&mut self, matched: bool) {
        if matched {
            self.matched_count += 1;
        } else {
            self.not_matched_count += 1;
        }
        self.listener
            .on_verification_result(matched, self.matched_count, self.not_matched_count);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<Mode> {
        self.phase.mode()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn phase_stroke_count(&self) -> u32 {
        match self.phase {
            Phase::Uninitialized => 0,
            Phase::Training { count, .. } | Phase::Free { count } => count,
        }
    }

    pub fn matched_count(&self) -> u32 {
        self.matched_count
    }

    pub fn not_matched_count(&self) -> u32 {
        self.not_matched_count
    }

    pub fn pending_requests(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn has_stroke_in_flight(&self) -> bool {
        self.strokes.in_progress()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            user_id: self.user_id,
            mode: self.mode(),
            phase_stroke_count: self.phase_stroke_count(),
            phase_cap: match self.phase {
                Phase::Training { cap, .. } => Some(cap),
                _ => None,
            },
            matched_count: self.matched_count,
            not_matched_count: self.not_matched_count,
            pending_requests: self.pending_requests(),
            started_at: self.started_at,
        }
    }
}
