//! Background execution of network exchanges
//!
//! Each exchange runs on its own short-lived thread. Results come back over a
//! channel and are applied by whoever owns the session, so worker threads never
//! touch session state.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::TouchprintError;
use crate::stroke::FeatureRecord;
use crate::wire::{AuthVerdict, MatchService};

/// One network exchange to run off-thread
#[derive(Debug, Clone)]
pub(crate) enum Job {
    Store(FeatureRecord),
    Count(i64),
    Authenticate(FeatureRecord),
}

#[derive(Debug)]
pub(crate) enum JobResult {
    Stored(Result<String, TouchprintError>),
    Counted(Result<u64, TouchprintError>),
    Authenticated(Result<AuthVerdict, TouchprintError>),
}

/// A finished exchange, tagged with the session generation that started it
#[derive(Debug)]
pub(crate) struct Completion {
    pub generation: u64,
    pub result: JobResult,
}

pub(crate) struct Dispatcher {
    service: Arc<dyn MatchService>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn MatchService>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Start `job` on a worker thread
    pub fn submit(&mut self, generation: u64, job: Job) -> Result<(), TouchprintError> {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();

        thread::Builder::new()
            .name("touchprint-wire".to_string())
            .spawn(move || {
                let result = match job {
                    Job::Store(record) => JobResult::Stored(service.store(&record)),
                    Job::Count(user_id) => JobResult::Counted(service.count(user_id)),
                    Job::Authenticate(record) => {
                        JobResult::Authenticated(service.authenticate(&record))
                    }
                };
                if tx.send(Completion { generation, result }).is_err() {
                    warn!("Session dropped before network exchange completed");
                }
            })
            .map_err(|e| {
                TouchprintError::NetworkFailure(format!("failed to spawn network worker: {e}"))
            })?;

        self.in_flight += 1;
        Ok(())
    }

    /// Next finished exchange, without blocking
    pub fn try_next(&mut self) -> Option<Completion> {
        let completion = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }

    /// Next finished exchange, waiting at most `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Exchanges started but not yet collected
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
