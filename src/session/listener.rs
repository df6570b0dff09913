//! Session notifications
//!
//! The host UI implements [`SessionListener`]; hosts that cannot take callbacks
//! (the C ABI, the CLI) use [`QueuedListener`] and drain it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::TouchprintError;

/// Receives session state changes on the thread that owns the session
pub trait SessionListener {
    /// A training stroke was accepted; `count` is the new phase total
    fn on_stroke_count_updated(&mut self, count: u32);

    /// An authentication exchange finished
    fn on_verification_result(&mut self, matched: bool, matched_count: u32, not_matched_count: u32);

    /// A network exchange failed or the matcher misbehaved
    fn on_error(&mut self, error: &TouchprintError);

    /// Result of [`crate::session::Session::refresh_count`]
    fn on_stored_count(&mut self, _count: u64) {}
}

/// Serializable form of one listener callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    StrokeCountUpdated {
        count: u32,
    },
    VerificationResult {
        matched: bool,
        matched_count: u32,
        not_matched_count: u32,
    },
    StoredCount {
        count: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Listener that records every callback in order.
///
/// Clones share the same queue, so a host can keep one clone and hand the other
/// to the session.
#[derive(Debug, Clone, Default)]
pub struct QueuedListener {
    queue: Rc<RefCell<VecDeque<Notification>>>,
}

impl QueuedListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything queued so far
    pub fn drain(&self) -> Vec<Notification> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn push(&self, notification: Notification) {
        self.queue.borrow_mut().push_back(notification);
    }
}

impl SessionListener for QueuedListener {
    fn on_stroke_count_updated(&mut self, count: u32) {
        self.push(Notification::StrokeCountUpdated { count });
    }

    fn on_verification_result(
        &mut self,
        matched: bool,
        matched_count: u32,
        not_matched_count: u32,
    ) {
        self.push(Notification::VerificationResult {
            matched,
            matched_count,
            not_matched_count,
        });
    }

    fn on_error(&mut self, error: &TouchprintError) {
        self.push(Notification::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }

    fn on_stored_count(&mut self, count: u64) {
        self.push(Notification::StoredCount { count });
    }
}
