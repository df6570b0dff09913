//! Stroke session
//!
//! Holds the training/free-mode state machine, the in-flight stroke and the
//! verification tallies. Network exchanges run on background threads and
//! their results are applied back on the owning thread.

mod dispatch;
pub mod listener;
pub mod state;

pub use listener::{Notification, QueuedListener, SessionListener};
pub use state::{Mode, Phase, Session, SessionSummary, StrokeOutcome};
