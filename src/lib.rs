//! Touchprint - On-device touch-stroke biometrics client
//!
//! Touchprint turns raw touch events into per-stroke feature records and talks
//! to a remote store/matcher: training strokes are stored, free-mode strokes
//! are authenticated against the user's stored profile.
//!
//! ## Modules
//!
//! - **Stroke**: Touch samples, stroke assembly and feature extraction
//! - **Wire**: Store (`FSTORE`/`FCOUNT`) and matcher (HTTP) exchanges
//! - **Session**: Training/free-mode state machine with listener callbacks

pub mod config;
pub mod error;
pub mod session;
pub mod stroke;
pub mod wire;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ClientConfig;
pub use error::TouchprintError;

// Stroke exports
pub use stroke::{FeatureExtractor, FeatureRecord, Stroke, StrokeAssembler, TouchEvent, TouchSample};

// Session exports
pub use session::{
    Mode, Notification, QueuedListener, Session, SessionListener, SessionSummary, StrokeOutcome,
};

// Wire exports
pub use wire::{AuthVerdict, MatchService, WireClient};

/// Touchprint version
pub const TOUCHPRINT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tooling
pub const PRODUCER_NAME: &str = "touchprint";
