//! Store/matcher wire protocol
//!
//! Three exchanges, each on a fresh connection:
//!
//! - `FSTORE|<json>` over a raw socket: store one training record
//! - `FCOUNT|<userID>` over a raw socket: number of stored records
//! - HTTP `POST <auth_path>/<userID>`: authenticate one record
//!
//! [`MatchService`] is the seam between the session and the transport.

pub mod client;
pub mod codec;

pub use client::WireClient;
pub use codec::{HttpResponse, WireRequest};

use serde::{Deserialize, Serialize};

use crate::error::TouchprintError;
use crate::stroke::FeatureRecord;

/// Outcome of an authentication exchange that reached a verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVerdict {
    pub matched: bool,
    pub message: String,
    /// HTTP status the verdict came with
    pub status: u16,
}

/// Remote feature store and matcher.
///
/// Calls block; the session runs them on background threads.
pub trait MatchService: Send + Sync {
    /// Store one training record. Returns the raw response text.
    fn store(&self, record: &FeatureRecord) -> Result<String, TouchprintError>;

    /// Number of records stored for `user_id`
    fn count(&self, user_id: i64) -> Result<u64, TouchprintError>;

    /// Submit a record for live verification.
    ///
    /// `ServerFault` and `ProtocolFailure` mean the matcher was reached but gave
    /// no usable verdict; `NetworkFailure` means it was not reached.
    fn authenticate(&self, record: &FeatureRecord) -> Result<AuthVerdict, TouchprintError>;
}
