//! Remote mixer call contract.
//!
//! The gate drives a remote authorization/telemetry service through this
//! trait and never sees its transport. Both calls are callback-shaped: the
//! implementation invokes `done` at most once, maybe inline before the call
//! returns, maybe later from a thread of its choosing. Callers that need
//! the outcome back on their own task route `done` through
//! [`crate::dispatch`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use uuid::Uuid;

use crate::status::{self, CanonicalCode};

/// Callback invoked exactly once with a call's outcome.
pub type Done = Box<dyn FnOnce(CheckOutcome) + Send>;

/// Outcome of a remote check or report call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Canonical code, see [`crate::status`].
    pub code: i32,
    /// Human-readable detail; becomes the local reply body on denial.
    pub message: String,
}

impl CheckOutcome {
    /// A successful outcome.
    pub fn ok() -> Self {
        Self {
            code: CanonicalCode::Ok.code(),
            message: String::new(),
        }
    }

    /// A failed outcome with the given canonical code.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CanonicalCode::Ok.code()
    }

    /// HTTP status the proxy should answer with for this outcome.
    pub fn http_status(&self) -> StatusCode {
        status::http_status(self.code)
    }
}

/// Correlates the check and report calls of one request.
///
/// Created when request headers arrive; the gate keeps one clone and gives
/// it up when telemetry is issued. The listener's configured call
/// attributes ride along so the client can attach them to both calls.
#[derive(Debug)]
pub struct RequestRecord {
    pub id: Uuid,
    /// RFC 3339 receipt time.
    pub received_at: String,
    pub call_attributes: Arc<BTreeMap<String, String>>,
}

impl RequestRecord {
    pub fn new(call_attributes: Arc<BTreeMap<String, String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: now_rfc3339(),
            call_attributes,
        }
    }
}

/// Byte counts and timing for a finished stream, forwarded opaquely to
/// the report call.
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub duration: Duration,
}

/// Asynchronous contract with the remote authorization/telemetry service.
///
/// Implementations own connection management, retries and batching
/// entirely; the gate only relies on `done` firing at most once per call.
pub trait MixerClient: Send + Sync {
    /// Verify the request described by `record` and `headers`.
    /// `peer_identity` is the downstream certificate identity, empty when
    /// the connection presented none.
    fn check(
        &self,
        record: Arc<RequestRecord>,
        headers: &HeaderMap,
        peer_identity: &str,
        done: Done,
    );

    /// Emit telemetry for a finished request. Fire-and-forget: callers
    /// never act on the outcome beyond logging it.
    fn report(
        &self,
        record: Arc<RequestRecord>,
        response_headers: Option<&HeaderMap>,
        info: &StreamInfo,
        status: StatusCode,
        done: Done,
    );
}

/// Current UTC time as an RFC 3339 string.
fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
