//! Per-stream contract between the embedding proxy and a filter.
//!
//! A filter participates in a stream through two narrow capabilities: the
//! decode path ([`DecodeFilter`]), which sees the request on its way to
//! upstream and may hold it, and the completion observer ([`StreamLog`]),
//! which sees the stream once after it ends. A filter that wants both
//! implements both; [`RequestFilter`] is the combination a factory hands
//! to the host.
//!
//! Holding works without callbacks into host internals: a `Pause` verdict
//! tells the host to stop iterating, [`DecodeFilter::pending_decision`]
//! surrenders the completion the filter is waiting on, and the host feeds
//! the value back through [`DecodeFilter::on_check_complete`] from the stream's
//! owning task.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::client::{CheckOutcome, StreamInfo};
use crate::dispatch::PendingCompletion;

/// Verdict for a headers callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadersVerdict {
    /// Hand the headers on to the next filter.
    Continue,
    /// Hold iteration; the filter is waiting on a decision or has already
    /// replied locally.
    Pause,
}

/// Verdict for a body-data callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataVerdict {
    Continue,
    /// Hold the chunk, buffered by the host, until a decision arrives.
    Buffer,
}

/// Verdict for a trailers callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailersVerdict {
    Continue,
    Pause,
}

/// Host-side services a filter may call on its own stream.
///
/// Implemented by the embedding proxy, one value per stream. The filter
/// only ever invokes these from the stream's owning task.
pub trait StreamCallbacks: Send + Sync {
    /// URI SAN of the downstream peer certificate, when the connection
    /// presented one.
    fn peer_certificate_uri(&self) -> Option<String>;

    /// Opaque per-route setting; `None` when the route does not set the key.
    fn route_setting(&self, key: &str) -> Option<String>;

    /// Resume an iteration previously held by a `Pause` verdict.
    fn resume_decoding(&self);

    /// Answer the request locally; nothing flows upstream.
    fn send_local_reply(&self, status: StatusCode, body: &str);
}

/// Decode-path capability: the request on its way toward upstream.
pub trait DecodeFilter: Send {
    fn on_request_headers(
        &mut self,
        headers: &mut HeaderMap,
        end_of_stream: bool,
    ) -> HeadersVerdict;

    fn on_request_data(&mut self, data: &Bytes, end_of_stream: bool) -> DataVerdict;

    fn on_request_trailers(&mut self, trailers: &HeaderMap) -> TrailersVerdict;

    /// The stream is being torn down without completing.
    fn on_stream_reset(&mut self);

    /// After a `Pause` verdict: the completion the filter is waiting on,
    /// if any. The host awaits it and hands the value back through
    /// [`DecodeFilter::on_check_complete`]. Filters that never pause keep the
    /// default.
    fn pending_decision(&mut self) -> Option<PendingCompletion<CheckOutcome>> {
        None
    }

    /// Deliver an outcome previously taken via
    /// [`DecodeFilter::pending_decision`].
    fn on_check_complete(&mut self, _outcome: CheckOutcome) {}
}

/// Completion-observer capability: sees the stream once, after it ends.
pub trait StreamLog: Send {
    /// `response_headers` is `None` when the stream ended without an
    /// upstream response.
    fn on_stream_complete(&mut self, response_headers: Option<&HeaderMap>, info: &StreamInfo);
}

/// Both capabilities together; what a factory mints per stream.
pub trait RequestFilter: DecodeFilter + StreamLog {}

impl<T: DecodeFilter + StreamLog> RequestFilter for T {}
