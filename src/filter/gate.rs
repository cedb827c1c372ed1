//! The mixer gate: per-request authorization state machine.
//!
//! One gate per stream. Request headers trigger a single remote check;
//! until its outcome lands the gate holds the stream (`Pause`/`Buffer`
//! verdicts) without blocking anything. Outcomes may arrive while the
//! headers callback is still on the stack or much later from another
//! thread; either way the gate takes exactly one terminal action per
//! request and reports telemetry at most once when the stream ends.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::attributes::FORWARDED_ATTRIBUTES_HEADER;
use crate::client::{CheckOutcome, RequestRecord, StreamInfo};
use crate::config::{FilterConfig, ROUTE_CONTROL_KEY, ROUTE_FORWARD_KEY};
use crate::dispatch::{self, PendingCompletion};
use crate::filter::stream::{
    DataVerdict, DecodeFilter, HeadersVerdict, StreamCallbacks, StreamLog, TrailersVerdict,
};

/// Lifecycle phase of one gated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No headers seen yet.
    NotStarted,
    /// Check issued, decision outstanding.
    AwaitingDecision,
    /// Allowed; the request flows upstream.
    Decided,
    /// Denied, reset or torn down; nothing further may act on the stream.
    Terminated,
}

/// Per-stream authorization gate.
///
/// Implements both stream capabilities: [`DecodeFilter`] to hold the
/// request until the remote check decides, [`StreamLog`] to report
/// telemetry afterwards.
pub struct MixerGate {
    config: Arc<FilterConfig>,
    callbacks: Arc<dyn StreamCallbacks>,
    phase: Phase,
    /// Route switch snapshot, taken when headers arrive.
    enforced: bool,
    record: Option<Arc<RequestRecord>>,
    pending: Option<PendingCompletion<CheckOutcome>>,
    /// Status carried into the telemetry report. Starts at the
    /// unknown-outcome mapping so a stream reset before any decision
    /// reports 500.
    check_status: StatusCode,
}

impl MixerGate {
    pub fn new(config: Arc<FilterConfig>, callbacks: Arc<dyn StreamCallbacks>) -> Self {
        tracing::debug!("Mixer gate created");
        Self {
            config,
            callbacks,
            phase: Phase::NotStarted,
            enforced: false,
            record: None,
            pending: None,
            check_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Route switch: enforcement is opt-in per route.
    fn enforcement_enabled(&self) -> bool {
        matches!(
            self.callbacks.route_setting(ROUTE_CONTROL_KEY).as_deref(),
            Some("on")
        )
    }

    /// Route switch: forwarding is opt-out per route.
    fn forwarding_enabled(&self) -> bool {
        match self.callbacks.route_setting(ROUTE_FORWARD_KEY) {
            Some(value) => value != "off",
            None => true,
        }
    }

    /// Insert the pre-encoded attribute blob, replacing any value a
    /// previous hop may have set.
    fn forward_attributes(&self, headers: &mut HeaderMap) {
        let Some(blob) = self.config.forward_blob() else {
            return;
        };
        if !self.forwarding_enabled() {
            tracing::debug!("Attribute forwarding disabled for this route");
            return;
        }
        headers.insert(FORWARDED_ATTRIBUTES_HEADER, blob.clone());
    }

    /// Apply a check outcome. Exactly one terminal action per request:
    /// either the transition to `Decided` or the local reply, never both,
    /// never twice. Returns whether the request may flow upstream.
    fn apply_decision(&mut self, outcome: CheckOutcome) -> bool {
        if outcome.is_ok() {
            self.phase = Phase::Decided;
            self.check_status = StatusCode::OK;
            tracing::debug!("Check allowed request");
            return true;
        }

        self.phase = Phase::Terminated;
        self.pending = None;
        let status = outcome.http_status();
        self.check_status = status;
        tracing::warn!(code = outcome.code, status = %status, "Check denied request");
        self.callbacks.send_local_reply(status, &outcome.message);
        false
    }
}

impl DecodeFilter for MixerGate {
    fn on_request_headers(
        &mut self,
        headers: &mut HeaderMap,
        end_of_stream: bool,
    ) -> HeadersVerdict {
        tracing::debug!(end_of_stream, "Request headers");

        if self.phase != Phase::NotStarted {
            tracing::debug!(phase = ?self.phase, "Ignoring repeated header callback");
            return match self.phase {
                Phase::Decided => HeadersVerdict::Continue,
                _ => HeadersVerdict::Pause,
            };
        }

        self.forward_attributes(headers);

        self.enforced = self.enforcement_enabled();
        if !self.enforced {
            tracing::debug!("Mixer check disabled for this route");
            return HeadersVerdict::Continue;
        }

        let record = Arc::new(RequestRecord::new(self.config.call_attributes().clone()));
        self.record = Some(record.clone());

        let peer_identity = self.callbacks.peer_certificate_uri().unwrap_or_default();

        self.phase = Phase::AwaitingDecision;
        let (hop, mut pending) = dispatch::completion();
        self.config
            .client()
            .check(record, headers, &peer_identity, hop.into_done());

        // The client may have answered before returning; resumption is
        // then carried by the verdict, not by resume_decoding.
        match pending.try_take() {
            Some(outcome) => {
                self.apply_decision(outcome);
            }
            None => self.pending = Some(pending),
        }

        match self.phase {
            Phase::Decided => HeadersVerdict::Continue,
            _ => {
                tracing::debug!("Holding request headers");
                HeadersVerdict::Pause
            }
        }
    }

    fn on_request_data(&mut self, data: &Bytes, end_of_stream: bool) -> DataVerdict {
        if !self.enforced {
            return DataVerdict::Continue;
        }

        tracing::debug!(bytes = data.len(), end_of_stream, "Request data");
        if self.phase == Phase::AwaitingDecision {
            return DataVerdict::Buffer;
        }
        DataVerdict::Continue
    }

    fn on_request_trailers(&mut self, _trailers: &HeaderMap) -> TrailersVerdict {
        if !self.enforced {
            return TrailersVerdict::Continue;
        }

        tracing::debug!("Request trailers");
        if self.phase == Phase::AwaitingDecision {
            return TrailersVerdict::Pause;
        }
        TrailersVerdict::Continue
    }

    fn on_stream_reset(&mut self) {
        tracing::debug!(phase = ?self.phase, "Stream reset");
        self.phase = Phase::Terminated;
        self.pending = None;
    }

    fn pending_decision(&mut self) -> Option<PendingCompletion<CheckOutcome>> {
        self.pending.take()
    }

    fn on_check_complete(&mut self, outcome: CheckOutcome) {
        tracing::debug!(code = outcome.code, "Check outcome delivered");

        if self.phase != Phase::AwaitingDecision {
            tracing::debug!(phase = ?self.phase, "Discarding outcome for settled stream");
            return;
        }

        if self.apply_decision(outcome) {
            self.callbacks.resume_decoding();
        }
    }
}

impl StreamLog for MixerGate {
    fn on_stream_complete(&mut self, response_headers: Option<&HeaderMap>, info: &StreamInfo) {
        // No record means header processing never began; nothing to report.
        let Some(record) = self.record.take() else {
            return;
        };

        let request_id = record.id;
        tracing::debug!(request = %request_id, status = %self.check_status, "Reporting stream");

        // The gate may be long gone when this fires; capture nothing from it.
        let done = Box::new(move |outcome: CheckOutcome| {
            if outcome.is_ok() {
                tracing::debug!(request = %request_id, "Report delivered");
            } else {
                tracing::warn!(
                    request = %request_id,
                    code = outcome.code,
                    message = %outcome.message,
                    "Report failed"
                );
            }
        });

        self.config
            .client()
            .report(record, response_headers, info, self.check_status, done);

        self.phase = Phase::Terminated;
        self.pending = None;
    }
}
