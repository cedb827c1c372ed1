//! Test infrastructure for gate integration tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use http::{HeaderMap, StatusCode};
use propylon::client::{CheckOutcome, Done, MixerClient, RequestRecord, StreamInfo};
use propylon::config::{FilterConfig, FilterSettings, ROUTE_CONTROL_KEY};
use propylon::filter::{MixerGate, StreamCallbacks};

// ---------------------------------------------------------------------------
// MockMixer
// ---------------------------------------------------------------------------

/// How the mock answers its next check call.
pub enum CheckMode {
    /// Invoke the done callback inline, before `check` returns.
    Inline(CheckOutcome),
    /// Keep the callback; the test fires it later via
    /// [`MockMixer::complete_check`].
    Deferred,
}

/// One observed check call.
#[derive(Clone)]
pub struct SeenCheck {
    pub request_id: String,
    pub peer_identity: String,
    pub call_attributes: BTreeMap<String, String>,
    pub headers: HeaderMap,
}

/// One observed report call.
#[derive(Clone)]
pub struct SeenReport {
    pub request_id: String,
    pub status: StatusCode,
    pub had_response_headers: bool,
    pub info: StreamInfo,
}

/// Programmable in-memory mixer that records every call.
///
/// Checks answer per the queued [`CheckMode`]s, defaulting to `Deferred`
/// when the queue is empty. Reports always complete inline with the
/// configured report outcome.
pub struct MockMixer {
    modes: Mutex<VecDeque<CheckMode>>,
    held: Mutex<Option<Done>>,
    checks: Mutex<Vec<SeenCheck>>,
    reports: Mutex<Vec<SeenReport>>,
    report_outcome: Mutex<CheckOutcome>,
}

impl MockMixer {
    pub fn new() -> Arc<MockMixer> {
        Arc::new(MockMixer {
            modes: Mutex::new(VecDeque::new()),
            held: Mutex::new(None),
            checks: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
            report_outcome: Mutex::new(CheckOutcome::ok()),
        })
    }

    /// Queue the answer mode for the next check call.
    pub fn answer_next(&self, mode: CheckMode) {
        self.modes.lock().unwrap().push_back(mode);
    }

    /// Fire the held check callback (a `Deferred` answer).
    pub fn complete_check(&self, outcome: CheckOutcome) {
        let done = self
            .held
            .lock()
            .unwrap()
            .take()
            .expect("no deferred check to complete");
        done(outcome);
    }

    /// Outcome handed to report callbacks.
    pub fn set_report_outcome(&self, outcome: CheckOutcome) {
        *self.report_outcome.lock().unwrap() = outcome;
    }

    pub fn check_count(&self) -> usize {
        self.checks.lock().unwrap().len()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// Snapshot of all observed check calls.
    pub fn checks(&self) -> Vec<SeenCheck> {
        self.checks.lock().unwrap().clone()
    }

    /// Snapshot of all observed report calls.
    pub fn reports(&self) -> Vec<SeenReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl MixerClient for MockMixer {
    fn check(
        &self,
        record: Arc<RequestRecord>,
        headers: &HeaderMap,
        peer_identity: &str,
        done: Done,
    ) {
        self.checks.lock().unwrap().push(SeenCheck {
            request_id: record.id.to_string(),
            peer_identity: peer_identity.to_string(),
            call_attributes: record.call_attributes.as_ref().clone(),
            headers: headers.clone(),
        });

        let mode = self
            .modes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CheckMode::Deferred);
        match mode {
            CheckMode::Inline(outcome) => done(outcome),
            CheckMode::Deferred => *self.held.lock().unwrap() = Some(done),
        }
    }

    fn report(
        &self,
        record: Arc<RequestRecord>,
        response_headers: Option<&HeaderMap>,
        info: &StreamInfo,
        status: StatusCode,
        done: Done,
    ) {
        self.reports.lock().unwrap().push(SeenReport {
            request_id: record.id.to_string(),
            status,
            had_response_headers: response_headers.is_some(),
            info: info.clone(),
        });
        done(self.report_outcome.lock().unwrap().clone());
    }
}

// ---------------------------------------------------------------------------
// RecordingStream
// ---------------------------------------------------------------------------

/// Something the filter did to its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    Resumed,
    LocalReply { status: u16, body: String },
}

/// Host-side stream stub that records what the filter does to it.
pub struct RecordingStream {
    route: HashMap<String, String>,
    peer_uri: Option<String>,
    actions: Mutex<Vec<StreamAction>>,
}

impl RecordingStream {
    pub fn new() -> RecordingStream {
        RecordingStream {
            route: HashMap::new(),
            peer_uri: None,
            actions: Mutex::new(Vec::new()),
        }
    }

    /// Set an opaque route setting.
    pub fn with_route(mut self, key: &str, value: &str) -> RecordingStream {
        self.route.insert(key.to_string(), value.to_string());
        self
    }

    /// Present a downstream peer certificate identity.
    pub fn with_peer(mut self, uri: &str) -> RecordingStream {
        self.peer_uri = Some(uri.to_string());
        self
    }

    /// Everything the filter did to the stream, in order.
    pub fn actions(&self) -> Vec<StreamAction> {
        self.actions.lock().unwrap().clone()
    }
}

impl StreamCallbacks for RecordingStream {
    fn peer_certificate_uri(&self) -> Option<String> {
        self.peer_uri.clone()
    }

    fn route_setting(&self, key: &str) -> Option<String> {
        self.route.get(key).cloned()
    }

    fn resume_decoding(&self) {
        self.actions.lock().unwrap().push(StreamAction::Resumed);
    }

    fn send_local_reply(&self, status: StatusCode, body: &str) {
        self.actions.lock().unwrap().push(StreamAction::LocalReply {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

/// Stream with the enforcement switch turned on.
pub fn enforced_stream() -> Arc<RecordingStream> {
    Arc::new(RecordingStream::new().with_route(ROUTE_CONTROL_KEY, "on"))
}

/// Minimal functional settings.
pub fn default_settings() -> serde_json::Value {
    serde_json::json!({ "mixer_server": "mixer.test:9091" })
}

/// Build a gate wired to the given mocks.
pub fn gate_with(
    settings: serde_json::Value,
    mixer: &Arc<MockMixer>,
    stream: &Arc<RecordingStream>,
) -> MixerGate {
    let parsed = FilterSettings::from_value(&settings).unwrap();
    let config = FilterConfig::new(&parsed, mixer.clone());
    MixerGate::new(Arc::new(config), stream.clone())
}
