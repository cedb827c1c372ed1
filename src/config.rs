//! Filter configuration: raw listener settings and the compiled form.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::HeaderValue;
use serde::Deserialize;

use crate::attributes;
use crate::client::MixerClient;
use crate::error::{Error, Result};

/// Route-level switch key: enforcement is enabled when the route sets this
/// to `"on"`, and disabled otherwise.
pub const ROUTE_CONTROL_KEY: &str = "mixer_control";

/// Route-level switch key: attribute forwarding is disabled when the route
/// sets this to `"off"`, and enabled otherwise.
pub const ROUTE_FORWARD_KEY: &str = "mixer_forward";

/// Listener settings as the embedding proxy hands them over, already
/// parsed into JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSettings {
    /// Address of the remote mixer. Required for a functional listener;
    /// see [`FilterConfig::new`] for what happens when it is absent.
    pub mixer_server: Option<String>,

    /// Attributes attached to every check and report call.
    #[serde(default)]
    pub mixer_attributes: BTreeMap<String, String>,

    /// Attributes forwarded to the next hop in a request header.
    #[serde(default)]
    pub forward_attributes: BTreeMap<String, String>,
}

impl FilterSettings {
    /// Deserialize settings from the proxy's parsed configuration value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::config(format!("Invalid mixer settings: {}", e)))
    }
}

/// Compiled per-listener configuration, shared read-only by every request
/// on the listener.
pub struct FilterConfig {
    endpoint: Option<String>,
    call_attributes: Arc<BTreeMap<String, String>>,
    forward_blob: Option<HeaderValue>,
    client: Arc<dyn MixerClient>,
}

impl FilterConfig {
    /// Compile settings into the immutable per-listener form.
    ///
    /// A missing `mixer_server` is an operator error, not a crash: the
    /// listener comes up degraded with no endpoint, and the error is
    /// logged once here at activation time.
    pub fn new(settings: &FilterSettings, client: Arc<dyn MixerClient>) -> Self {
        let endpoint = match &settings.mixer_server {
            Some(server) => Some(server.clone()),
            None => {
                tracing::error!("mixer_server is required but missing; listener degraded");
                None
            }
        };

        let forward_blob = attributes::encode(&settings.forward_attributes)
            .and_then(|blob| match HeaderValue::from_str(&blob) {
                Ok(value) => {
                    tracing::debug!(
                        attributes = settings.forward_attributes.len(),
                        "Built forwarding attribute blob"
                    );
                    Some(value)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Forwarding blob is not a valid header value");
                    None
                }
            });

        if let Some(server) = &endpoint {
            tracing::debug!(endpoint = %server, "Mixer filter configured");
        }

        Self {
            endpoint,
            call_attributes: Arc::new(settings.mixer_attributes.clone()),
            forward_blob,
            client,
        }
    }

    /// Remote mixer address; `None` when the listener is degraded.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Attributes attached to every remote call.
    pub fn call_attributes(&self) -> &Arc<BTreeMap<String, String>> {
        &self.call_attributes
    }

    /// Pre-encoded forwarding header value; `None` when nothing is
    /// configured to forward.
    pub fn forward_blob(&self) -> Option<&HeaderValue> {
        self.forward_blob.as_ref()
    }

    /// Shared handle to the remote client.
    pub fn client(&self) -> &Arc<dyn MixerClient> {
        &self.client
    }
}

impl std::fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterConfig")
            .field("endpoint", &self.endpoint)
            .field("call_attributes", &self.call_attributes)
            .field("forward_blob", &self.forward_blob)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CheckOutcome, Done, RequestRecord, StreamInfo};
    use crate::test_report;
    use http::HeaderMap;

    struct NullMixer;

    impl MixerClient for NullMixer {
        fn check(
            &self,
            _record: Arc<RequestRecord>,
            _headers: &HeaderMap,
            _peer_identity: &str,
            done: Done,
        ) {
            done(CheckOutcome::ok());
        }

        fn report(
            &self,
            _record: Arc<RequestRecord>,
            _response_headers: Option<&HeaderMap>,
            _info: &StreamInfo,
            _status: http::StatusCode,
            done: Done,
        ) {
            done(CheckOutcome::ok());
        }
    }

    fn compile(json: serde_json::Value) -> FilterConfig {
        let settings = FilterSettings::from_value(&json).unwrap();
        FilterConfig::new(&settings, Arc::new(NullMixer))
    }

    #[test]
    fn test_compile_full_settings() {
        let t = test_report!("Compile full settings");
        let config = compile(serde_json::json!({
            "mixer_server": "mixer.example:9091",
            "mixer_attributes": {"source.service": "reviews"},
            "forward_attributes": {"source.uid": "pod-17"},
        }));

        t.assert_eq("endpoint", &config.endpoint(), &Some("mixer.example:9091"));
        t.assert_eq(
            "call attribute",
            &config.call_attributes().get("source.service").map(String::as_str),
            &Some("reviews"),
        );
        t.assert_true("forward blob present", config.forward_blob().is_some());
    }

    #[test]
    fn test_missing_server_degrades_listener() {
        let t = test_report!("Missing mixer_server degrades the listener");
        let config = compile(serde_json::json!({
            "mixer_attributes": {"source.service": "reviews"},
        }));

        t.assert_true("no endpoint", config.endpoint().is_none());
        t.assert_eq(
            "call attributes kept",
            &config.call_attributes().len(),
            &1usize,
        );
    }

    #[test]
    fn test_forward_blob_round_trips() {
        let t = test_report!("Forward blob decodes back to the configured map");
        let config = compile(serde_json::json!({
            "mixer_server": "mixer.example:9091",
            "forward_attributes": {"a": "1", "b": "2"},
        }));

        let blob = config.forward_blob().unwrap().to_str().unwrap().to_string();
        let decoded = attributes::decode(&blob).unwrap();
        t.assert_eq("decoded size", &decoded.len(), &2usize);
        t.assert_eq("a", &decoded.get("a").map(String::as_str), &Some("1"));
        t.assert_eq("b", &decoded.get("b").map(String::as_str), &Some("2"));
    }

    #[test]
    fn test_empty_forward_attributes_produce_no_blob() {
        let t = test_report!("Empty forward attributes produce no blob");
        let config = compile(serde_json::json!({
            "mixer_server": "mixer.example:9091",
        }));
        t.assert_true("no blob", config.forward_blob().is_none());
    }

    #[test]
    fn test_malformed_settings_rejected() {
        let t = test_report!("Malformed settings value rejected");
        let result = FilterSettings::from_value(&serde_json::json!({
            "mixer_server": 9091,
        }));
        t.assert_true("parse error", result.is_err());
        let err = result.unwrap_err().to_string();
        t.assert_contains("error names the settings", &err, "mixer settings");
    }

    #[test]
    fn test_defaults() {
        let t = test_report!("Settings default to empty maps");
        let settings = FilterSettings::from_value(&serde_json::json!({
            "mixer_server": "mixer.example:9091",
        }))
        .unwrap();
        t.assert_true("no call attributes", settings.mixer_attributes.is_empty());
        t.assert_true(
            "no forward attributes",
            settings.forward_attributes.is_empty(),
        );
    }
}
