//! Propylon - an out-of-band authorization gate for reverse-proxy request paths
//!
//! This crate provides the filter a reverse proxy embeds in its per-request
//! pipeline: request headers trigger a remote authorization check, the
//! stream is held without blocking until the decision lands, and telemetry
//! is reported once the stream ends.
//!
//! # Features
//!
//! - **Out-of-band checks**: one remote decision per request, delivered
//!   inline or from any thread, applied exactly once
//! - **Non-blocking holds**: `Pause`/`Buffer` verdicts suspend the stream;
//!   a channel hop brings the decision back to the owning task
//! - **Attribute forwarding**: configured attributes ride to the next hop
//!   in a single base64 header
//! - **Per-route switches**: enforcement and forwarding toggled through
//!   opaque route settings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use propylon::filter::{register_mixer, FilterRegistry, MIXER_FILTER};
//!
//! # fn connect() -> Arc<dyn propylon::MixerClient> { unimplemented!() }
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = connect();
//!     let mut registry = FilterRegistry::new();
//!     register_mixer(&mut registry, client);
//!
//!     let factory = registry.build(MIXER_FILTER, &serde_json::json!({
//!         "mixer_server": "mixer.example:9091",
//!     }))?;
//!     // Per stream: factory.create(callbacks) mints the filter the
//!     // proxy drives through its decode path.
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod status;
#[doc(hidden)]
pub mod test_support;

pub use client::{CheckOutcome, MixerClient, RequestRecord, StreamInfo};
pub use config::{FilterConfig, FilterSettings};
pub use error::{Error, Result};
pub use filter::{MixerGate, Phase};
