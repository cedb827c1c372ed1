//! Attribute blob codec.
//!
//! Attributes configured for downstream consumption ride in a single
//! request header: the map is serialized to JSON and wrapped in standard
//! base64 so the value stays header-safe. The next hop reverses the
//! transformation with [`decode`].

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};

use crate::error::Result;

/// Header carrying the forwarded attribute blob.
pub const FORWARDED_ATTRIBUTES_HEADER: &str = "x-propylon-attributes";

/// Encode an attribute map into a header-safe blob.
///
/// Returns `None` for an empty map: no attributes, no header. Output is
/// deterministic regardless of how the map was built, since `BTreeMap`
/// serializes in key order.
pub fn encode(attributes: &BTreeMap<String, String>) -> Option<String> {
    if attributes.is_empty() {
        return None;
    }
    let bytes = serde_json::to_vec(attributes).ok()?;
    Some(general_purpose::STANDARD.encode(bytes))
}

/// Decode a blob produced by [`encode`] back into the attribute map.
pub fn decode(blob: &str) -> Result<BTreeMap<String, String>> {
    let bytes = general_purpose::STANDARD.decode(blob)?;
    let attributes = serde_json::from_slice(&bytes)?;
    Ok(attributes)
}
