//! Content addressing: deterministic identifiers for values and nodes.
//!
//! Values are canonicalized before hashing: object members are emitted in
//! sorted key order at every depth, with no insignificant whitespace. Two
//! structurally equal values therefore always share a content id, whatever
//! the member order of the document they were parsed from.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{NodeDescriptor, NodeId, ShortId};

/// Serialize `value` to its canonical JSON byte form.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push(b'{');
            for (i, (key, member)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_canonical(member, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::String(s) => write_string(s, out),
        // Null, booleans and numbers have a single compact rendering.
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    // `Value`'s Display impl never fails and applies JSON escaping.
    let quoted = Value::String(s.to_string()).to_string();
    out.extend_from_slice(quoted.as_bytes());
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Content id of a value: lowercase hex SHA-256 of its canonical JSON.
pub fn compute_content_id(value: &Value) -> String {
    sha256_hex(&canonical_json(value))
}

/// Content id of any serializable value.
pub fn compute_content_id_of<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(compute_content_id(&serde_json::to_value(value)?))
}

/// Node id: hash of the canonical `{address, port}` pair only.
pub fn compute_node_id(node: &NodeDescriptor) -> NodeId {
    let identity = serde_json::json!({
        "address": node.address,
        "port": node.port,
    });
    let digest: [u8; 32] = Sha256::digest(canonical_json(&identity)).into();
    NodeId::from(digest)
}

/// First 5 hex characters of [`compute_node_id`].
pub fn compute_short_id(node: &NodeDescriptor) -> ShortId {
    compute_node_id(node).short()
}

/// Identifier fed to placement for a stored key.
///
/// Keys may be arbitrary caller-supplied strings, while placement needs a
/// uniformly distributed hex id, so the key is hashed as a JSON string.
pub fn placement_key(key: &str) -> String {
    compute_content_id(&Value::String(key.to_string()))
}
