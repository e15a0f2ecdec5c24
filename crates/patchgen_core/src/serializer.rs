//! Patch file encoding. Pure: no file I/O happens here.

use crate::patch::Patch;

/// Render a patch as the host's pretty-printed JSON save format.
pub fn serialize(patch: &Patch) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(patch)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn deserialize(bytes: &[u8]) -> Result<Patch, serde_json::Error> {
    serde_json::from_slice(bytes)
}
