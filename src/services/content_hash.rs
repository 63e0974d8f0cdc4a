use sha2::{Digest, Sha256};

/// Lower-cases and collapses whitespace so trivially reformatted copies of the
/// same question hash identically.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

pub(crate) fn hash(text: &str) -> String {
    hex::encode(Sha256::digest(normalize(text).as_bytes()))
}
