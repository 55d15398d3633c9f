//! Maps caller supplied keys to relative paths that are safe for path
//! oriented backends.

use sha2::{Digest, Sha256};

/// Segment used when a key has no usable segments at all.
pub const FALLBACK_SEGMENT: &str = "blob";

const HASHED_SEGMENT_LEN: usize = 16;

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

fn hashed_segment(segment: &str) -> String {
    let digest = Sha256::digest(segment.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASHED_SEGMENT_LEN);
    hex
}

/// Split `key` into path segments that can't escape the storage root.
///
/// Empty, `.` and `..` segments are dropped. Segments containing anything
/// besides ASCII letters, digits, `.`, `_` and `-` are replaced with a
/// truncated SHA-256 of the segment.
pub fn sanitize(key: &str) -> Vec<String> {
    let segments: Vec<String> = key
        .trim_matches('/')
        .split('/')
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .map(|seg| {
            if is_safe_segment(seg) {
                seg.to_string()
            } else {
                hashed_segment(seg)
            }
        })
        .collect();

    if segments.is_empty() {
        return vec![FALLBACK_SEGMENT.to_string()];
    }
    segments
}

/// Slash joined form of [`sanitize`].
pub fn sanitize_to_path(key: &str) -> String {
    sanitize(key).join("/")
}
