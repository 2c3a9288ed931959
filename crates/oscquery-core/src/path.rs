//! Slash-delimited OSC paths
//!
//! ```text
//! /avatar/parameters/VelocityX
//! ```
//!
//! Empty segments are ignored, so `//a//b/` names the same node as `/a/b`.

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Join segments into an absolute path; no segments gives `/`
pub fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Last non-empty segment, or `""` for the root path
pub fn last_segment(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}
