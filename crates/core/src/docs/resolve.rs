//! Relative path normalization for the documentation sandbox.

use crate::Error;

/// Normalize a caller-supplied relative path.
///
/// Normalization steps:
/// 1. Drop `#fragment` and `?query`
/// 2. Reject absolute (`/x`), protocol-relative (`//host`) and backslash paths
/// 3. Reject scheme-like first segments (`mailto:`, `javascript:`, `C:`)
/// 4. Collapse `.` and empty segments
/// 5. Reject `..` in any spelling, including percent-encoded dots
/// 6. Keep a trailing `/` so directory index pages stay distinct
pub(crate) fn normalize_relative(input: &str) -> Result<String, Error> {
    let path = input.split(['#', '?']).next().unwrap_or_default();

    if path.starts_with("//") {
        return Err(Error::InvalidPath(format!("protocol-relative URL not allowed: {input}")));
    }
    if path.starts_with('/') {
        return Err(Error::InvalidPath(format!("absolute path not allowed: {input}")));
    }
    if path.contains('\\') || path.chars().any(char::is_control) {
        return Err(Error::InvalidPath(format!("malformed path: {input:?}")));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            s if is_parent_segment(s) => {
                return Err(Error::InvalidPath(format!("path escapes documentation root: {input}")));
            }
            s if segments.is_empty() && s.contains(':') => {
                return Err(Error::InvalidPath(format!("unsupported scheme in path: {input}")));
            }
            s => segments.push(s),
        }
    }

    let mut normalized = segments.join("/");
    if !normalized.is_empty() && (path.ends_with('/') || path.ends_with("/.")) {
        normalized.push('/');
    }

    Ok(normalized)
}

/// Reject `..` in the path of an absolute URL before URL parsing collapses it.
pub(crate) fn reject_parent_in_url(input: &str) -> Result<(), Error> {
    let without_query = input.split(['#', '?']).next().unwrap_or_default();
    let after_scheme = without_query.split_once("://").map_or(without_query, |(_, rest)| rest);

    if after_scheme.split(['/', '\\']).any(is_parent_segment) {
        return Err(Error::InvalidPath(format!("path escapes documentation root: {input}")));
    }
    Ok(())
}

fn is_parent_segment(segment: &str) -> bool {
    matches!(segment.to_ascii_lowercase().as_str(), ".." | ".%2e" | "%2e." | "%2e%2e")
}
