//! Conditional request helpers for static assets

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Weak-free `ETag` for a file body: content hash plus length
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// True when `If-None-Match` names this `ETag` (or `*`), so a 304 is due
pub fn is_fresh(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*" || weak_eq(candidate, etag))
    })
}

fn weak_eq(candidate: &str, etag: &str) -> bool {
    candidate.strip_prefix("W/") == Some(etag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_is_quoted_and_stable() {
        let etag = generate_etag(b"body { color: red }");
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(etag, generate_etag(b"body { color: red }"));
        assert_ne!(etag, generate_etag(b"body { color: blue }"));
    }

    #[test]
    fn test_is_fresh() {
        let etag = "\"13-abc\"";
        assert!(is_fresh(Some("\"13-abc\""), etag));
        assert!(is_fresh(Some("\"other\", \"13-abc\""), etag));
        assert!(is_fresh(Some("W/\"13-abc\""), etag));
        assert!(is_fresh(Some("*"), etag));
        assert!(!is_fresh(Some("\"other\""), etag));
        assert!(!is_fresh(None, etag));
    }
}
