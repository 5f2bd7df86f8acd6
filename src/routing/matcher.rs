//! Route matching module
//!
//! Prefix matching on path-segment boundaries.

use super::Route;

/// Find the first matching route and the path left below its prefix
pub fn match_route<'r, 'p>(path: &'p str, routes: &'r [Route]) -> Option<(&'r Route, &'p str)> {
    routes
        .iter()
        .find_map(|route| match_prefix(path, route.prefix).map(|rest| (route, rest)))
}

/// Remaining path if `path` is `prefix` or lies below it
///
/// `/` matches everything and leaves the path untouched. Otherwise the
/// remainder is empty or starts with `/`, so `/api` never matches `/apiary`.
pub fn match_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path);
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
