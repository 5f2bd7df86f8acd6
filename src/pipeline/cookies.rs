//! Cookie header parsing

use std::borrow::Cow;
use std::collections::BTreeMap;

use hyper::header::COOKIE;
use percent_encoding::percent_decode_str;

use super::RequestContext;

/// Fill `ctx.cookies` from every `Cookie` header on the request
pub fn apply(ctx: &mut RequestContext) {
    let mut cookies = BTreeMap::new();
    for value in ctx.headers.get_all(COOKIE) {
        if let Ok(raw) = value.to_str() {
            parse_into(raw, &mut cookies);
        }
    }
    ctx.cookies = cookies;
}

/// First occurrence of a name wins; pairs without `=` are skipped
fn parse_into(raw: &str, out: &mut BTreeMap<String, String>) {
    for pair in raw.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || out.contains_key(name) {
            continue;
        }
        out.insert(name.to_string(), decode_value(value.trim()));
    }
}

fn decode_value(value: &str) -> String {
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    percent_decode(value).unwrap_or_else(|| value.to_string())
}

/// `None` when the decoded bytes are not UTF-8
fn percent_decode(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;
    use hyper::Method;

    #[test]
    fn test_parses_and_decodes() {
        let mut ctx = test_context(Method::GET, "/");
        ctx.headers.insert(
            COOKIE,
            "jwt=abc.def; cart=%7B%22n%22%3A1%7D; theme=\"dark\"; broken"
                .parse()
                .unwrap(),
        );
        apply(&mut ctx);
        assert_eq!(ctx.cookies["jwt"], "abc.def");
        assert_eq!(ctx.cookies["cart"], r#"{"n":1}"#);
        assert_eq!(ctx.cookies["theme"], "dark");
        assert_eq!(ctx.cookies.len(), 3);
    }

    #[test]
    fn test_invalid_escape_kept_raw() {
        let mut out = BTreeMap::new();
        parse_into("a=%E0%A4%A; a=second", &mut out);
        assert_eq!(out["a"], "%E0%A4%A");
    }

    #[test]
    fn test_stray_percent_passes_through() {
        let mut out = BTreeMap::new();
        parse_into("discount=100%zz; name=J%C3%BCrgen", &mut out);
        assert_eq!(out["discount"], "100%zz");
        assert_eq!(out["name"], "Jürgen");
    }

    #[test]
    fn test_no_header_means_no_cookies() {
        let mut ctx = test_context(Method::GET, "/");
        apply(&mut ctx);
        assert!(ctx.cookies.is_empty());
    }
}
