//! Operator-key stripping and markup escaping for client input

use serde_json::{Map, Value};

use super::RequestContext;
use crate::logger;

/// Scrub body, query and params in place
pub fn apply(ctx: &mut RequestContext) {
    let mut removed = sanitize_value(&mut ctx.body);
    removed += sanitize_map(&mut ctx.query);
    removed += sanitize_map(&mut ctx.params);
    if removed > 0 {
        logger::log_debug(&format!(
            "Sanitizer removed {removed} operator keys from {}",
            ctx.path()
        ));
    }
}

/// Keys starting with `$` or containing `.` are query operators to the
/// document store
fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Returns the number of keys removed
pub fn sanitize_value(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => sanitize_map(map),
        Value::Array(items) => items.iter_mut().map(sanitize_value).sum(),
        Value::String(s) => {
            if s.contains('<') {
                *s = s.replace('<', "&lt;");
            }
            0
        }
        _ => 0,
    }
}

fn sanitize_map(map: &mut Map<String, Value>) -> usize {
    let before = map.len();
    map.retain(|key, _| !is_operator_key(key));
    let mut removed = before - map.len();
    for value in map.values_mut() {
        removed += sanitize_value(value);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;
    use hyper::Method;
    use serde_json::json;

    #[test]
    fn test_operator_keys_removed_recursively() {
        let mut value = json!({
            "email": {"$gt": ""},
            "profile.admin": true,
            "items": [{"$where": "1"}, {"qty": 2}],
            "name": "ok"
        });
        assert_eq!(sanitize_value(&mut value), 3);
        assert_eq!(value, json!({"email": {}, "items": [{}, {"qty": 2}], "name": "ok"}));
    }

    #[test]
    fn test_markup_escaped() {
        let mut value = json!({"review": "<script>alert(1)</script>", "tags": ["<b>"]});
        sanitize_value(&mut value);
        assert_eq!(
            value,
            json!({"review": "&lt;script>alert(1)&lt;/script>", "tags": ["&lt;b>"]})
        );
    }

    #[test]
    fn test_apply_covers_query() {
        let mut ctx = test_context(Method::GET, "/api/v1/users?email[$ne]=x&name=%3Cb%3E");
        apply(&mut ctx);
        assert_eq!(ctx.query["email"], json!({}));
        assert_eq!(ctx.query["name"], json!("&lt;b>"));
    }
}
