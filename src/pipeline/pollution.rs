//! HTTP parameter pollution guard
//!
//! A key sent more than once keeps only its last value unless it is
//! whitelisted. Dropped arrays are recorded next to the cleaned values.

use serde_json::{Map, Value};

use super::context::BodyKind;
use super::RequestContext;

const DEFAULT_WHITELIST: [&str; 3] = ["ratingsQuantity", "ratingsAverage", "price"];

#[derive(Debug, Clone)]
pub struct PollutionGuard {
    whitelist: Vec<String>,
}

impl Default for PollutionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WHITELIST)
    }
}

impl PollutionGuard {
    pub fn new<I, S>(whitelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: whitelist.into_iter().map(Into::into).collect(),
        }
    }

    pub fn apply(&self, ctx: &mut RequestContext) {
        ctx.query_polluted = self.collapse(&mut ctx.query);
        if ctx.body_kind == BodyKind::Form {
            if let Value::Object(body) = &mut ctx.body {
                ctx.body_polluted = self.collapse(body);
            }
        }
    }

    fn collapse(&self, map: &mut Map<String, Value>) -> Map<String, Value> {
        let mut polluted = Map::new();
        for (key, value) in map.iter_mut() {
            if self.whitelist.iter().any(|w| w == key) {
                continue;
            }
            let Value::Array(items) = value else {
                continue;
            };
            let last = items.last().cloned().unwrap_or(Value::Null);
            polluted.insert(key.clone(), std::mem::replace(value, last));
        }
        polluted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;
    use hyper::Method;
    use serde_json::json;

    #[test]
    fn test_last_value_wins_outside_whitelist() {
        let mut ctx = test_context(
            Method::GET,
            "/api/v1/products?color=red&color=blue&price=5&price=10",
        );
        PollutionGuard::default().apply(&mut ctx);
        assert_eq!(ctx.query["color"], json!("blue"));
        assert_eq!(ctx.query["price"], json!(["5", "10"]));
        assert_eq!(ctx.query_polluted["color"], json!(["red", "blue"]));
        assert!(!ctx.query_polluted.contains_key("price"));
    }

    #[test]
    fn test_form_body_collapsed_json_body_untouched() {
        let mut ctx = test_context(Method::POST, "/api/v1/reviews");
        ctx.body = json!({"sort": ["a", "b"], "ratingsAverage": ["4", "5"]});
        ctx.body_kind = BodyKind::Form;
        PollutionGuard::default().apply(&mut ctx);
        assert_eq!(ctx.body, json!({"sort": "b", "ratingsAverage": ["4", "5"]}));
        assert_eq!(ctx.body_polluted["sort"], json!(["a", "b"]));

        let mut ctx = test_context(Method::POST, "/api/v1/orders");
        ctx.body = json!({"items": ["a", "b"]});
        ctx.body_kind = BodyKind::Json;
        PollutionGuard::default().apply(&mut ctx);
        assert_eq!(ctx.body, json!({"items": ["a", "b"]}));
    }
}
