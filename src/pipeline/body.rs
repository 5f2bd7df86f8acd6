//! Request body decoding
//!
//! JSON and url-encoded bodies are decoded into `ctx.body`. Anything else is
//! left as `{}` with the raw bytes still available.

use hyper::header::CONTENT_TYPE;
use serde_json::Value;

use super::context::BodyKind;
use super::{query, RequestContext};
use crate::config::BodyConfig;
use crate::error::Fault;

const TOO_LARGE: &str = "request entity too large";

#[derive(Debug, Clone, Copy)]
pub struct BodyParser {
    json_limit: usize,
    form_limit: usize,
}

impl BodyParser {
    pub const fn from_config(config: &BodyConfig) -> Self {
        Self {
            json_limit: config.json_limit,
            form_limit: config.form_limit,
        }
    }

    pub fn apply(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        let Some(kind) = ctx.header(CONTENT_TYPE).and_then(body_kind) else {
            return Ok(());
        };

        match kind {
            BodyKind::Json => self.parse_json(ctx),
            BodyKind::Form => self.parse_form(ctx),
            BodyKind::None => Ok(()),
        }
    }

    fn parse_json(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        if ctx.raw_body.len() > self.json_limit {
            return Err(Fault::fail(413, TOO_LARGE));
        }
        let text = std::str::from_utf8(&ctx.raw_body)
            .map_err(|e| Fault::fail(400, format!("invalid UTF-8 in JSON body: {e}")))?;
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return Ok(());
        }
        // Only objects and arrays are accepted at the top level
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            return Err(Fault::fail(400, "JSON body must be an object or array"));
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| Fault::fail(400, format!("invalid JSON body: {e}")))?;
        ctx.body = value;
        ctx.body_kind = BodyKind::Json;
        Ok(())
    }

    fn parse_form(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        if ctx.raw_body.len() > self.form_limit {
            return Err(Fault::fail(413, TOO_LARGE));
        }
        ctx.body = Value::Object(query::parse_flat(&ctx.raw_body));
        ctx.body_kind = BodyKind::Form;
        Ok(())
    }
}

/// Decoder for a `Content-Type` value, ignoring parameters and case
fn body_kind(content_type: &str) -> Option<BodyKind> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/json" => Some(BodyKind::Json),
        "application/x-www-form-urlencoded" => Some(BodyKind::Form),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::pipeline::context::test_context;
    use hyper::body::Bytes;
    use hyper::Method;
    use serde_json::json;

    fn parser() -> BodyParser {
        BodyParser::from_config(&crate::config::test_config().body)
    }

    fn ctx_with(content_type: &str, body: impl Into<Bytes>) -> RequestContext {
        let mut ctx = test_context(Method::PATCH, "/api/v1/orders/1");
        ctx.headers.insert(CONTENT_TYPE, content_type.parse().unwrap());
        ctx.raw_body = body.into();
        ctx
    }

    #[test]
    fn test_json_object() {
        let mut ctx = ctx_with("application/json; charset=utf-8", r#"{"status":"Delivery"}"#);
        parser().apply(&mut ctx).unwrap();
        assert_eq!(ctx.body, json!({"status": "Delivery"}));
        assert_eq!(ctx.body_kind, BodyKind::Json);
    }

    #[test]
    fn test_json_over_limit_is_413() {
        let big = format!(r#"{{"blob":"{}"}}"#, "x".repeat(102_400));
        let mut ctx = ctx_with("application/json", big);
        let fault = parser().apply(&mut ctx).unwrap_err();
        assert_eq!(fault.status_code(), 413);
        assert_eq!(fault.kind(), FaultKind::Fail);
        assert_eq!(ctx.body, json!({}));
    }

    #[test]
    fn test_malformed_and_scalar_json_are_400() {
        let mut ctx = ctx_with("application/json", "{nope");
        assert_eq!(parser().apply(&mut ctx).unwrap_err().status_code(), 400);
        let mut ctx = ctx_with("application/json", "\"just a string\"");
        assert_eq!(parser().apply(&mut ctx).unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_empty_json_body_is_empty_object() {
        let mut ctx = ctx_with("application/json", "");
        parser().apply(&mut ctx).unwrap();
        assert_eq!(ctx.body, json!({}));
    }

    #[test]
    fn test_form_body() {
        let mut ctx = ctx_with(
            "application/x-www-form-urlencoded; charset=UTF-8",
            "status=Waiting+Goods&tag=a&tag=b",
        );
        parser().apply(&mut ctx).unwrap();
        assert_eq!(ctx.body, json!({"status": "Waiting Goods", "tag": ["a", "b"]}));
        assert_eq!(ctx.body_kind, BodyKind::Form);
    }

    #[test]
    fn test_other_types_untouched() {
        let mut ctx = ctx_with("text/plain", "hello");
        parser().apply(&mut ctx).unwrap();
        assert_eq!(ctx.body, json!({}));
        assert_eq!(ctx.body_kind, BodyKind::None);
    }
}
