//! Development access logging
//!
//! The stage only marks the request; the line is written by the pipeline once
//! the final status and length are known.

use std::time::Instant;

use hyper::header::{CONTENT_LENGTH, REFERER, USER_AGENT};

use super::RequestContext;
use crate::config::BuildMode;
use crate::http::HttpResponse;
use crate::logger::{self, AccessLogEntry};

pub fn apply(ctx: &mut RequestContext, mode: BuildMode) {
    ctx.access_log = mode.is_development();
}

pub fn entry(ctx: &RequestContext, response: &HttpResponse, started: Instant) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        ctx.client_ip.to_string(),
        ctx.method.to_string(),
        ctx.original_url().to_string(),
    );
    entry.http_version = format!("{:?}", ctx.version)
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    entry.referer = ctx.header(REFERER).map(ToString::to_string);
    entry.user_agent = ctx.header(USER_AGENT).map(ToString::to_string);
    entry.response_time = started.elapsed();
    entry
}

/// Write the line if the request was marked
pub fn write(ctx: &RequestContext, response: &HttpResponse, started: Instant, format: &str) {
    if ctx.access_log {
        logger::log_access(&entry(ctx, response, started), format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_text_response;
    use crate::pipeline::context::test_context;
    use hyper::{Method, StatusCode};

    #[test]
    fn test_marks_only_in_development() {
        let mut ctx = test_context(Method::GET, "/");
        apply(&mut ctx, BuildMode::Production);
        assert!(!ctx.access_log);
        apply(&mut ctx, BuildMode::Development);
        assert!(ctx.access_log);
    }

    #[test]
    fn test_entry_fields() {
        let ctx = test_context(Method::PATCH, "/api/v1/orders/1?x=1");
        let resp = build_text_response(StatusCode::OK, "hello");
        let entry = entry(&ctx, &resp, Instant::now());
        assert_eq!(entry.method, "PATCH");
        assert_eq!(entry.url, "/api/v1/orders/1?x=1");
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.body_bytes, Some(5));
        assert!(entry.format("dev").starts_with("PATCH /api/v1/orders/1?x=1 200 "));
    }
}
