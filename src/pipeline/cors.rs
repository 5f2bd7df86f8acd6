//! Cross-origin policy stage
//!
//! Allowed origins get `Access-Control-Allow-*` headers on every response and
//! preflights answered with 204. Disallowed origins get no CORS headers, which
//! is what makes the browser refuse the response. Same-origin requests (the
//! `Origin` authority equals `Host`) are left alone.

use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    HOST, ORIGIN, VARY,
};
use hyper::{Method, StatusCode};

use super::{Flow, RequestContext};
use crate::config::CorsConfig;
use crate::http;
use crate::logger;

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
    methods: String,
    allowed_headers: String,
    exposed_headers: String,
    credentials: bool,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            origins: config
                .origins
                .iter()
                .map(|o| normalize_origin(o).to_string())
                .collect(),
            methods: config.methods.join(","),
            allowed_headers: config.allowed_headers.join(","),
            exposed_headers: config.exposed_headers.join(","),
            credentials: config.credentials,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = normalize_origin(origin);
        self.origins.iter().any(|o| o == "*" || o == origin)
    }

    pub fn apply(&self, ctx: &mut RequestContext) -> Flow {
        let Some(origin) = ctx.header(ORIGIN).map(ToString::to_string) else {
            return Flow::Next;
        };

        if is_same_origin(&origin, ctx.header(HOST)) {
            return Flow::Next;
        }

        let preflight = ctx.method == Method::OPTIONS
            && ctx.headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD);

        ctx.set_response_header(VARY, "Origin");
        if self.allows(&origin) {
            ctx.set_response_header(ACCESS_CONTROL_ALLOW_ORIGIN, &origin);
            if self.credentials {
                ctx.set_response_header(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
            }
            if !self.exposed_headers.is_empty() {
                ctx.set_response_header(ACCESS_CONTROL_EXPOSE_HEADERS, &self.exposed_headers);
            }
        } else {
            logger::log_debug(&format!("CORS: origin not allowed: {origin}"));
        }

        if !preflight {
            return Flow::Next;
        }

        if self.allows(&origin) {
            ctx.set_response_header(ACCESS_CONTROL_ALLOW_METHODS, &self.methods);
            ctx.set_response_header(ACCESS_CONTROL_ALLOW_HEADERS, &self.allowed_headers);
        }
        Flow::Respond(http::build_empty_response(StatusCode::NO_CONTENT))
    }
}

fn normalize_origin(origin: &str) -> &str {
    origin.trim().trim_end_matches('/')
}

fn is_same_origin(origin: &str, host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    let authority = normalize_origin(origin)
        .split_once("://")
        .map_or(origin, |(_, rest)| rest);
    authority.eq_ignore_ascii_case(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;

    fn policy() -> CorsPolicy {
        CorsPolicy::from_config(&crate::config::test_config().cors)
    }

    fn with_origin(method: Method, origin: &str) -> RequestContext {
        let mut ctx = test_context(method, "/api/v1/products");
        ctx.headers.insert(ORIGIN, origin.parse().unwrap());
        ctx.headers.insert(HOST, "localhost:3000".parse().unwrap());
        ctx
    }

    #[test]
    fn test_configured_origin_ignores_trailing_slash() {
        let policy = policy();
        assert!(policy.allows("https://ptstore.vercel.app"));
        assert!(policy.allows("https://ptstore.vercel.app/"));
        assert!(!policy.allows("https://evil.example"));
    }

    #[test]
    fn test_allowed_origin_gets_headers() {
        let mut ctx = with_origin(Method::GET, "https://ptstore.vercel.app");
        assert!(matches!(policy().apply(&mut ctx), Flow::Next));
        assert_eq!(
            ctx.response_headers[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://ptstore.vercel.app"
        );
        assert_eq!(ctx.response_headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(ctx.response_headers[ACCESS_CONTROL_EXPOSE_HEADERS], "Authorization");
    }

    #[test]
    fn test_disallowed_origin_gets_no_allow_headers() {
        let mut ctx = with_origin(Method::GET, "https://evil.example");
        assert!(matches!(policy().apply(&mut ctx), Flow::Next));
        assert!(!ctx.response_headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_preflight_short_circuits() {
        let mut ctx = with_origin(Method::OPTIONS, "https://ptstore.vercel.app");
        ctx.headers
            .insert(ACCESS_CONTROL_REQUEST_METHOD, "PATCH".parse().unwrap());
        match policy().apply(&mut ctx) {
            Flow::Respond(resp) => assert_eq!(resp.status(), StatusCode::NO_CONTENT),
            Flow::Next => panic!("preflight should short-circuit"),
        }
        assert_eq!(
            ctx.response_headers[ACCESS_CONTROL_ALLOW_METHODS],
            "GET,POST,PUT,DELETE,PATCH"
        );
        assert_eq!(
            ctx.response_headers[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type,Authorization"
        );
    }

    #[test]
    fn test_same_origin_untouched() {
        let mut ctx = with_origin(Method::PATCH, "http://localhost:3000");
        assert!(matches!(policy().apply(&mut ctx), Flow::Next));
        assert!(ctx.response_headers.is_empty());
    }

    #[test]
    fn test_no_origin_untouched() {
        let mut ctx = test_context(Method::GET, "/");
        assert!(matches!(policy().apply(&mut ctx), Flow::Next));
        assert!(ctx.response_headers.is_empty());
    }
}
