//! Request pipeline
//!
//! Every request runs through the same ordered stages. A stage either passes
//! the request on, answers it, or raises a fault; a fault skips everything
//! left and goes to the translator. Requests that survive all stages are
//! dispatched by the router, and anything the router does not claim gets the
//! fallback page.

pub mod access_log;
pub mod assets;
pub mod body;
pub mod context;
pub mod cookies;
pub mod cors;
pub mod fallback;
pub mod pollution;
pub mod query;
pub mod rate_limit;
pub mod request_time;
pub mod sanitize;
pub mod translate;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::Request;

pub use context::RequestContext;
pub use rate_limit::{MemoryStore, RateLimitStore, RateLimiter};
pub use translate::{translate, Translation};

use self::assets::StaticMounts;
use self::body::BodyParser;
use self::cors::CorsPolicy;
use self::pollution::PollutionGuard;
use crate::config::{BuildMode, Config};
use crate::error::Fault;
use crate::http::HttpResponse;
use crate::resources::DocumentStore;
use crate::routing::Router;

/// What a stage decided
pub enum Flow {
    Next,
    Respond(HttpResponse),
}

/// One pipeline stage, in the order `Pipeline::from_config` installs them
pub enum Stage {
    Cors(CorsPolicy),
    StaticAssets(StaticMounts),
    Cookies,
    AccessLog,
    RateLimit(RateLimiter),
    BodyParser(BodyParser),
    Sanitize,
    ParameterPollution(PollutionGuard),
    RequestTime,
}

impl Stage {
    async fn run(&self, ctx: &mut RequestContext, mode: BuildMode) -> Result<Flow, Fault> {
        match self {
            Self::Cors(policy) => Ok(policy.apply(ctx)),
            Self::StaticAssets(mounts) => Ok(mounts.apply(ctx).await),
            Self::Cookies => {
                cookies::apply(ctx);
                Ok(Flow::Next)
            }
            Self::AccessLog => {
                access_log::apply(ctx, mode);
                Ok(Flow::Next)
            }
            Self::RateLimit(limiter) => Ok(limiter.apply(ctx)),
            Self::BodyParser(parser) => parser.apply(ctx).map(|()| Flow::Next),
            Self::Sanitize => {
                sanitize::apply(ctx);
                Ok(Flow::Next)
            }
            Self::ParameterPollution(guard) => {
                guard.apply(ctx);
                Ok(Flow::Next)
            }
            Self::RequestTime => {
                request_time::apply(ctx);
                Ok(Flow::Next)
            }
        }
    }
}

pub struct Pipeline {
    mode: BuildMode,
    stages: Vec<Stage>,
    router: Router,
    /// Transport cap on any buffered body
    max_body_size: usize,
    access_log_format: String,
    server_name: Option<HeaderValue>,
}

impl Pipeline {
    pub fn from_config(
        config: &Config,
        store: Arc<DocumentStore>,
        limits: Arc<dyn RateLimitStore>,
    ) -> Self {
        let stages = vec![
            Stage::Cors(CorsPolicy::from_config(&config.cors)),
            Stage::StaticAssets(StaticMounts::from_root(&config.assets.root)),
            Stage::Cookies,
            Stage::AccessLog,
            Stage::RateLimit(RateLimiter::new(&config.rate_limit, limits)),
            Stage::BodyParser(BodyParser::from_config(&config.body)),
            Stage::Sanitize,
            Stage::ParameterPollution(PollutionGuard::default()),
            Stage::RequestTime,
        ];

        Self {
            mode: config.app.mode,
            stages,
            router: Router::new(store),
            max_body_size: usize::try_from(config.http.max_body_size).unwrap_or(usize::MAX),
            access_log_format: config.logging.access_log_format.clone(),
            server_name: HeaderValue::from_str(&config.http.server_name).ok(),
        }
    }

    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Run one request to completion
    ///
    /// `Err` only when a fault arrived after the response had started; the
    /// caller must then abort the connection.
    pub async fn handle<B>(&self, req: Request<B>, peer: SocketAddr) -> Result<HttpResponse, Fault>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let mut ctx = RequestContext::new(parts, peer.ip(), Bytes::new());

        let result = match self.read_body(body).await {
            Ok(raw) => {
                ctx.raw_body = raw;
                self.run(&mut ctx).await
            }
            Err(fault) => Err(fault),
        };

        let mut response = match result {
            Ok(response) => response,
            Err(fault) => match translate(fault, self.mode, ctx.headers_sent) {
                Translation::Respond(response) => response,
                Translation::Forward(fault) => return Err(fault),
            },
        };

        let headers = response.headers_mut();
        headers.extend(std::mem::take(&mut ctx.response_headers));
        if let Some(server) = &self.server_name {
            headers.entry(SERVER).or_insert_with(|| server.clone());
        }

        access_log::write(&ctx, &response, started, &self.access_log_format);
        ctx.headers_sent = true;
        Ok(response)
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<HttpResponse, Fault> {
        for stage in &self.stages {
            if let Flow::Respond(response) = stage.run(ctx, self.mode).await? {
                return Ok(response);
            }
        }

        match self.router.dispatch(ctx).await? {
            Some(response) => Ok(response),
            None => Ok(fallback::respond(ctx)),
        }
    }

    async fn read_body<B>(&self, body: B) -> Result<Bytes, Fault>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<LengthLimitError>() => {
                Err(Fault::fail(413, "request entity too large"))
            }
            Err(e) => Err(Fault::fail(400, format!("Failed to read request body: {e}"))),
        }
    }
}
