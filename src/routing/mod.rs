//! Routing module
//!
//! Static, ordered prefix table: the ten resource groups under `/api/v1`,
//! then the view router at `/`. First match wins.

mod matcher;

use std::sync::Arc;

pub use matcher::{match_prefix, match_route};

use crate::error::Fault;
use crate::http::HttpResponse;
use crate::pipeline::RequestContext;
use crate::resources::{self, DocumentStore, ResourceKind};
use crate::views;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Resource(ResourceKind),
    Views,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub prefix: &'static str,
    pub target: Target,
}

const fn resource(kind: ResourceKind) -> Route {
    Route {
        prefix: kind.prefix(),
        target: Target::Resource(kind),
    }
}

pub const ROUTES: [Route; 11] = [
    resource(ResourceKind::Users),
    resource(ResourceKind::Products),
    resource(ResourceKind::Categories),
    resource(ResourceKind::Brands),
    resource(ResourceKind::Reviews),
    resource(ResourceKind::Orders),
    resource(ResourceKind::Imports),
    resource(ResourceKind::Comments),
    resource(ResourceKind::Payments),
    resource(ResourceKind::Locations),
    Route {
        prefix: "/",
        target: Target::Views,
    },
];

/// Dispatches matched requests to resource groups and views
pub struct Router {
    store: Arc<DocumentStore>,
}

impl Router {
    pub const fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the matched group has no handler for the request
    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Result<Option<HttpResponse>, Fault> {
        let path = ctx.path().to_string();
        let Some((route, rest)) = match_route(&path, &ROUTES) else {
            return Ok(None);
        };

        match route.target {
            Target::Resource(kind) => resources::handle(kind, &self.store, ctx, rest).await,
            Target::Views => Ok(views::render(&self.store, ctx, rest).await),
        }
    }
}
