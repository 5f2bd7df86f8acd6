//! Catch-all for requests no route claimed

use hyper::StatusCode;

use super::RequestContext;
use crate::http::{self, HttpResponse};
use crate::views;

/// Rendered not-found page, sent with status 200 for every method
pub fn respond(ctx: &RequestContext) -> HttpResponse {
    http::build_html_response(
        StatusCode::OK,
        views::not_found_page(ctx.original_url()),
        ctx.is_head(),
    )
}
