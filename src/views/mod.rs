//! Server-rendered pages
//!
//! Templates are compiled in and filled with `{{name}}` placeholders. Values
//! coming from documents are HTML-escaped before substitution.

use std::fmt::Write as _;

use hyper::{Method, StatusCode};
use serde_json::Value;

use crate::http::{self, HttpResponse};
use crate::orders::{progress_for, OrderStatus};
use crate::pipeline::RequestContext;
use crate::resources::store::{Document, ID_FIELD};
use crate::resources::{DocumentStore, ListQuery, ResourceKind};

const LAYOUT: &str = include_str!("templates/layout.html");
const OVERVIEW: &str = include_str!("templates/overview.html");
const PRODUCTS: &str = include_str!("templates/products.html");
const ORDERS: &str = include_str!("templates/orders.html");
const ORDER_DETAIL: &str = include_str!("templates/order_detail.html");
const NOT_FOUND: &str = include_str!("templates/not_found.html");

const DETAIL_SCRIPT: &str = r#"    <script src="/js/detail.js"></script>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nav {
    Overview,
    Products,
    Orders,
    None,
}

/// Render the page for `path`, or `None` when no view claims it
pub async fn render(store: &DocumentStore, ctx: &RequestContext, path: &str) -> Option<HttpResponse> {
    if ctx.method != Method::GET && ctx.method != Method::HEAD {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let html = match segments.as_slice() {
        [] => overview(store).await,
        ["products"] => products(store, ctx).await,
        ["orders"] => orders(store, ctx).await,
        ["orders", id] => order_detail(store, id).await?,
        _ => return None,
    };
    Some(http::build_html_response(StatusCode::OK, html, ctx.is_head()))
}

/// The page the fallback answers with
pub fn not_found_page(url: &str) -> String {
    page(
        "Page not found",
        Nav::None,
        &fill(NOT_FOUND, &[("url", &escape_html(url))]),
        "",
    )
}

async fn overview(store: &DocumentStore) -> String {
    let mut rows = String::new();
    for kind in ResourceKind::ALL {
        let _ = writeln!(
            rows,
            "                <tr><td>{}</td><td>{}</td></tr>",
            kind.segment(),
            store.count(kind).await
        );
    }
    page("Overview", Nav::Overview, &fill(OVERVIEW, &[("rows", &rows)]), "")
}

async fn products(store: &DocumentStore, ctx: &RequestContext) -> String {
    let docs = store
        .list(ResourceKind::Products, &ListQuery::from_query(&ctx.query))
        .await;
    let mut rows = String::new();
    for doc in &docs {
        let _ = writeln!(
            rows,
            "                <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            field(doc, "name"),
            field(doc, "price"),
            field(doc, "ratingsAverage"),
        );
    }
    page("Products", Nav::Products, &fill(PRODUCTS, &[("rows", &rows)]), "")
}

async fn orders(store: &DocumentStore, ctx: &RequestContext) -> String {
    let docs = store
        .list(ResourceKind::Orders, &ListQuery::from_query(&ctx.query))
        .await;
    let mut rows = String::new();
    for doc in &docs {
        let id = field(doc, ID_FIELD);
        let status = doc.get("status").and_then(Value::as_str).unwrap_or_default();
        let width = progress_for(status).unwrap_or(0);
        let _ = writeln!(
            rows,
            "                <tr><td><a href=\"/orders/{id}\">{id}</a></td><td>{}</td><td>{width}%</td></tr>",
            escape_html(status),
        );
    }
    page("Orders", Nav::Orders, &fill(ORDERS, &[("rows", &rows)]), "")
}

async fn order_detail(store: &DocumentStore, id: &str) -> Option<String> {
    let doc = store.get(ResourceKind::Orders, id).await?;
    Some(render_order_detail(&doc))
}

fn render_order_detail(doc: &Document) -> String {
    let id = doc
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(escape_html)
        .unwrap_or_default();
    let status = doc.get("status").and_then(Value::as_str).unwrap_or_default();

    let mut options = String::new();
    for candidate in OrderStatus::ALL {
        let selected = if candidate.as_str() == status { " selected" } else { "" };
        let _ = writeln!(
            options,
            "                <option value=\"{0}\"{selected}>{0}</option>",
            candidate.as_str()
        );
    }

    let width = progress_for(status).unwrap_or(0).to_string();
    let widths = escape_html(&progress_table().to_string());
    let content = fill(
        ORDER_DETAIL,
        &[
            ("id", &id),
            ("width", &width),
            ("widths", &widths),
            ("options", &options),
        ],
    );
    page("Order detail", Nav::Orders, &content, DETAIL_SCRIPT)
}

/// Status name to bar width, read by the page script after an update
fn progress_table() -> Value {
    OrderStatus::ALL
        .into_iter()
        .map(|status| (status.as_str().to_string(), Value::from(status.progress_width())))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn page(title: &str, nav: Nav, content: &str, scripts: &str) -> String {
    let active = |item: Nav| if item == nav { " active" } else { "" };
    fill(
        LAYOUT,
        &[
            ("title", title),
            ("nav_overview", active(Nav::Overview)),
            ("nav_products", active(Nav::Products)),
            ("nav_orders", active(Nav::Orders)),
            ("content", content),
            ("scripts", scripts),
        ],
    )
}

/// Replace each `{{name}}` with its value; unknown placeholders stay as is
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn field(doc: &Value, name: &str) -> String {
    match doc.get(name) {
        Some(Value::String(s)) => escape_html(s),
        Some(Value::Null) | None => String::new(),
        Some(other) => escape_html(&other.to_string()),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
