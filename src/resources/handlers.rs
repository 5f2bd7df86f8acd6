//! CRUD handlers shared by every resource group

use hyper::{Method, StatusCode};
use serde_json::{json, Map, Value};

use super::store::{Document, DocumentStore, ListQuery};
use super::ResourceKind;
use crate::error::Fault;
use crate::http::{self, HttpResponse};
use crate::orders::OrderStatus;
use crate::pipeline::RequestContext;

/// Handle `rest`, the path below the group prefix. `Ok(None)` means the group
/// has no route for this method and path.
pub async fn handle(
    kind: ResourceKind,
    store: &DocumentStore,
    ctx: &mut RequestContext,
    rest: &str,
) -> Result<Option<HttpResponse>, Fault> {
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => match ctx.method {
            Method::GET => Ok(Some(list(kind, store, ctx).await)),
            Method::POST => create(kind, store, ctx).await.map(Some),
            _ => Ok(None),
        },
        [id] => {
            let id = (*id).to_string();
            ctx.params.insert("id".to_string(), Value::String(id.clone()));
            match ctx.method {
                Method::GET | Method::HEAD => get_one(kind, store, &id).await.map(Some),
                Method::PATCH => update(kind, store, ctx, &id).await.map(Some),
                Method::DELETE => delete(kind, store, &id).await.map(Some),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

async fn list(kind: ResourceKind, store: &DocumentStore, ctx: &RequestContext) -> HttpResponse {
    let query = ListQuery::from_query(&ctx.query);
    let docs = store.list(kind, &query).await;
    http::build_json_response(
        StatusCode::OK,
        &json!({
            "status": "success",
            "results": docs.len(),
            "data": { "data": docs },
        }),
    )
}

async fn get_one(kind: ResourceKind, store: &DocumentStore, id: &str) -> Result<HttpResponse, Fault> {
    let doc = store.get(kind, id).await.ok_or_else(Fault::not_found)?;
    Ok(document_response(StatusCode::OK, doc))
}

async fn create(
    kind: ResourceKind,
    store: &DocumentStore,
    ctx: &RequestContext,
) -> Result<HttpResponse, Fault> {
    let fields = body_fields(ctx)?;
    validate(kind, &fields)?;
    let doc = store.create(kind, fields).await;
    Ok(document_response(StatusCode::CREATED, doc))
}

async fn update(
    kind: ResourceKind,
    store: &DocumentStore,
    ctx: &RequestContext,
    id: &str,
) -> Result<HttpResponse, Fault> {
    let changes = body_fields(ctx)?;
    validate(kind, &changes)?;
    let doc = store
        .update(kind, id, changes)
        .await
        .ok_or_else(Fault::not_found)?;
    Ok(document_response(StatusCode::OK, doc))
}

async fn delete(kind: ResourceKind, store: &DocumentStore, id: &str) -> Result<HttpResponse, Fault> {
    if store.delete(kind, id).await {
        Ok(http::build_empty_response(StatusCode::NO_CONTENT))
    } else {
        Err(Fault::not_found())
    }
}

fn document_response(status: StatusCode, doc: Document) -> HttpResponse {
    http::build_json_response(
        status,
        &json!({
            "status": "success",
            "data": { "data": doc },
        }),
    )
}

fn body_fields(ctx: &RequestContext) -> Result<Map<String, Value>, Fault> {
    ctx.body_object()
        .cloned()
        .ok_or_else(|| Fault::fail(400, "Request body must be an object"))
}

/// Orders only accept the five known status strings
fn validate(kind: ResourceKind, fields: &Map<String, Value>) -> Result<(), Fault> {
    if kind != ResourceKind::Orders {
        return Ok(());
    }
    let Some(status) = fields.get("status") else {
        return Ok(());
    };
    match status.as_str().map(str::parse::<OrderStatus>) {
        Some(Ok(_)) => Ok(()),
        _ => Err(Fault::fail(
            400,
            format!(
                "Invalid order status: {status}. Must be one of: {}",
                OrderStatus::ALL.map(OrderStatus::as_str).join(", ")
            ),
        )),
    }
}
