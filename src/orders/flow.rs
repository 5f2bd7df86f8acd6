//! Order status change flow
//!
//! What the order detail page does when staff cancel or advance an order:
//! ask for confirmation, PATCH the order, then either show a success notice
//! and reload shortly after, or show the raw error. Requests are not
//! de-duplicated; overlapping actions race.
//!
//! The server binary does not call this. It is the library API for driving
//! order status changes from Rust against a running server; the browser
//! runs the same steps from `public/js/detail.js`.

use std::future::Future;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::form_urlencoded;

use super::{progress_for, OrderStatus};

/// Delay between a successful update and the page reload
pub const RELOAD_DELAY: Duration = Duration::from_millis(500);

const CONFIRM_PROMPT: &str = "Are you sure you want to change the status of this order?";
const SUCCESS_MESSAGE: &str = "Update Order Status successfully!";

/// Yes/no prompt shown before any request goes out
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Transport for the status PATCH
pub trait OrderGateway {
    fn update_status(
        &self,
        id: &str,
        status: &str,
    ) -> impl Future<Output = Result<(), GatewayError>>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("invalid request: {0}")]
    Build(#[from] hyper::http::Error),

    #[error("failed to read response: {0}")]
    Body(#[from] hyper::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient alert shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Confirmation declined; nothing was sent
    Declined,
    Updated {
        notice: Notice,
        reload_after: Duration,
    },
    Failed {
        notice: Notice,
    },
}

pub struct OrderStatusFlow<G, C> {
    gateway: G,
    confirm: C,
}

impl<G, C> OrderStatusFlow<G, C>
where
    G: OrderGateway,
    C: Confirm,
{
    pub const fn new(gateway: G, confirm: C) -> Self {
        Self { gateway, confirm }
    }

    /// Set the order to `Cancelled`
    pub async fn cancel(&self, id: &str) -> FlowOutcome {
        self.change(id, OrderStatus::Cancelled.as_str()).await
    }

    /// Set the order to whatever the status control currently holds
    pub async fn accept(&self, id: &str, selected: &str) -> FlowOutcome {
        self.change(id, selected).await
    }

    async fn change(&self, id: &str, status: &str) -> FlowOutcome {
        if !self.confirm.confirm(CONFIRM_PROMPT) {
            return FlowOutcome::Declined;
        }

        match self.gateway.update_status(id, status).await {
            Ok(()) => FlowOutcome::Updated {
                notice: Notice {
                    level: NoticeLevel::Success,
                    message: SUCCESS_MESSAGE.to_string(),
                },
                reload_after: RELOAD_DELAY,
            },
            Err(e) => FlowOutcome::Failed {
                notice: Notice {
                    level: NoticeLevel::Error,
                    message: e.to_string(),
                },
            },
        }
    }
}

/// Progress bar on the order page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressBar {
    pub width: Option<u8>,
}

impl ProgressBar {
    /// Unrecognised statuses leave the width as it was
    pub fn apply(&mut self, status: &str) {
        if let Some(width) = progress_for(status) {
            self.width = Some(width);
        }
    }
}

/// PATCHes `{base}/api/v1/orders/{id}` with a form-encoded body
pub struct HttpOrderGateway {
    base_url: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpOrderGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    fn order_url(&self, id: &str) -> String {
        format!("{}/api/v1/orders/{id}", self.base_url.trim_end_matches('/'))
    }
}

impl OrderGateway for HttpOrderGateway {
    async fn update_status(&self, id: &str, status: &str) -> Result<(), GatewayError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("status", status)
            .finish();

        let request = Request::builder()
            .method(Method::PATCH)
            .uri(self.order_url(id))
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Full::new(Bytes::from(body)))?;

        let response = self.client.request(request).await?;
        let status_code = response.status();
        if status_code.is_success() {
            return Ok(());
        }

        let bytes = response.into_body().collect().await?.to_bytes();
        Err(GatewayError::Status {
            status: status_code.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
