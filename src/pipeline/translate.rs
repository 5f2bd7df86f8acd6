//! Fault to response translation
//!
//! Every fault raised by a stage or handler ends here. The full fault is
//! always logged; the client sees the stack only in development mode.

use hyper::StatusCode;
use serde::Serialize;

use crate::config::BuildMode;
use crate::error::{Fault, FaultKind};
use crate::http::{self, HttpResponse};
use crate::logger;

pub enum Translation {
    Respond(HttpResponse),
    /// A response already started; the connection has to be torn down
    Forward(Fault),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    status: FaultKind,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<&'a str>,
}

pub fn translate(fault: Fault, mode: BuildMode, headers_sent: bool) -> Translation {
    logger::log_fault(&fault);

    if headers_sent {
        return Translation::Forward(fault);
    }

    let status = StatusCode::from_u16(fault.status_code()).unwrap_or_else(|_| {
        logger::log_warning(&format!(
            "Fault carried invalid status code {}, answering 500",
            fault.status_code()
        ));
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let body = ErrorBody {
        status: fault.kind(),
        message: fault.message(),
        stack: if mode.is_development() {
            fault.trace()
        } else {
            None
        },
    };
    Translation::Respond(http::build_json_response(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(resp: HttpResponse) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn respond(translation: Translation) -> HttpResponse {
        match translation {
            Translation::Respond(resp) => resp,
            Translation::Forward(_) => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_default_fault_is_500_error() {
        let resp = respond(translate(Fault::new("db down"), BuildMode::Production, false));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers()["content-type"],
            "application/json; charset=utf-8"
        );
        let body = body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "db down");
        assert!(body.get("stack").is_none());
    }

    #[tokio::test]
    async fn test_4xx_without_kind_stays_error() {
        let fault = Fault::new("teapot").with_status(418);
        let resp = respond(translate(fault, BuildMode::Production, false));
        assert_eq!(resp.status().as_u16(), 418);
        assert_eq!(body_json(resp).await["status"], "error");
    }

    #[tokio::test]
    async fn test_stack_only_in_development() {
        let resp = respond(translate(
            Fault::fail(400, "bad"),
            BuildMode::Development,
            false,
        ));
        let body = body_json(resp).await;
        assert_eq!(body["status"], "fail");
        assert!(body["stack"].as_str().is_some_and(|s| s.starts_with("Fault: bad")));

        let resp = respond(translate(Fault::fail(400, "bad"), BuildMode::Production, false));
        assert!(body_json(resp).await.get("stack").is_none());
    }

    #[test]
    fn test_headers_sent_forwards() {
        match translate(Fault::new("late"), BuildMode::Development, true) {
            Translation::Forward(fault) => assert_eq!(fault.message(), "late"),
            Translation::Respond(_) => panic!("must not build a second response"),
        }
    }

    #[test]
    fn test_invalid_status_code_falls_back_to_500() {
        let fault = Fault::new("odd").with_status(42);
        assert_eq!(
            respond(translate(fault, BuildMode::Production, false)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
