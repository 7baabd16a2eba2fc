//! 请求体大小限制
//!
//! 配置在构造后不可变，可以在并发请求间共享。

use async_trait::async_trait;
use http::StatusCode;
use serde_json::json;

use super::{Middleware, Next};
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy)]
pub struct BodyLimitMiddleware {
    max_bytes: usize,
}

impl BodyLimitMiddleware {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

#[async_trait]
impl Middleware for BodyLimitMiddleware {
    fn name(&self) -> &str {
        "body-limit"
    }

    async fn handle(&self, request: Request, next: Next) -> HttpResult<Response> {
        let declared = request
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok());
        let actual = request.body_bytes().len();

        if actual > self.max_bytes || declared.is_some_and(|len| len > self.max_bytes) {
            tracing::debug!(limit = self.max_bytes, size = actual, "Request body too large");
            return Ok(Response::new().status(StatusCode::PAYLOAD_TOO_LARGE).json(json!({
                "message": format!("Request body exceeds {} bytes", self.max_bytes)
            })));
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareUnit;
    use crate::pipeline::Pipeline;
    use crate::transport::RawRequest;
    use http::{HeaderValue, Method, Uri};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        Pipeline::new().pipe(MiddlewareUnit::new(BodyLimitMiddleware::new(8)))
    }

    fn post(body: &'static str) -> Request {
        Request::from_raw(RawRequest::new(Method::POST, Uri::from_static("/upload")).with_body(body))
    }

    #[tokio::test]
    async fn test_rejects_large_body() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let response = pipeline()
            .handle(post("123456789"), move |_| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Response::new())
            })
            .await
            .unwrap();

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.content_json(),
            Some(json!({"message": "Request body exceeds 8 bytes"}))
        );
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_rejection_passes_through_outer_middleware() {
        let outer = MiddlewareUnit::from_fn(|request: Request, next: Next| async move {
            let mut response = next.run(request).await?;
            response.set_header(
                http::header::HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            );
            Ok(response)
        });
        let response = Pipeline::new()
            .pipe(outer)
            .pipe(MiddlewareUnit::new(BodyLimitMiddleware::new(8)))
            .handle(post("123456789"), |_| async { Ok(Response::new()) })
            .await
            .unwrap();

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.header_str("x-request-id"), Some("abc"));
    }

    #[tokio::test]
    async fn test_allows_body_within_limit() {
        let response = pipeline()
            .handle(post("12345678"), |_| async { Ok(Response::new().send("stored")) })
            .await
            .unwrap();
        assert_eq!(response.status_code(), StatusCode::OK);
    }
}
