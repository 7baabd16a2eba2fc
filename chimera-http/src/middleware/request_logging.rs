//! 请求日志中间件

use async_trait::async_trait;
use std::time::Instant;

use super::{Middleware, Next};
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingMiddleware;

#[async_trait]
impl Middleware for RequestLoggingMiddleware {
    fn name(&self) -> &str {
        "request-logging"
    }

    async fn handle(&self, request: Request, next: Next) -> HttpResult<Response> {
        let method = request.method().clone();
        let path = request.path().to_string();
        let start = Instant::now();

        let result = next.run(request).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(response) => tracing::info!(
                method = %method,
                path = %path,
                status = response.status_code().as_u16(),
                elapsed = ?elapsed,
                "Request completed"
            ),
            Err(error) => tracing::info!(
                method = %method,
                path = %path,
                status = error.status_code().as_u16(),
                elapsed = ?elapsed,
                "Request failed"
            ),
        }

        result
    }
}
