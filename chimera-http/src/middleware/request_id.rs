//! 请求 ID 中间件
//!
//! 请求没有 `X-Request-ID` 时生成一个 UUID，并在响应中回写。

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};

use super::{Middleware, Next};
use crate::constants::REQUEST_ID_HEADER;
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

/// 请求范围内可读取的请求 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

#[async_trait]
impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &str {
        "request-id"
    }

    async fn handle(&self, mut request: Request, next: Next) -> HttpResult<Response> {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);

        let value = match request.headers().get(&header) {
            Some(existing) => existing.clone(),
            None => {
                let generated = HeaderValue::try_from(uuid::Uuid::new_v4().to_string())
                    .map_err(anyhow::Error::from)?;
                request.headers_mut().insert(header.clone(), generated.clone());
                generated
            }
        };
        if let Ok(id) = value.to_str() {
            request.extensions_mut().insert(RequestId(id.to_string()));
        }

        let mut response = next.run(request).await?;
        response.set_header(header, value);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareUnit;
    use crate::pipeline::Pipeline;
    use crate::transport::RawRequest;
    use http::{Method, Uri};

    async fn run(raw: RawRequest) -> (Response, Option<RequestId>) {
        let response = Pipeline::new()
            .pipe(MiddlewareUnit::new(RequestIdMiddleware))
            .handle(Request::from_raw(raw), |request| async move {
                let id = request.extensions().get::<RequestId>().cloned();
                Ok(Response::new().send(id.map(|id| id.0).unwrap_or_default()))
            })
            .await
            .unwrap();
        let seen = response
            .content()
            .map(|b| RequestId(String::from_utf8_lossy(b).into_owned()));
        (response, seen)
    }

    #[tokio::test]
    async fn test_generates_and_echoes_id() {
        let (response, seen) = run(RawRequest::new(Method::GET, Uri::from_static("/"))).await;

        let echoed = response.header_str("x-request-id").unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&echoed).is_ok());
        assert_eq!(seen, Some(RequestId(echoed)));
    }

    #[tokio::test]
    async fn test_keeps_incoming_id() {
        let raw = RawRequest::new(Method::GET, Uri::from_static("/"))
            .with_header("X-Request-ID", "req-123");
        let (response, seen) = run(raw).await;

        assert_eq!(response.header_str("x-request-id"), Some("req-123"));
        assert_eq!(seen, Some(RequestId("req-123".to_string())));
    }
}
