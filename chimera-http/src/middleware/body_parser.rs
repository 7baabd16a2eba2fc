//! 请求体解析中间件
//!
//! 只处理 POST / PUT / PATCH / DELETE 且带有 Content-Type 的请求：
//! - `application/json`：空请求体视为 `{}`
//! - `application/x-www-form-urlencoded`：解析为字符串字段对象
//! - 其他类型：`{}`
//!
//! 解析失败时不设置 `parsed_body`，请求继续向下传递。

use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value};

use super::{Middleware, Next};
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParserMiddleware;

impl BodyParserMiddleware {
    pub fn new() -> Self {
        Self
    }

    fn accepts(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    fn parse(content_type: &str, body: &[u8]) -> Result<Value, String> {
        if content_type.contains("application/json") {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Object(Map::new()));
            }
            serde_json::from_slice(body).map_err(|e| e.to_string())
        } else if content_type.contains("application/x-www-form-urlencoded") {
            let pairs: Vec<(String, String)> =
                serde_urlencoded::from_bytes(body).map_err(|e| e.to_string())?;
            // 同名字段以最后一个为准
            let fields = pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            Ok(Value::Object(fields))
        } else {
            Ok(Value::Object(Map::new()))
        }
    }
}

#[async_trait]
impl Middleware for BodyParserMiddleware {
    fn name(&self) -> &str {
        "body-parser"
    }

    async fn handle(&self, mut request: Request, next: Next) -> HttpResult<Response> {
        if Self::accepts(request.method()) {
            if let Some(content_type) = request.content_type().map(str::to_ascii_lowercase) {
                match Self::parse(&content_type, request.body_bytes()) {
                    Ok(body) => request.set_parsed_body(body),
                    Err(error) => tracing::debug!(
                        content_type = %content_type,
                        error = %error,
                        "Failed to parse request body, continuing without it"
                    ),
                }
            }
        }
        next.run(request).await
    }
}
