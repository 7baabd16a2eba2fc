//! CORS 中间件
//!
//! 预检请求（OPTIONS）直接返回 204，其余请求在响应返回时附加 CORS 头。

use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderValue, Method, StatusCode};

use super::{Middleware, Next};
use crate::error::{HttpError, HttpResult};
use crate::request::Request;
use crate::response::Response;

const DEFAULT_ALLOW_ORIGIN: &str = "*";
const DEFAULT_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
const DEFAULT_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

/// CORS 配置
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: DEFAULT_ALLOW_ORIGIN.to_string(),
            allow_methods: DEFAULT_ALLOW_METHODS.to_string(),
            allow_headers: DEFAULT_ALLOW_HEADERS.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    origin: HeaderValue,
    methods: HeaderValue,
    headers: HeaderValue,
}

impl CorsMiddleware {
    pub fn new() -> Self {
        Self {
            origin: HeaderValue::from_static(DEFAULT_ALLOW_ORIGIN),
            methods: HeaderValue::from_static(DEFAULT_ALLOW_METHODS),
            headers: HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
        }
    }

    /// 按配置构造，配置值必须是合法的响应头
    pub fn with_config(config: &CorsConfig) -> HttpResult<Self> {
        let value = |v: &str| {
            HeaderValue::from_str(v).map_err(|e| {
                HttpError::Other(anyhow::anyhow!("Invalid CORS header value '{}': {}", v, e))
            })
        };
        Ok(Self {
            origin: value(&config.allow_origin)?,
            methods: value(&config.allow_methods)?,
            headers: value(&config.allow_headers)?,
        })
    }

    fn decorate(&self, response: &mut Response) {
        response.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone());
        response.set_header(ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone());
        response.set_header(ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "cors"
    }

    async fn handle(&self, request: Request, next: Next) -> HttpResult<Response> {
        if request.method() == Method::OPTIONS {
            let mut response = Response::new().status(StatusCode::NO_CONTENT);
            self.decorate(&mut response);
            response.set_content("");
            return Ok(response);
        }

        let mut response = next.run(request).await?;
        self.decorate(&mut response);
        Ok(response)
    }
}
