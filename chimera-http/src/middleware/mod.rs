//! 中间件
//!
//! 中间件只接收 `(request, next)`：
//! - 调用 `next.run(request)` 继续处理，可以观察或修改返回的响应
//! - 不调用 `next`，直接返回响应（短路）
//!
//! 两种形式的中间件统一为 [`MiddlewareUnit`]：函数与实现了 [`Middleware`] 的对象。

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

mod body_limit;
mod body_parser;
mod convert_empty_strings;
mod cors;
mod request_id;
mod request_logging;
mod trim_strings;

pub use body_limit::BodyLimitMiddleware;
pub use body_parser::BodyParserMiddleware;
pub use convert_empty_strings::ConvertEmptyStringsToNull;
pub use cors::{CorsConfig, CorsMiddleware};
pub use request_id::{RequestId, RequestIdMiddleware};
pub use request_logging::RequestLoggingMiddleware;
pub use trim_strings::TrimStrings;

type Continuation = Box<dyn FnOnce(Request) -> BoxFuture<'static, HttpResult<Response>> + Send>;

/// 管道中剩余部分的延续
///
/// `run` 消耗 `Next`，因此每个中间件最多只能继续一次
pub struct Next {
    inner: Continuation,
}

impl Next {
    pub(crate) fn new<F>(inner: F) -> Self
    where
        F: FnOnce(Request) -> BoxFuture<'static, HttpResult<Response>> + Send + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    pub async fn run(self, request: Request) -> HttpResult<Response> {
        (self.inner)(request).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Next")
    }
}

/// 对象形式的中间件
///
/// 实例在并发请求间共享，内部状态必须是只读的或自行同步
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, request: Request, next: Next) -> HttpResult<Response>;
}

type MiddlewareFn = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, HttpResult<Response>> + Send + Sync>;

/// 中间件单元
#[derive(Clone)]
pub enum MiddlewareUnit {
    Function(MiddlewareFn),
    Object(Arc<dyn Middleware>),
}

impl MiddlewareUnit {
    /// 由异步函数构造
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult<Response>> + Send + 'static,
    {
        MiddlewareUnit::Function(Arc::new(move |request, next| Box::pin(f(request, next))))
    }

    /// 由中间件对象构造
    pub fn new(middleware: impl Middleware + 'static) -> Self {
        MiddlewareUnit::Object(Arc::new(middleware))
    }

    pub fn name(&self) -> &str {
        match self {
            MiddlewareUnit::Function(_) => "function",
            MiddlewareUnit::Object(middleware) => middleware.name(),
        }
    }

    pub(crate) fn call(&self, request: Request, next: Next) -> BoxFuture<'static, HttpResult<Response>> {
        match self {
            MiddlewareUnit::Function(f) => f(request, next),
            MiddlewareUnit::Object(middleware) => {
                let middleware = Arc::clone(middleware);
                Box::pin(async move { middleware.handle(request, next).await })
            }
        }
    }
}

impl std::fmt::Debug for MiddlewareUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MiddlewareUnit").field(&self.name()).finish()
    }
}

/// 单个或一组中间件
pub trait IntoMiddlewares {
    fn into_middlewares(self) -> Vec<MiddlewareUnit>;
}

impl IntoMiddlewares for MiddlewareUnit {
    fn into_middlewares(self) -> Vec<MiddlewareUnit> {
        vec![self]
    }
}

impl IntoMiddlewares for Vec<MiddlewareUnit> {
    fn into_middlewares(self) -> Vec<MiddlewareUnit> {
        self
    }
}

impl<const N: usize> IntoMiddlewares for [MiddlewareUnit; N] {
    fn into_middlewares(self) -> Vec<MiddlewareUnit> {
        self.into_iter().collect()
    }
}
