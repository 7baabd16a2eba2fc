//! 中间件管道
//!
//! 中间件列表从右向左折叠到终点外层：最后加入的中间件直接包裹终点，
//! 最先加入的中间件在最外层，最先执行，也最后看到响应。

use futures_util::FutureExt;
use std::future::Future;

use crate::error::HttpResult;
use crate::middleware::{IntoMiddlewares, MiddlewareUnit, Next};
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    units: Vec<MiddlewareUnit>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: Vec<MiddlewareUnit>) -> Self {
        Self { units }
    }

    /// 追加一个或一组中间件
    pub fn pipe(mut self, middleware: impl IntoMiddlewares) -> Self {
        self.push(middleware);
        self
    }

    pub fn push(&mut self, middleware: impl IntoMiddlewares) {
        self.units.extend(middleware.into_middlewares());
    }

    /// 插入到最外层
    pub fn prepend(&mut self, middleware: impl IntoMiddlewares) {
        let mut units = middleware.into_middlewares();
        units.append(&mut self.units);
        self.units = units;
    }

    pub fn units(&self) -> &[MiddlewareUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 依次执行中间件，最后执行终点
    ///
    /// 错误不在这里捕获，由调用方处理
    pub async fn handle<F, Fut>(&self, request: Request, terminal: F) -> HttpResult<Response>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = HttpResult<Response>> + Send + 'static,
    {
        let terminal = Next::new(move |request| terminal(request).boxed());
        compose(&self.units, terminal).run(request).await
    }
}

/// 每次请求构建一条延续链
fn compose(units: &[MiddlewareUnit], terminal: Next) -> Next {
    units.iter().rev().fold(terminal, |next, unit| {
        let unit = unit.clone();
        Next::new(move |request| unit.call(request, next))
    })
}
