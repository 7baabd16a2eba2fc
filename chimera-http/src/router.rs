//! 路由器
//!
//! 注册阶段构建路由表，服务阶段只读：
//! - 按注册顺序线性扫描，第一个方法与路径都匹配的路由胜出
//! - 未匹配时返回 404 `{"error": "Route not found"}`
//! - 匹配后写入路由参数，并在路由自己的中间件管道中执行动作

use chimera_core::Application;
use http::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;

use crate::constants::ROUTE_NOT_FOUND;
use crate::error::{HttpResult, RouteError};
use crate::middleware::{IntoMiddlewares, MiddlewareUnit};
use crate::path::{join_paths, PathPattern};
use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::Response;
use crate::route::{IntoAction, Route};

/// 路由组属性
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: String,
    middleware: Vec<MiddlewareUnit>,
}

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn middleware(mut self, middleware: impl IntoMiddlewares) -> Self {
        self.middleware.extend(middleware.into_middlewares());
        self
    }
}

/// 回调结束（包括 panic）时弹出路由组
struct ScopeGuard<'a> {
    router: &'a mut Router,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.router.scopes.pop();
    }
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,

    /// 注册期间的路由组栈，外层在前
    scopes: Vec<GroupAttributes>,

    app: Option<Arc<dyn Application>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 控制器动作通过这里的应用解析实例
    pub fn set_application(&mut self, app: Arc<dyn Application>) -> &mut Self {
        self.app = Some(app);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::GET, path, action)
    }

    pub fn post<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::POST, path, action)
    }

    pub fn put<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::PUT, path, action)
    }

    pub fn patch<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::PATCH, path, action)
    }

    pub fn delete<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::DELETE, path, action)
    }

    pub fn options<A, M>(&mut self, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        self.add_route(Method::OPTIONS, path, action)
    }

    /// 注册路由，注册错误属于编程错误，直接 panic
    pub fn add_route<A, M>(&mut self, method: Method, path: &str, action: A) -> &mut Self
    where
        A: IntoAction<M>,
    {
        if let Err(e) = self.try_add_route(method, path, action) {
            panic!("Failed to register route: {}", e);
        }
        self
    }

    pub fn try_add_route<A, M>(
        &mut self,
        method: Method,
        path: &str,
        action: A,
    ) -> Result<&mut Self, RouteError>
    where
        A: IntoAction<M>,
    {
        let prefix = self
            .scopes
            .iter()
            .fold(String::new(), |acc, scope| join_paths(&acc, &scope.prefix));
        let full_path = join_paths(&prefix, path);

        let pattern = PathPattern::compile(&full_path)?;
        let action = action.into_action(&pattern)?;
        let middleware = self
            .scopes
            .iter()
            .flat_map(|scope| scope.middleware.iter().cloned())
            .collect();

        tracing::debug!(method = %method, path = %full_path, "Route registered");
        self.routes.push(Route::new(method, pattern, action, middleware));
        Ok(self)
    }

    /// 为最近注册的路由追加中间件
    pub fn middleware(&mut self, middleware: impl IntoMiddlewares) -> &mut Self {
        if let Err(e) = self.try_middleware(middleware) {
            panic!("{}", e);
        }
        self
    }

    pub fn try_middleware(
        &mut self,
        middleware: impl IntoMiddlewares,
    ) -> Result<&mut Self, RouteError> {
        let route = self
            .routes
            .last_mut()
            .ok_or(RouteError::NoRouteForMiddleware)?;
        route.push_middleware(middleware.into_middlewares());
        Ok(self)
    }

    /// 在路由组内注册，组的前缀与中间件作用于回调中注册的所有路由
    pub fn group<F>(&mut self, attributes: GroupAttributes, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Router),
    {
        self.scopes.push(attributes);
        {
            let mut guard = ScopeGuard { router: self };
            callback(&mut *guard.router);
        }
        self
    }

    /// 按方法与路径查找路由
    pub fn find(&self, method: &Method, path: &str) -> Option<(&Route, crate::path::RouteParams)> {
        self.routes.iter().find_map(|route| {
            if route.method() != method {
                return None;
            }
            route.pattern().matches(path).map(|params| (route, params))
        })
    }

    /// 调度请求
    pub async fn dispatch(&self, mut request: Request, response: Response) -> HttpResult<Response> {
        let Some((route, params)) = self.find(request.method(), request.path()) else {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                "No route matched"
            );
            return Ok(response
                .status(StatusCode::NOT_FOUND)
                .json(json!({ "error": ROUTE_NOT_FOUND })));
        };

        let values = params.values();
        request.set_route_params(params);

        let action = route.action().clone();
        let app = self.app.clone();
        let pipeline = Pipeline::from_units(route.middleware().to_vec());

        pipeline
            .handle(request, move |request| async move {
                let output = action.invoke(app.as_ref(), request, values).await?;
                Ok(output.into_response(response))
            })
            .await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("has_application", &self.app.is_some())
            .finish()
    }
}
