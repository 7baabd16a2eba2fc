//! 路由与动作

use chimera_core::Application;
use futures_util::future::BoxFuture;
use http::Method;
use std::sync::Arc;

use crate::controller::ControllerAction;
use crate::error::{HttpResult, RouteError};
use crate::handler::{self, BoxedHandler, Handler, HandlerOutput};
use crate::middleware::MiddlewareUnit;
use crate::path::PathPattern;
use crate::request::Request;

/// 路由动作
#[derive(Clone)]
pub enum Action {
    /// 普通处理器
    Handler { handler: BoxedHandler, arity: usize },

    /// 调度时解析的控制器动作
    Controller(ControllerAction),
}

impl Action {
    pub(crate) fn invoke(
        &self,
        app: Option<&Arc<dyn Application>>,
        request: Request,
        params: Vec<String>,
    ) -> BoxFuture<'static, HttpResult<HandlerOutput>> {
        match self {
            Action::Handler { handler, .. } => handler(request, params),
            Action::Controller(action) => action.dispatch(app, request, params),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Handler { arity, .. } => f.debug_struct("Handler").field("arity", arity).finish(),
            Action::Controller(action) => action.fmt(f),
        }
    }
}

/// 可注册为路由动作的类型
///
/// `Marker` 只用于区分普通处理器的不同参数个数
pub trait IntoAction<Marker> {
    fn into_action(self, pattern: &PathPattern) -> Result<Action, RouteError>;
}

impl<H, Args> IntoAction<Args> for H
where
    H: Handler<Args>,
{
    fn into_action(self, pattern: &PathPattern) -> Result<Action, RouteError> {
        let declared = pattern.param_count();
        if H::ARITY > declared {
            return Err(RouteError::TooManyArguments {
                pattern: pattern.to_string(),
                wanted: H::ARITY,
                declared,
            });
        }
        Ok(Action::Handler {
            handler: handler::boxed(self),
            arity: H::ARITY,
        })
    }
}

#[doc(hidden)]
pub struct ControllerMarker;

impl IntoAction<ControllerMarker> for ControllerAction {
    fn into_action(self, _pattern: &PathPattern) -> Result<Action, RouteError> {
        self.validate()?;
        Ok(Action::Controller(self))
    }
}

/// 已注册的路由
///
/// 方法、模式和动作在注册后不可变，只有中间件列表可以在注册阶段追加
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    action: Action,
    middleware: Vec<MiddlewareUnit>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: PathPattern,
        action: Action,
        middleware: Vec<MiddlewareUnit>,
    ) -> Self {
        Self {
            method,
            pattern,
            action,
            middleware,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn middleware(&self) -> &[MiddlewareUnit] {
        &self.middleware
    }

    pub(crate) fn push_middleware(&mut self, units: Vec<MiddlewareUnit>) {
        self.middleware.extend(units);
    }
}
