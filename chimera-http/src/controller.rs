//! 控制器
//!
//! 控制器动作以 `(类型, 方法名)` 的形式注册，调度时才通过应用解析器取得实例：
//!
//! ```ignore
//! router.get("/users/:id", controller::<UserController>("show"));
//! ```

use async_trait::async_trait;
use chimera_core::{Application, ContainerError, Instance};
use futures_util::future::BoxFuture;
use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::error::{HttpError, HttpResult, RouteError};
use crate::handler::HandlerOutput;
use crate::request::Request;

/// 控制器
///
/// 实现者声明自己支持的动作名，并按动作名分发
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    /// 支持的动作名，注册时用于校验
    fn actions() -> &'static [&'static str]
    where
        Self: Sized;

    /// 执行动作，`params` 为按声明顺序排列的路由参数值
    async fn call(
        &self,
        action: &str,
        request: Request,
        params: Vec<String>,
    ) -> HttpResult<HandlerOutput>;
}

type Invoker =
    fn(Instance, Arc<str>, Request, Vec<String>) -> BoxFuture<'static, HttpResult<HandlerOutput>>;

/// 对控制器动作的引用
#[derive(Clone)]
pub struct ControllerAction {
    type_id: TypeId,
    type_name: &'static str,
    action: Arc<str>,
    actions: &'static [&'static str],
    invoke: Invoker,
}

impl std::fmt::Debug for ControllerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerAction")
            .field("controller", &self.type_name)
            .field("action", &self.action)
            .finish()
    }
}

/// 引用控制器 `C` 的 `action` 动作
pub fn controller<C: Controller>(action: &str) -> ControllerAction {
    ControllerAction {
        type_id: TypeId::of::<C>(),
        type_name: type_name::<C>(),
        action: Arc::from(action),
        actions: C::actions(),
        invoke: invoke::<C>,
    }
}

fn invoke<C: Controller>(
    instance: Instance,
    action: Arc<str>,
    request: Request,
    params: Vec<String>,
) -> BoxFuture<'static, HttpResult<HandlerOutput>> {
    Box::pin(async move {
        let controller = instance
            .downcast::<C>()
            .map_err(|_| HttpError::Resolve {
                type_name: type_name::<C>().to_string(),
                source: ContainerError::TypeMismatch {
                    expected: type_name::<C>().to_string(),
                },
            })?;
        controller.call(&action, request, params).await
    })
}

impl ControllerAction {
    pub fn controller_name(&self) -> &'static str {
        self.type_name
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// 注册时校验动作名
    pub(crate) fn validate(&self) -> Result<(), RouteError> {
        if self.actions.contains(&self.action.as_ref()) {
            Ok(())
        } else {
            Err(RouteError::UnknownAction {
                controller: self.type_name,
                action: self.action.to_string(),
            })
        }
    }

    /// 解析实例并执行动作
    pub(crate) fn dispatch(
        &self,
        app: Option<&Arc<dyn Application>>,
        request: Request,
        params: Vec<String>,
    ) -> BoxFuture<'static, HttpResult<HandlerOutput>> {
        let resolved = match app {
            Some(app) => app.resolve(self.type_id, self.type_name),
            None => Err(ContainerError::NotBound(self.type_name.to_string())),
        };
        let instance = match resolved {
            Ok(instance) => instance,
            Err(source) => {
                let err = HttpError::Resolve {
                    type_name: self.type_name.to_string(),
                    source,
                };
                return Box::pin(async move { Err(err) });
            }
        };
        (self.invoke)(instance, Arc::clone(&self.action), request, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawRequest;
    use chimera_core::ApplicationContext;
    use http::{Method, StatusCode, Uri};
    use serde_json::json;

    struct UserController {
        prefix: &'static str,
    }

    #[async_trait]
    impl Controller for UserController {
        fn actions() -> &'static [&'static str] {
            &["show"]
        }

        async fn call(
            &self,
            action: &str,
            _request: Request,
            params: Vec<String>,
        ) -> HttpResult<HandlerOutput> {
            match action {
                "show" => Ok(json!({ "id": format!("{}{}", self.prefix, params[0]) }).into()),
                _ => Err(HttpError::not_found(action.to_string())),
            }
        }
    }

    fn request() -> Request {
        Request::from_raw(RawRequest::new(Method::GET, Uri::from_static("/users/7")))
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(controller::<UserController>("show").validate().is_ok());
        assert_eq!(
            controller::<UserController>("destroy").validate(),
            Err(RouteError::UnknownAction {
                controller: type_name::<UserController>(),
                action: "destroy".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_resolves_through_application() {
        let context = ApplicationContext::new();
        context.register_instance(UserController { prefix: "u-" });
        let app: Arc<dyn Application> = Arc::new(context);

        let output = controller::<UserController>("show")
            .dispatch(Some(&app), request(), vec!["7".to_string()])
            .await
            .unwrap();
        match output {
            HandlerOutput::Data(value) => assert_eq!(value, json!({"id": "u-7"})),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolver_failure_is_server_error() {
        let app: Arc<dyn Application> = Arc::new(ApplicationContext::new());

        let err = controller::<UserController>("show")
            .dispatch(Some(&app), request(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Resolve { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
