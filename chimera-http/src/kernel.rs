//! HTTP 内核
//!
//! 内核持有全局中间件管道与路由器，是传输层的唯一入口：
//!
//! 1. 确认应用已经启动
//! 2. 将原始请求转换为 [`Request`] / [`Response`]
//! 3. 执行全局管道，终点为 [`Router::dispatch`]
//! 4. 将最终响应写出一次
//!
//! 任何逃逸到这里的错误（包括 panic）都会转换为 JSON 错误响应，不再向外传播。

use chimera_core::constants::{APP_DEBUG, APP_URL};
use chimera_core::Application;
use futures_util::FutureExt;
use http::Method;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::constants::{DEFAULT_APP_URL, HTTP_TRUST_PROXY};
use crate::error::{HttpError, HttpResult};
use crate::middleware::{BodyParserMiddleware, IntoMiddlewares, MiddlewareUnit};
use crate::pipeline::Pipeline;
use crate::request::{Request, RequestOptions};
use crate::response::Response;
use crate::router::Router;
use crate::transport::{RawRequest, ResponseSink};

pub struct Kernel {
    app: Arc<dyn Application>,

    /// 全局中间件
    middleware: Pipeline,

    router: Router,
}

impl Kernel {
    /// 创建内核，默认安装请求体解析中间件
    pub fn new(app: Arc<dyn Application>) -> Self {
        let mut router = Router::new();
        router.set_application(Arc::clone(&app));

        Self {
            app,
            middleware: Pipeline::new().pipe(MiddlewareUnit::new(BodyParserMiddleware::new())),
            router,
        }
    }

    pub fn application(&self) -> &Arc<dyn Application> {
        &self.app
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn middleware(&self) -> &Pipeline {
        &self.middleware
    }

    /// 添加到全局中间件最外层
    pub fn prepend_middleware(&mut self, middleware: impl IntoMiddlewares) -> &mut Self {
        self.middleware.prepend(middleware);
        self
    }

    /// 添加到全局中间件最内层
    pub fn push_middleware(&mut self, middleware: impl IntoMiddlewares) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// 启动应用（如果尚未启动）
    pub async fn bootstrap(&self) -> HttpResult<()> {
        if !self.app.is_booted() {
            self.app.boot().await?;
        }
        Ok(())
    }

    /// 处理一次调用并写出响应
    pub async fn handle(self: &Arc<Self>, raw: RawRequest, sink: &mut dyn ResponseSink) {
        let method = raw.method.clone();
        let path = raw.uri.path().to_string();

        let outcome = match AssertUnwindSafe(Arc::clone(self).process(raw))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else {
                    "Unknown panic occurred".to_string()
                };
                tracing::error!(method = %method, path = %path, error = %message, "Handler panicked");
                Err(HttpError::Internal(message))
            }
        };

        match outcome {
            Ok(mut response) => response.terminate(sink),
            Err(error) => self.render_error(&error, &method, &path, sink),
        }
    }

    async fn process(self: Arc<Self>, raw: RawRequest) -> HttpResult<Response> {
        self.bootstrap().await?;

        let request = Request::from_raw_with(raw, &self.request_options());
        let response = Response::new();

        let kernel = Arc::clone(&self);
        self.middleware
            .handle(request, move |request| async move {
                kernel.router.dispatch(request, response).await
            })
            .await
    }

    fn request_options(&self) -> RequestOptions {
        let env = self.app.environment();
        RequestOptions {
            trust_proxy: env.get_bool_or(HTTP_TRUST_PROXY, false),
            fallback_url: env.get_string_or(APP_URL, DEFAULT_APP_URL),
        }
    }

    fn render_error(
        &self,
        error: &HttpError,
        method: &Method,
        path: &str,
        sink: &mut dyn ResponseSink,
    ) {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(method = %method, path = %path, status = status.as_u16(), error = %error, "Request failed");
        } else {
            tracing::warn!(method = %method, path = %path, status = status.as_u16(), error = %error, "Request rejected");
        }

        if sink.headers_sent() {
            tracing::warn!(path = %path, "Headers already sent, skipping error response");
            return;
        }

        let mut body = json!({ "message": error.to_string() });
        if self.app.environment().get_bool_or(APP_DEBUG, false) {
            body["error"] = json!(format!("{:?}", error));
        }

        Response::new().status(status).json(body).terminate(sink);
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("middleware", &self.middleware)
            .field("router", &self.router)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::middleware::{Middleware, Next};
    use crate::transport::BufferedSink;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chimera_core::{ApplicationContext, MapPropertySource};
    use http::{StatusCode, Uri};
    use parking_lot::Mutex;
    use serde_json::Value;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, request: Request, next: Next) -> HttpResult<Response> {
            self.log.lock().push(format!("{}:in", self.name));
            let response = next.run(request).await;
            self.log.lock().push(format!("{}:out", self.name));
            response
        }
    }

    fn recorder(name: &'static str, log: &Log) -> MiddlewareUnit {
        MiddlewareUnit::new(Recorder {
            name,
            log: Arc::clone(log),
        })
    }

    fn context_with(properties: &[(&str, bool)]) -> Arc<ApplicationContext> {
        let context = ApplicationContext::new();
        let mut source = MapPropertySource::new("test");
        for (key, value) in properties {
            source = source.with_property(*key, *value);
        }
        context.environment().add_property_source(Box::new(source));
        Arc::new(context)
    }

    fn get(uri: &'static str) -> RawRequest {
        RawRequest::new(Method::GET, Uri::from_static(uri))
    }

    async fn send(kernel: &Arc<Kernel>, raw: RawRequest) -> BufferedSink {
        let mut sink = BufferedSink::new();
        kernel.handle(raw, &mut sink).await;
        assert!(sink.is_ended());
        sink
    }

    fn json_body(sink: &BufferedSink) -> Value {
        serde_json::from_slice(sink.body()).unwrap()
    }

    #[tokio::test]
    async fn test_json_handler_end_to_end() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel
            .router_mut()
            .get("/", |_req: Request| async { json!({"message": "ok"}) });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/")).await;
        assert_eq!(sink.status(), StatusCode::OK);
        assert_eq!(sink.body(), &Bytes::from(r#"{"message":"ok"}"#));
        assert_eq!(
            sink.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_route_param_stays_string() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel
            .router_mut()
            .get("/users/:id", |_req: Request, id: String| async move { json!({ "id": id }) });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/users/42")).await;
        assert_eq!(json_body(&sink), json!({"id": "42"}));
    }

    #[tokio::test]
    async fn test_missing_route() {
        let kernel = Arc::new(Kernel::new(context_with(&[])));
        let sink = send(&kernel, get("/nowhere")).await;

        assert_eq!(sink.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(&sink), json!({"error": "Route not found"}));
    }

    #[tokio::test]
    async fn test_global_and_route_middleware_order() {
        let log: Log = Arc::default();
        let mut kernel = Kernel::new(context_with(&[]));
        kernel
            .push_middleware(recorder("A", &log))
            .push_middleware(recorder("B", &log));

        let handler_log = Arc::clone(&log);
        kernel
            .router_mut()
            .get("/ordered", move |_req: Request| {
                let log = Arc::clone(&handler_log);
                async move {
                    log.lock().push("H".to_string());
                    "done"
                }
            })
            .middleware(recorder("C", &log));
        let kernel = Arc::new(kernel);

        send(&kernel, get("/ordered")).await;
        assert_eq!(
            *log.lock(),
            vec!["A:in", "B:in", "C:in", "H", "C:out", "B:out", "A:out"]
        );
    }

    #[tokio::test]
    async fn test_prepended_middleware_runs_before_body_parser() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel.prepend_middleware(MiddlewareUnit::from_fn(|request: Request, next: Next| async move {
            // 此时请求体尚未解析
            let parsed = request.parsed_body().is_some();
            let mut response = next.run(request).await?;
            response.set_header(
                http::header::HeaderName::from_static("x-parsed-before"),
                http::HeaderValue::from_static(if parsed { "yes" } else { "no" }),
            );
            Ok(response)
        }));
        kernel.router_mut().post("/login", |req: Request| async move {
            json!({ "email": req.input("email") })
        });
        let kernel = Arc::new(kernel);

        let raw = RawRequest::new(Method::POST, Uri::from_static("/login"))
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"email":"ada@example.com"}"#);
        let sink = send(&kernel, raw).await;

        assert_eq!(json_body(&sink), json!({"email": "ada@example.com"}));
        assert_eq!(sink.headers().get("x-parsed-before").unwrap(), "no");
    }

    #[tokio::test]
    async fn test_http_error_uses_declared_status() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel.router_mut().get("/admin", |_req: Request| async {
            Err::<Value, _>(HttpError::forbidden("Admins only"))
        });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/admin")).await;
        assert_eq!(sink.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(&sink), json!({"message": "Admins only"}));
    }

    #[tokio::test]
    async fn test_untyped_error_is_500_with_debug_detail() {
        let mut kernel = Kernel::new(context_with(&[(APP_DEBUG, true)]));
        kernel.router_mut().get("/fail", |_req: Request| async {
            Err::<Value, _>(anyhow::anyhow!("database unavailable"))
        });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/fail")).await;
        let body = json_body(&sink);
        assert_eq!(sink.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "database unavailable");
        assert!(body["error"].as_str().unwrap().contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_panic_is_caught_at_boundary() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel.router_mut().get("/panic", |_req: Request| async {
            if true {
                panic!("handler exploded");
            }
            "unreachable"
        });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/panic")).await;
        let body = json_body(&sink);
        assert_eq!(sink.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_panic_detail_only_in_debug_mode() {
        let mut kernel = Kernel::new(context_with(&[(APP_DEBUG, true)]));
        kernel.router_mut().get("/panic", |_req: Request| async {
            if true {
                panic!("handler exploded");
            }
            "unreachable"
        });
        let kernel = Arc::new(kernel);

        let sink = send(&kernel, get("/panic")).await;
        let body = json_body(&sink);
        assert_eq!(body["message"], "Internal server error");
        assert!(body["error"].as_str().unwrap().contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_error_not_written_after_headers_sent() {
        let mut kernel = Kernel::new(context_with(&[]));
        kernel.router_mut().get("/late", |_req: Request| async {
            Err::<Value, _>(HttpError::bad_request("late failure"))
        });
        let kernel = Arc::new(kernel);

        let mut sink = BufferedSink::new();
        sink.end(Bytes::from_static(b"streamed"));
        kernel.handle(get("/late"), &mut sink).await;

        assert_eq!(sink.status(), StatusCode::OK);
        assert_eq!(sink.body(), &Bytes::from_static(b"streamed"));
    }

    #[tokio::test]
    async fn test_handle_boots_application() {
        let context = context_with(&[]);
        let kernel = Arc::new(Kernel::new(context.clone()));
        assert!(!context.is_booted());

        send(&kernel, get("/")).await;
        assert!(context.is_booted());
    }

    #[tokio::test]
    async fn test_base_url_follows_configuration() {
        let mut kernel = Kernel::new(context_with(&[(HTTP_TRUST_PROXY, true)]));
        kernel.router_mut().get("/where", |req: Request| async move {
            req.base_url().to_string()
        });
        let kernel = Arc::new(kernel);

        let raw = get("/where")
            .with_header("Host", "10.0.0.5")
            .with_header("X-Forwarded-Proto", "https")
            .with_header("X-Forwarded-Host", "api.example.com");
        let sink = send(&kernel, raw).await;
        assert_eq!(sink.body(), &Bytes::from_static(b"https://api.example.com"));
    }
}
