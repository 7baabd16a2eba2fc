//! # Chimera HTTP
//!
//! 请求调度核心：路由匹配、中间件管道与 HTTP 内核
//!
//! ## 组成
//!
//! - **路径匹配** - 路由模式编译与参数提取
//! - **路由表** - 链式注册、路由组前缀与中间件继承
//! - **中间件管道** - `(request, next)` 延续链，支持短路
//! - **路由器** - 先注册先匹配，执行路由级中间件与处理器
//! - **内核** - 全局中间件、启动检查与最外层错误边界
//!
//! ```ignore
//! let mut kernel = Kernel::new(app);
//! kernel.router_mut()
//!     .get("/", |_req: Request| async { json!({"message": "ok"}) })
//!     .get("/users/:id", |_req: Request, id: String| async move { json!({ "id": id }) });
//! ```

pub mod constants;
pub mod controller;
pub mod error;
pub mod handler;
pub mod kernel;
pub mod middleware;
pub mod path;
pub mod pipeline;
pub mod plugin;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod transport;

pub use controller::{controller, Controller, ControllerAction};
pub use error::{HttpError, HttpResult, RouteError};
pub use handler::{FromParam, Handler, HandlerOutput, IntoHandlerResult};
pub use kernel::Kernel;
pub use middleware::{IntoMiddlewares, Middleware, MiddlewareUnit, Next};
pub use path::{join_paths, PathPattern, RouteParams};
pub use pipeline::Pipeline;
pub use plugin::HttpPlugin;
pub use request::{Request, RequestOptions};
pub use response::{Json, Response};
pub use route::{Action, IntoAction, Route};
pub use router::{GroupAttributes, Router};
pub use server::{HttpServer, ServerProperties};
pub use transport::{BufferedSink, RawRequest, ResponseSink};

pub mod prelude {
    //! 预导入模块

    pub use crate::controller::{controller, Controller};
    pub use crate::error::{HttpError, HttpResult};
    pub use crate::handler::HandlerOutput;
    pub use crate::kernel::Kernel;
    pub use crate::middleware::*;
    pub use crate::plugin::HttpPlugin;
    pub use crate::request::Request;
    pub use crate::response::{Json, Response};
    pub use crate::router::{GroupAttributes, Router};
    pub use crate::server::{HttpServer, ServerProperties};

    pub use async_trait::async_trait;
    pub use http::{header, HeaderValue, Method, StatusCode};
    pub use serde_json::json;
}
