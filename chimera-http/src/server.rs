//! HTTP 服务器
//!
//! 基于 Axum 的传输层适配：所有请求都经由 fallback 转发给 [`Kernel`]。

use axum::body::Body;
use axum::extract::{ConnectInfo, Request as AxumRequest, State};
use axum::response::{IntoResponse, Response as AxumResponse};
use chimera_core::{ApplicationError, ApplicationResult, ContainerError, Environment};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::constants::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, SERVER_HOST,
    SERVER_MAX_BODY_SIZE, SERVER_PORT,
};
use crate::kernel::Kernel;
use crate::transport::{BufferedSink, RawRequest};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProperties {
    /// 监听地址
    pub host: String,

    /// 监听端口
    pub port: u16,

    /// 请求体大小上限（字节）
    pub max_body_size: usize,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            host: env.get_string_or(SERVER_HOST, DEFAULT_SERVER_HOST),
            port: env
                .get_i64(SERVER_PORT)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            max_body_size: env
                .get_i64(SERVER_MAX_BODY_SIZE)
                .and_then(|s| usize::try_from(s).ok())
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
struct ServerState {
    kernel: Arc<Kernel>,
    max_body_size: usize,
}

/// Chimera HTTP 服务器
pub struct HttpServer {
    config: ServerProperties,
    kernel: Arc<Kernel>,
}

impl HttpServer {
    pub fn new(kernel: Arc<Kernel>, config: ServerProperties) -> Self {
        Self { config, kernel }
    }

    /// 从应用中解析 ServerProperties，未注册时直接读取配置
    pub fn from_kernel(kernel: Arc<Kernel>) -> ApplicationResult<Self> {
        let app = kernel.application();
        let config = match app.resolve(TypeId::of::<ServerProperties>(), type_name::<ServerProperties>()) {
            Ok(instance) => instance
                .downcast::<ServerProperties>()
                .map(|config| config.as_ref().clone())
                .map_err(|_| ContainerError::TypeMismatch {
                    expected: type_name::<ServerProperties>().to_string(),
                })?,
            Err(ContainerError::NotBound(_)) => ServerProperties::from_environment(app.environment()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(kernel, config))
    }

    pub fn config(&self) -> &ServerProperties {
        &self.config
    }

    /// 构建 Axum 路由，所有请求交给内核处理
    pub fn router(&self) -> axum::Router {
        let state = ServerState {
            kernel: Arc::clone(&self.kernel),
            max_body_size: self.config.max_body_size,
        };
        axum::Router::new()
            .fallback(forward)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// 启动服务器
    pub async fn run(self) -> ApplicationResult<()> {
        let addr = self.config.address();
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!("Starting Chimera HTTP server on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApplicationError::Other(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ApplicationError::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}

async fn forward(State(state): State<ServerState>, request: AxumRequest) -> AxumResponse {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_size,
                error = %e,
                "Failed to buffer request body"
            );
            let payload = serde_json::json!({ "message": "Request body too large" });
            return (StatusCode::PAYLOAD_TOO_LARGE, axum::Json(payload)).into_response();
        }
    };

    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let raw = RawRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
        remote_addr,
    };

    let mut sink = BufferedSink::new();
    state.kernel.handle(raw, &mut sink).await;
    sink.into_response().map(Body::from)
}
