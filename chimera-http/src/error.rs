//! HTTP 层错误类型
//!
//! - [`HttpError`]：请求处理期间的失败，最终由 Kernel 转换为错误响应
//! - [`RouteError`]：路由注册期间的编程错误，在开始服务之前暴露

use chimera_core::{ApplicationError, ContainerError};
use http::StatusCode;
use thiserror::Error;

pub type HttpResult<T> = Result<T, HttpError>;

/// 请求处理错误
#[derive(Error, Debug)]
pub enum HttpError {
    /// 携带明确状态码的 HTTP 异常，应用代码首选的失败方式
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 无法解析控制器实例
    #[error("Failed to resolve controller '{type_name}': {source}")]
    Resolve {
        type_name: String,
        #[source]
        source: ContainerError,
    },

    #[error("Failed to serialize response body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 应用启动失败
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// 处理器或中间件发生 panic，详情只出现在调试输出中
    #[error("Internal server error")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HttpError::Status {
            status,
            message: message.into(),
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// 附加底层错误
    pub fn with_source(self, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        match self {
            HttpError::Status {
                status, message, ..
            } => HttpError::Status {
                status,
                message,
                source: Some(Box::new(error)),
            },
            other => other,
        }
    }

    /// 声明的状态码，未声明时为 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 路由注册错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Route pattern '{pattern}' contains a parameter without a name")]
    EmptyParameterName { pattern: String },

    #[error("Route pattern '{pattern}' declares parameter ':{name}' more than once")]
    DuplicateParameter { pattern: String, name: String },

    #[error("Handler for '{pattern}' takes {wanted} positional parameters but the pattern declares {declared}")]
    TooManyArguments {
        pattern: String,
        wanted: usize,
        declared: usize,
    },

    #[error("Controller '{controller}' has no action named '{action}'")]
    UnknownAction {
        controller: &'static str,
        action: String,
    },

    #[error("middleware() was called before any route was registered")]
    NoRouteForMiddleware,
}
