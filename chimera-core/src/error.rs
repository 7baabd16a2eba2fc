//! 统一的错误类型
//!
//! 容器解析错误与应用生命周期错误分开定义，
//! 应用注册的工厂函数返回 `anyhow::Result`，以便在工厂内部自由使用 `?`。

use thiserror::Error;

/// 容器解析错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 请求的类型没有任何绑定
    #[error("No binding registered for type '{0}'")]
    NotBound(String),

    /// 绑定产生的实例与请求的类型不一致
    #[error("Binding for '{expected}' produced an instance of a different type")]
    TypeMismatch { expected: String },

    /// 工厂函数创建实例失败
    #[error("Failed to create instance of '{type_name}': {source}")]
    CreationFailed {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type ContainerResult<T> = Result<T, ContainerError>;

/// 应用生命周期错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 插件在 configure / on_boot 阶段失败
    #[error("Plugin '{name}' failed: {source}")]
    Plugin {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{0}")]
    Other(String),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
