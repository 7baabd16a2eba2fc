// chimera-core: 应用上下文与配置
//
// 为 HTTP 内核提供外部协作者：
// - 按类型解析控制器实例（单例 / 原型）
// - 分层配置（TOML 文件、环境变量、内存）
// - 日志初始化
// - 启动生命周期与插件

pub mod app;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod logging;
pub mod plugin;

pub use app::ChimeraApplication;
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use context::{Application, ApplicationContext, Instance, Scope};
pub use error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use plugin::{ApplicationPlugin, PluginRegistry};

// 导出 async_trait，插件实现需要
pub use async_trait;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::ChimeraApplication;
    pub use crate::config::{ConfigValue, Environment, MapPropertySource, PropertySource};
    pub use crate::context::{Application, ApplicationContext, Scope};
    pub use crate::error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::plugin::ApplicationPlugin;
    pub use anyhow::{anyhow, Context};
}
