//! 应用级配置键

// ==================== App 配置 ====================

/// 应用名称
pub const APP_NAME: &str = "app.name";

/// 应用基础 URL，请求缺少 Host 头时使用
pub const APP_URL: &str = "app.url";

/// 调试模式，开启后错误响应会携带诊断信息
pub const APP_DEBUG: &str = "app.debug";

// ==================== Logging 配置 ====================

pub const LOGGING_LEVEL: &str = "logging.level";

pub const LOGGING_FORMAT: &str = "logging.format";

pub const LOGGING_FILTER: &str = "logging.filter";
