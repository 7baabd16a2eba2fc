//! Chimera HTTP 插件
//!
//! 启动时注册 HTTP 层需要的配置对象

use async_trait::async_trait;
use chimera_core::{ApplicationContext, ApplicationPlugin};

use crate::server::ServerProperties;

/// HTTP 插件
#[derive(Debug, Default)]
pub struct HttpPlugin;

#[async_trait]
impl ApplicationPlugin for HttpPlugin {
    fn name(&self) -> &str {
        "chimera-http"
    }

    fn priority(&self) -> i32 {
        90 // 在其他插件之后配置
    }

    /// 注册 ServerProperties
    fn configure(&self, context: &ApplicationContext) -> anyhow::Result<()> {
        context.register_singleton(|ctx| Ok(ServerProperties::from_environment(ctx.environment())));
        tracing::debug!("ServerProperties configured");
        Ok(())
    }

    async fn on_boot(&self, context: &ApplicationContext) -> anyhow::Result<()> {
        let config = context.make::<ServerProperties>()?;
        tracing::info!(address = %config.address(), "HTTP layer ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;
    use crate::server::HttpServer;
    use chimera_core::MapPropertySource;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_registers_server_properties() {
        let context = ApplicationContext::new();
        context.environment().add_property_source(Box::new(
            MapPropertySource::new("test").with_property("server.port", 3000i64),
        ));
        context.register_plugin(Arc::new(HttpPlugin));
        context.boot().await.unwrap();

        assert_eq!(context.make::<ServerProperties>().unwrap().port, 3000);

        let kernel = Arc::new(Kernel::new(Arc::new(context)));
        let server = HttpServer::from_kernel(kernel).unwrap();
        assert_eq!(server.config().port, 3000);
    }
}
