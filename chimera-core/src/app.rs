use std::path::Path;
use std::sync::Arc;

use crate::config::{EnvironmentPropertySource, TomlPropertySource};
use crate::context::ApplicationContext;
use crate::error::ApplicationResult;
use crate::logging::LoggingConfig;
use crate::plugin::ApplicationPlugin;

/// Chimera 应用程序
///
/// 负责加载配置、初始化日志、注册插件并启动应用上下文
pub struct ChimeraApplication {
    name: String,

    config_files: Vec<String>,

    env_prefix: String,

    /// None 表示不初始化日志（例如测试中由调用方自行处理）
    logging: Option<LoggingConfig>,

    plugins: Vec<Arc<dyn ApplicationPlugin>>,

    initializers: Vec<Box<dyn FnOnce(&ApplicationContext) -> ApplicationResult<()> + Send>>,
}

impl ChimeraApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec!["application.toml".to_string()],
            env_prefix: "APP_".to_string(),
            logging: None,
            plugins: Vec::new(),
            initializers: Vec::new(),
        }
    }

    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn plugin(mut self, plugin: impl ApplicationPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// 在启动之前执行，可用于注册控制器等绑定
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&ApplicationContext) -> ApplicationResult<()> + Send + 'static,
    {
        self.initializers.push(Box::new(f));
        self
    }

    /// 构建上下文但不启动
    pub fn build(self) -> ApplicationResult<Arc<ApplicationContext>> {
        let context = ApplicationContext::new();

        // 文件配置优先级依次递增，后面的文件覆盖前面的
        for (index, file) in self.config_files.iter().enumerate() {
            if !Path::new(file).exists() {
                tracing::debug!("Configuration file not found: {}", file);
                continue;
            }
            match TomlPropertySource::from_file(file) {
                Ok(source) => {
                    tracing::info!("Loaded configuration from: {}", file);
                    context
                        .environment()
                        .add_property_source(Box::new(source.with_priority(index as i32)));
                }
                Err(e) => tracing::warn!("Failed to load {}: {}", file, e),
            }
        }
        context
            .environment()
            .add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));

        if let Some(logging) = self.logging {
            logging.init()?;
        }

        for plugin in self.plugins {
            context.register_plugin(plugin);
        }
        for initializer in self.initializers {
            initializer(&context)?;
        }

        tracing::info!("Application '{}' created", self.name);
        Ok(Arc::new(context))
    }

    /// 构建并启动
    pub async fn run(self) -> ApplicationResult<Arc<ApplicationContext>> {
        let start = std::time::Instant::now();
        let name = self.name.clone();
        let context = self.build()?;
        context.boot().await?;
        tracing::info!("Started {} in {}ms", name, start.elapsed().as_millis());
        Ok(context)
    }
}

impl Default for ChimeraApplication {
    fn default() -> Self {
        Self::new("ChimeraApplication")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting(&'static str);

    #[tokio::test]
    async fn test_run_boots_context_and_applies_initializers() {
        let context = ChimeraApplication::new("test")
            .config_file("does-not-exist.toml")
            .initializer(|ctx| {
                ctx.register_instance(Greeting("hello"));
                Ok(())
            })
            .run()
            .await
            .unwrap();

        assert!(context.is_booted());
        assert_eq!(context.make::<Greeting>().unwrap().0, "hello");
    }
}
