//! 插件机制
//!
//! 插件在应用启动时执行，用于注册绑定、读取配置等

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::ApplicationContext;

/// 应用插件
#[async_trait]
pub trait ApplicationPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// 数字越小越先执行
    fn priority(&self) -> i32 {
        100
    }

    /// 配置阶段，所有插件的 configure 都先于任何 on_boot 执行
    fn configure(&self, _context: &ApplicationContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// 启动阶段
    async fn on_boot(&self, _context: &ApplicationContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 插件注册表
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn ApplicationPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn ApplicationPlugin>) {
        tracing::debug!(plugin = plugin.name(), "Registering plugin");
        self.plugins.push(plugin);
    }

    /// 按优先级排序后的快照，同优先级保持注册顺序
    pub fn sorted(&self) -> Vec<Arc<dyn ApplicationPlugin>> {
        let mut plugins = self.plugins.clone();
        plugins.sort_by_key(|p| p.priority());
        plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
