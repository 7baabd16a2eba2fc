//! 应用上下文
//!
//! HTTP 内核只通过 [`Application`] trait 访问应用：解析控制器实例、读取配置、
//! 在处理请求前确认应用已经启动。[`ApplicationContext`] 是它的默认实现。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Environment;
use crate::error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult};
use crate::plugin::{ApplicationPlugin, PluginRegistry};

/// 容器中保存的实例
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&ApplicationContext) -> anyhow::Result<Instance> + Send + Sync>;

/// 实例的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// 首次解析时创建，之后复用
    #[default]
    Singleton,

    /// 每次解析都创建新实例
    Prototype,
}

/// 应用解析器与生命周期接口
#[async_trait]
pub trait Application: Send + Sync {
    /// 配置环境
    fn environment(&self) -> &Arc<Environment>;

    /// 按类型解析实例
    fn resolve(&self, type_id: TypeId, type_name: &str) -> ContainerResult<Instance>;

    fn is_booted(&self) -> bool;

    /// 启动应用，重复调用是安全的
    async fn boot(&self) -> ApplicationResult<()>;
}

struct Binding {
    type_name: &'static str,
    scope: Scope,
    factory: Factory,
}

/// 默认的应用上下文
pub struct ApplicationContext {
    bindings: RwLock<HashMap<TypeId, Binding>>,

    /// 已创建的单例
    singletons: RwLock<HashMap<TypeId, Instance>>,

    environment: Arc<Environment>,

    plugins: RwLock<PluginRegistry>,

    booted: AtomicBool,

    /// 保证并发的首次请求只触发一次启动
    boot_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("bindings", &self.bindings.read().len())
            .field("booted", &self.is_booted())
            .finish()
    }
}

impl ApplicationContext {
    pub fn new() -> Self {
        Self::with_environment(Arc::new(Environment::new()))
    }

    pub fn with_environment(environment: Arc<Environment>) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            singletons: RwLock::new(HashMap::new()),
            environment,
            plugins: RwLock::new(PluginRegistry::new()),
            booted: AtomicBool::new(false),
            boot_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 注册已经构造好的实例
    pub fn register_instance<T>(&self, instance: T)
    where
        T: Any + Send + Sync,
    {
        let instance: Instance = Arc::new(instance);
        let cached = Arc::clone(&instance);
        self.bind::<T>(
            Scope::Singleton,
            Arc::new(move |_| Ok(Arc::clone(&instance))),
        );
        self.singletons.write().insert(TypeId::of::<T>(), cached);
    }

    /// 注册延迟创建的单例
    pub fn register_singleton<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ApplicationContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.bind::<T>(
            Scope::Singleton,
            Arc::new(move |ctx| factory(ctx).map(|v| Arc::new(v) as Instance)),
        );
    }

    /// 注册原型，每次解析都调用工厂
    pub fn register_prototype<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ApplicationContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.bind::<T>(
            Scope::Prototype,
            Arc::new(move |ctx| factory(ctx).map(|v| Arc::new(v) as Instance)),
        );
    }

    fn bind<T: Any>(&self, scope: Scope, factory: Factory) {
        let type_id = TypeId::of::<T>();
        let binding = Binding {
            type_name: type_name::<T>(),
            scope,
            factory,
        };
        if self.bindings.write().insert(type_id, binding).is_some() {
            // 重新绑定时丢弃旧的单例
            self.singletons.write().remove(&type_id);
            tracing::debug!(type_name = type_name::<T>(), "Binding replaced");
        }
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.bindings.read().contains_key(&TypeId::of::<T>())
    }

    /// 按类型解析
    pub fn make<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.resolve(TypeId::of::<T>(), type_name::<T>())?;
        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                expected: type_name::<T>().to_string(),
            })
    }

    fn create(&self, type_id: TypeId, requested: &str) -> ContainerResult<(Instance, Scope)> {
        // 工厂执行期间不持有锁，工厂内部可以继续解析其他类型
        let (factory, scope, type_name) = {
            let bindings = self.bindings.read();
            let binding = bindings
                .get(&type_id)
                .ok_or_else(|| ContainerError::NotBound(requested.to_string()))?;
            (Arc::clone(&binding.factory), binding.scope, binding.type_name)
        };

        let instance = factory(self).map_err(|source| ContainerError::CreationFailed {
            type_name: type_name.to_string(),
            source,
        })?;
        Ok((instance, scope))
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 注册插件，启动时按优先级执行
    pub fn register_plugin(&self, plugin: Arc<dyn ApplicationPlugin>) {
        self.plugins.write().register(plugin);
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    /// 启动：所有插件先 configure，再 on_boot
    pub async fn boot(&self) -> ApplicationResult<()> {
        let _guard = self.boot_lock.lock().await;
        if self.is_booted() {
            return Ok(());
        }

        let plugins = self.plugins.read().sorted();
        for plugin in &plugins {
            tracing::debug!(plugin = plugin.name(), "Configuring plugin");
            plugin.configure(self).map_err(|source| ApplicationError::Plugin {
                name: plugin.name().to_string(),
                source,
            })?;
        }
        for plugin in &plugins {
            plugin
                .on_boot(self)
                .await
                .map_err(|source| ApplicationError::Plugin {
                    name: plugin.name().to_string(),
                    source,
                })?;
        }

        self.booted.store(true, Ordering::Release);
        tracing::info!(plugins = plugins.len(), "Application booted");
        Ok(())
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Application for ApplicationContext {
    fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    fn resolve(&self, type_id: TypeId, type_name: &str) -> ContainerResult<Instance> {
        if let Some(instance) = self.singletons.read().get(&type_id) {
            return Ok(Arc::clone(instance));
        }

        let (instance, scope) = self.create(type_id, type_name)?;
        if scope == Scope::Prototype {
            return Ok(instance);
        }

        // 并发创建时以先写入的为准
        let mut singletons = self.singletons.write();
        Ok(Arc::clone(singletons.entry(type_id).or_insert(instance)))
    }

    fn is_booted(&self) -> bool {
        ApplicationContext::is_booted(self)
    }

    async fn boot(&self) -> ApplicationResult<()> {
        ApplicationContext::boot(self).await
    }
}
