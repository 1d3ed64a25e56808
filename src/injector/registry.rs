use crate::error::{KustoError, Result};
use crate::injector::instances::{InjectedMiddlewares, InjectedModules, NamedInstances};
use crate::injector::loader::{InjectorConfig, Loader, LoaderMap};
use crate::injector::resolver::{self, AmbiguityPolicy, EntryKind};
use crate::injector::Instance;
use std::any::Any;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    modules: NamedInstances,
    middlewares: NamedInstances,
    initialized: bool,
}

/// Name-based registry of injected modules and middlewares.
///
/// Loaders are resolved once by [`initialize`](Self::initialize); afterwards
/// every consumer shares the same instances.
///
/// # Example
/// ```
/// use kusto_core::injector::{
///     DependencyInjector, ExportTable, InjectorConfig, LoadedUnit, LoaderMap, factory_value,
/// };
///
/// struct AuthService;
///
/// # #[tokio::main]
/// # async fn main() {
/// let injector = DependencyInjector::new();
/// let modules = LoaderMap::new().with("auth", || async {
///     let table = ExportTable::new().with_named("AuthService", factory_value(|| AuthService));
///     Ok::<_, anyhow::Error>(LoadedUnit::Table(table))
/// });
///
/// injector
///     .initialize(InjectorConfig::new().modules(modules))
///     .await
///     .unwrap();
/// assert!(injector.get_module_as::<AuthService>("auth").is_some());
/// # }
/// ```
pub struct DependencyInjector {
    state: RwLock<State>,
    init_lock: tokio::sync::Mutex<()>,
}

impl DependencyInjector {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Lazily created process-wide injector.
    pub fn global() -> &'static DependencyInjector {
        static GLOBAL: OnceLock<DependencyInjector> = OnceLock::new();
        GLOBAL.get_or_init(DependencyInjector::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve every module loader, then every middleware loader.
    ///
    /// A second call on an initialized injector does nothing. Entries whose
    /// loader is missing or fails are logged and left out; they never fail
    /// the batch.
    pub async fn initialize(&self, config: InjectorConfig) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            tracing::debug!("Dependency injector already initialized, skipping");
            return Ok(());
        }

        tracing::info!(
            "Initializing with {} modules and {} middlewares",
            config.module_registry.len(),
            config.middleware_registry.len()
        );

        let modules = load_modules(&config.module_registry, config.ambiguity).await;
        {
            let mut state = self.write();
            for (name, instance) in modules {
                state.modules.insert(name, instance);
            }
        }

        let middlewares = load_middlewares(&config.middleware_registry).await;
        let (module_count, middleware_count) = {
            let mut state = self.write();
            for (name, instance) in middlewares {
                state.middlewares.insert(name, instance);
            }
            state.initialized = true;
            (state.modules.len(), state.middlewares.len())
        };

        tracing::info!(
            "Dependency injection initialized with {} modules and {} middlewares",
            module_count,
            middleware_count
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    /// All injected modules; empty when not yet initialized.
    pub fn injected_modules(&self) -> InjectedModules {
        let state = self.read();
        if !state.initialized {
            tracing::warn!("Dependency injector not initialized. Returning empty modules.");
            return InjectedModules::new();
        }
        state.modules.clone()
    }

    /// All injected middlewares.
    ///
    /// # Errors
    /// Returns [`KustoError::NotInitialized`] before [`initialize`](Self::initialize) has completed.
    pub fn injected_middlewares(&self) -> Result<InjectedMiddlewares> {
        let state = self.read();
        if !state.initialized {
            return Err(KustoError::NotInitialized);
        }
        Ok(state.middlewares.clone())
    }

    pub fn get_module(&self, name: &str) -> Option<Instance> {
        self.read().modules.get(name).cloned()
    }

    pub fn get_module_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.read().modules.get_as::<T>(name)
    }

    pub fn get_middleware(&self, name: &str) -> Option<Instance> {
        let state = self.read();
        let middleware = state.middlewares.get(name).cloned();
        tracing::debug!(
            "Getting middleware '{}' (found: {}), available: {:?}",
            name,
            middleware.is_some(),
            state.middlewares
        );
        middleware
    }

    pub fn get_middleware_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.read().middlewares.get_as::<T>(name)
    }

    /// Insert or overwrite a module without going through a loader.
    pub fn register_module(&self, name: impl Into<String>, module: Instance) {
        let name = name.into();
        tracing::debug!("Manually registered module: {}", name);
        self.write().modules.insert(name, module);
    }

    /// Insert or overwrite a middleware without going through a loader.
    pub fn register_middleware(&self, name: impl Into<String>, middleware: Instance) {
        let name = name.into();
        tracing::debug!("Manually registered middleware: {}", name);
        self.write().middlewares.insert(name, middleware);
    }

    pub fn module_names(&self) -> Vec<String> {
        self.read().modules.names().map(str::to_string).collect()
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.read().middlewares.names().map(str::to_string).collect()
    }

    /// Drop every module and middleware and mark the injector uninitialized.
    ///
    /// Waits for a running [`initialize`](Self::initialize) to finish first.
    pub async fn clear(&self) {
        let _guard = self.init_lock.lock().await;
        let mut state = self.write();
        state.modules.clear();
        state.middlewares.clear();
        state.initialized = false;
    }
}

impl Default for DependencyInjector {
    fn default() -> Self {
        Self::new()
    }
}

async fn load_module(name: &str, loader: &Loader, policy: AmbiguityPolicy) -> Result<Instance> {
    let unit = loader().await.map_err(|source| KustoError::LoadFailed {
        name: name.to_string(),
        source,
    })?;
    let export = resolver::resolve_module(unit, name, policy)?;
    resolver::realize(export, name, EntryKind::Module).await
}

async fn load_middleware(name: &str, loader: &Loader) -> Result<Instance> {
    let unit = loader().await.map_err(|source| KustoError::LoadFailed {
        name: name.to_string(),
        source,
    })?;
    let export = resolver::resolve_middleware(unit, name);
    tracing::debug!("Resolved middleware {} to {}", name, export.kind());
    resolver::realize(export, name, EntryKind::Middleware).await
}

async fn load_modules(registry: &LoaderMap, policy: AmbiguityPolicy) -> Vec<(String, Instance)> {
    if registry.is_empty() {
        tracing::warn!("Module registry is empty. No injectable modules found.");
        return Vec::new();
    }

    let mut loaded = Vec::with_capacity(registry.len());
    for (name, loader) in registry.iter() {
        let Some(loader) = loader else {
            tracing::warn!("Module loader not found for: {}, skipping...", name);
            continue;
        };

        match load_module(name, loader, policy).await {
            Ok(instance) => {
                tracing::debug!("Loaded injectable module: {}", name);
                loaded.push((name.to_string(), instance));
            }
            Err(e) => tracing::error!("Failed to load injectable module {}: {}", name, e),
        }
    }
    loaded
}

async fn load_middlewares(registry: &LoaderMap) -> Vec<(String, Instance)> {
    tracing::info!(
        "Loading {} middlewares: {}",
        registry.len(),
        registry.names().collect::<Vec<_>>().join(", ")
    );

    let mut loaded = Vec::with_capacity(registry.len());
    for (name, loader) in registry.iter() {
        let Some(loader) = loader else {
            tracing::warn!("Middleware loader not found for: {}, skipping...", name);
            continue;
        };

        match load_middleware(name, loader).await {
            Ok(instance) => {
                tracing::info!("Loaded injectable middleware: {}", name);
                loaded.push((name.to_string(), instance));
            }
            Err(e) => tracing::error!("Failed to load injectable middleware {}: {}", name, e),
        }
    }

    tracing::info!(
        "Middleware loading complete. Loaded middlewares: {}",
        loaded
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::unit::{Export, ExportTable, LoadedUnit, factory_fn, factory_value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, PartialEq)]
    struct UserService {
        ready: bool,
    }

    struct Helper;

    #[derive(Debug, PartialEq)]
    struct Applied {
        applied: bool,
    }

    fn table(t: ExportTable) -> anyhow::Result<LoadedUnit> {
        Ok(LoadedUnit::Table(t))
    }

    fn user_module() -> LoaderMap {
        LoaderMap::new().with("user", || async {
            table(ExportTable::new().with_default(factory_value(|| UserService { ready: true })))
        })
    }

    #[tokio::test]
    async fn test_failed_loaders_are_omitted() {
        let modules = LoaderMap::new()
            .with("a", || async { table(ExportTable::new().with_default(Export::object(1u8))) })
            .with("broken", || async { Err::<LoadedUnit, _>(anyhow::anyhow!("missing file")) })
            .with("c", || async { table(ExportTable::new().with_default(Export::object(3u8))) })
            .with("failing_ctor", || async {
                table(ExportTable::new().with_default(factory_fn(|| async {
                    Err::<Helper, _>(anyhow::anyhow!("constructor threw"))
                })))
            })
            .with_missing("absent");

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(modules))
            .await
            .unwrap();

        assert_eq!(injector.module_names(), vec!["a", "c"]);
        assert!(injector.get_module("broken").is_none());
        assert!(injector.get_module("absent").is_none());
        assert!(injector.is_initialized());
    }

    #[tokio::test]
    async fn test_default_constructor_is_instantiated() {
        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(user_module()))
            .await
            .unwrap();

        let user = injector.get_module_as::<UserService>("user").unwrap();
        assert_eq!(*user, UserService { ready: true });
    }

    #[tokio::test]
    async fn test_uppercase_factory_selected_from_table() {
        let modules = LoaderMap::new().with("accounts", || async {
            table(
                ExportTable::new()
                    .with_named("helper", factory_value(|| Helper))
                    .with_named("UserService", factory_value(|| UserService { ready: false })),
            )
        });

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(modules))
            .await
            .unwrap();

        assert!(injector.get_module_as::<UserService>("accounts").is_some());
    }

    #[tokio::test]
    async fn test_ambiguous_module_is_omitted_by_default() {
        let modules = LoaderMap::new().with("utils", || async {
            table(
                ExportTable::new()
                    .with_named("helper", factory_value(|| Helper))
                    .with_named("format", factory_value(|| Helper)),
            )
        });

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(modules.clone()))
            .await
            .unwrap();
        assert!(injector.get_module("utils").is_none());

        let lenient = DependencyInjector::new();
        lenient
            .initialize(
                InjectorConfig::new()
                    .modules(modules)
                    .ambiguity(AmbiguityPolicy::KeepUnit),
            )
            .await
            .unwrap();
        assert!(lenient.get_module_as::<ExportTable>("utils").is_some());
    }

    #[tokio::test]
    async fn test_middleware_factory_output_is_stored() {
        let middlewares = LoaderMap::new().with("auth", || async {
            table(ExportTable::new().with_default(factory_value(|| Applied { applied: true })))
        });

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().middlewares(middlewares))
            .await
            .unwrap();

        let middleware = injector.get_middleware_as::<Applied>("auth").unwrap();
        assert_eq!(*middleware, Applied { applied: true });
        assert!(injector.get_middleware("auth").is_some());
    }

    #[tokio::test]
    async fn test_middleware_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory = factory_value(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Applied { applied: true }
        });
        let middlewares = LoaderMap::new().with("auth", move || {
            let factory = Arc::clone(&factory);
            async move { Ok::<_, anyhow::Error>(LoadedUnit::Direct(Export::Factory(factory))) }
        });

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().middlewares(middlewares))
            .await
            .unwrap();
        injector.get_middleware("auth");
        injector.injected_middlewares().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_contracts() {
        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(user_module()))
            .await
            .unwrap();
        assert_eq!(injector.injected_modules().len(), 1);

        injector.clear().await;

        assert!(injector.injected_modules().is_empty());
        assert!(matches!(
            injector.injected_middlewares(),
            Err(KustoError::NotInitialized)
        ));
        assert!(!injector.is_initialized());
    }

    #[tokio::test]
    async fn test_clear_waits_for_running_initialize() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (on_start, gate) = (Arc::clone(&started), Arc::clone(&release));
        let middlewares = LoaderMap::new().with("w", move || {
            let (on_start, gate) = (Arc::clone(&on_start), Arc::clone(&gate));
            async move {
                on_start.notify_one();
                gate.notified().await;
                table(ExportTable::new().with_default(factory_value(|| Applied { applied: true })))
            }
        });

        let injector = Arc::new(DependencyInjector::new());
        let init = tokio::spawn({
            let injector = Arc::clone(&injector);
            async move {
                injector
                    .initialize(
                        InjectorConfig::new()
                            .modules(user_module())
                            .middlewares(middlewares),
                    )
                    .await
            }
        });

        started.notified().await;
        assert_eq!(injector.module_names(), vec!["user"]);

        let clearing = tokio::spawn({
            let injector = Arc::clone(&injector);
            async move { injector.clear().await }
        });
        tokio::task::yield_now().await;
        assert!(!clearing.is_finished());
        assert_eq!(injector.module_names(), vec!["user"]);

        release.notify_one();
        init.await.unwrap().unwrap();
        clearing.await.unwrap();

        assert!(!injector.is_initialized());
        assert!(injector.module_names().is_empty());
        assert!(injector.middleware_names().is_empty());
    }

    #[tokio::test]
    async fn test_failed_middlewares_are_omitted() {
        let middlewares = LoaderMap::new()
            .with("ok", || async {
                table(ExportTable::new().with_default(factory_value(|| Applied { applied: true })))
            })
            .with("broken", || async { Err::<LoadedUnit, _>(anyhow::anyhow!("missing file")) })
            .with("failing_factory", || async {
                table(ExportTable::new().with_default(factory_fn(|| async {
                    Err::<Applied, _>(anyhow::anyhow!("handler setup failed"))
                })))
            })
            .with_missing("absent");

        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().middlewares(middlewares))
            .await
            .unwrap();

        assert_eq!(injector.middleware_names(), vec!["ok"]);
        assert_eq!(injector.injected_middlewares().unwrap().len(), 1);
        assert!(injector.get_middleware("failing_factory").is_none());
        assert!(injector.get_middleware("absent").is_none());
    }

    #[tokio::test]
    async fn test_second_initialize_is_noop() {
        let injector = DependencyInjector::new();
        injector
            .initialize(InjectorConfig::new().modules(user_module()))
            .await
            .unwrap();

        let other = LoaderMap::new().with("other", || async {
            table(ExportTable::new().with_default(Export::object(())))
        });
        injector
            .initialize(InjectorConfig::new().modules(other))
            .await
            .unwrap();

        assert_eq!(injector.module_names(), vec!["user"]);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let modules = LoaderMap::new().with("slow", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                table(ExportTable::new().with_default(Export::object(())))
            }
        });

        let injector = Arc::new(DependencyInjector::new());
        let config = InjectorConfig::new().modules(modules);
        let (a, b) = tokio::join!(
            injector.initialize(config.clone()),
            injector.initialize(config)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_without_initialize() {
        let injector = DependencyInjector::new();
        let value: Instance = Arc::new(UserService { ready: true });
        injector.register_module("x", Arc::clone(&value));

        assert!(Arc::ptr_eq(&injector.get_module("x").unwrap(), &value));
        // Registered, but the bulk getter still honours the lenient contract.
        assert!(injector.injected_modules().is_empty());

        injector.register_middleware("m", Arc::new(Applied { applied: false }));
        assert!(injector.get_middleware_as::<Applied>("m").is_some());
        assert!(injector.injected_middlewares().is_err());
    }

    #[tokio::test]
    async fn test_manual_registration_survives_initialize() {
        let injector = DependencyInjector::new();
        injector.register_module("manual", Arc::new(Helper));
        injector
            .initialize(InjectorConfig::new().modules(user_module()))
            .await
            .unwrap();

        assert_eq!(injector.module_names(), vec!["manual", "user"]);
    }

    #[tokio::test]
    async fn test_empty_config() {
        let injector = DependencyInjector::new();
        injector.initialize(InjectorConfig::default()).await.unwrap();

        assert!(injector.injected_modules().is_empty());
        assert!(injector.injected_middlewares().unwrap().is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(
            DependencyInjector::global(),
            DependencyInjector::global()
        ));
    }
}
