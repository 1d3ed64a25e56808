use crate::injector::resolver::AmbiguityPolicy;
use crate::injector::unit::LoadedUnit;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type LoaderFuture = Pin<Box<dyn Future<Output = anyhow::Result<LoadedUnit>> + Send>>;

/// Zero-argument async function producing a [`LoadedUnit`].
pub type Loader = Arc<dyn Fn() -> LoaderFuture + Send + Sync>;

/// Ordered name → loader mapping.
///
/// A `None` loader stands for a registered name without a loader; such
/// entries are skipped during initialization.
///
/// # Example
/// ```
/// use kusto_core::injector::{ExportTable, LoadedUnit, LoaderMap, factory_value};
///
/// struct AuthService;
///
/// let modules = LoaderMap::new().with("auth", || async {
///     let table = ExportTable::new().with_named("AuthService", factory_value(|| AuthService));
///     Ok::<_, anyhow::Error>(LoadedUnit::Table(table))
/// });
/// assert_eq!(modules.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LoaderMap {
    entries: Vec<(String, Option<Loader>)>,
}

impl LoaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F, Fut>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<LoadedUnit>> + Send + 'static,
    {
        let loader: Loader = Arc::new(move || Box::pin(loader()) as LoaderFuture);
        self.insert(name.into(), Some(loader));
        self
    }

    pub fn with_loader(mut self, name: impl Into<String>, loader: Loader) -> Self {
        self.insert(name.into(), Some(loader));
        self
    }

    pub fn with_missing(mut self, name: impl Into<String>) -> Self {
        self.insert(name.into(), None);
        self
    }

    fn insert(&mut self, name: String, loader: Option<Loader>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = loader,
            None => self.entries.push((name, loader)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, Option<&Loader>)> {
        self.entries.iter().map(|(n, l)| (n.as_str(), l.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for LoaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Input to [`DependencyInjector::initialize`](crate::injector::DependencyInjector::initialize).
#[derive(Clone, Debug, Default)]
pub struct InjectorConfig {
    pub module_registry: LoaderMap,
    pub middleware_registry: LoaderMap,
    pub ambiguity: AmbiguityPolicy,
}

impl InjectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modules(mut self, registry: LoaderMap) -> Self {
        self.module_registry = registry;
        self
    }

    pub fn middlewares(mut self, registry: LoaderMap) -> Self {
        self.middleware_registry = registry;
        self
    }

    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }
}
