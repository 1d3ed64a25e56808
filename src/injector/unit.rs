//! Loaded units and the `Factory` capability
//!
//! A loader hands back a [`LoadedUnit`]: either a single value, or a table
//! with an optional default export and any number of named exports. Values
//! that can be invoked to build something are [`Export::Factory`].

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A resolved module or middleware, shared by every consumer.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Something that can be invoked with no arguments to produce an [`Instance`].
///
/// For modules this is the constructor; for middlewares it is the factory
/// whose output is the actual handler.
///
/// # Example
/// ```
/// use kusto_core::injector::{Factory, Instance};
/// use kusto_core::async_trait;
/// use std::sync::Arc;
///
/// struct UserService;
///
/// struct UserServiceFactory;
///
/// #[async_trait]
/// impl Factory for UserServiceFactory {
///     async fn create(&self) -> anyhow::Result<Instance> {
///         Ok(Arc::new(UserService))
///     }
/// }
/// ```
#[async_trait]
pub trait Factory: Send + Sync + 'static {
    async fn create(&self) -> anyhow::Result<Instance>;
}

/// [`Factory`] backed by a closure returning a future.
pub struct FnFactory<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, T> Factory for FnFactory<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + Sync + 'static,
{
    async fn create(&self) -> anyhow::Result<Instance> {
        let value = (self.f)().await?;
        Ok(Arc::new(value))
    }
}

/// Wrap an async constructor as a factory.
pub fn factory_fn<F, Fut, T>(f: F) -> Arc<dyn Factory>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + Sync + 'static,
{
    Arc::new(FnFactory { f })
}

/// Wrap an infallible, synchronous constructor as a factory.
pub fn factory_value<F, T>(f: F) -> Arc<dyn Factory>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    factory_fn(move || std::future::ready(Ok::<T, anyhow::Error>(f())))
}

/// A single exported value.
#[derive(Clone)]
pub enum Export {
    /// Invocable: a constructor or a middleware factory.
    Factory(Arc<dyn Factory>),
    /// An already built structured value.
    Object(Instance),
    /// A raw value that is neither invocable nor structured.
    Scalar(Instance),
}

impl Export {
    pub fn factory(factory: impl Factory) -> Self {
        Self::Factory(Arc::new(factory))
    }

    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    pub fn scalar<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Scalar(Arc::new(value))
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Factory(_))
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Factory(_) => "factory",
            Self::Object(_) => "object",
            Self::Scalar(_) => "scalar",
        }
    }
}

impl From<Arc<dyn Factory>> for Export {
    fn from(factory: Arc<dyn Factory>) -> Self {
        Self::Factory(factory)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Export::{}", self.kind())
    }
}

/// A table of exports. Named exports keep their declaration order.
#[derive(Clone, Debug, Default)]
pub struct ExportTable {
    pub(crate) default: Option<Export>,
    pub(crate) named: Vec<(String, Export)>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, export: impl Into<Export>) -> Self {
        self.default = Some(export.into());
        self
    }

    /// Add a named export. Re-using a name replaces the earlier export in place.
    pub fn with_named(mut self, name: impl Into<String>, export: impl Into<Export>) -> Self {
        let name = name.into();
        let export = export.into();
        match self.named.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = export,
            None => self.named.push((name, export)),
        }
        self
    }

    pub fn default_export(&self) -> Option<&Export> {
        self.default.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.named.is_empty()
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Export> {
        let pos = self.named.iter().position(|(n, _)| n == name)?;
        Some(self.named.remove(pos).1)
    }
}

/// What a loader produces.
#[derive(Clone, Debug)]
pub enum LoadedUnit {
    /// The unit is itself the value.
    Direct(Export),
    /// The unit is a table of default and named exports.
    Table(ExportTable),
}

impl LoadedUnit {
    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Direct(e) if e.is_factory())
    }
}

impl From<Export> for LoadedUnit {
    fn from(export: Export) -> Self {
        Self::Direct(export)
    }
}

impl From<ExportTable> for LoadedUnit {
    fn from(table: ExportTable) -> Self {
        Self::Table(table)
    }
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
