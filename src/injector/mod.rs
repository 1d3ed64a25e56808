//! Name-based module and middleware injection
//!
//! Loaders produce [`LoadedUnit`]s; the resolver picks the export that stands
//! for each name and the [`DependencyInjector`] keeps the realized instances.

mod extractor;
mod instances;
mod loader;
mod registry;
mod resolver;
mod unit;

pub use extractor::{AppState, HasInjector, Injected, Middlewares};
pub use instances::{InjectedMiddlewares, InjectedModules, NamedInstances};
pub use loader::{InjectorConfig, Loader, LoaderFuture, LoaderMap};
pub use registry::DependencyInjector;
pub use resolver::{AmbiguityPolicy, EntryKind, realize, resolve_middleware, resolve_module};
pub use unit::{
    Export, ExportTable, Factory, FnFactory, Instance, LoadedUnit, capitalize, factory_fn,
    factory_value,
};
