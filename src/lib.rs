//! # Kusto Core
//!
//! Framework core for axum applications: bootstrapping, configuration and a
//! name-based injector for modules and middlewares.
//!
//! ## Features
//!
//! - **Named injection**: Modules and middlewares are registered under a name
//!   with an async loader and resolved once at startup
//! - **Export resolution**: Loaders return a table of exports; the injector
//!   picks the one that stands for the name (default, exact name, `nameService`, ...)
//! - **Failure isolation**: A loader that fails is logged and skipped, never
//!   aborting startup
//! - **Handler access**: The `Injected` extractor hands the modules to axum handlers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kusto_core::prelude::*;
//!
//! struct UserService;
//!
//! async fn list_users(Injected(modules): Injected) -> &'static str {
//!     match modules.get_as::<UserService>("user") {
//!         Some(_) => "[]",
//!         None => "user module missing",
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> kusto_core::Result<()> {
//!     kusto_core::logging::init_logging("info")?;
//!
//!     let modules = LoaderMap::new().with("user", || async {
//!         let table = ExportTable::new().with_named("UserService", factory_value(|| UserService));
//!         Ok::<_, anyhow::Error>(LoadedUnit::Table(table))
//!     });
//!
//!     let app = Application::builder()
//!         .modules(modules)
//!         .routes(|injector| {
//!             Router::new()
//!                 .route("/users", axum::routing::get(list_users))
//!                 .with_state(AppState::new(injector))
//!         })
//!         .build()
//!         .await?;
//!
//!     app.run_until_shutdown().await
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod injector;
pub mod logging;

// Re-export core types
pub use app::{Application, ApplicationBuilder};
pub use config::{ConfigService, CoreConfig};
pub use error::{KustoError, Result};
pub use injector::{DependencyInjector, Factory, Injected, InjectorConfig, LoaderMap};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use kusto_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{Application, ApplicationBuilder, HealthStatus, shutdown_signal};
    pub use crate::config::{ConfigService, CoreConfig};
    pub use crate::error::{KustoError, Result};
    pub use crate::injector::{
        AmbiguityPolicy, AppState, DependencyInjector, Export, ExportTable, Factory, HasInjector,
        Injected, InjectorConfig, Instance, LoadedUnit, LoaderMap, Middlewares, factory_fn,
        factory_value,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
