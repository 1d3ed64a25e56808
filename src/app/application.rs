//! Application Bootstrap
//!
//! Owns the configuration, the dependency injector and the HTTP server.

use super::shutdown_signal;
use crate::config::CoreConfig;
use crate::error::{KustoError, Result};
use crate::injector::{DependencyInjector, InjectorConfig, LoaderMap};
use axum::Router;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::Route;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::{Layer, Service};

type RoutesFn = Box<dyn FnOnce(Arc<DependencyInjector>) -> Router + Send>;
type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

struct RunningServer {
    addr: SocketAddr,
    started_at: DateTime<Utc>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

/// Snapshot returned by [`Application::health_status`].
#[derive(Clone, Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// Seconds since the current server was started; zero when stopped.
    pub uptime_secs: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: &'static str,
    pub modules: usize,
    pub middlewares: usize,
    pub config: CoreConfig,
}

/// A bootstrapped application
///
/// # Example
///
/// ```rust,ignore
/// use kusto_core::app::Application;
///
/// #[tokio::main]
/// async fn main() {
///     let app = Application::builder()
///         .modules(module_registry())
///         .middlewares(middleware_registry())
///         .routes(|injector| routes::router(injector))
///         .build()
///         .await
///         .expect("Failed to initialize application");
///
///     app.run_until_shutdown().await.expect("Server error");
/// }
/// ```
pub struct Application {
    config: CoreConfig,
    injector: Arc<DependencyInjector>,
    router: Router,
    created_at: DateTime<Utc>,
    server: Mutex<Option<RunningServer>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn injector(&self) -> &Arc<DependencyInjector> {
        &self.injector
    }

    fn server(&self) -> MutexGuard<'_, Option<RunningServer>> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.server().is_some()
    }

    /// Address the server is bound to, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server().as_ref().map(|s| s.addr)
    }

    /// Bind `host:port` and serve the router in a background task.
    ///
    /// Starting an already running application returns its current address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let _guard = self.lifecycle.lock().await;
        self.start_server().await
    }

    async fn start_server(&self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            tracing::warn!("Application already running on {}", addr);
            return Ok(addr);
        }

        tracing::info!("Starting application...");
        let listener = TcpListener::bind(self.config.address()).await?;
        let addr = listener.local_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let router = self.router.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        *self.server() = Some(RunningServer {
            addr,
            started_at: Utc::now(),
            shutdown,
            handle,
        });
        tracing::info!("Server running on http://{}", addr);
        Ok(addr)
    }

    /// Gracefully stop the server and wait for it to finish.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        self.stop_server().await
    }

    async fn stop_server(&self) -> Result<()> {
        let Some(server) = self.server().take() else {
            tracing::debug!("stop() called while not running");
            return Ok(());
        };

        tracing::info!("Stopping application...");
        let _ = server.shutdown.send(());
        server
            .handle
            .await
            .map_err(|e| KustoError::Internal(format!("server task failed: {e}")))??;
        tracing::info!("Application stopped successfully");
        Ok(())
    }

    pub async fn restart(&self) -> Result<SocketAddr> {
        tracing::info!("Restarting application...");
        let _guard = self.lifecycle.lock().await;
        self.stop_server().await?;
        self.start_server().await
    }

    /// Start, wait for Ctrl+C or SIGTERM, then stop.
    pub async fn run_until_shutdown(&self) -> Result<()> {
        self.start().await?;
        shutdown_signal().await;
        self.stop().await
    }

    pub fn health_status(&self) -> HealthStatus {
        let started_at = self.server().as_ref().map(|s| s.started_at);
        HealthStatus {
            status: if started_at.is_some() { "healthy" } else { "stopped" },
            uptime_secs: started_at.map_or(0, |at| (Utc::now() - at).num_seconds()),
            started_at,
            created_at: self.created_at,
            version: env!("CARGO_PKG_VERSION"),
            modules: self.injector.module_names().len(),
            middlewares: self.injector.middleware_names().len(),
            config: self.config.clone(),
        }
    }
}

/// Builder for [`Application`]
#[derive(Default)]
pub struct ApplicationBuilder {
    config: Option<CoreConfig>,
    modules: LoaderMap,
    middlewares: LoaderMap,
    injector: Option<Arc<DependencyInjector>>,
    routes: Option<RoutesFn>,
    layers: Vec<LayerFn>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this configuration instead of reading the environment.
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn modules(mut self, registry: LoaderMap) -> Self {
        self.modules = registry;
        self
    }

    pub fn middlewares(mut self, registry: LoaderMap) -> Self {
        self.middlewares = registry;
        self
    }

    /// Share an existing injector, e.g. one with manually registered modules.
    pub fn injector(mut self, injector: Arc<DependencyInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    pub fn router(self, router: Router) -> Self {
        self.routes(move |_| router)
    }

    /// Build the router once the injector is initialized.
    pub fn routes<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Arc<DependencyInjector>) -> Router + Send + 'static,
    {
        self.routes = Some(Box::new(f));
        self
    }

    /// Wrap every route in `layer`, e.g. `axum::middleware::from_fn(..)`.
    ///
    /// Layers are applied in call order after the routes are built, so the
    /// last one added runs first on a request.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    /// Initialize the injector and assemble the application.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration was given and the environment
    /// holds an invalid value.
    pub async fn build(self) -> Result<Application> {
        let config = match self.config {
            Some(config) => config,
            None => CoreConfig::from_env()?,
        };

        let injector = self.injector.unwrap_or_default();
        injector
            .initialize(InjectorConfig {
                module_registry: self.modules,
                middleware_registry: self.middlewares,
                ambiguity: config.ambiguity,
            })
            .await?;

        let router = match self.routes {
            Some(routes) => routes(Arc::clone(&injector)),
            None => Router::new(),
        };
        let router = self
            .layers
            .into_iter()
            .fold(router, |router, apply| apply(router));

        Ok(Application {
            config,
            injector,
            router,
            created_at: Utc::now(),
            server: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }
}
