use crate::error::KustoError;
use crate::injector::instances::{InjectedMiddlewares, InjectedModules};
use crate::injector::DependencyInjector;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::sync::Arc;

/// Trait that AppState must implement to expose the injector to handlers
pub trait HasInjector {
    fn injector(&self) -> &DependencyInjector;
}

/// Default application state: just the shared injector.
#[derive(Clone)]
pub struct AppState {
    pub injector: Arc<DependencyInjector>,
}

impl AppState {
    pub fn new(injector: Arc<DependencyInjector>) -> Self {
        Self { injector }
    }
}

impl HasInjector for AppState {
    fn injector(&self) -> &DependencyInjector {
        &self.injector
    }
}

/// Axum extractor handing the injected modules to a handler.
///
/// Never rejects: before initialization the snapshot is simply empty.
///
/// # Example
/// ```
/// use kusto_core::injector::Injected;
///
/// struct AuthService;
///
/// async fn me(Injected(modules): Injected) -> String {
///     match modules.get_as::<AuthService>("auth") {
///         Some(_) => "authenticated".to_string(),
///         None => "auth module missing".to_string(),
///     }
/// }
/// ```
pub struct Injected(pub InjectedModules);

impl<S> FromRequestParts<S> for Injected
where
    S: Send + Sync + HasInjector,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Injected(state.injector().injected_modules()))
    }
}

impl std::ops::Deref for Injected {
    type Target = InjectedModules;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Axum extractor handing the injected middlewares to a handler.
///
/// Rejects with the [`KustoError::NotInitialized`] response when the
/// injector has not been initialized.
pub struct Middlewares(pub InjectedMiddlewares);

impl<S> FromRequestParts<S> for Middlewares
where
    S: Send + Sync + HasInjector,
{
    type Rejection = KustoError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        state.injector().injected_middlewares().map(Middlewares)
    }
}

impl std::ops::Deref for Middlewares {
    type Target = InjectedMiddlewares;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
