//! Application bootstrap
//!
//! ```text
//! 1. Configuration (CoreConfig, from env unless given)
//!    ↓
//! 2. DependencyInjector::initialize (modules, then middlewares)
//!    ↓
//! 3. Router assembly (with the initialized injector)
//!    ↓
//! 4. start()  → serving
//!    ↓
//! 5. Shutdown signal / stop()  → graceful shutdown
//! ```

mod application;
mod shutdown;

pub use application::{Application, ApplicationBuilder, HealthStatus};
pub use shutdown::shutdown_signal;
