//! # tgrelay-server
//!
//! The HTTP bridge in front of the platform session.
//!
//! - `POST /api/call`: decode `{"method", "params"}`, dispatch, encode
//! - [`rpc::registry::MethodRegistry`]: custom handlers shadow session
//!   capabilities
//! - [`rpc::dispatch::Dispatcher`]: validation, resolution, timeout,
//!   logging, and metrics for every call
//! - `GET /health`, `GET /api/methods`, `GET /metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod rpc;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use rpc::dispatch::Dispatcher;
pub use rpc::handlers::default_registry;
pub use rpc::registry::{MethodHandler, MethodRegistry, RegistryEntry, Tier};
pub use rpc::types::{ErrorKind, MethodCall, MethodResult};
pub use server::{RelayServer, ServerHandle};
pub use shutdown::DrainOutcome;
