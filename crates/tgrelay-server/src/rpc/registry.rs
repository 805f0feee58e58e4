//! Two-tier method registry.
//!
//! Custom handlers are consulted first, then the session capability table.
//! Both tables are filled once at startup and only read afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::Value;
use tgrelay_session::Session;

use crate::rpc::errors::RpcError;

/// Trait implemented by every method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params against the session.
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError>;
}

/// Which table an entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// Bridge-defined handler.
    Custom,
    /// Allowlisted session operation.
    Capability,
}

/// A resolved handler.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Operation name.
    pub name: String,
    /// Table it resolved from.
    pub tier: Tier,
    /// The handler.
    pub handler: Arc<dyn MethodHandler>,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

/// Registry mapping operation names to handlers.
#[derive(Default)]
pub struct MethodRegistry {
    custom: HashMap<String, Arc<dyn MethodHandler>>,
    capabilities: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bridge-defined handler.
    pub fn register_custom(&mut self, name: &str, handler: impl MethodHandler + 'static) {
        let _ = self.custom.insert(name.to_owned(), Arc::new(handler));
    }

    /// Register a session capability.
    pub fn register_capability(&mut self, name: &str, handler: impl MethodHandler + 'static) {
        let _ = self.capabilities.insert(name.to_owned(), Arc::new(handler));
    }

    /// Resolve an operation name. Custom handlers shadow capabilities.
    pub fn resolve(&self, operation: &str) -> Option<RegistryEntry> {
        let (tier, handler) = self
            .custom
            .get(operation)
            .map(|h| (Tier::Custom, h))
            .or_else(|| {
                self.capabilities
                    .get(operation)
                    .map(|h| (Tier::Capability, h))
            })?;

        Some(RegistryEntry {
            name: operation.to_owned(),
            tier,
            handler: Arc::clone(handler),
        })
    }

    /// All resolvable names, sorted and deduplicated.
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .custom
            .keys()
            .chain(self.capabilities.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Whether an operation resolves.
    pub fn has_method(&self, operation: &str) -> bool {
        self.custom.contains_key(operation) || self.capabilities.contains_key(operation)
    }
}
