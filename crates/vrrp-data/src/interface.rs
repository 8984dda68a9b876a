//! Network interface references.
//!
//! Instances and addresses point at interfaces they do not own; the
//! resolver hands out shared [`Interface`] records.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A resolved network interface
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interface {
    pub name: String,
    pub index: u32,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Shared, non-owning handle to an interface
pub type InterfaceRef = Arc<Interface>;

/// Looks up interfaces by name.
#[cfg_attr(test, mockall::automock)]
pub trait InterfaceResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<InterfaceRef>;
}

/// Resolves names against the running kernel.
///
/// Records are cached so that every lookup of the same name yields the
/// same shared handle.
#[derive(Debug, Default)]
pub struct SystemInterfaces {
    cache: Mutex<HashMap<String, InterfaceRef>>,
}

impl SystemInterfaces {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterfaceResolver for SystemInterfaces {
    fn resolve(&self, name: &str) -> Option<InterfaceRef> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ifp) = cache.get(name) {
            return Some(ifp.clone());
        }

        match nix::net::if_::if_nametoindex(name) {
            Ok(index) => {
                let ifp = Arc::new(Interface {
                    name: name.to_string(),
                    index,
                });
                cache.insert(name.to_string(), ifp.clone());
                Some(ifp)
            }
            Err(e) => {
                debug!(interface = name, error = %e, "Interface lookup failed");
                None
            }
        }
    }
}

/// Fixed interface table, for offline validation and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticInterfaces {
    by_name: HashMap<String, InterfaceRef>,
}

impl StaticInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface to the table.
    pub fn with(mut self, name: &str, index: u32) -> Self {
        self.by_name.insert(
            name.to_string(),
            Arc::new(Interface {
                name: name.to_string(),
                index,
            }),
        );
        self
    }
}

impl InterfaceResolver for StaticInterfaces {
    fn resolve(&self, name: &str) -> Option<InterfaceRef> {
        self.by_name.get(name).cloned()
    }
}
