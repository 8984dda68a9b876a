//! Configuration generations and hot reload.
//!
//! ```text
//! Engine  -> StoreHandle::load() -> ArcSwap::load_full() -> Arc<ConfigStore>
//!                                        |
//!                                 (lock-free read)
//!
//! Reload  -> StoreHandle::swap() -> ArcSwap::swap() -> previous generation
//!                                        |
//!                     retire() destroys it once no reader holds it
//! ```

use crate::store::{ConfigStore, TeardownReport};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Shared reference to the live configuration store
pub struct StoreHandle {
    current: ArcSwap<ConfigStore>,
    generation: AtomicU64,
}

impl StoreHandle {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            current: ArcSwap::from_pointee(store),
            generation: AtomicU64::new(1),
        }
    }

    /// Current generation. Holding the returned `Arc` keeps it alive
    /// across a swap.
    pub fn load(&self) -> Arc<ConfigStore> {
        self.current.load_full()
    }

    /// Generation counter, bumped on every swap.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Install a freshly built store and return the previous generation.
    pub fn swap(&self, store: ConfigStore) -> Arc<ConfigStore> {
        let previous = self.current.swap(Arc::new(store));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, "Swapped VRRP configuration store");
        previous
    }

    /// Destroy a retired generation if no reader still holds it.
    ///
    /// When other references remain, the store is handed back unchanged
    /// so the caller can retry after the next quiescent point.
    pub fn retire(old: Arc<ConfigStore>) -> Result<TeardownReport, Arc<ConfigStore>> {
        match Arc::try_unwrap(old) {
            Ok(store) => Ok(store.destroy()),
            Err(still_shared) => {
                debug!(
                    references = Arc::strong_count(&still_shared),
                    "Retired store still referenced"
                );
                Err(still_shared)
            }
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("generation", &self.generation())
            .finish()
    }
}
