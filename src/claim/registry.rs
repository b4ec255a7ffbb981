//! One controller per code.

use dashmap::DashMap;
use std::sync::Arc;

use crate::claim::controller::{ClaimController, ClaimServices};
use crate::observability::metrics;

/// Controllers kept before settled ones are evicted.
pub const DEFAULT_MAX_CLAIMS: usize = 10_000;

/// Thread-safe map of code -> controller, sharing one set of services.
#[derive(Clone)]
pub struct ClaimRegistry {
    controllers: Arc<DashMap<String, Arc<ClaimController>>>,
    services: ClaimServices,
    capacity: usize,
}

impl ClaimRegistry {
    pub fn new(services: ClaimServices) -> Self {
        Self::with_capacity(services, DEFAULT_MAX_CLAIMS)
    }

    /// Registry holding at most `capacity` controllers.
    pub fn with_capacity(services: ClaimServices, capacity: usize) -> Self {
        Self {
            controllers: Arc::new(DashMap::new()),
            services,
            capacity,
        }
    }

    /// The services every controller is built with.
    pub fn services(&self) -> &ClaimServices {
        &self.services
    }

    /// Controller for `code`, if one exists.
    pub fn get(&self, code: &str) -> Option<Arc<ClaimController>> {
        self.controllers.get(code).map(|r| r.value().clone())
    }

    /// Controller for `code`, created on first use.
    ///
    /// A full registry first evicts settled controllers. Returns `None` when
    /// every slot still holds an attempt in flight.
    pub fn get_or_create(&self, code: &str) -> Option<Arc<ClaimController>> {
        if let Some(existing) = self.get(code) {
            return Some(existing);
        }
        if self.controllers.len() >= self.capacity {
            self.evict_settled();
            if self.controllers.len() >= self.capacity {
                tracing::warn!(capacity = self.capacity, "Claim registry full");
                return None;
            }
        }
        let controller = self
            .controllers
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(ClaimController::new(self.services.clone())))
            .value()
            .clone();
        metrics::record_active_claims(self.controllers.len());
        Some(controller)
    }

    /// Drop controllers with nothing in flight that no caller is holding.
    pub fn evict_settled(&self) -> usize {
        let before = self.controllers.len();
        self.controllers.retain(|_, controller| {
            Arc::strong_count(controller) > 1 || controller.snapshot().status.is_in_flight()
        });
        let evicted = before.saturating_sub(self.controllers.len());
        metrics::record_active_claims(self.controllers.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted settled claim controllers");
        }
        evicted
    }

    /// Tear down the controller for `code`; its in-flight work is abandoned
    /// once the last handle drops.
    pub fn remove(&self, code: &str) -> bool {
        let removed = self.controllers.remove(code).map(|(_, controller)| {
            controller.reset();
        });
        metrics::record_active_claims(self.controllers.len());
        removed.is_some()
    }

    /// Tear down every controller.
    pub fn teardown_all(&self) {
        let count = self.controllers.len();
        for entry in self.controllers.iter() {
            entry.value().reset();
        }
        self.controllers.clear();
        metrics::record_active_claims(0);
        tracing::info!(count, "Claim controllers torn down");
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl std::fmt::Debug for ClaimRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimRegistry")
            .field("controllers", &self.controllers.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
