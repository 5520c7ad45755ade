//! Application state.

use std::sync::Arc;

use pulse_dispatch::{Dispatcher, SubscriptionRegistry};
use pulse_store::{AuthoritativeSource, ReconciliationStore, UserDirectory};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub store: Arc<ReconciliationStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub source: Arc<dyn AuthoritativeSource>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        source: Arc<dyn AuthoritativeSource>,
        dedup_retention: usize,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let store = Arc::new(ReconciliationStore::with_retention(dedup_retention));
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            store.clone(),
            directory,
        ));
        Self {
            registry,
            store,
            dispatcher,
            source,
        }
    }
}
