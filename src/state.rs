//! Application state shared across handlers.

use std::sync::Arc;

use crate::publisher::EventPublisher;
use crate::services::{CartService, CatalogService, OrderService};
use crate::storage::Store;

/// Cheap to clone; every handler gets the same services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: CatalogService,
    carts: CartService,
    orders: OrderService,
    events: EventPublisher,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog: CatalogService::new(store.clone(), events.clone()),
                carts: CartService::new(store.clone()),
                orders: OrderService::new(store, events.clone()),
                events,
            }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService { &self.inner.catalog }

    #[must_use]
    pub fn carts(&self) -> &CartService { &self.inner.carts }

    #[must_use]
    pub fn orders(&self) -> &OrderService { &self.inner.orders }

    #[must_use]
    pub fn events(&self) -> &EventPublisher { &self.inner.events }
}
