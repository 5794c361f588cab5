//! HTTP surface under `/api`. JSON bodies are camelCase.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod orders;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::cookie::{time::Duration, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "storefront_session";

/// Seven days of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// All routes, without the session layer. The extractors need one installed
/// around this router; see [`router`].
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(catalog::health))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/categories/:slug", get(catalog::get_category))
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/:slug", get(catalog::get_product))
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route("/api/cart/items/:id", put(cart::update_item).delete(cart::remove_item))
        .route("/api/orders", get(orders::list_orders).post(orders::place_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/admin/categories", post(admin::create_category))
        .route("/api/admin/categories/:id", put(admin::update_category).delete(admin::delete_category))
        .route("/api/admin/products", post(admin::create_product))
        .route("/api/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .with_state(state)
}

/// Cookie sessions kept in process memory.
#[must_use]
pub fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_EXPIRY_SECONDS)))
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

pub fn router(state: AppState, config: &Config) -> Router {
    routes(state)
        .layer(session_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
