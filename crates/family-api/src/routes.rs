//! Router assembly and shared application state.

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use family_graph::PersonStore;
use tower_http::catch_panic::CatchPanicLayer;

use crate::auth::AuthConfig;
use crate::{docs, handlers, middleware};

/// State injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersonStore>,
    /// Present when an identity provider is configured.
    pub auth: Option<Arc<AuthConfig>>,
}

impl AppState {
    pub fn new(store: Arc<dyn PersonStore>, auth: Option<AuthConfig>) -> Self {
        Self {
            store,
            auth: auth.map(Arc::new),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/people/",
            get(handlers::list_people).post(handlers::create_person),
        )
        .route("/people/search", post(handlers::search))
        .route(
            "/people/:id",
            get(handlers::get_person)
                .patch(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route("/people/:id/children", get(handlers::children))
        .route("/people/:id/father", get(handlers::father))
        .route("/people/:id/mother", get(handlers::mother))
        .route("/people/:id/husband", get(handlers::husband))
        .route("/people/:id/wife", get(handlers::wife))
        .route("/people/:id/partners", get(handlers::partners))
        .route("/people/:id/network", get(handlers::person_network))
        .route("/network", get(handlers::network))
        .route("/swagger/", get(docs::swagger_ui))
        .route("/swagger/doc.json", get(docs::openapi_json))
        .route("/auth/login", get(handlers::login))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(from_fn(middleware::allow_origin_requests))
        .layer(from_fn(middleware::log_requests))
        .with_state(state)
}
