//! # Application router
//!
//! Glues the JSON API, the rendered pages and static assets into one [`Router`] with the shared
//! [`AppState`].

use std::sync::Arc;

use axum::{Router, extract::FromRef, http::header, middleware::from_fn_with_state};
use axum_extra::extract::cookie::Key;
use chrono::Duration;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer, sensitive_headers::SetSensitiveHeadersLayer, trace::TraceLayer,
};

use crate::{
    api,
    config::{CookieConfig, ServerConfig},
    db::interface::DatabaseClient,
    models::AppConfig,
    ui,
};

pub mod middleware;


use middleware::CachePolicy;

/// Maximum request payload size in bytes
const MAX_REQUEST_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KiB

/// How long browsers may cache static assets.
const STATIC_MAX_AGE: Duration = Duration::hours(1);

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseClient>,
    pub cookie: CookieConfig,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie.key.clone()
    }
}

/// Builds the complete application: `/api`, the pages, and `/static`.
pub fn new_app_router(db: Arc<dyn DatabaseClient>, config: &ServerConfig) -> Router<()> {
    let state = AppState {
        db,
        cookie: config.cookie.clone(),
        config: Arc::new(config.app.clone()),
    };

    let dynamic: Router<AppState> = Router::new()
        .nest("/api", api::router())
        .merge(ui::router())
        .layer(
            ServiceBuilder::new()
                .layer(CachePolicy::NoStore.layer())
                .layer(from_fn_with_state(state.clone(), middleware::session)),
        );

    let assets = ServiceBuilder::new()
        .layer(CachePolicy::public(STATIC_MAX_AGE).layer())
        .service(ui::new_static_server(&config.static_dir));

    dynamic
        .nest_service("/static", assets)
        .with_state(state)
        .layer(
            // order is top to bottom
            ServiceBuilder::new()
                .layer(SetSensitiveHeadersLayer::new(vec![
                    header::COOKIE,
                    header::SET_COOKIE,
                ]))
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_PAYLOAD_BYTES)),
        )
}
