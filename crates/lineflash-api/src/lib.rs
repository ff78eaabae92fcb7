//! lineflash-api - HTTP surface of the production-line flasher
//!
//! Serves the endpoints the operator console polls: job state, unit lookup,
//! flash start and serial port listing.
//!
//! # Usage
//!
//! ```ignore
//! use lineflash_api::{create_router, AppState};
//!
//! let state = AppState::new(orchestrator, ports, build_info);
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Create the flasher router with the given application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        .route("/state", get(handlers::status::get_state))
        .route("/lookup", get(handlers::lookup::lookup_unit))
        .route("/flash", post(handlers::flash::start_flash))
        .route("/ports", get(handlers::ports::list_ports))
        // Middleware
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
