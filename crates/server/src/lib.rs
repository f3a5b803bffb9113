//! HTTP surface of the caption relay: router, handlers, metrics.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
