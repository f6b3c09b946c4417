//! Chatdesk API: session hub, websocket chat and REST surface.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
