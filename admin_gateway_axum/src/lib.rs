//! admin-gateway-axum - Axum integration for the admin session gateway
//!
//! Provides the session-gating middleware, the login/logout/page handlers
//! and the per-endpoint backend proxy routes, assembled by [`admin_router`].

mod api;
mod middleware;
mod pages;
mod router;
mod session;
mod state;

pub use middleware::{ensure_session_api, ensure_session_redirect};
pub use router::admin_router;
pub use session::CurrentSession;
pub use state::AuthState;
