//! admin-gateway - Session gateway core for a server-rendered admin console
//!
//! This crate owns the authentication protocol between a browser and an
//! external REST backend: exchanging credentials for a bearer token, caching
//! it in a server-side session, restoring sessions from an encrypted
//! persistent cookie pair, and forwarding application requests with the
//! token attached. All business logic lives behind the backend API; this
//! crate is only the gateway to it.

mod backend;
mod config;
mod cookie;
mod errors;
mod gateway;
mod proxy;
mod session;
mod token;
mod utils;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use config::{GatewayConfig, SameSite};
pub use cookie::{
    CookieCodec, SESSION_COOKIE_NAME, TOKEN_COOKIE_NAME, USERNAME_COOKIE_NAME, append_clear_cookie,
    append_set_cookie, clear_login_cookies, cookie_value,
};
pub use errors::GatewayError;
pub use gateway::{Admission, AuthenticatedSession, Gateway, LoginSuccess, RejectionReason};
pub use proxy::{ProxyClient, ProxyResponse};
pub use session::{InMemorySessionStore, SessionRecord, SessionStore};
pub use token::is_valid_token;
pub use utils::gen_random_string;
