use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{TypedHeader, headers};

use admin_gateway::{SESSION_COOKIE_NAME, append_clear_cookie, clear_login_cookies};

use crate::middleware::login_url_with;
use crate::state::AuthState;

const SIGNED_OUT_STATUS: &str = "You have been signed out.";

/// Destroy the session and clear all three cookies, then return to the
/// login page. The anti-forgery token dies with the session.
pub(crate) async fn logout(
    State(state): State<AuthState>,
    TypedHeader(cookies): TypedHeader<headers::Cookie>,
) -> Response {
    state.gateway.logout(cookies.get(SESSION_COOKIE_NAME)).await;

    let mut response =
        Redirect::to(&login_url_with("status", SIGNED_OUT_STATUS)).into_response();
    if let Err(e) = clear_login_cookies(response.headers_mut(), &state.config) {
        tracing::error!("Failed to clear login cookies: {}", e);
    }
    if let Err(e) = append_clear_cookie(response.headers_mut(), &state.config, SESSION_COOKIE_NAME)
    {
        tracing::error!("Failed to clear session cookie: {}", e);
    }
    response
}
