use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::{HeaderMap, Method};
use serde_json::json;
use subtle::ConstantTimeEq;

use admin_gateway::{
    Admission, AuthenticatedSession, SESSION_COOKIE_NAME, TOKEN_COOKIE_NAME, USERNAME_COOKIE_NAME,
    append_set_cookie, clear_login_cookies, cookie_value,
};

use crate::session::CurrentSession;
use crate::state::AuthState;

/// Neutral status shown for every rejection, whatever the internal cause.
pub(crate) const PLEASE_SIGN_IN_STATUS: &str = "Please sign in.";

pub(crate) fn login_url_with(field: &str, message: &str) -> String {
    format!("/login?{}={}", field, urlencoding::encode(message))
}

async fn admit(state: &AuthState, headers: &HeaderMap) -> Admission {
    state
        .gateway
        .authenticate(
            cookie_value(headers, SESSION_COOKIE_NAME),
            cookie_value(headers, TOKEN_COOKIE_NAME),
            cookie_value(headers, USERNAME_COOKIE_NAME),
        )
        .await
}

/// A session restored from the cookie pair carries a regenerated identifier;
/// issue it with the response so the browser switches over.
fn finish_granted(state: &AuthState, session: &AuthenticatedSession, mut response: Response) -> Response {
    if session.restored {
        if let Err(e) = append_set_cookie(
            response.headers_mut(),
            &state.config,
            SESSION_COOKIE_NAME,
            &session.session_id,
        ) {
            tracing::error!("Failed to set restored session cookie: {}", e);
        }
    }
    response
}

fn with_cleared_login_cookies(state: &AuthState, mut response: Response) -> Response {
    if let Err(e) = clear_login_cookies(response.headers_mut(), &state.config) {
        tracing::error!("Failed to clear login cookies: {}", e);
    }
    response
}

/// Gate for page routes: rejected requests are sent back to the login page
/// with both persistent cookies cleared.
pub async fn ensure_session_redirect(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match admit(&state, req.headers()).await {
        Admission::Granted(session) => {
            req.extensions_mut().insert(CurrentSession::from(&session));
            let response = next.run(req).await;
            finish_granted(&state, &session, response)
        }
        Admission::Rejected(reason) => {
            tracing::debug!("Page request rejected: {:?}", reason);
            with_cleared_login_cookies(
                &state,
                Redirect::to(&login_url_with("status", PLEASE_SIGN_IN_STATUS)).into_response(),
            )
        }
    }
}

/// Gate for AJAX/API routes: rejected requests receive a 401 JSON body with
/// `session_expired` set so a rich client can start a re-login flow without
/// a page redirect. State-changing methods additionally require the
/// session's anti-forgery token in `X-CSRF-Token`.
pub async fn ensure_session_api(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match admit(&state, req.headers()).await {
        Admission::Granted(session) => {
            if let Err(response) =
                check_csrf(req.headers(), req.method(), &session.record.csrf_token)
            {
                return response;
            }
            req.extensions_mut().insert(CurrentSession::from(&session));
            let response = next.run(req).await;
            finish_granted(&state, &session, response)
        }
        Admission::Rejected(reason) => {
            tracing::debug!("API request rejected: {:?}", reason);
            let response = (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": PLEASE_SIGN_IN_STATUS,
                    "session_expired": true,
                })),
            )
                .into_response();
            with_cleared_login_cookies(&state, response)
        }
    }
}

fn check_csrf(headers: &HeaderMap, method: &Method, expected: &str) -> Result<(), Response> {
    if method != Method::POST
        && method != Method::PUT
        && method != Method::DELETE
        && method != Method::PATCH
    {
        return Ok(());
    }

    match headers.get("X-CSRF-Token").and_then(|h| h.to_str().ok()) {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        Some(_) => {
            tracing::debug!("CSRF token mismatch");
            Err((StatusCode::FORBIDDEN, "CSRF token mismatch").into_response())
        }
        None => {
            tracing::debug!("No CSRF token found");
            Err((StatusCode::FORBIDDEN, "No CSRF token found").into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_messages() {
        assert_eq!(
            login_url_with("status", "Please sign in."),
            "/login?status=Please%20sign%20in."
        );
        let url = login_url_with("auth", "Неверные учетные данные");
        assert!(url.starts_with("/login?auth="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_csrf_not_required_for_reads() {
        let headers = HeaderMap::new();
        assert!(check_csrf(&headers, &Method::GET, "expected").is_ok());
        assert!(check_csrf(&headers, &Method::HEAD, "expected").is_ok());
    }

    #[test]
    fn test_csrf_required_for_state_changing_methods() {
        let headers = HeaderMap::new();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            assert!(check_csrf(&headers, &method, "expected").is_err());
        }
    }

    #[test]
    fn test_csrf_token_must_match() {
        let mut headers = HeaderMap::new();
        headers.insert("X-CSRF-Token", "expected".parse().unwrap());
        assert!(check_csrf(&headers, &Method::POST, "expected").is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("X-CSRF-Token", "wrong".parse().unwrap());
        assert!(check_csrf(&headers, &Method::POST, "expected").is_err());
    }
}
