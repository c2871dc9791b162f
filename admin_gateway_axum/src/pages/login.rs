use askama::Template;
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use http::HeaderMap;
use serde::Deserialize;

use admin_gateway::{
    GatewayError, SESSION_COOKIE_NAME, TOKEN_COOKIE_NAME, USERNAME_COOKIE_NAME, append_set_cookie,
    cookie_value,
};

use crate::middleware::login_url_with;
use crate::state::AuthState;

const MALFORMED_TOKEN_MESSAGE: &str = "The server returned an invalid token";
const CONNECTION_ERROR_MESSAGE: &str = "Could not reach the API. Try again later.";

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    status: Option<&'a str>,
    auth_error: Option<&'a str>,
    connection_error: Option<&'a str>,
}

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    status: Option<String>,
    auth: Option<String>,
    connection: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

pub(crate) async fn show_login(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, (StatusCode, String)> {
    // Already-authenticated visitors go straight to the dashboard. Only the
    // live session counts here; cookie restoration stays with the
    // protected-route middleware.
    if let Some(session_id) = cookie_value(&headers, SESSION_COOKIE_NAME) {
        if state.gateway.session(session_id).await.is_some() {
            return Ok(Redirect::to("/admin").into_response());
        }
    }

    let template = LoginTemplate {
        status: query.status.as_deref(),
        auth_error: query.auth.as_deref(),
        connection_error: query.connection.as_deref(),
    };
    let html = template
        .render()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Html(html).into_response())
}

pub(crate) async fn submit_login(
    State(state): State<AuthState>,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.gateway.login(&form.username, &form.password).await {
        Ok(success) => {
            let mut response = Redirect::to("/admin").into_response();
            let cookies = [
                (SESSION_COOKIE_NAME, success.session_id.as_str()),
                (TOKEN_COOKIE_NAME, success.token_cookie.as_str()),
                (USERNAME_COOKIE_NAME, success.username_cookie.as_str()),
            ];
            for (name, value) in cookies {
                if let Err(e) =
                    append_set_cookie(response.headers_mut(), &state.config, name, value)
                {
                    tracing::error!("Failed to set {} cookie: {}", name, e);
                    return Redirect::to(&login_url_with("connection", CONNECTION_ERROR_MESSAGE))
                        .into_response();
                }
            }
            response
        }
        Err(GatewayError::CredentialRejected(detail)) => {
            Redirect::to(&login_url_with("auth", &detail)).into_response()
        }
        Err(GatewayError::MalformedToken) => {
            Redirect::to(&login_url_with("auth", MALFORMED_TOKEN_MESSAGE)).into_response()
        }
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            Redirect::to(&login_url_with("connection", CONNECTION_ERROR_MESSAGE)).into_response()
        }
    }
}
