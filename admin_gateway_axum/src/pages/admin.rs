use askama::Template;
use axum::{
    Extension,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::session::CurrentSession;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    display_name: &'a str,
    csrf_token: &'a str,
}

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    title: &'a str,
    display_name: &'a str,
    csrf_token: &'a str,
}

fn render<T: Template>(template: T) -> Result<Response, (StatusCode, String)> {
    let html = template
        .render()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Html(html).into_response())
}

pub(crate) async fn dashboard(
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    render(DashboardTemplate {
        display_name: &session.display_name,
        csrf_token: &session.csrf_token,
    })
}

pub(crate) async fn maintenance(
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    render(PageTemplate {
        title: "Maintenance",
        display_name: &session.display_name,
        csrf_token: &session.csrf_token,
    })
}

pub(crate) async fn menu_page(
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    render(PageTemplate {
        title: "Menu",
        display_name: &session.display_name,
        csrf_token: &session.csrf_token,
    })
}

pub(crate) async fn orders_page(
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    render(PageTemplate {
        title: "Orders",
        display_name: &session.display_name,
        csrf_token: &session.csrf_token,
    })
}

pub(crate) async fn users_page(
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    render(PageTemplate {
        title: "Users",
        display_name: &session.display_name,
        csrf_token: &session.csrf_token,
    })
}
