use axum::{
    Router,
    middleware::from_fn_with_state,
    response::Redirect,
    routing::{get, post},
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AuthState;
use crate::{api, middleware, pages};

/// Assemble the full console router: login endpoints, protected pages and
/// the protected AJAX proxy under `/admin/api`.
pub fn admin_router(state: AuthState) -> Router {
    let page_routes = Router::new()
        .route("/admin", get(pages::dashboard))
        .route("/admin/maintenance", get(pages::maintenance))
        .route("/admin/menu", get(pages::menu_page))
        .route("/admin/orders", get(pages::orders_page))
        .route("/admin/users", get(pages::users_page))
        .route("/logout", post(pages::logout))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::ensure_session_redirect,
        ));

    let api_routes = Router::new()
        .route("/status", get(api::status))
        .route(
            "/iiko-settings",
            get(api::iiko_settings).post(api::create_iiko_settings),
        )
        .route(
            "/iiko-settings/{id}",
            axum::routing::put(api::update_iiko_settings).delete(api::delete_iiko_settings),
        )
        .route("/iiko-test", post(api::test_connection))
        .route("/iiko-organizations", post(api::organizations))
        .route("/iiko-organizations-by-key", post(api::organizations_by_key))
        .route("/iiko-terminal-groups", post(api::terminal_groups))
        .route("/iiko-payment-types", post(api::payment_types))
        .route("/iiko-couriers", post(api::couriers))
        .route("/iiko-order-types", post(api::order_types))
        .route("/iiko-discount-types", post(api::discount_types))
        .route("/iiko-stop-lists", post(api::stop_lists))
        .route("/iiko-register-webhook", post(api::register_webhook))
        .route("/iiko-webhook-settings", post(api::webhook_settings))
        .route("/webhook-events", get(api::webhook_events))
        .route("/logs", get(api::logs))
        .route("/menu", get(api::menu))
        .route("/iiko-menu", post(api::iiko_menu))
        .route("/iiko-sync-menu", post(api::sync_menu))
        .route("/orders", get(api::orders))
        .route("/iiko-deliveries", post(api::deliveries))
        .route("/users", get(api::users).post(api::create_user))
        .route(
            "/users/{user_id}",
            axum::routing::delete(api::delete_user),
        )
        .route(
            "/users/{user_id}/role",
            axum::routing::put(api::update_user_role),
        )
        .route(
            "/users/{user_id}/toggle-active",
            axum::routing::put(api::toggle_user_active),
        )
        .route("/loyalty/programs", post(api::loyalty_programs))
        .route("/loyalty/customer-info", post(api::loyalty_customer_info))
        .route("/loyalty/customer", post(api::loyalty_create_customer))
        .route("/loyalty/balance", post(api::loyalty_balance))
        .route("/loyalty/topup", post(api::loyalty_topup))
        .route("/loyalty/withdraw", post(api::loyalty_withdraw))
        .route("/loyalty/hold", post(api::loyalty_hold))
        .route("/loyalty/transactions", get(api::loyalty_transactions))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::ensure_session_api,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/login") }))
        .route(
            "/login",
            get(pages::show_login).post(pages::submit_login),
        )
        .merge(page_routes)
        .nest("/admin/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}
