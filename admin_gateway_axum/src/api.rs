//! Thin per-endpoint proxy wrappers over the backend API. Each handler
//! attaches the session's bearer token and forwards through `ProxyClient`;
//! response normalization (session-expiry 401s, transport failures) happens
//! in the proxy, not here.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use http::Method;
use serde::Deserialize;
use serde_json::Value;

use admin_gateway::ProxyResponse;

use crate::session::CurrentSession;
use crate::state::AuthState;

fn proxy_response(response: ProxyResponse) -> Response {
    (response.status, Json(response.body)).into_response()
}

/// Forward only the whitelisted keys of a client JSON body.
fn pick(body: &Value, keys: &[&str]) -> Value {
    let mut out = serde_json::Map::new();
    if let Some(object) = body.as_object() {
        for key in keys {
            if let Some(value) = object.get(*key) {
                out.insert((*key).to_string(), value.clone());
            }
        }
    }
    Value::Object(out)
}

#[derive(Deserialize)]
pub(crate) struct SettingQuery {
    setting_id: i64,
}

#[derive(Deserialize)]
pub(crate) struct OrgQuery {
    setting_id: i64,
    organization_id: String,
}

impl OrgQuery {
    fn query_string(&self) -> String {
        format!(
            "setting_id={}&organization_id={}",
            self.setting_id,
            urlencoding::encode(&self.organization_id)
        )
    }
}

#[derive(Deserialize)]
pub(crate) struct PageQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct OrdersQuery {
    status_filter: Option<String>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct DeliveriesQuery {
    setting_id: i64,
    organization_id: String,
    #[serde(default)]
    statuses: String,
}

#[derive(Deserialize)]
pub(crate) struct RegisterWebhookQuery {
    setting_id: i64,
    domain: String,
}

#[derive(Deserialize)]
pub(crate) struct BalanceQuery {
    setting_id: i64,
    organization_id: String,
    customer_id: String,
}

#[derive(Deserialize)]
pub(crate) struct TransactionsQuery {
    setting_id: i64,
    organization_id: String,
    customer_id: Option<String>,
    limit: Option<i64>,
}

// Status, settings and logs

pub(crate) async fn status(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, "/status", None)
            .await,
    )
}

pub(crate) async fn iiko_settings(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, "/iiko/settings", None)
            .await,
    )
}

pub(crate) async fn create_iiko_settings(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::POST, "/iiko/settings", Some(body))
            .await,
    )
}

pub(crate) async fn update_iiko_settings(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::PUT,
                &format!("/iiko/settings/{id}"),
                Some(body),
            )
            .await,
    )
}

pub(crate) async fn delete_iiko_settings(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::DELETE,
                &format!("/iiko/settings/{id}"),
                None,
            )
            .await,
    )
}

pub(crate) async fn test_connection(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/test-connection?setting_id={}", query.setting_id),
                None,
            )
            .await,
    )
}

pub(crate) async fn logs(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, "/logs", None)
            .await,
    )
}

// Organization catalog lookups

pub(crate) async fn organizations(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/organizations?setting_id={}", query.setting_id),
                None,
            )
            .await,
    )
}

pub(crate) async fn organizations_by_key(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                "/iiko/organizations-by-key",
                Some(pick(&body, &["api_key", "api_url"])),
            )
            .await,
    )
}

pub(crate) async fn terminal_groups(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/terminal-groups?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn payment_types(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/payment-types?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn couriers(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/couriers?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn order_types(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/order-types?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn discount_types(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/discount-types?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn stop_lists(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/stop-lists?{}", query.query_string()),
                None,
            )
            .await,
    )
}

// Webhooks

pub(crate) async fn register_webhook(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<RegisterWebhookQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!(
                    "/iiko/register-webhook?setting_id={}&domain={}",
                    query.setting_id,
                    urlencoding::encode(&query.domain)
                ),
                None,
            )
            .await,
    )
}

pub(crate) async fn webhook_settings(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/webhook-settings?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn webhook_events(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, "/webhooks/events", None)
            .await,
    )
}

// Menu

pub(crate) async fn menu(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<PageQuery>,
) -> Response {
    let mut params = Vec::new();
    if let Some(skip) = query.skip {
        params.push(format!("skip={skip}"));
    }
    if let Some(limit) = query.limit {
        params.push(format!("limit={limit}"));
    }
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::GET,
                &format!("/menu?{}", params.join("&")),
                None,
            )
            .await,
    )
}

pub(crate) async fn iiko_menu(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/menu?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn sync_menu(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    // Menu sync walks the whole nomenclature on the backend side; give it
    // the slow timeout.
    proxy_response(
        state
            .proxy
            .forward_slow(
                &session.token,
                Method::POST,
                &format!("/iiko/sync-menu?{}", query.query_string()),
                None,
            )
            .await,
    )
}

// Orders and deliveries

pub(crate) async fn orders(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let mut params = Vec::new();
    if let Some(status_filter) = &query.status_filter {
        params.push(format!(
            "status_filter={}",
            urlencoding::encode(status_filter)
        ));
    }
    if let Some(skip) = query.skip {
        params.push(format!("skip={skip}"));
    }
    if let Some(limit) = query.limit {
        params.push(format!("limit={limit}"));
    }
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::GET,
                &format!("/orders?{}", params.join("&")),
                None,
            )
            .await,
    )
}

pub(crate) async fn deliveries(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<DeliveriesQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!(
                    "/iiko/deliveries?setting_id={}&organization_id={}&statuses={}",
                    query.setting_id,
                    urlencoding::encode(&query.organization_id),
                    urlencoding::encode(&query.statuses)
                ),
                None,
            )
            .await,
    )
}

// User management

pub(crate) async fn users(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, "/users", None)
            .await,
    )
}

pub(crate) async fn create_user(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                "/users",
                Some(pick(
                    &body,
                    &["email", "username", "password", "role", "is_active"],
                )),
            )
            .await,
    )
}

pub(crate) async fn update_user_role(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::PUT,
                &format!("/users/{user_id}/role"),
                Some(pick(&body, &["role"])),
            )
            .await,
    )
}

pub(crate) async fn delete_user(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Path(user_id): Path<i64>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::DELETE,
                &format!("/users/{user_id}"),
                None,
            )
            .await,
    )
}

pub(crate) async fn toggle_user_active(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Path(user_id): Path<i64>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::PUT,
                &format!("/users/{user_id}/toggle-active"),
                None,
            )
            .await,
    )
}

// Loyalty / wallet operations

pub(crate) async fn loyalty_programs(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrgQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/loyalty/programs?{}", query.query_string()),
                None,
            )
            .await,
    )
}

pub(crate) async fn loyalty_customer_info(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/loyalty/customer-info?setting_id={}", query.setting_id),
                Some(pick(
                    &body,
                    &[
                        "organization_id",
                        "customer_id",
                        "phone",
                        "card_track",
                        "card_number",
                        "email",
                    ],
                )),
            )
            .await,
    )
}

pub(crate) async fn loyalty_create_customer(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
    Json(body): Json<Value>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/loyalty/customer?setting_id={}", query.setting_id),
                Some(pick(
                    &body,
                    &[
                        "organization_id",
                        "name",
                        "phone",
                        "email",
                        "card_track",
                        "card_number",
                        "birthday",
                    ],
                )),
            )
            .await,
    )
}

pub(crate) async fn loyalty_balance(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<BalanceQuery>,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!(
                    "/iiko/loyalty/balance?setting_id={}&organization_id={}&customer_id={}",
                    query.setting_id,
                    urlencoding::encode(&query.organization_id),
                    urlencoding::encode(&query.customer_id)
                ),
                None,
            )
            .await,
    )
}

async fn loyalty_wallet_operation(
    state: &AuthState,
    session: &CurrentSession,
    setting_id: i64,
    operation: &str,
    body: &Value,
) -> Response {
    proxy_response(
        state
            .proxy
            .forward(
                &session.token,
                Method::POST,
                &format!("/iiko/loyalty/{operation}?setting_id={setting_id}"),
                Some(pick(
                    body,
                    &[
                        "organization_id",
                        "customer_id",
                        "wallet_id",
                        "amount",
                        "comment",
                    ],
                )),
            )
            .await,
    )
}

pub(crate) async fn loyalty_topup(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
    Json(body): Json<Value>,
) -> Response {
    loyalty_wallet_operation(&state, &session, query.setting_id, "topup", &body).await
}

pub(crate) async fn loyalty_withdraw(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
    Json(body): Json<Value>,
) -> Response {
    loyalty_wallet_operation(&state, &session, query.setting_id, "withdraw", &body).await
}

pub(crate) async fn loyalty_hold(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SettingQuery>,
    Json(body): Json<Value>,
) -> Response {
    loyalty_wallet_operation(&state, &session, query.setting_id, "hold", &body).await
}

pub(crate) async fn loyalty_transactions(
    State(state): State<AuthState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<TransactionsQuery>,
) -> Response {
    let mut path = format!(
        "/iiko/loyalty/transactions?setting_id={}&organization_id={}&limit={}",
        query.setting_id,
        urlencoding::encode(&query.organization_id),
        query.limit.unwrap_or(50)
    );
    if let Some(customer_id) = &query.customer_id {
        if !customer_id.is_empty() {
            path.push_str(&format!(
                "&customer_id={}",
                urlencoding::encode(customer_id)
            ));
        }
    }
    proxy_response(
        state
            .proxy
            .forward(&session.token, Method::GET, &path, None)
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_keeps_only_whitelisted_keys() {
        let body = json!({
            "email": "a@example.com",
            "username": "admin",
            "password": "secret",
            "is_admin": true,
        });
        let picked = pick(&body, &["email", "username", "password", "role", "is_active"]);

        assert_eq!(picked["email"], "a@example.com");
        assert_eq!(picked["username"], "admin");
        assert!(picked.get("is_admin").is_none());
        // Whitelisted keys absent from the body stay absent
        assert!(picked.get("role").is_none());
    }

    #[test]
    fn test_pick_tolerates_non_object_bodies() {
        assert_eq!(pick(&json!([1, 2, 3]), &["key"]), json!({}));
        assert_eq!(pick(&Value::Null, &["key"]), json!({}));
    }

    #[test]
    fn test_org_query_string_encodes_organization_id() {
        let query = OrgQuery {
            setting_id: 7,
            organization_id: "org id/with spaces".to_string(),
        };
        assert_eq!(
            query.query_string(),
            "setting_id=7&organization_id=org%20id%2Fwith%20spaces"
        );
    }
}
