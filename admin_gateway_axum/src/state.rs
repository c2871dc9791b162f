use std::sync::Arc;

use admin_gateway::{Gateway, GatewayConfig, ProxyClient};

/// Shared handles for the request handlers. Constructed once at startup and
/// injected through `Router::with_state`; nothing is reached through
/// ambient statics.
#[derive(Clone)]
pub struct AuthState {
    pub gateway: Arc<Gateway>,
    pub proxy: Arc<ProxyClient>,
    pub config: GatewayConfig,
}

impl AuthState {
    pub fn new(gateway: Arc<Gateway>, proxy: Arc<ProxyClient>) -> Self {
        let config = gateway.config().clone();
        Self {
            gateway,
            proxy,
            config,
        }
    }
}
