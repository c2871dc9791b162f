use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::utils::{base64url_decode, base64url_encode};

/// Opaque server-side session identifier.
pub const SESSION_COOKIE_NAME: &str = "admin_session";
/// Encrypted bearer token, first half of the persistent login pair.
pub const TOKEN_COOKIE_NAME: &str = "admin_token";
/// Encrypted username, second half of the persistent login pair.
pub const USERNAME_COOKIE_NAME: &str = "admin_username";

/// Codec for the persistent login cookie pair.
///
/// Values are sealed with AES-256-GCM under the server key; the cookie text
/// is base64url(nonce ‖ ciphertext ‖ tag). A cookie that cannot be opened
/// with the current key is treated as absent by callers, never as a fatal
/// error. The key is process-wide and read-only after initialization, safe
/// for concurrent use by many requests.
pub struct CookieCodec {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl CookieCodec {
    pub fn new(key: &[u8; 32]) -> Result<Self, GatewayError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| GatewayError::Crypto("Failed to initialize cookie key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt a cookie value. Always succeeds for well-formed string input.
    pub fn encode(&self, value: &str) -> Result<String, GatewayError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| GatewayError::Crypto("Failed to generate cookie nonce".to_string()))?;

        let mut in_out = value.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| GatewayError::Crypto("Failed to encrypt cookie value".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + in_out.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);
        Ok(base64url_encode(&payload))
    }

    /// Decrypt a cookie value. Any failure (wrong key, tampered or truncated
    /// ciphertext, bad encoding) is an error; a tampered value can never
    /// decode to a wrong-but-plausible plaintext.
    pub fn decode(&self, value: &str) -> Result<String, GatewayError> {
        let payload = base64url_decode(value)
            .map_err(|_| GatewayError::Cookie("Cookie value is not valid base64url".to_string()))?;
        if payload.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(GatewayError::Cookie("Cookie payload too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| GatewayError::Cookie("Invalid cookie nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| GatewayError::Cookie("Cookie decryption failed".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| GatewayError::Cookie("Decrypted cookie is not valid UTF-8".to_string()))
    }
}

fn cookie_attributes(config: &GatewayConfig) -> String {
    let mut attrs = format!(
        "SameSite={}; HttpOnly; Path=/",
        config.cookie_same_site.as_str()
    );
    if config.cookie_secure {
        attrs.push_str("; Secure");
    }
    if let Some(domain) = &config.cookie_domain {
        attrs.push_str("; Domain=");
        attrs.push_str(domain);
    }
    attrs
}

/// Append a Set-Cookie header carrying `value` with the configured
/// attributes and the configured session lifetime.
pub fn append_set_cookie(
    headers: &mut HeaderMap,
    config: &GatewayConfig,
    name: &str,
    value: &str,
) -> Result<(), GatewayError> {
    let max_age = config.session_lifetime_minutes * 60;
    let cookie = format!(
        "{name}={value}; {}; Max-Age={max_age}",
        cookie_attributes(config)
    );
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| GatewayError::Cookie("Failed to build Set-Cookie header".to_string()))?,
    );
    Ok(())
}

/// Append a Set-Cookie header that expires the named cookie immediately.
pub fn append_clear_cookie(
    headers: &mut HeaderMap,
    config: &GatewayConfig,
    name: &str,
) -> Result<(), GatewayError> {
    let cookie = format!("{name}=; {}; Max-Age=0", cookie_attributes(config));
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| GatewayError::Cookie("Failed to build Set-Cookie header".to_string()))?,
    );
    Ok(())
}

/// Clear both persistent login cookies. Idempotent: the same headers are
/// produced whether or not the cookies were present on the request, so
/// callers clear unconditionally on every rejection.
pub fn clear_login_cookies(
    headers: &mut HeaderMap,
    config: &GatewayConfig,
) -> Result<(), GatewayError> {
    append_clear_cookie(headers, config, TOKEN_COOKIE_NAME)?;
    append_clear_cookie(headers, config, USERNAME_COOKIE_NAME)?;
    Ok(())
}

/// Extract a cookie value from the request's Cookie header, if present.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == name => Some(v),
            _ => None,
        }
    })
}
