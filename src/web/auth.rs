use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::AuthConfig;

/// Outcome of the admin Basic Auth gate. Missing server-side credentials are
/// deliberately distinct from bad client credentials: an unconfigured gate
/// closes the surface (503) instead of silently opening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuth {
    Authorized,
    Unauthorized,
    NotConfigured,
}

pub fn check_admin(config: &AuthConfig, header: Option<&str>) -> AdminAuth {
    let (user, pass) = match (&config.admin_user, &config.admin_pass) {
        (Some(user), Some(pass)) => (user.as_str(), pass.as_str()),
        _ => return AdminAuth::NotConfigured,
    };

    let encoded = match header.and_then(|h| h.strip_prefix("Basic ")) {
        Some(encoded) => encoded.trim(),
        None => return AdminAuth::Unauthorized,
    };
    let decoded = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(_) => return AdminAuth::Unauthorized,
    };
    let credentials = match String::from_utf8(decoded) {
        Ok(credentials) => credentials,
        Err(_) => return AdminAuth::Unauthorized,
    };

    match credentials.split_once(':') {
        Some((u, p)) if u == user && p == pass => AdminAuth::Authorized,
        _ => AdminAuth::Unauthorized,
    }
}
