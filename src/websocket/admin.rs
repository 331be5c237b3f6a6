use crate::metrics::MetricsSnapshot;
use crate::protocol::{RoomSummary, UserSummary};
use crate::security::tokens_match;
use crate::server::{ServerConfig, SignalServer};
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::sync::Arc;

fn enforce_admin_auth(headers: &HeaderMap, config: &ServerConfig) -> Result<(), StatusCode> {
    if !config.require_admin_auth {
        return Ok(());
    }

    let Some(raw_header) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Unauthorized admin access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("Unauthorized admin access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = config.admin_auth_token.as_deref() {
        if tokens_match(token, expected) {
            tracing::debug!("Admin access authorized via bearer token");
            return Ok(());
        }
    }

    tracing::warn!("Unauthorized admin access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// Live rooms without their encryption keys.
pub async fn admin_rooms_handler(
    headers: HeaderMap,
    State(server): State<Arc<SignalServer>>,
) -> Result<Json<Vec<RoomSummary>>, StatusCode> {
    enforce_admin_auth(&headers, server.config())?;
    Ok(Json(server.list_active_rooms()))
}

/// Registered participants without their connection handles.
pub async fn admin_users_handler(
    headers: HeaderMap,
    State(server): State<Arc<SignalServer>>,
) -> Result<Json<Vec<UserSummary>>, StatusCode> {
    enforce_admin_auth(&headers, server.config())?;
    Ok(Json(server.list_active_users()))
}

pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<SignalServer>>,
) -> Result<Json<MetricsSnapshot>, StatusCode> {
    enforce_admin_auth(&headers, server.config())?;
    Ok(Json(server.metrics().snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config_with_token(token: Option<&str>) -> ServerConfig {
        ServerConfig {
            require_admin_auth: true,
            admin_auth_token: token.map(str::to_string),
            ..ServerConfig::default()
        }
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn open_when_auth_disabled() {
        let config = ServerConfig {
            require_admin_auth: false,
            ..ServerConfig::default()
        };
        assert!(enforce_admin_auth(&HeaderMap::new(), &config).is_ok());
    }

    #[test]
    fn matching_bearer_token_is_accepted() {
        let config = config_with_token(Some("s3cret"));
        assert!(enforce_admin_auth(&bearer("Bearer s3cret"), &config).is_ok());
    }

    #[test]
    fn missing_or_wrong_credentials_are_rejected() {
        let config = config_with_token(Some("s3cret"));
        assert_eq!(
            enforce_admin_auth(&HeaderMap::new(), &config),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            enforce_admin_auth(&bearer("Basic s3cret"), &config),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            enforce_admin_auth(&bearer("Bearer guess"), &config),
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn no_configured_token_rejects_everything() {
        let config = config_with_token(None);
        assert_eq!(
            enforce_admin_auth(&bearer("Bearer "), &config),
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}
