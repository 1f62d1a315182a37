use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::http::response::error_response;
use crate::state::AppState;
use marginalia_core::domain::comment::AuthorRole;

const AUTH_COOKIE_NAME: &str = "marginalia_session";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth not configured")]
    MissingConfig,
    #[error("authentication required")]
    MissingToken,
    #[error("token invalid")]
    InvalidToken,
    #[error("moderator role required")]
    NotModerator,
}

/// The verified caller, as carried in the signed token: the LMS user id
/// plus the role the surrounding platform assigned.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: AuthorRole,
}

/// Request identity, present on every request once the auth middleware has
/// run. Anonymous requests carry `None`.
#[derive(Debug, Clone)]
pub struct Identity(Option<AuthUser>);

impl Identity {
    pub fn anonymous() -> Self {
        Identity(None)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }

    pub fn require(&self) -> Result<AuthUser, AuthError> {
        self.0.clone().ok_or(AuthError::MissingToken)
    }

    pub fn require_moderator(&self) -> Result<AuthUser, AuthError> {
        let user = self.require()?;
        if !user.role.is_moderator() {
            return Err(AuthError::NotModerator);
        }
        Ok(user)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    sub: String,
    role: String,
    exp: i64,
}

/// Verifies any presented token and attaches the caller's [`Identity`].
/// Requests without credentials pass through as anonymous; a presented but
/// invalid token is rejected outright.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token =
        extract_bearer_token(&request).or_else(|| extract_cookie(&request, AUTH_COOKIE_NAME));
    let user = match token {
        None => None,
        Some(token) => {
            let secret = state
                .config
                .token_secret
                .as_deref()
                .filter(|value| !value.is_empty())
                .ok_or(AuthError::MissingConfig)?;
            Some(verify_token(secret, &token).ok_or(AuthError::InvalidToken)?)
        }
    };
    request.extensions_mut().insert(Identity(user));
    Ok(next.run(request).await)
}

/// Gate for the moderation surface: everything under /v2/admin requires a
/// teacher or admin token. Runs after [`authenticate`].
pub async fn require_moderator(request: Request<Body>, next: Next) -> Result<Response, AuthError> {
    if !request.uri().path().starts_with("/v2/admin") {
        return Ok(next.run(request).await);
    }
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_else(Identity::anonymous);
    identity.require_moderator()?;
    Ok(next.run(request).await)
}

pub fn issue_token(
    secret: &str,
    user_id: &str,
    role: AuthorRole,
    max_age_secs: i64,
) -> Result<String, AuthError> {
    let exp = Utc::now().timestamp().saturating_add(max_age_secs);
    let payload = TokenPayload {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp,
    };
    let json = serde_json::to_vec(&payload).map_err(|_| AuthError::InvalidToken)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(json);
    let signature = sign_token(secret, &payload_b64);
    Ok(format!("{payload_b64}.{signature}"))
}

pub fn verify_token(secret: &str, token: &str) -> Option<AuthUser> {
    let mut iter = token.splitn(2, '.');
    let payload_b64 = iter.next().filter(|value| !value.is_empty())?;
    let sig = iter.next().filter(|value| !value.is_empty())?;
    if sig != sign_token(secret, payload_b64) {
        return None;
    }
    let payload = decode_payload(payload_b64)?;
    if payload.exp <= Utc::now().timestamp() {
        return None;
    }
    let role = AuthorRole::try_from(payload.role.as_str()).ok()?;
    Some(AuthUser {
        user_id: payload.sub,
        role,
    })
}

pub fn build_cookie_value(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
        name = AUTH_COOKIE_NAME,
        value = token,
        max_age = max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn attach_cookie(mut response: Response, cookie_value: String) -> Response {
    if let Ok(value) = cookie_value.parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

pub fn is_https(headers: &axum::http::HeaderMap) -> bool {
    if let Some(value) = headers.get("x-forwarded-proto") {
        if let Ok(value) = value.to_str() {
            if value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case("https"))
            {
                return true;
            }
        }
    }
    false
}

fn decode_payload(payload_b64: &str) -> Option<TokenPayload> {
    let bytes = URL_SAFE_NO_PAD.decode(payload_b64.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn sign_token(secret: &str, payload_b64: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac can take key of any size");
    mac.update(payload_b64.as_bytes());
    let raw = mac.finalize().into_bytes();
    URL_SAFE_NO_PAD.encode(raw)
}

fn extract_bearer_token<B>(request: &Request<B>) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let value = header.trim().strip_prefix("Bearer ")?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn extract_cookie<B>(request: &Request<B>, name: &str) -> Option<String> {
    let header = request.headers().get(COOKIE)?.to_str().ok()?;
    for part in header.split(';') {
        let trimmed = part.trim();
        let mut iter = trimmed.splitn(2, '=');
        let key = iter.next()?.trim();
        let value = iter.next()?.trim();
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingConfig => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            AuthError::MissingToken | AuthError::InvalidToken => {
                axum::http::StatusCode::UNAUTHORIZED
            }
            AuthError::NotModerator => axum::http::StatusCode::FORBIDDEN,
        };
        error_response(status, &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{issue_token, verify_token, AuthUser, Identity};
    use marginalia_core::domain::comment::AuthorRole;

    #[test]
    fn issue_token_round_trip() {
        let secret = "secret";
        let token = issue_token(secret, "user-7", AuthorRole::Student, 60).unwrap();
        let user = verify_token(secret, &token).unwrap();
        assert_eq!(user.user_id, "user-7");
        assert_eq!(user.role, AuthorRole::Student);
    }

    #[test]
    fn expired_token_is_rejected() {
        let secret = "secret";
        let token = issue_token(secret, "user-7", AuthorRole::Student, -60).unwrap();
        assert!(verify_token(secret, &token).is_none());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let secret = "secret";
        let token = issue_token(secret, "user-7", AuthorRole::Student, 60).unwrap();
        let tampered = format!("{token}x");
        assert!(verify_token(secret, &tampered).is_none());
        assert!(verify_token("other-secret", &token).is_none());
    }

    #[test]
    fn identity_requires_moderator_role() {
        let student = Identity(Some(AuthUser {
            user_id: "s".to_string(),
            role: AuthorRole::Student,
        }));
        assert!(student.require().is_ok());
        assert!(student.require_moderator().is_err());

        let teacher = Identity(Some(AuthUser {
            user_id: "t".to_string(),
            role: AuthorRole::Teacher,
        }));
        assert!(teacher.require_moderator().is_ok());

        assert!(Identity::anonymous().require().is_err());
    }
}
