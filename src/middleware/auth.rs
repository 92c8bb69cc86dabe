use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthError, Role};
use crate::error::ApiError;
use crate::state::AppState;

/// Session cookie name.
pub const TOKEN_COOKIE: &str = "token";
/// Older clients still send this one.
pub const LEGACY_TOKEN_COOKIE: &str = "jwt";

/// Authenticated user context, loaded fresh from the store on every request
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role.allows(role) {
            Ok(())
        } else {
            tracing::warn!(user = %self.email, role = %self.role, required = %role, "Forbidden");
            Err(AuthError::Forbidden { required: role }.into())
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let claims = state.jwt.verify(&token)?;

    // Role and active flag come from the store, not the token
    let user = state
        .store
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AuthError::InvalidToken(format!("unknown user {}", claims.sub)))?;
    if !user.is_active {
        return Err(AuthError::InactiveUser.into());
    }

    tracing::debug!(user = %user.email, role = %user.role, "Authenticated");
    request.extensions_mut().insert(AuthUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Cookie first, then `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let mut legacy = None;
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            let Some((name, token)) = pair.trim().split_once('=') else { continue };
            if token.is_empty() {
                continue;
            }
            match name {
                TOKEN_COOKIE => return Some(token.to_string()),
                LEGACY_TOKEN_COOKIE => legacy = Some(token.to_string()),
                _ => {}
            }
        }
    }
    legacy
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
