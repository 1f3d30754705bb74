//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::jwt::JwtManager;
use crate::error::ApiError;

/// Roles allowed to call operator endpoints (sweep trigger, invariants)
pub const OPERATOR_ROLES: &[&str] = &["operator", "admin"];

/// Authenticated caller extracted from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_operator(&self) -> bool {
        OPERATOR_ROLES.contains(&self.role.as_str())
    }
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(String::from)
}

/// Middleware that requires a valid bearer token
///
/// Inserts an `AuthUser` extension for downstream handlers.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = extract_bearer_token(&request) else {
        tracing::warn!(path = %path, "require_auth: missing bearer token");
        return ApiError::Unauthorized.into_response();
    };

    let claims = match auth_state.jwt_manager.verify_token(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "require_auth: token rejected");
            return ApiError::Unauthorized.into_response();
        }
    };

    let Ok(user_id) = claims.sub.parse::<Uuid>() else {
        tracing::warn!(path = %path, sub = %claims.sub, "require_auth: malformed subject");
        return ApiError::Unauthorized.into_response();
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
    });
    next.run(request).await
}

/// Middleware that requires an operator role
///
/// Must run after `require_auth` so the `AuthUser` extension is present.
pub async fn require_operator(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_operator() => next.run(request).await,
        Some(user) => {
            tracing::warn!(
                user_id = %user.user_id,
                role = %user.role,
                "require_operator: insufficient role"
            );
            ApiError::Forbidden.into_response()
        }
        None => ApiError::Unauthorized.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_roles() {
        let operator = AuthUser {
            user_id: Uuid::new_v4(),
            role: "operator".to_string(),
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: "admin".to_string(),
        };
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: "user".to_string(),
        };
        assert!(operator.is_operator());
        assert!(admin.is_operator());
        assert!(!user.is_operator());
    }
}
