//! Bearer-token authentication and the admin guard.
//!
//! `auth_middleware` verifies the token and stores a [`CurrentUser`] in the
//! request extensions; `admin_middleware` runs after it on admin and
//! analytics routes.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::EmployeeRole;
use crate::errors::{AppError, AppResult};

/// Caller identity taken from verified claims.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: EmployeeRole,
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = {
        let token = bearer_token(request.headers())?;
        state.services.auth().verify_token(token)?
    };

    let user = CurrentUser {
        id: claims.sub,
        role: claims.role(),
    };
    tracing::debug!(user_id = %user.id, role = %user.role, "Caller authenticated");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub async fn admin_middleware(request: Request, next: Next) -> AppResult<Response> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;
    require_admin(user)?;

    Ok(next.run(request).await)
}

pub fn require_admin(user: &CurrentUser) -> AppResult<()> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin role required"))
    }
}
