use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::db::Db;
use crate::error::AppError;
use crate::models::User;
use crate::routes::AppState;

/// Maps an authenticated principal to its profile row. `NotFound` here means
/// the profile does not exist yet (e.g. a mid-signup race); callers treat it
/// as "unauthenticated", never as a crash. No side effects.
pub async fn resolve(db: &Db, principal_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(principal_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// The acting principal, resolved from the `x-user-id` header the auth
/// collaborator sets. The id is trusted; role and ownership are re-verified
/// against the users table on every request.
pub struct Actor(pub User);

const PRINCIPAL_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;
        let principal_id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthenticated)?;
        match resolve(&state.db, principal_id).await {
            Ok(user) => Ok(Actor(user)),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthenticated),
            Err(other) => Err(other),
        }
    }
}
