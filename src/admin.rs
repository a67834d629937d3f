//! User accounts and categories. Registration backs the auth collaborator's
//! signup flow; everything else here is admin-gated.

use uuid::Uuid;

use crate::db::Db;
use crate::error::{conflict_on_reference, conflict_on_unique, AppError};
use crate::models::{Category, CreateCategoryReq, RegisterUserReq, Role, User};
use crate::policy;

fn validate_registration(name: &str, email: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("a valid email address is required"));
    }
    Ok(())
}

pub async fn register_user(db: &Db, req: RegisterUserReq) -> Result<User, AppError> {
    validate_registration(&req.name, &req.email)?;
    let role = req.role.unwrap_or(Role::Student);

    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, role, name, email, bio, profile_picture_url) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(role)
    .bind(req.name.trim())
    .bind(req.email.trim())
    .bind(&req.bio)
    .bind(&req.profile_picture_url)
    .fetch_one(db)
    .await
    .map_err(|e| conflict_on_unique(e, "an account with this email already exists"))
}

pub async fn list_users(db: &Db, actor: &User) -> Result<Vec<User>, AppError> {
    policy::ensure_admin(actor)?;
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(db)
            .await?,
    )
}

/// Role is immutable outside this operation.
pub async fn change_role(
    db: &Db,
    actor: &User,
    user_id: Uuid,
    role: Role,
) -> Result<User, AppError> {
    policy::ensure_admin(actor)?;
    sqlx::query_as::<_, User>(
        "UPDATE users SET role = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(role)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("user"))
}

pub async fn remove_user(db: &Db, actor: &User, user_id: Uuid) -> Result<(), AppError> {
    policy::ensure_admin(actor)?;
    if actor.id == user_id {
        return Err(AppError::validation("admins cannot remove their own account"));
    }
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await
        .map_err(|e| conflict_on_reference(e, "user still owns courses"))?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }
    Ok(())
}

pub async fn list_categories(db: &Db) -> Result<Vec<Category>, AppError> {
    Ok(
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(db)
            .await?,
    )
}

pub async fn create_category(
    db: &Db,
    actor: &User,
    req: CreateCategoryReq,
) -> Result<Category, AppError> {
    policy::ensure_admin(actor)?;
    if req.name.trim().is_empty() {
        return Err(AppError::validation("category name must not be empty"));
    }
    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&req.description)
    .fetch_one(db)
    .await
    .map_err(|e| conflict_on_unique(e, "a category with this name already exists"))
}

pub async fn delete_category(db: &Db, actor: &User, category_id: Uuid) -> Result<(), AppError> {
    policy::ensure_admin(actor)?;
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(db)
        .await
        .map_err(|e| conflict_on_reference(e, "category is still used by courses"))?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("category"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_name_and_plausible_email() {
        assert!(validate_registration("Ada", "ada@example.com").is_ok());
        assert!(matches!(
            validate_registration("", "ada@example.com"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_registration("Ada", ""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_registration("Ada", "not-an-email"),
            Err(AppError::Validation(_))
        ));
    }
}
