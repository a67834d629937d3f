use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::catalog::CatalogFilters;
use crate::db::Db;
use crate::error::AppError;
use crate::identity::Actor;
use crate::models::*;
use crate::notify::Notifier;
use crate::{admin, authoring, catalog, lifecycle, progress, rating};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub notifier: Notifier,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // accounts & categories
        .route("/api/users", post(register_user).get(list_users))
        .route("/api/users/me", get(me))
        .route("/api/users/:id/role", put(change_role))
        .route("/api/users/:id", delete(remove_user))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/:id", delete(delete_category))
        // authoring
        .route("/api/courses", post(create_course).get(list_courses))
        .route("/api/courses/mine", get(list_my_courses))
        .route("/api/courses/pending", get(list_pending_courses))
        .route("/api/courses/:id", get(course_detail).put(update_course))
        .route("/api/courses/:id/sections", post(add_section))
        .route("/api/sections/:id/lessons", post(add_lesson))
        // lifecycle
        .route("/api/courses/:id/submit", post(submit_for_review))
        .route("/api/courses/:id/approve", post(approve))
        .route("/api/courses/:id/reject", post(reject))
        .route("/api/courses/:id/revise", post(revise))
        .route("/api/courses/:id/revert", post(revert))
        // enrollment & progress
        .route("/api/courses/:id/enroll", post(enroll))
        .route("/api/courses/:id/progress", get(course_progress))
        .route("/api/lessons/:id/complete", post(mark_lesson_complete))
        .route("/api/enrollments", get(list_my_enrollments))
        // reviews
        .route(
            "/api/courses/:id/reviews",
            post(submit_review).get(list_reviews),
        )
        .with_state(state)
}

// --- accounts & categories ---

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserReq>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = admin::register_user(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn me(actor: Actor) -> Json<User> {
    Json(actor.0)
}

async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(admin::list_users(&state.db, &actor.0).await?))
}

async fn change_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ChangeRoleReq>,
) -> Result<Json<User>, AppError> {
    Ok(Json(
        admin::change_role(&state.db, &actor.0, user_id, req.role).await?,
    ))
}

async fn remove_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin::remove_user(&state.db, &actor.0, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(admin::list_categories(&state.db).await?))
}

async fn create_category(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateCategoryReq>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = admin::create_category(&state.db, &actor.0, req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    actor: Actor,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin::delete_category(&state.db, &actor.0, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- authoring ---

async fn create_course(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateCourseReq>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = authoring::create_course(&state.db, &actor.0, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(filters): Query<CatalogFilters>,
) -> Result<Json<Vec<CourseSummary>>, AppError> {
    Ok(Json(
        catalog::list_approved_courses(&state.db, filters).await?,
    ))
}

async fn list_my_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(catalog::list_my_courses(&state.db, &actor.0).await?))
}

async fn list_pending_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(
        catalog::list_pending_courses(&state.db, &actor.0).await?,
    ))
}

async fn course_detail(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseDetail>, AppError> {
    let viewer = actor.as_ref().map(|a| &a.0);
    Ok(Json(
        catalog::get_course_detail(&state.db, course_id, viewer).await?,
    ))
}

async fn update_course(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
    Json(req): Json<UpdateCourseReq>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        authoring::update_course(&state.db, &actor.0, course_id, req).await?,
    ))
}

async fn add_section(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
    Json(req): Json<AddSectionReq>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let section = authoring::add_section(&state.db, &actor.0, course_id, req).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

async fn add_lesson(
    State(state): State<AppState>,
    actor: Actor,
    Path(section_id): Path<Uuid>,
    Json(req): Json<AddLessonReq>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = authoring::add_lesson(&state.db, &actor.0, section_id, req).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

// --- lifecycle ---

async fn submit_for_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        lifecycle::submit_for_review(&state.db, &actor.0, course_id).await?,
    ))
}

async fn approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        lifecycle::approve(&state.db, &state.notifier, &actor.0, course_id).await?,
    ))
}

async fn reject(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
    Json(req): Json<RejectReq>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        lifecycle::reject(&state.db, &state.notifier, &actor.0, course_id, &req.reason).await?,
    ))
}

async fn revise(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        lifecycle::revise(&state.db, &actor.0, course_id).await?,
    ))
}

async fn revert(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
    Json(req): Json<RejectReq>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(
        lifecycle::revert(&state.db, &state.notifier, &actor.0, course_id, &req.reason).await?,
    ))
}

// --- enrollment & progress ---

async fn enroll(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = progress::enroll(&state.db, &actor.0, course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn course_progress(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ProgressReport>, AppError> {
    Ok(Json(
        progress::get_course_progress(&state.db, &actor.0, course_id).await?,
    ))
}

async fn mark_lesson_complete(
    State(state): State<AppState>,
    actor: Actor,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<Enrollment>, AppError> {
    Ok(Json(
        progress::mark_lesson_complete(&state.db, &actor.0, lesson_id).await?,
    ))
}

async fn list_my_enrollments(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<EnrolledCourse>>, AppError> {
    Ok(Json(
        progress::list_my_enrollments(&state.db, &actor.0).await?,
    ))
}

// --- reviews ---

async fn submit_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
    Json(req): Json<SubmitReviewReq>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = rating::submit_review(&state.db, &actor.0, course_id, req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewWithAuthor>>, AppError> {
    Ok(Json(rating::list_reviews(&state.db, course_id).await?))
}
