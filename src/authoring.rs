//! Course, section and lesson authoring. Structural invariants live here:
//! sections carry a dense zero-based order per course, lessons per section,
//! both appended under a row lock so the count-then-insert cannot interleave.

use std::collections::HashMap;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{conflict_on_unique, AppError};
use crate::lifecycle;
use crate::models::{
    AddLessonReq, AddSectionReq, Category, Course, CreateCourseReq, Lesson, Section,
    SectionOutline, UpdateCourseReq, User,
};
use crate::policy;

pub async fn fetch_course(db: &Db, course_id: Uuid) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("course"))
}

async fn fetch_category(db: &Db, category_id: Uuid) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("category"))
}

fn validate_course_fields(title: &str, price: f64) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("course title must not be empty"));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("price must be zero or positive"));
    }
    Ok(())
}

pub async fn create_course(db: &Db, actor: &User, req: CreateCourseReq) -> Result<Course, AppError> {
    policy::ensure_instructor(actor)?;
    validate_course_fields(&req.title, req.price)?;
    if fetch_category(db, req.category_id).await.is_err() {
        return Err(AppError::validation("category does not exist"));
    }

    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO courses (id, instructor_id, category_id, title, description, \
         thumbnail_url, price, level, status, rating, rating_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'draft', 0, 0) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(req.category_id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&req.thumbnail_url)
    .bind(req.price)
    .bind(req.level)
    .fetch_one(db)
    .await?;

    tracing::info!(course_id = %course.id, instructor_id = %actor.id, "course created");
    Ok(course)
}

/// Content edits by the owning instructor, draft only. Absent fields keep
/// their current value.
pub async fn update_course(
    db: &Db,
    actor: &User,
    course_id: Uuid,
    req: UpdateCourseReq,
) -> Result<Course, AppError> {
    let course = fetch_course(db, course_id).await?;
    policy::ensure_course_owner(actor, &course)?;
    lifecycle::ensure_editable(&course)?;

    let title = req.title.unwrap_or(course.title);
    let description = req.description.unwrap_or(course.description);
    let category_id = req.category_id.unwrap_or(course.category_id);
    let price = req.price.unwrap_or(course.price);
    let level = req.level.unwrap_or(course.level);
    let thumbnail_url = req.thumbnail_url.or(course.thumbnail_url);

    validate_course_fields(&title, price)?;
    if category_id != course.category_id && fetch_category(db, category_id).await.is_err() {
        return Err(AppError::validation("category does not exist"));
    }

    Ok(sqlx::query_as::<_, Course>(
        "UPDATE courses SET title = $1, description = $2, category_id = $3, price = $4, \
         level = $5, thumbnail_url = $6, updated_at = now() WHERE id = $7 RETURNING *",
    )
    .bind(title.trim())
    .bind(description)
    .bind(category_id)
    .bind(price)
    .bind(level)
    .bind(thumbnail_url)
    .bind(course_id)
    .fetch_one(db)
    .await?)
}

pub async fn add_section(
    db: &Db,
    actor: &User,
    course_id: Uuid,
    req: AddSectionReq,
) -> Result<Section, AppError> {
    let course = fetch_course(db, course_id).await?;
    policy::ensure_course_owner(actor, &course)?;
    lifecycle::ensure_editable(&course)?;
    if req.title.trim().is_empty() {
        return Err(AppError::validation("section title must not be empty"));
    }

    let mut tx = db.begin().await?;
    // Serializes appends so order_index stays dense; a racing insert that
    // slips past anyway trips the (course_id, order_index) constraint.
    sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM course_sections WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;
    let section = sqlx::query_as::<_, Section>(
        "INSERT INTO course_sections (id, course_id, title, order_index) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(course_id)
    .bind(req.title.trim())
    .bind(count as i32)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "a section with this position already exists"))?;
    tx.commit().await?;
    Ok(section)
}

pub async fn add_lesson(
    db: &Db,
    actor: &User,
    section_id: Uuid,
    req: AddLessonReq,
) -> Result<Lesson, AppError> {
    let section = sqlx::query_as::<_, Section>("SELECT * FROM course_sections WHERE id = $1")
        .bind(section_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("section"))?;
    // Ownership and state resolve transitively through the section's course.
    let course = fetch_course(db, section.course_id).await?;
    policy::ensure_course_owner(actor, &course)?;
    lifecycle::ensure_editable(&course)?;
    if req.title.trim().is_empty() {
        return Err(AppError::validation("lesson title must not be empty"));
    }

    let mut tx = db.begin().await?;
    sqlx::query("SELECT id FROM course_sections WHERE id = $1 FOR UPDATE")
        .bind(section_id)
        .execute(&mut *tx)
        .await?;
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM course_lessons WHERE section_id = $1")
            .bind(section_id)
            .fetch_one(&mut *tx)
            .await?;
    let lesson = sqlx::query_as::<_, Lesson>(
        "INSERT INTO course_lessons (id, section_id, title, video_url, order_index) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(section_id)
    .bind(req.title.trim())
    .bind(&req.video_url)
    .bind(count as i32)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "a lesson with this position already exists"))?;
    tx.commit().await?;
    Ok(lesson)
}

/// Sections with their lessons, both ascending by order_index. Curriculum
/// display and player navigation depend on this ordering.
pub async fn course_outline(db: &Db, course_id: Uuid) -> Result<Vec<SectionOutline>, AppError> {
    let sections = sqlx::query_as::<_, Section>(
        "SELECT * FROM course_sections WHERE course_id = $1 ORDER BY order_index",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let lessons = sqlx::query_as::<_, Lesson>(
        "SELECT l.* FROM course_lessons l \
         JOIN course_sections s ON s.id = l.section_id \
         WHERE s.course_id = $1 ORDER BY l.order_index",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let mut outline: Vec<SectionOutline> = sections
        .into_iter()
        .map(|s| SectionOutline {
            id: s.id,
            title: s.title,
            order_index: s.order_index,
            lessons: Vec::new(),
        })
        .collect();
    let slots: HashMap<Uuid, usize> = outline
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i))
        .collect();
    for lesson in lessons {
        if let Some(&i) = slots.get(&lesson.section_id) {
            outline[i].lessons.push(lesson);
        }
    }
    Ok(outline)
}

/// (section count, total lesson count) for the submit-for-review gate.
pub async fn curriculum_counts(db: &Db, course_id: Uuid) -> Result<(i64, i64), AppError> {
    let counts: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(DISTINCT s.id), COUNT(l.id) FROM course_sections s \
         LEFT JOIN course_lessons l ON l.section_id = s.id \
         WHERE s.course_id = $1",
    )
    .bind(course_id)
    .fetch_one(db)
    .await?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_must_be_non_blank() {
        assert!(validate_course_fields("Intro to Rust", 0.0).is_ok());
        assert!(matches!(
            validate_course_fields("", 0.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_course_fields("   ", 0.0),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn price_must_be_zero_or_positive() {
        assert!(validate_course_fields("ok", 49.99).is_ok());
        assert!(validate_course_fields("ok", 0.0).is_ok());
        assert!(matches!(
            validate_course_fields("ok", -1.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_course_fields("ok", f64::NAN),
            Err(AppError::Validation(_))
        ));
    }
}
