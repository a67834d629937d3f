//! Enrollment and per-lesson completion. The stored `progress_percent` is a
//! derived aggregate: it is recomputed inside the same transaction as the
//! completion fact that changed it, under a row lock on the enrollment, so
//! two concurrent completions can never both recompute from a stale snapshot.

use uuid::Uuid;

use crate::authoring;
use crate::db::Db;
use crate::error::{conflict_on_unique, AppError};
use crate::lifecycle;
use crate::models::{Course, EnrolledCourse, Enrollment, ProgressReport, User};
use crate::policy;

/// round(100 * completed / total); a course with zero lessons is 0% by
/// convention, never a division error.
pub fn progress_percent(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i32
}

pub async fn enroll(db: &Db, actor: &User, course_id: Uuid) -> Result<Enrollment, AppError> {
    policy::ensure_student(actor)?;
    let course = authoring::fetch_course(db, course_id).await?;
    if !lifecycle::is_public(course.status) {
        return Err(AppError::invalid_state(
            "enrollment is only open for approved courses",
        ));
    }

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (id, student_id, course_id, progress_percent) \
         VALUES ($1, $2, $3, 0) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(course_id)
    .fetch_one(db)
    .await
    .map_err(|e| conflict_on_unique(e, "already enrolled in this course"))?;

    tracing::info!(student_id = %actor.id, course_id = %course_id, "student enrolled");
    Ok(enrollment)
}

async fn course_owning_lesson(db: &Db, lesson_id: Uuid) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(
        "SELECT c.* FROM courses c \
         JOIN course_sections s ON s.course_id = c.id \
         JOIN course_lessons l ON l.section_id = s.id \
         WHERE l.id = $1",
    )
    .bind(lesson_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("lesson"))
}

/// Idempotent: marking the same lesson twice leaves one progress row and the
/// same percentage. Only lessons still reachable from the course count;
/// orphaned progress rows are excluded by the join.
pub async fn mark_lesson_complete(
    db: &Db,
    actor: &User,
    lesson_id: Uuid,
) -> Result<Enrollment, AppError> {
    policy::ensure_student(actor)?;
    let course = course_owning_lesson(db, lesson_id).await?;

    let mut tx = db.begin().await?;
    // The lock also proves the enrollment exists.
    let enrollment_id: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2 FOR UPDATE",
    )
    .bind(actor.id)
    .bind(course.id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(enrollment_id) = enrollment_id else {
        return Err(AppError::forbidden(
            "enroll in the course before tracking progress",
        ));
    };

    sqlx::query(
        "INSERT INTO lesson_progress (student_id, lesson_id, is_completed, completed_at) \
         VALUES ($1, $2, TRUE, now()) \
         ON CONFLICT (student_id, lesson_id) DO UPDATE \
         SET is_completed = TRUE, \
             completed_at = COALESCE(lesson_progress.completed_at, now())",
    )
    .bind(actor.id)
    .bind(lesson_id)
    .execute(&mut *tx)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM course_lessons l \
         JOIN course_sections s ON s.id = l.section_id WHERE s.course_id = $1",
    )
    .bind(course.id)
    .fetch_one(&mut *tx)
    .await?;
    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM lesson_progress p \
         JOIN course_lessons l ON l.id = p.lesson_id \
         JOIN course_sections s ON s.id = l.section_id \
         WHERE s.course_id = $1 AND p.student_id = $2 AND p.is_completed",
    )
    .bind(course.id)
    .bind(actor.id)
    .fetch_one(&mut *tx)
    .await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "UPDATE enrollments SET progress_percent = $1 WHERE id = $2 RETURNING *",
    )
    .bind(progress_percent(completed, total))
    .bind(enrollment_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(enrollment)
}

pub async fn get_course_progress(
    db: &Db,
    actor: &User,
    course_id: Uuid,
) -> Result<ProgressReport, AppError> {
    policy::ensure_student(actor)?;
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(actor.id)
    .bind(course_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::forbidden("not enrolled in this course"))?;

    let total_lessons: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM course_lessons l \
         JOIN course_sections s ON s.id = l.section_id WHERE s.course_id = $1",
    )
    .bind(course_id)
    .fetch_one(db)
    .await?;
    let completed_lesson_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT l.id FROM lesson_progress p \
         JOIN course_lessons l ON l.id = p.lesson_id \
         JOIN course_sections s ON s.id = l.section_id \
         WHERE s.course_id = $1 AND p.student_id = $2 AND p.is_completed \
         ORDER BY s.order_index, l.order_index",
    )
    .bind(course_id)
    .bind(actor.id)
    .fetch_all(db)
    .await?;

    Ok(ProgressReport {
        course_id,
        progress_percent: enrollment.progress_percent,
        total_lessons,
        completed_lesson_ids,
    })
}

/// Student dashboard: enrolled courses with their stored progress.
pub async fn list_my_enrollments(db: &Db, actor: &User) -> Result<Vec<EnrolledCourse>, AppError> {
    policy::ensure_student(actor)?;
    Ok(sqlx::query_as::<_, EnrolledCourse>(
        "SELECT c.id AS course_id, c.title, c.thumbnail_url, c.level, \
         e.progress_percent, e.enrolled_at \
         FROM enrollments e JOIN courses c ON c.id = e.course_id \
         WHERE e.student_id = $1 ORDER BY e.enrolled_at DESC",
    )
    .bind(actor.id)
    .fetch_all(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_lessons_is_zero_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(3, 0), 0);
    }

    #[test]
    fn whole_fractions() {
        assert_eq!(progress_percent(0, 4), 0);
        assert_eq!(progress_percent(1, 2), 50);
        assert_eq!(progress_percent(2, 2), 100);
    }

    #[test]
    fn rounding_matches_the_player_display() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 6), 17);
        assert_eq!(progress_percent(1, 8), 13); // 12.5 rounds half away from zero
    }

    #[test]
    fn completing_every_lesson_is_exactly_one_hundred() {
        for n in 1..=20 {
            assert_eq!(progress_percent(n, n), 100);
        }
    }
}
