//! Review upsert and the course-level rating aggregate. A resubmission by the
//! same student replaces the prior review; the course's `rating` and
//! `rating_count` are recomputed from the full review set in the same
//! transaction as the upsert, under a lock on the course row.

use uuid::Uuid;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Review, ReviewWithAuthor, SubmitReviewReq, User};
use crate::policy;

/// Stored ratings keep full precision; one decimal is a display concern.
pub fn display_rating(raw: f64) -> f64 {
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
}

pub async fn submit_review(
    db: &Db,
    actor: &User,
    course_id: Uuid,
    req: SubmitReviewReq,
) -> Result<Review, AppError> {
    policy::ensure_student(actor)?;
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::validation("rating must be between 1 and 5"));
    }
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::validation("write something before submitting a review"));
    }

    let enrolled: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(actor.id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;
    if enrolled.is_none() {
        return Err(AppError::forbidden(
            "only enrolled students may review a course",
        ));
    }

    let mut tx = db.begin().await?;
    // Lock the aggregate's owner so concurrent upserts recompute in sequence.
    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(AppError::NotFound("course"));
    }

    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, course_id, student_id, rating, review_text) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (course_id, student_id) DO UPDATE \
         SET rating = EXCLUDED.rating, review_text = EXCLUDED.review_text, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(course_id)
    .bind(actor.id)
    .bind(req.rating)
    .bind(text)
    .fetch_one(&mut *tx)
    .await?;

    let (mean, count): (f64, i64) = sqlx::query_as(
        "SELECT COALESCE(AVG(rating::float8), 0::float8), COUNT(*) \
         FROM reviews WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("UPDATE courses SET rating = $1, rating_count = $2, updated_at = now() WHERE id = $3")
        .bind(mean)
        .bind(count as i32)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(course_id = %course_id, student_id = %actor.id, rating = req.rating, "review upserted");
    Ok(review)
}

pub async fn list_reviews(db: &Db, course_id: Uuid) -> Result<Vec<ReviewWithAuthor>, AppError> {
    Ok(sqlx::query_as::<_, ReviewWithAuthor>(
        "SELECT r.id, r.rating, r.review_text, u.name AS student_name, r.created_at \
         FROM reviews r JOIN users u ON u.id = r.student_id \
         WHERE r.course_id = $1 ORDER BY r.created_at DESC",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_no_reviews_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn mean_is_arithmetic() {
        assert_eq!(mean_rating(&[4]), 4.0);
        assert_eq!(mean_rating(&[4, 5]), 4.5);
        assert_eq!(mean_rating(&[1, 2, 3, 4, 5]), 3.0);
    }

    #[test]
    fn display_rounds_to_one_decimal() {
        assert_eq!(display_rating(mean_rating(&[3, 4, 4])), 3.7);
        assert_eq!(display_rating(mean_rating(&[4, 5])), 4.5);
        assert_eq!(display_rating(4.0), 4.0);
        assert_eq!(display_rating(4.449), 4.4);
        assert_eq!(display_rating(4.45), 4.5);
    }

    #[test]
    fn full_precision_survives_until_display() {
        let raw = mean_rating(&[3, 4, 4]);
        assert!(raw > 3.66 && raw < 3.67);
        assert_eq!(display_rating(raw), 3.7);
    }
}
