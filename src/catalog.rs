//! Listing reads. Every public listing goes through `catalog_query`, which is
//! the only place the visibility predicate is rendered into SQL; page
//! variants never re-derive it.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authoring;
use crate::db::Db;
use crate::error::AppError;
use crate::identity;
use crate::lifecycle;
use crate::models::{Course, CourseDetail, CourseLevel, CourseSummary, User};
use crate::policy;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceBand {
    Free,
    Paid,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogFilters {
    pub category: Option<Uuid>,
    pub price: Option<PriceBand>,
    pub level: Option<CourseLevel>,
    pub min_rating: Option<f64>,
    pub search: Option<String>,
}

fn catalog_query(filters: &CatalogFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT c.id, c.title, c.description, c.thumbnail_url, c.price, c.level, \
         round(c.rating::numeric, 1)::float8 AS rating, c.rating_count, \
         u.name AS instructor_name, cat.name AS category_name \
         FROM courses c \
         JOIN users u ON u.id = c.instructor_id \
         JOIN categories cat ON cat.id = c.category_id \
         WHERE c.status = ",
    );
    qb.push_bind(lifecycle::PUBLIC_STATUS);

    if let Some(category) = filters.category {
        qb.push(" AND c.category_id = ").push_bind(category);
    }
    match filters.price {
        Some(PriceBand::Free) => {
            qb.push(" AND c.price = 0");
        }
        Some(PriceBand::Paid) => {
            qb.push(" AND c.price > 0");
        }
        None => {}
    }
    if let Some(level) = filters.level {
        qb.push(" AND c.level = ").push_bind(level);
    }
    if let Some(min_rating) = filters.min_rating {
        qb.push(" AND c.rating >= ").push_bind(min_rating);
    }
    if let Some(keyword) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND c.title ILIKE ").push_bind(format!("%{keyword}%"));
    }
    qb.push(" ORDER BY c.created_at DESC");
    qb
}

pub async fn list_approved_courses(
    db: &Db,
    filters: CatalogFilters,
) -> Result<Vec<CourseSummary>, AppError> {
    let mut qb = catalog_query(&filters);
    Ok(qb.build_query_as::<CourseSummary>().fetch_all(db).await?)
}

/// Admin review queue, oldest submission first.
pub async fn list_pending_courses(db: &Db, actor: &User) -> Result<Vec<Course>, AppError> {
    policy::ensure_admin(actor)?;
    Ok(sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE status = 'pending' ORDER BY updated_at",
    )
    .fetch_all(db)
    .await?)
}

/// The instructor's own courses, every status included.
pub async fn list_my_courses(db: &Db, actor: &User) -> Result<Vec<Course>, AppError> {
    policy::ensure_instructor(actor)?;
    Ok(sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(db)
    .await?)
}

/// Full projection with nested sections and lessons. Non-public courses are
/// reported as absent rather than forbidden so their existence never leaks.
pub async fn get_course_detail(
    db: &Db,
    course_id: Uuid,
    actor: Option<&User>,
) -> Result<CourseDetail, AppError> {
    let course = authoring::fetch_course(db, course_id).await?;
    if !policy::can_view_course(&course, actor) {
        return Err(AppError::NotFound("course"));
    }

    let instructor = identity::resolve(db, course.instructor_id).await?;
    let category_name: String = sqlx::query_scalar("SELECT name FROM categories WHERE id = $1")
        .bind(course.category_id)
        .fetch_one(db)
        .await?;
    let sections = authoring::course_outline(db, course_id).await?;

    Ok(CourseDetail {
        id: course.id,
        title: course.title,
        description: course.description,
        thumbnail_url: course.thumbnail_url,
        price: course.price,
        level: course.level,
        status: course.status,
        rating: crate::rating::display_rating(course.rating),
        rating_count: course.rating_count,
        instructor_id: course.instructor_id,
        instructor_name: instructor.name,
        category_id: course.category_id,
        category_name,
        sections,
        created_at: course.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listing_is_filtered_to_public_status() {
        let sql = catalog_query(&CatalogFilters::default()).into_sql();
        assert!(sql.contains("WHERE c.status = $1"));
    }

    #[test]
    fn filters_compose_without_disturbing_the_status_gate() {
        let filters = CatalogFilters {
            category: Some(Uuid::new_v4()),
            price: Some(PriceBand::Paid),
            level: Some(CourseLevel::Advanced),
            min_rating: Some(4.0),
            search: Some("rust".into()),
        };
        let sql = catalog_query(&filters).into_sql();
        assert!(sql.contains("WHERE c.status = $1"));
        assert!(sql.contains("c.category_id = $2"));
        assert!(sql.contains("c.price > 0"));
        assert!(sql.contains("c.level = $3"));
        assert!(sql.contains("c.rating >= $4"));
        assert!(sql.contains("c.title ILIKE $5"));
    }

    #[test]
    fn free_band_matches_zero_price_only() {
        let filters = CatalogFilters {
            price: Some(PriceBand::Free),
            ..Default::default()
        };
        let sql = catalog_query(&filters).into_sql();
        assert!(sql.contains("c.price = 0"));
    }

    #[test]
    fn blank_keyword_is_ignored() {
        let filters = CatalogFilters {
            search: Some("   ".into()),
            ..Default::default()
        };
        let sql = catalog_query(&filters).into_sql();
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn results_are_newest_first() {
        let sql = catalog_query(&CatalogFilters::default()).into_sql();
        assert!(sql.ends_with("ORDER BY c.created_at DESC"));
    }
}
