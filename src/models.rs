use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "course_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Pending => "pending",
            CourseStatus::Approved => "approved",
            CourseStatus::Rejected => "rejected",
        }
    }
}

// Variant names match the Postgres enum labels exactly ('Beginner', ...).
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "course_level")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub price: f64,
    pub level: CourseLevel,
    pub status: CourseStatus,
    /// Stored at full precision; listing reads round to one decimal.
    pub rating: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Section {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub video_url: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub progress_percent: i32,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Review {
    pub id: Uuid,
    pub course_id: Uuid,
    pub student_id: Uuid,
    pub rating: i32,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- request payloads ---

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterUserReq {
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangeRoleReq {
    pub role: Role,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateCategoryReq {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateCourseReq {
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: f64,
    pub level: CourseLevel,
    pub thumbnail_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateCourseReq {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<f64>,
    pub level: Option<CourseLevel>,
    pub thumbnail_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddSectionReq {
    pub title: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddLessonReq {
    pub title: String,
    pub video_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RejectReq {
    pub reason: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmitReviewReq {
    pub rating: i32,
    pub text: String,
}

// --- read projections ---

/// One row of the public catalog; `rating` is already rounded for display.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub price: f64,
    pub level: CourseLevel,
    pub rating: f64,
    pub rating_count: i32,
    pub instructor_name: String,
    pub category_name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct SectionOutline {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub price: f64,
    pub level: CourseLevel,
    pub status: CourseStatus,
    pub rating: f64,
    pub rating_count: i32,
    pub instructor_id: Uuid,
    pub instructor_name: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub sections: Vec<SectionOutline>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProgressReport {
    pub course_id: Uuid,
    pub progress_percent: i32,
    pub total_lessons: i64,
    pub completed_lesson_ids: Vec<Uuid>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub rating: i32,
    pub review_text: String,
    pub student_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct EnrolledCourse {
    pub course_id: Uuid,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub level: CourseLevel,
    pub progress_percent: i32,
    pub enrolled_at: DateTime<Utc>,
}
