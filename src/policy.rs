//! The single authorization gate. Every mutation in the authoring, lifecycle,
//! progress and rating modules goes through one of these predicates before
//! touching storage; nothing re-derives an ownership or role check at a call
//! site. A failed check is a typed `Forbidden`, never a silent no-op.

use crate::error::AppError;
use crate::lifecycle;
use crate::models::{Course, Role, User};

pub fn ensure_admin(actor: &User) -> Result<(), AppError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::forbidden("admin role required"))
    }
}

pub fn ensure_instructor(actor: &User) -> Result<(), AppError> {
    if actor.role == Role::Instructor {
        Ok(())
    } else {
        Err(AppError::forbidden("instructor role required"))
    }
}

pub fn ensure_student(actor: &User) -> Result<(), AppError> {
    if actor.role == Role::Student {
        Ok(())
    } else {
        Err(AppError::forbidden("student role required"))
    }
}

/// Content mutation and review submission belong to the owning instructor.
pub fn ensure_course_owner(actor: &User, course: &Course) -> Result<(), AppError> {
    if course.instructor_id == actor.id {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "only the instructor who owns this course may do this",
        ))
    }
}

/// Detail visibility: approved courses are public; anything else is visible
/// only to the owning instructor or an admin.
pub fn can_view_course(course: &Course, actor: Option<&User>) -> bool {
    if lifecycle::is_public(course.status) {
        return true;
    }
    actor.is_some_and(|u| u.id == course.instructor_id || u.role == Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseLevel, CourseStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            role,
            name: "t".into(),
            email: "t@example.com".into(),
            bio: None,
            profile_picture_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn course_of(instructor: &User, status: CourseStatus) -> Course {
        Course {
            id: Uuid::new_v4(),
            instructor_id: instructor.id,
            category_id: Uuid::new_v4(),
            title: "Intro".into(),
            description: String::new(),
            thumbnail_url: None,
            price: 0.0,
            level: CourseLevel::Beginner,
            status,
            rating: 0.0,
            rating_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn role_gates() {
        assert!(ensure_admin(&user(Role::Admin)).is_ok());
        assert!(ensure_admin(&user(Role::Instructor)).is_err());
        assert!(ensure_instructor(&user(Role::Instructor)).is_ok());
        assert!(ensure_instructor(&user(Role::Student)).is_err());
        assert!(ensure_student(&user(Role::Student)).is_ok());
        assert!(ensure_student(&user(Role::Admin)).is_err());
    }

    #[test]
    fn ownership_gate() {
        let owner = user(Role::Instructor);
        let other = user(Role::Instructor);
        let course = course_of(&owner, CourseStatus::Draft);
        assert!(ensure_course_owner(&owner, &course).is_ok());
        let err = ensure_course_owner(&other, &course).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn admins_do_not_bypass_ownership() {
        let owner = user(Role::Instructor);
        let admin = user(Role::Admin);
        let course = course_of(&owner, CourseStatus::Draft);
        assert!(ensure_course_owner(&admin, &course).is_err());
    }

    #[test]
    fn draft_courses_are_visible_to_owner_and_admin_only() {
        let owner = user(Role::Instructor);
        let admin = user(Role::Admin);
        let student = user(Role::Student);
        let draft = course_of(&owner, CourseStatus::Draft);

        assert!(!can_view_course(&draft, None));
        assert!(!can_view_course(&draft, Some(&student)));
        assert!(can_view_course(&draft, Some(&owner)));
        assert!(can_view_course(&draft, Some(&admin)));
    }

    #[test]
    fn approved_courses_are_visible_to_everyone() {
        let owner = user(Role::Instructor);
        let approved = course_of(&owner, CourseStatus::Approved);
        assert!(can_view_course(&approved, None));
    }
}
