//! Course lifecycle state machine: draft -> pending -> approved | rejected,
//! with rejected -> draft for revision and an admin-only approved -> rejected
//! override. The transition table is pure; the service functions wrap it with
//! the policy gate and an optimistic status guard on the UPDATE.

use uuid::Uuid;

use crate::authoring;
use crate::db::Db;
use crate::error::AppError;
use crate::models::{Course, CourseStatus, User};
use crate::notify::Notifier;
use crate::policy;

/// The one catalog-visibility rule in the system: a course is public iff it
/// carries this status. Every listing read binds this constant.
pub const PUBLIC_STATUS: CourseStatus = CourseStatus::Approved;

pub fn is_public(status: CourseStatus) -> bool {
    status == PUBLIC_STATUS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve,
    Reject,
    Revise,
    Revert,
}

impl Transition {
    fn verb(&self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Revise => "revise",
            Transition::Revert => "revert",
        }
    }
}

pub fn next_status(current: CourseStatus, transition: Transition) -> Result<CourseStatus, AppError> {
    use CourseStatus::*;
    use Transition::*;
    match (current, transition) {
        (Draft, Submit) => Ok(Pending),
        (Pending, Approve) => Ok(Approved),
        (Pending, Reject) => Ok(Rejected),
        (Rejected, Revise) => Ok(Draft),
        (Approved, Revert) => Ok(Rejected),
        (state, t) => Err(AppError::invalid_state(format!(
            "cannot {} a course in {} status",
            t.verb(),
            state.as_str()
        ))),
    }
}

/// Structural edits are only legal in draft; changing content under review or
/// live would silently alter what was approved.
pub fn ensure_editable(course: &Course) -> Result<(), AppError> {
    if course.status == CourseStatus::Draft {
        Ok(())
    } else {
        Err(AppError::invalid_state(format!(
            "course content can only be edited in draft status, not {}",
            course.status.as_str()
        )))
    }
}

/// The UPDATE re-checks the expected status so two racing transitions cannot
/// both win; the loser sees zero rows and reports `InvalidState`.
async fn transition_guarded(
    db: &Db,
    course_id: Uuid,
    from: CourseStatus,
    to: CourseStatus,
) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(
        "UPDATE courses SET status = $1, updated_at = now() \
         WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to)
    .bind(course_id)
    .bind(from)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::invalid_state("course status changed concurrently, re-fetch and retry"))
}

pub async fn submit_for_review(db: &Db, actor: &User, course_id: Uuid) -> Result<Course, AppError> {
    let course = authoring::fetch_course(db, course_id).await?;
    policy::ensure_course_owner(actor, &course)?;
    let next = next_status(course.status, Transition::Submit)?;

    let (sections, lessons) = authoring::curriculum_counts(db, course_id).await?;
    if sections == 0 || lessons == 0 {
        return Err(AppError::validation(
            "a course needs at least one section and one lesson before it can be reviewed",
        ));
    }

    let course = transition_guarded(db, course_id, CourseStatus::Draft, next).await?;
    tracing::info!(course_id = %course.id, "course submitted for review");
    Ok(course)
}

pub async fn approve(
    db: &Db,
    notifier: &Notifier,
    actor: &User,
    course_id: Uuid,
) -> Result<Course, AppError> {
    policy::ensure_admin(actor)?;
    let course = authoring::fetch_course(db, course_id).await?;
    let next = next_status(course.status, Transition::Approve)?;
    let course = transition_guarded(db, course_id, CourseStatus::Pending, next).await?;
    tracing::info!(course_id = %course.id, "course approved");
    notifier.course_reviewed(db, &course, None).await;
    Ok(course)
}

pub async fn reject(
    db: &Db,
    notifier: &Notifier,
    actor: &User,
    course_id: Uuid,
    reason: &str,
) -> Result<Course, AppError> {
    policy::ensure_admin(actor)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("a rejection reason is required"));
    }
    let course = authoring::fetch_course(db, course_id).await?;
    let next = next_status(course.status, Transition::Reject)?;
    let course = transition_guarded(db, course_id, CourseStatus::Pending, next).await?;
    tracing::info!(course_id = %course.id, "course rejected");
    notifier.course_reviewed(db, &course, Some(reason)).await;
    Ok(course)
}

/// rejected -> draft: the instructor takes the course back to fix it up.
pub async fn revise(db: &Db, actor: &User, course_id: Uuid) -> Result<Course, AppError> {
    let course = authoring::fetch_course(db, course_id).await?;
    policy::ensure_course_owner(actor, &course)?;
    let next = next_status(course.status, Transition::Revise)?;
    transition_guarded(db, course_id, CourseStatus::Rejected, next).await
}

/// approved -> rejected: admin override for pulling a live course. Kept as a
/// separate operation so the ordinary reject keeps its pending-only guard.
pub async fn revert(
    db: &Db,
    notifier: &Notifier,
    actor: &User,
    course_id: Uuid,
    reason: &str,
) -> Result<Course, AppError> {
    policy::ensure_admin(actor)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("a reason is required to pull an approved course"));
    }
    let course = authoring::fetch_course(db, course_id).await?;
    let next = next_status(course.status, Transition::Revert)?;
    let course = transition_guarded(db, course_id, CourseStatus::Approved, next).await?;
    tracing::warn!(course_id = %course.id, "approved course reverted to rejected");
    notifier.course_reviewed(db, &course, Some(reason)).await;
    Ok(course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use CourseStatus::*;
    use Transition::*;

    #[test]
    fn happy_path_transitions() {
        assert_eq!(next_status(Draft, Submit).unwrap(), Pending);
        assert_eq!(next_status(Pending, Approve).unwrap(), Approved);
        assert_eq!(next_status(Pending, Reject).unwrap(), Rejected);
    }

    #[test]
    fn revision_loop() {
        assert_eq!(next_status(Rejected, Revise).unwrap(), Draft);
        assert_eq!(next_status(Draft, Submit).unwrap(), Pending);
    }

    #[test]
    fn admin_override_pulls_approved_courses() {
        assert_eq!(next_status(Approved, Revert).unwrap(), Rejected);
        // ...but the ordinary reject stays pending-only.
        assert!(next_status(Approved, Reject).is_err());
    }

    #[test]
    fn illegal_transitions_are_invalid_state() {
        for (state, t) in [
            (Pending, Submit),
            (Approved, Submit),
            (Rejected, Submit),
            (Draft, Approve),
            (Rejected, Approve),
            (Approved, Approve),
            (Draft, Reject),
            (Rejected, Reject),
            (Draft, Revise),
            (Pending, Revise),
            (Approved, Revise),
            (Draft, Revert),
            (Pending, Revert),
            (Rejected, Revert),
        ] {
            let err = next_status(state, t).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)), "{state:?} {t:?}");
        }
    }

    #[test]
    fn only_approved_is_public() {
        assert!(is_public(Approved));
        assert!(!is_public(Draft));
        assert!(!is_public(Pending));
        assert!(!is_public(Rejected));
    }
}
