//! Best-effort delivery of review outcomes to instructors via a webhook.
//! Delivery failure is logged and never rolls back the state transition that
//! triggered it.

use serde_json::json;
use std::env;

use crate::db::Db;
use crate::identity;
use crate::models::Course;

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook: Option<String>,
}

impl Notifier {
    pub fn from_env() -> Self {
        let webhook = env::var("NOTIFY_WEBHOOK_URL").ok();
        if webhook.is_none() {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, review notifications disabled");
        }
        Notifier {
            client: reqwest::Client::new(),
            webhook,
        }
    }

    /// Tell the owning instructor their course was approved, rejected or
    /// pulled. `reason` is present for rejections.
    pub async fn course_reviewed(&self, db: &Db, course: &Course, reason: Option<&str>) {
        let Some(url) = &self.webhook else {
            return;
        };
        let instructor = match identity::resolve(db, course.instructor_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(course_id = %course.id, error = %e, "skipping notification, instructor lookup failed");
                return;
            }
        };
        let payload = json!({
            "to": instructor.email,
            "course_id": course.id,
            "course_title": course.title,
            "status": course.status,
            "reason": reason,
        });
        if let Err(e) = self.client.post(url).json(&payload).send().await {
            tracing::warn!(course_id = %course.id, error = %e, "review notification failed");
        }
    }
}
