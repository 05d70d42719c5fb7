//! Best-effort outbound email through an HTTP mail API.
//!
//! Delivery is a side channel: callers never await it inline. Each message
//! is handed to a spawned task that retries a few times and logs a
//! dead-letter error if every attempt fails. Persistence outcomes are never
//! tied to delivery.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use serde::Serialize;

use crate::models::Submission;

const MAIL_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Outcome of a successful `send` call: the mail API either accepted the
/// message or delivery is disabled and the message was dropped on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

pub struct Mailer {
    http: reqwest::Client,
    api_url: Option<String>,
    api_token: String,
    from: String,
}

impl Mailer {
    pub fn new(api_url: Option<String>, api_token: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_token,
            from,
        }
    }

    /// Single delivery attempt. Non-2xx answers count as failures.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<Delivery> {
        let Some(api_url) = &self.api_url else {
            return Ok(Delivery::Skipped);
        };

        let resp = self
            .http
            .post(api_url)
            .bearer_auth(&self.api_token)
            .json(&MailRequest {
                from: &self.from,
                to,
                subject,
                html,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("mail API responded {}", resp.status());
        }

        Ok(Delivery::Sent)
    }
}

/// Queue one message for delivery with a bounded retry policy.
pub fn spawn_send(mailer: Arc<Mailer>, to: String, subject: String, html: String) {
    tokio::spawn(async move {
        for attempt in 1..=MAIL_ATTEMPTS {
            match mailer.send(&to, &subject, &html).await {
                Ok(Delivery::Sent) => {
                    tracing::info!(to = %to, subject = %subject, "email sent");
                    return;
                }
                Ok(Delivery::Skipped) => {
                    tracing::debug!(to = %to, subject = %subject, "mail delivery disabled, message dropped");
                    return;
                }
                Err(err) if attempt < MAIL_ATTEMPTS => {
                    tracing::warn!(to = %to, attempt, error = %err, "email attempt failed");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => {
                    // Dead letter: give up and leave a trace for operators.
                    tracing::error!(to = %to, subject = %subject, error = %err, "email undeliverable");
                }
            }
        }
    });
}

/// Fire the two create-time notifications: a receipt to the submitter and
/// an alert to the fixed admin address.
pub fn notify_created(mailer: &Arc<Mailer>, submission: &Submission, admin_email: &str) {
    let (subject, html) = receipt_email(submission);
    spawn_send(mailer.clone(), submission.email.clone(), subject, html);

    let (subject, html) = admin_alert_email(submission);
    spawn_send(mailer.clone(), admin_email.to_string(), subject, html);
}

/// Forward admin notes to the submitter.
pub fn notify_notes(mailer: &Arc<Mailer>, submission: &Submission, notes: &str) {
    let (subject, html) = notes_email(submission, notes);
    spawn_send(mailer.clone(), submission.email.clone(), subject, html);
}

pub fn receipt_email(submission: &Submission) -> (String, String) {
    let subject = format!("تم استقبال مشاركتك: {}", submission.title);
    let html = format!(
        r#"<div dir="rtl">
  <h2>تم استقبال مشاركتك بنجاح ✓</h2>
  <p>شكراً لك على مشاركتك القيمة. تم استقبال مشاركتك وسيتم مراجعتها قريباً.</p>
  <h3>تفاصيل المشاركة:</h3>
  <p><strong>الموضوع:</strong> {title}</p>
  <p><strong>النوع:</strong> {kind}</p>
  <p><strong>الجامعة:</strong> {university}</p>
  <p><strong>تاريخ الإرسال:</strong> {date}</p>
  <p>سيتم التواصل معك عبر البريد الإلكتروني: <strong>{email}</strong></p>
</div>"#,
        title = submission.title,
        kind = submission.kind.display_name(),
        university = submission.university.display_name(),
        date = submission.created_at.format("%Y-%m-%d"),
        email = submission.email,
    );
    (subject, html)
}

pub fn admin_alert_email(submission: &Submission) -> (String, String) {
    let subject = format!("مشاركة جديدة: {}", submission.title);
    let html = format!(
        r#"<div dir="rtl">
  <h2>مشاركة جديدة وردت</h2>
  <p><strong>الاسم:</strong> {name}</p>
  <p><strong>الجامعة:</strong> {university}</p>
  <p><strong>الكلية:</strong> {faculty}</p>
  <p><strong>البريد:</strong> {email}</p>
  <p><strong>النوع:</strong> {kind}</p>
  <p><strong>الموضوع:</strong> {title}</p>
  <p><strong>التفاصيل:</strong> {content}</p>
</div>"#,
        name = submission.student_name,
        university = submission.university.display_name(),
        faculty = submission.faculty,
        email = submission.email,
        kind = submission.kind.as_str(),
        title = submission.title,
        content = submission.content,
    );
    (subject, html)
}

pub fn notes_email(submission: &Submission, notes: &str) -> (String, String) {
    let subject = format!("رد على مشاركتك: {}", submission.title);
    let html = format!(
        r#"<div dir="rtl">
  <h2>ملاحظات الإدارة على مشاركتك</h2>
  <p><strong>الموضوع:</strong> {title}</p>
  <p>{notes}</p>
</div>"#,
        title = submission.title,
        notes = notes,
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmissionKind, SubmissionStatus, University};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_submission() -> Submission {
        Submission {
            id: Uuid::new_v4(),
            student_name: "Ali".to_string(),
            student_id: "123".to_string(),
            faculty: "Eng".to_string(),
            year: "3".to_string(),
            email: "ali@x.com".to_string(),
            kind: SubmissionKind::Suggestion,
            title: "More seats".to_string(),
            content: "We need more seats in the library".to_string(),
            university: University::Government,
            status: SubmissionStatus::Pending,
            admin_notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn receipt_carries_submission_details() {
        let (subject, html) = receipt_email(&sample_submission());
        assert!(subject.contains("More seats"));
        assert!(html.contains("اقتراح"));
        assert!(html.contains("جامعة حلوان الحكومية"));
        assert!(html.contains("ali@x.com"));
    }

    #[test]
    fn admin_alert_carries_content() {
        let (subject, html) = admin_alert_email(&sample_submission());
        assert!(subject.contains("More seats"));
        assert!(html.contains("Ali"));
        assert!(html.contains("We need more seats in the library"));
    }

    #[test]
    fn notes_email_carries_notes() {
        let (subject, html) = notes_email(&sample_submission(), "تمت مراجعة الطلب");
        assert!(subject.contains("More seats"));
        assert!(html.contains("تمت مراجعة الطلب"));
    }

    #[tokio::test]
    async fn disabled_mailer_reports_skipped_delivery() {
        let mailer = Mailer::new(None, String::new(), "no-reply@qareebeen.com".to_string());
        let outcome = mailer.send("ali@x.com", "subject", "<p>body</p>").await.unwrap();
        assert_eq!(outcome, Delivery::Skipped);
    }
}
