//! Submission lifecycle: validation, creation with its fire-and-forget side
//! effects, admin status/notes updates, deletion, and on-demand aggregates.

use std::sync::Arc;
use std::sync::OnceLock;

use chrono::{Duration, Utc};
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::mailer::{self, Mailer};
use crate::models::{
    AnalyticsOverview, NewSubmission, SnapshotCounts, StatusCounts, Submission, SubmissionFilter,
    SubmissionKind, SubmissionStatus, University, UniversityCounts,
};

const MIN_CONTENT_CHARS: usize = 10;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Check the raw form and resolve its enum fields. Runs before any
/// persistence call.
pub fn validate(form: &NewSubmission) -> Result<(SubmissionKind, University), AppError> {
    let required = [
        &form.student_name,
        &form.student_id,
        &form.faculty,
        &form.year,
        &form.email,
        &form.kind,
        &form.title,
        &form.content,
        &form.university,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::validation("جميع الحقول مطلوبة"));
    }

    if !is_valid_email(form.email.trim()) {
        return Err(AppError::validation("برجاء إدخال بريد إلكتروني صحيح"));
    }

    if form.content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(AppError::validation(
            "برجاء كتابة تفاصيل أكثر (على الأقل 10 أحرف)",
        ));
    }

    let kind = SubmissionKind::parse(form.kind.trim())
        .ok_or_else(|| AppError::validation("نوع المشاركة غير صحيح"))?;
    let university = University::parse(form.university.trim())
        .ok_or_else(|| AppError::validation("الجامعة غير صحيحة"))?;

    Ok((kind, university))
}

/// Validate, persist, then kick off the notification emails and an
/// analytics snapshot. Neither side effect can fail the create.
pub async fn create(
    pool: &PgPool,
    mailer: &Arc<Mailer>,
    admin_email: &str,
    form: NewSubmission,
) -> Result<Submission, AppError> {
    let (kind, university) = validate(&form)?;

    let submission = Submission {
        id: Uuid::new_v4(),
        student_name: form.student_name.trim().to_string(),
        student_id: form.student_id.trim().to_string(),
        faculty: form.faculty.trim().to_string(),
        year: form.year.trim().to_string(),
        email: form.email.trim().to_string(),
        kind,
        title: form.title.trim().to_string(),
        content: form.content.trim().to_string(),
        university,
        status: SubmissionStatus::Pending,
        admin_notes: None,
        created_at: Utc::now(),
    };

    db::insert_submission(pool, &submission).await?;
    tracing::info!(id = %submission.id, university = %university.as_str(), "submission created");

    mailer::notify_created(mailer, &submission, admin_email);

    if let Err(err) = record_snapshot(pool).await {
        tracing::warn!(error = %err, "analytics snapshot failed");
    }

    Ok(submission)
}

pub async fn list(pool: &PgPool, filter: &SubmissionFilter) -> Result<Vec<Submission>, AppError> {
    Ok(db::fetch_submissions(pool, filter).await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Submission, AppError> {
    db::fetch_submission(pool, id)
        .await?
        .ok_or(AppError::NotFound("submission"))
}

/// Partial update: only supplied fields change. An empty update is a no-op
/// that still answers with the current record.
pub async fn update_status_and_notes(
    pool: &PgPool,
    id: Uuid,
    status: Option<SubmissionStatus>,
    admin_notes: Option<String>,
) -> Result<Submission, AppError> {
    let updated = db::update_submission(pool, id, status, admin_notes.as_deref()).await?;
    if !updated {
        return Err(AppError::NotFound("submission"));
    }

    get(pool, id).await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    if !db::delete_submission(pool, id).await? {
        return Err(AppError::NotFound("submission"));
    }
    tracing::info!(id = %id, "submission deleted");
    Ok(())
}

/// Persist admin notes and forward them to the submitter. Falls back to the
/// already-stored notes when the request carries none. The email is
/// fire-and-forget; only the persistence step decides the outcome.
pub async fn forward_notes(
    pool: &PgPool,
    mailer: &Arc<Mailer>,
    id: Uuid,
    admin_notes: Option<String>,
) -> Result<Submission, AppError> {
    let submission = get(pool, id).await?;

    let effective = admin_notes
        .filter(|notes| !notes.trim().is_empty())
        .or_else(|| {
            submission
                .admin_notes
                .clone()
                .filter(|notes| !notes.trim().is_empty())
        })
        .ok_or_else(|| AppError::validation("الرجاء إدخال ملاحظات لإرسالها"))?;
    let effective = effective.trim().to_string();

    db::update_submission(pool, id, None, Some(&effective)).await?;

    mailer::notify_notes(mailer, &submission, &effective);

    let mut updated = submission;
    updated.admin_notes = Some(effective);
    Ok(updated)
}

/// Recomputed on demand, never cached.
pub async fn analytics(pool: &PgPool) -> Result<AnalyticsOverview, AppError> {
    let counts = snapshot_counts(pool).await?;
    let statuses = StatusCounts {
        pending: db::count_by_status(pool, SubmissionStatus::Pending).await?,
        in_progress: db::count_by_status(pool, SubmissionStatus::InProgress).await?,
        resolved: db::count_by_status(pool, SubmissionStatus::Resolved).await?,
    };
    let last_seven_days = db::fetch_submissions_since(pool, Utc::now() - Duration::days(7)).await?;

    Ok(AnalyticsOverview {
        total: counts.total,
        suggestions: counts.suggestions,
        inquiries: counts.inquiries,
        universities: UniversityCounts {
            government: counts.government,
            private: counts.private,
            tech: counts.tech,
        },
        statuses,
        last_seven_days,
    })
}

async fn snapshot_counts(pool: &PgPool) -> anyhow::Result<SnapshotCounts> {
    Ok(SnapshotCounts {
        total: db::count_all(pool).await?,
        suggestions: db::count_by_kind(pool, SubmissionKind::Suggestion).await?,
        inquiries: db::count_by_kind(pool, SubmissionKind::Inquiry).await?,
        government: db::count_by_university(pool, University::Government).await?,
        private: db::count_by_university(pool, University::Private).await?,
        tech: db::count_by_university(pool, University::Tech).await?,
    })
}

async fn record_snapshot(pool: &PgPool) -> anyhow::Result<()> {
    let counts = snapshot_counts(pool).await?;
    db::insert_snapshot(pool, &counts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> NewSubmission {
        NewSubmission {
            student_name: "Ali".to_string(),
            student_id: "123".to_string(),
            faculty: "Eng".to_string(),
            year: "3".to_string(),
            email: "ali@x.com".to_string(),
            kind: "suggestion".to_string(),
            title: "More seats".to_string(),
            content: "We need more seats in the library".to_string(),
            university: "government".to_string(),
        }
    }

    #[test]
    fn valid_form_passes() {
        let (kind, university) = validate(&valid_form()).unwrap();
        assert_eq!(kind, SubmissionKind::Suggestion);
        assert_eq!(university, University::Government);
    }

    #[test]
    fn every_field_is_required() {
        let fields: [fn(&mut NewSubmission) -> &mut String; 9] = [
            |f| &mut f.student_name,
            |f| &mut f.student_id,
            |f| &mut f.faculty,
            |f| &mut f.year,
            |f| &mut f.email,
            |f| &mut f.kind,
            |f| &mut f.title,
            |f| &mut f.content,
            |f| &mut f.university,
        ];

        for clear in fields {
            let mut form = valid_form();
            clear(&mut form).clear();
            assert!(matches!(validate(&form), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn blank_whitespace_counts_as_missing() {
        let mut form = valid_form();
        form.faculty = "   ".to_string();
        assert!(matches!(validate(&form), Err(AppError::Validation(_))));
    }

    #[test]
    fn invalid_email_is_rejected() {
        for email in ["not-an-email", "a@b", "a b@c.com", "@x.com", "ali@x."] {
            let mut form = valid_form();
            form.email = email.to_string();
            assert!(
                matches!(validate(&form), Err(AppError::Validation(_))),
                "accepted {email}"
            );
        }
    }

    #[test]
    fn plausible_emails_are_accepted() {
        for email in ["ali@x.com", "a.b+c@sub.domain.eg", "x@y.io"] {
            assert!(is_valid_email(email), "rejected {email}");
        }
    }

    #[test]
    fn short_content_is_rejected() {
        let mut form = valid_form();
        form.content = "too short".chars().take(9).collect();
        assert!(matches!(validate(&form), Err(AppError::Validation(_))));
    }

    #[test]
    fn content_length_counts_chars_not_bytes() {
        let mut form = valid_form();
        // Ten Arabic characters, well over ten bytes.
        form.content = "شكرا جزيلا".to_string();
        assert!(validate(&form).is_ok());
    }

    #[test]
    fn unknown_kind_or_university_is_rejected() {
        let mut form = valid_form();
        form.kind = "complaint".to_string();
        assert!(matches!(validate(&form), Err(AppError::Validation(_))));

        let mut form = valid_form();
        form.university = "main-campus".to_string();
        assert!(matches!(validate(&form), Err(AppError::Validation(_))));
    }
}
