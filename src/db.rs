use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Admin, SnapshotCounts, Submission, SubmissionFilter, SubmissionKind, SubmissionStatus,
    University,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SUBMISSION_COLUMNS: &str = "id, student_name, student_id, faculty, year, email, \
     kind, title, content, university, status, admin_notes, created_at";

fn submission_from_row(row: &PgRow) -> anyhow::Result<Submission> {
    let kind: String = row.get("kind");
    let university: String = row.get("university");
    let status: String = row.get("status");

    Ok(Submission {
        id: row.get("id"),
        student_name: row.get("student_name"),
        student_id: row.get("student_id"),
        faculty: row.get("faculty"),
        year: row.get("year"),
        email: row.get("email"),
        kind: SubmissionKind::parse(&kind)
            .with_context(|| format!("unknown submission kind: {kind}"))?,
        title: row.get("title"),
        content: row.get("content"),
        university: University::parse(&university)
            .with_context(|| format!("unknown university: {university}"))?,
        // Rows predating the status column migration read as pending.
        status: SubmissionStatus::parse(&status).unwrap_or_default(),
        admin_notes: row.get("admin_notes"),
        created_at: row.get("created_at"),
    })
}

pub async fn insert_submission(pool: &PgPool, submission: &Submission) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO qareebeen.submissions
        (id, student_name, student_id, faculty, year, email,
         kind, title, content, university, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(submission.id)
    .bind(&submission.student_name)
    .bind(&submission.student_id)
    .bind(&submission.faculty)
    .bind(&submission.year)
    .bind(&submission.email)
    .bind(submission.kind.as_str())
    .bind(&submission.title)
    .bind(&submission.content)
    .bind(submission.university.as_str())
    .bind(submission.status.as_str())
    .bind(submission.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_submissions(
    pool: &PgPool,
    filter: &SubmissionFilter,
) -> anyhow::Result<Vec<Submission>> {
    let mut query = format!(
        "SELECT {SUBMISSION_COLUMNS} FROM qareebeen.submissions WHERE 1 = 1"
    );

    let mut arg = 0;
    if filter.university.is_some() {
        arg += 1;
        query.push_str(&format!(" AND university = ${arg}"));
    }
    if filter.kind.is_some() {
        arg += 1;
        query.push_str(&format!(" AND kind = ${arg}"));
    }
    if filter.status.is_some() {
        arg += 1;
        query.push_str(&format!(" AND status = ${arg}"));
    }
    query.push_str(" ORDER BY created_at DESC");

    let mut rows = sqlx::query(&query);
    if let Some(university) = filter.university {
        rows = rows.bind(university.as_str());
    }
    if let Some(kind) = filter.kind {
        rows = rows.bind(kind.as_str());
    }
    if let Some(status) = filter.status {
        rows = rows.bind(status.as_str());
    }

    let records = rows.fetch_all(pool).await?;
    let mut submissions = Vec::with_capacity(records.len());
    for row in &records {
        submissions.push(submission_from_row(row)?);
    }

    Ok(submissions)
}

pub async fn fetch_submission(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Submission>> {
    let row = sqlx::query(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM qareebeen.submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// Partial update: only the supplied fields are written. Returns `false`
/// when no row matched the id.
pub async fn update_submission(
    pool: &PgPool,
    id: Uuid,
    status: Option<SubmissionStatus>,
    admin_notes: Option<&str>,
) -> anyhow::Result<bool> {
    let mut sets = Vec::new();
    let mut arg = 1;
    if status.is_some() {
        arg += 1;
        sets.push(format!("status = ${arg}"));
    }
    if admin_notes.is_some() {
        arg += 1;
        sets.push(format!("admin_notes = ${arg}"));
    }

    if sets.is_empty() {
        // Nothing to write; report whether the row exists.
        return Ok(fetch_submission(pool, id).await?.is_some());
    }

    let query = format!(
        "UPDATE qareebeen.submissions SET {} WHERE id = $1",
        sets.join(", ")
    );

    let mut update = sqlx::query(&query).bind(id);
    if let Some(status) = status {
        update = update.bind(status.as_str());
    }
    if let Some(notes) = admin_notes {
        update = update.bind(notes);
    }

    let result = update.execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_submission(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM qareebeen.submissions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_submissions_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<Submission>> {
    let records = sqlx::query(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM qareebeen.submissions \
         WHERE created_at >= $1 ORDER BY created_at ASC"
    ))
    .bind(since)
    .fetch_all(pool)
    .await?;

    let mut submissions = Vec::with_capacity(records.len());
    for row in &records {
        submissions.push(submission_from_row(row)?);
    }

    Ok(submissions)
}

pub async fn count_all(pool: &PgPool) -> anyhow::Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM qareebeen.submissions")
        .fetch_one(pool)
        .await?;
    Ok(row.get("total"))
}

pub async fn count_by_kind(pool: &PgPool, kind: SubmissionKind) -> anyhow::Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM qareebeen.submissions WHERE kind = $1")
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.get("total"))
}

pub async fn count_by_university(pool: &PgPool, university: University) -> anyhow::Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total FROM qareebeen.submissions WHERE university = $1",
    )
    .bind(university.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.get("total"))
}

pub async fn count_by_status(pool: &PgPool, status: SubmissionStatus) -> anyhow::Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM qareebeen.submissions WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.get("total"))
}

pub async fn insert_snapshot(pool: &PgPool, counts: &SnapshotCounts) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO qareebeen.analytics_snapshots
        (id, total, suggestions, inquiries, government, private, tech)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(counts.total)
    .bind(counts.suggestions)
    .bind(counts.inquiries)
    .bind(counts.government)
    .bind(counts.private)
    .bind(counts.tech)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_admin_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<Admin>> {
    let row = sqlx::query(
        "SELECT id, email, password_hash, name FROM qareebeen.admins WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Admin {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
    }))
}

/// Insert the fixed operator identity. Existing admins are left untouched.
pub async fn seed_admin(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    name: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO qareebeen.admins (id, email, password_hash, name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .execute(pool)
    .await?;

    Ok(())
}
