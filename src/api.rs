use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::http::Method;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{self, SessionStore, SESSION_COOKIE};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::export;
use crate::mailer::Mailer;
use crate::models::{
    AdminIdentity, AnalyticsOverview, NewSubmission, Submission, SubmissionFilter, SubmissionKind,
    SubmissionStatus, University,
};
use crate::service;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: SessionStore,
    pub mailer: Arc<Mailer>,
    pub config: Arc<AppConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/export.csv", get(export_submissions))
        .route(
            "/submissions/:id",
            get(get_submission)
                .put(update_submission)
                .delete(delete_submission),
        )
        .route("/submissions/:id/notes", post(forward_notes))
        .route("/analytics", get(analytics))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/submit", post(submit))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct SubmitResponse {
    success: bool,
    message: &'static str,
    submission: Submission,
}

async fn submit(
    State(state): State<AppState>,
    Json(form): Json<NewSubmission>,
) -> Result<Json<SubmitResponse>, AppError> {
    let submission =
        service::create(&state.pool, &state.mailer, &state.config.admin_email, form).await?;

    Ok(Json(SubmitResponse {
        success: true,
        message: "تم إرسال مشاركتك بنجاح",
        submission,
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let (token, identity) =
        auth::login(&state.pool, &state.sessions, &request.email, &request.password).await?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.sessions.ttl().as_secs()
    );

    let body = serde_json::json!({
        "success": true,
        "message": "تم تسجيل الدخول بنجاح",
        "admin": identity,
    });

    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        cookie.parse().map_err(|_| {
            AppError::Dependency(anyhow::anyhow!("session cookie is not a valid header value"))
        })?,
    );
    Ok(response)
}

async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = auth::session_token(&headers) {
        state.sessions.remove(&token).await;
    }

    let clear = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    let mut response = Redirect::to("/").into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        clear.parse().map_err(|_| {
            AppError::Dependency(anyhow::anyhow!("session cookie is not a valid header value"))
        })?,
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    university: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
}

/// Query values are optional; `all` means the same as absent, matching the
/// dashboard's filter dropdowns.
fn parse_filter(query: &ListQuery) -> Result<SubmissionFilter, AppError> {
    let mut filter = SubmissionFilter::default();

    if let Some(value) = query.university.as_deref().filter(|v| *v != "all") {
        filter.university = Some(
            University::parse(value)
                .ok_or_else(|| AppError::validation(format!("unknown university: {value}")))?,
        );
    }
    if let Some(value) = query.kind.as_deref().filter(|v| *v != "all") {
        filter.kind = Some(
            SubmissionKind::parse(value)
                .ok_or_else(|| AppError::validation(format!("unknown type: {value}")))?,
        );
    }
    if let Some(value) = query.status.as_deref().filter(|v| *v != "all") {
        filter.status = Some(
            SubmissionStatus::parse(value)
                .ok_or_else(|| AppError::validation(format!("unknown status: {value}")))?,
        );
    }

    Ok(filter)
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Submission>>, AppError> {
    let filter = parse_filter(&query)?;
    let submissions = service::list(&state.pool, &filter).await?;
    Ok(Json(submissions))
}

async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, AppError> {
    let submission = service::get(&state.pool, id).await?;
    Ok(Json(submission))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    status: Option<String>,
    #[serde(rename = "adminNotes")]
    admin_notes: Option<String>,
}

#[derive(Serialize)]
struct UpdateResponse {
    success: bool,
    submission: Submission,
}

/// Resolve the update body: unknown status values are a 400, an empty or
/// blank notes string from the form means "leave notes untouched".
fn parse_update(
    request: UpdateRequest,
) -> Result<(Option<SubmissionStatus>, Option<String>), AppError> {
    let status = request
        .status
        .as_deref()
        .map(|value| {
            SubmissionStatus::parse(value)
                .ok_or_else(|| AppError::validation(format!("unknown status: {value}")))
        })
        .transpose()?;

    let admin_notes = request.admin_notes.filter(|notes| !notes.trim().is_empty());

    Ok((status, admin_notes))
}

async fn update_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(admin): Extension<AdminIdentity>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let (status, admin_notes) = parse_update(request)?;

    let submission =
        service::update_status_and_notes(&state.pool, id, status, admin_notes).await?;

    tracing::info!(admin = %admin.email, id = %id, "submission updated");
    Ok(Json(UpdateResponse {
        success: true,
        submission,
    }))
}

async fn delete_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(admin): Extension<AdminIdentity>,
) -> Result<Json<serde_json::Value>, AppError> {
    service::delete(&state.pool, id).await?;

    tracing::info!(admin = %admin.email, id = %id, "submission deleted by admin");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Submission deleted",
    })))
}

#[derive(Debug, Deserialize)]
struct NotesRequest {
    #[serde(rename = "adminNotes")]
    admin_notes: Option<String>,
}

async fn forward_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NotesRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let submission =
        service::forward_notes(&state.pool, &state.mailer, id, request.admin_notes).await?;

    Ok(Json(UpdateResponse {
        success: true,
        submission,
    }))
}

async fn export_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let filter = parse_filter(&query)?;
    let submissions = service::list(&state.pool, &filter).await?;
    let bytes = export::to_csv(&submissions)?;

    let filename = format!("submissions_{}.csv", Utc::now().format("%Y-%m-%d"));
    let headers = [
        (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, bytes).into_response())
}

async fn analytics(State(state): State<AppState>) -> Result<Json<AnalyticsOverview>, AppError> {
    let overview = service::analytics(&state.pool).await?;
    Ok(Json(overview))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(university: Option<&str>, kind: Option<&str>, status: Option<&str>) -> ListQuery {
        ListQuery {
            university: university.map(str::to_string),
            kind: kind.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn absent_filters_mean_unfiltered() {
        let filter = parse_filter(&query(None, None, None)).unwrap();
        assert!(filter.university.is_none());
        assert!(filter.kind.is_none());
        assert!(filter.status.is_none());
    }

    #[test]
    fn all_means_the_same_as_absent() {
        let filter = parse_filter(&query(Some("all"), Some("all"), Some("all"))).unwrap();
        assert!(filter.university.is_none());
        assert!(filter.kind.is_none());
        assert!(filter.status.is_none());
    }

    #[test]
    fn valid_filter_values_are_resolved() {
        let filter =
            parse_filter(&query(Some("tech"), Some("inquiry"), Some("in-progress"))).unwrap();
        assert_eq!(filter.university, Some(University::Tech));
        assert_eq!(filter.kind, Some(SubmissionKind::Inquiry));
        assert_eq!(filter.status, Some(SubmissionStatus::InProgress));
    }

    #[test]
    fn unknown_filter_values_are_rejected() {
        let cases = [
            query(Some("main-campus"), None, None),
            query(None, Some("complaint"), None),
            query(None, None, Some("closed")),
        ];
        for case in cases {
            assert!(matches!(
                parse_filter(&case),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn update_with_unknown_status_is_rejected() {
        let request = UpdateRequest {
            status: Some("closed".to_string()),
            admin_notes: None,
        };
        assert!(matches!(parse_update(request), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_resolves_valid_status() {
        let request = UpdateRequest {
            status: Some("resolved".to_string()),
            admin_notes: Some("تمت مراجعة الطلب".to_string()),
        };
        let (status, notes) = parse_update(request).unwrap();
        assert_eq!(status, Some(SubmissionStatus::Resolved));
        assert_eq!(notes.as_deref(), Some("تمت مراجعة الطلب"));
    }

    #[test]
    fn blank_notes_mean_leave_untouched() {
        for notes in ["", "   "] {
            let request = UpdateRequest {
                status: None,
                admin_notes: Some(notes.to_string()),
            };
            let (status, parsed_notes) = parse_update(request).unwrap();
            assert!(status.is_none());
            assert!(parsed_notes.is_none());
        }
    }
}
