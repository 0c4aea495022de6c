/// Report and audit API endpoints
use crate::{
    context::AppContext,
    error::{ServiceError, ServiceResult},
    moderation::ReportType,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build report routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/reports", post(file_report).get(list_reports))
        .route("/reports/:id", get(get_report))
        .route("/reports/:id/resolve", post(resolve_report))
        .route("/audit", get(list_audit))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct FileReportRequest {
    event_id: String,
    reporter_id: String,
    #[serde(rename = "type")]
    report_type: String,
    #[validate(length(min = 1, max = 2000))]
    reason: String,
}

/// File a report against an event
async fn file_report(
    State(ctx): State<AppContext>,
    Json(req): Json<FileReportRequest>,
) -> ServiceResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let report_type = ReportType::from_str(&req.report_type)?;

    let report = ctx
        .moderation
        .file_report(&req.event_id, &req.reporter_id, report_type, &req.reason)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "report": report })),
    ))
}

#[derive(Debug, Deserialize)]
struct ListReportsQuery {
    #[serde(default)]
    status: Option<String>,
}

/// List reports by status; pending by default
async fn list_reports(
    State(ctx): State<AppContext>,
    Query(query): Query<ListReportsQuery>,
) -> ServiceResult<Json<serde_json::Value>> {
    let reports = match query.status.as_deref() {
        None | Some("pending") => ctx.report_manager.pending_reports().await?,
        Some("resolved") => ctx.report_manager.resolved_reports().await?,
        Some(other) => {
            return Err(ServiceError::Validation(format!(
                "Invalid status filter: {}",
                other
            )))
        }
    };

    let count = reports.len();
    Ok(Json(serde_json::json!({
        "reports": reports,
        "count": count,
    })))
}

/// Get a single report
async fn get_report(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> ServiceResult<Json<serde_json::Value>> {
    let report = ctx.report_manager.get_report(id).await?;
    Ok(Json(serde_json::json!({ "report": report })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ResolveReportRequest {
    moderator_id: String,
    approve: bool,
    #[validate(length(max = 2000))]
    notes: Option<String>,
}

/// Resolve a pending report
async fn resolve_report(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Json(req): Json<ResolveReportRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let report = ctx
        .moderation
        .resolve_report(id, &req.moderator_id, req.approve, req.notes.as_deref())
        .await?;

    Ok(Json(serde_json::json!({ "report": report })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAuditQuery {
    target_type: Option<String>,
    target_id: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

/// List audit log entries, newest first
async fn list_audit(
    State(ctx): State<AppContext>,
    Query(query): Query<ListAuditQuery>,
) -> ServiceResult<Json<serde_json::Value>> {
    let entries = match (query.target_type, query.target_id) {
        (Some(target_type), Some(target_id)) => {
            ctx.audit_log
                .list_for_target(&target_type, &target_id)
                .await?
        }
        _ => ctx.audit_log.list(query.limit.unwrap_or(100)).await?,
    };

    let count = entries.len();
    Ok(Json(serde_json::json!({
        "entries": entries,
        "count": count,
    })))
}
