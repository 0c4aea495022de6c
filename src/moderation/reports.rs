/// Report storage and queries
use crate::directory::events::parse_timestamp;
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Report reason types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Spam,
    Inappropriate,
    Scam,
    Illegal,
    Other,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Spam => "spam",
            ReportType::Inappropriate => "inappropriate",
            ReportType::Scam => "scam",
            ReportType::Illegal => "illegal",
            ReportType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "spam" => Ok(ReportType::Spam),
            "inappropriate" => Ok(ReportType::Inappropriate),
            "scam" => Ok(ReportType::Scam),
            "illegal" => Ok(ReportType::Illegal),
            "other" => Ok(ReportType::Other),
            _ => Err(ServiceError::Validation(format!(
                "Invalid report type: {}",
                s
            ))),
        }
    }
}

/// Report status; terminal once non-pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "approved" => Ok(ReportStatus::Approved),
            "rejected" => Ok(ReportStatus::Rejected),
            _ => Err(ServiceError::Validation(format!(
                "Invalid report status: {}",
                s
            ))),
        }
    }
}

/// Report record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub event_id: String,
    pub reporter_id: String,
    pub report_type: ReportType,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub moderator_notes: Option<String>,
}

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    db: SqlitePool,
}

impl ReportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new pending report. Repeated reports by the same reporter
    /// on the same event are allowed.
    pub async fn create(
        &self,
        event_id: &str,
        reporter_id: &str,
        report_type: ReportType,
        reason: &str,
    ) -> ServiceResult<Report> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO reports (event_id, reporter_id, report_type, reason, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(event_id)
        .bind(reporter_id)
        .bind(report_type.as_str())
        .bind(reason)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Report {
            id: result.last_insert_rowid(),
            event_id: event_id.to_string(),
            reporter_id: reporter_id.to_string(),
            report_type,
            reason: reason.to_string(),
            status: ReportStatus::Pending,
            created_at: now,
            resolved_by: None,
            resolved_at: None,
            moderator_notes: None,
        })
    }

    /// Get report by id
    pub async fn get_report(&self, report_id: i64) -> ServiceResult<Report> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
            .bind(report_id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => parse_report(row),
            None => Err(ServiceError::NotFound(format!(
                "Report {} not found",
                report_id
            ))),
        }
    }

    /// Pending reports, newest filings first
    pub async fn pending_reports(&self) -> ServiceResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT * FROM reports WHERE status = 'pending' ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_report).collect()
    }

    /// Resolved reports, newest resolutions first
    pub async fn resolved_reports(&self) -> ServiceResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT * FROM reports WHERE status != 'pending' ORDER BY resolved_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_report).collect()
    }

    /// Reports filed against one event, newest first
    pub async fn reports_for_event(&self, event_id: &str) -> ServiceResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT * FROM reports WHERE event_id = ? ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_report).collect()
    }
}

pub(crate) fn parse_report(row: sqlx::sqlite::SqliteRow) -> ServiceResult<Report> {
    let report_type_str: String = row.get("report_type");
    let report_type = ReportType::from_str(&report_type_str)?;

    let status_str: String = row.get("status");
    let status = ReportStatus::from_str(&status_str)?;

    let created_at_str: String = row.get("created_at");
    let created_at = parse_timestamp(&created_at_str)?;

    let resolved_at = row
        .try_get::<String, _>("resolved_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Report {
        id: row.get("id"),
        event_id: row.get("event_id"),
        reporter_id: row.get("reporter_id"),
        report_type,
        reason: row.get("reason"),
        status,
        created_at,
        resolved_by: row.get("resolved_by"),
        resolved_at,
        moderator_notes: row.get("moderator_notes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_from_str() {
        assert_eq!(ReportType::from_str("spam").unwrap(), ReportType::Spam);
        assert_eq!(ReportType::from_str("SCAM").unwrap(), ReportType::Scam);
        assert!(ReportType::from_str("invalid").is_err());
    }

    #[test]
    fn test_report_status_from_str() {
        assert_eq!(
            ReportStatus::from_str("pending").unwrap(),
            ReportStatus::Pending
        );
        assert!(ReportStatus::from_str("open").is_err());
    }

    #[tokio::test]
    async fn test_create_and_list_pending() {
        let manager = ReportManager::new(crate::db::test_pool().await);

        let first = manager
            .create("ev-1", "alice", ReportType::Spam, "ad bot")
            .await
            .unwrap();
        let second = manager
            .create("ev-1", "bob", ReportType::Scam, "fake tickets")
            .await
            .unwrap();

        assert_eq!(first.status, ReportStatus::Pending);
        assert!(second.id > first.id);

        let pending = manager.pending_reports().await.unwrap();
        assert_eq!(pending.len(), 2);

        // Same reporter may file again; no dedup
        manager
            .create("ev-1", "alice", ReportType::Spam, "still an ad bot")
            .await
            .unwrap();
        assert_eq!(manager.pending_reports().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_unknown_report() {
        let manager = ReportManager::new(crate::db::test_pool().await);
        assert!(matches!(
            manager.get_report(99).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_reports_for_event() {
        let manager = ReportManager::new(crate::db::test_pool().await);

        manager
            .create("ev-1", "alice", ReportType::Other, "odd")
            .await
            .unwrap();
        manager
            .create("ev-2", "alice", ReportType::Other, "odd too")
            .await
            .unwrap();

        assert_eq!(manager.reports_for_event("ev-1").await.unwrap().len(), 1);
        assert_eq!(manager.reports_for_event("ev-3").await.unwrap().len(), 0);
    }
}
