/// Append-only audit log for privileged actions
use crate::directory::events::parse_timestamp;
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Audited action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserBlocked,
    UserUnblocked,
    UserRoleChanged,
    EventApproved,
    EventRejected,
    EventDeleted,
    ReportResolved,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserBlocked => "user_blocked",
            AuditAction::UserUnblocked => "user_unblocked",
            AuditAction::UserRoleChanged => "user_role_changed",
            AuditAction::EventApproved => "event_approved",
            AuditAction::EventRejected => "event_rejected",
            AuditAction::EventDeleted => "event_deleted",
            AuditAction::ReportResolved => "report_resolved",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "user_blocked" => Ok(AuditAction::UserBlocked),
            "user_unblocked" => Ok(AuditAction::UserUnblocked),
            "user_role_changed" => Ok(AuditAction::UserRoleChanged),
            "event_approved" => Ok(AuditAction::EventApproved),
            "event_rejected" => Ok(AuditAction::EventRejected),
            "event_deleted" => Ok(AuditAction::EventDeleted),
            "report_resolved" => Ok(AuditAction::ReportResolved),
            _ => Err(ServiceError::Validation(format!(
                "Invalid audit action: {}",
                s
            ))),
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_id: String,
    pub action: AuditAction,
    pub target_type: String,
    pub target_id: String,
    /// Changed-field-name to new value
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

/// Audit log store; rows are never updated or deleted
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry
    pub async fn append(
        &self,
        admin_id: &str,
        action: AuditAction,
        target_type: &str,
        target_id: &str,
        changes: serde_json::Value,
        ip_address: Option<&str>,
    ) -> ServiceResult<()> {
        let mut conn = self.db.acquire().await?;
        append_on(
            &mut *conn,
            admin_id,
            action,
            target_type,
            target_id,
            changes,
            ip_address,
        )
        .await
    }

    /// Recent entries, newest first
    pub async fn list(&self, limit: i64) -> ServiceResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query("SELECT * FROM audit_log ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(parse_entry).collect()
    }

    /// Entries for one target, newest first
    pub async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> ServiceResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_log WHERE target_type = ? AND target_id = ? ORDER BY id DESC",
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_entry).collect()
    }
}

/// Append on an existing connection, so callers can bundle the entry into
/// a larger transaction.
pub(crate) async fn append_on(
    conn: &mut SqliteConnection,
    admin_id: &str,
    action: AuditAction,
    target_type: &str,
    target_id: &str,
    changes: serde_json::Value,
    ip_address: Option<&str>,
) -> ServiceResult<()> {
    let now = Utc::now();
    let changes_str = serde_json::to_string(&changes)
        .map_err(|e| ServiceError::Internal(format!("Audit changes encoding failed: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO audit_log (admin_id, action, target_type, target_id, changes, timestamp, ip_address)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(admin_id)
    .bind(action.as_str())
    .bind(target_type)
    .bind(target_id)
    .bind(changes_str)
    .bind(now.to_rfc3339())
    .bind(ip_address)
    .execute(conn)
    .await?;

    Ok(())
}

fn parse_entry(row: sqlx::sqlite::SqliteRow) -> ServiceResult<AuditLogEntry> {
    let action_str: String = row.get("action");
    let action = AuditAction::from_str(&action_str)?;

    let timestamp_str: String = row.get("timestamp");
    let timestamp = parse_timestamp(&timestamp_str)?;

    let changes_str: String = row.get("changes");
    let changes = serde_json::from_str(&changes_str).unwrap_or(serde_json::Value::Null);

    Ok(AuditLogEntry {
        id: row.get("id"),
        admin_id: row.get("admin_id"),
        action,
        target_type: row.get("target_type"),
        target_id: row.get("target_id"),
        changes,
        timestamp,
        ip_address: row.get("ip_address"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_from_str() {
        assert_eq!(
            AuditAction::from_str("report_resolved").unwrap(),
            AuditAction::ReportResolved
        );
        assert!(AuditAction::from_str("invalid").is_err());
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let audit = AuditLog::new(crate::db::test_pool().await);

        audit
            .append(
                "admin-1",
                AuditAction::EventRejected,
                "event",
                "ev-1",
                json!({"blocked": true, "reason": "spam"}),
                Some("203.0.113.9"),
            )
            .await
            .unwrap();
        audit
            .append(
                "admin-1",
                AuditAction::ReportResolved,
                "report",
                "7",
                json!({"status": "approved", "target_event_id": "ev-1"}),
                None,
            )
            .await
            .unwrap();

        let entries = audit.list(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].action, AuditAction::ReportResolved);
        assert_eq!(entries[0].changes["target_event_id"], "ev-1");
        assert_eq!(entries[1].ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_list_for_target() {
        let audit = AuditLog::new(crate::db::test_pool().await);

        audit
            .append("a", AuditAction::UserBlocked, "user", "u-1", json!({}), None)
            .await
            .unwrap();
        audit
            .append("a", AuditAction::UserUnblocked, "user", "u-1", json!({}), None)
            .await
            .unwrap();
        audit
            .append("a", AuditAction::EventDeleted, "event", "ev-1", json!({}), None)
            .await
            .unwrap();

        let for_user = audit.list_for_target("user", "u-1").await.unwrap();
        assert_eq!(for_user.len(), 2);
        assert_eq!(for_user[0].action, AuditAction::UserUnblocked);
    }
}
