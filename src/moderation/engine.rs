/// Report & Moderation Engine
///
/// Files reports, resolves them, blocks events, manages user sanctions,
/// and writes the audit trail. Every privileged operation is gated
/// through the authorization gate, and every resolution commits its
/// report mutation, conditional event mutation, and audit entry as one
/// transaction.
use crate::authz::AuthzGate;
use crate::bus::{DomainEvent, EventBus};
use crate::directory::{EventDirectory, Role, UserDirectory};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::moderation::audit::{append_on, AuditAction, AuditLog};
use crate::moderation::reports::{Report, ReportManager, ReportType};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// Moderation engine coordinating directory, reports, audit, and authz
#[derive(Clone)]
pub struct ModerationEngine {
    db: SqlitePool,
    events: Arc<EventDirectory>,
    users: Arc<UserDirectory>,
    reports: Arc<ReportManager>,
    audit: Arc<AuditLog>,
    authz: Arc<AuthzGate>,
    bus: EventBus,
}

impl ModerationEngine {
    pub fn new(
        db: SqlitePool,
        events: Arc<EventDirectory>,
        users: Arc<UserDirectory>,
        reports: Arc<ReportManager>,
        audit: Arc<AuditLog>,
        authz: Arc<AuthzGate>,
        bus: EventBus,
    ) -> Self {
        Self {
            db,
            events,
            users,
            reports,
            audit,
            authz,
            bus,
        }
    }

    /// File a report against an existing event
    pub async fn file_report(
        &self,
        event_id: &str,
        reporter_id: &str,
        report_type: ReportType,
        reason: &str,
    ) -> ServiceResult<Report> {
        // Existence check first: no report record for unknown events
        let event = self.events.get_event(event_id).await?;

        let report = self
            .reports
            .create(&event.id, reporter_id, report_type, reason)
            .await?;

        metrics::REPORTS_FILED_TOTAL
            .with_label_values(&[report_type.as_str()])
            .inc();
        info!(
            "Report {} filed against event {} by {}",
            report.id, event.id, reporter_id
        );
        self.bus.publish(DomainEvent::ReportFiled {
            report_id: report.id,
            event_id: event.id.clone(),
        });

        Ok(report)
    }

    /// Resolve a pending report; the first resolver wins.
    ///
    /// Approval hides the target event (is_active = false) but does not
    /// block it; blocking stays a separate explicit action. The status
    /// flip, the event mutation, and the audit entry commit atomically.
    pub async fn resolve_report(
        &self,
        report_id: i64,
        moderator_id: &str,
        approve: bool,
        notes: Option<&str>,
    ) -> ServiceResult<Report> {
        if !self.authz.can_moderate_events(moderator_id).await {
            warn!(
                "User {} attempted to resolve report {} without moderator role",
                moderator_id, report_id
            );
            return Err(ServiceError::Forbidden(
                "Moderator role required".to_string(),
            ));
        }

        let report = self.reports.get_report(report_id).await?;
        let now = Utc::now();
        let status = if approve { "approved" } else { "rejected" };

        let mut tx = self.db.begin().await?;

        // Pending is the only resolvable state; a concurrent resolver that
        // got here first leaves zero rows to update.
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?,
                resolved_by = ?,
                resolved_at = ?,
                moderator_notes = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(moderator_id)
        .bind(now.to_rfc3339())
        .bind(notes)
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::Conflict(format!(
                "Report {} already resolved",
                report_id
            )));
        }

        if approve {
            // Hide the event and carry the moderator's notes onto it
            sqlx::query(
                r#"
                UPDATE events
                SET is_active = 0,
                    moderation_notes = CASE
                        WHEN moderation_notes IS NULL OR moderation_notes = '' THEN ?
                        ELSE moderation_notes || char(10) || ?
                    END,
                    version = version + 1
                WHERE id = ?
                "#,
            )
            .bind(notes.unwrap_or(""))
            .bind(notes.unwrap_or(""))
            .bind(&report.event_id)
            .execute(&mut *tx)
            .await?;
        }

        append_on(
            &mut *tx,
            moderator_id,
            AuditAction::ReportResolved,
            "report",
            &report_id.to_string(),
            json!({
                "status": status,
                "target_event_id": report.event_id.clone(),
            }),
            None,
        )
        .await?;

        tx.commit().await?;

        metrics::REPORTS_RESOLVED_TOTAL.with_label_values(&[status]).inc();
        info!(
            "Report {} resolved as {} by {}",
            report_id, status, moderator_id
        );
        self.bus.publish(DomainEvent::ReportResolved {
            report_id,
            event_id: report.event_id.clone(),
            approved: approve,
        });

        self.reports.get_report(report_id).await
    }

    /// Block an event explicitly; idempotent at the directory layer
    pub async fn block_event(
        &self,
        event_id: &str,
        moderator_id: &str,
        reason: &str,
    ) -> ServiceResult<()> {
        if !self.authz.can_moderate_events(moderator_id).await {
            return Err(ServiceError::Forbidden(
                "Moderator role required".to_string(),
            ));
        }

        if !self.events.block_event(event_id, moderator_id, reason).await? {
            return Err(ServiceError::NotFound(format!(
                "Event {} not found",
                event_id
            )));
        }

        self.audit
            .append(
                moderator_id,
                AuditAction::EventRejected,
                "event",
                event_id,
                json!({"is_blocked": true, "reason": reason}),
                None,
            )
            .await?;

        metrics::MODERATION_ACTIONS_TOTAL
            .with_label_values(&["block", "event"])
            .inc();
        info!("Event {} blocked by {}", event_id, moderator_id);
        self.bus.publish(DomainEvent::EventBlocked {
            event_id: event_id.to_string(),
            moderator_id: moderator_id.to_string(),
        });

        Ok(())
    }

    /// Reverse a block and re-activate the event
    pub async fn restore_event(
        &self,
        event_id: &str,
        moderator_id: &str,
    ) -> ServiceResult<()> {
        if !self.authz.can_moderate_events(moderator_id).await {
            return Err(ServiceError::Forbidden(
                "Moderator role required".to_string(),
            ));
        }

        if !self.events.restore_event(event_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Event {} not found",
                event_id
            )));
        }

        self.audit
            .append(
                moderator_id,
                AuditAction::EventApproved,
                "event",
                event_id,
                json!({"is_blocked": false, "is_active": true}),
                None,
            )
            .await?;

        metrics::MODERATION_ACTIONS_TOTAL
            .with_label_values(&["restore", "event"])
            .inc();
        info!("Event {} restored by {}", event_id, moderator_id);
        self.bus.publish(DomainEvent::EventRestored {
            event_id: event_id.to_string(),
            moderator_id: moderator_id.to_string(),
        });

        Ok(())
    }

    /// Delete an event. Permitted to the creator and to moderators;
    /// moderator deletions leave an audit entry.
    pub async fn delete_event(&self, event_id: &str, actor_id: &str) -> ServiceResult<()> {
        let event = self.events.get_event(event_id).await?;

        let is_moderator = self.authz.can_moderate_events(actor_id).await;
        if event.creator_id != actor_id && !is_moderator {
            return Err(ServiceError::Forbidden(
                "Only the creator or a moderator may delete an event".to_string(),
            ));
        }

        self.events.delete_event(event_id).await?;

        if is_moderator && event.creator_id != actor_id {
            self.audit
                .append(
                    actor_id,
                    AuditAction::EventDeleted,
                    "event",
                    event_id,
                    json!({"title": event.title}),
                    None,
                )
                .await?;
            metrics::MODERATION_ACTIONS_TOTAL
                .with_label_values(&["delete", "event"])
                .inc();
        }

        info!("Event {} deleted by {}", event_id, actor_id);
        self.bus.publish(DomainEvent::EventDeleted {
            event_id: event_id.to_string(),
            actor_id: actor_id.to_string(),
        });

        Ok(())
    }

    /// Block a user, optionally until a deadline
    pub async fn block_user(
        &self,
        user_id: &str,
        admin_id: &str,
        duration_days: Option<i64>,
        reason: &str,
    ) -> ServiceResult<()> {
        if !self.authz.can_manage_users(admin_id).await {
            return Err(ServiceError::Forbidden("Admin role required".to_string()));
        }

        let blocked_until: Option<DateTime<Utc>> =
            duration_days.map(|days| Utc::now() + Duration::days(days));

        if !self.users.set_blocked(user_id, blocked_until, false).await? {
            return Err(ServiceError::NotFound(format!(
                "User {} not found",
                user_id
            )));
        }

        self.audit
            .append(
                admin_id,
                AuditAction::UserBlocked,
                "user",
                user_id,
                json!({
                    "is_active": false,
                    "blocked_until": blocked_until.map(|dt| dt.to_rfc3339()),
                    "reason": reason,
                }),
                None,
            )
            .await?;

        metrics::MODERATION_ACTIONS_TOTAL
            .with_label_values(&["block", "user"])
            .inc();
        info!("User {} blocked by {}", user_id, admin_id);
        self.bus.publish(DomainEvent::UserBlocked {
            user_id: user_id.to_string(),
            admin_id: admin_id.to_string(),
        });

        Ok(())
    }

    /// Lift a user block
    pub async fn unblock_user(&self, user_id: &str, admin_id: &str) -> ServiceResult<()> {
        if !self.authz.can_manage_users(admin_id).await {
            return Err(ServiceError::Forbidden("Admin role required".to_string()));
        }

        if !self.users.set_blocked(user_id, None, true).await? {
            return Err(ServiceError::NotFound(format!(
                "User {} not found",
                user_id
            )));
        }

        self.audit
            .append(
                admin_id,
                AuditAction::UserUnblocked,
                "user",
                user_id,
                json!({"is_active": true, "blocked_until": null}),
                None,
            )
            .await?;

        metrics::MODERATION_ACTIONS_TOTAL
            .with_label_values(&["unblock", "user"])
            .inc();
        info!("User {} unblocked by {}", user_id, admin_id);
        self.bus.publish(DomainEvent::UserUnblocked {
            user_id: user_id.to_string(),
            admin_id: admin_id.to_string(),
        });

        Ok(())
    }

    /// Change a user's role; Admin action only
    pub async fn change_role(
        &self,
        user_id: &str,
        new_role: Role,
        admin_id: &str,
    ) -> ServiceResult<()> {
        if !self.authz.can_manage_users(admin_id).await {
            return Err(ServiceError::Forbidden("Admin role required".to_string()));
        }

        if !self.users.set_role(user_id, new_role).await? {
            return Err(ServiceError::NotFound(format!(
                "User {} not found",
                user_id
            )));
        }

        self.audit
            .append(
                admin_id,
                AuditAction::UserRoleChanged,
                "user",
                user_id,
                json!({"role": new_role.as_str()}),
                None,
            )
            .await?;

        info!("Role of user {} set to {} by {}", user_id, new_role.as_str(), admin_id);
        Ok(())
    }
}
