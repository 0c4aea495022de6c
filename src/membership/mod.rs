/// Membership Manager
///
/// Join/leave logic against an event's participant set and capacity.
/// Mutations run in a transaction and are guarded by a compare-and-swap
/// on the event's version column: the losing writer of a concurrent
/// update gets a retryable Conflict instead of slipping past the
/// capacity check.
use crate::bus::{DomainEvent, EventBus};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Membership manager over the directory's event tables
#[derive(Clone)]
pub struct MembershipManager {
    db: SqlitePool,
    bus: EventBus,
}

impl MembershipManager {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Add a user to an event's participant set.
    ///
    /// Errors: NotFound (unknown event), InvalidState (inactive, blocked,
    /// already a member, full), Conflict (lost the version race; retry).
    pub async fn join(&self, event_id: &str, user_id: &str) -> ServiceResult<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let row = sqlx::query(
            "SELECT is_active, is_blocked, max_participants, version FROM events WHERE id = ?",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or_else(|| {
            metrics::EVENT_JOINS_TOTAL.with_label_values(&["not_found"]).inc();
            ServiceError::NotFound(format!("Event {} not found", event_id))
        })?;

        let is_active: bool = row.get("is_active");
        let is_blocked: bool = row.get("is_blocked");
        let max_participants: i64 = row.get("max_participants");
        let version: i64 = row.get("version");

        if is_blocked || !is_active {
            metrics::EVENT_JOINS_TOTAL.with_label_values(&["not_active"]).inc();
            return Err(ServiceError::InvalidState(format!(
                "Event {} is not active",
                event_id
            )));
        }

        let already: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM event_participant WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if already.is_some() {
            metrics::EVENT_JOINS_TOTAL.with_label_values(&["already_member"]).inc();
            return Err(ServiceError::InvalidState(format!(
                "User {} already joined event {}",
                user_id, event_id
            )));
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_participant WHERE event_id = ?")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

        if count >= max_participants {
            metrics::EVENT_JOINS_TOTAL.with_label_values(&["full"]).inc();
            return Err(ServiceError::InvalidState(format!(
                "Event {} is full",
                event_id
            )));
        }

        sqlx::query(
            "INSERT INTO event_participant (event_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        // The version check invalidates the capacity check above if another
        // writer got in between; the loser must retry.
        let result = sqlx::query(
            "UPDATE events SET version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(event_id)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            metrics::EVENT_JOINS_TOTAL.with_label_values(&["conflict"]).inc();
            return Err(ServiceError::Conflict(format!(
                "Event {} changed concurrently, retry",
                event_id
            )));
        }

        tx.commit().await?;

        metrics::EVENT_JOINS_TOTAL.with_label_values(&["joined"]).inc();
        info!("User {} joined event {}", user_id, event_id);
        self.bus.publish(DomainEvent::MemberJoined {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
        });

        Ok(())
    }

    /// Remove a user from an event's participant set.
    ///
    /// Errors: NotFound (unknown event), InvalidState (not a member).
    /// The creator may leave their own event through this same path.
    pub async fn leave(&self, event_id: &str, user_id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM events WHERE id = ?")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Event {} not found",
                event_id
            )));
        }

        let result = sqlx::query(
            "DELETE FROM event_participant WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::InvalidState(format!(
                "User {} is not a participant of event {}",
                user_id, event_id
            )));
        }

        sqlx::query("UPDATE events SET version = version + 1 WHERE id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("User {} left event {}", user_id, event_id);
        self.bus.publish(DomainEvent::MemberLeft {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{EventDirectory, EventDraft};
    use chrono::Duration;

    async fn setup(max: i64) -> (MembershipManager, EventDirectory, String) {
        let pool = crate::db::test_pool().await;
        let directory = EventDirectory::new(pool.clone());
        let membership = MembershipManager::new(pool, EventBus::default());

        let event = directory
            .create_event(
                EventDraft {
                    title: "Climbing intro".to_string(),
                    description: "All levels welcome".to_string(),
                    category_ids: vec!["sports".to_string()],
                    address: "Boulder Hall".to_string(),
                    latitude: None,
                    longitude: None,
                    event_date: Utc::now() + Duration::days(2),
                    max_participants: max,
                },
                "creator",
            )
            .await
            .unwrap();

        (membership, directory, event.id)
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        // max 2, creator auto-joined: one slot left
        let (membership, directory, event_id) = setup(2).await;

        membership.join(&event_id, "user-a").await.unwrap();

        let err = membership.join(&event_id, "user-b").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let event = directory.get_event(&event_id).await.unwrap();
        assert_eq!(event.participants_count(), 2);
        assert!(event.is_full());
    }

    #[tokio::test]
    async fn test_join_twice_rejected() {
        let (membership, _, event_id) = setup(5).await;

        membership.join(&event_id, "user-a").await.unwrap();
        let err = membership.join(&event_id, "user-a").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_join_unknown_event() {
        let (membership, _, _) = setup(5).await;
        let err = membership.join("missing", "user-a").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_join_blocked_event_rejected() {
        let (membership, directory, event_id) = setup(5).await;
        directory.block_event(&event_id, "mod-1", "spam").await.unwrap();

        let err = membership.join(&event_id, "user-a").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_join_then_leave_roundtrip() {
        let (membership, directory, event_id) = setup(5).await;

        let before = directory.get_event(&event_id).await.unwrap().participant_ids;
        membership.join(&event_id, "user-a").await.unwrap();
        membership.leave(&event_id, "user-a").await.unwrap();
        let after = directory.get_event(&event_id).await.unwrap().participant_ids;

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_leave_non_member_rejected() {
        let (membership, _, event_id) = setup(5).await;

        let err = membership.leave(&event_id, "stranger").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let err = membership.leave("missing", "stranger").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_creator_may_leave_own_event() {
        let (membership, directory, event_id) = setup(5).await;

        membership.leave(&event_id, "creator").await.unwrap();
        let event = directory.get_event(&event_id).await.unwrap();
        assert_eq!(event.participants_count(), 0);
    }

    #[tokio::test]
    async fn test_join_publishes_bus_event() {
        let (membership, _, event_id) = setup(5).await;
        let mut rx = membership.bus.subscribe();

        membership.join(&event_id, "user-a").await.unwrap();

        match rx.recv().await.unwrap() {
            DomainEvent::MemberJoined { user_id, .. } => assert_eq!(user_id, "user-a"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
