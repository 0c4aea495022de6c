/// Event storage and lookup
use crate::directory::models::{Event, EventDraft, EventFilter};
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const MIN_PARTICIPANTS: i64 = 2;

/// Event directory
#[derive(Clone)]
pub struct EventDirectory {
    db: SqlitePool,
}

impl EventDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an event from a draft; the creator is auto-joined
    pub async fn create_event(&self, draft: EventDraft, creator_id: &str) -> ServiceResult<Event> {
        let now = Utc::now();

        if draft.max_participants < MIN_PARTICIPANTS {
            return Err(ServiceError::Validation(format!(
                "Events need at least {} participants",
                MIN_PARTICIPANTS
            )));
        }
        if draft.event_date <= now {
            return Err(ServiceError::Validation(
                "Event date must be in the future".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let category_ids = serde_json::to_string(&draft.category_ids)
            .map_err(|e| ServiceError::Internal(format!("Category encoding failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events
            (id, title, description, category_ids, address, latitude, longitude,
             event_date, creator_id, max_participants, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&category_ids)
        .bind(&draft.address)
        .bind(draft.latitude)
        .bind(draft.longitude)
        .bind(draft.event_date.to_rfc3339())
        .bind(creator_id)
        .bind(draft.max_participants)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO event_participant (event_id, user_id, joined_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(creator_id)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_event(&id).await
    }

    /// Get event by id
    pub async fn get_event(&self, id: &str) -> ServiceResult<Event> {
        let row = sqlx::query("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let mut event = parse_event(row)?;
                event.participant_ids = self.participant_ids(id).await?;
                Ok(event)
            }
            None => Err(ServiceError::NotFound(format!("Event {} not found", id))),
        }
    }

    /// List events matching a filter; linear scan with predicate composition
    pub async fn list_events(&self, filter: &EventFilter) -> ServiceResult<Vec<Event>> {
        let rows = sqlx::query("SELECT * FROM events ORDER BY event_date ASC")
            .fetch_all(&self.db)
            .await?;

        let mut events = Vec::new();
        for row in rows {
            let mut event = parse_event(row)?;
            event.participant_ids = self.participant_ids(&event.id).await?;
            if filter.matches(&event) {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Full replace keyed by id; returns false when the id is unknown.
    /// Participant membership is owned by the membership manager and is
    /// not written here.
    pub async fn update_event(&self, event: &Event) -> ServiceResult<bool> {
        let category_ids = serde_json::to_string(&event.category_ids)
            .map_err(|e| ServiceError::Internal(format!("Category encoding failed: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = ?,
                description = ?,
                category_id = ?,
                category_ids = ?,
                address = ?,
                latitude = ?,
                longitude = ?,
                event_date = ?,
                max_participants = ?,
                is_active = ?,
                moderation_notes = ?,
                version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category_id)
        .bind(&category_ids)
        .bind(&event.address)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.event_date.to_rfc3339())
        .bind(event.max_participants)
        .bind(event.is_active)
        .bind(&event.moderation_notes)
        .bind(&event.id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Block an event, hiding it from listings.
    /// Idempotent: blocking an already-blocked event succeeds without change.
    /// Returns false when the id is unknown.
    pub async fn block_event(
        &self,
        id: &str,
        moderator_id: &str,
        reason: &str,
    ) -> ServiceResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE events
            SET is_blocked = 1,
                is_active = 0,
                blocked_by = ?,
                blocked_at = ?,
                block_reason = ?,
                version = version + 1
            WHERE id = ? AND is_blocked = 0
            "#,
        )
        .bind(moderator_id)
        .bind(now.to_rfc3339())
        .bind(reason)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Either already blocked (fine) or unknown
        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(exists.is_some())
    }

    /// Reverse a block, re-activating the event.
    /// Returns false when the id is unknown.
    pub async fn restore_event(&self, id: &str) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET is_blocked = 0,
                is_active = 1,
                blocked_by = NULL,
                blocked_at = NULL,
                block_reason = NULL,
                version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an event and its participant set.
    /// Returns false when the id is unknown.
    pub async fn delete_event(&self, id: &str) -> ServiceResult<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM event_participant WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn participant_ids(&self, event_id: &str) -> ServiceResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM event_participant WHERE event_id = ? ORDER BY joined_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

pub(crate) fn parse_event(row: sqlx::sqlite::SqliteRow) -> ServiceResult<Event> {
    let event_date_str: String = row.get("event_date");
    let event_date = parse_timestamp(&event_date_str)?;

    let created_at_str: String = row.get("created_at");
    let created_at = parse_timestamp(&created_at_str)?;

    let blocked_at = row
        .try_get::<String, _>("blocked_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let category_ids_str: String = row.get("category_ids");
    let category_ids: Vec<String> = serde_json::from_str(&category_ids_str).unwrap_or_default();

    Ok(Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category_id: row.get("category_id"),
        category_ids,
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        event_date,
        creator_id: row.get("creator_id"),
        participant_ids: Vec::new(),
        max_participants: row.get("max_participants"),
        is_active: row.get("is_active"),
        is_blocked: row.get("is_blocked"),
        blocked_by: row.get("blocked_by"),
        blocked_at,
        block_reason: row.get("block_reason"),
        moderation_notes: row.get("moderation_notes"),
        version: row.get("version"),
        created_at,
    })
}

pub(crate) fn parse_timestamp(s: &str) -> ServiceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ServiceError::Internal(format!("Invalid timestamp: {}", e)))
}
