/// Event API endpoints
use crate::{
    context::AppContext,
    directory::{EventDraft, EventFilter},
    error::{ServiceError, ServiceResult},
    metrics,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/:id/join", post(join_event))
        .route("/events/:id/leave", post(leave_event))
        .route("/events/:id/block", post(block_event))
        .route("/events/:id/restore", post(restore_event))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest {
    creator_id: String,
    #[validate(length(min = 3, max = 120))]
    title: String,
    #[validate(length(max = 4000))]
    description: String,
    #[serde(default)]
    category_ids: Vec<String>,
    #[validate(length(min = 1, max = 300))]
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    event_date: DateTime<Utc>,
    #[validate(range(min = 2))]
    max_participants: i64,
}

/// Create an event; the creator is auto-joined
async fn create_event(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateEventRequest>,
) -> ServiceResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let draft = EventDraft {
        title: req.title,
        description: req.description,
        category_ids: req.category_ids,
        address: req.address,
        latitude: req.latitude,
        longitude: req.longitude,
        event_date: req.event_date,
        max_participants: req.max_participants,
    };

    let event = ctx
        .event_directory
        .create_event(draft, &req.creator_id)
        .await?;

    metrics::EVENTS_CREATED_TOTAL.inc();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "event": event })),
    ))
}

/// List events matching the query filter
async fn list_events(
    State(ctx): State<AppContext>,
    Query(filter): Query<EventFilter>,
) -> ServiceResult<Json<serde_json::Value>> {
    let events = ctx.event_directory.list_events(&filter).await?;
    let count = events.len();

    Ok(Json(serde_json::json!({
        "events": events,
        "count": count,
    })))
}

/// Get a single event
async fn get_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ServiceResult<Json<serde_json::Value>> {
    let event = ctx.event_directory.get_event(&id).await?;
    let participants_count = event.participants_count();
    let is_full = event.is_full();
    let is_completed = event.is_completed(Utc::now());

    Ok(Json(serde_json::json!({
        "event": event,
        "participantsCount": participants_count,
        "isFull": is_full,
        "isCompleted": is_completed,
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateEventRequest {
    #[validate(length(min = 3, max = 120))]
    title: String,
    #[validate(length(max = 4000))]
    description: String,
    #[serde(default)]
    category_ids: Vec<String>,
    #[validate(length(min = 1, max = 300))]
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    event_date: DateTime<Utc>,
    #[validate(range(min = 2))]
    max_participants: i64,
}

/// Replace an event's caller-editable fields; last write wins
async fn update_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let mut event = ctx.event_directory.get_event(&id).await?;
    event.title = req.title;
    event.description = req.description;
    event.category_ids = req.category_ids;
    event.address = req.address;
    event.latitude = req.latitude;
    event.longitude = req.longitude;
    event.event_date = req.event_date;
    event.max_participants = req.max_participants;

    if !ctx.event_directory.update_event(&event).await? {
        return Err(ServiceError::NotFound(format!("Event {} not found", id)));
    }

    let event = ctx.event_directory.get_event(&id).await?;
    Ok(Json(serde_json::json!({ "event": event })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipRequest {
    user_id: String,
}

/// Join an event
async fn join_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.membership.join(&id, &req.user_id).await?;
    let event = ctx.event_directory.get_event(&id).await?;

    Ok(Json(serde_json::json!({
        "joined": true,
        "event": event,
    })))
}

/// Leave an event
async fn leave_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.membership.leave(&id, &req.user_id).await?;
    let event = ctx.event_directory.get_event(&id).await?;

    Ok(Json(serde_json::json!({
        "left": true,
        "event": event,
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct BlockEventRequest {
    moderator_id: String,
    #[validate(length(min = 1, max = 1000))]
    reason: String,
}

/// Block an event, hiding it permanently until restored
async fn block_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<BlockEventRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    ctx.moderation
        .block_event(&id, &req.moderator_id, &req.reason)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "eventId": id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestoreEventRequest {
    moderator_id: String,
}

/// Reverse a block
async fn restore_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<RestoreEventRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.moderation.restore_event(&id, &req.moderator_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "eventId": id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteEventQuery {
    actor_id: String,
}

/// Delete an event (creator or moderator)
async fn delete_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(query): Query<DeleteEventQuery>,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.moderation.delete_event(&id, &query.actor_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "eventId": id,
    })))
}
