/// User and interest API endpoints
use crate::{
    context::AppContext,
    directory::Role,
    error::{ServiceError, ServiceResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/role", post(change_role))
        .route("/users/:id/block", post(block_user))
        .route("/users/:id/unblock", post(unblock_user))
        .route("/interests", get(list_interests).post(create_interest))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterUserRequest {
    #[validate(length(min = 1, max = 80))]
    display_name: String,
    #[validate(email)]
    email: String,
}

/// Register a new user
async fn register_user(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterUserRequest>,
) -> ServiceResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let user = ctx
        .user_directory
        .create_user(&req.display_name, &req.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user": user })),
    ))
}

/// Get a single user
async fn get_user(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ServiceResult<Json<serde_json::Value>> {
    let user = ctx.user_directory.get_user(&id).await?;
    Ok(Json(serde_json::json!({ "user": user })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    #[validate(length(min = 1, max = 80))]
    display_name: String,
    #[validate(email)]
    email: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    interest_ids: Vec<String>,
}

/// Update profile fields and interests
async fn update_user(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let mut user = ctx.user_directory.get_user(&id).await?;
    user.display_name = req.display_name;
    user.email = req.email;
    user.bio = req.bio;
    user.avatar_url = req.avatar_url;
    user.interest_ids = req.interest_ids;

    if !ctx.user_directory.update_user(&user).await? {
        return Err(ServiceError::NotFound(format!("User {} not found", id)));
    }

    let user = ctx.user_directory.get_user(&id).await?;
    Ok(Json(serde_json::json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeRoleRequest {
    admin_id: String,
    role: String,
}

/// Change a user's role (admin only)
async fn change_role(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    let role = Role::from_str(&req.role)?;

    ctx.moderation.change_role(&id, role, &req.admin_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "userId": id,
        "role": role,
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct BlockUserRequest {
    admin_id: String,
    #[serde(default)]
    duration_days: Option<i64>,
    #[validate(length(min = 1, max = 1000))]
    reason: String,
}

/// Block a user (admin only)
async fn block_user(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<BlockUserRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    ctx.moderation
        .block_user(&id, &req.admin_id, req.duration_days, &req.reason)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "userId": id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnblockUserRequest {
    admin_id: String,
}

/// Lift a user block (admin only)
async fn unblock_user(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<UnblockUserRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    ctx.moderation.unblock_user(&id, &req.admin_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "userId": id,
    })))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateInterestRequest {
    #[validate(length(min = 1, max = 60))]
    name: String,
}

/// Create an interest if it does not exist yet
async fn create_interest(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateInterestRequest>,
) -> ServiceResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    let interest = ctx.user_directory.create_interest(&req.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "interest": interest })),
    ))
}

/// List all interests
async fn list_interests(
    State(ctx): State<AppContext>,
) -> ServiceResult<Json<serde_json::Value>> {
    let interests = ctx.user_directory.list_interests().await?;
    Ok(Json(serde_json::json!({ "interests": interests })))
}
