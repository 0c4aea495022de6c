/// Background task implementations
use crate::context::AppContext;
use crate::error::ServiceResult;
use chrono::Utc;

/// Re-activate users whose block deadline has passed
pub async fn cleanup_expired_user_blocks(ctx: &AppContext) -> ServiceResult<u64> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_active = 1,
            blocked_until = NULL
        WHERE is_active = 0
          AND blocked_until IS NOT NULL
          AND blocked_until < ?
        "#,
    )
    .bind(now.to_rfc3339())
    .execute(&ctx.db)
    .await?;

    Ok(result.rows_affected())
}

/// Verify the storage layer still answers
pub async fn health_check(ctx: &AppContext) -> ServiceResult<()> {
    crate::db::test_connection(&ctx.db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_expired_blocks_are_lifted() {
        let ctx = AppContext::test_context().await;

        let expired = ctx
            .user_directory
            .create_user("Expired", "expired@example.com")
            .await
            .unwrap();
        let current = ctx
            .user_directory
            .create_user("Current", "current@example.com")
            .await
            .unwrap();

        ctx.user_directory
            .set_blocked(&expired.id, Some(Utc::now() - Duration::hours(1)), false)
            .await
            .unwrap();
        ctx.user_directory
            .set_blocked(&current.id, Some(Utc::now() + Duration::days(3)), false)
            .await
            .unwrap();

        let lifted = cleanup_expired_user_blocks(&ctx).await.unwrap();
        assert_eq!(lifted, 1);

        assert!(ctx.user_directory.get_user(&expired.id).await.unwrap().is_active);
        assert!(!ctx.user_directory.get_user(&current.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_health_check() {
        let ctx = AppContext::test_context().await;
        health_check(&ctx).await.unwrap();
    }
}
