/// Authorization Gate
///
/// Maps an opaque user id to a Role and answers capability questions.
/// Lookup failures resolve to the lowest tier (fail-closed).
use crate::directory::{Role, UserDirectory};
use std::sync::Arc;

/// Capability oracle backed by the user directory and a bootstrap seed
#[derive(Clone)]
pub struct AuthzGate {
    users: Arc<UserDirectory>,
    /// Ids granted Admin regardless of their stored role
    admin_seed: Vec<String>,
}

impl AuthzGate {
    pub fn new(users: Arc<UserDirectory>, admin_seed: Vec<String>) -> Self {
        Self { users, admin_seed }
    }

    /// Resolve the role of a user id; unknown or failing lookups are User
    pub async fn role_of(&self, user_id: &str) -> Role {
        if self.admin_seed.iter().any(|id| id == user_id) {
            return Role::Admin;
        }

        match self.users.get_user(user_id).await {
            Ok(user) => user.role,
            Err(e) => {
                tracing::debug!("Role lookup for {} failed, defaulting to User: {}", user_id, e);
                Role::User
            }
        }
    }

    pub async fn is_moderator(&self, user_id: &str) -> bool {
        self.role_of(user_id).await.can_act_as(Role::Moderator)
    }

    pub async fn is_admin(&self, user_id: &str) -> bool {
        self.role_of(user_id).await == Role::Admin
    }

    /// Capability gate for report resolution and event blocking.
    /// Synonymous with is_moderator today; kept distinct so call sites
    /// survive future capability divergence.
    pub async fn can_moderate_events(&self, user_id: &str) -> bool {
        self.is_moderator(user_id).await
    }

    /// Capability gate for user blocking and role changes
    pub async fn can_manage_users(&self, user_id: &str) -> bool {
        self.is_admin(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn gate_with_users() -> (AuthzGate, UserDirectory) {
        let pool = crate::db::test_pool().await;
        let users = Arc::new(UserDirectory::new(pool));
        let gate = AuthzGate::new(Arc::clone(&users), vec!["root-admin".to_string()]);
        (gate, (*users).clone())
    }

    #[tokio::test]
    async fn test_unknown_user_fails_closed() {
        let (gate, _) = gate_with_users().await;
        assert_eq!(gate.role_of("nobody").await, Role::User);
        assert!(!gate.is_moderator("nobody").await);
        assert!(!gate.is_admin("nobody").await);
    }

    #[tokio::test]
    async fn test_seeded_admin() {
        let (gate, _) = gate_with_users().await;
        assert_eq!(gate.role_of("root-admin").await, Role::Admin);
        assert!(gate.can_manage_users("root-admin").await);
        assert!(gate.can_moderate_events("root-admin").await);
    }

    #[tokio::test]
    async fn test_moderator_capability_for_each_role() {
        let (gate, users) = gate_with_users().await;

        for (role, expect_moderator, expect_admin) in [
            (Role::User, false, false),
            (Role::Organizer, false, false),
            (Role::Moderator, true, false),
            (Role::Admin, true, true),
        ] {
            let user = users
                .create_user("T", &format!("{}@example.com", role.as_str()))
                .await
                .unwrap();
            users.set_role(&user.id, role).await.unwrap();

            assert_eq!(gate.is_moderator(&user.id).await, expect_moderator);
            assert_eq!(gate.is_admin(&user.id).await, expect_admin);
            assert_eq!(
                gate.can_moderate_events(&user.id).await,
                gate.is_moderator(&user.id).await
            );
            assert_eq!(
                gate.can_manage_users(&user.id).await,
                gate.is_admin(&user.id).await
            );
        }
    }
}
