/// Directory record types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Capability tiers, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular participant
    User,
    /// Can create and manage own events
    Organizer,
    /// Can resolve reports and block events
    Moderator,
    /// Full access, can manage users and roles
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Organizer => "organizer",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "organizer" => Ok(Role::Organizer),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(ServiceError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub blocked_until: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub interest_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Interest record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub id: String,
    pub name: String,
}

/// Fields supplied by the caller when creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category_ids: Vec<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub event_date: DateTime<Utc>,
    pub max_participants: i64,
}

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Legacy single category; superseded by category_ids but still read
    pub category_id: Option<String>,
    pub category_ids: Vec<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub event_date: DateTime<Utc>,
    pub creator_id: String,
    pub participant_ids: Vec<String>,
    pub max_participants: i64,
    pub is_active: bool,
    pub is_blocked: bool,
    pub blocked_by: Option<String>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub block_reason: Option<String>,
    pub moderation_notes: Option<String>,
    /// Optimistic-concurrency counter; bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn participants_count(&self) -> usize {
        self.participant_ids.len()
    }

    pub fn is_full(&self) -> bool {
        self.participants_count() as i64 >= self.max_participants
    }

    /// An event is completed once its date has passed or it was blocked
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.event_date <= now || self.is_blocked
    }

    /// All category ids, merging the legacy single category into the list
    pub fn categories(&self) -> Vec<String> {
        let mut merged = self.category_ids.clone();
        if let Some(legacy) = &self.category_id {
            if !merged.iter().any(|c| c == legacy) {
                merged.push(legacy.clone());
            }
        }
        merged
    }
}

/// Predicate filter for event listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub creator: Option<String>,
    pub participant: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub include_blocked: bool,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(creator) = &self.creator {
            if &event.creator_id != creator {
                return false;
            }
        }
        if let Some(participant) = &self.participant {
            if !event.participant_ids.iter().any(|p| p == participant) {
                return false;
            }
        }
        if !self.include_inactive && !event.is_active {
            return false;
        }
        if !self.include_blocked && event.is_blocked {
            return false;
        }
        if let Some(from) = self.from {
            if event.event_date < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.event_date > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event() -> Event {
        Event {
            id: "ev-1".to_string(),
            title: "Board games night".to_string(),
            description: "Bring your own games".to_string(),
            category_id: None,
            category_ids: vec!["games".to_string()],
            address: "12 Main St".to_string(),
            latitude: None,
            longitude: None,
            event_date: Utc::now() + Duration::days(3),
            creator_id: "alice".to_string(),
            participant_ids: vec!["alice".to_string()],
            max_participants: 4,
            is_active: true,
            is_blocked: false,
            blocked_by: None,
            blocked_at: None,
            block_reason: None,
            moderation_notes: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin > Role::Moderator);
        assert!(Role::Moderator > Role::Organizer);
        assert!(Role::Organizer > Role::User);

        assert!(Role::Admin.can_act_as(Role::Moderator));
        assert!(Role::Moderator.can_act_as(Role::User));
        assert!(!Role::Moderator.can_act_as(Role::Admin));
        assert!(!Role::User.can_act_as(Role::Organizer));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("moderator").unwrap(), Role::Moderator);
        assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
        assert!(Role::from_str("invalid").is_err());
    }

    #[test]
    fn test_full_and_completed() {
        let mut event = sample_event();
        assert!(!event.is_full());
        assert!(!event.is_completed(Utc::now()));

        event.participant_ids = vec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string(),
            "dave".to_string(),
        ];
        assert!(event.is_full());

        // Blocking completes the event regardless of its date
        event.is_blocked = true;
        assert!(event.is_completed(Utc::now()));
    }

    #[test]
    fn test_categories_merge_legacy_id() {
        let mut event = sample_event();
        event.category_id = Some("outdoors".to_string());
        assert_eq!(event.categories(), vec!["games", "outdoors"]);

        // Duplicate legacy id is not repeated
        event.category_id = Some("games".to_string());
        assert_eq!(event.categories(), vec!["games"]);
    }

    #[test]
    fn test_filter_predicates() {
        let event = sample_event();

        let mut filter = EventFilter {
            creator: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&event));

        filter.creator = Some("bob".to_string());
        assert!(!filter.matches(&event));

        let member_filter = EventFilter {
            participant: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(member_filter.matches(&event));

        let mut blocked = sample_event();
        blocked.is_blocked = true;
        blocked.is_active = false;
        assert!(!EventFilter::default().matches(&blocked));
        let permissive = EventFilter {
            include_inactive: true,
            include_blocked: true,
            ..Default::default()
        };
        assert!(permissive.matches(&blocked));
    }
}
