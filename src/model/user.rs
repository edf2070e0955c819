use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub dm_id: i64,
    pub username: String,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_blocked(
        &self,
        now: DateTime<Utc>,
    ) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::User;

    fn user(blocked_until: Option<chrono::DateTime<Utc>>) -> User {
        User {
            id: 1,
            dm_id: 2,
            username: "someone".to_owned(),
            blocked_until,
        }
    }

    #[test]
    fn block_expires() {
        let now = Utc::now();
        assert!(!user(None).is_blocked(now));
        assert!(user(Some(now + Duration::hours(1))).is_blocked(now));
        assert!(!user(Some(now - Duration::hours(1))).is_blocked(now));
    }
}
