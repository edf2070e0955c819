use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::int_bool;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: String,
    pub channel_id: i64,
    pub member_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "int_bool")]
    pub active: bool,
    #[serde(deserialize_with = "int_bool")]
    pub closed: bool,
    pub alerts: String,
}

impl Thread {
    pub fn status(&self) -> &'static str {
        if self.closed {
            "closed"
        } else if !self.active {
            "suspended"
        } else {
            "open"
        }
    }

    /// Moderator ids that get mentioned on new member messages.
    pub fn alert_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.alerts.split_whitespace().filter_map(|id| id.parse().ok())
    }

    /// Returns the alert list with `moderator` added, or removed if it was
    /// already present.
    pub fn toggled_alerts(
        &self,
        moderator: u64,
    ) -> (String, bool) {
        let mut ids: Vec<u64> = self.alert_ids().collect();
        let enabled = if let Some(pos) = ids.iter().position(|id| *id == moderator)
        {
            ids.remove(pos);
            false
        } else {
            ids.push(moderator);
            true
        };
        let alerts = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        (alerts, enabled)
    }

    pub fn mentions(&self) -> String {
        self.alert_ids()
            .map(|id| format!("<@{id}>"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::Thread;

    fn thread(alerts: &str) -> Thread {
        Thread {
            id: "t".to_owned(),
            channel_id: 10,
            member_id: 20,
            created_at: Utc::now(),
            active: true,
            closed: false,
            alerts: alerts.to_owned(),
        }
    }

    #[test]
    fn toggle_alerts() {
        let (alerts, enabled) = thread("").toggled_alerts(42);
        assert_eq!(alerts, "42");
        assert!(enabled);

        let (alerts, enabled) = thread("7 42 9").toggled_alerts(42);
        assert_eq!(alerts, "7 9");
        assert!(!enabled);
    }

    #[test]
    fn status_prefers_closed() {
        let mut t = thread("");
        assert_eq!(t.status(), "open");
        t.active = false;
        assert_eq!(t.status(), "suspended");
        t.closed = true;
        assert_eq!(t.status(), "closed");
    }

    #[test]
    fn mentions_skip_garbage() {
        assert_eq!(thread("1 nope 2").mentions(), "<@1> <@2>");
        assert_eq!(thread("").mentions(), "");
    }
}
