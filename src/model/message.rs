use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::int_bool;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: i64,
    pub thread_id: String,
    /// The message as posted in the thread channel.
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "int_bool")]
    pub deleted: bool,
    pub content: String,
    /// The mirrored message in the member's DM channel.
    pub dm_message_id: Option<i64>,
}
