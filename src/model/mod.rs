pub mod message;
pub mod thread;
pub mod user;

use serde::{Deserialize, Deserializer};

/// SQLite has no boolean type; flags are stored as `0` / `1`.
pub(crate) fn int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(|value| value != 0)
}
