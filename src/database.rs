pub mod migrations;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Value, de::from_row, params, params::IntoParams};
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    error::{Error, Result},
    model::{message::ThreadMessage, thread::Thread, user::User},
};

/// Timestamps are stored as fixed-width RFC 3339 text so they sort
/// lexicographically.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handle to the modmail database. Cloning shares the same connection.
#[derive(Clone)]
pub struct Database {
    _db: Arc<libsql::Database>,
    conn: Connection,
}

impl Database {
    /// Opens the database and runs pending migrations when enabled.
    pub async fn setup(config: &DatabaseConfig) -> Result<Self> {
        info!("Setting up database...");
        let database = Self::open(&config.url, config.auth_token.clone()).await?;
        info!("Database setup complete.");

        if config.automigrate {
            database.automigrate(&config.migrations).await?;
        } else {
            info!("Automigrating is disabled, skipping migration attempt.");
        }
        Ok(database)
    }

    /// `libsql://` and `http(s)://` urls are opened remotely, anything else
    /// is treated as a local path (including `:memory:`).
    pub async fn open(
        url: &str,
        auth_token: Option<String>,
    ) -> Result<Self> {
        let is_remote = ["libsql://", "http://", "https://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        let db = if is_remote {
            Builder::new_remote(url.to_owned(), auth_token.unwrap_or_default())
                .build()
                .await?
        } else {
            Builder::new_local(url).build().await?
        };
        let conn = db.connect()?;
        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    pub async fn execute(
        &self,
        query: &str,
        params: impl IntoParams,
    ) -> Result<u64> {
        Ok(self.conn.execute(query, params).await?)
    }

    pub async fn fetch_row<T: DeserializeOwned>(
        &self,
        query: &str,
        params: impl IntoParams,
    ) -> Result<Option<T>> {
        let mut rows = self.conn.query(query, params).await?;
        rows.next()
            .await?
            .map(|row| from_row::<T>(&row))
            .transpose()
            .map_err(|e| e.into())
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: impl IntoParams,
    ) -> Result<Vec<T>> {
        let mut rows = self.conn.query(query, params).await?;
        let mut return_value = Vec::new();
        while let Some(row) = rows.next().await? {
            return_value.push(from_row::<T>(&row)?);
        }
        Ok(return_value)
    }

    /// Inserts the user, or refreshes the DM channel and display name of a
    /// known one. Never touches `blocked_until`.
    pub async fn create_user(
        &self,
        id: i64,
        dm_id: i64,
        username: &str,
    ) -> Result<User> {
        self.fetch_row(
            r#"INSERT INTO Users (id, dm_id, username) VALUES (?, ?, ?)
    ON CONFLICT (id) DO UPDATE
    SET dm_id = excluded.dm_id, username = excluded.username
    RETURNING *"#,
            params![id, dm_id, username],
        )
        .await?
        .ok_or(Error::NoRows("create_user"))
    }

    pub async fn fetch_user(
        &self,
        id: i64,
    ) -> Result<Option<User>> {
        self.fetch_row("SELECT * FROM Users WHERE id = ?", [id]).await
    }

    pub async fn block_user(
        &self,
        id: i64,
        until: DateTime<Utc>,
    ) -> Result {
        self.execute(
            "UPDATE Users SET blocked_until = ? WHERE id = ?",
            params![timestamp(until), id],
        )
        .await?;
        Ok(())
    }

    pub async fn unblock_user(
        &self,
        id: i64,
    ) -> Result {
        self.execute(
            "UPDATE Users SET blocked_until = ? WHERE id = ?",
            params![Value::Null, id],
        )
        .await?;
        Ok(())
    }

    pub async fn create_thread(
        &self,
        channel_id: i64,
        member_id: i64,
    ) -> Result<Thread> {
        let id = Uuid::new_v4().to_string();
        self.fetch_row(
            r#"INSERT INTO Threads (id, channel_id, member_id, created_at)
    VALUES (?, ?, ?, ?) RETURNING *"#,
            params![id, channel_id, member_id, timestamp(Utc::now())],
        )
        .await?
        .ok_or(Error::NoRows("create_thread"))
    }

    pub async fn fetch_thread(
        &self,
        id: &str,
    ) -> Result<Option<Thread>> {
        self.fetch_row("SELECT * FROM Threads WHERE id = ?", [id]).await
    }

    pub async fn fetch_threads(
        &self,
        member_id: i64,
    ) -> Result<Vec<Thread>> {
        self.fetch(
            r#"SELECT * FROM Threads WHERE member_id = ?
    ORDER BY created_at ASC, rowid ASC"#,
            [member_id],
        )
        .await
    }

    /// The newest thread of a member that is not closed. Suspended threads
    /// count as open.
    pub async fn fetch_open_thread(
        &self,
        member_id: i64,
    ) -> Result<Option<Thread>> {
        self.fetch_row(
            r#"SELECT * FROM Threads
    WHERE member_id = ? AND closed = 0
    ORDER BY created_at DESC, rowid DESC LIMIT 1"#,
            [member_id],
        )
        .await
    }

    pub async fn fetch_thread_by_channel(
        &self,
        channel_id: i64,
    ) -> Result<Option<Thread>> {
        self.fetch_row("SELECT * FROM Threads WHERE channel_id = ?", [channel_id])
            .await
    }

    pub async fn suspend_thread(
        &self,
        id: &str,
    ) -> Result {
        self.execute("UPDATE Threads SET active = 0 WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    pub async fn unsuspend_thread(
        &self,
        id: &str,
    ) -> Result {
        self.execute("UPDATE Threads SET active = 1 WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    pub async fn close_thread(
        &self,
        id: &str,
    ) -> Result {
        self.execute("UPDATE Threads SET closed = 1 WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    pub async fn set_thread_alerts(
        &self,
        id: &str,
        alerts: &str,
    ) -> Result {
        self.execute(
            "UPDATE Threads SET alerts = ? WHERE id = ?",
            params![alerts, id],
        )
        .await?;
        Ok(())
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        message_id: i64,
        content: &str,
        dm_message_id: Option<i64>,
    ) -> Result<ThreadMessage> {
        self.fetch_row(
            r#"INSERT INTO ThreadMessages
    (thread_id, message_id, content, dm_message_id, created_at)
    VALUES (?, ?, ?, ?, ?) RETURNING *"#,
            params![
                thread_id,
                message_id,
                content,
                dm_message_id.map_or(Value::Null, Value::Integer),
                timestamp(Utc::now())
            ],
        )
        .await?
        .ok_or(Error::NoRows("create_message"))
    }

    pub async fn update_message(
        &self,
        thread_id: &str,
        message_id: i64,
        content: &str,
    ) -> Result<Option<ThreadMessage>> {
        self.fetch_row(
            r#"UPDATE ThreadMessages SET content = ?
    WHERE thread_id = ? AND message_id = ? RETURNING *"#,
            params![content, thread_id, message_id],
        )
        .await
    }

    pub async fn delete_message(
        &self,
        thread_id: &str,
        message_id: i64,
    ) -> Result<bool> {
        let changed = self
            .execute(
                r#"UPDATE ThreadMessages SET deleted = 1
    WHERE thread_id = ? AND message_id = ?"#,
                params![thread_id, message_id],
            )
            .await?;
        Ok(changed > 0)
    }

    pub async fn fetch_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ThreadMessage>> {
        self.fetch(
            "SELECT * FROM ThreadMessages WHERE thread_id = ? ORDER BY id ASC",
            [thread_id],
        )
        .await
    }

    pub async fn fetch_message_by_dm(
        &self,
        dm_message_id: i64,
    ) -> Result<Option<ThreadMessage>> {
        self.fetch_row(
            "SELECT * FROM ThreadMessages WHERE dm_message_id = ?",
            [dm_message_id],
        )
        .await
    }
}
