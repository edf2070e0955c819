//! Numbered SQL migration files.
//!
//! Every `*.sql` file in the migrations directory starts with a four digit
//! number (`0001_init.sql`). The highest applied number is kept in the
//! `Migrations` table; files above it run in ascending order, each inside
//! its own transaction, and the run stops at the first failure.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::Database;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub number: i64,
    pub name: String,
    pub path: PathBuf,
}

/// Reads the leading four digit number of a migration filename.
pub fn migration_number(file_name: &str) -> Option<i64> {
    file_name.get(0..4)?.parse().ok()
}

/// Lists migration files in `dir` numbered above `watermark`, ascending.
pub async fn pending_migrations(
    dir: &Path,
    watermark: i64,
) -> Result<Vec<MigrationFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(number) = migration_number(&name) else {
            warn!(file = %name, "migration file has no numeric prefix, skipping");
            continue;
        };
        files.push(MigrationFile { number, name, path });
    }
    files.sort_by(|a, b| a.number.cmp(&b.number).then(a.name.cmp(&b.name)));
    files.retain(|file| file.number > watermark);
    Ok(files)
}

impl Database {
    /// Highest applied migration number, `0` when nothing has been applied
    /// or the `Migrations` table does not exist yet.
    pub async fn current_migration(&self) -> i64 {
        let rows = self
            .conn
            .query("SELECT id FROM Migrations ORDER BY id DESC LIMIT 1", ())
            .await;
        let mut rows = match rows {
            Ok(rows) => rows,
            Err(why) => {
                debug!("no migration watermark: {why}");
                return 0;
            },
        };
        match rows.next().await {
            Ok(Some(row)) => row.get::<i64>(0).unwrap_or(0),
            Ok(None) => 0,
            Err(why) => {
                debug!("no migration watermark: {why}");
                0
            },
        }
    }

    /// Applies every pending migration in `dir` and returns how many ran.
    pub async fn automigrate(
        &self,
        dir: &Path,
    ) -> Result<usize> {
        let watermark = self.current_migration().await;
        let pending = pending_migrations(dir, watermark).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        info!("Running automigrate...");
        let mut applied = 0;
        for file in &pending {
            if !self.run_migration(file).await {
                break;
            }
            applied += 1;
        }
        info!(applied, "Finished automigrate.");
        Ok(applied)
    }

    /// Runs one migration file and records its number. Returns `false` and
    /// logs the error when either step fails; nothing is kept in that case.
    pub async fn run_migration(
        &self,
        file: &MigrationFile,
    ) -> bool {
        info!("Running migration {}...", file.name);
        match self.apply_migration(file).await {
            Ok(()) => {
                info!("Successfully ran migration {}.", file.name);
                true
            },
            Err(why) => {
                error!("Failed to run migration {}: {why}", file.name);
                false
            },
        }
    }

    async fn apply_migration(
        &self,
        file: &MigrationFile,
    ) -> Result {
        let sql = tokio::fs::read_to_string(&file.path).await?;
        let tx = self.conn.transaction().await?;
        let outcome = async {
            tx.execute_batch(&sql).await?;
            tx.execute("INSERT INTO Migrations VALUES (?)", [file.number])
                .await?;
            Ok::<_, libsql::Error>(())
        }
        .await;
        match outcome {
            Ok(()) => tx.commit().await?,
            Err(why) => {
                tx.rollback().await?;
                return Err(why.into());
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const MIGRATIONS_TABLE: &str =
        "CREATE TABLE IF NOT EXISTS Migrations (id INTEGER PRIMARY KEY);";

    fn write(
        dir: &Path,
        name: &str,
        sql: &str,
    ) {
        fs::write(dir.join(name), sql).unwrap();
    }

    async fn table_exists(
        db: &Database,
        name: &str,
    ) -> bool {
        let mut rows = db
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                [name],
            )
            .await
            .unwrap();
        rows.next().await.unwrap().is_some()
    }

    #[test]
    fn numbers_from_names() {
        assert_eq!(migration_number("0001_init.sql"), Some(1));
        assert_eq!(migration_number("0042.sql"), Some(42));
        assert_eq!(migration_number("init.sql"), None);
        assert_eq!(migration_number("01.sql"), None);
    }

    #[tokio::test]
    async fn pending_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0003_c.sql", "");
        write(dir.path(), "0001_a.sql", "");
        write(dir.path(), "0002_b.sql", "");
        write(dir.path(), "README.md", "");
        write(dir.path(), "notes.sql", "");

        let all = pending_migrations(dir.path(), 0).await.unwrap();
        let numbers: Vec<i64> = all.iter().map(|f| f.number).collect();
        assert_eq!(numbers, [1, 2, 3]);

        let rest = pending_migrations(dir.path(), 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "0003_c.sql");
    }

    #[tokio::test]
    async fn applies_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0001_init.sql", MIGRATIONS_TABLE);
        write(dir.path(), "0002_things.sql", "CREATE TABLE things (id INTEGER);");

        let db = Database::open(":memory:", None).await.unwrap();
        assert_eq!(db.current_migration().await, 0);
        assert_eq!(db.automigrate(dir.path()).await.unwrap(), 2);
        assert_eq!(db.current_migration().await, 2);
        assert!(table_exists(&db, "things").await);

        assert_eq!(db.automigrate(dir.path()).await.unwrap(), 0);

        write(dir.path(), "0003_more.sql", "CREATE TABLE more (id INTEGER);");
        assert_eq!(db.automigrate(dir.path()).await.unwrap(), 1);
        assert_eq!(db.current_migration().await, 3);
    }

    #[tokio::test]
    async fn failure_stops_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0001_init.sql", MIGRATIONS_TABLE);
        write(
            dir.path(),
            "0002_broken.sql",
            "CREATE TABLE half (id INTEGER); THIS IS NOT SQL;",
        );
        write(dir.path(), "0003_later.sql", "CREATE TABLE later (id INTEGER);");

        let db = Database::open(":memory:", None).await.unwrap();
        assert_eq!(db.automigrate(dir.path()).await.unwrap(), 1);
        assert_eq!(db.current_migration().await, 1);
        assert!(!table_exists(&db, "half").await);
        assert!(!table_exists(&db, "later").await);
    }

    #[tokio::test]
    async fn bundled_migrations_apply() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let db = Database::open(":memory:", None).await.unwrap();
        let applied = db.automigrate(&dir).await.unwrap();
        assert_eq!(applied, pending_migrations(&dir, 0).await.unwrap().len());
        for table in ["Migrations", "Users", "Threads", "ThreadMessages"] {
            assert!(table_exists(&db, table).await, "{table} missing");
        }
    }
}
