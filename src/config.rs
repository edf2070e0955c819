//! Bot configuration, read from a TOML file and overridden by environment
//! variables.

use std::{
    num::NonZeroU64,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::Result;

const DEFAULT_LOCATION: &str = "./config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Guild that hosts the thread channels.
    pub guild_id: NonZeroU64,
    /// Category new thread channels are created in.
    pub category_id: NonZeroU64,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_migrations")]
    pub migrations: PathBuf,
    #[serde(default)]
    pub automigrate: bool,
}

fn default_prefix() -> String {
    "!".to_owned()
}

fn default_url() -> String {
    "modmail.db".to_owned()
}

fn default_migrations() -> PathBuf {
    PathBuf::from("./migrations")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: None,
            migrations: default_migrations(),
            automigrate: false,
        }
    }
}

impl Config {
    /// Reads the file named by `CONFIG_LOCATION` (or `./config.toml`) and
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        let location = std::env::var("CONFIG_LOCATION")
            .unwrap_or_else(|_| DEFAULT_LOCATION.to_owned());
        let mut config = Self::from_file(Path::new(&location))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Environment overrides:
    /// - `DISCORD_TOKEN` replaces `token`
    /// - `DB_DSN` replaces `database.url`
    /// - `DB_AUTH_TOKEN` replaces `database.auth_token`
    /// - `MIGRATIONS_DIR` replaces `database.migrations`
    /// - `AUTOMIGRATE` enables migrations only when exactly `true`
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.token = token;
        }
        if let Some(url) = lookup("DB_DSN") {
            self.database.url = url;
        }
        if let Some(auth_token) = lookup("DB_AUTH_TOKEN") {
            self.database.auth_token = Some(auth_token);
        }
        if let Some(dir) = lookup("MIGRATIONS_DIR") {
            self.database.migrations = PathBuf::from(dir);
        }
        if let Some(allow) = lookup("AUTOMIGRATE") {
            self.database.automigrate = allow == "true";
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MINIMAL: &str = r#"
token = "abc"
guild_id = 1
category_id = 2
"#;

    #[test]
    fn defaults_apply() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.prefix, "!");
        assert_eq!(config.database.url, "modmail.db");
        assert_eq!(config.database.migrations, PathBuf::from("./migrations"));
        assert!(!config.database.automigrate);
        assert!(config.database.auth_token.is_none());
    }

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
token = "abc"
prefix = "?"
guild_id = 1
category_id = 2

[database]
url = "libsql://modmail.example.org"
auth_token = "secret"
migrations = "/srv/migrations"
automigrate = true
"#,
        )
        .unwrap();
        assert_eq!(config.prefix, "?");
        assert_eq!(config.database.url, "libsql://modmail.example.org");
        assert_eq!(config.database.auth_token.as_deref(), Some("secret"));
        assert!(config.database.automigrate);
    }

    #[test]
    fn example_leaves_migrations_off() {
        let config =
            Config::parse(include_str!("../config.example.toml")).unwrap();
        assert!(!config.database.automigrate);
        assert_eq!(config.database.url, "modmail.db");
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(Config::parse("guild_id = 1\ncategory_id = 2").is_err());
    }

    #[test]
    fn zero_ids_are_rejected() {
        assert!(Config::parse("token = \"a\"\nguild_id = 0\ncategory_id = 2").is_err());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_TOKEN", "from-env"),
            ("DB_DSN", "other.db"),
            ("AUTOMIGRATE", "true"),
        ]);
        let mut config = Config::parse(MINIMAL).unwrap();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.token, "from-env");
        assert_eq!(config.database.url, "other.db");
        assert!(config.database.automigrate);

        config.apply_env(|key| {
            (key == "AUTOMIGRATE").then(|| "yes".to_owned())
        });
        assert!(!config.database.automigrate);
    }
}
