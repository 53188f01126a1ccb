//! Connection and table-prefix configuration.
//!
//! A TOML file looks like:
//!
//! ```toml
//! table_prefix = "app_"
//!
//! [database]
//! name = "${APP_DATA}/app.db"
//! charset = "UTF-8"
//! ```
//!
//! [`Config::load`] reads the file named by `LORM_CONFIG` when set, and otherwise
//! assembles the configuration from `LORM_*` environment variables (after loading
//! `.env`).

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_ENV: &str = "LORM_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prepended to every physical table name.
    #[serde(default)]
    pub table_prefix: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Connection parameters.
///
/// For SQLite `name` is the database path and `charset` selects the
/// `PRAGMA encoding` of a new database. `host`, `user` and `password` are kept
/// for server backends and not used by SQLite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub name: String,
    pub charset: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            name: ":memory:".to_string(),
            charset: "UTF-8".to_string(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl Config {
    /// `LORM_CONFIG` file if set, environment variables otherwise.
    pub fn load() -> OrmResult<Self> {
        let _ = dotenvy::dotenv();
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| OrmError::config(format!("{}: {e}", path.display())))
    }

    /// Parse TOML and expand `${VAR}` references in string values.
    pub fn from_toml(raw: &str) -> OrmResult<Self> {
        let mut config: Config = toml::from_str(raw)
            .map_err(|e| OrmError::config(format!("failed to parse config: {e}")))?;
        config.expand_env()?;
        Ok(config)
    }

    /// Build from `LORM_*` variables; unset ones keep their defaults.
    pub fn from_env() -> OrmResult<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Config::default();
        let vars: [(&str, &mut String); 6] = [
            ("LORM_TABLE_PREFIX", &mut config.table_prefix),
            ("LORM_DATABASE", &mut config.database.name),
            ("LORM_DB_HOST", &mut config.database.host),
            ("LORM_DB_CHARSET", &mut config.database.charset),
            ("LORM_DB_USER", &mut config.database.user),
            ("LORM_DB_PASSWORD", &mut config.database.password),
        ];
        for (key, slot) in vars {
            if let Ok(value) = std::env::var(key) {
                *slot = value;
            }
        }
        Ok(config)
    }

    fn expand_env(&mut self) -> OrmResult<()> {
        let db = &mut self.database;
        for value in [
            &mut self.table_prefix,
            &mut db.host,
            &mut db.name,
            &mut db.charset,
            &mut db.user,
            &mut db.password,
        ] {
            *value = expand_env_vars(value)?;
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> OrmResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(OrmError::config(format!(
                    "unterminated env var reference: ${{{key}"
                )));
            }
            if key.is_empty() {
                return Err(OrmError::config("invalid env var reference: ${}"));
            }
            let value = std::env::var(&key).map_err(|_| {
                OrmError::config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&value);
            continue;
        }
        out.push(c);
    }

    Ok(out)
}
