use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::models::employee::EmployeeRole;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_EDIT_SESSION_TTL_SECS: u64 = 30 * 60;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// Non-persistent, for local runs without a database. Employees are
    /// owned by the personnel screens, so a memory store starts from `seed`.
    Memory { seed: Vec<SeedEmployee> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEmployee {
    pub name: String,
    pub surname: String,
    pub role: EmployeeRole,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub edit_session_ttl: Duration,
    pub db_acquire_timeout: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let store = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some("memory") => StoreBackend::Memory {
                seed: lookup("MEMORY_SEED_EMPLOYEES")
                    .map(|entries| seed_employees(&entries))
                    .transpose()?
                    .unwrap_or_default(),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            jwt_secret,
            store,
            edit_session_ttl: seconds(&lookup, "EDIT_SESSION_TTL_SECS", DEFAULT_EDIT_SESSION_TTL_SECS)?,
            db_acquire_timeout: seconds(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS)?,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Parses `Name Surname:Role` entries separated by `;`.
fn seed_employees(entries: &str) -> Result<Vec<SeedEmployee>, ConfigError> {
    entries
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::Invalid {
                key: "MEMORY_SEED_EMPLOYEES",
                value: entry.to_string(),
            };
            let (full_name, role) = entry.split_once(':').ok_or_else(invalid)?;
            let (name, surname) = full_name.trim().split_once(' ').ok_or_else(invalid)?;
            let role = role.trim();
            if role.is_empty() {
                return Err(invalid());
            }
            Ok(SeedEmployee {
                name: name.to_string(),
                surname: surname.trim().to_string(),
                role: EmployeeRole::from(role),
            })
        })
        .collect()
}
