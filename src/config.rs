use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(String),
    #[error("Invalid {0}: {1}")]
    Invalid(String, String),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub admin: AdminConfig,
    pub storage: StorageConfig,
    pub request: RequestConfig,
    pub cache: CacheConfig,
    pub reminder: ReminderConfig,
    pub locale: String,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig(pub String);

#[derive(Clone, Debug)]
pub struct AdminUser {
    pub user_id: i64,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Chat that receives review cards and digests.
    pub chat_id: i64,
    pub users: Vec<AdminUser>,
}

impl AdminConfig {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.users.iter().any(|admin| admin.user_id == user_id)
    }

    pub fn display_name(&self, user_id: i64) -> Option<&str> {
        self.users
            .iter()
            .find(|admin| admin.user_id == user_id)
            .map(|admin| admin.name.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct TursoConfig {
    pub url: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub database_path: String,
    /// Remote database, takes precedence over `database_path` when set.
    pub turso: Option<TursoConfig>,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RequestConfig {
    pub currencies: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub registration_ttl: Duration,
    pub registration_capacity: u64,
}

#[derive(Clone, Debug)]
pub struct ReminderConfig {
    pub timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Building AppConfig...");

        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::Missing(key.to_string()));
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let admin_chat_id = parse::<i64>("ADMIN_CHAT_ID", &required("ADMIN_CHAT_ID")?)?;
        let admin_users = parse_admin_users(&required("ADMIN_USERS")?)?;

        let turso = match (lookup("TURSO_URL"), lookup("TURSO_TOKEN")) {
            (Some(url), Some(token)) => Some(TursoConfig { url, token }),
            (Some(_), None) => return Err(ConfigError::Missing("TURSO_TOKEN".to_string())),
            _ => None,
        };

        let currencies: Vec<String> = optional("CURRENCIES", "UAH,USD,EUR")
            .split(',')
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        if currencies.is_empty() {
            return Err(ConfigError::Invalid(
                "CURRENCIES".to_string(),
                "at least one currency is required".to_string(),
            ));
        }

        let timezone = optional("REMINDER_TIMEZONE", "Europe/Kyiv");
        let timezone =
            Tz::from_str(&timezone).map_err(|e| ConfigError::Invalid("REMINDER_TIMEZONE".to_string(), e.to_string()))?;

        let config = AppConfig {
            telegram: TelegramConfig(required("TELEGRAM_BOT_TOKEN")?),
            admin: AdminConfig {
                chat_id: admin_chat_id,
                users: admin_users,
            },
            storage: StorageConfig {
                database_path: optional("DATABASE_PATH", "requests.db"),
                turso,
                upload_dir: PathBuf::from(optional("UPLOAD_DIR", "uploads")),
                export_dir: PathBuf::from(optional("EXPORT_DIR", "exports")),
            },
            request: RequestConfig { currencies },
            cache: CacheConfig {
                registration_ttl: Duration::from_secs(parse::<u64>(
                    "REGISTRATION_CACHE_TTL_SECS",
                    &optional("REGISTRATION_CACHE_TTL_SECS", "600"),
                )?),
                registration_capacity: parse::<u64>(
                    "REGISTRATION_CACHE_CAPACITY",
                    &optional("REGISTRATION_CACHE_CAPACITY", "1000"),
                )?,
            },
            reminder: ReminderConfig { timezone },
            locale: optional("BOT_LOCALE", "uk"),
        };

        info!("AppConfig built");

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value.to_string()))
}

/// Parses `id:Name,id:Name`. A bare id gets an empty name.
fn parse_admin_users(value: &str) -> Result<Vec<AdminUser>, ConfigError> {
    let mut users = Vec::new();

    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (id, name) = entry.split_once(':').unwrap_or((entry, ""));
        users.push(AdminUser {
            user_id: parse::<i64>("ADMIN_USERS", id)?,
            name: name.trim().to_string(),
        });
    }

    if users.is_empty() {
        return Err(ConfigError::Invalid(
            "ADMIN_USERS".to_string(),
            "at least one administrator is required".to_string(),
        ));
    }

    Ok(users)
}

#[cfg(test)]
impl AppConfig {
    pub fn new_test_config() -> Self {
        AppConfig {
            telegram: TelegramConfig("test-token".to_string()),
            admin: AdminConfig {
                chat_id: -100,
                users: vec![AdminUser {
                    user_id: 7,
                    name: "Olena".to_string(),
                }],
            },
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
                turso: None,
                upload_dir: std::env::temp_dir().join(format!("requestdesk-uploads-{}", uuid::Uuid::new_v4())),
                export_dir: std::env::temp_dir().join(format!("requestdesk-exports-{}", uuid::Uuid::new_v4())),
            },
            request: RequestConfig {
                currencies: vec!["UAH".to_string(), "USD".to_string(), "EUR".to_string()],
            },
            cache: CacheConfig {
                registration_ttl: Duration::from_secs(600),
                registration_capacity: 1000,
            },
            reminder: ReminderConfig {
                timezone: chrono_tz::Europe::Kyiv,
            },
            locale: "en".to_string(),
        }
    }
}
