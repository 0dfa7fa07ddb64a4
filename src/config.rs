//! Environment-driven configuration.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `HOST` / `PORT` | `127.0.0.1` / `3000` | listen address |
//! | `DEV_MODE` | `false` | skip auth, everyone is an admin |
//! | `SUPABASE_URL` | unset | backend; unset means in-memory store |
//! | `SUPABASE_SERVICE_ROLE_KEY` | required with URL | data access key |
//! | `SUPABASE_ANON_KEY` | service key | auth API key |
//! | `SUPABASE_JWT_SECRET` | unset | verifies access tokens |
//! | `ADMIN_EMAILS` | empty | comma-separated admin accounts |
//! | `RESEND_API_KEY` / `EMAIL_FROM` | unset | direct email delivery |
//! | `EMAIL_RELAY_URL` | unset | deliver through a relay instead |
//! | `TASKS_TIMEZONE` | `UTC` | reference timezone for deadlines |
//! | `APP_URL` | unset | link target in emails and recovery redirects |
//! | `DEV_PROFILES` | empty | `id:name[:email],...` seeded into the in-memory store |

use chrono_tz::Tz;
use thiserror::Error;

use crate::task::Profile;

pub const DEFAULT_EMAIL_FROM: &str = "Task Tracker <onboarding@resend.dev>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable '{name}' is missing")]
    MissingEnvVar { name: &'static str },

    #[error("invalid value for '{name}': {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
    pub supabase: Option<SupabaseConfig>,
    pub jwt_secret: Option<String>,
    /// Lowercased.
    pub admin_emails: Vec<String>,
    /// Direct provider access; also backs the relay endpoint.
    pub resend: Option<ResendConfig>,
    /// When set, notifications go through this relay instead of `resend`.
    pub email_relay_url: Option<String>,
    pub timezone: Tz,
    pub app_url: Option<String>,
    /// Profiles for the in-memory store; ignored with a Supabase backend.
    pub dev_profiles: Vec<Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            dev_mode: false,
            supabase: None,
            jwt_secret: None,
            admin_emails: Vec::new(),
            resend: None,
            email_relay_url: None,
            timezone: Tz::UTC,
            app_url: None,
            dev_profiles: Vec::new(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn check_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            Ok(value.trim_end_matches('/').to_string())
        }
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}

fn parse_profiles(raw: &str) -> Result<Vec<Profile>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':').map(str::trim);
            let id = parts.next().filter(|p| !p.is_empty());
            let name = parts.next().filter(|p| !p.is_empty());
            let email = parts.next().filter(|p| !p.is_empty());
            match (id, name) {
                (Some(id), Some(name)) => Ok(Profile {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: email.map(str::to_string),
                    active: true,
                }),
                _ => Err(ConfigError::InvalidValue {
                    name: "DEV_PROFILES",
                    value: entry.to_string(),
                }),
            }
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        let dev_mode = match get("DEV_MODE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                name: "DEV_MODE",
                value: raw,
            })?,
            None => false,
        };

        let supabase = match get("SUPABASE_URL") {
            Some(raw) => {
                let url = check_url("SUPABASE_URL", raw)?;
                let service_role_key = get("SUPABASE_SERVICE_ROLE_KEY").ok_or(
                    ConfigError::MissingEnvVar {
                        name: "SUPABASE_SERVICE_ROLE_KEY",
                    },
                )?;
                let anon_key = get("SUPABASE_ANON_KEY").unwrap_or_else(|| service_role_key.clone());
                Some(SupabaseConfig {
                    url,
                    service_role_key,
                    anon_key,
                })
            }
            None => None,
        };

        let admin_emails = get("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let resend = get("RESEND_API_KEY").map(|api_key| ResendConfig {
            api_key,
            from: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
        });

        let timezone = match get("TASKS_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|_| ConfigError::InvalidValue {
                name: "TASKS_TIMEZONE",
                value: raw,
            })?,
            None => defaults.timezone,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            dev_mode,
            supabase,
            jwt_secret: get("SUPABASE_JWT_SECRET"),
            admin_emails,
            resend,
            email_relay_url: get("EMAIL_RELAY_URL")
                .map(|raw| check_url("EMAIL_RELAY_URL", raw))
                .transpose()?,
            timezone,
            app_url: get("APP_URL")
                .map(|raw| check_url("APP_URL", raw))
                .transpose()?,
            dev_profiles: get("DEV_PROFILES")
                .map(|raw| parse_profiles(&raw))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}
