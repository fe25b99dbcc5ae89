use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub access: AccessConfig,
    pub team: TeamConfig,
    pub links: LinksConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string; when absent the server runs on the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Interval between periodic re-checks while a session stays open.
    pub recheck_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub invite_expiry_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Quiz type used for share targets when a mapping carries none.
    pub default_quiz_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Downstream automation endpoint; unset means dispatch is skipped.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Shared secret sent as X-Webhook-Token when present.
    pub secret: Option<String>,
    /// Include doctor telephony credentials in the outbound envelope.
    /// Off unless an operator opts in explicitly.
    pub forward_telephony: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("LEADPULSE_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Access gate overrides
        if let Ok(v) = env::var("ACCESS_RECHECK_INTERVAL_SECS") {
            self.access.recheck_interval_secs =
                v.parse().unwrap_or(self.access.recheck_interval_secs);
        }

        // Team overrides
        if let Ok(v) = env::var("TEAM_INVITE_EXPIRY_DAYS") {
            self.team.invite_expiry_days = v.parse().unwrap_or(self.team.invite_expiry_days);
        }

        // Link overrides
        if let Ok(v) = env::var("LINKS_DEFAULT_QUIZ") {
            if !v.is_empty() {
                self.links.default_quiz_type = v.to_lowercase();
            }
        }

        // Webhook overrides
        if let Ok(v) = env::var("N8N_WEBHOOK_URL").or_else(|_| env::var("WEBHOOK_ENDPOINT")) {
            if !v.is_empty() {
                self.webhook.endpoint = Some(v);
            }
        }
        if let Ok(v) = env::var("WEBHOOK_TIMEOUT_SECS") {
            self.webhook.timeout_secs = v.parse().unwrap_or(self.webhook.timeout_secs);
        }
        if let Ok(v) = env::var("WEBHOOK_SECRET") {
            if !v.is_empty() {
                self.webhook.secret = Some(v);
            }
        }
        if let Ok(v) = env::var("WEBHOOK_FORWARD_TELEPHONY") {
            self.webhook.forward_telephony = v.parse().unwrap_or(self.webhook.forward_telephony);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            access: AccessConfig {
                recheck_interval_secs: 300,
            },
            team: TeamConfig {
                invite_expiry_days: 14,
            },
            links: LinksConfig {
                default_quiz_type: "nose".to_string(),
            },
            webhook: WebhookConfig {
                endpoint: None,
                timeout_secs: 10,
                secret: None,
                forward_telephony: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://staging.leadpulse.example".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24,
            },
            access: AccessConfig {
                recheck_interval_secs: 300,
            },
            team: TeamConfig {
                invite_expiry_days: 14,
            },
            links: LinksConfig {
                default_quiz_type: "nose".to_string(),
            },
            webhook: WebhookConfig {
                endpoint: None,
                timeout_secs: 10,
                secret: None,
                forward_telephony: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://app.leadpulse.example".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 4,
            },
            access: AccessConfig {
                recheck_interval_secs: 300,
            },
            team: TeamConfig {
                invite_expiry_days: 14,
            },
            links: LinksConfig {
                default_quiz_type: "nose".to_string(),
            },
            webhook: WebhookConfig {
                endpoint: None,
                timeout_secs: 10,
                secret: None,
                forward_telephony: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
