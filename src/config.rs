//! Service configuration loaded from environment variables.
//!
//! Everything except `DATABASE_URL` has a default so the server can start
//! with minimal configuration for local development.

use std::net::SocketAddr;

/// Runtime configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address for the HTTP API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// Admin session lifetime in minutes.
    /// Env: `SESSION_TTL_MINUTES`
    /// Default: `60`
    pub session_ttl_minutes: u64,

    /// HTTP mail API endpoint for outbound notifications.
    /// Env: `MAIL_API_URL`
    /// Default: unset (mail delivery disabled).
    pub mail_api_url: Option<String>,

    /// Bearer token for the mail API.
    /// Env: `MAIL_API_TOKEN`
    /// Default: empty.
    pub mail_api_token: String,

    /// Sender address for outbound notifications.
    /// Env: `MAIL_FROM`
    /// Default: `no-reply@qareebeen.com`
    pub mail_from: String,

    /// Address receiving the new-submission alert.
    /// Env: `ADMIN_EMAIL`
    /// Default: `admin@qareebeen.com`
    pub admin_email: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 3000).into(),
            session_ttl_minutes: 60,
            mail_api_url: None,
            mail_api_token: String::new(),
            mail_from: "no-reply@qareebeen.com".to_string(),
            admin_email: "admin@qareebeen.com".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(val) = std::env::var("SESSION_TTL_MINUTES") {
            if let Ok(minutes) = val.parse::<u64>() {
                config.session_ttl_minutes = minutes;
            } else {
                tracing::warn!(value = %val, "Invalid SESSION_TTL_MINUTES, using default");
            }
        }

        if let Ok(url) = std::env::var("MAIL_API_URL") {
            if !url.is_empty() {
                config.mail_api_url = Some(url);
            }
        }

        if let Ok(token) = std::env::var("MAIL_API_TOKEN") {
            config.mail_api_token = token;
        }

        if let Ok(from) = std::env::var("MAIL_FROM") {
            config.mail_from = from;
        }

        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            config.admin_email = email;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3000).into());
        assert_eq!(config.session_ttl_minutes, 60);
        assert!(config.mail_api_url.is_none());
    }
}
