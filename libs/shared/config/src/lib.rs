use std::env;
use std::str::FromStr;

use chrono_tz::Tz;
use tracing::warn;

pub const DEFAULT_BUSINESS_TIMEZONE: &str = "Asia/Kolkata";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,
    pub business_timezone: String,
    pub status_sweep_interval_seconds: u64,
    pub followup_interval_seconds: u64,
    pub followup_max_attempts: u32,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            business_timezone: env::var("BUSINESS_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_BUSINESS_TIMEZONE.to_string()),
            status_sweep_interval_seconds: parse_or("STATUS_SWEEP_INTERVAL_SECONDS", 60),
            followup_interval_seconds: parse_or("FOLLOWUP_INTERVAL_SECONDS", 15),
            followup_max_attempts: parse_or("FOLLOWUP_MAX_ATTEMPTS", 5),
            server_port: parse_or("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Whether appointment data should live in Supabase rather than in process memory.
    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }

    /// The zone used to interpret wall-clock appointment input.
    pub fn business_tz(&self) -> Tz {
        Tz::from_str(&self.business_timezone).unwrap_or_else(|_| {
            warn!(
                "BUSINESS_TIMEZONE '{}' is not a valid IANA zone, using {}",
                self.business_timezone, DEFAULT_BUSINESS_TIMEZONE
            );
            chrono_tz::Asia::Kolkata
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            redis_url: None,
            business_timezone: DEFAULT_BUSINESS_TIMEZONE.to_string(),
            status_sweep_interval_seconds: 60,
            followup_interval_seconds: 15,
            followup_max_attempts: 5,
            server_port: 3000,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_timezone_falls_back_to_kolkata() {
        let config = AppConfig {
            business_timezone: "Mars/Olympus_Mons".to_string(),
            ..AppConfig::default()
        };

        assert_eq!(config.business_tz(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn configured_timezone_is_parsed() {
        let config = AppConfig {
            business_timezone: "Europe/London".to_string(),
            ..AppConfig::default()
        };

        assert_eq!(config.business_tz(), chrono_tz::Europe::London);
    }

    #[test]
    fn database_requires_url_and_service_key() {
        let mut config = AppConfig::default();
        assert!(!config.is_database_configured());

        config.supabase_url = "http://localhost:54321".to_string();
        assert!(!config.is_database_configured());

        config.supabase_service_role_key = "service-key".to_string();
        assert!(config.is_database_configured());
    }
}
