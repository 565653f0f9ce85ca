//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EXTRACTOR_TIMEOUT_MS,
    DEFAULT_EXTRACTOR_URL, DEFAULT_MATCH_THRESHOLD, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_SUMMARY_WINDOW_DAYS, DEFAULT_UTC_OFFSET_MINUTES, MIN_JWT_SECRET_LENGTH,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    /// When set, per-user write locks are taken in Redis instead of in-process.
    pub redis_url: Option<String>,
    jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub extractor_url: String,
    pub policy: AttendancePolicy,
    pub matching: MatchSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &"[REDACTED]")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("extractor_url", &self.extractor_url)
            .field("policy", &self.policy)
            .field("matching", &self.matching)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set or is too short (security requirement).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let late_after = env::var("LATE_AFTER").ok().and_then(|v| {
            NaiveTime::parse_from_str(&v, "%H:%M")
                .map_err(|e| tracing::warn!(value = %v, error = %e, "Ignoring invalid LATE_AFTER"))
                .ok()
        });

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            jwt_secret,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_env("SERVER_PORT").unwrap_or(DEFAULT_SERVER_PORT),
            extractor_url: env::var("EXTRACTOR_URL")
                .unwrap_or_else(|_| DEFAULT_EXTRACTOR_URL.to_string()),
            policy: AttendancePolicy {
                utc_offset_minutes: parse_env("ATTENDANCE_UTC_OFFSET_MINUTES")
                    .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
                late_after,
                summary_window_days: parse_env("SUMMARY_WINDOW_DAYS")
                    .filter(|d: &i64| *d > 0)
                    .unwrap_or(DEFAULT_SUMMARY_WINDOW_DAYS),
            },
            matching: MatchSettings {
                threshold: parse_env("MATCH_THRESHOLD").unwrap_or(DEFAULT_MATCH_THRESHOLD),
                dimension: parse_env("EMBEDDING_DIMENSION")
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
                extractor_timeout_ms: parse_env("EXTRACTOR_TIMEOUT_MS")
                    .unwrap_or(DEFAULT_EXTRACTOR_TIMEOUT_MS),
            },
        }
    }

    /// Get JWT secret bytes for token verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Rules that turn raw timestamps into attendance facts.
///
/// Calendar days are derived in one fixed offset so that a record's `date`
/// never depends on the server's local zone.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    pub utc_offset_minutes: i32,
    /// Check-ins strictly after this local time are flagged late.
    pub late_after: Option<NaiveTime>,
    pub summary_window_days: i64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            late_after: None,
            summary_window_days: DEFAULT_SUMMARY_WINDOW_DAYS,
        }
    }
}

impl AttendancePolicy {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day of an instant in the attendance zone.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    /// Today's calendar day in the attendance zone.
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    pub fn is_late(&self, check_in: DateTime<Utc>) -> bool {
        match self.late_after {
            Some(cutoff) => check_in.with_timezone(&self.offset()).time() > cutoff,
            None => false,
        }
    }
}

/// Identity matching parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub threshold: f64,
    pub dimension: usize,
    pub extractor_timeout_ms: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            extractor_timeout_ms: DEFAULT_EXTRACTOR_TIMEOUT_MS,
        }
    }
}
