//! Server configuration from `TABLEBOOK_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

use crate::engine::{ReserveSettings, SweepPolicy, SweepStrategy};
use crate::identity::ClientRegistry;
use crate::limits::MAX_RESERVATION_MINUTES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Where reservation mails go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransportConfig {
    /// Log the message instead of sending it.
    Log,
    /// Write `.eml` files into a directory.
    File { dir: PathBuf },
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub reserve: ReserveSettings,
    pub refresh_interval: Duration,
    /// Base64 AES-256 key for customer data. Absent means an ephemeral key.
    pub encryption_key: Option<String>,
    pub mail_from: String,
    pub mail_transport: MailTransportConfig,
    pub pics_dir: PathBuf,
    pub seed_dir: Option<PathBuf>,
    pub clients: ClientRegistry,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and empty values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let capacity: u32 = parse_or(&get, "TABLEBOOK_CAPACITY", 30)?;
        if capacity == 0 {
            return Err(invalid("TABLEBOOK_CAPACITY", "0", "must be at least 1"));
        }
        let minutes: i64 = parse_or(&get, "TABLEBOOK_RESERVATION_MINUTES", 90)?;
        let reservation_duration = (1..=MAX_RESERVATION_MINUTES)
            .contains(&minutes)
            .then(|| TimeDelta::try_minutes(minutes))
            .flatten()
            .ok_or_else(|| {
                invalid(
                    "TABLEBOOK_RESERVATION_MINUTES",
                    &minutes.to_string(),
                    &format!("must be between 1 and {MAX_RESERVATION_MINUTES}"),
                )
            })?;
        let strategy = match get("TABLEBOOK_SWEEP") {
            Some(v) => SweepStrategy::from_str(&v)
                .map_err(|e| invalid("TABLEBOOK_SWEEP", &v, &e.to_string()))?,
            None => SweepStrategy::default(),
        };
        let refresh_secs: u64 = parse_or(&get, "TABLEBOOK_REFRESH_SECS", 60)?;
        if refresh_secs == 0 {
            return Err(invalid("TABLEBOOK_REFRESH_SECS", "0", "must be at least 1"));
        }

        let reserve = ReserveSettings {
            policy: SweepPolicy {
                threshold: capacity,
                merge_adjacent: parse_bool_or(&get, "TABLEBOOK_MERGE_ADJACENT", false)?,
                strategy,
            },
            reservation_duration,
            enforce_blocked_windows: parse_bool_or(&get, "TABLEBOOK_ENFORCE_BLOCKED", true)?,
            notify_to: get("TABLEBOOK_NOTIFY_TO"),
        };

        let clients_raw = get("TABLEBOOK_CLIENTS").unwrap_or_else(|| "admin=catalog+reserve".into());
        let clients = ClientRegistry::parse(&clients_raw)
            .map_err(|e| invalid("TABLEBOOK_CLIENTS", &clients_raw, &e.to_string()))?;

        Ok(Self {
            bind: get("TABLEBOOK_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "TABLEBOOK_PORT", 5433)?,
            data_dir: get("TABLEBOOK_DATA_DIR").unwrap_or_else(|| "./data".into()).into(),
            password: get("TABLEBOOK_PASSWORD").unwrap_or_else(|| "tablebook".into()),
            max_connections: parse_or(&get, "TABLEBOOK_MAX_CONNECTIONS", 256)?,
            compact_threshold: parse_or(&get, "TABLEBOOK_COMPACT_THRESHOLD", 1000)?,
            metrics_port: parse_opt(&get, "TABLEBOOK_METRICS_PORT")?,
            tls_cert: get("TABLEBOOK_TLS_CERT"),
            tls_key: get("TABLEBOOK_TLS_KEY"),
            reserve,
            refresh_interval: Duration::from_secs(refresh_secs),
            encryption_key: get("TABLEBOOK_ENCRYPTION_KEY"),
            mail_from: get("TABLEBOOK_MAIL_FROM")
                .unwrap_or_else(|| "Tablebook <reservations@localhost>".into()),
            mail_transport: mail_transport(&get)?,
            pics_dir: get("TABLEBOOK_PICS_DIR").unwrap_or_else(|| "./pics".into()).into(),
            seed_dir: get("TABLEBOOK_SEED_DIR").map(PathBuf::from),
            clients,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn mail_transport(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<MailTransportConfig, ConfigError> {
    let raw = get("TABLEBOOK_MAIL_TRANSPORT").unwrap_or_else(|| "log".into());
    if let Some(dir) = raw.strip_prefix("file:") {
        if dir.trim().is_empty() {
            return Err(invalid("TABLEBOOK_MAIL_TRANSPORT", &raw, "file transport needs a directory"));
        }
        return Ok(MailTransportConfig::File {
            dir: PathBuf::from(dir.trim()),
        });
    }
    match raw.to_ascii_lowercase().as_str() {
        "log" => Ok(MailTransportConfig::Log),
        "smtp" => Ok(MailTransportConfig::Smtp {
            host: get("TABLEBOOK_SMTP_HOST").ok_or(ConfigError::Missing("TABLEBOOK_SMTP_HOST"))?,
            port: parse_or(get, "TABLEBOOK_SMTP_PORT", 587)?,
            username: get("TABLEBOOK_SMTP_USER"),
            password: get("TABLEBOOK_SMTP_PASSWORD"),
            use_tls: parse_bool_or(get, "TABLEBOOK_SMTP_TLS", true)?,
        }),
        _ => Err(invalid(
            "TABLEBOOK_MAIL_TRANSPORT",
            &raw,
            "expected log, file:<dir> or smtp",
        )),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e: T::Err| invalid(key, &v, &e.to_string()))
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_bool_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(v) = get(key) else { return Ok(default) };
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &v, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.listen_addr(), "0.0.0.0:5433");
        assert_eq!(c.password, "tablebook");
        assert_eq!(c.max_connections, 256);
        assert_eq!(c.compact_threshold, 1000);
        assert_eq!(c.metrics_port, None);
        assert_eq!(c.reserve.policy.threshold, 30);
        assert!(!c.reserve.policy.merge_adjacent);
        assert_eq!(c.reserve.policy.strategy, SweepStrategy::RunningSum);
        assert_eq!(c.reserve.reservation_duration, TimeDelta::minutes(90));
        assert!(c.reserve.enforce_blocked_windows);
        assert_eq!(c.reserve.notify_to, None);
        assert_eq!(c.refresh_interval, Duration::from_secs(60));
        assert_eq!(c.mail_transport, MailTransportConfig::Log);
        assert_eq!(c.pics_dir, PathBuf::from("./pics"));
        assert!(c.seed_dir.is_none());
        assert!(!c.clients.identify(Some("admin")).is_anonymous());
    }

    #[test]
    fn overrides() {
        let c = config(&[
            ("TABLEBOOK_PORT", "6543"),
            ("TABLEBOOK_CAPACITY", "12"),
            ("TABLEBOOK_RESERVATION_MINUTES", "120"),
            ("TABLEBOOK_MERGE_ADJACENT", "true"),
            ("TABLEBOOK_SWEEP", "direct"),
            ("TABLEBOOK_ENFORCE_BLOCKED", "off"),
            ("TABLEBOOK_NOTIFY_TO", "staff@example.com"),
            ("TABLEBOOK_METRICS_PORT", "9090"),
            ("TABLEBOOK_CLIENTS", "host=reserve"),
        ])
        .unwrap();
        assert_eq!(c.port, 6543);
        assert_eq!(c.reserve.policy.threshold, 12);
        assert_eq!(c.reserve.reservation_duration, TimeDelta::minutes(120));
        assert!(c.reserve.policy.merge_adjacent);
        assert_eq!(c.reserve.policy.strategy, SweepStrategy::Direct);
        assert!(!c.reserve.enforce_blocked_windows);
        assert_eq!(c.reserve.notify_to.as_deref(), Some("staff@example.com"));
        assert_eq!(c.metrics_port, Some(9090));
        assert!(c.clients.identify(Some("admin")).is_anonymous());
    }

    #[test]
    fn empty_values_use_defaults() {
        let c = config(&[("TABLEBOOK_PORT", ""), ("TABLEBOOK_NOTIFY_TO", "  ")]).unwrap();
        assert_eq!(c.port, 5433);
        assert_eq!(c.reserve.notify_to, None);
    }

    #[test]
    fn rejects_zero_capacity_and_duration() {
        assert!(matches!(
            config(&[("TABLEBOOK_CAPACITY", "0")]),
            Err(ConfigError::Invalid { key: "TABLEBOOK_CAPACITY", .. })
        ));
        assert!(matches!(
            config(&[("TABLEBOOK_RESERVATION_MINUTES", "0")]),
            Err(ConfigError::Invalid { key: "TABLEBOOK_RESERVATION_MINUTES", .. })
        ));
        assert!(config(&[("TABLEBOOK_CAPACITY", "-3")]).is_err());
    }

    #[test]
    fn reservation_duration_is_capped_at_one_day() {
        let c = config(&[("TABLEBOOK_RESERVATION_MINUTES", "1440")]).unwrap();
        assert_eq!(c.reserve.reservation_duration, TimeDelta::days(1));
        for too_long in ["1441", "9223372036854775807"] {
            assert!(matches!(
                config(&[("TABLEBOOK_RESERVATION_MINUTES", too_long)]),
                Err(ConfigError::Invalid { key: "TABLEBOOK_RESERVATION_MINUTES", .. })
            ), "{too_long}");
        }
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("TABLEBOOK_PORT", "http")]).is_err());
        assert!(config(&[("TABLEBOOK_MERGE_ADJACENT", "maybe")]).is_err());
        assert!(config(&[("TABLEBOOK_SWEEP", "quadratic")]).is_err());
        assert!(config(&[("TABLEBOOK_CLIENTS", "admin=root")]).is_err());
        assert!(config(&[("TABLEBOOK_MAIL_TRANSPORT", "pigeon")]).is_err());
    }

    #[test]
    fn mail_transports() {
        let c = config(&[("TABLEBOOK_MAIL_TRANSPORT", "file:/tmp/mail")]).unwrap();
        assert_eq!(
            c.mail_transport,
            MailTransportConfig::File {
                dir: PathBuf::from("/tmp/mail")
            }
        );

        assert!(matches!(
            config(&[("TABLEBOOK_MAIL_TRANSPORT", "smtp")]),
            Err(ConfigError::Missing("TABLEBOOK_SMTP_HOST"))
        ));

        let c = config(&[
            ("TABLEBOOK_MAIL_TRANSPORT", "smtp"),
            ("TABLEBOOK_SMTP_HOST", "mail.example.com"),
            ("TABLEBOOK_SMTP_USER", "bot"),
            ("TABLEBOOK_SMTP_TLS", "false"),
        ])
        .unwrap();
        assert_eq!(
            c.mail_transport,
            MailTransportConfig::Smtp {
                host: "mail.example.com".into(),
                port: 587,
                username: Some("bot".into()),
                password: None,
                use_tls: false,
            }
        );
    }
}
