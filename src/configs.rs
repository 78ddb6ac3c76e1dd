// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Configuration
//!
//! Both binaries are configured through environment variables (optionally
//! loaded from a `.env` file). Certificate locations and the passphrase are
//! never compiled in: the identity path and its password are required.

use crate::errors::ConfigError;
use std::{path::PathBuf, str::FromStr, time::Duration};

pub const APP_NAME: &str = "APP_NAME";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const RABBITMQ_HOST: &str = "RABBITMQ_HOST";
pub const RABBITMQ_PORT: &str = "RABBITMQ_PORT";
pub const RABBITMQ_VHOST: &str = "RABBITMQ_VHOST";
pub const RABBITMQ_TLS_IDENTITY: &str = "RABBITMQ_TLS_IDENTITY";
pub const RABBITMQ_TLS_IDENTITY_PASSWORD: &str = "RABBITMQ_TLS_IDENTITY_PASSWORD";
pub const RABBITMQ_TLS_CA_CERT: &str = "RABBITMQ_TLS_CA_CERT";
pub const TOPOLOGY_EXCHANGE: &str = "TOPOLOGY_EXCHANGE";
pub const TOPOLOGY_QUEUE: &str = "TOPOLOGY_QUEUE";
pub const TOPOLOGY_ROUTING_KEY: &str = "TOPOLOGY_ROUTING_KEY";
pub const SENDER_MESSAGE_COUNT: &str = "SENDER_MESSAGE_COUNT";
pub const SENDER_INTERVAL_MS: &str = "SENDER_INTERVAL_MS";
pub const RECEIVER_PROCESSING_DELAY_MS: &str = "RECEIVER_PROCESSING_DELAY_MS";
pub const RECEIVER_ACK_MODE: &str = "RECEIVER_ACK_MODE";

pub const DEFAULT_EXCHANGE: &str = "DemoExchange";
pub const DEFAULT_QUEUE: &str = "DemoQueue";
pub const DEFAULT_ROUTING_KEY: &str = "demo-routing-key";

/// How the receiver acknowledges deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckMode {
    /// The broker considers a message handled as soon as it is handed over.
    #[default]
    Auto,
    /// The message is acked once the handler succeeded, nacked otherwise.
    Manual,
}

impl FromStr for AckMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(AckMode::Auto),
            "manual" | "manual-after-processing" => Ok(AckMode::Manual),
            _ => Err(ConfigError::Invalid(
                RECEIVER_ACK_MODE.to_owned(),
                s.to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfigs {
    pub name: String,
    pub log_level: String,
}

/// Client certificate material used for mutual TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfigs {
    /// PKCS#12 container holding the client certificate and its key
    pub identity_path: PathBuf,
    pub identity_password: String,
    /// PEM chain trusted in addition to the system store
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RabbitMQConfigs {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub tls: TlsConfigs,
}

/// Names shared out-of-band between sender and receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfigs {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Default for TopologyConfigs {
    fn default() -> Self {
        TopologyConfigs {
            exchange: DEFAULT_EXCHANGE.to_owned(),
            queue: DEFAULT_QUEUE.to_owned(),
            routing_key: DEFAULT_ROUTING_KEY.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfigs {
    pub message_count: u32,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfigs {
    pub processing_delay: Duration,
    pub ack_mode: AckMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configs {
    pub app: AppConfigs,
    pub rabbitmq: RabbitMQConfigs,
    pub topology: TopologyConfigs,
    pub sender: SenderConfigs,
    pub receiver: ReceiverConfigs,
}

impl Configs {
    /// Reads the configuration from the process environment, loading `.env`
    /// first when one exists.
    pub fn from_env(default_app_name: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(default_app_name, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Parameters
    /// * `default_app_name` - App name used when `APP_NAME` is unset
    /// * `lookup` - Returns the value of an environment key, if any
    ///
    /// # Returns
    /// The configuration, or the first missing or invalid value
    pub fn from_lookup<F>(default_app_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::Missing(key.to_owned()));

        Ok(Configs {
            app: AppConfigs {
                name: get(APP_NAME, default_app_name),
                log_level: get(LOG_LEVEL, "info"),
            },
            rabbitmq: RabbitMQConfigs {
                host: get(RABBITMQ_HOST, "localhost"),
                port: parse(RABBITMQ_PORT, lookup(RABBITMQ_PORT), 5671)?,
                vhost: get(RABBITMQ_VHOST, "/"),
                tls: TlsConfigs {
                    identity_path: PathBuf::from(required(RABBITMQ_TLS_IDENTITY)?),
                    identity_password: required(RABBITMQ_TLS_IDENTITY_PASSWORD)?,
                    ca_cert_path: lookup(RABBITMQ_TLS_CA_CERT).map(PathBuf::from),
                },
            },
            topology: TopologyConfigs {
                exchange: get(TOPOLOGY_EXCHANGE, DEFAULT_EXCHANGE),
                queue: get(TOPOLOGY_QUEUE, DEFAULT_QUEUE),
                routing_key: get(TOPOLOGY_ROUTING_KEY, DEFAULT_ROUTING_KEY),
            },
            sender: SenderConfigs {
                message_count: parse(SENDER_MESSAGE_COUNT, lookup(SENDER_MESSAGE_COUNT), 60)?,
                interval: Duration::from_millis(parse(
                    SENDER_INTERVAL_MS,
                    lookup(SENDER_INTERVAL_MS),
                    1000,
                )?),
            },
            receiver: ReceiverConfigs {
                processing_delay: Duration::from_millis(parse(
                    RECEIVER_PROCESSING_DELAY_MS,
                    lookup(RECEIVER_PROCESSING_DELAY_MS),
                    2000,
                )?),
                ack_mode: match lookup(RECEIVER_ACK_MODE) {
                    Some(value) => value.parse()?,
                    None => AckMode::default(),
                },
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key.to_owned(), raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const TLS: [(&str, &str); 2] = [
        (RABBITMQ_TLS_IDENTITY, "/certs/client.pfx"),
        (RABBITMQ_TLS_IDENTITY_PASSWORD, "changeit"),
    ];

    #[test]
    fn defaults_match_the_demo_setup() {
        let cfg = Configs::from_lookup("Rabbit Sender App", lookup(&TLS)).unwrap();

        assert_eq!(cfg.app.name, "Rabbit Sender App");
        assert_eq!(cfg.rabbitmq.host, "localhost");
        assert_eq!(cfg.rabbitmq.port, 5671);
        assert_eq!(cfg.rabbitmq.vhost, "/");
        assert_eq!(cfg.rabbitmq.tls.ca_cert_path, None);
        assert_eq!(cfg.topology, TopologyConfigs::default());
        assert_eq!(cfg.sender.message_count, 60);
        assert_eq!(cfg.sender.interval, Duration::from_secs(1));
        assert_eq!(cfg.receiver.processing_delay, Duration::from_secs(2));
        assert_eq!(cfg.receiver.ack_mode, AckMode::Auto);
    }

    #[test]
    fn identity_is_required() {
        let err = Configs::from_lookup("app", lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(RABBITMQ_TLS_IDENTITY.to_owned()));

        let err = Configs::from_lookup("app", lookup(&TLS[..1])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(RABBITMQ_TLS_IDENTITY_PASSWORD.to_owned())
        );
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = TLS.to_vec();
        vars.extend([
            (RABBITMQ_PORT, "5672"),
            (RABBITMQ_TLS_CA_CERT, "/certs/ca.pem"),
            (SENDER_MESSAGE_COUNT, "5"),
            (SENDER_INTERVAL_MS, "0"),
            (RECEIVER_ACK_MODE, "Manual"),
        ]);

        let cfg = Configs::from_lookup("app", lookup(&vars)).unwrap();

        assert_eq!(cfg.rabbitmq.port, 5672);
        assert_eq!(
            cfg.rabbitmq.tls.ca_cert_path,
            Some(PathBuf::from("/certs/ca.pem"))
        );
        assert_eq!(cfg.sender.message_count, 5);
        assert_eq!(cfg.sender.interval, Duration::ZERO);
        assert_eq!(cfg.receiver.ack_mode, AckMode::Manual);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut vars = TLS.to_vec();
        vars.push((RABBITMQ_PORT, "amqps"));

        let err = Configs::from_lookup("app", lookup(&vars)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid(RABBITMQ_PORT.to_owned(), "amqps".to_owned())
        );
    }

    #[test]
    fn ack_mode_parsing() {
        assert_eq!("auto".parse::<AckMode>().unwrap(), AckMode::Auto);
        assert_eq!(
            "manual-after-processing".parse::<AckMode>().unwrap(),
            AckMode::Manual
        );
        assert!("sometimes".parse::<AckMode>().is_err());
    }
}
