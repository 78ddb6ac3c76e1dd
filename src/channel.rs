// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module establishes the TLS connection to RabbitMQ, authenticating with
//! the client certificate (SASL EXTERNAL), and opens the single channel each
//! process works on. It also closes both in the required order.

use crate::{configs::Configs, errors::AmqpError, tls::load_tls_config};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tracing::{debug, error};

/// Reply code sent to the broker on a normal close.
pub const REPLY_SUCCESS: u16 = 200;

/// Characters of a vhost kept as-is in the URI path.
const VHOST: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Builds the `amqps` URI for the configured broker.
///
/// Credentials are never part of the URI: the broker derives the identity
/// from the client certificate. The vhost is percent-encoded as a whole and
/// an empty vhost stands for the default `/`.
///
/// # Parameters
/// * `cfg` - Configuration holding the broker host, port and vhost
///
/// # Returns
/// The connection URI, e.g. `amqps://localhost:5671/%2F?auth_mechanism=external`
pub fn amqps_uri(cfg: &Configs) -> String {
    let vhost = match cfg.rabbitmq.vhost.as_str() {
        "" => "/",
        other => other,
    };
    let vhost = utf8_percent_encode(vhost, VHOST);

    format!(
        "amqps://{}:{}/{}?auth_mechanism=external",
        cfg.rabbitmq.host, cfg.rabbitmq.port, vhost
    )
}

/// Connects to RabbitMQ over mutual TLS and creates a channel on that
/// connection.
///
/// Any failure here (unreadable certificate, TLS handshake, hostname
/// mismatch, rejected EXTERNAL authentication, unreachable broker) is
/// terminal: there is no reconnect.
///
/// # Parameters
/// * `cfg` - Configuration with the broker address, TLS material and app name
///
/// # Returns
/// The connection and its channel, both shared
pub async fn new_amqp_channel(cfg: &Configs) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    let tls = load_tls_config(&cfg.rabbitmq.tls)?;

    debug!(
        host = %cfg.rabbitmq.host,
        port = cfg.rabbitmq.port,
        "creating amqp connection..."
    );
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app.name.clone()));

    let conn = match Connection::connect_with_config(&amqps_uri(cfg), options, tls).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError(err.to_string()))
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(c)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError {})
        }
    }
}

/// Closes the channel, then the connection.
pub async fn close(conn: &Connection, channel: &Channel) -> Result<(), AmqpError> {
    debug!("closing amqp channel...");
    if let Err(err) = channel.close(REPLY_SUCCESS, "OK").await {
        error!(error = err.to_string(), "error to close the channel");
        return Err(AmqpError::CloseError("channel".to_owned()));
    }

    debug!("closing amqp connection...");
    if let Err(err) = conn.close(REPLY_SUCCESS, "OK").await {
        error!(error = err.to_string(), "error to close the connection");
        return Err(AmqpError::CloseError("connection".to_owned()));
    }

    debug!("amqp connection closed");
    Ok(())
}
