// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! `AmqpError` covers the broker side: connecting, TLS material, channel,
//! topology declaration and consumption. `MessagingError` is the error of the
//! transport-agnostic [`crate::messaging`] traits, and `ConfigError` is raised
//! while reading the environment.

use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Error reading the client certificate or the trusted CA chain
    #[error("failure to load tls material `{0}`")]
    TlsMaterialError(String),

    /// Error establishing the connection: unreachable broker, TLS handshake
    /// failure or rejected EXTERNAL authentication
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error closing a channel or a connection
    #[error("failure to close `{0}`")]
    CloseError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to binding exchange `{0}` to queue `{1}`")]
    BindingExchangeToQueueError(String, String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error negative-acknowledging a message
    #[error("failure to nack message")]
    NackMessageError,

    /// Error consuming a message
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),

    /// An invalid session state transition was requested
    #[error("invalid session transition from `{0}` to `{1}`")]
    InvalidTransition(String, String),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

/// Errors of the publisher and handler abstractions.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessagingError {
    #[error("failure to publish")]
    PublisherError,

    #[error("failure to decode payload: {0}")]
    DecodeError(String),

    #[error("failure to create consumer")]
    CreatingConsumerError,

    #[error("consumer error: {0}")]
    ConsumerError(String),
}

/// Errors raised while building [`crate::configs::Configs`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(String),

    #[error("invalid value `{1}` for `{0}`")]
    Invalid(String, String),
}
