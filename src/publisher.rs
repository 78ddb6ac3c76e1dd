// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! Publishes raw payloads to an exchange. Messages carry no headers and no
//! properties: the body bytes are the whole wire format. Publishing is
//! fire-and-forget; publisher confirms are never enabled on the channel.

use crate::{
    errors::MessagingError,
    messaging::{PublishMessage, Publisher},
};
use async_trait::async_trait;
use lapin::{options::BasicPublishOptions, BasicProperties, Channel};
use std::sync::Arc;
use tracing::error;

/// RabbitMQ implementation of the Publisher trait.
pub struct RabbitMQPublisher {
    channel: Arc<Channel>,
}

impl RabbitMQPublisher {
    /// Creates a new RabbitMQPublisher instance.
    ///
    /// # Parameters
    /// * `channel` - Channel messages are published on
    ///
    /// # Returns
    /// An Arc-wrapped RabbitMQPublisher
    pub fn new(channel: Arc<Channel>) -> Arc<RabbitMQPublisher> {
        Arc::new(RabbitMQPublisher { channel })
    }
}

#[async_trait]
impl Publisher for RabbitMQPublisher {
    /// Publishes the raw payload to `infos.to` under `infos.key`.
    ///
    /// # Parameters
    /// * `infos` - Exchange, optional routing key and payload
    ///
    /// # Returns
    /// Ok(()) once the frame was handed to lapin, or `PublisherError`
    async fn publish(&self, infos: &PublishMessage) -> Result<(), MessagingError> {
        match self
            .channel
            .basic_publish(
                &infos.to,
                infos.key.as_deref().unwrap_or_default(),
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &infos.data,
                BasicProperties::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(MessagingError::PublisherError)
            }
            _ => Ok(()),
        }
    }
}
