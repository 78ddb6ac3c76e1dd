// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Sender
//!
//! Publishes a finite, ordered sequence of `Message #<index>` payloads to the
//! shared exchange, paced by a [`Pacer`]. The first failed publish ends the
//! run; nothing is retried.

use crate::{
    configs::{Configs, SenderConfigs, TopologyConfigs},
    errors::{AmqpError, MessagingError},
    messaging::{PublishMessage, Publisher},
    pacer::Pacer,
    publisher::RabbitMQPublisher,
    session::{Session, SessionState},
};
use std::sync::Arc;
use tracing::{error, info};

/// Wire representation of the `index`-th message.
pub fn message_body(index: u32) -> Vec<u8> {
    format!("Message #{index}").into_bytes()
}

pub struct Sender {
    publisher: Arc<dyn Publisher>,
    exchange: String,
    routing_key: String,
    count: u32,
    pacer: Pacer,
}

impl Sender {
    /// Creates a new Sender.
    ///
    /// # Parameters
    /// * `publisher` - Where the messages go
    /// * `topology` - Exchange and routing key the messages are addressed to
    /// * `cfg` - Message count and pacing interval
    ///
    /// # Returns
    /// A Sender ready to run
    pub fn new(
        publisher: Arc<dyn Publisher>,
        topology: &TopologyConfigs,
        cfg: &SenderConfigs,
    ) -> Self {
        Sender {
            publisher,
            exchange: topology.exchange.clone(),
            routing_key: topology.routing_key.clone(),
            count: cfg.message_count,
            pacer: Pacer::new(cfg.interval),
        }
    }

    /// Publishes every message and returns how many were sent.
    ///
    /// # Returns
    /// The message count, or the first publish error
    pub async fn run(&mut self) -> Result<u32, MessagingError> {
        for index in 0..self.count {
            self.pacer.tick().await;

            info!("Sending Message {}", index);
            let msg = PublishMessage::new(
                &self.exchange,
                Some(&self.routing_key),
                message_body(index),
            );

            if let Err(err) = self.publisher.publish(&msg).await {
                error!(error = err.to_string(), index, "aborting the send loop");
                return Err(err);
            }
        }

        Ok(self.count)
    }
}

/// Connects, declares the topology, sends every message and closes the
/// channel and then the connection.
///
/// # Parameters
/// * `cfg` - Broker, topology and pacing settings
///
/// # Returns
/// The number of messages handed to the broker
pub async fn run_sender(cfg: &Configs) -> Result<u32, AmqpError> {
    let mut session = Session::new();
    let (conn, channel) = session.open(cfg).await?;

    session.transition(SessionState::Operating)?;
    let publisher = RabbitMQPublisher::new(channel.clone());
    let sent = match Sender::new(publisher, &cfg.topology, &cfg.sender)
        .run()
        .await
    {
        Ok(sent) => sent,
        Err(err) => {
            session.abort(&conn, &channel).await?;
            return Err(err.into());
        }
    };
    info!(sent, "all messages sent");

    session.close(&conn, &channel).await?;
    Ok(sent)
}
