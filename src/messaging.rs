// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Messaging Abstractions
//!
//! Transport-agnostic seams between the demo logic and RabbitMQ: the sender
//! drives a [`Publisher`], the dispatcher hands deliveries to a
//! [`ConsumerHandler`].

use crate::errors::MessagingError;
use async_trait::async_trait;

/// An outbound message: raw bytes addressed to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMessage {
    pub to: String,
    pub key: Option<String>,
    pub data: Vec<u8>,
}

impl PublishMessage {
    pub fn new(to: &str, key: Option<&str>, data: Vec<u8>) -> Self {
        PublishMessage {
            to: to.to_owned(),
            key: key.map(str::to_owned),
            data,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Sends `msg` without waiting for a broker confirmation.
    async fn publish(&self, msg: &PublishMessage) -> Result<(), MessagingError>;
}

/// An inbound delivery as seen by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerMessage {
    pub from: String,
    pub routing_key: String,
    pub data: Vec<u8>,
    pub redelivered: bool,
}

impl ConsumerMessage {
    pub fn new(from: &str, routing_key: &str, data: &[u8], redelivered: bool) -> Self {
        ConsumerMessage {
            from: from.to_owned(),
            routing_key: routing_key.to_owned(),
            data: data.to_vec(),
            redelivered,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn exec(&self, msg: &ConsumerMessage) -> Result<(), MessagingError>;
}

/// Binds a handler to a source of deliveries and drives it.
#[async_trait]
pub trait Dispatcher {
    fn register(self, handler: std::sync::Arc<dyn ConsumerHandler>) -> Self
    where
        Self: Sized;

    /// Consumes until the source closes or fails.
    async fn consume_blocking(&self) -> Result<(), MessagingError>;
}
