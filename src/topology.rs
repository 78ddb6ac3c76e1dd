// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! Sender and receiver never talk to each other: they rendezvous on an
//! exchange, a queue and the binding between them. Both sides declare the
//! whole topology on every connection. AMQP declarations with identical
//! arguments are idempotent, so redeclaring is a broker-side no-op.
//!
//! The main components are:
//! - `Topology` trait: interface for topology management
//! - `AmqpTopology`: lapin implementation of the trait
//! - `TopologyDefinitions`: the demo topology derived from configuration

use crate::{
    configs::TopologyConfigs,
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
};
use async_trait::async_trait;
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Trait defining the interface for topology management.
#[async_trait]
pub trait Topology<'tp> {
    /// Adds an exchange definition to the topology.
    fn exchange(self, def: &'tp ExchangeDefinition) -> Self;

    /// Adds a queue definition to the topology.
    fn queue(self, def: &'tp QueueDefinition) -> Self;

    /// Adds a queue-to-exchange binding to the topology.
    fn queue_binding(self, binding: &'tp QueueBinding) -> Self;

    /// Declares every exchange, then every queue, then every binding.
    async fn install(&self) -> Result<(), AmqpError>;
}

/// RabbitMQ implementation of the Topology trait.
pub struct AmqpTopology<'tp> {
    channel: Arc<Channel>,
    pub(crate) queues: Vec<&'tp QueueDefinition>,
    pub(crate) queues_binding: Vec<&'tp QueueBinding<'tp>>,
    pub(crate) exchanges: Vec<&'tp ExchangeDefinition<'tp>>,
}

impl<'tp> AmqpTopology<'tp> {
    /// Creates an empty topology bound to a channel.
    ///
    /// # Parameters
    /// * `channel` - Channel the declarations are sent on
    ///
    /// # Returns
    /// A new AmqpTopology instance
    pub fn new(channel: Arc<Channel>) -> AmqpTopology<'tp> {
        AmqpTopology {
            channel,
            queues: vec![],
            queues_binding: vec![],
            exchanges: vec![],
        }
    }
}

#[async_trait]
impl<'tp> Topology<'tp> for AmqpTopology<'tp> {
    fn exchange(mut self, def: &'tp ExchangeDefinition) -> Self {
        self.exchanges.push(def);
        self
    }

    fn queue(mut self, def: &'tp QueueDefinition) -> Self {
        self.queues.push(def);
        self
    }

    fn queue_binding(mut self, binding: &'tp QueueBinding) -> Self {
        self.queues_binding.push(binding);
        self
    }

    async fn install(&self) -> Result<(), AmqpError> {
        self.install_exchange().await?;
        self.install_queue().await?;
        self.binding_queues().await
    }
}

impl AmqpTopology<'_> {
    async fn install_exchange(&self) -> Result<(), AmqpError> {
        for exch in &self.exchanges {
            debug!("creating exchange: {}", exch.name);

            match self
                .channel
                .exchange_declare(
                    exch.name,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        durable: exch.durable,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = exch.name,
                        "error to declare the exchange"
                    );
                    Err(AmqpError::DeclareExchangeError(exch.name.to_owned()))
                }
                _ => Ok(()),
            }?;

            debug!("exchange: {} was created", exch.name);
        }

        Ok(())
    }

    async fn install_queue(&self) -> Result<(), AmqpError> {
        for def in &self.queues {
            debug!("creating queue: {}", def.name);

            match self
                .channel
                .queue_declare(
                    &def.name,
                    QueueDeclareOptions {
                        durable: def.durable,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), name = %def.name, "error to declare the queue");
                    Err(AmqpError::DeclareQueueError(def.name.clone()))
                }
                Ok(queue) => {
                    debug!(
                        messages = queue.message_count(),
                        consumers = queue.consumer_count(),
                        "queue: {} was created",
                        def.name
                    );
                    Ok(())
                }
            }?;
        }

        Ok(())
    }

    async fn binding_queues(&self) -> Result<(), AmqpError> {
        for binding in &self.queues_binding {
            debug!(
                "binding queue: {} to the exchange: {} with the key: {}",
                binding.queue_name, binding.exchange_name, binding.routing_key
            );

            match self
                .channel
                .queue_bind(
                    binding.queue_name,
                    binding.exchange_name,
                    binding.routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "error to bind queue to exchange");

                    Err(AmqpError::BindingExchangeToQueueError(
                        binding.exchange_name.to_owned(),
                        binding.queue_name.to_owned(),
                    ))
                }
                _ => Ok(()),
            }?;
        }

        debug!("queue was bounded");

        Ok(())
    }
}

/// The exchange/queue/binding triple both programs declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDefinitions<'tp> {
    pub exchange: ExchangeDefinition<'tp>,
    pub queue: QueueDefinition,
    pub binding: QueueBinding<'tp>,
}

impl<'tp> TopologyDefinitions<'tp> {
    /// Durable direct exchange, durable shared queue, one routing key.
    ///
    /// # Parameters
    /// * `cfg` - Exchange, queue and routing key names
    ///
    /// # Returns
    /// The definitions borrowing their names from `cfg`
    pub fn from_configs(cfg: &'tp TopologyConfigs) -> TopologyDefinitions<'tp> {
        TopologyDefinitions {
            exchange: ExchangeDefinition::new(&cfg.exchange).durable(),
            queue: QueueDefinition::new(&cfg.queue).durable(),
            binding: QueueBinding::new(&cfg.queue)
                .exchange(&cfg.exchange)
                .routing_key(&cfg.routing_key),
        }
    }

    /// Declares the topology on `channel`.
    ///
    /// # Parameters
    /// * `channel` - Open channel of the session
    ///
    /// # Returns
    /// Ok when the exchange, the queue and the binding were declared, or the
    /// first declaration error
    pub async fn install(&self, channel: Arc<Channel>) -> Result<(), AmqpError> {
        AmqpTopology::new(channel)
            .exchange(&self.exchange)
            .queue(&self.queue)
            .queue_binding(&self.binding)
            .install()
            .await
    }
}
