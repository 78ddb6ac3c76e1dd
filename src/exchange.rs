// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! Exchanges receive published messages and forward them to bound queues.
//! The demo topology routes on an exact routing key match, so every exchange
//! declared here is a direct exchange.

/// Definition of a direct RabbitMQ exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition<'ex> {
    pub(crate) name: &'ex str,
    pub(crate) durable: bool,
}

impl<'ex> ExchangeDefinition<'ex> {
    /// Creates a non-durable direct exchange definition.
    ///
    /// # Parameters
    /// * `name` - Name of the exchange
    ///
    /// # Returns
    /// A new ExchangeDefinition instance
    pub fn new(name: &'ex str) -> ExchangeDefinition<'ex> {
        ExchangeDefinition {
            name,
            durable: false,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Makes the exchange survive broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }
}
