// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Consumer
//!
//! Hands a single delivery to the registered handler and settles it
//! according to the configured [`AckMode`].

use crate::{
    configs::AckMode,
    errors::{AmqpError, MessagingError},
    messaging::{ConsumerHandler, ConsumerMessage},
};
use async_trait::async_trait;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
};
use tracing::{debug, error, warn};

/// What has to be sent back to the broker once the handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// Auto ack: the broker already considers the message delivered.
    Nothing,
    Ack,
    /// Rejected without requeue.
    Nack,
}

pub(crate) fn settlement(ack_mode: AckMode, result: &Result<(), MessagingError>) -> Settlement {
    match (ack_mode, result) {
        (AckMode::Auto, _) => Settlement::Nothing,
        (AckMode::Manual, Ok(())) => Settlement::Ack,
        (AckMode::Manual, Err(_)) => Settlement::Nack,
    }
}

/// A received message that can be settled with the broker.
#[async_trait]
pub(crate) trait InboundDelivery: Send + Sync {
    fn message(&self) -> ConsumerMessage;

    fn delivery_tag(&self) -> u64;

    async fn ack_delivery(&self) -> Result<(), AmqpError>;

    /// Rejects the message without requeue.
    async fn nack_delivery(&self) -> Result<(), AmqpError>;
}

#[async_trait]
impl InboundDelivery for Delivery {
    fn message(&self) -> ConsumerMessage {
        ConsumerMessage::new(
            self.exchange.as_str(),
            self.routing_key.as_str(),
            &self.data,
            self.redelivered,
        )
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    async fn ack_delivery(&self) -> Result<(), AmqpError> {
        self.ack(BasicAckOptions { multiple: false })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling ack msg");
                AmqpError::AckMessageError
            })
    }

    async fn nack_delivery(&self) -> Result<(), AmqpError> {
        self.nack(BasicNackOptions {
            multiple: false,
            requeue: false,
        })
        .await
        .map_err(|err| {
            error!(error = err.to_string(), "error whiling nack msg");
            AmqpError::NackMessageError
        })
    }
}

/// Processes one delivery.
///
/// A handler failure in auto ack mode loses the message: it was settled
/// broker-side before the handler ran.
///
/// # Parameters
/// * `delivery` - The delivery to hand over and settle
/// * `handler` - Handler registered on the dispatcher
/// * `ack_mode` - Decides whether the delivery is acked, nacked or left alone
///
/// # Returns
/// Ok(()) when the handler succeeded and the settlement went through,
/// otherwise the settlement error or the handler error as
/// `AmqpError::ConsumerError`
pub(crate) async fn consume<D>(
    delivery: &D,
    handler: &dyn ConsumerHandler,
    ack_mode: AckMode,
) -> Result<(), AmqpError>
where
    D: InboundDelivery,
{
    let msg = delivery.message();
    debug!(
        exchange = %msg.from,
        routing_key = %msg.routing_key,
        delivery_tag = delivery.delivery_tag(),
        "received delivery"
    );

    let result = handler.exec(&msg).await;
    if let Err(err) = &result {
        error!(error = err.to_string(), "failure to handle message");
    }

    match settlement(ack_mode, &result) {
        Settlement::Nothing => {
            if result.is_err() {
                warn!(
                    delivery_tag = delivery.delivery_tag(),
                    "message was auto acknowledged and is lost"
                );
            }
        }
        Settlement::Ack => {
            delivery.ack_delivery().await?;
            debug!("message successfully processed");
        }
        Settlement::Nack => delivery.nack_delivery().await?,
    }

    result.map_err(|err| AmqpError::ConsumerError(err.to_string()))
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Settlements sent back for a delivery.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Settled {
        Ack(u64),
        Nack(u64),
    }

    /// In-memory delivery recording how it was settled.
    pub(crate) struct FakeDelivery {
        pub(crate) tag: u64,
        pub(crate) data: Vec<u8>,
        pub(crate) settlements: Arc<Mutex<Vec<Settled>>>,
        pub(crate) fail_settlement: bool,
    }

    impl FakeDelivery {
        pub(crate) fn new(tag: u64, data: &[u8], settlements: Arc<Mutex<Vec<Settled>>>) -> Self {
            FakeDelivery {
                tag,
                data: data.to_vec(),
                settlements,
                fail_settlement: false,
            }
        }

        fn record(&self, settled: Settled) {
            self.settlements.lock().unwrap().push(settled);
        }
    }

    #[async_trait]
    impl InboundDelivery for FakeDelivery {
        fn message(&self) -> ConsumerMessage {
            ConsumerMessage::new("DemoExchange", "demo-routing-key", &self.data, false)
        }

        fn delivery_tag(&self) -> u64 {
            self.tag
        }

        async fn ack_delivery(&self) -> Result<(), AmqpError> {
            if self.fail_settlement {
                return Err(AmqpError::AckMessageError);
            }
            self.record(Settled::Ack(self.tag));
            Ok(())
        }

        async fn nack_delivery(&self) -> Result<(), AmqpError> {
            if self.fail_settlement {
                return Err(AmqpError::NackMessageError);
            }
            self.record(Settled::Nack(self.tag));
            Ok(())
        }
    }
}
