// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Dispatcher
//!
//! Subscribes one consumer to the shared queue and feeds every delivery to
//! the registered handler. Deliveries are awaited one at a time, so handling
//! of successive messages never overlaps; anything that arrives meanwhile
//! waits in lapin's delivery buffer or in the broker.

use crate::{
    configs::AckMode,
    consumer::{consume, InboundDelivery},
    errors::MessagingError,
    messaging::{ConsumerHandler, Dispatcher},
    queue::QueueDefinition,
};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::{options::BasicConsumeOptions, types::FieldTable, Channel};
use std::{fmt::Display, sync::Arc};
use tracing::{debug, error};
use uuid::Uuid;

/// Unique consumer tag derived from the application name.
///
/// # Parameters
/// * `app_name` - Application name, lowercased with whitespace turned into `-`
///
/// # Returns
/// `<app-name>-<uuid v4>`
pub fn consumer_tag(app_name: &str) -> String {
    let app = app_name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("{}-{}", app, Uuid::new_v4())
}

/// RabbitMQ implementation of the Dispatcher trait.
pub struct RabbitMQDispatcher {
    channel: Arc<Channel>,
    queue_def: QueueDefinition,
    ack_mode: AckMode,
    tag: String,
    pub(crate) handler: Option<Arc<dyn ConsumerHandler>>,
}

impl RabbitMQDispatcher {
    /// Creates a dispatcher without a handler.
    ///
    /// # Parameters
    /// * `channel` - Channel the consumer is opened on
    /// * `queue_def` - Queue to consume
    /// * `ack_mode` - Settlement policy
    /// * `app_name` - Prefix of the consumer tag
    ///
    /// # Returns
    /// A new RabbitMQDispatcher instance
    pub fn new(
        channel: Arc<Channel>,
        queue_def: QueueDefinition,
        ack_mode: AckMode,
        app_name: &str,
    ) -> Self {
        RabbitMQDispatcher {
            channel,
            queue_def,
            ack_mode,
            tag: consumer_tag(app_name),
            handler: None,
        }
    }
}

#[async_trait]
impl Dispatcher for RabbitMQDispatcher {
    fn register(mut self, handler: Arc<dyn ConsumerHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    async fn consume_blocking(&self) -> Result<(), MessagingError> {
        let Some(handler) = self.handler.clone() else {
            error!("no handler registered");
            return Err(MessagingError::CreatingConsumerError);
        };

        let consumer = match self
            .channel
            .basic_consume(
                &self.queue_def.name,
                &self.tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: self.ack_mode == AckMode::Auto,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(MessagingError::CreatingConsumerError)
            }
            Ok(c) => Ok(c),
        }?;
        debug!(
            queue = %self.queue_def.name,
            tag = %self.tag,
            ack_mode = ?self.ack_mode,
            "consumer created"
        );

        dispatch(consumer, handler.as_ref(), self.ack_mode).await
    }
}

/// Feeds `deliveries` to `handler` one at a time.
///
/// The next delivery is only polled once the previous one was handled and
/// settled. Handler and settlement failures are logged and consumption goes
/// on; a stream error or the end of the stream stops it.
///
/// # Parameters
/// * `deliveries` - Stream of deliveries, normally a lapin consumer
/// * `handler` - Handler registered on the dispatcher
/// * `ack_mode` - Settlement policy applied to every delivery
///
/// # Returns
/// Always an error: the stream failure or `consumer stream closed`
pub(crate) async fn dispatch<S, D, E>(
    mut deliveries: S,
    handler: &dyn ConsumerHandler,
    ack_mode: AckMode,
) -> Result<(), MessagingError>
where
    S: Stream<Item = Result<D, E>> + Unpin,
    D: InboundDelivery,
    E: Display,
{
    while let Some(result) = deliveries.next().await {
        match result {
            Ok(delivery) => {
                if let Err(err) = consume(&delivery, handler, ack_mode).await {
                    error!(error = err.to_string(), "error consume msg");
                }
            }
            Err(err) => {
                error!(error = err.to_string(), "errors consume msg");
                return Err(MessagingError::ConsumerError(err.to_string()));
            }
        }
    }

    Err(MessagingError::ConsumerError(
        "consumer stream closed".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consumer::fakes::{FakeDelivery, Settled},
        messaging::ConsumerMessage,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use std::time::Duration;

    /// Records the payload order and the peak number of overlapping calls.
    #[derive(Default)]
    struct SlowRecorder {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl ConsumerHandler for SlowRecorder {
        async fn exec(&self, msg: &ConsumerMessage) -> Result<(), MessagingError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_secs(2)).await;
            self.seen.lock().unwrap().push(msg.data.clone());

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if msg.data.is_empty() {
                return Err(MessagingError::DecodeError("empty".to_owned()));
            }
            Ok(())
        }
    }

    fn deliveries(
        payloads: &[&[u8]],
        settlements: &Arc<Mutex<Vec<Settled>>>,
    ) -> Vec<Result<FakeDelivery, String>> {
        payloads
            .iter()
            .enumerate()
            .map(|(tag, data)| Ok(FakeDelivery::new(tag as u64, data, settlements.clone())))
            .collect()
    }

    #[test]
    fn consumer_tag_is_prefixed_and_unique() {
        let first = consumer_tag("Rabbit Receiver App");
        let second = consumer_tag("Rabbit Receiver App");

        assert!(first.starts_with("rabbit-receiver-app-"));
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn deliveries_are_handled_one_at_a_time_in_order() {
        let settlements = Arc::new(Mutex::new(vec![]));
        let handler = SlowRecorder::default();
        let payloads: [&[u8]; 3] = [b"Message #0", b"Message #1", b"Message #2"];
        let start = tokio::time::Instant::now();

        let result = dispatch(
            futures_util::stream::iter(deliveries(&payloads, &settlements)),
            &handler,
            AckMode::Manual,
        )
        .await;

        assert_eq!(
            result,
            Err(MessagingError::ConsumerError(
                "consumer stream closed".to_owned()
            ))
        );
        assert_eq!(handler.peak.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        assert_eq!(
            *handler.seen.lock().unwrap(),
            payloads.iter().map(|p| p.to_vec()).collect::<Vec<_>>()
        );
        assert_eq!(
            *settlements.lock().unwrap(),
            vec![Settled::Ack(0), Settled::Ack(1), Settled::Ack(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn handler_failure_does_not_stop_consumption() {
        let settlements = Arc::new(Mutex::new(vec![]));
        let handler = SlowRecorder::default();
        let payloads: [&[u8]; 3] = [b"Message #0", b"", b"Message #2"];

        let _ = dispatch(
            futures_util::stream::iter(deliveries(&payloads, &settlements)),
            &handler,
            AckMode::Manual,
        )
        .await;

        assert_eq!(
            *settlements.lock().unwrap(),
            vec![Settled::Ack(0), Settled::Nack(1), Settled::Ack(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stream_error_stops_consumption() {
        let settlements = Arc::new(Mutex::new(vec![]));
        let handler = SlowRecorder::default();
        let items = vec![
            Ok(FakeDelivery::new(0, b"Message #0", settlements.clone())),
            Err("connection reset".to_owned()),
            Ok(FakeDelivery::new(2, b"Message #2", settlements.clone())),
        ];

        let result = dispatch(futures_util::stream::iter(items), &handler, AckMode::Auto).await;

        assert_eq!(
            result,
            Err(MessagingError::ConsumerError("connection reset".to_owned()))
        );
        assert_eq!(handler.seen.lock().unwrap().len(), 1);
    }
}
