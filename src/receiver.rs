// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Receiver
//!
//! Consumes the shared queue, simulating a fixed processing latency before
//! printing each message as UTF-8 text. Runs until the supplied shutdown
//! future resolves.

use crate::{
    configs::Configs,
    dispatcher::RabbitMQDispatcher,
    errors::{AmqpError, MessagingError},
    messaging::{ConsumerHandler, ConsumerMessage, Dispatcher},
    session::{Session, SessionState},
    topology::TopologyDefinitions,
};
use async_trait::async_trait;
use std::{
    future::Future,
    io::{self, Stdout, Write},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tracing::{debug, info};

/// Decodes a payload as UTF-8 text.
pub fn decode_payload(data: &[u8]) -> Result<&str, MessagingError> {
    std::str::from_utf8(data).map_err(|err| MessagingError::DecodeError(err.to_string()))
}

/// Waits `processing_delay`, then prints ` [x] Received: <text>` on its own
/// line.
#[derive(Debug)]
pub struct PrintingHandler<W = Stdout> {
    processing_delay: Duration,
    processed: AtomicU64,
    out: Mutex<W>,
}

impl PrintingHandler<Stdout> {
    /// Handler printing to standard output.
    pub fn new(processing_delay: Duration) -> Self {
        PrintingHandler::with_writer(processing_delay, io::stdout())
    }
}

impl<W> PrintingHandler<W>
where
    W: Write + Send,
{
    /// Handler printing to `out`.
    ///
    /// # Parameters
    /// * `processing_delay` - Simulated work before each message is printed
    /// * `out` - Destination of the received lines
    ///
    /// # Returns
    /// A new PrintingHandler instance
    pub fn with_writer(processing_delay: Duration, out: W) -> Self {
        PrintingHandler {
            processing_delay,
            processed: AtomicU64::new(0),
            out: Mutex::new(out),
        }
    }

    /// Number of messages printed so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    fn print(&self, text: &str) -> Result<(), MessagingError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| MessagingError::ConsumerError("output lock poisoned".to_owned()))?;

        writeln!(out, " [x] Received: {}", text)
            .and_then(|_| out.flush())
            .map_err(|err| MessagingError::ConsumerError(err.to_string()))
    }
}

#[async_trait]
impl<W> ConsumerHandler for PrintingHandler<W>
where
    W: Write + Send,
{
    async fn exec(&self, msg: &ConsumerMessage) -> Result<(), MessagingError> {
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        let text = decode_payload(&msg.data)?;
        self.print(text)?;
        debug!(routing_key = %msg.routing_key, "message printed");

        self.processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Drives `consuming` until it fails or `shutdown` resolves.
///
/// # Returns
/// Ok(()) on shutdown, the consumer error otherwise
pub(crate) async fn until_shutdown<C, F>(consuming: C, shutdown: F) -> Result<(), AmqpError>
where
    C: Future<Output = Result<(), MessagingError>>,
    F: Future<Output = ()>,
{
    tokio::select! {
        res = consuming => res.map_err(AmqpError::from),
        _ = shutdown => {
            debug!("shutdown requested");
            Ok(())
        }
    }
}

/// Connects, declares the topology and consumes until `shutdown` resolves or
/// the consumer stream fails.
///
/// # Parameters
/// * `cfg` - Broker, topology and receiver settings
/// * `shutdown` - Resolves when the operator asks to stop
///
/// # Returns
/// The number of printed messages, or the first connection, declaration or
/// consumer error
pub async fn run_receiver<F>(cfg: &Configs, shutdown: F) -> Result<u64, AmqpError>
where
    F: Future<Output = ()>,
{
    let mut session = Session::new();
    let (conn, channel) = session.open(cfg).await?;

    let handler = Arc::new(PrintingHandler::new(cfg.receiver.processing_delay));
    let queue = TopologyDefinitions::from_configs(&cfg.topology).queue;
    let dispatcher = RabbitMQDispatcher::new(
        channel.clone(),
        queue,
        cfg.receiver.ack_mode,
        &cfg.app.name,
    )
    .register(handler.clone());

    session.transition(SessionState::Operating)?;
    info!("Receiver running. Press [enter] to exit.");

    let result = until_shutdown(dispatcher.consume_blocking(), shutdown).await;

    info!(processed = handler.processed(), "receiver stopping");
    match result {
        Ok(()) => {
            session.close(&conn, &channel).await?;
            Ok(handler.processed())
        }
        Err(err) => {
            session.abort(&conn, &channel).await?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::message_body;
    use tokio::time::Instant;

    fn message(data: &[u8]) -> ConsumerMessage {
        ConsumerMessage::new("DemoExchange", "demo-routing-key", data, false)
    }

    #[test]
    fn decodes_utf8() {
        assert_eq!(decode_payload(&message_body(7)), Ok("Message #7"));
        assert!(matches!(
            decode_payload(&[0xff, 0xfe]),
            Err(MessagingError::DecodeError(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_before_printing() {
        let handler = PrintingHandler::with_writer(Duration::from_secs(2), io::sink());
        let start = Instant::now();

        handler.exec(&message(b"Message #0")).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(handler.processed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_handling_accumulates_delay() {
        let handler = PrintingHandler::with_writer(Duration::from_secs(2), io::sink());
        let start = Instant::now();

        for index in 0..5 {
            handler.exec(&message(&message_body(index))).await.unwrap();
        }

        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(handler.processed(), 5);
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_handler_error() {
        let handler = PrintingHandler::with_writer(Duration::ZERO, io::sink());

        let result = handler.exec(&message(&[0xc3, 0x28])).await;

        assert!(matches!(result, Err(MessagingError::DecodeError(_))));
        assert_eq!(handler.processed(), 0);
    }

    #[tokio::test]
    async fn prints_one_plain_line_per_message() {
        let handler = PrintingHandler::with_writer(Duration::ZERO, Vec::new());

        handler.exec(&message(b"Message #0")).await.unwrap();
        handler.exec(&message("Message #42 ✓".as_bytes())).await.unwrap();

        assert_eq!(
            String::from_utf8(handler.out.lock().unwrap().clone()).unwrap(),
            " [x] Received: Message #0\n [x] Received: Message #42 ✓\n"
        );
    }

    #[tokio::test]
    async fn undecodable_payload_prints_nothing() {
        let handler = PrintingHandler::with_writer(Duration::ZERO, Vec::new());

        assert!(handler.exec(&message(&[0xff])).await.is_err());

        assert!(handler.out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_consumer() {
        let result = until_shutdown(std::future::pending(), async {}).await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_a_message_in_progress() {
        let handler = PrintingHandler::with_writer(Duration::from_secs(2), Vec::new());
        let start = Instant::now();

        let consuming = async {
            let _ = handler.exec(&message(b"Message #0")).await;
            std::future::pending::<Result<(), MessagingError>>().await
        };
        let result = until_shutdown(
            consuming,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(handler.processed(), 0);
    }

    #[tokio::test]
    async fn consumer_failure_ends_the_receiver() {
        let consuming = async {
            Err(MessagingError::ConsumerError(
                "consumer stream closed".to_owned(),
            ))
        };

        let result = until_shutdown(consuming, std::future::pending()).await;

        assert_eq!(
            result,
            Err(AmqpError::Messaging(MessagingError::ConsumerError(
                "consumer stream closed".to_owned()
            )))
        );
    }
}
