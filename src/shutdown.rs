// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Operator Shutdown
//!
//! The receiver stops when the operator enters a line (or closes the input)
//! or interrupts the process. Input is read on a plain OS thread: a blocking
//! read owned by the tokio runtime could not be cancelled and would keep the
//! runtime from shutting down after an interrupt.

use std::{future::Future, io::BufRead, thread};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Reads one line from `reader` on a dedicated thread.
///
/// # Parameters
/// * `reader` - Line source, normally buffered standard input
///
/// # Returns
/// A receiver resolved once a line was read, the input reached end of file
/// or failed.
pub fn spawn_line_reader<R>(mut reader: R) -> oneshot::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    thread::spawn(move || {
        let mut line = String::new();
        if let Err(err) = reader.read_line(&mut line) {
            debug!(error = err.to_string(), "failure to read operator input");
        }
        let _ = tx.send(());
    });

    rx
}

/// Resolves on whichever comes first: the operator line or `interrupt`.
pub async fn shutdown_signal<F>(line: oneshot::Receiver<()>, interrupt: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = interrupt => info!("interrupt received"),
        _ = line => info!("exit requested"),
    }
}

/// Interrupt future backed by Ctrl-C.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        debug!(error = err.to_string(), "failure to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
