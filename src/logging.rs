// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Installs the global `tracing` subscriber used by both binaries.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs to stdout, filtered by `RUST_LOG` when set and by `level` otherwise.
///
/// # Parameters
/// * `level` - Fallback filter directive, e.g. `info` or `rabbit_tls_demo=debug`
///
/// # Returns
/// An error when the directive is invalid or a subscriber is already set
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    Ok(())
}
