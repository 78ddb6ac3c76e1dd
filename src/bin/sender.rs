// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use rabbit_tls_demo::{configs::Configs, logging::init_logging, sender::run_sender};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Configs::from_env("Rabbit Sender App")?;
    init_logging(&cfg.app.log_level)?;

    let sent = run_sender(&cfg).await?;
    info!(sent, "sender finished");

    Ok(())
}
