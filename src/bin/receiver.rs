// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use rabbit_tls_demo::{
    configs::Configs,
    logging::init_logging,
    receiver::run_receiver,
    shutdown::{ctrl_c, shutdown_signal, spawn_line_reader},
};
use std::io::{self, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Configs::from_env("Rabbit Receiver App")?;
    init_logging(&cfg.app.log_level)?;

    let line = spawn_line_reader(BufReader::new(io::stdin()));
    let processed = run_receiver(&cfg, shutdown_signal(line, ctrl_c())).await?;
    info!(processed, "receiver finished");

    Ok(())
}
