// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod consumer;

pub mod channel;
pub mod configs;
pub mod dispatcher;
pub mod errors;
pub mod exchange;
pub mod logging;
pub mod messaging;
pub mod pacer;
pub mod publisher;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod shutdown;
pub mod tls;
pub mod topology;
