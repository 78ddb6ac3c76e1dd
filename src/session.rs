// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Session Lifecycle
//!
//! Both programs walk the same path:
//! `Disconnected → Connecting → TopologyDeclared → Operating → Closed`.
//! Any state may jump to `Closed`; nothing ever goes backwards, so a failed
//! connection attempt cannot be retried on the same session.

use crate::{
    channel::{close, new_amqp_channel},
    configs::Configs,
    errors::AmqpError,
    topology::TopologyDefinitions,
};
use lapin::{Channel, Connection};
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// TLS handshake and EXTERNAL authentication in progress
    Connecting,
    TopologyDeclared,
    /// Publishing or consuming
    Operating,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::TopologyDeclared => "topology-declared",
            SessionState::Operating => "operating",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

impl SessionState {
    fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Disconnected => Some(SessionState::Connecting),
            SessionState::Connecting => Some(SessionState::TopologyDeclared),
            SessionState::TopologyDeclared => Some(SessionState::Operating),
            SessionState::Operating => Some(SessionState::Closed),
            SessionState::Closed => None,
        }
    }
}

/// Tracks the lifecycle of one process' connection.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `to`, which must be the next state or `Closed`.
    ///
    /// # Parameters
    /// * `to` - Requested state
    ///
    /// # Returns
    /// Ok(()) when the transition is allowed, `InvalidTransition` otherwise
    pub fn transition(&mut self, to: SessionState) -> Result<(), AmqpError> {
        let allowed = self.state != SessionState::Closed
            && (to == SessionState::Closed || self.state.next() == Some(to));

        if !allowed {
            return Err(AmqpError::InvalidTransition(
                self.state.to_string(),
                to.to_string(),
            ));
        }

        debug!(from = %self.state, to = %to, "session transition");
        self.state = to;
        Ok(())
    }

    /// Connects with the client certificate and declares the shared
    /// topology, leaving the session in `TopologyDeclared`.
    ///
    /// On failure the session is `Closed`. No topology has been declared if
    /// the connection itself was refused, and a connection whose topology
    /// declaration failed is closed before returning.
    ///
    /// # Parameters
    /// * `cfg` - Broker address, TLS material and topology names
    ///
    /// # Returns
    /// The open connection and its channel
    pub async fn open(
        &mut self,
        cfg: &Configs,
    ) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
        self.transition(SessionState::Connecting)?;

        let (conn, channel) = match new_amqp_channel(cfg).await {
            Ok(opened) => opened,
            Err(err) => {
                self.transition(SessionState::Closed)?;
                return Err(err);
            }
        };
        info!(
            host = %cfg.rabbitmq.host,
            port = cfg.rabbitmq.port,
            "connected with client certificate"
        );

        let defs = TopologyDefinitions::from_configs(&cfg.topology);
        let declared = declare_or_close(
            defs.install(channel.clone()),
            close(conn.as_ref(), channel.as_ref()),
        )
        .await;
        if let Err(err) = declared {
            self.transition(SessionState::Closed)?;
            return Err(err);
        }
        self.transition(SessionState::TopologyDeclared)?;

        Ok((conn, channel))
    }

    /// Closes the channel, then the connection.
    pub async fn close(&mut self, conn: &Connection, channel: &Channel) -> Result<(), AmqpError> {
        let result = close(conn, channel).await;
        self.transition(SessionState::Closed)?;
        result
    }

    /// Closes after a failure, keeping the failure as the reported error.
    pub async fn abort(&mut self, conn: &Connection, channel: &Channel) -> Result<(), AmqpError> {
        if let Err(err) = close(conn, channel).await {
            warn!(error = err.to_string(), "failure to close after an error");
        }
        self.transition(SessionState::Closed)
    }
}

/// Awaits `install`; on failure awaits `close` and returns the install error.
async fn declare_or_close<I, C>(install: I, close: C) -> Result<(), AmqpError>
where
    I: Future<Output = Result<(), AmqpError>>,
    C: Future<Output = Result<(), AmqpError>>,
{
    let Err(err) = install.await else {
        return Ok(());
    };

    error!(error = err.to_string(), "failure to declare topology");
    if let Err(close_err) = close.await {
        warn!(error = close_err.to_string(), "failure to close after declaration error");
    }
    Err(err)
}
