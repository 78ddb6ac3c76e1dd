// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Rate limiting for the sender loop.

use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Spaces successive operations at least `period` apart.
///
/// The first tick completes immediately. A zero period disables pacing.
#[derive(Debug)]
pub struct Pacer {
    interval: Option<Interval>,
}

impl Pacer {
    /// Creates a new Pacer.
    ///
    /// # Parameters
    /// * `period` - Minimum spacing between two ticks, zero for none
    ///
    /// # Returns
    /// A Pacer whose first tick is immediate
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Pacer { interval: None };
        }

        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Pacer {
            interval: Some(interval),
        }
    }

    /// Waits until the next operation may start.
    pub async fn tick(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }
}
