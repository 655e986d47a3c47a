//! The progress observer thread.
//!
//! The driver sends a [`ProgressEvent`] each time it passes a phase
//! barrier. The observer logs each event as it arrives and repeats the
//! latest percentage at a fixed interval while nothing new happens. It
//! exits when the driver drops the sending half of the channel.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

/// One completed phase barrier as seen by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Barrier name.
    pub label: &'static str,
    /// Cumulative completion, 0 to 100.
    pub percent: u8,
}

/// Logs pipeline progress from a channel of [`ProgressEvent`]s.
#[derive(Debug)]
pub struct ProgressObserver {
    events: Receiver<ProgressEvent>,
    interval: Duration,
    percent: u8,
}

impl ProgressObserver {
    /// Observer reading `events`, reporting every `interval` while idle.
    pub fn new(events: Receiver<ProgressEvent>, interval: Duration) -> Self {
        Self {
            events,
            interval,
            percent: 0,
        }
    }

    /// Consume events until the channel disconnects. Returns the last
    /// percentage seen.
    pub fn run(mut self) -> u8 {
        loop {
            match self.events.recv_timeout(self.interval) {
                Ok(event) => {
                    debug_assert!(event.percent >= self.percent, "progress went backwards");
                    self.percent = event.percent;
                    log::debug!("{} barrier passed ({}%)", event.label, event.percent);
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::info!("progress: {}%", self.percent);
                }
                Err(RecvTimeoutError::Disconnected) => return self.percent,
            }
        }
    }
}
