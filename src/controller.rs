//! Poll-compare-act control loop.
//!
//! Each tick fetches the desired status, writes the output only when the
//! status differs from the last one applied, then sleeps for the poll
//! interval. The loop ends when the shutdown future resolves, and the output
//! driver is cleaned up however the loop is left.

use crate::output::{DriverGuard, OutputDriver};
use crate::source::StatusFetcher;
use crate::status::Status;
use log::{debug, error, info};
use std::future::Future;
use std::time::Duration;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Status matched the last applied value; the output was not touched.
    Unchanged(Status),
    /// The output was written and the status recorded.
    Applied(Status),
    /// The output write failed; the change is retried next tick.
    Failed(Status),
}

pub struct Controller<F, D>
where
    F: StatusFetcher,
    D: OutputDriver,
{
    source: F,
    output: DriverGuard<D>,
    interval: Duration,
    /// `None` until the first successful write.
    last_applied: Option<Status>,
}

impl<F, D> Controller<F, D>
where
    F: StatusFetcher,
    D: OutputDriver,
{
    pub fn new(source: F, driver: D, interval: Duration) -> Self {
        Self {
            source,
            output: DriverGuard::new(driver),
            interval,
            last_applied: None,
        }
    }

    pub fn last_applied(&self) -> Option<Status> {
        self.last_applied
    }

    /// Fetch once and apply the result. Does not sleep.
    pub async fn tick(&mut self) -> TickOutcome {
        let status = self.source.fetch_status().await;
        debug!("Fetched status {}", status);
        self.apply(status)
    }

    fn apply(&mut self, status: Status) -> TickOutcome {
        if self.last_applied == Some(status) {
            debug!("Status unchanged ({})", status);
            return TickOutcome::Unchanged(status);
        }

        let on = status.is_on();
        match self.output.set_level(on) {
            Ok(()) => {
                info!(
                    "Output pin {} turned {}",
                    self.output.pin(),
                    if on { "ON" } else { "OFF" }
                );
                self.last_applied = Some(status);
                TickOutcome::Applied(status)
            }
            Err(e) => {
                error!("Failed to drive output pin {}: {}", self.output.pin(), e);
                TickOutcome::Failed(status)
            }
        }
    }

    /// Run ticks until `shutdown` resolves.
    ///
    /// `shutdown` is raced against both the fetch and the sleep, so an
    /// interrupt never waits for a slow request to finish. Consuming `self`
    /// drops the driver guard on return or unwind, releasing the pin.
    pub async fn run<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Polling every {:?}, driving pin {}",
            self.interval,
            self.output.pin()
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = self.tick() => {}
            }

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Program stopped, releasing output pin {}", self.output.pin());
    }
}
