use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::client::FeedClient;
use super::scraper::scrape_next;
use crate::storage::Database;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("interval must be greater than zero")]
    Zero,
}

/// Parse a duration such as `30s`, `1m`, `1h30m` or `1.5s`.
///
/// Accepted units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. Every number needs
/// a unit, and the total must be positive.
pub fn parse_interval(raw: &str) -> Result<Duration, IntervalError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(IntervalError::Empty);
    }

    let mut rest = input;
    let mut total_nanos: f64 = 0.0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(IntervalError::Invalid(input.to_string()));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| IntervalError::Invalid(input.to_string()))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos: f64 = match unit {
            "" => return Err(IntervalError::MissingUnit(input.to_string())),
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            other => {
                return Err(IntervalError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        total_nanos += value * unit_nanos;
        rest = tail;
    }

    if total_nanos >= u64::MAX as f64 {
        return Err(IntervalError::Invalid(input.to_string()));
    }
    let nanos = total_nanos.round() as u64;
    if nanos == 0 {
        return Err(IntervalError::Zero);
    }
    Ok(Duration::from_nanos(nanos))
}

/// Periodic scraping loop behind the `agg` command.
///
/// Scrapes once immediately, then once per interval. Cycles run to
/// completion one after another; a slow cycle pushes the next tick back
/// instead of bunching ticks up.
pub struct Scheduler {
    db: Database,
    client: FeedClient,
    interval: Duration,
}

impl Scheduler {
    pub fn new(db: Database, client: FeedClient, interval: Duration) -> Self {
        Self {
            db,
            client,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` flips to `true`, returning the number of cycles
    /// completed.
    ///
    /// The signal is only observed between cycles. If the sending half is
    /// dropped without signalling, the loop runs forever.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancelled(&mut shutdown) => break,
                _ = timer.tick() => {}
            }

            let report = scrape_next(&self.db, &self.client).await;
            cycles += 1;
            tracing::debug!(cycle = cycles, ?report, "Scrape cycle finished");
        }

        tracing::info!(cycles, "Scheduler stopped");
        cycles
    }
}

async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// A shutdown flag that flips on Ctrl-C (and SIGTERM on Unix).
pub fn shutdown_on_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => Some(sigterm),
                Err(e) => {
                    tracing::warn!(error = %e, "Couldn't install SIGTERM handler");
                    None
                }
            };

        #[cfg(unix)]
        let sigterm_fut = async {
            match sigterm.as_mut() {
                Some(s) => {
                    s.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<()>();

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    // Dropping the sender leaves the loop running
                    tracing::warn!(error = %e, "Couldn't listen for Ctrl-C");
                    return;
                }
                tracing::info!("Received SIGINT, stopping after the current cycle");
            }
            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, stopping after the current cycle");
            }
        }

        let _ = tx.send(true);
    });

    rx
}
