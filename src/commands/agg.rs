use futures::FutureExt;
use std::io::Write;

use super::registry::HandlerFuture;
use super::{Command, CommandError, State};
use crate::feed::{parse_interval, shutdown_on_signal, Scheduler};

/// `agg <time_between_reqs>`: scrape feeds on a fixed interval until
/// stopped.
pub(super) fn aggregate<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        let raw = cmd.expect_one_arg("<time_between_reqs>")?;
        let interval = parse_interval(raw).map_err(CommandError::InvalidInterval)?;

        writeln!(state.out, "Collecting feeds every {}...", raw.trim())?;
        state.out.flush()?;

        let shutdown = match state.shutdown.clone() {
            Some(shutdown) => shutdown,
            None => shutdown_on_signal(),
        };
        let scheduler = Scheduler::new(state.db.clone(), state.client.clone(), interval);
        tracing::info!(interval = ?scheduler.interval(), "Starting feed aggregation");

        let cycles = scheduler.run(shutdown).await;
        writeln!(state.out, "Stopped after {} collection cycles.", cycles)?;
        Ok(())
    }
    .boxed()
}
