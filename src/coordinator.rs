use std::{fmt, sync::Arc, time::Instant};

use log::{debug, error, info, warn};
use tokio::task::JoinSet;

use crate::{config::RunConfig, results::Results, worker::Worker};

/// Everything the workers of a run share.
#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    pub results: Results,
}

impl RunContext {
    /// Creates a new `RunContext` with one unset result slot per client.
    pub fn new(config: RunConfig) -> Self {
        Self {
            results: Results::new(config.client_slots()),
            config,
        }
    }
}

/// The outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Wall clock time from the first spawn until the last worker finished.
    pub total_elapsed_ms: f64,
    /// Sum of the server timings divided by the amount of clients.
    pub average_server_ms: f64,
    pub clients: usize,
    /// How many workers recorded a timing.
    pub responses: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total elapsed time: {:.6} ms", self.total_elapsed_ms)?;
        writeln!(
            f,
            "Average server inference time: {:.6} ms",
            self.average_server_ms
        )?;
        write!(f, "Responses received: {}/{}", self.responses, self.clients)
    }
}

/// Spawns one worker per configured client and waits for all of them.
///
/// A failing worker never aborts the run, it only leaves its slot unset,
/// which still counts in the average.
///
/// # Arguments
/// * `config` - The validated run configuration.
///
/// # Returns
/// The run's `Summary`.
pub async fn run(config: RunConfig) -> Summary {
    let ctx = Arc::new(RunContext::new(config));
    let clients = ctx.config.clients();

    info!("spawning {clients} TCP clients...");
    let start = Instant::now();

    let mut join_set = JoinSet::new();
    for worker_id in 1..=clients {
        let worker = Worker::new(worker_id, Arc::clone(&ctx));
        join_set.spawn(async move {
            let worker_id = worker.id();
            (worker_id, worker.run().await)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((worker_id, Ok(timer_ms))) => {
                debug!("[worker={worker_id}] finished, server reported {timer_ms} ms")
            }
            Ok((worker_id, Err(e))) if e.is_connection() => {
                warn!("[worker={worker_id}] connection error: {e}")
            }
            Ok((worker_id, Err(e))) => warn!("[worker={worker_id}] protocol error: {e}"),
            Err(e) => error!("worker task failed: {e}"),
        }
    }

    let elapsed = start.elapsed();

    Summary {
        total_elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        average_server_ms: ctx.results.average(),
        clients,
        responses: ctx.results.recorded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_has_a_slot_per_client() {
        let config = RunConfig::new("127.0.0.1", 8080, 12).unwrap();
        let ctx = RunContext::new(config);

        assert_eq!(ctx.results.size(), 12);
        assert_eq!(ctx.results.recorded(), 0);
    }

    #[test]
    fn summary_prints_every_figure() {
        let summary = Summary {
            total_elapsed_ms: 250.0,
            average_server_ms: 10.0,
            clients: 3,
            responses: 2,
        };

        let printed = summary.to_string();
        assert!(printed.contains("Total elapsed time: 250.000000 ms"));
        assert!(printed.contains("Average server inference time: 10.000000 ms"));
        assert!(printed.contains("Responses received: 2/3"));
    }
}
