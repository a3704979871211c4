//! Ordered fallback over alternative strategies.

use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

/// One named strategy. The future does nothing until it is polled.
pub struct Attempt<'a, T> {
    name: String,
    run: LocalBoxFuture<'a, anyhow::Result<T>>,
}

impl<'a, T> Attempt<'a, T> {
    pub fn new(
        name: impl Into<String>,
        run: impl Future<Output = anyhow::Result<T>> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::pin(run),
        }
    }
}

/// Runs attempts in order and returns the first success.
///
/// Later attempts are never started once one succeeds. When every attempt
/// fails, returns one `"<name>: <error>"` line per attempt, in order.
pub async fn first_success<T>(attempts: Vec<Attempt<'_, T>>) -> Result<T, Vec<String>> {
    let mut reasons = Vec::with_capacity(attempts.len());

    for Attempt { name, run } in attempts {
        debug!("trying {name}");
        match run.await {
            Ok(value) => {
                debug!("{name} succeeded");
                return Ok(value);
            }
            Err(e) => {
                warn!("{name} failed: {e:#}");
                reasons.push(format!("{name}: {e:#}"));
            }
        }
    }

    Err(reasons)
}
