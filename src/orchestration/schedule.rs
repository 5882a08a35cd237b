use super::Reconciler;
use crate::domain::TimeMs;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Run `reconciler.run_lookback` every `interval`, starting immediately.
///
/// A failed run is logged and the loop waits for the next tick.
pub fn spawn_schedule(reconciler: Arc<Reconciler>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            symbol = %reconciler.symbol(),
            interval_secs = interval.as_secs(),
            "Reconciliation schedule started"
        );

        loop {
            ticker.tick().await;
            if let Err(e) = reconciler.run_lookback(TimeMs::now()).await {
                error!(symbol = %reconciler.symbol(), error = %e, "Scheduled reconciliation failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockTradeSource, TradeSourceError};
    use crate::db::{init_db, Repository};
    use crate::domain::Symbol;

    async fn wait_for_calls(source: &MockTradeSource, n: usize) {
        for _ in 0..200 {
            if source.calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected at least {} fetches, saw {}", n, source.calls());
    }

    #[tokio::test]
    async fn test_schedule_keeps_running_after_failures() {
        let repo = Arc::new(Repository::new(init_db(":memory:").await.unwrap()));
        let source = MockTradeSource::new().failing_with(TradeSourceError::RateLimited);
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(source.clone()),
            repo.clone(),
            Symbol::new("ETHUSDT"),
            1_000,
        ));

        let handle = spawn_schedule(reconciler, Duration::from_millis(20));
        wait_for_calls(&source, 3).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert!(repo.query_runs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_records_runs() {
        let repo = Arc::new(Repository::new(init_db(":memory:").await.unwrap()));
        let source = MockTradeSource::new();
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(source.clone()),
            repo.clone(),
            Symbol::new("ETHUSDT"),
            1_000,
        ));

        let handle = spawn_schedule(reconciler, Duration::from_millis(20));
        // The second fetch only starts once the first run is stored.
        wait_for_calls(&source, 2).await;
        handle.abort();

        assert!(!repo.query_runs(10).await.unwrap().is_empty());
    }
}
