//! Periodic reload timer.
//!
//! The timer is a tokio task that waits one full period, runs a tick, and
//! repeats. Cancelling its token stops future ticks; a tick that is already
//! running always finishes.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::SchemafigError;

/// Interval used by `start_reload_interval(None)` when the builder set none.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(60);

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawn the timer task on the current tokio runtime.
///
/// `tick` returns `false` to end the task (e.g. once its engine is gone).
pub fn spawn<F, Fut>(
    period: Duration,
    token: CancellationToken,
    mut tick: F,
) -> Result<(), SchemafigError>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| SchemafigError::NoRuntime)?;
    let period = period.max(MIN_PERIOD);

    handle.spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            if token.is_cancelled() || !tick().await {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(count: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<bool> + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(true)
        }
    }

    #[test]
    fn outside_runtime_is_an_error() {
        let count = Arc::new(AtomicUsize::new(0));
        let result = spawn(
            Duration::from_millis(10),
            CancellationToken::new(),
            counting_tick(&count),
        );
        assert!(matches!(result, Err(SchemafigError::NoRuntime)));
    }

    #[tokio::test]
    async fn first_tick_waits_a_full_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        spawn(Duration::from_millis(200), token.clone(), counting_tick(&count)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        token.cancel();
    }

    #[tokio::test]
    async fn ticks_repeat_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        spawn(Duration::from_millis(20), token.clone(), counting_tick(&count)).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(count.load(Ordering::SeqCst) >= 2);

        token.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_cancel = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn cancel_during_slow_tick_runs_no_further_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let token = CancellationToken::new();
        spawn(Duration::from_millis(10), token.clone(), move || {
            let inner = Arc::clone(&inner);
            async move {
                inner.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(80)).await;
                true
            }
        })
        .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tick_returning_false_ends_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        spawn(Duration::from_millis(10), CancellationToken::new(), move || {
            inner.fetch_add(1, Ordering::SeqCst);
            std::future::ready(false)
        })
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
