use std::{future::Future, time::Duration};

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Owns a background timer task. Dropping the guard cancels the task, so the
/// timer never outlives whatever holds it.
pub struct TimerGuard {
    token: CancellationToken,
}

impl TimerGuard {
    /// Run `on_tick` every `period`, starting one period from now, until it
    /// returns `false` or the guard is dropped.
    pub fn every<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if !on_tick().await {
                    break;
                }
            }
        });

        Self { token }
    }

    /// Run `task` once after `delay` unless the guard is dropped first.
    pub fn after<Fut>(delay: Duration, task: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = time::sleep(delay) => task.await,
            }
        });

        Self { token }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
