// rams-document-service/src/pipeline/progress.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressConfig {
    pub tick: Duration,
    /// Highest value reached before completion is confirmed (< 100)
    pub ceiling: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            ceiling: 90,
        }
    }
}

impl ProgressConfig {
    /// Next displayed value: closes a fifth of the remaining gap to the
    /// ceiling each tick, at least one point, never past the ceiling and
    /// never backwards.
    pub fn advance(&self, current: u8) -> u8 {
        if current >= self.ceiling {
            return current;
        }
        let step = ((self.ceiling - current) / 5).max(1);
        current.saturating_add(step).min(self.ceiling)
    }
}

/// Periodic progress animation. Dropping the ticker stops it.
pub(crate) struct ProgressTicker {
    _guard: DropGuard,
}

impl ProgressTicker {
    pub(crate) fn spawn(config: ProgressConfig, progress: Arc<watch::Sender<u8>>) -> Self {
        let cancel = CancellationToken::new();
        let stopped = cancel.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick);
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.cancelled() => break,
                    _ = interval.tick() => {
                        progress.send_modify(|value| *value = config.advance(*value));
                    }
                }
            }
        });

        Self {
            _guard: cancel.drop_guard(),
        }
    }
}
