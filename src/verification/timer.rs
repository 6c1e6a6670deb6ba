// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-shot countdown for an open verification window.
//!
//! The timer runs as a spawned task that sleeps until the deadline or until
//! it is cancelled, whichever comes first. Dropping the timer cancels it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct ExpiryTimer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ExpiryTimer {
    /// Run `on_expire` after `delay` unless cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(delay: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    debug!(delay_secs = delay.as_secs(), "Verification window timer fired");
                    on_expire();
                }
                _ = token.cancelled() => {
                    debug!("Verification window timer cancelled");
                }
            }
        });
        Self { cancel, task }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Still counting down.
    pub fn is_armed(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = {
            let fired = fired.clone();
            ExpiryTimer::arm(Duration::from_secs(60), move || {
                fired.store(true, Ordering::SeqCst)
            })
        };

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = {
            let fired = fired.clone();
            ExpiryTimer::arm(Duration::from_secs(60), move || {
                fired.store(true, Ordering::SeqCst)
            })
        };
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        {
            let fired = fired.clone();
            let _timer = ExpiryTimer::arm(Duration::from_secs(1), move || {
                fired.store(true, Ordering::SeqCst)
            });
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
