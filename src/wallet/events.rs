// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet event fan-out.
//!
//! Components that react to wallet changes (the encryption session clears
//! its credential on account change, the UI reloads on chain change) hold a
//! [`Subscription`]. Dropping the subscription unsubscribes, so a component
//! that goes away cannot leak its listener.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::models::WalletIdentity;

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The selected account changed. `None` when the wallet exposes no account.
    AccountChanged(Option<WalletIdentity>),
    ChainChanged(u64),
    Disconnected,
    /// The subscriber fell behind and this many events were dropped. Any
    /// state derived from the missed events must be treated as stale.
    Lagged(u64),
}

#[derive(Clone)]
pub struct WalletEventHub {
    sender: broadcast::Sender<WalletEvent>,
}

impl Default for WalletEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletEventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Hub buffering up to `capacity` undelivered events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Deliver `event` to every live subscription. Returns how many received it.
    pub fn publish(&self, event: WalletEvent) -> usize {
        tracing::debug!(?event, "Publishing wallet event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Scoped listener. Unsubscribes on drop.
pub struct Subscription {
    receiver: broadcast::Receiver<WalletEvent>,
}

impl Subscription {
    /// Next event, or `None` once every hub handle is gone.
    ///
    /// A lagging subscriber gets [`WalletEvent::Lagged`] in place of the
    /// events it missed, then resumes with the oldest event still buffered.
    pub async fn next(&mut self) -> Option<WalletEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => Some(lagged(skipped)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Next already-queued event, without waiting.
    pub fn try_next(&mut self) -> Option<WalletEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Lagged(skipped)) => Some(lagged(skipped)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Explicitly unsubscribe. Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

fn lagged(skipped: u64) -> WalletEvent {
    tracing::warn!(skipped, "Wallet event subscriber lagged");
    WalletEvent::Lagged(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> WalletIdentity {
        WalletIdentity::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap()
    }

    #[tokio::test]
    async fn every_subscriber_receives_events() {
        let hub = WalletEventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(WalletEvent::AccountChanged(Some(wallet()))), 2);
        assert_eq!(a.next().await, Some(WalletEvent::AccountChanged(Some(wallet()))));
        assert_eq!(b.next().await, Some(WalletEvent::AccountChanged(Some(wallet()))));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let hub = WalletEventHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(a);
        b.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(WalletEvent::Disconnected), 0);
    }

    #[tokio::test]
    async fn closed_hub_ends_subscription() {
        let hub = WalletEventHub::new();
        let mut sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn try_next_is_non_blocking() {
        let hub = WalletEventHub::new();
        let mut sub = hub.subscribe();
        assert_eq!(sub.try_next(), None);
        hub.publish(WalletEvent::ChainChanged(1));
        assert_eq!(sub.try_next(), Some(WalletEvent::ChainChanged(1)));
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_what_it_missed() {
        let hub = WalletEventHub::with_capacity(2);
        let mut sub = hub.subscribe();
        hub.publish(WalletEvent::AccountChanged(Some(wallet())));
        hub.publish(WalletEvent::ChainChanged(1));
        hub.publish(WalletEvent::ChainChanged(2));

        assert_eq!(sub.next().await, Some(WalletEvent::Lagged(1)));
        assert_eq!(sub.next().await, Some(WalletEvent::ChainChanged(1)));
        assert_eq!(sub.try_next(), Some(WalletEvent::ChainChanged(2)));
        assert_eq!(sub.try_next(), None);
    }
}
