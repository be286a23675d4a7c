//! Simulated result transport from the coordinator back to requesters.

use ethology_env::{EnvError, RequesterId, ResultEnvelope, ResultSink};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Per-requester inboxes behind one `ResultSink`.
pub struct SimNetwork {
    inboxes: Mutex<HashMap<RequesterId, mpsc::UnboundedSender<ResultEnvelope>>>,
    delivered: AtomicU64,
    undeliverable: AtomicU64,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self {
            inboxes: Mutex::new(HashMap::new()),
            delivered: AtomicU64::new(0),
            undeliverable: AtomicU64::new(0),
        }
    }

    /// Registers a requester and returns its inbox.
    pub fn connect(&self, requester: RequesterId) -> mpsc::UnboundedReceiver<ResultEnvelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(requester, tx);
        rx
    }

    pub fn disconnect(&self, requester: RequesterId) {
        self.inboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&requester);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn undeliverable(&self) -> u64 {
        self.undeliverable.load(Ordering::SeqCst)
    }
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for SimNetwork {
    fn on_scan_result(&self, requester: RequesterId, envelope: ResultEnvelope) -> Result<(), EnvError> {
        let inboxes = self.inboxes.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = inboxes
            .get(&requester)
            .map(|tx| tx.send(envelope).is_ok())
            .unwrap_or(false);
        if sent {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            self.undeliverable.fetch_add(1, Ordering::SeqCst);
            Err(EnvError::unreachable(requester))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_to_connected_requester() {
        let network = SimNetwork::new();
        let a = RequesterId::from_seed(1);
        let b = RequesterId::from_seed(2);
        let mut inbox = network.connect(a);

        network
            .on_scan_result(a, ResultEnvelope::new(vec![1, 2, 3], 10))
            .expect("a is connected");
        assert!(network.on_scan_result(b, ResultEnvelope::new(vec![], 0)).is_err());

        assert_eq!(inbox.try_recv().expect("delivered").payload, vec![1, 2, 3]);
        assert_eq!(network.delivered(), 1);
        assert_eq!(network.undeliverable(), 1);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let network = SimNetwork::new();
        let a = RequesterId::from_seed(1);
        let _inbox = network.connect(a);
        network.disconnect(a);
        assert!(network.on_scan_result(a, ResultEnvelope::new(vec![], 0)).is_err());
    }
}
