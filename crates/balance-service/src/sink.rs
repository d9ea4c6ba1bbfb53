//! Fan-in channel between adapters and the session callback

use balance_core::BalanceItem;
use tokio::sync::mpsc;

use crate::handle::{CancelFlag, SubscriptionHandle};

/// Receiving end handed to `subscribe_balance_stream` callers
pub type BalanceStream = mpsc::UnboundedReceiver<Vec<BalanceItem>>;

/// Sending end owned by an adapter.
///
/// Every emission checks all cancellation flags in scope first, so a cancelled
/// adapter drops results of network calls that were already in flight.
#[derive(Debug, Clone)]
pub struct BalanceSink {
    tx: mpsc::UnboundedSender<Vec<BalanceItem>>,
    flags: Vec<CancelFlag>,
}

impl BalanceSink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<BalanceItem>>, flag: CancelFlag) -> Self {
        Self {
            tx,
            flags: vec![flag],
        }
    }

    /// A new sink plus the stream it feeds, bound to `handle`
    pub fn channel(handle: &SubscriptionHandle) -> (Self, BalanceStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, handle.flag()), rx)
    }

    /// Same channel, additionally gated on `handle`
    pub fn scoped(&self, handle: &SubscriptionHandle) -> Self {
        let mut flags = self.flags.clone();
        flags.push(handle.flag());
        Self {
            tx: self.tx.clone(),
            flags,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.iter().any(CancelFlag::is_cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.is_cancelled() || self.tx.is_closed()
    }

    /// Push a batch of snapshots. Returns `false` once the sink is closed.
    pub fn emit(&self, items: Vec<BalanceItem>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if items.is_empty() {
            return true;
        }
        self.tx.send(items).is_ok()
    }

    pub fn emit_one(&self, item: BalanceItem) -> bool {
        self.emit(vec![item])
    }
}
