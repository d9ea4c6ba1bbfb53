//! Latest balance snapshot per (address, token)
//!
//! Adapters push snapshots, not deltas, so a newer record for the same key
//! replaces the older one. The book reports which records actually changed so
//! the watcher only logs movements.

use std::collections::HashMap;

use balance_core::{BalanceItem, BalanceState, TokenSlug};

// ─── BalanceBook ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BalanceBook {
    items: HashMap<(String, TokenSlug), BalanceItem>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `items`, returning those that differ from the stored snapshot.
    ///
    /// Timestamps are ignored when comparing.
    pub fn apply(&mut self, items: Vec<BalanceItem>) -> Vec<BalanceItem> {
        let mut changed = Vec::new();
        for item in items {
            let key = (item.address.clone(), item.token_slug.clone());
            let unchanged = self.items.get(&key).is_some_and(|prev| same_balance(prev, &item));
            if !unchanged {
                changed.push(item.clone());
            }
            self.items.insert(key, item);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Count of records per state, for the shutdown summary
    pub fn state_counts(&self) -> HashMap<BalanceState, usize> {
        let mut counts = HashMap::new();
        for item in self.items.values() {
            *counts.entry(item.state).or_insert(0) += 1;
        }
        counts
    }
}

fn same_balance(a: &BalanceItem, b: &BalanceItem) -> bool {
    a.free == b.free && a.locked == b.locked && a.state == b.state && a.locked_details == b.locked_details
}
