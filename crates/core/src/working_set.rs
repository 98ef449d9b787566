//! Positive-margin working set.
//!
//! Once any account has been seen with both nonzero required and available
//! margin, polling narrows from a full program scan to just the recorded
//! addresses. The set only grows.

use liquidator_chain::MarginSnapshot;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;

/// Which margin accounts the next cycle fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScope {
    /// Every margin account owned by the program
    All,
    /// Exactly these addresses
    Addresses(Vec<Pubkey>),
}

#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    addresses: BTreeSet<Pubkey>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.addresses.contains(address)
    }

    /// Full scan while empty, otherwise the recorded addresses.
    pub fn scope(&self) -> FetchScope {
        if self.addresses.is_empty() {
            FetchScope::All
        } else {
            FetchScope::Addresses(self.addresses.iter().copied().collect())
        }
    }

    /// Record `address` if its snapshot is margined. Returns whether it was newly added.
    pub fn record(&mut self, address: Pubkey, snapshot: &MarginSnapshot) -> bool {
        snapshot.is_margined() && self.addresses.insert(address)
    }
}
