//! Pending transaction pool.

use keel_ledger::Transaction;
use keel_types::TxHash;
use std::collections::HashSet;

/// Outcome of offering a transaction to the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxAdd {
    Accepted,
    Duplicate,
    Full,
}

impl TxAdd {
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// Deduplicated pending transactions in arrival order.
///
/// Transactions are never removed here when a block includes them; that is
/// the state-transition engine's concern. Once `max_size` is reached the pool
/// refuses every new transaction until the process restarts.
pub struct TransactionPool {
    transactions: Vec<Transaction>,
    hashes: HashSet<TxHash>,
    max_size: usize,
    /// Set after the first refusal has been logged at warn level.
    full_reported: bool,
}

impl TransactionPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            transactions: Vec::new(),
            hashes: HashSet::new(),
            max_size,
            full_reported: false,
        }
    }

    /// Append `tx` unless a transaction with the same hash is already pending
    /// or the pool is full.
    pub fn add(&mut self, tx: Transaction) -> TxAdd {
        if self.hashes.contains(&tx.hash()) {
            return TxAdd::Duplicate;
        }
        if self.is_full() {
            if self.full_reported {
                tracing::debug!(hash = %tx.hash(), "transaction pool full, dropping transaction");
            } else {
                tracing::warn!(
                    max_size = self.max_size,
                    "transaction pool full; new transactions are dropped until restart"
                );
                self.full_reported = true;
            }
            return TxAdd::Full;
        }
        self.hashes.insert(tx.hash());
        self.transactions.push(tx);
        TxAdd::Accepted
    }

    /// Pending transactions, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.transactions.len() >= self.max_size
    }

    /// Whether a refusal because the pool is full has been reported.
    pub fn full_reported(&self) -> bool {
        self.full_reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::Address;

    fn tx(nonce: u64) -> Transaction {
        Transaction::new(
            Address::new([1; 20]),
            Address::new([2; 20]),
            1000,
            nonce,
            Vec::new(),
            21_000,
            1,
        )
    }

    #[test]
    fn keeps_insertion_order() {
        let mut pool = TransactionPool::new(10);
        assert!(pool.add(tx(2)).is_accepted());
        assert!(pool.add(tx(0)).is_accepted());
        assert!(pool.add(tx(1)).is_accepted());

        let nonces: Vec<u64> = pool.transactions().iter().map(Transaction::nonce).collect();
        assert_eq!(nonces, vec![2, 0, 1]);
    }

    #[test]
    fn duplicate_hash_is_refused() {
        let mut pool = TransactionPool::new(10);
        let original = tx(7);
        assert_eq!(pool.add(original.clone()), TxAdd::Accepted);
        assert_eq!(pool.add(original.clone()), TxAdd::Duplicate);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&original.hash()));

        assert_eq!(pool.add(original.with_nonce(8)), TxAdd::Accepted);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn full_pool_refuses_new_transactions() {
        let mut pool = TransactionPool::new(1);
        assert_eq!(pool.add(tx(0)), TxAdd::Accepted);
        assert_eq!(pool.add(tx(1)), TxAdd::Full);
        assert_eq!(pool.add(tx(0)), TxAdd::Duplicate);
        assert!(!pool.is_empty());
    }

    #[test]
    fn filling_up_is_reported_once_and_stays_full() {
        let mut pool = TransactionPool::new(2);
        pool.add(tx(0));
        assert!(!pool.is_full());
        pool.add(tx(1));
        assert!(pool.is_full());
        assert!(!pool.full_reported());

        assert_eq!(pool.add(tx(2)), TxAdd::Full);
        assert!(pool.full_reported());
        for nonce in 3..10 {
            assert_eq!(pool.add(tx(nonce)), TxAdd::Full);
        }
        assert!(pool.full_reported());
        assert_eq!(pool.len(), 2);
    }
}
