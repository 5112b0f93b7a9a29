//! Withdrawal claim queue.
//!
//! A withdrawal the pool cannot pay immediately becomes a queue entry. Ids
//! increase by one per entry and every entry records the running total of
//! all queued amounts up to and including itself. With the pool's
//! `claimable` figure, eligibility is then a prefix of the queue:
//!
//! ```text
//! eligible(entry) = entry.accumulated_threshold <= claimable
//! ```
//!
//! `pending == sum(entry.amount)` over the live entries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use deth_types::{Address, MathError, Wei};

use crate::{PoolError, Result};

/// One deferred withdrawal.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Position in the queue.
    pub queue_id: u64,
    /// Who the ETH is owed to.
    pub receiver: Address,
    /// ETH owed.
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Wei,
    /// Running total of queued amounts through this entry.
    #[serde_as(as = "DisplayFromStr")]
    pub accumulated_threshold: Wei,
}

/// Live entries, indexed by id and by receiver.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimQueue {
    last_queue_id: u64,
    #[serde_as(as = "DisplayFromStr")]
    accumulated: Wei,
    #[serde_as(as = "DisplayFromStr")]
    pending: Wei,
    #[serde(default)]
    entries: BTreeMap<u64, QueueEntry>,
    #[serde(default)]
    user_queue_ids: BTreeMap<Address, BTreeSet<u64>>,
}

impl ClaimQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the most recent entry (0 before the first).
    pub fn last_queue_id(&self) -> u64 {
        self.last_queue_id
    }

    /// Lifetime total of queued amounts.
    pub fn accumulated(&self) -> Wei {
        self.accumulated
    }

    /// Amount queued and not yet claimed.
    pub fn pending(&self) -> Wei {
        self.pending
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry `queue_id`, if still live.
    pub fn entry(&self, queue_id: u64) -> Option<&QueueEntry> {
        self.entries.get(&queue_id)
    }

    /// Live entries of `receiver`, oldest first.
    pub fn user_entries(&self, receiver: &Address) -> Vec<QueueEntry> {
        self.user_queue_ids
            .get(receiver)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entries.get(id).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Live entries across all receivers, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// Append an entry owed to `receiver`.
    pub fn enqueue(&mut self, receiver: Address, amount: Wei) -> Result<QueueEntry> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let accumulated = self
            .accumulated
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        let pending = self.pending.checked_add(amount).ok_or(MathError::Overflow)?;
        let queue_id = self.last_queue_id + 1;
        let entry = QueueEntry {
            queue_id,
            receiver,
            amount,
            accumulated_threshold: accumulated,
        };

        self.last_queue_id = queue_id;
        self.accumulated = accumulated;
        self.pending = pending;
        self.entries.insert(queue_id, entry);
        self.user_queue_ids.entry(receiver).or_default().insert(queue_id);
        Ok(entry)
    }

    /// Ids of `receiver`'s entries eligible at `claimable`, oldest first.
    pub fn eligible(&self, receiver: &Address, claimable: Wei) -> Vec<u64> {
        self.user_entries(receiver)
            .into_iter()
            .take_while(|entry| entry.accumulated_threshold <= claimable)
            .map(|entry| entry.queue_id)
            .collect()
    }

    /// Sum of `receiver`'s eligible entries at `claimable`.
    pub fn eligible_amount(&self, receiver: &Address, claimable: Wei) -> Wei {
        self.user_entries(receiver)
            .into_iter()
            .take_while(|entry| entry.accumulated_threshold <= claimable)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Remove the listed entries and return their total.
    ///
    /// Every id must be live; the remaining entries keep their order.
    pub fn take(&mut self, ids: &[u64]) -> Result<Wei> {
        let mut total: Wei = 0;
        for id in ids {
            let entry = self.entries.remove(id).ok_or(PoolError::NoClaimAmount)?;
            if let Some(user_ids) = self.user_queue_ids.get_mut(&entry.receiver) {
                user_ids.remove(id);
                if user_ids.is_empty() {
                    self.user_queue_ids.remove(&entry.receiver);
                }
            }
            total = total.checked_add(entry.amount).ok_or(MathError::Overflow)?;
        }
        self.pending = self.pending.checked_sub(total).ok_or(MathError::Underflow)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn test_enqueue_running_total() {
        let mut queue = ClaimQueue::new();
        let a = queue.enqueue(alice(), 10).expect("enqueue");
        let b = queue.enqueue(bob(), 5).expect("enqueue");
        let c = queue.enqueue(alice(), 7).expect("enqueue");

        assert_eq!((a.queue_id, a.accumulated_threshold), (1, 10));
        assert_eq!((b.queue_id, b.accumulated_threshold), (2, 15));
        assert_eq!((c.queue_id, c.accumulated_threshold), (3, 22));
        assert_eq!(queue.pending(), 22);
        assert_eq!(queue.last_queue_id(), 3);
    }

    #[test]
    fn test_eligible_is_prefix() {
        let mut queue = ClaimQueue::new();
        queue.enqueue(alice(), 10).expect("enqueue");
        queue.enqueue(bob(), 5).expect("enqueue");
        queue.enqueue(alice(), 7).expect("enqueue");

        assert_eq!(queue.eligible(&alice(), 9), Vec::<u64>::new());
        assert_eq!(queue.eligible(&alice(), 21), vec![1]);
        assert_eq!(queue.eligible(&alice(), 22), vec![1, 3]);
        assert_eq!(queue.eligible_amount(&alice(), 22), 17);
        assert_eq!(queue.eligible(&bob(), 14), Vec::<u64>::new());
    }

    #[test]
    fn test_take_preserves_order_of_rest() {
        let mut queue = ClaimQueue::new();
        queue.enqueue(alice(), 1).expect("enqueue");
        queue.enqueue(alice(), 2).expect("enqueue");
        queue.enqueue(alice(), 3).expect("enqueue");

        assert_eq!(queue.take(&[2]), Ok(2));
        let ids: Vec<u64> = queue
            .user_entries(&alice())
            .iter()
            .map(|e| e.queue_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(queue.pending(), 4);
        // The running total is lifetime and does not shrink.
        assert_eq!(queue.accumulated(), 6);
    }

    #[test]
    fn test_take_unknown_id() {
        let mut queue = ClaimQueue::new();
        assert_eq!(queue.take(&[42]), Err(PoolError::NoClaimAmount));
    }

    #[test]
    fn test_zero_entry_rejected() {
        let mut queue = ClaimQueue::new();
        assert_eq!(queue.enqueue(alice(), 0), Err(PoolError::ZeroAmount));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_pending_tracks_live_entries(
                amounts in prop::collection::vec((any::<bool>(), 1u64..1_000_000), 1..40),
                claims in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
            ) {
                let mut queue = ClaimQueue::new();
                for (to_alice, amount) in &amounts {
                    let receiver = if *to_alice { alice() } else { bob() };
                    queue.enqueue(receiver, Wei::from(*amount)).expect("enqueue");
                }
                for index in claims {
                    let live: Vec<u64> = queue.entries().map(|e| e.queue_id).collect();
                    if live.is_empty() {
                        break;
                    }
                    let id = live[index.index(live.len())];
                    queue.take(&[id]).expect("take");

                    let sum: Wei = queue.entries().map(|e| e.amount).sum();
                    prop_assert_eq!(sum, queue.pending());
                    for receiver in [alice(), bob()] {
                        let ids: Vec<u64> = queue.user_entries(&receiver).iter().map(|e| e.queue_id).collect();
                        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
                    }
                }
                let total: u64 = amounts.iter().map(|(_, a)| a).sum();
                prop_assert_eq!(queue.accumulated(), Wei::from(total));
            }
        }
    }
}
