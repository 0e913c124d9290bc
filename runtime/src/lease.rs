//! Active / pending / completed state machine for opaque payloads.
//!
//! An item is enqueued Active, handed to exactly one poller by [`LeaseQueue::claim`]
//! (becoming Pending under a fresh lease id), and removed for good by
//! [`LeaseQueue::acknowledge`]. Pending items whose lease outlives the timeout are
//! put back at the tail of the active order by [`LeaseQueue::reactivate_expired`].
//!
//! All state lives behind one mutex per queue instance; every operation is a
//! single short critical section, so an id is observed in exactly one state.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

pub type ItemId = Uuid;
pub type LeaseId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Active,
    Pending,
}

/// One delivery of an item to one poller.
#[derive(Debug, Clone)]
pub struct Lease<T> {
    /// Correlation id handed to the poller; new for every delivery
    pub lease_id: LeaseId,
    /// Stable id assigned at enqueue time
    pub item_id: ItemId,
    pub payload: T,
    /// 1 for the first delivery, incremented on every redelivery
    pub delivery: u32,
}

struct Entry<T> {
    payload: T,
    state: ItemState,
    pending_since: Option<Instant>,
    leases: Vec<LeaseId>,
    deliveries: u32,
}

struct QueueState<T> {
    items: HashMap<ItemId, Entry<T>>,
    active: VecDeque<ItemId>,
    leases: HashMap<LeaseId, ItemId>,
}

impl<T> QueueState<T> {
    fn remove_item(&mut self, item_id: ItemId) -> Option<T> {
        let entry = self.items.remove(&item_id)?;
        for lease in &entry.leases {
            self.leases.remove(lease);
        }
        // A stale id left in `active` is skipped lazily by `claim`.
        Some(entry.payload)
    }

    fn lease(&mut self, item_id: ItemId, now: Instant) -> Option<(LeaseId, u32)> {
        let entry = self.items.get_mut(&item_id)?;
        let lease_id = Uuid::now_v7();
        entry.state = ItemState::Pending;
        entry.pending_since = Some(now);
        entry.deliveries += 1;
        entry.leases.push(lease_id);
        self.leases.insert(lease_id, item_id);
        Some((lease_id, entry.deliveries))
    }
}

pub struct LeaseQueue<T> {
    name: &'static str,
    lease_timeout: Duration,
    state: Mutex<QueueState<T>>,
}

impl<T: Clone> LeaseQueue<T> {
    pub fn new(name: &'static str, lease_timeout: Duration) -> Self {
        Self {
            name,
            lease_timeout,
            state: Mutex::new(QueueState {
                items: HashMap::new(),
                active: VecDeque::new(),
                leases: HashMap::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lease_timeout(&self) -> Duration {
        self.lease_timeout
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a new Active item behind everything already active.
    pub fn enqueue(&self, payload: T) -> ItemId {
        let item_id = Uuid::now_v7();
        let mut state = self.lock();
        state.items.insert(
            item_id,
            Entry {
                payload,
                state: ItemState::Active,
                pending_since: None,
                leases: Vec::new(),
                deliveries: 0,
            },
        );
        state.active.push_back(item_id);
        item_id
    }

    /// Insert a new item and lease it to the caller in the same step, so no
    /// other poller can observe it as Active.
    pub fn enqueue_claimed(&self, payload: T) -> Lease<T> {
        self.enqueue_claimed_at(payload, Instant::now())
    }

    pub fn enqueue_claimed_at(&self, payload: T, now: Instant) -> Lease<T> {
        let item_id = Uuid::now_v7();
        let lease_id = Uuid::now_v7();
        let mut state = self.lock();
        state.items.insert(
            item_id,
            Entry {
                payload: payload.clone(),
                state: ItemState::Pending,
                pending_since: Some(now),
                leases: vec![lease_id],
                deliveries: 1,
            },
        );
        state.leases.insert(lease_id, item_id);
        Lease {
            lease_id,
            item_id,
            payload,
            delivery: 1,
        }
    }

    /// Lease the oldest Active item, or return `None` immediately.
    pub fn claim(&self) -> Option<Lease<T>> {
        self.claim_at(Instant::now())
    }

    pub fn claim_at(&self, now: Instant) -> Option<Lease<T>> {
        let mut state = self.lock();
        while let Some(item_id) = state.active.pop_front() {
            let is_active = state
                .items
                .get(&item_id)
                .is_some_and(|entry| entry.state == ItemState::Active);
            if !is_active {
                continue;
            }
            let (lease_id, delivery) = state.lease(item_id, now)?;
            let payload = state.items.get(&item_id)?.payload.clone();
            return Some(Lease {
                lease_id,
                item_id,
                payload,
                delivery,
            });
        }
        None
    }

    /// Complete the item a lease belongs to. Returns false for unknown leases
    /// and for items that were already completed or withdrawn.
    pub fn acknowledge(&self, lease_id: LeaseId) -> bool {
        self.complete(lease_id).is_some()
    }

    /// Like [`acknowledge`](Self::acknowledge), handing back the removed item.
    ///
    /// Any lease ever issued for a live item is accepted, including one whose
    /// deadline passed and whose item was redelivered: the first answer wins.
    pub fn complete(&self, lease_id: LeaseId) -> Option<(ItemId, T)> {
        let mut state = self.lock();
        let item_id = *state.leases.get(&lease_id)?;
        let payload = state.remove_item(item_id)?;
        Some((item_id, payload))
    }

    /// Drop an item regardless of its state; later acknowledgments fail.
    pub fn withdraw(&self, item_id: ItemId) -> Option<T> {
        self.lock().remove_item(item_id)
    }

    pub fn reactivate_expired(&self) -> usize {
        self.reactivate_expired_at(Instant::now())
    }

    /// Return every Pending item whose lease is older than the timeout to the
    /// tail of the active order, oldest lease first.
    pub fn reactivate_expired_at(&self, now: Instant) -> usize {
        let timeout = self.lease_timeout;
        let mut state = self.lock();
        let mut expired: Vec<(Instant, ItemId)> = state
            .items
            .iter()
            .filter_map(|(item_id, entry)| match (entry.state, entry.pending_since) {
                (ItemState::Pending, Some(since)) if now.saturating_duration_since(since) > timeout => {
                    Some((since, *item_id))
                }
                _ => None,
            })
            .collect();
        expired.sort();

        for (since, item_id) in &expired {
            if let Some(entry) = state.items.get_mut(item_id) {
                entry.state = ItemState::Active;
                entry.pending_since = None;
                tracing::warn!(
                    queue = self.name,
                    item_id = %item_id,
                    deliveries = entry.deliveries,
                    pending_ms = now.saturating_duration_since(*since).as_millis() as u64,
                    "lease expired, item reactivated"
                );
            }
            state.active.push_back(*item_id);
        }
        expired.len()
    }

    pub fn state_of(&self, item_id: ItemId) -> Option<ItemState> {
        self.lock().items.get(&item_id).map(|entry| entry.state)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        self.lock()
            .items
            .values()
            .filter(|entry| entry.state == ItemState::Pending)
            .count()
    }
}
