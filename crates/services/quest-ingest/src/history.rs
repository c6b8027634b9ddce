//! Bounded history store
//!
//! Fixed-capacity, drop-oldest history for one stream. The store owns the
//! stream's id sequence: ids are assigned while the lock is held, so id
//! order always equals insertion order and ids are never reused, even
//! after eviction.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::model::{AudioFrame, CameraFrame, StreamKind, TextMessage};

/// Default number of records kept per stream
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// A record addressable by an identifier
pub trait Identified {
    type Id: PartialEq + ?Sized;

    fn id(&self) -> &Self::Id;
}

impl Identified for CameraFrame {
    type Id = u64;

    fn id(&self) -> &u64 {
        &self.frame_id
    }
}

impl Identified for AudioFrame {
    type Id = u64;

    fn id(&self) -> &u64 {
        &self.frame_id
    }
}

impl Identified for TextMessage {
    type Id = str;

    fn id(&self) -> &str {
        &self.message_id
    }
}

/// Outcome of an append
#[derive(Debug, Clone)]
pub struct Appended<T> {
    /// Copy of the record as stored
    pub record: T,

    /// Oldest record, if the append pushed it out
    pub evicted: Option<T>,
}

struct HistoryInner<T> {
    records: VecDeque<T>,
    next_seq: u64,
    evicted: u64,
}

/// Fixed-capacity FIFO history for one stream
pub struct BoundedHistory<T> {
    /// Which stream this history holds (for logging)
    stream: StreamKind,

    /// Maximum number of records kept
    capacity: usize,

    inner: Mutex<HistoryInner<T>>,
}

impl<T: Identified + Clone> BoundedHistory<T> {
    /// Create an empty history; a capacity of 0 is raised to 1
    pub fn new(stream: StreamKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            stream,
            capacity,
            inner: Mutex::new(HistoryInner {
                records: VecDeque::with_capacity(capacity + 1),
                next_seq: 0,
                evicted: 0,
            }),
        }
    }

    /// Build and append a record, evicting the oldest if over capacity
    ///
    /// `build` receives the sequence number assigned to the new record.
    pub fn append_with<F>(&self, build: F) -> Appended<T>
    where
        F: FnOnce(u64) -> T,
    {
        let mut inner = self.inner.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;

        let record = build(seq);
        inner.records.push_back(record.clone());

        let evicted = if inner.records.len() > self.capacity {
            inner.evicted += 1;
            inner.records.pop_front()
        } else {
            None
        };
        drop(inner);

        if evicted.is_some() {
            tracing::debug!(
                stream = %self.stream,
                capacity = self.capacity,
                "History full, evicted oldest record"
            );
        }

        Appended { record, evicted }
    }

    /// Most recent `limit` records, oldest first
    pub fn list(&self, limit: usize) -> Vec<T> {
        let inner = self.inner.lock();
        let skip = inner.records.len().saturating_sub(limit);
        inner.records.iter().skip(skip).cloned().collect()
    }

    /// Find a record by id
    pub fn find_by_id(&self, id: &T::Id) -> Option<T> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    /// Mutate a record in place, returning `None` if it is not held
    pub fn update_by_id<R>(&self, id: &T::Id, update: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner
            .lock()
            .records
            .iter_mut()
            .find(|record| record.id() == id)
            .map(update)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Total records evicted since creation
    pub fn evicted_count(&self) -> u64 {
        self.inner.lock().evicted
    }

    /// Sequence number the next append will receive
    pub fn next_seq(&self) -> u64 {
        self.inner.lock().next_seq
    }
}
