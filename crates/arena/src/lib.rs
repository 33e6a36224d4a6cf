//! # Arena — slot allocator with two free modes
//!
//! Backing store for row values that are read by concurrent, lock-free
//! readers. Every allocation lands in an index-addressed slot and is referred
//! to by a copyable [`Handle`]. Freeing comes in two flavors:
//!
//! - [`Arena::free_now`] — the slot is vacated immediately. Only legal for
//!   memory that was **never published**: no reader can possibly hold the
//!   handle.
//! - [`Arena::free_deferred`] — the slot is marked *retired* and queued under
//!   the current grace-period epoch. Retired memory stays readable (a reader
//!   that fetched the handle before the change may still dereference it) and
//!   is vacated only once [`Arena::release_before`] confirms every reader
//!   from that epoch is gone.
//!
//! ## Epochs
//!
//! The arena keeps a monotonically increasing epoch counter. A deferred free
//! is stamped with the epoch at which it was queued. The caller advances the
//! epoch at whatever granularity its concurrency control provides (e.g. once
//! per committed batch) and calls [`Arena::release_before`] once it can
//! guarantee that no in-flight reader predates the given epoch.
//!
//! ```text
//! allocate ──► Occupied ──free_now──────────────► Vacant (reusable)
//!                  │
//!                  └──free_deferred──► Retired ──release──► Vacant
//!                                     (still readable)
//! ```
//!
//! ## Accounting
//!
//! Every allocate/free carries a [`MemTag`] and a caller-declared size, so
//! per-class byte accounting balances even though the arena never inspects
//! the payload. Misuse — double free, freeing a retired slot through the
//! immediate path — is a hard panic: those are reclamation-classification
//! bugs, not recoverable conditions.

use std::collections::VecDeque;

/// Memory class attached to every allocation for accounting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemTag {
    /// Row values: row headers and column payloads.
    Value,
}

impl MemTag {
    const COUNT: usize = 1;

    fn index(self) -> usize {
        match self {
            MemTag::Value => 0,
        }
    }
}

/// Per-tag allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    /// Number of allocations performed under this tag.
    pub allocations: u64,
    /// Number of completed frees (immediate, or deferred *and* released).
    pub frees: u64,
    /// Total bytes allocated under this tag.
    pub allocated_bytes: u64,
    /// Total bytes returned under this tag.
    pub freed_bytes: u64,
}

impl TagStats {
    /// Bytes currently held live (allocated minus freed). Retired-but-not-yet
    /// released memory counts as live: it is not reusable.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.allocated_bytes - self.freed_bytes
    }
}

/// Opaque reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

enum Slot<T> {
    Vacant,
    Occupied(T),
    /// Deferred-freed but still inside its grace period. Readable, not
    /// reusable.
    Retired(T),
}

struct DeferredFree {
    /// Epoch at which the free was queued.
    epoch: u64,
    index: u32,
    size: usize,
    tag: MemTag,
}

/// Slot arena with immediate and deferred (grace-period) reclamation.
///
/// The arena is a thread-local collaborator: all mutation goes through
/// `&mut self`. Published data is read through shared accessors only.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    /// Indices of vacant slots available for reuse.
    free_list: Vec<u32>,
    /// Deferred frees in queue order. Epochs are non-decreasing front to
    /// back, so releasing pops from the front until the boundary.
    deferred: VecDeque<DeferredFree>,
    epoch: u64,
    stats: [TagStats; MemTag::COUNT],
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            deferred: VecDeque::new(),
            epoch: 0,
            stats: [TagStats::default(); MemTag::COUNT],
        }
    }

    /// Stores `value` in a slot and returns its handle.
    ///
    /// `size` is the accounting size for `tag` — the arena does not inspect
    /// the payload, so the caller declares what the allocation "weighs"
    /// (payload length for columns, shallow size for row headers).
    pub fn allocate(&mut self, value: T, size: usize, tag: MemTag) -> Handle {
        let stats = &mut self.stats[tag.index()];
        stats.allocations += 1;
        stats.allocated_bytes += size as u64;

        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize] = Slot::Occupied(value);
            Handle(index)
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena slot count exceeds u32");
            self.slots.push(Slot::Occupied(value));
            Handle(index)
        }
    }

    /// Returns the value behind `handle`.
    ///
    /// Retired slots are still dereferenceable — a reader holding a handle
    /// from before the change is allowed to finish its traversal during the
    /// grace period.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant: dereferencing freed memory is a
    /// use-after-free bug, never a domain state.
    #[must_use]
    pub fn get(&self, handle: Handle) -> &T {
        match &self.slots[handle.0 as usize] {
            Slot::Occupied(value) | Slot::Retired(value) => value,
            Slot::Vacant => panic!("arena: use after free of slot {}", handle.0),
        }
    }

    /// Vacates `handle` immediately. Legal only for memory that was never
    /// visible to any reader.
    ///
    /// # Panics
    ///
    /// Panics on double free, or if the slot was already retired through the
    /// deferred path — both indicate a broken reclamation classification.
    pub fn free_now(&mut self, handle: Handle, size: usize, tag: MemTag) {
        let slot = &mut self.slots[handle.0 as usize];
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(_) => {}
            Slot::Vacant => panic!("arena: double free of slot {}", handle.0),
            Slot::Retired(_) => panic!(
                "arena: immediate free of retired slot {} (already queued for deferred release)",
                handle.0
            ),
        }
        self.free_list.push(handle.0);
        let stats = &mut self.stats[tag.index()];
        stats.frees += 1;
        stats.freed_bytes += size as u64;
    }

    /// Retires `handle`: the slot stays readable but is queued for release
    /// once the current epoch is quiesced.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant or already retired.
    pub fn free_deferred(&mut self, handle: Handle, size: usize, tag: MemTag) {
        let slot = &mut self.slots[handle.0 as usize];
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(value) => *slot = Slot::Retired(value),
            Slot::Vacant => panic!("arena: deferred free of vacant slot {}", handle.0),
            Slot::Retired(_) => panic!("arena: deferred double free of slot {}", handle.0),
        }
        self.deferred.push_back(DeferredFree {
            epoch: self.epoch,
            index: handle.0,
            size,
            tag,
        });
    }

    /// Current grace-period epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Begins a new epoch and returns it. Deferred frees queued from now on
    /// belong to the new epoch.
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        tracing::trace!(epoch = self.epoch, "arena epoch advanced");
        self.epoch
    }

    /// Releases every deferred free queued in an epoch strictly before
    /// `epoch`. The caller asserts that no in-flight reader predates that
    /// boundary. Returns the number of slots released.
    pub fn release_before(&mut self, epoch: u64) -> usize {
        let mut released = 0;
        while let Some(front) = self.deferred.front() {
            if front.epoch >= epoch {
                break;
            }
            let entry = self.deferred.pop_front().expect("front was just observed");
            let slot = &mut self.slots[entry.index as usize];
            match std::mem::replace(slot, Slot::Vacant) {
                Slot::Retired(_) => {}
                // free_deferred is the only writer of the queue, and release
                // is the only transition out of Retired.
                _ => unreachable!("deferred queue entry for non-retired slot"),
            }
            self.free_list.push(entry.index);
            let stats = &mut self.stats[entry.tag.index()];
            stats.frees += 1;
            stats.freed_bytes += entry.size as u64;
            released += 1;
        }
        if released > 0 {
            tracing::trace!(released, before = epoch, "arena released deferred slots");
        }
        released
    }

    /// Advances the epoch and releases everything queued before it.
    /// Convenience for "all readers are done with every prior version".
    pub fn quiesce(&mut self) -> usize {
        let epoch = self.advance_epoch();
        self.release_before(epoch)
    }

    /// `true` if `handle` still refers to memory (occupied or retired).
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        !matches!(self.slots[handle.0 as usize], Slot::Vacant)
    }

    /// `true` if `handle` has been deferred-freed but not yet released.
    #[must_use]
    pub fn is_retired(&self, handle: Handle) -> bool {
        matches!(self.slots[handle.0 as usize], Slot::Retired(_))
    }

    /// Number of occupied (not retired, not vacant) slots.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    /// Number of deferred frees awaiting release.
    #[must_use]
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Accounting counters for `tag`.
    #[must_use]
    pub fn stats(&self, tag: MemTag) -> &TagStats {
        &self.stats[tag.index()]
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("epoch", &self.epoch)
            .field("slots", &self.slots.len())
            .field("live", &self.live())
            .field("pending_deferred", &self.deferred.len())
            .field("vacant", &self.free_list.len())
            .finish()
    }
}
