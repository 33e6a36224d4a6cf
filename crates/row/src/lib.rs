//! # Row — versioned columnar values with copy-on-write updates
//!
//! One versioned, multi-column value for a key in a key-indexed store. The
//! enclosing index holds a [`RowHandle`] per key and swaps it atomically on
//! publish; this crate owns everything below that swap:
//!
//! ```text
//! caller builds Changeset
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │                    RowArena                      │
//! │                                                  │
//! │ update(old, cs, ts) ──► new Row                  │
//! │   unchanged columns: handle copied (shared)      │
//! │   changeset columns: freshly allocated           │
//! │                                                  │
//! │ caller publishes new Row in the index (external) │
//! │   ├─ success ─► retire_after_update(old, cs)     │
//! │   │             (deferred frees — readers may    │
//! │   │              still hold the old version)     │
//! │   └─ failure ─► discard_failed_update(new, cs)   │
//! │                 (immediate frees — never         │
//! │                  published, no possible reader)  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! A [`Row`] is immutable after construction: updating never mutates, it
//! builds a successor. Exactly one row owns a column at any instant — except
//! during the window between building the successor and tearing down its
//! predecessor, when an unchanged column is reachable from both (shared by
//! handle identity, never duplicated). The changeset's index set is the exact
//! partition between "freshly allocated, exclusive to the new row" and
//! "copied handle, still owned elsewhere"; the two teardown paths in
//! [`reclaim`](RowArena::retire_after_update) are mirror images across that
//! boundary.
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `lib.rs`       | `Row`, `RowArena`, construction, read contract     |
//! | [`changeset`]  | Sorted, deduplicated edit lists                    |
//! | `reclaim`      | Two-outcome teardown protocol, epoch plumbing      |
//! | `checkpoint`   | Serialize/restore a row as one atomic unit         |

mod changeset;
mod checkpoint;
mod reclaim;

pub use changeset::{Changeset, Edit};
pub use checkpoint::CHECKPOINT_MAGIC;

use arena::{Arena, Handle, MemTag, TagStats};

/// Handle to a [`Row`] stored in a [`RowArena`].
pub type RowHandle = Handle;

/// Handle to one column payload stored in a [`RowArena`].
pub type ColumnHandle = Handle;

/// One versioned value: a logical write timestamp plus a fixed-length,
/// index-addressed array of column handles. `None` marks a slot that was
/// never written ("absent field" — a valid domain state, not an error).
pub struct Row {
    ts: u64,
    cols: Box<[Option<ColumnHandle>]>,
}

impl Row {
    /// Logical write time. Monotonically non-decreasing across successive
    /// versions of the same key.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.ts
    }

    /// Number of column slots. Fixed at construction; never grows in place.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.cols.len()
    }
}

/// Shallow size of a row: header plus handle-slot array, excluding the
/// referenced column payloads. Used as the accounting size for the row's own
/// allocation.
#[must_use]
pub fn shallow_size(ncol: usize) -> usize {
    std::mem::size_of::<Row>() + ncol * std::mem::size_of::<Option<ColumnHandle>>()
}

/// Allocator context for rows and columns.
///
/// Passed explicitly to every construction and teardown call — there is no
/// ambient global state. Holds two slot arenas (row headers and column
/// payloads, both accounted under [`MemTag::Value`]) whose grace-period
/// epochs advance in lockstep.
pub struct RowArena {
    rows: Arena<Row>,
    columns: Arena<Box<[u8]>>,
}

impl RowArena {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arena::new(),
            columns: Arena::new(),
        }
    }

    /// Allocates a column holding a copy of `bytes`.
    pub fn make_column(&mut self, bytes: &[u8]) -> ColumnHandle {
        self.columns
            .allocate(bytes.into(), bytes.len(), MemTag::Value)
    }

    /// Builds a one-column row directly; no prior row involved.
    pub fn create_single(&mut self, value: &[u8], ts: u64) -> RowHandle {
        let col = self.make_column(value);
        self.rows.allocate(
            Row {
                ts,
                cols: Box::new([Some(col)]),
            },
            shallow_size(1),
            MemTag::Value,
        )
    }

    /// Builds a row from a changeset, as if updating a zero-column row.
    ///
    /// Contract: `changeset` is non-empty (debug-checked; it sizes the row).
    pub fn create(&mut self, changeset: &Changeset, ts: u64) -> RowHandle {
        debug_assert!(!changeset.is_empty(), "create from empty changeset");
        self.build(&[], changeset, ts)
    }

    /// Derives a new row from `row` by applying `changeset` at time `ts`.
    ///
    /// Never mutates `row` and performs no deallocation: unchanged columns
    /// are carried over by handle, changeset slots get freshly allocated
    /// columns, and slots past the old count that the changeset does not
    /// touch stay empty. The caller publishes the result and then invokes
    /// exactly one of [`retire_after_update`](Self::retire_after_update) or
    /// [`discard_failed_update`](Self::discard_failed_update).
    ///
    /// Contract: `ts >= timestamp(row)` and `changeset` is non-empty. Both
    /// are debug-checked only — the hot path stays branch-free.
    pub fn update(&mut self, row: RowHandle, changeset: &Changeset, ts: u64) -> RowHandle {
        let old = self.rows.get(row);
        debug_assert!(
            ts >= old.ts,
            "non-monotonic update: ts {} < row ts {}",
            ts,
            old.ts
        );
        debug_assert!(!changeset.is_empty(), "update with empty changeset");
        let old_cols = old.cols.clone();
        self.build(&old_cols, changeset, ts)
    }

    fn build(&mut self, old_cols: &[Option<ColumnHandle>], changeset: &Changeset, ts: u64) -> RowHandle {
        let ncol = old_cols
            .len()
            .max(changeset.last_index().map_or(0, |i| i + 1));
        let mut cols = vec![None; ncol];
        cols[..old_cols.len()].copy_from_slice(old_cols);
        for edit in changeset {
            cols[edit.index()] = Some(self.make_column(edit.value()));
        }
        self.rows.allocate(
            Row {
                ts,
                cols: cols.into_boxed_slice(),
            },
            shallow_size(ncol),
            MemTag::Value,
        )
    }

    /// Borrows the row behind `handle`. Valid for published rows and for
    /// retired rows still inside their grace period.
    #[must_use]
    pub fn row(&self, handle: RowHandle) -> &Row {
        self.rows.get(handle)
    }

    /// Logical write time of the row.
    #[must_use]
    pub fn timestamp(&self, row: RowHandle) -> u64 {
        self.rows.get(row).ts
    }

    /// Number of column slots in the row.
    #[must_use]
    pub fn column_count(&self, row: RowHandle) -> usize {
        self.rows.get(row).cols.len()
    }

    /// Byte content of column `index`, or an empty slice for an absent field
    /// (never-written slot or `index >= column_count`).
    #[must_use]
    pub fn column(&self, row: RowHandle, index: usize) -> &[u8] {
        let r = self.rows.get(row);
        match r.cols.get(index).copied().flatten() {
            Some(col) => &self.columns.get(col)[..],
            None => &[],
        }
    }

    /// Byte content of a column by handle, independent of any row.
    #[must_use]
    pub fn column_bytes(&self, col: ColumnHandle) -> &[u8] {
        &self.columns.get(col)[..]
    }

    /// Handle identity of column `index`, if the slot was ever written.
    /// Exposes structural sharing: an unchanged column keeps its handle
    /// across an update.
    #[must_use]
    pub fn column_handle(&self, row: RowHandle, index: usize) -> Option<ColumnHandle> {
        self.rows.get(row).cols.get(index).copied().flatten()
    }

    /// Combined allocation counters for row headers and column payloads.
    #[must_use]
    pub fn stats(&self) -> TagStats {
        let rows = self.rows.stats(MemTag::Value);
        let cols = self.columns.stats(MemTag::Value);
        TagStats {
            allocations: rows.allocations + cols.allocations,
            frees: rows.frees + cols.frees,
            allocated_bytes: rows.allocated_bytes + cols.allocated_bytes,
            freed_bytes: rows.freed_bytes + cols.freed_bytes,
        }
    }

    /// Number of live (not retired, not freed) rows.
    #[must_use]
    pub fn live_rows(&self) -> usize {
        self.rows.live()
    }

    /// Number of live (not retired, not freed) columns.
    #[must_use]
    pub fn live_columns(&self) -> usize {
        self.columns.live()
    }
}

impl Default for RowArena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RowArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("RowArena")
            .field("epoch", &self.rows.epoch())
            .field("live_rows", &self.rows.live())
            .field("live_columns", &self.columns.live())
            .field("pending_deferred", &self.pending_deferred())
            .field("live_bytes", &stats.live_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests;
