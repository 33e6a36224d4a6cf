//! Two-outcome teardown protocol and grace-period plumbing.
//!
//! Every publish attempt ends in exactly one teardown call:
//!
//! - success → [`RowArena::retire_after_update`] on the **old** row. The old
//!   version was visible, so everything it exclusively owned goes through the
//!   deferred path: readers that fetched it before the swap may still be
//!   traversing it.
//! - failure → [`RowArena::discard_failed_update`] on the **new** row. It was
//!   never visible to any reader, so its fresh allocations are freed
//!   immediately.
//!
//! Both walk the changeset's index set and nothing else. Touching a column at
//! a non-changeset index would free memory the surviving row still owns.
//!
//! Whole-row teardown ([`RowArena::dealloc`] / [`RowArena::dealloc_deferred`])
//! covers the remaining lifecycle exit: a row discarded outright (key
//! removed) rather than superseded.

use crate::{Changeset, ColumnHandle, RowArena, RowHandle, shallow_size};
use arena::MemTag;

impl RowArena {
    /// Frees a row and every column it owns, immediately. Legal only when no
    /// reader can observe the row (it was never published, or the index is
    /// quiescent).
    pub fn dealloc(&mut self, row: RowHandle) {
        let r = self.rows.get(row);
        let shallow = shallow_size(r.cols.len());
        let owned: Vec<ColumnHandle> = r.cols.iter().flatten().copied().collect();
        for col in owned {
            let size = self.columns.get(col).len();
            self.columns.free_now(col, size, MemTag::Value);
        }
        self.rows.free_now(row, shallow, MemTag::Value);
    }

    /// Frees a row and every column it owns through the deferred path, for
    /// rows concurrent readers may still observe at the moment of the call.
    pub fn dealloc_deferred(&mut self, row: RowHandle) {
        let r = self.rows.get(row);
        let shallow = shallow_size(r.cols.len());
        let owned: Vec<ColumnHandle> = r.cols.iter().flatten().copied().collect();
        for col in owned {
            let size = self.columns.get(col).len();
            self.columns.free_deferred(col, size, MemTag::Value);
        }
        self.rows.free_deferred(row, shallow, MemTag::Value);
    }

    /// Teardown of the **old** row after its successor was successfully
    /// published.
    ///
    /// For every changeset index below the old column count, the old column
    /// is now orphaned (the successor owns a different column there) and is
    /// deferred-freed. Changeset indices at or past the old count are skipped
    /// — there was nothing there to free. Columns at non-changeset indices
    /// are never touched: the successor shares them by handle.
    pub fn retire_after_update(&mut self, old_row: RowHandle, changeset: &Changeset) {
        let r = self.rows.get(old_row);
        let ncol = r.cols.len();
        let shallow = shallow_size(ncol);
        let mut orphaned: Vec<ColumnHandle> = Vec::with_capacity(changeset.len());
        // Sorted ascending, so the first out-of-bounds index ends the walk.
        for edit in changeset.iter().take_while(|e| e.index() < ncol) {
            if let Some(col) = r.cols[edit.index()] {
                orphaned.push(col);
            }
        }
        for col in orphaned {
            let size = self.columns.get(col).len();
            self.columns.free_deferred(col, size, MemTag::Value);
        }
        self.rows.free_deferred(old_row, shallow, MemTag::Value);
    }

    /// Teardown of the **new** row after publication failed.
    ///
    /// The row was never visible, so every column at a changeset index —
    /// all freshly allocated when the row was built — is freed immediately,
    /// then the row's own block. Columns at non-changeset indices are handles
    /// copied from the old row, which still owns and needs them.
    pub fn discard_failed_update(&mut self, new_row: RowHandle, changeset: &Changeset) {
        let r = self.rows.get(new_row);
        let shallow = shallow_size(r.cols.len());
        let mut fresh: Vec<ColumnHandle> = Vec::with_capacity(changeset.len());
        for edit in changeset {
            if let Some(col) = r.cols[edit.index()] {
                fresh.push(col);
            }
        }
        for col in fresh {
            let size = self.columns.get(col).len();
            self.columns.free_now(col, size, MemTag::Value);
        }
        self.rows.free_now(new_row, shallow, MemTag::Value);
    }

    /// Current grace-period epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.rows.epoch()
    }

    /// Begins a new epoch in both arenas (they advance in lockstep).
    pub fn advance_epoch(&mut self) -> u64 {
        self.columns.advance_epoch();
        self.rows.advance_epoch()
    }

    /// Releases every deferred free queued before `epoch`. The caller asserts
    /// no in-flight reader predates that boundary. Returns the number of
    /// blocks released.
    pub fn release_before(&mut self, epoch: u64) -> usize {
        self.columns.release_before(epoch) + self.rows.release_before(epoch)
    }

    /// Advances the epoch and releases everything queued before it.
    pub fn quiesce(&mut self) -> usize {
        let epoch = self.advance_epoch();
        self.release_before(epoch)
    }

    /// Number of deferred frees awaiting release.
    #[must_use]
    pub fn pending_deferred(&self) -> usize {
        self.rows.pending_deferred() + self.columns.pending_deferred()
    }

    /// `true` if `row` still refers to memory (live or retired).
    #[must_use]
    pub fn contains_row(&self, row: RowHandle) -> bool {
        self.rows.contains(row)
    }

    /// `true` if `col` still refers to memory (live or retired).
    #[must_use]
    pub fn contains_column(&self, col: ColumnHandle) -> bool {
        self.columns.contains(col)
    }

    /// `true` if `row` has been deferred-freed but not yet released.
    #[must_use]
    pub fn row_retired(&self, row: RowHandle) -> bool {
        self.rows.is_retired(row)
    }

    /// `true` if `col` has been deferred-freed but not yet released.
    #[must_use]
    pub fn column_retired(&self, col: ColumnHandle) -> bool {
        self.columns.is_retired(col)
    }
}
