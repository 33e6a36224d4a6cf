//! Ordered, deduplicated edit lists.
//!
//! A [`Changeset`] names the columns an update replaces. The update algorithm
//! and both teardown paths rely on two structural properties: edits are
//! sorted ascending by column index, and no index appears twice. Rather than
//! trusting callers to maintain them (silent misordering would corrupt the
//! derived column count and the sharing/ownership partition), [`Changeset::push`]
//! enforces both on insertion — a binary search places each edit, and a
//! duplicate index replaces the previous value.

/// One column edit: the slot index and the replacement bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    index: usize,
    value: Box<[u8]>,
}

impl Edit {
    /// Column slot this edit targets.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Replacement bytes for the slot.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// A sorted, deduplicated, ascending-by-index sequence of column edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    edits: Vec<Edit>,
}

impl Changeset {
    #[must_use]
    pub fn new() -> Self {
        Self { edits: Vec::new() }
    }

    /// A changeset with a single edit.
    #[must_use]
    pub fn single(index: usize, value: Vec<u8>) -> Self {
        let mut cs = Self::new();
        cs.push(index, value);
        cs
    }

    /// Builds a changeset from arbitrary `(index, value)` pairs. Input order
    /// is irrelevant; on a duplicate index the last value wins.
    #[must_use]
    pub fn from_edits<I>(edits: I) -> Self
    where
        I: IntoIterator<Item = (usize, Vec<u8>)>,
    {
        let mut cs = Self::new();
        for (index, value) in edits {
            cs.push(index, value);
        }
        cs
    }

    /// Adds an edit, keeping the sequence sorted and deduplicated. An edit
    /// for an index already present replaces the earlier value.
    pub fn push(&mut self, index: usize, value: Vec<u8>) {
        let value = value.into_boxed_slice();
        match self.edits.binary_search_by_key(&index, Edit::index) {
            Ok(pos) => self.edits[pos].value = value,
            Err(pos) => self.edits.insert(pos, Edit { index, value }),
        }
    }

    /// Highest column index edited, or `None` for an empty changeset.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.edits.last().map(Edit::index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Edits in ascending index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.edits.iter()
    }

    /// `true` if the changeset edits `index`.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.edits.binary_search_by_key(&index, Edit::index).is_ok()
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}
