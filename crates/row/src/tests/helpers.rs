use crate::Changeset;

/// Builds a changeset from `(index, bytes)` pairs.
pub fn cs(edits: &[(usize, &[u8])]) -> Changeset {
    Changeset::from_edits(edits.iter().map(|(i, v)| (*i, v.to_vec())))
}
