use crate::Changeset;

#[test]
fn push_keeps_edits_sorted() {
    let mut cs = Changeset::new();
    cs.push(5, b"e".to_vec());
    cs.push(1, b"b".to_vec());
    cs.push(3, b"d".to_vec());
    cs.push(0, b"a".to_vec());

    let indices: Vec<usize> = cs.iter().map(|e| e.index()).collect();
    assert_eq!(indices, vec![0, 1, 3, 5]);
}

#[test]
fn duplicate_index_last_write_wins() {
    let mut cs = Changeset::new();
    cs.push(2, b"first".to_vec());
    cs.push(2, b"second".to_vec());

    assert_eq!(cs.len(), 1);
    assert_eq!(cs.iter().next().unwrap().value(), b"second");
}

#[test]
fn last_index_tracks_highest_edit() {
    let mut cs = Changeset::new();
    assert_eq!(cs.last_index(), None);

    cs.push(7, b"x".to_vec());
    assert_eq!(cs.last_index(), Some(7));

    // Inserting below the maximum does not change it.
    cs.push(3, b"y".to_vec());
    assert_eq!(cs.last_index(), Some(7));

    cs.push(12, b"z".to_vec());
    assert_eq!(cs.last_index(), Some(12));
}

#[test]
fn from_edits_normalizes_unsorted_duplicated_input() {
    let cs = Changeset::from_edits(vec![
        (9, b"i".to_vec()),
        (2, b"old".to_vec()),
        (4, b"e".to_vec()),
        (2, b"new".to_vec()),
    ]);

    let edits: Vec<(usize, &[u8])> = cs.iter().map(|e| (e.index(), e.value())).collect();
    assert_eq!(
        edits,
        vec![
            (2usize, b"new".as_slice()),
            (4, b"e".as_slice()),
            (9, b"i".as_slice())
        ]
    );
}

#[test]
fn single_and_contains() {
    let cs = Changeset::single(3, b"v".to_vec());
    assert_eq!(cs.len(), 1);
    assert!(!cs.is_empty());
    assert!(cs.contains(3));
    assert!(!cs.contains(0));
    assert!(!cs.contains(4));
}

#[test]
fn empty_changeset() {
    let cs = Changeset::new();
    assert!(cs.is_empty());
    assert_eq!(cs.len(), 0);
    assert_eq!(cs.last_index(), None);
    assert_eq!(cs.iter().count(), 0);
}
