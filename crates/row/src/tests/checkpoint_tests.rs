use super::helpers::cs;
use crate::{CHECKPOINT_MAGIC, RowArena};
use anyhow::Result;
use stream::{ByteReader, ByteWriter};
use tempfile::tempdir;

// --------------------- Stream round trip ---------------------

#[test]
fn checkpoint_round_trip_reproduces_logical_state() {
    let mut arena = RowArena::new();
    let row = arena.create(&cs(&[(0, b"alice"), (1, b""), (3, b"xyz")]), 42);

    let mut w = ByteWriter::new();
    arena.checkpoint_write(row, &mut w);
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    let restored = arena.checkpoint_read(&mut r);
    assert!(r.is_empty(), "checkpoint is consumed as one unit");

    assert_eq!(arena.timestamp(restored), 42);
    assert_eq!(arena.column_count(restored), 4);
    for i in 0..4 {
        assert_eq!(arena.column(restored, i), arena.column(row, i));
    }
    // Fresh identities: the restored row shares nothing with the original.
    assert_ne!(arena.column_handle(restored, 0), arena.column_handle(row, 0));
}

#[test]
fn checkpoint_preserves_absent_vs_empty() {
    let mut arena = RowArena::new();
    // Column 1 is explicitly empty, column 2 was never written.
    let row = arena.create(&cs(&[(0, b"a"), (1, b""), (3, b"d")]), 7);
    assert!(arena.column_handle(row, 1).is_some());
    assert!(arena.column_handle(row, 2).is_none());

    let blob = arena.encode_checkpoint(row);
    let restored = arena.decode_checkpoint(&blob);

    assert!(arena.column_handle(restored, 1).is_some());
    assert!(arena.column_handle(restored, 2).is_none());
    assert_eq!(arena.column(restored, 1), b"");
    assert_eq!(arena.column(restored, 2), b"");
}

#[test]
fn read_column_fills_a_fresh_column() {
    let mut arena = RowArena::new();
    let mut w = ByteWriter::new();
    w.put_bytes(b"payload");
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    let col = arena.read_column(&mut r);
    assert!(r.is_empty());
    assert!(arena.contains_column(col));
    assert_eq!(arena.column_bytes(col), b"payload");
}

// --------------------- Corruption is fatal ---------------------

#[test]
#[should_panic(expected = "corrupt row checkpoint")]
fn truncated_column_payload_is_fatal() {
    let mut arena = RowArena::new();
    let mut w = ByteWriter::new();
    w.put_u32(100); // declares 100 bytes
    w.put_raw(b"short");
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    let _ = arena.read_column(&mut r);
}

#[test]
#[should_panic(expected = "corrupt row checkpoint")]
fn truncated_checkpoint_body_is_fatal() {
    let mut arena = RowArena::new();
    let row = arena.create(&cs(&[(0, b"a"), (1, b"b")]), 1);

    let mut w = ByteWriter::new();
    arena.checkpoint_write(row, &mut w);
    let mut buf = w.into_inner();
    buf.truncate(buf.len() - 1);

    let mut r = ByteReader::new(&buf);
    let _ = arena.checkpoint_read(&mut r);
}

#[test]
#[should_panic(expected = "bad magic")]
fn wrong_magic_is_fatal() {
    let mut arena = RowArena::new();
    let row = arena.create_single(b"v", 1);
    let mut blob = arena.encode_checkpoint(row);
    blob[0] ^= 0xFF;
    let _ = arena.decode_checkpoint(&blob);
}

#[test]
#[should_panic(expected = "crc mismatch")]
fn flipped_body_bit_is_fatal() {
    let mut arena = RowArena::new();
    let row = arena.create_single(b"value", 1);
    let mut blob = arena.encode_checkpoint(row);
    let last = blob.len() - 1;
    blob[last] ^= 0x01;
    let _ = arena.decode_checkpoint(&blob);
}

#[test]
#[should_panic(expected = "unknown column marker")]
fn unknown_column_marker_is_fatal() {
    let mut arena = RowArena::new();
    let mut w = ByteWriter::new();
    w.put_u64(1); // ts
    w.put_u32(1); // ncol
    w.put_u8(9); // not a valid presence marker
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    let _ = arena.checkpoint_read(&mut r);
}

// --------------------- Blob framing ---------------------

#[test]
fn encoded_blob_starts_with_magic() {
    let mut arena = RowArena::new();
    let row = arena.create_single(b"v", 1);
    let blob = arena.encode_checkpoint(row);

    let mut r = ByteReader::new(&blob);
    assert_eq!(r.get_u32().unwrap(), CHECKPOINT_MAGIC);
}

// --------------------- File round trip ---------------------

#[test]
fn save_and_load_checkpoint_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("row.ckpt");

    let mut arena = RowArena::new();
    let row = arena.create(&cs(&[(0, b"alice"), (2, b"x")]), 9);
    arena.save_checkpoint(row, &path)?;

    let restored = arena.load_checkpoint(&path)?;
    assert_eq!(arena.timestamp(restored), 9);
    assert_eq!(arena.column_count(restored), 3);
    assert_eq!(arena.column(restored, 0), b"alice");
    assert_eq!(arena.column(restored, 1), b"");
    assert_eq!(arena.column(restored, 2), b"x");
    Ok(())
}

#[test]
fn save_checkpoint_leaves_no_tmp_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("row.ckpt");

    let mut arena = RowArena::new();
    let row = arena.create_single(b"v", 1);
    arena.save_checkpoint(row, &path)?;

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
    Ok(())
}

#[test]
fn load_checkpoint_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let mut arena = RowArena::new();
    let result = arena.load_checkpoint(dir.path().join("nope.ckpt"));
    assert!(result.is_err());
}

#[test]
fn save_checkpoint_overwrites_previous_version() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("row.ckpt");

    let mut arena = RowArena::new();
    let v1 = arena.create_single(b"old", 1);
    arena.save_checkpoint(v1, &path)?;

    let v2 = arena.update(v1, &cs(&[(0, b"new")]), 2);
    arena.save_checkpoint(v2, &path)?;

    let restored = arena.load_checkpoint(&path)?;
    assert_eq!(arena.timestamp(restored), 2);
    assert_eq!(arena.column(restored, 0), b"new");
    Ok(())
}
