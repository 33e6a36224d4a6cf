use super::*;

#[test]
fn integer_round_trip() {
    let mut w = ByteWriter::new();
    w.put_u8(0xAB);
    w.put_u32(0xDEAD_BEEF);
    w.put_u64(u64::MAX);

    let buf = w.into_inner();
    assert_eq!(buf.len(), 1 + 4 + 8);

    let mut r = ByteReader::new(&buf);
    assert_eq!(r.get_u8().unwrap(), 0xAB);
    assert_eq!(r.get_u32().unwrap(), 0xDEAD_BEEF);
    assert_eq!(r.get_u64().unwrap(), u64::MAX);
    assert!(r.is_empty());
}

#[test]
fn integers_are_little_endian() {
    let mut w = ByteWriter::new();
    w.put_u32(0x0102_0304);
    assert_eq!(w.as_slice(), &[0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn byte_string_round_trip() {
    let mut w = ByteWriter::new();
    w.put_bytes(b"alice");
    w.put_bytes(b"");
    w.put_bytes(b"bob");

    let buf = w.into_inner();
    let mut r = ByteReader::new(&buf);
    assert_eq!(r.get_bytes().unwrap(), b"alice");
    assert_eq!(r.get_bytes().unwrap(), b"");
    assert_eq!(r.get_bytes().unwrap(), b"bob");
    assert!(r.is_empty());
}

#[test]
fn empty_byte_string_is_four_bytes() {
    let mut w = ByteWriter::new();
    w.put_bytes(b"");
    assert_eq!(w.as_slice(), &[0, 0, 0, 0]);
}

#[test]
fn truncated_integer_reports_counts() {
    let buf = [0u8; 3];
    let mut r = ByteReader::new(&buf);
    assert_eq!(
        r.get_u32(),
        Err(StreamError::Truncated {
            needed: 4,
            remaining: 3
        })
    );
}

#[test]
fn truncated_payload_reports_counts() {
    // Declares 10 bytes, supplies 2.
    let mut w = ByteWriter::new();
    w.put_u32(10);
    w.put_raw(b"ab");

    let buf = w.into_inner();
    let mut r = ByteReader::new(&buf);
    assert_eq!(
        r.get_bytes(),
        Err(StreamError::Truncated {
            needed: 10,
            remaining: 2
        })
    );
}

#[test]
fn missing_length_prefix_is_truncated() {
    let mut r = ByteReader::new(&[]);
    assert!(matches!(r.get_bytes(), Err(StreamError::Truncated { .. })));
}

#[test]
fn failed_read_does_not_consume() {
    let mut w = ByteWriter::new();
    w.put_u32(100);
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    assert!(r.get_bytes().is_err());
    // The length prefix was consumed but the payload read left the cursor in
    // place; remaining still reports the post-prefix position.
    assert_eq!(r.remaining(), 0);
}

#[test]
fn raw_and_remaining() {
    let mut w = ByteWriter::new();
    w.put_raw(b"abcdef");
    let buf = w.into_inner();

    let mut r = ByteReader::new(&buf);
    assert_eq!(r.remaining(), 6);
    assert_eq!(r.get_raw(4).unwrap(), b"abcd");
    assert_eq!(r.remaining(), 2);
    assert!(r.get_raw(3).is_err());
    assert_eq!(r.get_raw(2).unwrap(), b"ef");
    assert!(r.is_empty());
}
