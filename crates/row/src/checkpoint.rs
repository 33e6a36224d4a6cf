//! Checkpoint: serialize and restore a row as one atomic unit.
//!
//! ## Body layout
//!
//! ```text
//! [ts: u64 LE][ncol: u32 LE]
//! per column: [present: u8][len: u32 LE][bytes]   (absent slot: present = 0, nothing else)
//! ```
//!
//! The presence byte keeps a never-written slot distinct from a zero-length
//! column, so round-trips are exact.
//!
//! ## Blob framing (file checkpoints)
//!
//! ```text
//! [magic "RVC1": u32 LE][crc32(body): u32 LE][body]
//! ```
//!
//! Files are written to a `.tmp` sibling, fsynced, then renamed over the
//! target, so a checkpoint on disk is never partially written.
//!
//! ## Corruption is fatal
//!
//! Checkpoint data is trusted infrastructure, not adversarial input. A
//! truncated body, bad magic, or CRC mismatch panics — there is no recovery
//! path at this layer. Genuine file I/O errors (missing file, permissions)
//! propagate as `io::Result` instead.

use crate::{ColumnHandle, Row, RowArena, RowHandle, shallow_size};
use arena::MemTag;
use stream::{ByteReader, ByteWriter, StreamError};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Magic number identifying a row checkpoint blob (ASCII "RVC1").
pub const CHECKPOINT_MAGIC: u32 = 0x5256_4331;

const COL_ABSENT: u8 = 0;
const COL_PRESENT: u8 = 1;

fn fatal<T>(result: Result<T, StreamError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("corrupt row checkpoint: {e}"),
    }
}

impl RowArena {
    /// Reads one length-prefixed byte string and allocates a column from it.
    ///
    /// # Panics
    ///
    /// Panics if the stream is truncated: corrupt persisted state.
    pub fn read_column(&mut self, reader: &mut ByteReader<'_>) -> ColumnHandle {
        let bytes = fatal(reader.get_bytes());
        self.make_column(bytes)
    }

    /// Writes the row's full logical state — timestamp, column count, every
    /// column's bytes — to `writer`.
    pub fn checkpoint_write(&self, row: RowHandle, writer: &mut ByteWriter) {
        let r = self.rows.get(row);
        writer.put_u64(r.ts);
        let ncol = u32::try_from(r.cols.len()).expect("column count exceeds u32");
        writer.put_u32(ncol);
        for slot in r.cols.iter() {
            match slot {
                Some(col) => {
                    writer.put_u8(COL_PRESENT);
                    writer.put_bytes(&self.columns.get(*col)[..]);
                }
                None => writer.put_u8(COL_ABSENT),
            }
        }
    }

    /// Reconstructs a row from `reader`. The restored row reproduces the
    /// original's timestamp, column count, and per-column bytes; column
    /// identities are fresh.
    ///
    /// # Panics
    ///
    /// Panics on a truncated stream or an unknown column marker.
    pub fn checkpoint_read(&mut self, reader: &mut ByteReader<'_>) -> RowHandle {
        let ts = fatal(reader.get_u64());
        let ncol = fatal(reader.get_u32()) as usize;
        let mut cols = vec![None; ncol];
        for slot in cols.iter_mut() {
            match fatal(reader.get_u8()) {
                COL_PRESENT => *slot = Some(self.read_column(reader)),
                COL_ABSENT => {}
                other => panic!("corrupt row checkpoint: unknown column marker {other}"),
            }
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

    /// Serializes the row into a self-contained, CRC-protected blob.
    #[must_use]
    pub fn encode_checkpoint(&self, row: RowHandle) -> Vec<u8> {
        let mut body = ByteWriter::new();
        self.checkpoint_write(row, &mut body);
        let body = body.into_inner();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut blob = ByteWriter::with_capacity(8 + body.len());
        blob.put_u32(CHECKPOINT_MAGIC);
        blob.put_u32(crc);
        blob.put_raw(&body);
        blob.into_inner()
    }

    /// Reconstructs a row from a blob produced by
    /// [`encode_checkpoint`](Self::encode_checkpoint).
    ///
    /// # Panics
    ///
    /// Panics on bad magic, CRC mismatch, or truncation.
    pub fn decode_checkpoint(&mut self, blob: &[u8]) -> RowHandle {
        let mut reader = ByteReader::new(blob);
        let magic = fatal(reader.get_u32());
        if magic != CHECKPOINT_MAGIC {
            panic!("corrupt row checkpoint: bad magic {magic:#010x}");
        }
        let crc = fatal(reader.get_u32());

        let remaining = reader.remaining();
        let body = fatal(reader.get_raw(remaining));
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(body);
        if hasher.finalize() != crc {
            panic!("corrupt row checkpoint: crc mismatch");
        }

        let mut body_reader = ByteReader::new(body);
        self.checkpoint_read(&mut body_reader)
    }

    /// Writes the row's checkpoint blob to `path` atomically: `.tmp` sibling,
    /// fsync, rename.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, row: RowHandle, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let blob = self.encode_checkpoint(row);

        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&blob)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), bytes = blob.len(), "row checkpoint saved");
        Ok(())
    }

    /// Reads a checkpoint blob from `path` and reconstructs the row.
    ///
    /// # Panics
    ///
    /// Panics if the file's content is corrupt; I/O failures propagate.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> io::Result<RowHandle> {
        let path = path.as_ref();
        let blob = fs::read(path)?;
        let row = self.decode_checkpoint(&blob);
        tracing::debug!(path = %path.display(), bytes = blob.len(), "row checkpoint loaded");
        Ok(row)
    }
}
