//! The archive abstraction (spec §4.6/§6): a write/read interface exposing
//! object/list/map framing plus raw byte I/O. Framing calls are optional so
//! the same abstraction could back either a minimal binary format or a
//! self-describing hierarchical one; this crate ships the minimal binary
//! format the reference format describes, since spec §1 scopes the concrete
//! container format out of the core but §6 still pins down its shape.

use crate::error::{EcsError, EcsResult};

/// Write side of an archive.
pub trait ArchiveWriter {
    fn object_begin(&mut self) {}
    fn object_end(&mut self) {}
    fn list_begin(&mut self, _len: usize) {}
    fn list_end(&mut self) {}
    fn map_begin(&mut self, _len: usize) {}
    fn map_end(&mut self) {}
    fn write_bytes(&mut self, buf: &[u8]);

    /// Permits blitting contiguous ranges (spec §4.6).
    fn allow_binary(&self) -> bool;
}

/// Read side of an archive.
pub trait ArchiveReader {
    fn object_begin(&mut self) {}
    fn object_end(&mut self) {}
    fn list_begin(&mut self) -> EcsResult<usize>;
    fn list_end(&mut self) {}
    fn map_begin(&mut self) -> EcsResult<usize>;
    fn map_end(&mut self) {}
    fn read_bytes(&mut self, buf: &mut [u8]) -> EcsResult<()>;

    fn allow_binary(&self) -> bool;
    /// Permits remapping serialized component-type ids to local ones
    /// (spec §4.6, §9: reserved, not implemented in v1).
    fn allow_out_of_order(&self) -> bool;
}

/// The reference binary container (spec §6 "Binary serialization layout"):
/// every `list_begin`/`map_begin` writes its length as a machine-sized
/// unsigned integer, blit paths write contiguous bytes with no framing, and
/// there is intentionally no magic, version, or endianness marker in the
/// byte stream itself.
pub struct BinWriter {
    buf: Vec<u8>,
    allow_binary: bool,
}

impl BinWriter {
    pub fn new(allow_binary: bool) -> Self {
        Self {
            buf: Vec::new(),
            allow_binary,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ArchiveWriter for BinWriter {
    fn list_begin(&mut self, len: usize) {
        self.write_bytes(&(len as u64).to_ne_bytes());
    }

    fn map_begin(&mut self, len: usize) {
        self.write_bytes(&(len as u64).to_ne_bytes());
    }

    fn write_bytes(&mut self, buf: &[u8]) {
        self.buf.extend_from_slice(buf);
    }

    fn allow_binary(&self) -> bool {
        self.allow_binary
    }
}

pub struct BinReader<'a> {
    data: &'a [u8],
    pos: usize,
    allow_binary: bool,
    allow_out_of_order: bool,
}

impl<'a> BinReader<'a> {
    pub fn new(data: &'a [u8], allow_binary: bool, allow_out_of_order: bool) -> Self {
        Self {
            data,
            pos: 0,
            allow_binary,
            allow_out_of_order,
        }
    }
}

/// Bridges an [`ArchiveWriter`]/[`ArchiveReader`] to `std::io`, so per-type
/// `serde` hooks can use `bincode`'s stream-oriented (de)serialization
/// instead of needing their own length-prefixing scheme.
pub(crate) struct WriteAdapter<'a>(pub(crate) &'a mut dyn ArchiveWriter);

impl<'a> std::io::Write for WriteAdapter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub(crate) struct ReadAdapter<'a>(pub(crate) &'a mut dyn ArchiveReader);

impl<'a> std::io::Read for ReadAdapter<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0
            .read_bytes(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e.to_string()))?;
        Ok(buf.len())
    }
}

impl<'a> ArchiveReader for BinReader<'a> {
    fn list_begin(&mut self) -> EcsResult<usize> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(u64::from_ne_bytes(buf) as usize)
    }

    fn map_begin(&mut self) -> EcsResult<usize> {
        self.list_begin()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> EcsResult<()> {
        if self.pos + buf.len() > self.data.len() {
            return Err(EcsError::Corrupt(format!(
                "expected {} more bytes, found {}",
                buf.len(),
                self.data.len() - self.pos
            )));
        }
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn allow_binary(&self) -> bool {
        self.allow_binary
    }

    fn allow_out_of_order(&self) -> bool {
        self.allow_out_of_order
    }
}
