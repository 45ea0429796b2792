//! Block framing: `id: u8`, `length: u64` little-endian, then `length` payload bytes.

use std::fmt;
use std::io::{self, Read, Write};

use crate::error::{CodecError, Result};

pub const BLOCK_HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockId {
    Shape = 0,
    Leaves = 1,
    Data = 2,
}

impl BlockId {
    /// The block that has to follow this one, if any.
    pub fn next(self) -> Option<BlockId> {
        match self {
            BlockId::Shape => Some(BlockId::Leaves),
            BlockId::Leaves => Some(BlockId::Data),
            BlockId::Data => None,
        }
    }
}

impl TryFrom<u8> for BlockId {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(BlockId::Shape),
            1 => Ok(BlockId::Leaves),
            2 => Ok(BlockId::Data),
            other => Err(other),
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockId::Shape => "SHAPE",
            BlockId::Leaves => "LEAVES",
            BlockId::Data => "DATA",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: u8,
    pub payload: Vec<u8>,
}

pub fn write_block<W: Write>(writer: &mut W, id: BlockId, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&[id as u8])?;
    let payload_len = payload.len() as u64;
    writer.write_all(&payload_len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads the next block. `Ok(None)` means the source ended cleanly on a block boundary.
pub fn read_block<R: Read>(reader: &mut R) -> Result<Option<Block>> {
    let mut id = [0u8; 1];
    if !read_first_byte(reader, &mut id)? {
        return Ok(None);
    }

    let mut length_bytes = [0u8; 8];
    reader.read_exact(&mut length_bytes)?;
    let length = u64::from_le_bytes(length_bytes);

    // grow the buffer as bytes arrive instead of trusting the header for an allocation size
    let mut payload = Vec::new();
    reader.by_ref().take(length).read_to_end(&mut payload)?;
    if (payload.len() as u64) < length {
        return Err(CodecError::Truncated);
    }

    log::trace!("read block id {} with {} payload bytes", id[0], length);
    Ok(Some(Block { id: id[0], payload }))
}

fn read_first_byte<R: Read>(reader: &mut R, buf: &mut [u8; 1]) -> io::Result<bool> {
    loop {
        match reader.read(buf) {
            Ok(0) => return Ok(false),
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
