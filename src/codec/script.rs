//! Script push encoding and chunk reading
//!
//! Only the push opcodes are understood here; everything else belongs to the
//! chain-script layer.

use crate::error::{Error, Result};

/// Push empty / false
pub const OP_0: u8 = 0x00;
/// Next byte is the push length
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Next two bytes (LE) are the push length
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Next four bytes (LE) are the push length
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push -1
pub const OP_1NEGATE: u8 = 0x4f;
/// Push 1 / true
pub const OP_1: u8 = 0x51;
/// Push 16
pub const OP_16: u8 = 0x60;
/// Data-carrying marker that precedes an appended state blob
pub const OP_RETURN: u8 = 0x6a;

/// Largest direct push (length is the opcode itself)
const MAX_DIRECT_PUSH: usize = 0x4b;

/// Append a canonical push of `data` to `script`
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    match len {
        0 => script.push(OP_0),
        1..=MAX_DIRECT_PUSH => script.push(len as u8),
        _ if len <= 0xff => {
            script.push(OP_PUSHDATA1);
            script.push(len as u8);
        }
        _ if len <= 0xffff => {
            script.push(OP_PUSHDATA2);
            script.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            script.push(OP_PUSHDATA4);
            script.extend_from_slice(&(len as u32).to_le_bytes());
        }
    }
    script.extend_from_slice(data);
}

/// Canonical push of `data` as a standalone byte vector
pub fn encode_push(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 5);
    push_data(&mut out, data);
    out
}

/// One decoded push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Data push (including the empty `OP_0` push)
    Data(Vec<u8>),
    /// Small integer opcode: `OP_1NEGATE` or `OP_1..OP_16`
    SmallInt(i8),
}

/// Sequential reader over a region made only of pushes
pub struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    /// Create a reader over `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        ChunkReader { bytes, pos: 0 }
    }

    /// Whether every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                Error::malformed_state(format!(
                    "push of {} bytes at offset {} runs past the end",
                    n, self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read the next chunk
    pub fn next_chunk(&mut self) -> Result<Chunk> {
        let opcode = self.take(1)?[0];
        let len = match opcode {
            OP_0 => 0,
            1..=0x4b => opcode as usize,
            OP_PUSHDATA1 => self.take(1)?[0] as usize,
            OP_PUSHDATA2 => {
                let b = self.take(2)?;
                u16::from_le_bytes([b[0], b[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let b = self.take(4)?;
                u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
            }
            OP_1NEGATE => return Ok(Chunk::SmallInt(-1)),
            OP_1..=OP_16 => return Ok(Chunk::SmallInt((opcode - OP_1 + 1) as i8)),
            other => {
                return Err(Error::malformed_state(format!(
                    "opcode 0x{:02x} at offset {} is not a push",
                    other,
                    self.pos - 1
                )))
            }
        };
        Ok(Chunk::Data(self.take(len)?.to_vec()))
    }

    /// Read chunks until the region is exhausted
    pub fn read_all(mut self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        while !self.is_at_end() {
            chunks.push(self.next_chunk()?);
        }
        Ok(chunks)
    }
}
