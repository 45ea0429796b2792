use std::io::{self, Read, Write};

use crate::bit_slice::BitSlice;

/// Reads single bits, MSB-first, one buffered byte at a time.
pub struct BitReader<R> {
    inner: R,
    current: u8,
    bits_left: u8,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            inner,
            current: 0,
            bits_left: 0,
        }
    }

    /// Fails with `UnexpectedEof` when a fresh byte is needed and the source is empty.
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.bits_left == 0 {
            let mut buf = [0u8; 1];
            self.inner.read_exact(&mut buf)?;
            self.current = buf[0];
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        let bit = self.current & 0x80 == 0x80;
        self.current <<= 1;
        Ok(bit)
    }

    /// Bits left unread in the current byte.
    pub fn count_unflushed_bits(&self) -> usize {
        self.bits_left as usize
    }

    /// Drops the rest of the current byte so the next read starts on a fresh one.
    pub fn flush_bits(&mut self) {
        self.bits_left = 0;
    }
}

/// Accumulates bits and writes every complete byte to the sink straight away.
pub struct BitWriter<W: Write> {
    inner: W,
    pending: BitSlice,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            pending: BitSlice::new(),
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        // at most 7 bits are ever pending between calls
        if self.pending.append_bit(bit).is_err() {
            unreachable!("bit writer holds less than a byte between writes");
        }
        self.flush_bytes()
    }

    /// Writes a codeword. Slices wider than the free accumulator space are split.
    pub fn write_slice(&mut self, slice: &BitSlice) -> io::Result<()> {
        let mut rest = *slice;
        while !rest.is_empty() {
            let take = rest.len().min(self.pending.remaining());
            let head = rest.split_leading(take);
            if self.pending.append_slice(&head).is_err() {
                unreachable!("chunk sized to the free accumulator space");
            }
            self.flush_bytes()?;
        }
        Ok(())
    }

    /// Zero bits `write_padding_bits` would add to reach a byte boundary.
    pub fn count_padding_bits(&self) -> u8 {
        self.pending.padding_len() as u8
    }

    pub fn pending_bits(&self) -> usize {
        self.pending.len()
    }

    /// Pads with zeros and writes out everything that is pending.
    pub fn write_padding_bits(&mut self) -> io::Result<()> {
        self.pending.append_padding();
        self.flush_bytes()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn flush_bytes(&mut self) -> io::Result<()> {
        let bytes = self.pending.pop_leading_bytes();
        if !bytes.is_empty() {
            self.inner.write_all(&bytes)?;
        }
        Ok(())
    }
}
