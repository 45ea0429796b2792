use std::fmt;

pub const MAX_BITS: usize = 64;

/// Returned when an append would push a [`BitSlice`] past 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSliceOverflow {
    pub requested: usize,
}

/// Up to 64 bits packed MSB-first into a `u64`.
///
/// The most recently appended bit always sits at the least significant end,
/// so `bits` read as a number is the codeword itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitSlice {
    length: usize,
    bits: u64,
}

impl BitSlice {
    pub fn new() -> Self {
        BitSlice { length: 0, bits: 0 }
    }

    /// Builds a slice from the low `length` bits of `bits`.
    pub fn from_bits(length: usize, bits: u64) -> Result<Self, BitSliceOverflow> {
        if length > MAX_BITS {
            return Err(BitSliceOverflow { requested: length });
        }
        Ok(BitSlice { length, bits: bits & mask(length) })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Bits still available before the slice is full.
    pub fn remaining(&self) -> usize {
        MAX_BITS - self.length
    }

    pub fn append_bit(&mut self, bit: bool) -> Result<(), BitSliceOverflow> {
        if self.length == MAX_BITS {
            return Err(BitSliceOverflow { requested: MAX_BITS + 1 });
        }
        self.bits = (self.bits << 1) | bit as u64;
        self.length += 1;
        Ok(())
    }

    pub fn append_slice(&mut self, rhs: &BitSlice) -> Result<(), BitSliceOverflow> {
        let new_length = self.length + rhs.length;
        if new_length > MAX_BITS {
            return Err(BitSliceOverflow { requested: new_length });
        }
        self.bits = shl(self.bits, rhs.length) | rhs.bits;
        self.length = new_length;
        Ok(())
    }

    /// Returns a copy extended by one bit, for building child codewords.
    pub fn with_bit(&self, bit: bool) -> Result<Self, BitSliceOverflow> {
        let mut next = *self;
        next.append_bit(bit)?;
        Ok(next)
    }

    /// Number of zero bits `append_padding` would add.
    pub fn padding_len(&self) -> usize {
        (8 - self.length % 8) % 8
    }

    /// Appends zero bits at the least significant end up to a byte boundary.
    pub fn append_padding(&mut self) {
        let padding = self.padding_len();
        // length % 8 != 0 whenever padding > 0, so this never exceeds 64
        self.bits = shl(self.bits, padding);
        self.length += padding;
    }

    /// Removes and returns the leading `count` bits as a new slice.
    pub fn split_leading(&mut self, count: usize) -> BitSlice {
        let count = count.min(self.length);
        let rest = self.length - count;
        let head = BitSlice { length: count, bits: shr(self.bits, rest) & mask(count) };
        self.bits &= mask(rest);
        self.length = rest;
        head
    }

    /// Pops every complete leading byte, leaving 0-7 residual bits.
    pub fn pop_leading_bytes(&mut self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.length / 8);
        while self.length >= 8 {
            bytes.push((self.bits >> (self.length - 8)) as u8);
            self.length -= 8;
        }
        self.bits &= mask(self.length);
        bytes
    }

    /// Iterates the bits from most to least significant.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.length).rev().map(move |i| (self.bits >> i) & 1 == 1)
    }
}

impl fmt::Display for BitSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

fn mask(length: usize) -> u64 {
    if length >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

// plain `<<`/`>>` overflow on a shift of 64
fn shl(value: u64, by: usize) -> u64 {
    if by >= MAX_BITS { 0 } else { value << by }
}

fn shr(value: u64, by: usize) -> u64 {
    if by >= MAX_BITS { 0 } else { value >> by }
}
