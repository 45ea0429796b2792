//! # dense
//!
//! A byte-oriented Huffman compressor. The whole input is read, a prefix-code
//! tree is built from its byte frequencies, and a three-block container
//! (tree shape, leaf symbols, coded data) is written to the sink.
//!
//! ## Quick Start
//!
//! ```rust
//! let text = b"abracadabra";
//!
//! let mut container: Vec<u8> = Vec::new();
//! dense::encode(&text[..], &mut container)?;
//!
//! let mut decoded: Vec<u8> = Vec::new();
//! dense::decode(container.as_slice(), &mut decoded)?;
//! assert_eq!(decoded, text);
//! # Ok::<(), dense::CodecError>(())
//! ```

pub mod bit_io;
pub mod bit_slice;
pub mod block;
pub mod error;
pub mod huffman_codec;
pub mod hufftree;

// Internal modules - not part of public API
mod decoder;
mod min_heap;

use std::io::{Read, Write};

// Re-export main types for convenience
pub use bit_io::{BitReader, BitWriter};
pub use bit_slice::BitSlice;
pub use error::CodecError;
pub use huffman_codec::{EncodeStats, HuffmanCodec};
pub use hufftree::{HuffNode, HuffmanTree};

/// Compresses everything `source` yields into a container on `sink`.
pub fn encode<R: Read, W: Write>(source: R, sink: W) -> Result<(), CodecError> {
    HuffmanCodec::encode(source, sink)
}

/// Restores the original bytes of a container read from `source`.
pub fn decode<R: Read, W: Write>(source: R, sink: W) -> Result<(), CodecError> {
    HuffmanCodec::decode(source, sink)
}
