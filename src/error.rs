use std::io;

use thiserror::Error;

use crate::block::BlockId;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("input ended while more data was required")]
    Truncated,

    #[error("unexpected block id {found} (expected {})", describe_expected(.expected))]
    UnexpectedBlockId { found: u8, expected: Option<BlockId> },

    #[error("tree shape is malformed: {0}")]
    MalformedShape(&'static str),

    #[error("tree shape has {leaves} leaves but the leaves block holds {symbols} symbols")]
    LeafCountMismatch { leaves: usize, symbols: usize },

    #[error("invalid padding bit count {padding} for a data block of {payload_len} bytes")]
    InvalidPadding { padding: u8, payload_len: usize },

    #[error("data block holds codeword bits but the tree has no internal nodes")]
    UnexpectedLeafRoot,

    #[error("byte {0:#04x} has no codeword in this tree")]
    SymbolNotInTable(u8),

    #[error("codeword for byte {symbol:#04x} is longer than 64 bits")]
    CodewordTooLong { symbol: u8 },

    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
}

fn describe_expected(expected: &Option<BlockId>) -> String {
    match *expected {
        Some(id) => format!("{} ({})", id as u8, id),
        None => "end of container".to_string(),
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        // a short read anywhere inside the container means it was cut off
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
