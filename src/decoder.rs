use std::io::{BufWriter, Read, Write};
use std::mem;

use crate::bit_io::BitReader;
use crate::block::{read_block, Block, BlockId};
use crate::error::{CodecError, Result};
use crate::hufftree::{HuffNode, HuffmanTree};

/// Which block the decoder needs next. The tree only exists once SHAPE has
/// been read, so LEAVES and DATA can never be applied to a missing tree.
enum Stage {
    AwaitShape,
    AwaitLeaves(HuffmanTree),
    AwaitData(HuffmanTree),
    Done,
}

impl Stage {
    fn expected(&self) -> Option<BlockId> {
        match self {
            Stage::AwaitShape => Some(BlockId::Shape),
            Stage::AwaitLeaves(_) => Some(BlockId::Leaves),
            Stage::AwaitData(_) => Some(BlockId::Data),
            Stage::Done => None,
        }
    }
}

struct DecodeState<W: Write> {
    stage: Stage,
    writer: W,
    emitted: usize,
}

pub fn decode<R: Read, W: Write>(mut reader: R, writer: W) -> Result<()> {
    let mut state = DecodeState {
        stage: Stage::AwaitShape,
        writer: BufWriter::new(writer),
        emitted: 0,
    };

    while let Some(block) = read_block(&mut reader)? {
        state.accept(block)?;
    }
    state.finish()
}

impl<W: Write> DecodeState<W> {
    fn accept(&mut self, block: Block) -> Result<()> {
        let expected = self.stage.expected();
        if BlockId::try_from(block.id).ok() != expected || expected.is_none() {
            return Err(CodecError::UnexpectedBlockId { found: block.id, expected });
        }

        self.stage = match mem::replace(&mut self.stage, Stage::Done) {
            Stage::AwaitShape => Stage::AwaitLeaves(HuffmanTree::from_shape(&block.payload)?),
            Stage::AwaitLeaves(mut tree) => {
                tree.assign_leaves(&block.payload)?;
                Stage::AwaitData(tree)
            }
            Stage::AwaitData(tree) => {
                self.decode_body(&tree, &block.payload)?;
                Stage::Done
            }
            Stage::Done => Stage::Done,
        };
        Ok(())
    }

    /// Walks the tree one bit at a time, emitting a symbol at every leaf.
    fn decode_body(&mut self, tree: &HuffmanTree, payload: &[u8]) -> Result<()> {
        let (&padding, body) = payload.split_first().ok_or(CodecError::Truncated)?;
        let body_bits = body.len() * 8;
        if padding > 7 || padding as usize > body_bits {
            return Err(CodecError::InvalidPadding { padding, payload_len: payload.len() });
        }

        let mut bits_left = body_bits - padding as usize;
        let root = tree.root();
        if bits_left > 0 && root.is_leaf() {
            return Err(CodecError::UnexpectedLeafRoot);
        }

        let mut reader = BitReader::new(body);
        let mut node = root;
        while bits_left != 0 {
            bits_left -= 1;
            let bit = reader.read_bit()?;

            node = match node {
                HuffNode::Internal { left, right, .. } => if bit { &**right } else { &**left },
                HuffNode::Leaf { .. } => return Err(CodecError::UnexpectedLeafRoot),
            };

            if let HuffNode::Leaf { byte, .. } = node {
                self.writer.write_all(&[*byte])?;
                self.emitted += 1;
                node = root;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        match self.stage {
            // nothing at all to decode
            Stage::AwaitShape | Stage::Done => {}
            Stage::AwaitLeaves(_) | Stage::AwaitData(_) => return Err(CodecError::Truncated),
        }
        self.writer.flush()?;
        log::debug!("decoded {} bytes", self.emitted);
        Ok(())
    }
}
