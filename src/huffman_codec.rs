use std::io::{Read, Write};

use crate::bit_io::BitWriter;
use crate::block::{write_block, BlockId, BLOCK_HEADER_LEN};
use crate::decoder;
use crate::error::{CodecError, Result};
use crate::hufftree::{EncodeTable, HuffmanTree};

/// Byte counts of one encoded container.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeStats {
    pub input_bytes: usize,
    pub shape_bytes: usize,
    pub leaves_bytes: usize,
    pub data_bytes: usize,
}

impl EncodeStats {
    /// Sum of the three payloads.
    pub fn total(&self) -> usize {
        self.shape_bytes + self.leaves_bytes + self.data_bytes
    }

    /// Everything written to the sink, block headers included.
    pub fn container_bytes(&self) -> usize {
        self.total() + 3 * BLOCK_HEADER_LEN
    }
}

pub struct HuffmanCodec {
    tree: HuffmanTree,
    encode_table: EncodeTable,
}

impl HuffmanCodec {
    pub fn new(tree: HuffmanTree) -> Result<Self> {
        let encode_table = tree.generate_table()?;
        log::trace!("derived {} codewords", encode_table.len());
        Ok(HuffmanCodec {
            tree,
            encode_table,
        })
    }

    pub fn from_data(data: &[u8]) -> Result<Self> {
        Self::new(HuffmanTree::from_bytes(data))
    }

    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }

    pub fn encode_table(&self) -> &EncodeTable {
        &self.encode_table
    }

    /// Reads all of `source` and writes a SHAPE, LEAVES, DATA container to `sink`.
    pub fn encode<R: Read, W: Write>(source: R, sink: W) -> Result<()> {
        Self::encode_with_stats(source, sink).map(|_| ())
    }

    pub fn encode_with_stats<R: Read, W: Write>(mut source: R, mut sink: W) -> Result<EncodeStats> {
        // both passes need every byte, so the input is buffered up front
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;

        let codec = HuffmanCodec::from_data(&data)?;
        let stats = codec.write_container(&data, &mut sink)?;
        sink.flush()?;
        Ok(stats)
    }

    /// Reads a container from `source` and writes the original bytes to `sink`.
    pub fn decode<R: Read, W: Write>(source: R, sink: W) -> Result<()> {
        decoder::decode(source, sink)
    }

    /// Writes the three blocks for `data`, which must only hold bytes this tree covers.
    pub fn write_container<W: Write>(&self, data: &[u8], sink: &mut W) -> Result<EncodeStats> {
        let shape = self.tree.shape_bytes()?;
        write_block(sink, BlockId::Shape, &shape)?;

        let leaves = self.tree.leaf_bytes();
        write_block(sink, BlockId::Leaves, &leaves)?;

        let body = self.encode_body(data)?;
        write_block(sink, BlockId::Data, &body)?;

        let stats = EncodeStats {
            input_bytes: data.len(),
            shape_bytes: shape.len(),
            leaves_bytes: leaves.len(),
            data_bytes: body.len(),
        };
        log::debug!(
            "encoded {} bytes ({} symbols) into {} container bytes",
            stats.input_bytes,
            self.encode_table.len(),
            stats.container_bytes()
        );
        Ok(stats)
    }

    /// DATA payload: the padding bit count, then the packed codewords.
    fn encode_body(&self, data: &[u8]) -> Result<Vec<u8>> {
        // byte 0 is reserved for the padding count
        let mut writer = BitWriter::new(vec![0u8]);
        for &byte in data {
            let code = self
                .encode_table
                .get(&byte)
                .ok_or(CodecError::SymbolNotInTable(byte))?;
            writer.write_slice(code)?;
        }

        let padding = writer.count_padding_bits();
        writer.write_padding_bits()?;

        let mut body = writer.into_inner();
        body[0] = padding;
        Ok(body)
    }
}
