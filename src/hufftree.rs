use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use crate::bit_io::{BitReader, BitWriter};
use crate::bit_slice::BitSlice;
use crate::error::{CodecError, Result};
use crate::min_heap::MinHeap;

/// byte -> codeword, left = 0 and right = 1
pub type EncodeTable = BTreeMap<u8, BitSlice>;

/// A byte alphabet never needs more leaves than this.
pub const MAX_LEAVES: usize = 256;
/// Deepest leaf a 256-leaf tree can have.
pub const MAX_SHAPE_DEPTH: usize = MAX_LEAVES - 1;

/// Counts every byte value that occurs at least once.
pub fn byte_frequencies(bytes: &[u8]) -> BTreeMap<u8, usize> {
    let mut counts = [0usize; 256];
    for &byte in bytes {
        counts[byte as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(byte, &count)| (byte as u8, count))
        .collect()
}

#[derive(Debug, Clone)]
pub struct HuffmanTree {
    root: HuffNode,
}

impl HuffmanTree {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        HuffmanTree::from_frequencies(&byte_frequencies(bytes))
    }

    /// Greedy Huffman construction.
    ///
    /// Ties between equal weights go to the node created first: leaves are
    /// created in ascending byte order, merged nodes after them in merge
    /// order. The first node out of the heap becomes the left child.
    pub fn from_frequencies(frequencies: &BTreeMap<u8, usize>) -> Self {
        let mut nodes: Vec<Pending> = frequencies
            .iter()
            .filter(|(_, &count)| count > 0)
            .enumerate()
            .map(|(order, (&byte, &count))| Pending {
                node: HuffNode::new(byte, count),
                order,
            })
            .collect();

        let root = match nodes.len() {
            // nothing to encode; the root is never walked
            0 => HuffNode::new(0, 0),
            1 => {
                let real = nodes.remove(0).node;
                let synthetic = HuffNode::new(real.first_symbol().wrapping_add(1), 0);
                HuffNode::merge(real, synthetic)
            }
            _ => {
                let mut next_order = nodes.len();
                let mut heap = MinHeap::build(nodes);
                while heap.heap_size() > 1 {
                    if let (Some(x), Some(y)) = (heap.extract_min(), heap.extract_min()) {
                        heap.insert(Pending {
                            node: HuffNode::merge(x.node, y.node),
                            order: next_order,
                        });
                        next_order += 1;
                    }
                }
                heap.extract_min()
                    .map_or_else(|| HuffNode::new(0, 0), |pending| pending.node)
            }
        };

        HuffmanTree { root }
    }

    pub fn root(&self) -> &HuffNode {
        &self.root
    }

    pub fn weight(&self) -> usize {
        self.root.weight()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn generate_table(&self) -> Result<EncodeTable> {
        let mut table = BTreeMap::new();
        self.root.generate_table(&mut table, BitSlice::new())?;
        Ok(table)
    }

    /// Preorder shape bits: `1` for an internal node, `0` for a leaf.
    pub fn write_shape<W: Write>(&self, writer: &mut BitWriter<W>) -> io::Result<()> {
        self.root.write_shape(writer)
    }

    /// The SHAPE block payload, zero-padded to a whole byte.
    pub fn shape_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = BitWriter::new(Vec::new());
        self.write_shape(&mut writer)?;
        writer.write_padding_bits()?;
        Ok(writer.into_inner())
    }

    /// The LEAVES block payload: one symbol per leaf, preorder.
    pub fn leaf_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.leaf_count());
        self.root.collect_leaves(&mut bytes);
        bytes
    }

    /// Rebuilds an unlabelled tree from a SHAPE payload. Trailing padding is left unread.
    pub fn from_shape(payload: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(payload);
        let mut leaves = 0;
        let root = read_shape(&mut reader, 0, &mut leaves)?;
        Ok(HuffmanTree { root })
    }

    /// Labels the leaves, in preorder, with the LEAVES payload.
    pub fn assign_leaves(&mut self, symbols: &[u8]) -> Result<()> {
        let leaves = self.leaf_count();
        if leaves != symbols.len() {
            return Err(CodecError::LeafCountMismatch { leaves, symbols: symbols.len() });
        }
        self.root.assign_leaves(&mut symbols.iter());
        Ok(())
    }
}

impl fmt::Display for HuffmanTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Huffman Tree Structure:")?;
        fmt_node(f, &self.root, 0, "root")
    }
}

fn fmt_node(f: &mut fmt::Formatter<'_>, node: &HuffNode, depth: usize, label: &str) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        HuffNode::Leaf { byte, weight } => {
            writeln!(f, "{}{}-> Leaf: {:#04x} [weight: {}]", indent, label, byte, weight)
        }
        HuffNode::Internal { weight, left, right } => {
            writeln!(f, "{}{}-> Internal [weight: {}]", indent, label, weight)?;
            fmt_node(f, left, depth + 1, "L")?;
            fmt_node(f, right, depth + 1, "R")
        }
    }
}

fn read_shape<R: Read>(reader: &mut BitReader<R>, depth: usize, leaves: &mut usize) -> Result<HuffNode> {
    if depth > MAX_SHAPE_DEPTH {
        return Err(CodecError::MalformedShape("tree is deeper than 255 levels"));
    }

    if reader.read_bit()? {
        let left = read_shape(reader, depth + 1, leaves)?;
        let right = read_shape(reader, depth + 1, leaves)?;
        return Ok(HuffNode::merge(left, right));
    }

    *leaves += 1;
    if *leaves > MAX_LEAVES {
        return Err(CodecError::MalformedShape("tree has more than 256 leaves"));
    }
    Ok(HuffNode::new(0, 0))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffNode {
    Leaf {
        weight: usize,
        byte: u8,
    },
    Internal {
        weight: usize,
        left: Box<HuffNode>,
        right: Box<HuffNode>,
    },
}

impl HuffNode {
    pub fn new(b: u8, f: usize) -> Self {
        HuffNode::Leaf {
            weight: f,
            byte: b,
        }
    }

    pub fn weight(&self) -> usize {
        match self {
            HuffNode::Leaf { weight, .. } => *weight,
            HuffNode::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HuffNode::Leaf { .. })
    }

    pub fn merge(a: Self, b: Self) -> Self {
        let weight = a.weight() + b.weight();
        HuffNode::Internal {
            weight,
            left: Box::new(a),
            right: Box::new(b),
        }
    }

    /// Symbol of the leftmost leaf under this node.
    pub fn first_symbol(&self) -> u8 {
        match self {
            HuffNode::Leaf { byte, .. } => *byte,
            HuffNode::Internal { left, .. } => left.first_symbol(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            HuffNode::Leaf { .. } => 1,
            HuffNode::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            HuffNode::Leaf { .. } => 0,
            HuffNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn generate_table(&self, code_table: &mut EncodeTable, code: BitSlice) -> Result<()> {
        match self {
            HuffNode::Leaf { byte, .. } => {
                code_table.insert(*byte, code);
            }
            HuffNode::Internal { left, right, .. } => {
                let left_code = code
                    .with_bit(false)
                    .map_err(|_| CodecError::CodewordTooLong { symbol: left.first_symbol() })?;
                let right_code = code
                    .with_bit(true)
                    .map_err(|_| CodecError::CodewordTooLong { symbol: right.first_symbol() })?;
                left.generate_table(code_table, left_code)?;
                right.generate_table(code_table, right_code)?;
            }
        }
        Ok(())
    }

    fn write_shape<W: Write>(&self, writer: &mut BitWriter<W>) -> io::Result<()> {
        match self {
            HuffNode::Leaf { .. } => writer.write_bit(false),
            HuffNode::Internal { left, right, .. } => {
                writer.write_bit(true)?;
                left.write_shape(writer)?;
                right.write_shape(writer)
            }
        }
    }

    fn collect_leaves(&self, bytes: &mut Vec<u8>) {
        match self {
            HuffNode::Leaf { byte, .. } => bytes.push(*byte),
            HuffNode::Internal { left, right, .. } => {
                left.collect_leaves(bytes);
                right.collect_leaves(bytes);
            }
        }
    }

    fn assign_leaves(&mut self, symbols: &mut std::slice::Iter<'_, u8>) {
        match self {
            HuffNode::Leaf { byte, .. } => {
                if let Some(&symbol) = symbols.next() {
                    *byte = symbol;
                }
            }
            HuffNode::Internal { left, right, .. } => {
                left.assign_leaves(symbols);
                right.assign_leaves(symbols);
            }
        }
    }
}

/// A heap entry during construction, ordered by weight then creation order.
struct Pending {
    node: HuffNode,
    order: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node
            .weight()
            .cmp(&other.node.weight())
            .then(self.order.cmp(&other.order))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn leaf(byte: u8) -> HuffNode {
        HuffNode::new(byte, 1)
    }

    fn internal(left: HuffNode, right: HuffNode) -> HuffNode {
        HuffNode::merge(left, right)
    }

    fn code(table: &EncodeTable, byte: u8) -> String {
        table[&byte].to_string()
    }

    #[test]
    fn test_frequencies() {
        let counts = byte_frequencies(b"abracadabra");
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[&b'a'], 5);
        assert_eq!(counts[&b'b'], 2);
        assert_eq!(counts[&b'c'], 1);
        assert!(byte_frequencies(&[]).is_empty());
    }

    #[test]
    fn test_single_symbol_tree() {
        let tree = HuffmanTree::from_bytes(&[0u8; 100]);
        match tree.root() {
            HuffNode::Internal { weight, left, right } => {
                assert_eq!(*weight, 100);
                assert_eq!(**left, HuffNode::new(0, 100));
                assert_eq!(right.weight(), 0);
                assert!(right.is_leaf());
                assert_ne!(right.first_symbol(), 0);
            }
            other => panic!("expected an internal root, got {:?}", other),
        }

        let table = tree.generate_table().unwrap();
        assert_eq!(code(&table, 0), "0");
    }

    #[test]
    fn test_single_symbol_0xff_synthetic_wraps() {
        let tree = HuffmanTree::from_bytes(&[0xff; 3]);
        assert_eq!(tree.leaf_bytes(), vec![0xff, 0x00]);
    }

    #[test]
    fn test_empty_tree() {
        let tree = HuffmanTree::from_bytes(&[]);
        assert!(tree.root().is_leaf());
        assert_eq!(tree.weight(), 0);
        assert_eq!(tree.shape_bytes().unwrap(), vec![0x00]);
        assert_eq!(tree.leaf_bytes().len(), 1);
    }

    #[test]
    fn test_tree_weights() {
        let tree = HuffmanTree::from_bytes(&[0x1, 0x1, 0x2, 0x3]);
        match tree.root() {
            HuffNode::Internal { weight, left, right } => {
                assert_eq!(*weight, 4);
                assert_eq!(left.weight(), 2);
                assert_eq!(right.weight(), 2);
            }
            other => panic!("expected an internal root, got {:?}", other),
        }
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        // all weights equal: 'a' and 'b' merge first, then 'c' and 'd'
        let tree = HuffmanTree::from_bytes(b"abcd");
        assert_eq!(tree.leaf_bytes(), b"abcd".to_vec());
        assert_eq!(tree.shape_bytes().unwrap(), vec![0b1100_1000]);

        let again = HuffmanTree::from_bytes(b"dcba");
        assert_eq!(again.leaf_bytes(), tree.leaf_bytes());
    }

    #[test]
    fn test_optimal_code_lengths() {
        // 1, 1, 2, 4, 8: a fully skewed tree
        let mut data = Vec::new();
        for (byte, count) in [(b'a', 1), (b'b', 1), (b'c', 2), (b'd', 4), (b'e', 8)] {
            data.extend(std::iter::repeat(byte).take(count));
        }
        let tree = HuffmanTree::from_bytes(&data);
        let table = tree.generate_table().unwrap();

        assert_eq!(table[&b'e'].len(), 1);
        assert_eq!(table[&b'd'].len(), 2);
        assert_eq!(table[&b'c'].len(), 3);
        assert_eq!(table[&b'a'].len(), 4);
        assert_eq!(table[&b'b'].len(), 4);
        assert_eq!(tree.depth(), 4);
    }

    #[test]
    fn test_table_five_leaves() {
        let root = internal(
            internal(internal(leaf(0), leaf(1)), internal(leaf(2), leaf(3))),
            leaf(4),
        );
        let tree = HuffmanTree { root };
        let table = tree.generate_table().unwrap();

        assert_eq!(code(&table, 0), "000");
        assert_eq!(code(&table, 1), "001");
        assert_eq!(code(&table, 2), "010");
        assert_eq!(code(&table, 3), "011");
        assert_eq!(code(&table, 4), "1");
    }

    #[test]
    fn test_table_is_prefix_free() {
        let tree = HuffmanTree::from_bytes(b"the quick brown fox jumps over the lazy dog");
        let table = tree.generate_table().unwrap();
        let codes: Vec<String> = table.values().map(|c| c.to_string()).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()), "{} is a prefix of {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_shape_two_leaves() {
        let tree = HuffmanTree { root: internal(leaf(7), leaf(9)) };
        assert_eq!(tree.shape_bytes().unwrap(), vec![0x80]);

        let decoded = HuffmanTree::from_shape(&[0x80]).unwrap();
        match decoded.root() {
            HuffNode::Internal { left, right, .. } => {
                assert!(left.is_leaf());
                assert!(right.is_leaf());
            }
            other => panic!("expected an internal root, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_and_leaves_rebuild_tree() {
        let original = HuffmanTree::from_bytes(b"mississippi river");
        let shape = original.shape_bytes().unwrap();
        let leaves = original.leaf_bytes();

        let mut rebuilt = HuffmanTree::from_shape(&shape).unwrap();
        rebuilt.assign_leaves(&leaves).unwrap();

        assert_eq!(rebuilt.leaf_bytes(), leaves);
        assert_eq!(rebuilt.generate_table().unwrap(), original.generate_table().unwrap());
    }

    #[test]
    fn test_truncated_shape() {
        // eight nested internal nodes and then nothing
        let err = HuffmanTree::from_shape(&[0xff]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated));
    }

    #[test]
    fn test_shape_too_deep() {
        let err = HuffmanTree::from_shape(&[0xff; 40]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedShape(_)));
    }

    fn balanced(levels: usize) -> HuffNode {
        if levels == 0 {
            return leaf(0);
        }
        internal(balanced(levels - 1), balanced(levels - 1))
    }

    #[test]
    fn test_shape_too_many_leaves() {
        // 512 leaves, only 9 levels deep
        let tree = HuffmanTree { root: balanced(9) };
        let shape = tree.shape_bytes().unwrap();
        let err = HuffmanTree::from_shape(&shape).unwrap_err();
        assert!(matches!(err, CodecError::MalformedShape("tree has more than 256 leaves")));

        let tree = HuffmanTree { root: balanced(8) };
        let shape = tree.shape_bytes().unwrap();
        assert_eq!(HuffmanTree::from_shape(&shape).unwrap().leaf_count(), 256);
    }

    #[test]
    fn test_codeword_too_long() {
        // leaves 1 and 0 sit at depth 65
        let mut root = leaf(0);
        for symbol in 1..=65u8 {
            root = internal(leaf(symbol), root);
        }
        let tree = HuffmanTree { root };
        assert_eq!(tree.depth(), 65);

        let err = tree.generate_table().unwrap_err();
        assert!(matches!(err, CodecError::CodewordTooLong { symbol: 1 }));
    }

    #[test]
    fn test_codeword_of_64_bits() {
        let mut root = leaf(0);
        for symbol in 1..=64u8 {
            root = internal(leaf(symbol), root);
        }
        let table = HuffmanTree { root }.generate_table().unwrap();
        // 0 is right all the way down, 1 ends on a left turn
        assert_eq!(table[&0].len(), 64);
        assert_eq!(table[&0].bits(), u64::MAX);
        assert_eq!(table[&1].len(), 64);
        assert_eq!(table[&1].bits(), u64::MAX - 1);
    }

    #[test]
    fn test_leaf_count_mismatch() {
        let mut tree = HuffmanTree::from_shape(&[0x80]).unwrap();
        let err = tree.assign_leaves(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CodecError::LeafCountMismatch { leaves: 2, symbols: 3 }));
    }

    #[test]
    fn test_display() {
        let tree = HuffmanTree { root: internal(leaf(b'a'), leaf(b'b')) };
        let dump = tree.to_string();
        assert!(dump.contains("root-> Internal [weight: 2]"));
        assert!(dump.contains("  L-> Leaf: 0x61 [weight: 1]"));
        assert!(dump.contains("  R-> Leaf: 0x62 [weight: 1]"));
    }
}
