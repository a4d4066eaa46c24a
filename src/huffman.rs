use std::collections::HashMap;
use std::io::Read;

use bitvec::prelude::*;
use log::{debug, trace, warn};

use crate::bitstream::{BitRead, BitWrite};
use crate::error::{Error, Result};
use crate::frequency::{FrequencyTable, Symbol};
use crate::priority_queue::PriorityQueue;

/// Bit string assigned to one symbol, first bit first.
pub type Code = BitVec<u8, Msb0>;
pub type EncodingMap = HashMap<Symbol, Code>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodingNode {
    Leaf {
        symbol: Symbol,
        count: u64,
    },
    Internal {
        count: u64,
        zero: Box<CodingNode>,
        one: Box<CodingNode>,
    },
}

impl CodingNode {
    pub fn count(&self) -> u64 {
        match self {
            CodingNode::Leaf { count, .. } => *count,
            CodingNode::Internal { count, .. } => *count,
        }
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            CodingNode::Leaf { symbol, .. } => Some(*symbol),
            CodingNode::Internal { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, CodingNode::Leaf { .. })
    }

    fn merge(zero: CodingNode, one: CodingNode) -> Self {
        CodingNode::Internal {
            count: zero.count().saturating_add(one.count()),
            zero: Box::new(zero),
            one: Box::new(one),
        }
    }
}

/// Builds the coding tree, or `None` for an empty table.
///
/// Symbols enter the queue in key order. The two lowest counts are merged
/// under a new node (first extracted on the zero branch) until one node is
/// left. Equal counts are extracted in the order they were queued.
pub fn build_coding_tree(frequencies: &FrequencyTable) -> Option<CodingNode> {
    debug!(
        "Building coding tree from {} unique symbols",
        frequencies.len()
    );

    let mut queue = PriorityQueue::new();
    for (symbol, count) in frequencies.iter() {
        queue.insert(CodingNode::Leaf { symbol, count }, count);
    }

    while queue.len() > 1 {
        let (Some(zero), Some(one)) = (queue.extract_min(), queue.extract_min()) else {
            break;
        };
        let merged = CodingNode::merge(zero, one);
        let count = merged.count();
        queue.insert(merged, count);
    }

    let root = queue.extract_min();
    debug!("Tree construction complete.");
    root
}

/// Walks the tree zero branch first, appending `0` or `1` per step, and
/// records the path to every leaf.
///
/// A tree that is a single leaf maps its symbol to the empty code.
pub fn build_encoding_map(root: &CodingNode) -> EncodingMap {
    if root.is_leaf() {
        warn!("Coding tree has a single leaf; its symbol gets an empty code");
    }

    let mut map = EncodingMap::new();
    let mut stack = vec![(root, Code::new())];
    while let Some((node, path)) = stack.pop() {
        match node {
            CodingNode::Leaf { symbol, .. } => {
                trace!("Assigning code to {} : '{}'", symbol, code_string(&path));
                map.insert(*symbol, path);
            }
            CodingNode::Internal { zero, one, .. } => {
                let mut one_path = path.clone();
                one_path.push(true);
                let mut zero_path = path;
                zero_path.push(false);
                stack.push((&**one, one_path));
                stack.push((&**zero, zero_path));
            }
        }
    }
    map
}

/// Writes the code of every byte from `input`, then the end-of-stream code.
/// Returns the number of bits written.
pub fn encode<R, B>(input: R, encoding_map: &EncodingMap, output: &mut B) -> Result<usize>
where
    R: Read,
    B: BitWrite + ?Sized,
{
    let mut bit_count = 0;
    for byte in input.bytes() {
        bit_count += write_code(Symbol::Byte(byte?), encoding_map, output)?;
    }
    bit_count += write_code(Symbol::EndOfStream, encoding_map, output)?;
    debug!("Encoded payload: {} bits", bit_count);
    Ok(bit_count)
}

fn write_code<B: BitWrite + ?Sized>(
    symbol: Symbol,
    encoding_map: &EncodingMap,
    output: &mut B,
) -> Result<usize> {
    let code = encoding_map
        .get(&symbol)
        .ok_or(Error::UnknownSymbol(symbol))?;
    for bit in code.iter().by_vals() {
        output.write_bit(bit)?;
    }
    Ok(code.len())
}

/// Walks `tree` bit by bit: `0` takes the zero branch, `1` the one branch.
/// Each leaf reached emits its byte and restarts at the root.
///
/// Stops at the end-of-stream leaf. If the bits run out first, whatever was
/// decoded so far is returned.
pub fn decode<B: BitRead + ?Sized>(input: &mut B, tree: &CodingNode) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    if let CodingNode::Leaf { symbol, count } = tree {
        // Nothing was encoded for a lone symbol; its count says how many there were.
        if let Symbol::Byte(byte) = symbol {
            let run = usize::try_from(*count)
                .ok()
                .filter(|&run| out.try_reserve_exact(run).is_ok())
                .ok_or_else(|| Error::Header(format!("run of {count} bytes is too long")))?;
            out.resize(run, *byte);
        }
        return Ok(out);
    }

    let mut cursor = tree;
    while let Some(bit) = input.read_bit()? {
        if let CodingNode::Internal { zero, one, .. } = cursor {
            cursor = if bit { &**one } else { &**zero };
        }
        if let CodingNode::Leaf { symbol, .. } = cursor {
            match symbol {
                Symbol::EndOfStream => {
                    debug!("Final decoded data size: {} bytes.", out.len());
                    return Ok(out);
                }
                Symbol::Byte(byte) => out.push(*byte),
            }
            cursor = tree;
        }
    }

    warn!(
        "Bitstream ended before the end-of-stream code; returning {} decoded bytes",
        out.len()
    );
    Ok(out)
}

/// Renders bits as a string of `0` and `1`.
pub fn code_string(bits: &BitSlice<u8, Msb0>) -> String {
    bits.iter()
        .by_vals()
        .map(|bit| if bit { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitCursor;

    fn table(entries: &[(Symbol, u64)]) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for &(symbol, count) in entries {
            table.put(symbol, count);
        }
        table
    }

    fn codes(map: &EncodingMap) -> Vec<(Symbol, String)> {
        let mut codes: Vec<_> = map
            .iter()
            .map(|(&symbol, code)| (symbol, code_string(code)))
            .collect();
        codes.sort();
        codes
    }

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let frequencies = FrequencyTable::from_bytes(data);
        let tree = build_coding_tree(&frequencies).unwrap();
        let map = build_encoding_map(&tree);
        let mut bits = Code::new();
        let bit_count = encode(data, &map, &mut bits).unwrap();
        assert_eq!(bit_count, bits.len());
        decode(&mut BitCursor::new(&bits), &tree).unwrap()
    }

    #[test]
    fn repeated_symbol_gets_one_bit_code() {
        let frequencies = FrequencyTable::from_bytes(b"aaa");
        let tree = build_coding_tree(&frequencies).unwrap();
        assert_eq!(tree.count(), 4);

        let map = build_encoding_map(&tree);
        assert_eq!(
            codes(&map),
            [
                (Symbol::Byte(b'a'), "1".to_string()),
                (Symbol::EndOfStream, "0".to_string())
            ]
        );

        let mut bits = Code::new();
        assert_eq!(encode(&b"aaa"[..], &map, &mut bits).unwrap(), 4);
        assert_eq!(code_string(&bits), "1110");
        assert_eq!(decode(&mut BitCursor::new(&bits), &tree).unwrap(), b"aaa");
    }

    #[test]
    fn equal_counts_merge_in_queue_order() {
        let a = Symbol::Byte(b'a');
        let b = Symbol::Byte(b'b');
        let c = Symbol::Byte(b'c');
        let tree = build_coding_tree(&table(&[(a, 1), (b, 1), (c, 2)])).unwrap();

        // a and b merge first; c was queued before the merged node so it
        // comes out first and takes the zero branch.
        let expected = CodingNode::Internal {
            count: 4,
            zero: Box::new(CodingNode::Leaf { symbol: c, count: 2 }),
            one: Box::new(CodingNode::Internal {
                count: 2,
                zero: Box::new(CodingNode::Leaf { symbol: a, count: 1 }),
                one: Box::new(CodingNode::Leaf { symbol: b, count: 1 }),
            }),
        };
        assert_eq!(tree, expected);
        assert_eq!(
            codes(&build_encoding_map(&tree)),
            [(a, "10".to_string()), (b, "11".to_string()), (c, "0".to_string())]
        );
    }

    #[test]
    fn merged_node_queued_first_wins_ties() {
        let a = Symbol::Byte(b'a');
        let b = Symbol::Byte(b'b');
        let c = Symbol::Byte(b'c');
        let d = Symbol::Byte(b'd');
        // a+b (2) is queued after c (2); then c+ab (4) lands after d (4).
        let tree = build_coding_tree(&table(&[(a, 1), (b, 1), (c, 2), (d, 4)])).unwrap();
        let CodingNode::Internal { zero, one, .. } = &tree else {
            panic!("expected an internal root");
        };
        assert_eq!(zero.symbol(), Some(d));
        assert_eq!(one.count(), 4);
        assert!(!one.is_leaf());
    }

    #[test]
    fn codes_are_prefix_free() {
        let data = b"abracadabra, said the magician";
        let tree = build_coding_tree(&FrequencyTable::from_bytes(data)).unwrap();
        let map = build_encoding_map(&tree);
        let all: Vec<&Code> = map.values().collect();
        for (i, x) in all.iter().enumerate() {
            for (j, y) in all.iter().enumerate() {
                if i != j {
                    assert!(!y.starts_with(x.as_bitslice()), "{x} is a prefix of {y}");
                }
            }
        }
    }

    #[test]
    fn round_trips() {
        let inputs: [&[u8]; 6] = [
            b"",
            b"a",
            b"ab",
            b"abracadabra",
            b"\x00\xff\x00\xff\x80",
            b"mississippi river",
        ];
        for data in inputs {
            assert_eq!(round_trip(data), data);
        }
        let every_byte: Vec<u8> = (0..=255).collect();
        assert_eq!(round_trip(&every_byte), every_byte);
    }

    #[test]
    fn empty_input_is_a_lone_end_of_stream_leaf() {
        let tree = build_coding_tree(&FrequencyTable::from_bytes(b"")).unwrap();
        assert_eq!(tree.symbol(), Some(Symbol::EndOfStream));

        let map = build_encoding_map(&tree);
        assert!(map[&Symbol::EndOfStream].is_empty());

        let mut bits = Code::new();
        assert_eq!(encode(&b""[..], &map, &mut bits).unwrap(), 0);
        let trailing = bitvec![u8, Msb0; 1, 0, 1];
        assert!(decode(&mut BitCursor::new(&trailing), &tree).unwrap().is_empty());
    }

    #[test]
    fn lone_byte_leaf_decodes_from_its_count() {
        let x = Symbol::Byte(b'x');
        let tree = build_coding_tree(&table(&[(x, 3)])).unwrap();
        let map = build_encoding_map(&tree);
        assert!(map[&x].is_empty());
        assert_eq!(decode(&mut BitCursor::new(&Code::new()), &tree).unwrap(), b"xxx");
    }

    #[test]
    fn impossible_lone_byte_run_is_an_error() {
        let tree = CodingNode::Leaf {
            symbol: Symbol::Byte(b'x'),
            count: u64::MAX,
        };
        assert!(matches!(
            decode(&mut BitCursor::new(&Code::new()), &tree),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn saturated_counts_still_build_a_tree() {
        let a = Symbol::Byte(b'a');
        let b = Symbol::Byte(b'b');
        let tree = build_coding_tree(&table(&[
            (a, u64::MAX),
            (b, 1),
            (Symbol::EndOfStream, 1),
        ]))
        .unwrap();
        assert_eq!(tree.count(), u64::MAX);

        let map = build_encoding_map(&tree);
        let mut bits = Code::new();
        encode(&b"ab"[..], &map, &mut bits).unwrap();
        assert_eq!(decode(&mut BitCursor::new(&bits), &tree).unwrap(), b"ab");
    }

    #[test]
    fn empty_table_has_no_tree() {
        assert_eq!(build_coding_tree(&FrequencyTable::new()), None);
    }

    #[test]
    fn truncated_bits_keep_decoded_prefix() {
        let data = b"abcabcabc";
        let tree = build_coding_tree(&FrequencyTable::from_bytes(data)).unwrap();
        let map = build_encoding_map(&tree);
        let mut bits = Code::new();
        encode(&data[..], &map, &mut bits).unwrap();

        let eof_len = map[&Symbol::EndOfStream].len();
        let c_len = map[&Symbol::Byte(b'c')].len();
        bits.truncate(bits.len() - eof_len - c_len);
        assert_eq!(
            decode(&mut BitCursor::new(&bits), &tree).unwrap(),
            b"abcabcab"
        );
    }

    #[test]
    fn unmapped_symbol_is_an_error() {
        let tree = build_coding_tree(&FrequencyTable::from_bytes(b"ab")).unwrap();
        let map = build_encoding_map(&tree);
        let mut bits = Code::new();
        assert!(matches!(
            encode(&b"abz"[..], &map, &mut bits),
            Err(Error::UnknownSymbol(Symbol::Byte(b'z')))
        ));
    }
}
