use crate::compression::bitio::BitReader;
use crate::error::{CodecError, CodecResult};

// Valid codes are at most 16 bits; a longer walk means a corrupt node graph.
pub const MAX_WALK_STEPS: usize = 256;

pub const DC_LUMINANCE_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub const DC_CHROMINANCE_COUNTS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
pub const DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub const AC_LUMINANCE_COUNTS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7d];
pub const AC_LUMINANCE_SYMBOLS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, 0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

pub const AC_CHROMINANCE_COUNTS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
pub const AC_CHROMINANCE_SYMBOLS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
pub struct HuffmanNode {
    pub parent: Option<usize>,
    pub zero: Option<usize>,
    pub one: Option<usize>,
    pub symbol: Option<u8>,
}

impl HuffmanNode {
    fn is_leaf(&self) -> bool {
        self.symbol.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedUnit {
    pub length: u8,
    pub bits: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    leaves: [Option<usize>; 256],
    counts: [u8; 16],
    symbols: Vec<u8>,
}

impl HuffmanTree {
    pub fn from_counts(counts: &[u8; 16], symbols: &[u8]) -> CodecResult<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != symbols.len() {
            return Err(CodecError::InvalidHuffmanTable(format!(
                "{} symbols declared, {} supplied",
                total,
                symbols.len()
            )));
        }
        if total > 256 {
            return Err(CodecError::InvalidHuffmanTable(format!(
                "{} symbols exceed the 8-bit alphabet",
                total
            )));
        }

        let mut nodes = vec![HuffmanNode::default()];
        let mut leaves = [None; 256];
        let mut frontier = vec![ROOT];
        let mut next_symbol = 0usize;

        for (level, &count) in counts.iter().enumerate() {
            let count = count as usize;
            let remaining: usize = counts[level + 1..].iter().map(|&c| c as usize).sum();
            let slots = frontier.len() * 2;
            if count > slots {
                return Err(CodecError::InvalidHuffmanTable(format!(
                    "{} codes of length {} but only {} slots",
                    count,
                    level + 1,
                    slots
                )));
            }

            let mut next_frontier = Vec::new();
            for slot in 0..slots {
                if slot >= count && next_frontier.len() >= remaining {
                    break;
                }
                let parent = frontier[slot / 2];
                let index = nodes.len();
                let mut node = HuffmanNode {
                    parent: Some(parent),
                    ..HuffmanNode::default()
                };

                if slot < count {
                    let symbol = symbols[next_symbol];
                    next_symbol += 1;
                    if leaves[symbol as usize].is_some() {
                        return Err(CodecError::InvalidHuffmanTable(format!(
                            "duplicate symbol {:#04x}",
                            symbol
                        )));
                    }
                    node.symbol = Some(symbol);
                    leaves[symbol as usize] = Some(index);
                } else {
                    next_frontier.push(index);
                }

                nodes.push(node);
                if slot % 2 == 0 {
                    nodes[parent].zero = Some(index);
                } else {
                    nodes[parent].one = Some(index);
                }
            }
            frontier = next_frontier;
        }

        log::debug!(
            "built Huffman tree: {} symbols, {} nodes",
            symbols.len(),
            nodes.len()
        );

        Ok(Self {
            nodes,
            leaves,
            counts: *counts,
            symbols: symbols.to_vec(),
        })
    }

    pub fn dc_luminance() -> Self {
        Self::standard(&DC_LUMINANCE_COUNTS, &DC_SYMBOLS)
    }

    pub fn dc_chrominance() -> Self {
        Self::standard(&DC_CHROMINANCE_COUNTS, &DC_SYMBOLS)
    }

    pub fn ac_luminance() -> Self {
        Self::standard(&AC_LUMINANCE_COUNTS, &AC_LUMINANCE_SYMBOLS)
    }

    pub fn ac_chrominance() -> Self {
        Self::standard(&AC_CHROMINANCE_COUNTS, &AC_CHROMINANCE_SYMBOLS)
    }

    fn standard(counts: &[u8; 16], symbols: &[u8]) -> Self {
        match Self::from_counts(counts, symbols) {
            Ok(tree) => tree,
            Err(e) => unreachable!("Annex K table rejected: {}", e),
        }
    }

    pub fn from_frequencies(frequencies: &[u32; 256]) -> CodecResult<Self> {
        const RESERVED: usize = 256;
        let mut freq = [0u64; 257];
        for (f, &count) in freq.iter_mut().zip(frequencies.iter()) {
            *f = count as u64;
        }
        freq[RESERVED] = 1;
        if freq[..RESERVED].iter().all(|&f| f == 0) {
            return Err(CodecError::InvalidHuffmanTable(
                "no symbols to build a table from".into(),
            ));
        }

        let mut code_size = [0usize; 257];
        let mut others: [Option<usize>; 257] = [None; 257];
        loop {
            // least frequency first, larger index on ties
            let mut v1: Option<usize> = None;
            let mut v2: Option<usize> = None;
            for i in 0..257 {
                if freq[i] == 0 {
                    continue;
                }
                if v1.map_or(true, |v| freq[i] <= freq[v]) {
                    v2 = v1;
                    v1 = Some(i);
                } else if v2.map_or(true, |v| freq[i] <= freq[v]) {
                    v2 = Some(i);
                }
            }
            let (Some(v1), Some(v2)) = (v1, v2) else {
                break;
            };

            freq[v1] += freq[v2];
            freq[v2] = 0;

            let mut node = v1;
            code_size[node] += 1;
            while let Some(next) = others[node] {
                node = next;
                code_size[node] += 1;
            }
            others[node] = Some(v2);

            let mut node = v2;
            code_size[node] += 1;
            while let Some(next) = others[node] {
                node = next;
                code_size[node] += 1;
            }
        }

        let mut bits = [0usize; 258];
        for &size in code_size.iter().filter(|&&s| s > 0) {
            bits[size] += 1;
        }
        for i in (17..bits.len()).rev() {
            while bits[i] > 0 {
                let mut j = i - 2;
                while bits[j] == 0 {
                    j -= 1;
                }
                bits[i] -= 2;
                bits[i - 1] += 1;
                bits[j + 1] += 2;
                bits[j] -= 1;
            }
        }
        let mut longest = 16;
        while bits[longest] == 0 {
            longest -= 1;
        }
        bits[longest] -= 1;

        let mut ordered: Vec<(usize, u8)> = code_size[..RESERVED]
            .iter()
            .enumerate()
            .filter(|(_, &size)| size > 0)
            .map(|(symbol, &size)| (size, symbol as u8))
            .collect();
        ordered.sort_unstable();

        let mut counts = [0u8; 16];
        for (count, &b) in counts.iter_mut().zip(bits[1..=16].iter()) {
            *count = b as u8;
        }
        let symbols: Vec<u8> = ordered.into_iter().map(|(_, symbol)| symbol).collect();
        Self::from_counts(&counts, &symbols)
    }

    pub fn from_dht(data: &[u8]) -> CodecResult<(u8, Self, usize)> {
        if data.len() < 17 {
            return Err(CodecError::InvalidHuffmanTable(
                "DHT payload shorter than 17 bytes".into(),
            ));
        }
        let tag = data[0];
        let mut counts = [0u8; 16];
        counts.copy_from_slice(&data[1..17]);
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if data.len() < 17 + total {
            return Err(CodecError::InvalidHuffmanTable(format!(
                "DHT declares {} symbols, {} bytes available",
                total,
                data.len() - 17
            )));
        }
        let tree = Self::from_counts(&counts, &data[17..17 + total])?;
        Ok((tag, tree, 17 + total))
    }

    pub fn serialize(&self, tag: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(17 + self.symbols.len());
        out.push(tag);
        out.extend_from_slice(&self.counts);
        out.extend_from_slice(&self.symbols);
        out
    }

    pub fn counts(&self) -> &[u8; 16] {
        &self.counts
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.leaves[symbol as usize].is_some()
    }

    pub fn encode(&self, symbol: u8) -> CodecResult<EncodedUnit> {
        let leaf = self.leaves[symbol as usize].ok_or(CodecError::UnknownSymbol(symbol))?;

        let mut bits = 0u32;
        let mut length = 0usize;
        let mut node = leaf;
        while let Some(parent) = self.nodes[node].parent {
            if length >= MAX_WALK_STEPS {
                return Err(CodecError::TreeWalkLimit(MAX_WALK_STEPS));
            }
            if self.nodes[parent].one == Some(node) {
                bits |= 1 << length.min(31);
            }
            length += 1;
            node = parent;
        }

        if node != ROOT || length == 0 || length > 16 {
            return Err(CodecError::InvalidHuffmanTable(format!(
                "symbol {:#04x} resolves to a {}-bit code",
                symbol, length
            )));
        }

        Ok(EncodedUnit {
            length: length as u8,
            bits: bits as u16,
        })
    }

    pub fn cursor(&self) -> HuffmanCursor<'_> {
        HuffmanCursor {
            tree: self,
            position: None,
            steps: 0,
        }
    }

    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> CodecResult<Option<u8>> {
        let mut cursor = self.cursor();
        loop {
            let Some(bit) = reader.read_bit() else {
                return Ok(None);
            };
            if cursor.decode(bit)? {
                return cursor.get_decode().map(Some);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_nodes(nodes: Vec<HuffmanNode>) -> Self {
        let mut leaves = [None; 256];
        for (index, node) in nodes.iter().enumerate() {
            if let Some(symbol) = node.symbol {
                leaves[symbol as usize] = Some(index);
            }
        }
        Self {
            nodes,
            leaves,
            counts: [0; 16],
            symbols: Vec::new(),
        }
    }
}

pub struct HuffmanCursor<'t> {
    tree: &'t HuffmanTree,
    position: Option<usize>,
    steps: usize,
}

impl<'t> HuffmanCursor<'t> {
    pub fn decode(&mut self, bit: bool) -> CodecResult<bool> {
        let current = self.position.unwrap_or(ROOT);
        self.steps += 1;
        if self.steps > MAX_WALK_STEPS {
            self.reset();
            return Err(CodecError::TreeWalkLimit(MAX_WALK_STEPS));
        }

        let node = &self.tree.nodes[current];
        let next = if bit { node.one } else { node.zero };
        match next {
            Some(index) if index < self.tree.nodes.len() => {
                self.position = Some(index);
                Ok(self.tree.nodes[index].is_leaf())
            }
            _ => {
                self.reset();
                Err(CodecError::InvalidCode(format!(
                    "no {} branch below node {}",
                    bit as u8, current
                )))
            }
        }
    }

    pub fn get_decode(&mut self) -> CodecResult<u8> {
        let symbol = self
            .position
            .and_then(|index| self.tree.nodes[index].symbol)
            .ok_or_else(|| CodecError::InvalidCode("cursor is not on a leaf".into()));
        self.reset();
        symbol
    }

    pub fn reset(&mut self) {
        self.position = None;
        self.steps = 0;
    }
}
