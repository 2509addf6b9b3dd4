//! Quantization and Huffman tables of one frame, addressed by destination
//! id as in DQT and DHT segments.

use crate::compression::huffman::{HuffmanTree, TableClass};
use crate::compression::quantizer::QuantizationTable;
use crate::error::{CodecError, CodecResult};

/// DQT and DHT payloads, ready to be wrapped in marker segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSegments {
    pub dqt: Vec<u8>,
    pub dht: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TableSet {
    quant: [Option<QuantizationTable>; 4],
    dc: [Option<HuffmanTree>; 4],
    ac: [Option<HuffmanTree>; 4],
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Luma tables at destination 0 and chroma tables at 1, using the
    /// Annex K Huffman tables and quantization scaled to `quality`.
    pub fn standard(quality: u8) -> Self {
        let mut set = Self::new();
        set.set_quant(QuantizationTable::for_quality(quality, false, 0));
        set.set_quant(QuantizationTable::for_quality(quality, true, 1));
        set.dc[0] = Some(HuffmanTree::dc_luminance());
        set.ac[0] = Some(HuffmanTree::ac_luminance());
        set.dc[1] = Some(HuffmanTree::dc_chrominance());
        set.ac[1] = Some(HuffmanTree::ac_chrominance());
        set
    }

    pub fn set_quant(&mut self, table: QuantizationTable) {
        let destination = table.destination() as usize;
        self.quant[destination] = Some(table);
    }

    pub fn quant(&self, destination: u8) -> CodecResult<&QuantizationTable> {
        self.quant
            .get(destination as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                CodecError::InvalidQuantTable(format!("no table at destination {}", destination))
            })
    }

    pub fn set_huffman(
        &mut self,
        class: TableClass,
        destination: u8,
        tree: HuffmanTree,
    ) -> CodecResult<()> {
        if destination > 3 {
            return Err(CodecError::InvalidHuffmanTable(format!(
                "destination {} out of range",
                destination
            )));
        }
        let slot = match class {
            TableClass::Dc => &mut self.dc[destination as usize],
            TableClass::Ac => &mut self.ac[destination as usize],
        };
        *slot = Some(tree);
        Ok(())
    }

    pub fn huffman(&self, class: TableClass, destination: u8) -> CodecResult<&HuffmanTree> {
        let tables = match class {
            TableClass::Dc => &self.dc,
            TableClass::Ac => &self.ac,
        };
        tables
            .get(destination as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                CodecError::InvalidHuffmanTable(format!(
                    "no {:?} table at destination {}",
                    class, destination
                ))
            })
    }

    /// Concatenated DQT and DHT payloads for every table present.
    pub fn to_segments(&self) -> TableSegments {
        let mut segments = TableSegments::default();
        for table in self.quant.iter().flatten() {
            segments.dqt.extend(table.serialize());
        }
        for (class, tables) in [(TableClass::Dc, &self.dc), (TableClass::Ac, &self.ac)] {
            for (destination, tree) in tables.iter().enumerate() {
                if let Some(tree) = tree {
                    let tag = ((class as u8) << 4) | destination as u8;
                    segments.dht.extend(tree.serialize(tag));
                }
            }
        }
        segments
    }

    /// Loads every table in a DQT payload; returns how many were read.
    pub fn add_dqt(&mut self, mut payload: &[u8]) -> CodecResult<usize> {
        let mut loaded = 0;
        while !payload.is_empty() {
            let (table, used) = QuantizationTable::from_dqt(payload)?;
            self.set_quant(table);
            payload = &payload[used..];
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Loads every table in a DHT payload; returns how many were read.
    pub fn add_dht(&mut self, mut payload: &[u8]) -> CodecResult<usize> {
        let mut loaded = 0;
        while !payload.is_empty() {
            let (tag, tree, used) = HuffmanTree::from_dht(payload)?;
            let class = match tag >> 4 {
                0 => TableClass::Dc,
                1 => TableClass::Ac,
                other => {
                    return Err(CodecError::InvalidHuffmanTable(format!(
                        "unknown table class {}",
                        other
                    )))
                }
            };
            self.set_huffman(class, tag & 0x0F, tree)?;
            payload = &payload[used..];
            loaded += 1;
        }
        log::debug!("loaded {} Huffman tables from DHT payload", loaded);
        Ok(loaded)
    }
}
