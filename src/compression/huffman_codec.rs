use crate::compression::bitio::{BitOrder, BitReader, BitWriter};
use crate::compression::dct::DataUnit;
use crate::compression::huffman::HuffmanTree;
use crate::error::{CodecError, CodecResult};

pub const EOB: u8 = 0x00;
pub const ZRL: u8 = 0xF0;

pub struct HuffmanEncoder<'t> {
    tree: &'t HuffmanTree,
    writer: BitWriter,
    symbols: usize,
}

impl<'t> HuffmanEncoder<'t> {
    pub fn new(tree: &'t HuffmanTree) -> Self {
        Self {
            tree,
            writer: BitWriter::new(BitOrder::MsbFirst),
            symbols: 0,
        }
    }

    pub fn next(&mut self, symbol: u8) -> CodecResult<()> {
        let unit = self.tree.encode(symbol)?;
        self.writer.write_bits(unit.bits as u32, unit.length);
        self.symbols += 1;
        Ok(())
    }

    pub fn symbols_written(&self) -> usize {
        self.symbols
    }

    pub fn signal_end_of_stream(self) -> Vec<u8> {
        self.writer.finish()
    }
}

pub fn huffman_encode(tree: &HuffmanTree, data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = HuffmanEncoder::new(tree);
    for &symbol in data {
        encoder.next(symbol)?;
    }
    Ok(encoder.signal_end_of_stream())
}

pub struct HuffmanDecoder<'t, 'a> {
    tree: &'t HuffmanTree,
    reader: BitReader<'a>,
    expected: Option<usize>,
    decoded: usize,
    fault: Option<CodecError>,
}

impl<'t, 'a> HuffmanDecoder<'t, 'a> {
    pub fn new(tree: &'t HuffmanTree, data: &'a [u8]) -> Self {
        Self {
            tree,
            reader: BitReader::new(data, BitOrder::MsbFirst),
            expected: None,
            decoded: 0,
            fault: None,
        }
    }

    pub fn with_expected_len(mut self, expected: usize) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn has_next(&self) -> bool {
        self.fault.is_none()
            && !self.reader.eos()
            && self.expected.map_or(true, |n| self.decoded < n)
    }

    pub fn fault(&self) -> Option<&CodecError> {
        self.fault.as_ref()
    }

    pub fn was_decode_clean(&self) -> bool {
        self.fault.is_none() && self.expected.map_or(true, |n| self.decoded == n)
    }
}

impl Iterator for HuffmanDecoder<'_, '_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if !self.has_next() {
            return None;
        }
        match self.tree.decode_symbol(&mut self.reader) {
            Ok(Some(symbol)) => {
                self.decoded += 1;
                Some(symbol)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Huffman stream corrupt after {} symbols: {}", self.decoded, e);
                self.fault = Some(e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoefficientBits {
    pub zero_run: u8,
    pub category: u8,
    pub negative: bool,
    pub magnitude: u16,
}

impl CoefficientBits {
    pub fn symbol(&self, is_dc: bool) -> u8 {
        if is_dc {
            self.category
        } else {
            (self.zero_run << 4) | self.category
        }
    }
}

pub fn category_of(value: i16) -> u8 {
    let abs = value.max(-i16::MAX).unsigned_abs();
    (16 - abs.leading_zeros()) as u8
}

pub fn encode_coefficient(value: i16) -> CoefficientBits {
    let value = value.max(-i16::MAX);
    let category = category_of(value);
    if category == 0 {
        return CoefficientBits::default();
    }

    let abs = value.unsigned_abs();
    let mask = (1u16 << (category - 1)) - 1;
    let negative = value < 0;
    let magnitude = if negative { !abs & mask } else { abs & mask };

    CoefficientBits {
        zero_run: 0,
        category,
        negative,
        magnitude,
    }
}

pub fn decode_coefficient(bits: &CoefficientBits) -> i16 {
    let category = bits.category.min(15);
    if category == 0 {
        return 0;
    }
    if bits.negative {
        let full = (1u32 << category) - 1;
        -(((bits.magnitude as u32) ^ full) as i32) as i16
    } else {
        ((1u32 << (category - 1)) + bits.magnitude as u32) as i16
    }
}

fn write_raw(writer: &mut BitWriter, bits: &CoefficientBits) {
    if bits.category > 0 {
        writer.write_bit(!bits.negative);
    }
    if bits.category > 1 {
        writer.write_bits(bits.magnitude as u32, bits.category - 1);
    }
}

fn read_raw(reader: &mut BitReader<'_>, category: u8) -> CodecResult<i16> {
    if category == 0 {
        return Ok(0);
    }
    let positive = reader.read_bit().ok_or(CodecError::UnexpectedEndOfStream)?;
    let magnitude = if category > 1 {
        reader
            .read_bits(category - 1)
            .ok_or(CodecError::UnexpectedEndOfStream)?
    } else {
        0
    };
    Ok(decode_coefficient(&CoefficientBits {
        zero_run: 0,
        category,
        negative: !positive,
        magnitude,
    }))
}

fn write_symbol(writer: &mut BitWriter, tree: &HuffmanTree, symbol: u8) -> CodecResult<()> {
    let unit = tree.encode(symbol)?;
    writer.write_bits(unit.bits as u32, unit.length);
    Ok(())
}

fn dc_difference(current: i16, previous: i16) -> i16 {
    (current as i32 - previous as i32).clamp(-i16::MAX as i32, i16::MAX as i32) as i16
}

#[derive(Debug, Clone)]
pub struct SymbolStatistics {
    pub dc: [u32; 256],
    pub ac: [u32; 256],
    previous_dc: i16,
}

impl SymbolStatistics {
    pub fn new() -> Self {
        Self {
            dc: [0; 256],
            ac: [0; 256],
            previous_dc: 0,
        }
    }

    pub fn count_block(&mut self, block: &DataUnit) {
        let diff = dc_difference(block[0], self.previous_dc);
        self.previous_dc = block[0];
        self.dc[category_of(diff) as usize] += 1;

        let mut run = 0u8;
        for &coefficient in &block[1..] {
            if coefficient == 0 {
                run += 1;
                continue;
            }
            while run >= 16 {
                self.ac[ZRL as usize] += 1;
                run -= 16;
            }
            self.ac[((run << 4) | category_of(coefficient)) as usize] += 1;
            run = 0;
        }
        if run > 0 {
            self.ac[EOB as usize] += 1;
        }
    }

    pub fn reset_prediction(&mut self) {
        self.previous_dc = 0;
    }

    pub fn merge(&mut self, other: &SymbolStatistics) {
        for (a, b) in self.dc.iter_mut().zip(other.dc.iter()) {
            *a += b;
        }
        for (a, b) in self.ac.iter_mut().zip(other.ac.iter()) {
            *a += b;
        }
    }
}

impl Default for SymbolStatistics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct JpegCoefficientEncoder<'t> {
    dc_table: &'t HuffmanTree,
    ac_table: &'t HuffmanTree,
    zero_run: u8,
    previous_dc: i16,
}

impl<'t> JpegCoefficientEncoder<'t> {
    pub fn new(dc_table: &'t HuffmanTree, ac_table: &'t HuffmanTree) -> Self {
        Self {
            dc_table,
            ac_table,
            zero_run: 0,
            previous_dc: 0,
        }
    }

    // AC zeros are only counted here and go out with the next non-zero
    // coefficient, or as EOB from `end_block`.
    pub fn next(&mut self, writer: &mut BitWriter, coefficient: i16, is_dc: bool) -> CodecResult<()> {
        if is_dc {
            self.zero_run = 0;
            let bits = encode_coefficient(coefficient);
            write_symbol(writer, self.dc_table, bits.symbol(true))?;
            write_raw(writer, &bits);
            return Ok(());
        }

        if coefficient == 0 {
            self.zero_run = self.zero_run.saturating_add(1);
            return Ok(());
        }

        while self.zero_run >= 16 {
            write_symbol(writer, self.ac_table, ZRL)?;
            self.zero_run -= 16;
        }
        let mut bits = encode_coefficient(coefficient);
        bits.zero_run = self.zero_run;
        write_symbol(writer, self.ac_table, bits.symbol(false))?;
        write_raw(writer, &bits);
        self.zero_run = 0;
        Ok(())
    }

    pub fn end_block(&mut self, writer: &mut BitWriter) -> CodecResult<()> {
        if self.zero_run > 0 {
            write_symbol(writer, self.ac_table, EOB)?;
        }
        self.zero_run = 0;
        Ok(())
    }

    pub fn encode_block(&mut self, writer: &mut BitWriter, block: &DataUnit) -> CodecResult<()> {
        let diff = dc_difference(block[0], self.previous_dc);
        self.previous_dc = block[0];
        self.next(writer, diff, true)?;
        for &coefficient in &block[1..] {
            self.next(writer, coefficient, false)?;
        }
        self.end_block(writer)
    }

    pub fn reset_prediction(&mut self) {
        self.previous_dc = 0;
    }
}

pub struct JpegCoefficientDecoder<'t> {
    dc_table: &'t HuffmanTree,
    ac_table: &'t HuffmanTree,
    pending_zeros: u8,
    pending_value: Option<i16>,
    end_of_block: bool,
    position: usize,
    previous_dc: i16,
}

impl<'t> JpegCoefficientDecoder<'t> {
    pub fn new(dc_table: &'t HuffmanTree, ac_table: &'t HuffmanTree) -> Self {
        Self {
            dc_table,
            ac_table,
            pending_zeros: 0,
            pending_value: None,
            end_of_block: false,
            position: 0,
            previous_dc: 0,
        }
    }

    fn read_symbol(&self, reader: &mut BitReader<'_>, is_dc: bool) -> CodecResult<u8> {
        let tree = if is_dc { self.dc_table } else { self.ac_table };
        tree.decode_symbol(reader)?
            .ok_or(CodecError::UnexpectedEndOfStream)
    }

    pub fn next(&mut self, reader: &mut BitReader<'_>, is_dc: bool) -> CodecResult<i16> {
        if is_dc {
            self.pending_zeros = 0;
            self.pending_value = None;
            self.end_of_block = false;
            self.position = 0;
            let category = self.read_symbol(reader, true)?;
            if category > 15 {
                return Err(CodecError::InvalidCode(format!(
                    "DC category {} out of range",
                    category
                )));
            }
            return read_raw(reader, category);
        }

        self.position += 1;
        if self.position > 63 {
            return Err(CodecError::DecodingError(
                "more than 63 AC coefficients requested for one block".into(),
            ));
        }
        if self.pending_zeros > 0 {
            self.pending_zeros -= 1;
            return Ok(0);
        }
        if let Some(value) = self.pending_value.take() {
            return Ok(value);
        }
        if self.end_of_block {
            return Ok(0);
        }

        let symbol = self.read_symbol(reader, false)?;
        let run = symbol >> 4;
        let category = symbol & 0x0F;

        if category == 0 {
            return match run {
                0 => {
                    self.end_of_block = true;
                    Ok(0)
                }
                15 if self.position + 15 <= 63 => {
                    self.pending_zeros = 15;
                    Ok(0)
                }
                _ => Err(CodecError::InvalidCode(format!(
                    "AC symbol {:#04x} at position {}",
                    symbol, self.position
                ))),
            };
        }

        if self.position + run as usize > 63 {
            return Err(CodecError::InvalidCode(format!(
                "zero run of {} overruns block at position {}",
                run, self.position
            )));
        }
        let value = read_raw(reader, category)?;
        if run == 0 {
            return Ok(value);
        }
        self.pending_zeros = run - 1;
        self.pending_value = Some(value);
        Ok(0)
    }

    pub fn decode_block(&mut self, reader: &mut BitReader<'_>) -> CodecResult<DataUnit> {
        let mut block = [0i16; 64];
        let diff = self.next(reader, true)?;
        let dc = (self.previous_dc as i32 + diff as i32).clamp(i16::MIN as i32, i16::MAX as i32);
        self.previous_dc = dc as i16;
        block[0] = dc as i16;
        for coefficient in block.iter_mut().skip(1) {
            *coefficient = self.next(reader, false)?;
        }
        Ok(block)
    }

    pub fn reset_prediction(&mut self) {
        self.previous_dc = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vli_roundtrip() {
        for v in -2047i16..=2047 {
            let bits = encode_coefficient(v);
            if v == 0 {
                assert_eq!(bits.category, 0);
            }
            assert_eq!(decode_coefficient(&bits), v, "value {}", v);
        }
    }

    #[test]
    fn test_vli_extremes() {
        for v in [i16::MAX, -i16::MAX, 16384, -16384] {
            assert_eq!(decode_coefficient(&encode_coefficient(v)), v);
        }
        assert_eq!(category_of(i16::MIN), 15);
    }

    #[test]
    fn test_vli_matches_additional_bits() {
        // -5: category 3, sign 0, low bits "10" -> JPEG additional bits 010
        let bits = encode_coefficient(-5);
        assert_eq!((bits.category, bits.negative, bits.magnitude), (3, true, 0b10));
        let bits = encode_coefficient(5);
        assert_eq!((bits.category, bits.negative, bits.magnitude), (3, false, 0b01));
        assert_eq!(encode_coefficient(-1).magnitude, 0);
    }

    #[test]
    fn test_generic_roundtrip() {
        let tree = HuffmanTree::ac_luminance();
        let data: Vec<u8> = (0..2000u32)
            .map(|i| crate::compression::huffman::AC_LUMINANCE_SYMBOLS[(i * 7 % 162) as usize])
            .collect();
        let encoded = huffman_encode(&tree, &data).unwrap();

        let mut decoder = HuffmanDecoder::new(&tree, &encoded).with_expected_len(data.len());
        let decoded: Vec<u8> = decoder.by_ref().collect();
        assert_eq!(decoded, data);
        assert!(decoder.was_decode_clean());
    }

    #[test]
    fn test_generic_rejects_unknown_symbol() {
        let tree = HuffmanTree::dc_luminance();
        let mut encoder = HuffmanEncoder::new(&tree);
        assert!(encoder.next(3).is_ok());
        assert!(encoder.next(99).is_err());
        assert_eq!(encoder.symbols_written(), 1);
    }

    #[test]
    fn test_generic_truncated_stream_is_unclean() {
        let tree = HuffmanTree::dc_luminance();
        let encoded = huffman_encode(&tree, &[11, 11, 11, 11]).unwrap();
        let mut decoder = HuffmanDecoder::new(&tree, &encoded[..2]).with_expected_len(4);
        let decoded: Vec<u8> = decoder.by_ref().collect();
        assert!(decoded.len() < 4);
        assert!(!decoder.was_decode_clean());
    }

    fn roundtrip_blocks(blocks: &[DataUnit]) -> Vec<DataUnit> {
        let dc = HuffmanTree::dc_luminance();
        let ac = HuffmanTree::ac_luminance();
        let mut writer = BitWriter::jpeg();
        let mut encoder = JpegCoefficientEncoder::new(&dc, &ac);
        for block in blocks {
            encoder.encode_block(&mut writer, block).unwrap();
        }
        let data = writer.finish();

        let mut reader = BitReader::jpeg(&data);
        let mut decoder = JpegCoefficientDecoder::new(&dc, &ac);
        blocks
            .iter()
            .map(|_| decoder.decode_block(&mut reader).unwrap())
            .collect()
    }

    #[test]
    fn test_block_roundtrip() {
        let mut dense = [0i16; 64];
        for (i, c) in dense.iter_mut().enumerate() {
            *c = ((i as i16 * 37) % 61) - 30;
        }
        let mut sparse = [0i16; 64];
        sparse[0] = -400;
        sparse[1] = 3;
        sparse[20] = -1;
        sparse[63] = 7;
        let mut long_run = [0i16; 64];
        long_run[0] = 12;
        long_run[40] = 1023;
        let flat = [0i16; 64];

        let blocks = vec![dense, sparse, long_run, flat, sparse];
        assert_eq!(roundtrip_blocks(&blocks), blocks);
    }

    #[test]
    fn test_all_zero_block_is_dc_plus_eob() {
        let dc = HuffmanTree::dc_luminance();
        let ac = HuffmanTree::ac_luminance();
        let mut writer = BitWriter::new(BitOrder::MsbFirst);
        let mut encoder = JpegCoefficientEncoder::new(&dc, &ac);
        encoder.encode_block(&mut writer, &[0i16; 64]).unwrap();
        // DC category 0 = "00", EOB = "1010"
        assert_eq!(writer.pending_bits(), 6);
        assert_eq!(writer.finish(), vec![0b0010_1011]);
    }

    #[test]
    fn test_per_call_decode_expands_runs() {
        let dc = HuffmanTree::dc_luminance();
        let ac = HuffmanTree::ac_luminance();
        let mut block = [0i16; 64];
        block[0] = 5;
        block[18] = -2;
        let mut writer = BitWriter::jpeg();
        let mut encoder = JpegCoefficientEncoder::new(&dc, &ac);
        encoder.next(&mut writer, block[0], true).unwrap();
        for &c in &block[1..] {
            encoder.next(&mut writer, c, false).unwrap();
        }
        encoder.end_block(&mut writer).unwrap();
        let data = writer.finish();

        let mut reader = BitReader::jpeg(&data);
        let mut decoder = JpegCoefficientDecoder::new(&dc, &ac);
        assert_eq!(decoder.next(&mut reader, true).unwrap(), 5);
        for i in 1..64 {
            assert_eq!(decoder.next(&mut reader, false).unwrap(), block[i], "index {}", i);
        }
        assert!(decoder.next(&mut reader, false).is_err());
    }

    #[test]
    fn test_truncated_block_reports_eos() {
        let dc = HuffmanTree::dc_luminance();
        let ac = HuffmanTree::ac_luminance();
        let mut reader = BitReader::jpeg(&[]);
        let mut decoder = JpegCoefficientDecoder::new(&dc, &ac);
        assert!(matches!(
            decoder.decode_block(&mut reader),
            Err(CodecError::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_statistics_drive_optimal_tables() {
        let mut blocks = Vec::new();
        for i in 0..20i16 {
            let mut block = [0i16; 64];
            block[0] = i * 40 - 300;
            block[1] = i - 10;
            block[5] = 3;
            block[40] = -1;
            blocks.push(block);
        }

        let mut stats = SymbolStatistics::new();
        for block in &blocks {
            stats.count_block(block);
        }
        assert_eq!(stats.ac[EOB as usize], 20);
        assert_eq!(stats.ac[ZRL as usize], 40);
        assert_eq!(stats.dc.iter().sum::<u32>(), 20);

        let dc = HuffmanTree::from_frequencies(&stats.dc).unwrap();
        let ac = HuffmanTree::from_frequencies(&stats.ac).unwrap();
        let mut writer = BitWriter::jpeg();
        let mut encoder = JpegCoefficientEncoder::new(&dc, &ac);
        for block in &blocks {
            encoder.encode_block(&mut writer, block).unwrap();
        }
        let bytes = writer.finish();

        let mut reader = BitReader::jpeg(&bytes);
        let mut decoder = JpegCoefficientDecoder::new(&dc, &ac);
        for block in &blocks {
            assert_eq!(&decoder.decode_block(&mut reader).unwrap(), block);
        }
    }
}
