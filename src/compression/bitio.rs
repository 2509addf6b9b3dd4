#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    bits: u8,
    order: BitOrder,
    stuffing: bool,
}

impl BitWriter {
    pub fn new(order: BitOrder) -> Self {
        Self {
            bytes: Vec::new(),
            acc: 0,
            bits: 0,
            order,
            stuffing: false,
        }
    }

    pub fn jpeg() -> Self {
        Self {
            stuffing: true,
            ..Self::new(BitOrder::MsbFirst)
        }
    }

    pub fn order(&self) -> BitOrder {
        self.order
    }

    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 16);
        if count == 0 {
            return;
        }
        let value = value & ((1u32 << count) - 1);

        match self.order {
            BitOrder::MsbFirst => {
                self.acc = (self.acc << count) | value;
                self.bits += count;
                while self.bits >= 8 {
                    self.bits -= 8;
                    let byte = (self.acc >> self.bits) as u8;
                    self.push_byte(byte);
                }
                self.acc &= (1u32 << self.bits) - 1;
            }
            BitOrder::LsbFirst => {
                self.acc |= value << self.bits;
                self.bits += count;
                while self.bits >= 8 {
                    let byte = self.acc as u8;
                    self.push_byte(byte);
                    self.acc >>= 8;
                    self.bits -= 8;
                }
            }
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1);
    }

    fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
        if self.stuffing && byte == 0xFF {
            self.bytes.push(0x00);
        }
    }

    // MSB-first streams pad with one-bits, LSB-first with zeros.
    pub fn flush(&mut self) {
        if self.bits == 0 {
            return;
        }
        let pad = 8 - self.bits;
        let fill = match self.order {
            BitOrder::MsbFirst => (1u32 << pad) - 1,
            BitOrder::LsbFirst => 0,
        };
        self.write_bits(fill, pad);
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes.len()
    }

    pub fn pending_bits(&self) -> u8 {
        self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }
}

pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    bits: u8,
    order: BitOrder,
    stuffing: bool,
    marker: Option<u8>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], order: BitOrder) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            bits: 0,
            order,
            stuffing: false,
            marker: None,
        }
    }

    pub fn jpeg(data: &'a [u8]) -> Self {
        Self {
            stuffing: true,
            ..Self::new(data, BitOrder::MsbFirst)
        }
    }

    fn marker_at(&self, pos: usize) -> Option<u8> {
        if !self.stuffing || self.data.get(pos) != Some(&0xFF) {
            return None;
        }
        match self.data.get(pos + 1) {
            Some(&0x00) | None => None,
            Some(&m) => Some(m),
        }
    }

    fn fetch_byte(&mut self) -> Option<u8> {
        if self.marker.is_some() || self.pos >= self.data.len() {
            return None;
        }
        if let Some(m) = self.marker_at(self.pos) {
            self.marker = Some(m);
            return None;
        }

        let byte = self.data[self.pos];
        self.pos += 1;
        if self.stuffing && byte == 0xFF && self.data.get(self.pos) == Some(&0x00) {
            self.pos += 1;
        }
        Some(byte)
    }

    pub fn read_bits(&mut self, count: u8) -> Option<u16> {
        debug_assert!(count <= 16);
        if count == 0 {
            return Some(0);
        }

        while self.bits < count {
            let byte = self.fetch_byte()? as u32;
            match self.order {
                BitOrder::MsbFirst => self.acc = (self.acc << 8) | byte,
                BitOrder::LsbFirst => self.acc |= byte << self.bits,
            }
            self.bits += 8;
        }

        let mask = (1u32 << count) - 1;
        let value = match self.order {
            BitOrder::MsbFirst => {
                self.bits -= count;
                let v = (self.acc >> self.bits) & mask;
                self.acc &= (1u32 << self.bits) - 1;
                v
            }
            BitOrder::LsbFirst => {
                let v = self.acc & mask;
                self.acc >>= count;
                self.bits -= count;
                v
            }
        };
        Some(value as u16)
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        self.read_bits(1).map(|b| b != 0)
    }

    pub fn eos(&self) -> bool {
        self.bits == 0
            && (self.marker.is_some()
                || self.pos >= self.data.len()
                || self.marker_at(self.pos).is_some())
    }

    pub fn buffered_bits(&self) -> u8 {
        self.bits
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn marker(&self) -> Option<u8> {
        self.marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_mixed_widths() {
        let mut writer = BitWriter::new(BitOrder::MsbFirst);
        writer.write_bits(0b101, 3);
        writer.write_bits(0x1234, 16);
        writer.write_bit(true);
        writer.write_bits(0x7F, 7);
        let data = writer.finish();

        let mut reader = BitReader::new(&data, BitOrder::MsbFirst);
        assert_eq!(reader.read_bits(3), Some(0b101));
        assert_eq!(reader.read_bits(16), Some(0x1234));
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bits(7), Some(0x7F));
    }

    #[test]
    fn test_msb_layout_and_padding() {
        let mut writer = BitWriter::new(BitOrder::MsbFirst);
        writer.write_bits(0b10, 2);
        let data = writer.finish();
        assert_eq!(data, vec![0b1011_1111]);
    }

    #[test]
    fn test_lsb_layout() {
        // GIF packs the first 9-bit code into the low bits of the first byte.
        let mut writer = BitWriter::new(BitOrder::LsbFirst);
        writer.write_bits(0x100, 9);
        writer.write_bits(0x41, 9);
        let data = writer.finish();
        assert_eq!(data, vec![0x00, 0x83, 0x00]);

        let mut reader = BitReader::new(&data, BitOrder::LsbFirst);
        assert_eq!(reader.read_bits(9), Some(0x100));
        assert_eq!(reader.read_bits(9), Some(0x41));
    }

    #[test]
    fn test_stuffing_roundtrip() {
        let mut writer = BitWriter::jpeg();
        writer.write_bits(0xFF, 8);
        writer.write_bits(0x12, 8);
        writer.write_bits(0xFFFF, 16);
        let data = writer.finish();
        assert_eq!(data, vec![0xFF, 0x00, 0x12, 0xFF, 0x00, 0xFF, 0x00]);

        let mut reader = BitReader::jpeg(&data);
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.read_bits(8), Some(0x12));
        assert_eq!(reader.read_bits(16), Some(0xFFFF));
        assert!(reader.eos());
    }

    #[test]
    fn test_marker_terminates_scan() {
        let data = [0xAB, 0xFF, 0xD9];
        let mut reader = BitReader::jpeg(&data);
        assert_eq!(reader.read_bits(8), Some(0xAB));
        assert!(reader.eos());
        assert_eq!(reader.read_bits(1), None);
        assert_eq!(reader.marker(), Some(0xD9));
    }

    #[test]
    fn test_exhaustion() {
        let data = [0x01];
        let mut reader = BitReader::new(&data, BitOrder::LsbFirst);
        assert!(!reader.eos());
        assert_eq!(reader.read_bits(4), Some(1));
        assert_eq!(reader.read_bits(8), None);
    }
}
