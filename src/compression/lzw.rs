use crate::compression::bitio::{BitOrder, BitReader, BitWriter};
use crate::error::{CodecError, CodecResult};
use std::collections::HashMap;

pub const MAX_CODE: u16 = 4095;
pub const MAX_CODE_BITS: u8 = 12;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u8,
    parent: Option<u16>,
}

struct Dictionary {
    entries: Vec<Entry>,
    lookup: HashMap<(u16, u8), u16>,
    native_code_size: u8,
    hi_code: u16,
}

impl Dictionary {
    fn new(native_code_size: u8) -> Self {
        let literals = 1u16 << native_code_size;
        let mut entries = Vec::with_capacity(MAX_CODE as usize + 1);
        for value in 0..literals {
            entries.push(Entry {
                value: value as u8,
                parent: None,
            });
        }
        // clear and end occupy table slots but are never chained through
        entries.push(Entry {
            value: 0,
            parent: None,
        });
        entries.push(Entry {
            value: 0,
            parent: None,
        });

        Self {
            entries,
            lookup: HashMap::new(),
            native_code_size,
            hi_code: literals + 1,
        }
    }

    fn clear_code(&self) -> u16 {
        1 << self.native_code_size
    }

    fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    fn initial_bits(&self) -> u8 {
        self.native_code_size + 1
    }

    fn reset(&mut self) {
        self.entries.truncate(self.end_code() as usize + 1);
        self.lookup.clear();
        self.hi_code = self.end_code();
    }

    fn is_full(&self) -> bool {
        self.hi_code >= MAX_CODE
    }

    fn find(&self, parent: u16, value: u8) -> Option<u16> {
        self.lookup.get(&(parent, value)).copied()
    }

    fn add(&mut self, parent: u16, value: u8) -> u16 {
        self.hi_code += 1;
        self.entries.push(Entry {
            value,
            parent: Some(parent),
        });
        self.lookup.insert((parent, value), self.hi_code);
        self.hi_code
    }
}

pub struct LzwEncoder {
    dict: Dictionary,
    writer: BitWriter,
    bits: u8,
    end_of_string: Option<u16>,
    clear_policy: bool,
    clears: usize,
}

impl LzwEncoder {
    pub fn new(native_code_size: u8) -> CodecResult<Self> {
        if !(2..=8).contains(&native_code_size) {
            return Err(CodecError::InvalidCodeSize(native_code_size));
        }
        let dict = Dictionary::new(native_code_size);
        let mut encoder = Self {
            bits: dict.initial_bits(),
            dict,
            writer: BitWriter::new(BitOrder::LsbFirst),
            end_of_string: None,
            clear_policy: true,
            clears: 0,
        };
        encoder.emit(encoder.dict.clear_code());
        Ok(encoder)
    }

    // With the policy off a full dictionary stays in use read-only instead
    // of being reset with a clear code.
    pub fn with_clear_policy(mut self, enabled: bool) -> Self {
        self.clear_policy = enabled;
        self
    }

    fn emit(&mut self, code: u16) {
        self.writer.write_bits(code as u32, self.bits);
    }

    pub fn next(&mut self, byte: u8) -> CodecResult<()> {
        if byte as u16 >= self.dict.clear_code() {
            return Err(CodecError::EncodingError(format!(
                "byte {} outside the {}-bit alphabet",
                byte, self.dict.native_code_size
            )));
        }

        let Some(prefix) = self.end_of_string else {
            self.end_of_string = Some(byte as u16);
            return Ok(());
        };

        if let Some(code) = self.dict.find(prefix, byte) {
            self.end_of_string = Some(code);
            return Ok(());
        }

        self.emit(prefix);
        if !self.dict.is_full() {
            let code = self.dict.add(prefix, byte);
            // the next emitted code may be `code` itself
            if code == 1 << self.bits && self.bits < MAX_CODE_BITS {
                self.bits += 1;
            }
        } else if self.clear_policy {
            self.emit(self.dict.clear_code());
            self.dict.reset();
            self.bits = self.dict.initial_bits();
            self.clears += 1;
            log::trace!("LZW dictionary full, clear code emitted");
        }
        self.end_of_string = Some(byte as u16);
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> CodecResult<()> {
        for &byte in data {
            self.next(byte)?;
        }
        Ok(())
    }

    pub fn clears_emitted(&self) -> usize {
        self.clears
    }

    pub fn bytes_written(&self) -> usize {
        self.writer.bytes_written()
    }

    pub fn signal_end_of_stream(mut self) -> Vec<u8> {
        if let Some(code) = self.end_of_string.take() {
            self.emit(code);
        }
        self.emit(self.dict.end_code());
        self.writer.finish()
    }
}

pub fn lzw_encode(data: &[u8], native_code_size: u8) -> CodecResult<Vec<u8>> {
    let mut encoder = LzwEncoder::new(native_code_size)?;
    encoder.write_all(data)?;
    Ok(encoder.signal_end_of_stream())
}

pub struct LzwDecoder<'a> {
    dict: Dictionary,
    reader: BitReader<'a>,
    bits: u8,
    previous: Option<u16>,
    stack: Vec<u8>,
    clean: bool,
    finished: bool,
    fault: Option<CodecError>,
    clears: usize,
}

impl<'a> LzwDecoder<'a> {
    pub fn new(data: &'a [u8], native_code_size: u8) -> CodecResult<Self> {
        if !(2..=8).contains(&native_code_size) {
            return Err(CodecError::InvalidCodeSize(native_code_size));
        }
        let dict = Dictionary::new(native_code_size);
        Ok(Self {
            bits: dict.initial_bits(),
            dict,
            reader: BitReader::new(data, BitOrder::LsbFirst),
            previous: None,
            stack: Vec::with_capacity(MAX_CODE as usize + 1),
            clean: false,
            finished: false,
            fault: None,
            clears: 0,
        })
    }

    pub fn was_decode_clean(&self) -> bool {
        self.clean
    }

    pub fn fault(&self) -> Option<&CodecError> {
        self.fault.as_ref()
    }

    pub fn clears_seen(&self) -> usize {
        self.clears
    }

    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub fn has_next(&mut self) -> bool {
        if self.stack.is_empty() && !self.finished {
            self.refill();
        }
        !self.stack.is_empty()
    }

    fn fail(&mut self, error: CodecError) {
        log::warn!("LZW decode aborted: {}", error);
        self.fault = Some(error);
        self.finished = true;
    }

    fn reset(&mut self) {
        self.dict.reset();
        self.bits = self.dict.initial_bits();
        self.previous = None;
    }

    fn push_string(&mut self, code: u16) -> CodecResult<u8> {
        let mut current = code;
        for _ in 0..=MAX_CODE {
            let entry = self.dict.entries[current as usize];
            self.stack.push(entry.value);
            match entry.parent {
                None if current < self.dict.clear_code() => return Ok(entry.value),
                None => break,
                Some(parent) => current = parent,
            }
        }
        Err(CodecError::CorruptLzw(format!(
            "code {} does not resolve to a literal",
            code
        )))
    }

    fn refill(&mut self) {
        while self.stack.is_empty() && !self.finished {
            let Some(code) = self.reader.read_bits(self.bits) else {
                log::warn!("LZW stream ended without an end code");
                self.finished = true;
                return;
            };

            if code == self.dict.clear_code() {
                if self.previous.is_some() {
                    self.clears += 1;
                    log::trace!("LZW clear code mid-stream");
                }
                self.reset();
                continue;
            }
            if code == self.dict.end_code() {
                self.clean = true;
                self.finished = true;
                return;
            }

            let Some(previous) = self.previous else {
                if code >= self.dict.clear_code() {
                    self.fail(CodecError::CorruptLzw(format!(
                        "first code {} after clear is not a literal",
                        code
                    )));
                    return;
                }
                self.stack.push(code as u8);
                self.previous = Some(code);
                continue;
            };

            let next_code = self.dict.hi_code + 1;
            let first = if code < next_code {
                match self.push_string(code) {
                    Ok(first) => first,
                    Err(e) => {
                        self.fail(e);
                        return;
                    }
                }
            } else if code == next_code && !self.dict.is_full() {
                // KwKwK: the code being defined right now
                let first = match self.push_string(previous) {
                    Ok(first) => first,
                    Err(e) => {
                        self.fail(e);
                        return;
                    }
                };
                self.stack.insert(0, first);
                first
            } else {
                self.fail(CodecError::CorruptLzw(format!(
                    "code {} beyond dictionary end {}",
                    code, self.dict.hi_code
                )));
                return;
            };

            if !self.dict.is_full() {
                self.dict.add(previous, first);
                // one entry behind the encoder
                if self.dict.hi_code + 1 == 1 << self.bits && self.bits < MAX_CODE_BITS {
                    self.bits += 1;
                }
            }
            self.previous = Some(code);
        }
    }
}

impl Iterator for LzwDecoder<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.has_next() {
            self.stack.pop()
        } else {
            None
        }
    }
}

pub fn lzw_decode(data: &[u8], native_code_size: u8) -> CodecResult<(Vec<u8>, bool)> {
    let mut decoder = LzwDecoder::new(data, native_code_size)?;
    let output: Vec<u8> = decoder.by_ref().collect();
    Ok((output, decoder.was_decode_clean()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, seed: u32, modulus: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % modulus) as u8
            })
            .collect()
    }

    fn read_codes(data: &[u8], widths: &[u8]) -> Vec<u16> {
        let mut reader = BitReader::new(data, BitOrder::LsbFirst);
        widths.iter().map(|&w| reader.read_bits(w).unwrap()).collect()
    }

    #[test]
    fn test_scenario_token_stream() {
        let encoded = lzw_encode(b"AAAABBBCCCC", 8).unwrap();
        let codes = read_codes(&encoded, &[9; 10]);
        assert_eq!(codes, vec![256, 65, 258, 65, 66, 261, 67, 263, 67, 257]);

        let (decoded, clean) = lzw_decode(&encoded, 8).unwrap();
        assert_eq!(decoded, b"AAAABBBCCCC");
        assert!(clean);
    }

    #[test]
    fn test_known_gif_stream() {
        // Two-bit alphabet example: [0, 0, 1, 3]
        let encoded = lzw_encode(&[0, 0, 1, 3], 2).unwrap();
        // clear(3) 0(3) 0(3) 1(3), code 8 is added so: 3(4) end(4)
        assert_eq!(encoded, vec![0x04, 0x32, 0x05]);
        let (decoded, clean) = lzw_decode(&[0x04, 0x32, 0x05], 2).unwrap();
        assert_eq!(decoded, vec![0, 0, 1, 3]);
        assert!(clean);
    }

    #[test]
    fn test_width_growth_matches_gif_readers() {
        // codes widen from 3 to 6 bits over this input
        let data: Vec<u8> = (0..40u32).map(|i| ((i * i + 3 * i) / 5 % 4) as u8).collect();
        let expected = [
            0x04, 0x34, 0x71, 0x12, 0x21, 0x02, 0xC2, 0x80, 0x60, 0x0C, 0x83, 0xD4, 0x6B, 0x2F,
            0x4E, 0x63, 0x15,
        ];
        assert_eq!(lzw_encode(&data, 2).unwrap(), expected);
        let (decoded, clean) = lzw_decode(&expected, 2).unwrap();
        assert_eq!(decoded, data);
        assert!(clean);
    }

    #[test]
    fn test_interoperates_with_weezl() {
        use weezl::{decode::Decoder, encode::Encoder, BitOrder as WeezlOrder};

        for code_size in 2u8..=8 {
            let modulus = 1u32 << code_size;
            for data in [
                pseudo_random(5000, 31 + code_size as u32, modulus),
                (0..3000u32).map(|i| ((i / 3) % modulus) as u8).collect::<Vec<_>>(),
            ] {
                let ours = lzw_encode(&data, code_size).unwrap();
                let theirs = Decoder::new(WeezlOrder::Lsb, code_size)
                    .decode(&ours)
                    .unwrap();
                assert_eq!(theirs, data, "code size {}", code_size);

                let reference = Encoder::new(WeezlOrder::Lsb, code_size)
                    .encode(&data)
                    .unwrap();
                let (decoded, clean) = lzw_decode(&reference, code_size).unwrap();
                assert_eq!(decoded, data, "code size {}", code_size);
                assert!(clean, "code size {}", code_size);
            }
        }

        // long enough to fill the dictionary and force clears
        let data = pseudo_random(60_000, 99, 256);
        let ours = lzw_encode(&data, 8).unwrap();
        assert_eq!(Decoder::new(WeezlOrder::Lsb, 8).decode(&ours).unwrap(), data);
        let reference = Encoder::new(WeezlOrder::Lsb, 8).encode(&data).unwrap();
        assert_eq!(lzw_decode(&reference, 8).unwrap(), (data, true));
    }

    #[test]
    fn test_empty_input() {
        let encoded = lzw_encode(&[], 4).unwrap();
        let codes = read_codes(&encoded, &[5, 5]);
        assert_eq!(codes, vec![16, 17]);
        let (decoded, clean) = lzw_decode(&encoded, 4).unwrap();
        assert!(decoded.is_empty());
        assert!(clean);
    }

    #[test]
    fn test_roundtrip_all_code_sizes() {
        for code_size in 2u8..=8 {
            let modulus = 1u32 << code_size;
            let inputs = vec![
                vec![0u8; 1],
                vec![1u8; 5000],
                (0..20_000u32).map(|i| ((i / 7) % modulus) as u8).collect::<Vec<_>>(),
                pseudo_random(30_000, 0x9E37_79B9 ^ code_size as u32, modulus),
            ];
            for data in inputs {
                let encoded = lzw_encode(&data, code_size).unwrap();
                let (decoded, clean) = lzw_decode(&encoded, code_size).unwrap();
                assert_eq!(decoded, data, "code size {}", code_size);
                assert!(clean, "code size {}", code_size);
            }
        }
    }

    #[test]
    fn test_roundtrip_large_inputs() {
        let random = pseudo_random(100_000, 12345, 256);
        let repetitive: Vec<u8> = b"the quick brown fox ".iter().cycle().take(100_000).copied().collect();
        for data in [random, repetitive] {
            let encoded = lzw_encode(&data, 8).unwrap();
            let (decoded, clean) = lzw_decode(&encoded, 8).unwrap();
            assert_eq!(decoded, data);
            assert!(clean);
        }
    }

    #[test]
    fn test_dictionary_full_emits_clear() {
        let data = pseudo_random(60_000, 777, 256);
        let mut encoder = LzwEncoder::new(8).unwrap();
        encoder.write_all(&data).unwrap();
        assert!(encoder.clears_emitted() >= 1);
        let encoded = encoder.signal_end_of_stream();

        let mut decoder = LzwDecoder::new(&encoded, 8).unwrap();
        let decoded: Vec<u8> = decoder.by_ref().collect();
        assert_eq!(decoded, data);
        assert!(decoder.was_decode_clean());
        assert!(decoder.clears_seen() >= 1);
    }

    #[test]
    fn test_clear_policy_off_keeps_full_dictionary() {
        let data = pseudo_random(60_000, 4242, 256);
        let mut encoder = LzwEncoder::new(8).unwrap().with_clear_policy(false);
        encoder.write_all(&data).unwrap();
        assert_eq!(encoder.clears_emitted(), 0);
        let encoded = encoder.signal_end_of_stream();

        let mut decoder = LzwDecoder::new(&encoded, 8).unwrap();
        let decoded: Vec<u8> = decoder.by_ref().collect();
        assert_eq!(decoded, data);
        assert!(decoder.was_decode_clean());
        assert_eq!(decoder.clears_seen(), 0);
    }

    #[test]
    fn test_leading_clears_are_skipped() {
        let mut writer = BitWriter::new(BitOrder::LsbFirst);
        // only code 6 is defined before `end`, which stays 3 bits wide
        for (code, width) in [(4u32, 3u8), (4, 3), (4, 3), (1, 3), (2, 3), (5, 3)] {
            writer.write_bits(code, width);
        }
        let data = writer.finish();
        let (decoded, clean) = lzw_decode(&data, 2).unwrap();
        assert_eq!(decoded, vec![1, 2]);
        assert!(clean);
    }

    #[test]
    fn test_truncated_stream_is_unclean() {
        let encoded = lzw_encode(b"AAAABBBCCCC", 8).unwrap();
        let (decoded, clean) = lzw_decode(&encoded[..encoded.len() - 3], 8).unwrap();
        assert!(!clean);
        assert!(b"AAAABBBCCCC".starts_with(&decoded));
    }

    #[test]
    fn test_undefined_code_is_reported() {
        let mut writer = BitWriter::new(BitOrder::LsbFirst);
        for code in [256u16, 65, 400] {
            writer.write_bits(code as u32, 9);
        }
        let data = writer.finish();
        let mut decoder = LzwDecoder::new(&data, 8).unwrap();
        let decoded: Vec<u8> = decoder.by_ref().collect();
        assert_eq!(decoded, b"A");
        assert!(!decoder.was_decode_clean());
        assert!(matches!(decoder.fault(), Some(CodecError::CorruptLzw(_))));
    }

    #[test]
    fn test_rejects_bad_code_size_and_symbols() {
        assert!(LzwEncoder::new(1).is_err());
        assert!(LzwEncoder::new(9).is_err());
        assert!(LzwDecoder::new(&[], 12).is_err());
        let mut encoder = LzwEncoder::new(2).unwrap();
        assert!(encoder.next(4).is_err());
    }
}
