use crate::compression::dct::{DataUnit, ZIGZAG_ORDER};
use crate::error::{CodecError, CodecResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

pub const JPEG_LUMINANCE_QUANT: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
    92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

pub const JPEG_CHROMINANCE_QUANT: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum QuantPrecision {
    Bits8 = 0,
    Bits16 = 1,
}

// 64 step sizes stored in the order they travel in a DQT segment, which is
// also the order coefficients have after the zigzag stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    values: [u16; 64],
    precision: QuantPrecision,
    destination: u8,
}

impl QuantizationTable {
    pub fn new(values: [u16; 64], precision: QuantPrecision, destination: u8) -> CodecResult<Self> {
        if destination > 3 {
            return Err(CodecError::InvalidQuantTable(format!(
                "destination {} out of range",
                destination
            )));
        }
        if let Some(i) = values.iter().position(|&v| v == 0) {
            return Err(CodecError::InvalidQuantTable(format!("zero step at index {}", i)));
        }
        if precision == QuantPrecision::Bits8 && values.iter().any(|&v| v > 255) {
            return Err(CodecError::InvalidQuantTable(
                "8-bit table holds a step above 255".into(),
            ));
        }
        Ok(Self {
            values,
            precision,
            destination,
        })
    }

    pub fn for_quality(quality: u8, is_chroma: bool, destination: u8) -> Self {
        let base = if is_chroma {
            JPEG_CHROMINANCE_QUANT
        } else {
            JPEG_LUMINANCE_QUANT
        };

        let quality = quality.clamp(1, 100) as u32;
        let scale = if quality < 50 {
            5000 / quality
        } else {
            200 - quality * 2
        };

        let mut values = [0u16; 64];
        for (i, &natural) in ZIGZAG_ORDER.iter().enumerate() {
            let val = (base[natural] as u32 * scale + 50) / 100;
            values[i] = val.clamp(1, 255) as u16;
        }

        Self {
            values,
            precision: QuantPrecision::Bits8,
            destination: destination & 0x03,
        }
    }

    pub fn flat(destination: u8) -> Self {
        Self {
            values: [1u16; 64],
            precision: QuantPrecision::Bits8,
            destination: destination & 0x03,
        }
    }

    pub fn values(&self) -> &[u16; 64] {
        &self.values
    }

    pub fn precision(&self) -> QuantPrecision {
        self.precision
    }

    pub fn destination(&self) -> u8 {
        self.destination
    }

    pub fn tag(&self) -> u8 {
        ((self.precision as u8) << 4) | self.destination
    }

    pub fn quantize(&self, block: &DataUnit) -> DataUnit {
        let mut output = [0i16; 64];
        for i in 0..64 {
            let q = self.values[i] as i32;
            let v = block[i] as i32;
            let magnitude = (v.abs() + q / 2) / q;
            output[i] = (v.signum() * magnitude) as i16;
        }
        output
    }

    pub fn dequantize(&self, block: &DataUnit) -> DataUnit {
        let mut output = [0i16; 64];
        for i in 0..64 {
            let v = block[i] as i32 * self.values[i] as i32;
            output[i] = v.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        output
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 128);
        out.push(self.tag());
        for &v in &self.values {
            match self.precision {
                QuantPrecision::Bits8 => out.push(v as u8),
                QuantPrecision::Bits16 => {
                    // Writing into a Vec cannot fail.
                    let _ = out.write_u16::<BigEndian>(v);
                }
            }
        }
        out
    }

    pub fn from_dqt(data: &[u8]) -> CodecResult<(Self, usize)> {
        let mut cursor = Cursor::new(data);
        let tag = cursor
            .read_u8()
            .map_err(|_| CodecError::InvalidQuantTable("empty DQT payload".into()))?;
        let precision = match tag >> 4 {
            0 => QuantPrecision::Bits8,
            1 => QuantPrecision::Bits16,
            p => {
                return Err(CodecError::InvalidQuantTable(format!(
                    "unknown precision {}",
                    p
                )))
            }
        };

        let mut values = [0u16; 64];
        for v in values.iter_mut() {
            let read = match precision {
                QuantPrecision::Bits8 => cursor.read_u8().map(u16::from),
                QuantPrecision::Bits16 => cursor.read_u16::<BigEndian>(),
            };
            *v = read.map_err(|_| CodecError::InvalidQuantTable("truncated DQT payload".into()))?;
        }

        let table = Self::new(values, precision, tag & 0x0F)?;
        Ok((table, cursor.position() as usize))
    }
}
