use crate::compression::dct::SampleBlock;
use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingFactors {
    pub horizontal: u8,
    pub vertical: u8,
}

impl SamplingFactors {
    pub const FULL: SamplingFactors = SamplingFactors {
        horizontal: 1,
        vertical: 1,
    };

    pub fn new(horizontal: u8, vertical: u8) -> CodecResult<Self> {
        if !(1..=2).contains(&horizontal) || !(1..=2).contains(&vertical) {
            return Err(CodecError::UnsupportedFormFactor(
                (horizontal << 4) | (vertical & 0x0F),
            ));
        }
        Ok(Self {
            horizontal,
            vertical,
        })
    }

    pub fn to_byte(self) -> u8 {
        (self.horizontal << 4) | self.vertical
    }

    pub fn from_byte(byte: u8) -> CodecResult<Self> {
        Self::new(byte >> 4, byte & 0x0F)
    }

    pub fn unit_count(self) -> usize {
        self.horizontal as usize * self.vertical as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FormFactor {
    Yuv444 = 0x11,
    Yuv440 = 0x12,
    Yuv422 = 0x21,
    Yuv420 = 0x22,
}

impl FormFactor {
    pub fn from_byte(byte: u8) -> CodecResult<Self> {
        match byte {
            0x11 => Ok(FormFactor::Yuv444),
            0x12 => Ok(FormFactor::Yuv440),
            0x21 => Ok(FormFactor::Yuv422),
            0x22 => Ok(FormFactor::Yuv420),
            other => Err(CodecError::UnsupportedFormFactor(other)),
        }
    }

    pub fn is_encodable(self) -> bool {
        matches!(self, FormFactor::Yuv444 | FormFactor::Yuv420)
    }

    pub fn luma(self) -> SamplingFactors {
        let byte = self as u8;
        SamplingFactors {
            horizontal: byte >> 4,
            vertical: byte & 0x0F,
        }
    }

    pub fn factors(self, channel: usize) -> SamplingFactors {
        if channel == 0 {
            self.luma()
        } else {
            SamplingFactors::FULL
        }
    }

    pub fn mcu_width(self) -> usize {
        8 * self.luma().horizontal as usize
    }

    pub fn mcu_height(self) -> usize {
        8 * self.luma().vertical as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMcu {
    pub factors: SamplingFactors,
    pub units: Vec<SampleBlock>,
}

impl ChannelMcu {
    pub fn new(factors: SamplingFactors, units: Vec<SampleBlock>) -> CodecResult<Self> {
        if units.len() != factors.unit_count() {
            return Err(CodecError::EncodingError(format!(
                "{} data units for sampling {:#04x}",
                units.len(),
                factors.to_byte()
            )));
        }
        Ok(Self { factors, units })
    }

    pub fn read(plane: &Plane, x: usize, y: usize, factors: SamplingFactors) -> Self {
        let mut units = Vec::with_capacity(factors.unit_count());
        for row in 0..factors.vertical as usize {
            for col in 0..factors.horizontal as usize {
                units.push(plane.read_block(x + col * 8, y + row * 8));
            }
        }
        Self { factors, units }
    }

    pub fn write(&self, plane: &mut Plane, x: usize, y: usize) {
        let h = self.factors.horizontal as usize;
        for (i, unit) in self.units.iter().enumerate() {
            plane.write_block(x + (i % h) * 8, y + (i / h) * 8, unit);
        }
    }

    pub fn reduce(&self) -> ChannelMcu {
        let h = self.factors.horizontal as usize;
        let v = self.factors.vertical as usize;
        let mut block = [0u16; 64];
        for r in 0..8 {
            for c in 0..8 {
                let (fy, fx) = (r * v, c * h);
                let unit = &self.units[(fy / 8) * h + fx / 8];
                block[r * 8 + c] = unit[(fy % 8) * 8 + fx % 8];
            }
        }
        ChannelMcu {
            factors: SamplingFactors::FULL,
            units: vec![block],
        }
    }

    pub fn expand(&self, target: SamplingFactors) -> ChannelMcu {
        let source = &self.units[0];
        let h = target.horizontal as usize;
        let v = target.vertical as usize;
        let mut units = Vec::with_capacity(target.unit_count());
        for bv in 0..v {
            for bh in 0..h {
                let mut block = [0u16; 64];
                for r in 0..8 {
                    for c in 0..8 {
                        let sy = (bv * 8 + r) / v;
                        let sx = (bh * 8 + c) / h;
                        block[r * 8 + c] = source[sy * 8 + sx];
                    }
                }
                units.push(block);
            }
        }
        ChannelMcu {
            factors: target,
            units,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mcu {
    pub channels: Vec<ChannelMcu>,
}

impl Mcu {
    pub fn extract(image: &PlanarImage, form: FormFactor, mcu_x: usize, mcu_y: usize) -> Self {
        let luma = form.luma();
        let x = mcu_x * form.mcu_width();
        let y = mcu_y * form.mcu_height();
        let channels = image
            .planes
            .iter()
            .enumerate()
            .map(|(i, plane)| {
                let full = ChannelMcu::read(plane, x, y, luma);
                if i == 0 || luma == SamplingFactors::FULL {
                    full
                } else {
                    full.reduce()
                }
            })
            .collect();
        Self { channels }
    }

    pub fn place(&self, image: &mut PlanarImage, form: FormFactor, mcu_x: usize, mcu_y: usize) {
        let luma = form.luma();
        let x = mcu_x * form.mcu_width();
        let y = mcu_y * form.mcu_height();
        for (channel, plane) in self.channels.iter().zip(image.planes.iter_mut()) {
            if channel.factors == luma {
                channel.write(plane, x, y);
            } else {
                channel.expand(luma).write(plane, x, y);
            }
        }
    }

    pub fn unit_count(&self) -> usize {
        self.channels.iter().map(|c| c.units.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn filled(width: usize, height: usize, value: u16) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_data(width: usize, height: usize, data: Vec<u16>) -> CodecResult<Self> {
        if data.len() != width * height {
            return Err(CodecError::EncodingError(format!(
                "plane of {}x{} needs {} samples, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }

    // samples past the right or bottom edge repeat the last column or row
    pub fn read_block(&self, x: usize, y: usize) -> SampleBlock {
        let mut block = [0u16; 64];
        if self.width == 0 || self.height == 0 {
            return block;
        }
        for r in 0..8 {
            let sy = (y + r).min(self.height - 1);
            for c in 0..8 {
                let sx = (x + c).min(self.width - 1);
                block[r * 8 + c] = self.data[sy * self.width + sx];
            }
        }
        block
    }

    pub fn write_block(&mut self, x: usize, y: usize, block: &SampleBlock) {
        for r in 0..8 {
            let dy = y + r;
            if dy >= self.height {
                break;
            }
            for c in 0..8 {
                let dx = x + c;
                if dx >= self.width {
                    break;
                }
                self.data[dy * self.width + dx] = block[r * 8 + c];
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarImage {
    pub width: usize,
    pub height: usize,
    pub precision: u8,
    pub planes: Vec<Plane>,
}

impl PlanarImage {
    pub fn new(width: usize, height: usize, components: usize, precision: u8) -> CodecResult<Self> {
        if components != 1 && components != 3 {
            return Err(CodecError::EncodingError(format!(
                "{} components, expected 1 or 3",
                components
            )));
        }
        if precision != 8 && precision != 12 {
            return Err(CodecError::EncodingError(format!(
                "sample precision {} unsupported",
                precision
            )));
        }
        let mid = 1u16 << (precision - 1);
        Ok(Self {
            width,
            height,
            precision,
            planes: (0..components)
                .map(|_| Plane::filled(width, height, mid))
                .collect(),
        })
    }

    pub fn from_planes(planes: Vec<Plane>, precision: u8) -> CodecResult<Self> {
        let Some(first) = planes.first() else {
            return Err(CodecError::EncodingError("no planes".into()));
        };
        let (width, height) = (first.width, first.height);
        if planes.iter().any(|p| p.width != width || p.height != height) {
            return Err(CodecError::EncodingError("plane sizes differ".into()));
        }
        let mut image = Self::new(width, height, planes.len(), precision)?;
        let max = (1u32 << precision) - 1;
        if planes
            .iter()
            .any(|p| p.data.iter().any(|&s| s as u32 > max))
        {
            return Err(CodecError::EncodingError(format!(
                "sample above {}-bit range",
                precision
            )));
        }
        image.planes = planes;
        Ok(image)
    }

    pub fn components(&self) -> usize {
        self.planes.len()
    }

    pub fn mcu_grid(&self, form: FormFactor) -> (usize, usize) {
        (
            self.width.div_ceil(form.mcu_width()),
            self.height.div_ceil(form.mcu_height()),
        )
    }
}
