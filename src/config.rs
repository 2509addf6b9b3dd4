use crate::compression::mcu::FormFactor;
use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegConfig {
    pub quality: u8,
    pub form_factor: FormFactor,
    /// Sample precision in bits, 8 or 12.
    pub precision: u8,
    /// Build Huffman tables from the image's own symbol statistics instead of
    /// the Annex K tables. Always on for 12-bit samples.
    pub optimize_huffman: bool,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            form_factor: FormFactor::Yuv444,
            precision: 8,
            optimize_huffman: false,
        }
    }
}

impl JpegConfig {
    pub fn lossy(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Self::default()
        }
    }

    pub fn high_quality() -> Self {
        Self {
            quality: 100,
            form_factor: FormFactor::Yuv444,
            precision: 8,
            optimize_huffman: true,
        }
    }

    pub fn subsampled(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            form_factor: FormFactor::Yuv420,
            precision: 8,
            optimize_huffman: false,
        }
    }

    pub fn with_optimized_huffman(mut self) -> Self {
        self.optimize_huffman = true;
        self
    }

    pub fn uses_optimized_huffman(&self) -> bool {
        self.optimize_huffman || self.precision > 8
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn validate(&self) -> CodecResult<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(CodecError::ConfigError(format!(
                "quality {} outside 1..=100",
                self.quality
            )));
        }
        if self.precision != 8 && self.precision != 12 {
            return Err(CodecError::ConfigError(format!(
                "sample precision {} unsupported",
                self.precision
            )));
        }
        if !self.form_factor.is_encodable() {
            return Err(CodecError::UnsupportedFormFactor(self.form_factor as u8));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CodecError::ConfigError(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        let config: Self =
            bincode::deserialize(data).map_err(|e| CodecError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifConfig {
    pub min_code_size: u8,
    /// Reset the dictionary with a clear code once it fills up.
    pub clear_policy: bool,
}

impl Default for GifConfig {
    fn default() -> Self {
        Self {
            min_code_size: 8,
            clear_policy: true,
        }
    }
}

impl GifConfig {
    /// Smallest code size that covers a palette of `colors` entries.
    pub fn for_palette(colors: usize) -> Self {
        let mut bits = 2u8;
        while bits < 8 && (1usize << bits) < colors {
            bits += 1;
        }
        Self {
            min_code_size: bits,
            ..Self::default()
        }
    }

    pub fn without_clear(mut self) -> Self {
        self.clear_policy = false;
        self
    }

    pub fn validate(&self) -> CodecResult<()> {
        if !(2..=8).contains(&self.min_code_size) {
            return Err(CodecError::InvalidCodeSize(self.min_code_size));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CodecError::ConfigError(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        let config: Self =
            bincode::deserialize(data).map_err(|e| CodecError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
