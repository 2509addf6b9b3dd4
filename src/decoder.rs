use crate::compression::bitio::BitReader;
use crate::compression::dct::{inverse_dct, level_shift_up, zigzag_unscan, SampleBlock};
use crate::compression::huffman::TableClass;
use crate::compression::huffman_codec::JpegCoefficientDecoder;
use crate::compression::mcu::{ChannelMcu, FormFactor, Mcu, PlanarImage, SamplingFactors};
use crate::encoder::ComponentSpec;
use crate::error::{CodecError, CodecResult};
use crate::format::tables::TableSet;

#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: PlanarImage,
    /// Every MCU decoded without error.
    pub clean: bool,
    pub mcus_decoded: usize,
}

pub struct JpegDecoderPipeline {
    width: usize,
    height: usize,
    precision: u8,
    form: FormFactor,
    components: Vec<ComponentSpec>,
    tables: TableSet,
}

impl JpegDecoderPipeline {
    /// Checks the component layout against the supported form factors and
    /// that every referenced table is present.
    pub fn new(
        width: usize,
        height: usize,
        components: Vec<ComponentSpec>,
        tables: TableSet,
    ) -> CodecResult<Self> {
        if width == 0 || height == 0 {
            return Err(CodecError::DecodingError(format!(
                "empty frame {}x{}",
                width, height
            )));
        }
        let form = match components.as_slice() {
            [luma] => {
                if luma.factors != SamplingFactors::FULL {
                    log::debug!(
                        "single component sampled {:#04x}, decoding as 1x1",
                        luma.factors.to_byte()
                    );
                }
                FormFactor::Yuv444
            }
            [luma, chroma @ ..] if chroma.len() == 2 => {
                if chroma.iter().any(|c| c.factors != SamplingFactors::FULL) {
                    return Err(CodecError::UnsupportedFormFactor(chroma[0].factors.to_byte()));
                }
                FormFactor::from_byte(luma.factors.to_byte())?
            }
            _ => {
                return Err(CodecError::DecodingError(format!(
                    "{} components, expected 1 or 3",
                    components.len()
                )))
            }
        };

        for spec in &components {
            tables.quant(spec.quant_table)?;
            tables.huffman(TableClass::Dc, spec.dc_table)?;
            tables.huffman(TableClass::Ac, spec.ac_table)?;
        }

        let components = if components.len() == 1 {
            vec![ComponentSpec {
                factors: SamplingFactors::FULL,
                ..components[0]
            }]
        } else {
            components
        };

        Ok(Self {
            width,
            height,
            precision: 8,
            form,
            components,
            tables,
        })
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn form_factor(&self) -> FormFactor {
        self.form
    }

    /// Decodes an entropy-coded segment. Corrupt or truncated data stops the
    /// decode at the failing MCU; the rest of the frame stays mid-grey and
    /// the result is flagged unclean.
    pub fn decode(&self, scan: &[u8]) -> CodecResult<DecodedFrame> {
        let mut image =
            PlanarImage::new(self.width, self.height, self.components.len(), self.precision)?;
        let (mcu_cols, mcu_rows) = image.mcu_grid(self.form);
        let total = mcu_cols * mcu_rows;

        let mut decoders = Vec::with_capacity(self.components.len());
        let mut quant = Vec::with_capacity(self.components.len());
        for spec in &self.components {
            decoders.push(JpegCoefficientDecoder::new(
                self.tables.huffman(TableClass::Dc, spec.dc_table)?,
                self.tables.huffman(TableClass::Ac, spec.ac_table)?,
            ));
            quant.push(self.tables.quant(spec.quant_table)?);
        }

        log::debug!(
            "decoding {}x{} frame: {} components, form {:#04x}, {} MCUs",
            self.width,
            self.height,
            self.components.len(),
            self.form as u8,
            total
        );

        let mut reader = BitReader::jpeg(scan);
        let mut decoded = 0;
        let mut clean = true;

        'mcus: for index in 0..total {
            let mut channels = Vec::with_capacity(self.components.len());
            for ((spec, decoder), table) in self
                .components
                .iter()
                .zip(decoders.iter_mut())
                .zip(quant.iter())
            {
                let mut units: Vec<SampleBlock> = Vec::with_capacity(spec.factors.unit_count());
                for _ in 0..spec.factors.unit_count() {
                    let coefficients = match decoder.decode_block(&mut reader) {
                        Ok(block) => block,
                        Err(e) => {
                            log::warn!("scan corrupt at MCU {} of {}: {}", index, total, e);
                            clean = false;
                            break 'mcus;
                        }
                    };
                    let natural = zigzag_unscan(&table.dequantize(&coefficients));
                    units.push(level_shift_up(&inverse_dct(&natural), self.precision));
                }
                channels.push(ChannelMcu {
                    factors: spec.factors,
                    units,
                });
            }

            Mcu { channels }.place(&mut image, self.form, index % mcu_cols, index / mcu_cols);
            decoded += 1;
        }

        if let Some(marker) = reader.marker() {
            log::debug!("scan ended at marker 0xFF{:02X}", marker);
        }

        Ok(DecodedFrame {
            image,
            clean,
            mcus_decoded: decoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::bitio::BitWriter;
    use crate::compression::huffman_codec::JpegCoefficientEncoder;
    use crate::compression::mcu::Plane;
    use crate::config::JpegConfig;
    use crate::encoder::JpegEncoderPipeline;

    fn smooth_image(width: usize, height: usize) -> PlanarImage {
        let planes = (0..3)
            .map(|c| {
                let data = (0..width * height)
                    .map(|i| (60 + (i % width) + (i / width) / 2 + c * 30) as u16)
                    .collect();
                Plane::from_data(width, height, data).unwrap()
            })
            .collect();
        PlanarImage::from_planes(planes, 8).unwrap()
    }

    fn max_error(a: &PlanarImage, b: &PlanarImage) -> u16 {
        a.planes
            .iter()
            .zip(b.planes.iter())
            .flat_map(|(p, q)| p.data.iter().zip(q.data.iter()))
            .map(|(&x, &y)| x.abs_diff(y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_roundtrip_444() {
        let image = smooth_image(24, 16);
        let scan = JpegEncoderPipeline::new(24, 16, JpegConfig::lossy(95))
            .unwrap()
            .encode(&image)
            .unwrap();
        let frame = scan.decoder().unwrap().decode(&scan.data).unwrap();
        assert!(frame.clean);
        assert_eq!(frame.mcus_decoded, 6);
        assert!(max_error(&image, &frame.image) <= 8);
    }

    #[test]
    fn test_roundtrip_420_partial_mcus() {
        let image = smooth_image(21, 13);
        let scan = JpegEncoderPipeline::new(21, 13, JpegConfig::subsampled(95))
            .unwrap()
            .encode(&image)
            .unwrap();
        let decoder = scan.decoder().unwrap();
        assert_eq!(decoder.form_factor(), FormFactor::Yuv420);
        let frame = decoder.decode(&scan.data).unwrap();
        assert!(frame.clean);
        assert_eq!(frame.mcus_decoded, 2);
        assert_eq!(frame.image.width, 21);
        // chroma is subsampled, luma stays close
        let luma_error = image.planes[0]
            .data
            .iter()
            .zip(frame.image.planes[0].data.iter())
            .map(|(&a, &b)| a.abs_diff(b))
            .max()
            .unwrap();
        assert!(luma_error <= 8);
        assert!(max_error(&image, &frame.image) <= 12);
    }

    #[test]
    fn test_flat_image_is_exact() {
        let planes = vec![
            Plane::filled(16, 16, 90),
            Plane::filled(16, 16, 128),
            Plane::filled(16, 16, 200),
        ];
        let image = PlanarImage::from_planes(planes, 8).unwrap();
        let scan = JpegEncoderPipeline::new(16, 16, JpegConfig::high_quality())
            .unwrap()
            .encode(&image)
            .unwrap();
        let frame = scan.decoder().unwrap().decode(&scan.data).unwrap();
        assert!(max_error(&image, &frame.image) <= 1);
    }

    #[test]
    fn test_twelve_bit_roundtrip() {
        let data: Vec<u16> = (0..16 * 16).map(|i| (i as u16 * 13) % 4096).collect();
        let plane = Plane::from_data(16, 16, data).unwrap();
        let image = PlanarImage::from_planes(vec![plane], 12).unwrap();
        let scan = JpegEncoderPipeline::new(16, 16, JpegConfig::high_quality().with_precision(12))
            .unwrap()
            .encode(&image)
            .unwrap();
        let frame = scan.decoder().unwrap().decode(&scan.data).unwrap();
        assert!(frame.clean);
        assert_eq!(frame.image.precision, 12);
        assert!(max_error(&image, &frame.image) <= 4);
    }

    #[test]
    fn test_truncated_scan_degrades() {
        let image = smooth_image(64, 64);
        let scan = JpegEncoderPipeline::new(64, 64, JpegConfig::lossy(90))
            .unwrap()
            .encode(&image)
            .unwrap();
        let decoder = scan.decoder().unwrap();
        let frame = decoder.decode(&scan.data[..scan.data.len() / 3]).unwrap();
        assert!(!frame.clean);
        assert!(frame.mcus_decoded < 64);
        assert_eq!(frame.image.width, 64);
        // undecoded area stays mid-grey
        assert_eq!(*frame.image.planes[0].data.last().unwrap(), 128);
    }

    fn dc_only_scan(tables: &TableSet, luma: &[i16], cb: i16, cr: i16) -> Vec<u8> {
        let block = |dc: i16| {
            let mut unit = [0i16; 64];
            unit[0] = dc;
            unit
        };
        let mut writer = BitWriter::jpeg();
        let mut encoder = JpegCoefficientEncoder::new(
            tables.huffman(TableClass::Dc, 0).unwrap(),
            tables.huffman(TableClass::Ac, 0).unwrap(),
        );
        for &dc in luma {
            encoder.encode_block(&mut writer, &block(dc)).unwrap();
        }
        for dc in [cb, cr] {
            let mut encoder = JpegCoefficientEncoder::new(
                tables.huffman(TableClass::Dc, 1).unwrap(),
                tables.huffman(TableClass::Ac, 1).unwrap(),
            );
            encoder.encode_block(&mut writer, &block(dc)).unwrap();
        }
        writer.finish()
    }

    #[test]
    fn test_decodes_one_axis_subsampling() {
        let tables = TableSet::standard(100);
        let scan = dc_only_scan(&tables, &[80, -80], 160, 0);

        // 0x21: luma units side by side, chroma stretched across 16x8
        let specs = ComponentSpec::for_frame(3, FormFactor::Yuv422);
        let decoder = JpegDecoderPipeline::new(16, 8, specs, tables.clone()).unwrap();
        let frame = decoder.decode(&scan).unwrap();
        assert!(frame.clean);
        assert_eq!(frame.mcus_decoded, 1);
        let [y, cb, cr] = &frame.image.planes[..] else {
            panic!("expected three planes");
        };
        for row in 0..8 {
            for col in 0..16 {
                assert_eq!(y.get(col, row), if col < 8 { 138 } else { 118 });
            }
        }
        assert!(cb.data.iter().all(|&v| v == 148));
        assert!(cr.data.iter().all(|&v| v == 128));

        // 0x12: the same units stacked vertically
        let specs = ComponentSpec::for_frame(3, FormFactor::Yuv440);
        let decoder = JpegDecoderPipeline::new(8, 16, specs, tables).unwrap();
        let frame = decoder.decode(&scan).unwrap();
        assert!(frame.clean);
        let [y, cb, cr] = &frame.image.planes[..] else {
            panic!("expected three planes");
        };
        for row in 0..16 {
            for col in 0..8 {
                assert_eq!(y.get(col, row), if row < 8 { 138 } else { 118 });
            }
        }
        assert_eq!(cb.data.len(), 8 * 16);
        assert!(cb.data.iter().all(|&v| v == 148));
        assert!(cr.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let tables = TableSet::standard(50);
        let specs = ComponentSpec::for_frame(2, FormFactor::Yuv444);
        assert!(JpegDecoderPipeline::new(8, 8, specs, tables.clone()).is_err());

        let mut specs = ComponentSpec::for_frame(3, FormFactor::Yuv420);
        specs[1].factors = SamplingFactors::new(2, 1).unwrap();
        assert!(JpegDecoderPipeline::new(8, 8, specs, tables.clone()).is_err());

        let mut specs = ComponentSpec::for_frame(3, FormFactor::Yuv444);
        specs[2].quant_table = 3;
        assert!(JpegDecoderPipeline::new(8, 8, specs, tables.clone()).is_err());

        let specs = ComponentSpec::for_frame(3, FormFactor::Yuv422);
        assert!(JpegDecoderPipeline::new(8, 8, specs, tables).is_ok());
    }
}
