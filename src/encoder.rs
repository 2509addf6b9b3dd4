use crate::compression::bitio::BitWriter;
use crate::compression::dct::{forward_dct, level_shift_down, zigzag_scan, DataUnit};
use crate::compression::huffman::{HuffmanTree, TableClass};
use crate::compression::huffman_codec::{JpegCoefficientEncoder, SymbolStatistics};
use crate::compression::mcu::{FormFactor, Mcu, PlanarImage, SamplingFactors};
use crate::config::JpegConfig;
use crate::decoder::JpegDecoderPipeline;
use crate::error::{CodecError, CodecResult};
use crate::format::tables::TableSet;

/// Frame component: identifier, sampling and the table destinations it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: u8,
    pub factors: SamplingFactors,
    pub quant_table: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

impl ComponentSpec {
    /// Y, Cb, Cr (ids 1, 2, 3) or a single Y component, luma on tables 0
    /// and chroma on tables 1.
    pub fn for_frame(components: usize, form: FormFactor) -> Vec<ComponentSpec> {
        (0..components)
            .map(|i| {
                let table = if i == 0 { 0 } else { 1 };
                ComponentSpec {
                    id: i as u8 + 1,
                    factors: form.factors(i),
                    quant_table: table,
                    dc_table: table,
                    ac_table: table,
                }
            })
            .collect()
    }
}

/// One baseline scan with everything needed to decode it.
#[derive(Debug, Clone)]
pub struct EncodedScan {
    pub width: usize,
    pub height: usize,
    pub precision: u8,
    pub components: Vec<ComponentSpec>,
    pub tables: TableSet,
    /// Entropy-coded segment, byte-stuffed.
    pub data: Vec<u8>,
    pub mcus: usize,
}

impl EncodedScan {
    pub fn decoder(&self) -> CodecResult<JpegDecoderPipeline> {
        JpegDecoderPipeline::new(
            self.width,
            self.height,
            self.components.clone(),
            self.tables.clone(),
        )
        .map(|pipeline| pipeline.with_precision(self.precision))
    }

    /// Entropy-coded bytes plus the DQT and DHT payloads.
    pub fn total_size(&self) -> usize {
        let segments = self.tables.to_segments();
        self.data.len() + segments.dqt.len() + segments.dht.len()
    }
}

pub struct JpegEncoderPipeline {
    width: usize,
    height: usize,
    config: JpegConfig,
}

impl JpegEncoderPipeline {
    pub fn new(width: usize, height: usize, config: JpegConfig) -> CodecResult<Self> {
        config.validate()?;
        if width == 0 || height == 0 || width > 65535 || height > 65535 {
            return Err(CodecError::ConfigError(format!(
                "frame size {}x{} outside 1..=65535",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            config,
        })
    }

    pub fn config(&self) -> &JpegConfig {
        &self.config
    }

    pub fn encode(&self, image: &PlanarImage) -> CodecResult<EncodedScan> {
        if image.width != self.width || image.height != self.height {
            return Err(CodecError::EncodingError(format!(
                "image is {}x{}, pipeline expects {}x{}",
                image.width, image.height, self.width, self.height
            )));
        }
        if image.precision != self.config.precision {
            return Err(CodecError::EncodingError(format!(
                "image has {}-bit samples, pipeline expects {}",
                image.precision, self.config.precision
            )));
        }

        let components = image.components();
        let form = if components == 1 {
            FormFactor::Yuv444
        } else {
            self.config.form_factor
        };
        let specs = ComponentSpec::for_frame(components, form);

        let mut tables = TableSet::standard(self.config.quality);
        let (mcu_cols, mcu_rows) = image.mcu_grid(form);
        log::debug!(
            "encoding {}x{} frame: {} components, form {:#04x}, {}x{} MCUs, quality {}",
            self.width,
            self.height,
            components,
            form as u8,
            mcu_cols,
            mcu_rows,
            self.config.quality
        );

        // Transform every MCU up front so the entropy stage can run twice.
        let mut units: Vec<Vec<Vec<DataUnit>>> = Vec::with_capacity(mcu_cols * mcu_rows);
        for my in 0..mcu_rows {
            for mx in 0..mcu_cols {
                let mcu = Mcu::extract(image, form, mx, my);
                let mut channels = Vec::with_capacity(components);
                for (channel, spec) in mcu.channels.iter().zip(specs.iter()) {
                    let quant = tables.quant(spec.quant_table)?;
                    channels.push(
                        channel
                            .units
                            .iter()
                            .map(|samples| {
                                let shifted = level_shift_down(samples, image.precision);
                                quant.quantize(&zigzag_scan(&forward_dct(&shifted)))
                            })
                            .collect(),
                    );
                }
                units.push(channels);
            }
        }

        if self.config.uses_optimized_huffman() {
            optimize_tables(&mut tables, &specs, &units)?;
        }

        let mut writer = BitWriter::jpeg();
        {
            let mut encoders = Vec::with_capacity(components);
            for spec in &specs {
                encoders.push(JpegCoefficientEncoder::new(
                    tables.huffman(TableClass::Dc, spec.dc_table)?,
                    tables.huffman(TableClass::Ac, spec.ac_table)?,
                ));
            }
            for mcu in &units {
                for (channel, encoder) in mcu.iter().zip(encoders.iter_mut()) {
                    for block in channel {
                        encoder.encode_block(&mut writer, block)?;
                    }
                }
            }
        }
        let data = writer.finish();

        log::debug!("scan complete: {} MCUs, {} bytes", units.len(), data.len());

        Ok(EncodedScan {
            width: self.width,
            height: self.height,
            precision: image.precision,
            components: specs,
            tables,
            data,
            mcus: units.len(),
        })
    }
}

/// Replaces the Huffman tables with ones built from the scan's own symbols.
fn optimize_tables(
    tables: &mut TableSet,
    specs: &[ComponentSpec],
    units: &[Vec<Vec<DataUnit>>],
) -> CodecResult<()> {
    let mut per_table: [Option<SymbolStatistics>; 4] = Default::default();
    let mut per_channel: Vec<SymbolStatistics> =
        specs.iter().map(|_| SymbolStatistics::new()).collect();
    for mcu in units {
        for (channel, stats) in mcu.iter().zip(per_channel.iter_mut()) {
            for block in channel {
                stats.count_block(block);
            }
        }
    }
    for (spec, stats) in specs.iter().zip(per_channel.iter()) {
        per_table[spec.dc_table as usize]
            .get_or_insert_with(SymbolStatistics::new)
            .merge(stats);
    }
    for (destination, stats) in per_table.iter().enumerate() {
        if let Some(stats) = stats {
            tables.set_huffman(
                TableClass::Dc,
                destination as u8,
                HuffmanTree::from_frequencies(&stats.dc)?,
            )?;
            tables.set_huffman(
                TableClass::Ac,
                destination as u8,
                HuffmanTree::from_frequencies(&stats.ac)?,
            )?;
        }
    }
    log::debug!("Huffman tables rebuilt from symbol statistics");
    Ok(())
}
