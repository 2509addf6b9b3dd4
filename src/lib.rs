pub mod compression;
pub mod config;
pub mod converter;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;

pub use compression::{
    lzw_decode, lzw_encode, BitOrder, BitReader, BitWriter, FormFactor, HuffmanTree, LzwDecoder,
    LzwEncoder, PlanarImage, Plane, QuantizationTable,
};
pub use config::{GifConfig, JpegConfig};
pub use converter::RasterConverter;
pub use decoder::{DecodedFrame, JpegDecoderPipeline};
pub use encoder::{ComponentSpec, EncodedScan, JpegEncoderPipeline};
pub use error::{CodecError, CodecResult};
pub use format::tables::TableSet;

pub const VERSION: &str = "0.3.0";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::huffman::TableClass;
    use image::{DynamicImage, RgbImage};

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, 160])
        }))
    }

    #[test]
    fn test_jpeg_roundtrip_through_segments() {
        let img = test_image(40, 24);
        let scan = RasterConverter::new()
            .with_jpeg(JpegConfig::subsampled(85))
            .encode_jpeg(&img)
            .unwrap();

        // Rebuild the decoder from serialized tables only.
        let segments = scan.tables.to_segments();
        let mut tables = TableSet::new();
        tables.add_dqt(&segments.dqt).unwrap();
        tables.add_dht(&segments.dht).unwrap();

        let decoder =
            JpegDecoderPipeline::new(40, 24, scan.components.clone(), tables).unwrap();
        let frame = decoder.decode(&scan.data).unwrap();
        assert!(frame.clean);
        assert_eq!(frame.mcus_decoded, scan.mcus);

        let out = converter::planes_to_image(&frame.image).unwrap();
        assert!(converter::psnr(&img, &out) > 28.0);
    }

    #[test]
    fn test_optimized_tables_travel_in_dht() {
        let img = test_image(32, 32);
        let scan = RasterConverter::new()
            .with_jpeg(JpegConfig::lossy(75).with_optimized_huffman())
            .encode_jpeg(&img)
            .unwrap();
        let standard = HuffmanTree::ac_luminance();
        let optimized = scan.tables.huffman(TableClass::Ac, 0).unwrap();
        assert_ne!(optimized.symbols(), standard.symbols());

        let segments = scan.tables.to_segments();
        let mut tables = TableSet::new();
        tables.add_dqt(&segments.dqt).unwrap();
        tables.add_dht(&segments.dht).unwrap();
        let frame = JpegDecoderPipeline::new(32, 32, scan.components.clone(), tables)
            .unwrap()
            .decode(&scan.data)
            .unwrap();
        assert!(frame.clean);
    }

    #[test]
    fn test_huffman_scenario_bytes() {
        // DC luminance: symbol 0 -> 00, 5 -> 110, 11 -> 111111110
        let tree = HuffmanTree::dc_luminance();
        let bytes = compression::huffman_encode(&tree, &[0, 5, 11]).unwrap();
        // 00 110 111111110, then padded with ones
        assert_eq!(bytes, vec![0b0011_0111, 0b1111_1011]);

        let decoded: Vec<u8> = compression::HuffmanDecoder::new(&tree, &bytes)
            .with_expected_len(3)
            .collect();
        assert_eq!(decoded, vec![0, 5, 11]);
    }

    #[test]
    fn test_lzw_scenario() {
        let encoded = lzw_encode(b"AAAABBBCCCC", 8).unwrap();
        let (decoded, clean) = lzw_decode(&encoded, 8).unwrap();
        assert_eq!(decoded, b"AAAABBBCCCC");
        assert!(clean);
        // ten 9-bit codes
        assert_eq!(encoded.len(), 12);
    }

    #[test]
    fn test_gif_layer_with_converter() {
        let img = test_image(30, 20);
        let converter = RasterConverter::new().with_gif(GifConfig::for_palette(64));
        let data = converter.encode_gif_frame(&img).unwrap();
        let (decoded, frame) = converter.decode_gif_frame(&data, 30, 20).unwrap();
        assert!(frame.clean);
        assert_eq!(decoded.width(), 30);
        assert_eq!(decoded.height(), 20);
    }
}
