pub mod bitio;
pub mod dct;
pub mod huffman;
pub mod huffman_codec;
pub mod lzw;
pub mod mcu;
pub mod quantizer;

pub use bitio::{BitOrder, BitReader, BitWriter};
pub use dct::{
    forward_dct, inverse_dct, level_shift_down, level_shift_up, zigzag_scan, zigzag_unscan,
    DataUnit, SampleBlock, ZIGZAG_ORDER,
};
pub use huffman::{EncodedUnit, HuffmanCursor, HuffmanTree, TableClass};
pub use huffman_codec::{
    huffman_encode, CoefficientBits, HuffmanDecoder, HuffmanEncoder, JpegCoefficientDecoder,
    JpegCoefficientEncoder, SymbolStatistics,
};
pub use lzw::{lzw_decode, lzw_encode, LzwDecoder, LzwEncoder};
pub use mcu::{ChannelMcu, FormFactor, Mcu, PlanarImage, Plane, SamplingFactors};
pub use quantizer::{QuantPrecision, QuantizationTable};
