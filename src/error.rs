use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid Huffman table: {0}")]
    InvalidHuffmanTable(String),

    #[error("Symbol {0:#04x} has no code in this Huffman table")]
    UnknownSymbol(u8),

    #[error("Huffman tree walk exceeded {0} steps")]
    TreeWalkLimit(usize),

    #[error("Invalid Huffman code in stream: {0}")]
    InvalidCode(String),

    #[error("Invalid quantization table: {0}")]
    InvalidQuantTable(String),

    #[error("Unsupported LZW code size: {0}")]
    InvalidCodeSize(u8),

    #[error("Corrupt LZW stream: {0}")]
    CorruptLzw(String),

    #[error("Unsupported form factor: {0:#04x}")]
    UnsupportedFormFactor(u8),

    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
