pub mod gif;
pub mod tables;

pub use gif::{decode_frame_data, encode_frame_data, FrameData};
pub use tables::{TableSegments, TableSet};
