use crate::compression::mcu::{PlanarImage, Plane};
use crate::config::{GifConfig, JpegConfig};
use crate::decoder::DecodedFrame;
use crate::encoder::{EncodedScan, JpegEncoderPipeline};
use crate::error::{CodecError, CodecResult};
use crate::format::gif::{decode_frame_data, encode_frame_data, FrameData};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

/// Full-range BT.601 (JFIF).
pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.168736 * r - 0.331264 * g + 0.5 * b;
    let cr = 0.5 * r - 0.418688 * g - 0.081312 * b;
    (y, cb, cr)
}

/// Inverse of [`rgb_to_ycbcr`]; chroma is centred on zero.
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (f32, f32, f32) {
    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;
    (r, g, b)
}

fn is_grayscale(image: &DynamicImage) -> bool {
    !image.color().has_color()
}

/// Splits an image into Y (grayscale sources) or Y, Cb, Cr planes.
/// 12-bit planes are filled from the 16-bit form of the image.
pub fn image_to_planes(image: &DynamicImage, precision: u8) -> CodecResult<PlanarImage> {
    if precision != 8 && precision != 12 {
        return Err(CodecError::ConfigError(format!(
            "sample precision {} unsupported",
            precision
        )));
    }
    let (width, height) = (image.width() as usize, image.height() as usize);
    let max = ((1u32 << precision) - 1) as f32;
    let offset = (1u32 << (precision - 1)) as f32;
    let quantize = |v: f32| v.round().clamp(0.0, max) as u16;

    let pixels: Vec<[f32; 3]> = if precision > 8 {
        let shift = 16 - precision as u32;
        image
            .to_rgb16()
            .pixels()
            .map(|p| p.0.map(|c| (c >> shift) as f32))
            .collect()
    } else {
        image
            .to_rgb8()
            .pixels()
            .map(|p| p.0.map(|c| c as f32))
            .collect()
    };

    let planes = if is_grayscale(image) {
        let luma = pixels.iter().map(|p| quantize(p[0])).collect();
        vec![Plane::from_data(width, height, luma)?]
    } else {
        let mut y = Vec::with_capacity(pixels.len());
        let mut cb = Vec::with_capacity(pixels.len());
        let mut cr = Vec::with_capacity(pixels.len());
        for p in &pixels {
            let (yv, cbv, crv) = rgb_to_ycbcr(p[0], p[1], p[2]);
            y.push(quantize(yv));
            cb.push(quantize(cbv + offset));
            cr.push(quantize(crv + offset));
        }
        vec![
            Plane::from_data(width, height, y)?,
            Plane::from_data(width, height, cb)?,
            Plane::from_data(width, height, cr)?,
        ]
    };
    PlanarImage::from_planes(planes, precision)
}

/// Rebuilds an 8-bit (or, for 12-bit planes, 16-bit) image.
pub fn planes_to_image(planes: &PlanarImage) -> CodecResult<DynamicImage> {
    let (width, height) = (planes.width as u32, planes.height as u32);
    let precision = planes.precision;
    let max = ((1u32 << precision) - 1) as f32;
    let offset = (1u32 << (precision - 1)) as f32;
    let wide = precision > 8;
    let shift = 16 - precision as u32;

    match planes.planes.as_slice() {
        [luma] => {
            if wide {
                let data: Vec<u16> = luma.data.iter().map(|&v| v << shift).collect();
                let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, data)
                    .ok_or_else(|| CodecError::DecodingError("luma buffer size".into()))?;
                Ok(DynamicImage::ImageLuma16(img))
            } else {
                let data: Vec<u8> = luma.data.iter().map(|&v| v as u8).collect();
                let img = GrayImage::from_raw(width, height, data)
                    .ok_or_else(|| CodecError::DecodingError("luma buffer size".into()))?;
                Ok(DynamicImage::ImageLuma8(img))
            }
        }
        [y, cb, cr] => {
            let mut rgb = Vec::with_capacity(y.data.len() * 3);
            for i in 0..y.data.len() {
                let (r, g, b) = ycbcr_to_rgb(
                    y.data[i] as f32,
                    cb.data[i] as f32 - offset,
                    cr.data[i] as f32 - offset,
                );
                rgb.extend([r, g, b].map(|c| c.round().clamp(0.0, max) as u16));
            }
            if wide {
                let data: Vec<u16> = rgb.into_iter().map(|v| v << shift).collect();
                let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(width, height, data)
                    .ok_or_else(|| CodecError::DecodingError("RGB buffer size".into()))?;
                Ok(DynamicImage::ImageRgb16(img))
            } else {
                let data: Vec<u8> = rgb.into_iter().map(|v| v as u8).collect();
                let img = RgbImage::from_raw(width, height, data)
                    .ok_or_else(|| CodecError::DecodingError("RGB buffer size".into()))?;
                Ok(DynamicImage::ImageRgb8(img))
            }
        }
        other => Err(CodecError::DecodingError(format!(
            "{} planes cannot form an image",
            other.len()
        ))),
    }
}

/// Maps luma onto `2^code_size` evenly spaced grey levels.
pub fn image_to_indices(image: &DynamicImage, code_size: u8) -> Vec<u8> {
    let levels = 1u32 << code_size;
    image
        .to_luma8()
        .pixels()
        .map(|p| ((p.0[0] as u32 * levels) / 256) as u8)
        .collect()
}

pub fn indices_to_image(
    indices: &[u8],
    width: u32,
    height: u32,
    code_size: u8,
) -> CodecResult<DynamicImage> {
    let top = (1u32 << code_size) - 1;
    let data: Vec<u8> = indices
        .iter()
        .map(|&i| ((i as u32).min(top) * 255 / top.max(1)) as u8)
        .collect();
    let img = GrayImage::from_raw(width, height, data)
        .ok_or_else(|| CodecError::DecodingError("index count does not match size".into()))?;
    Ok(DynamicImage::ImageLuma8(img))
}

/// Peak signal-to-noise ratio over the RGB channels, in dB.
pub fn psnr(a: &DynamicImage, b: &DynamicImage) -> f64 {
    let (a, b) = (a.to_rgb8(), b.to_rgb8());
    let count = a.as_raw().len().min(b.as_raw().len());
    if count == 0 {
        return 0.0;
    }
    let mse: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        / count as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}

/// Outcome of a JPEG encode/decode round trip.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    pub scan: EncodedScan,
    pub frame: DecodedFrame,
    pub image: DynamicImage,
}

pub struct RasterConverter {
    jpeg: JpegConfig,
    gif: GifConfig,
}

impl RasterConverter {
    pub fn new() -> Self {
        Self {
            jpeg: JpegConfig::default(),
            gif: GifConfig::default(),
        }
    }

    pub fn with_jpeg(mut self, config: JpegConfig) -> Self {
        self.jpeg = config;
        self
    }

    pub fn with_gif(mut self, config: GifConfig) -> Self {
        self.gif = config;
        self
    }

    pub fn encode_jpeg(&self, image: &DynamicImage) -> CodecResult<EncodedScan> {
        let planes = image_to_planes(image, self.jpeg.precision)?;
        JpegEncoderPipeline::new(planes.width, planes.height, self.jpeg.clone())?.encode(&planes)
    }

    pub fn jpeg_roundtrip(&self, image: &DynamicImage) -> CodecResult<RoundTrip> {
        let scan = self.encode_jpeg(image)?;
        let frame = scan.decoder()?.decode(&scan.data)?;
        let image = planes_to_image(&frame.image)?;
        Ok(RoundTrip { scan, frame, image })
    }

    /// GIF image data for the image reduced to grey palette indices.
    pub fn encode_gif_frame(&self, image: &DynamicImage) -> CodecResult<Vec<u8>> {
        let indices = image_to_indices(image, self.gif.min_code_size);
        encode_frame_data(&indices, &self.gif)
    }

    pub fn decode_gif_frame(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> CodecResult<(DynamicImage, FrameData)> {
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(CodecError::DecodingError(format!(
                "GIF frame {}x{} exceeds 65535x65535",
                width, height
            )));
        }
        let frame = decode_frame_data(data, width as usize * height as usize)?;
        let code_size = data.first().copied().unwrap_or(self.gif.min_code_size);
        let image = indices_to_image(&frame.indices, width, height, code_size)?;
        Ok((image, frame))
    }
}

impl Default for RasterConverter {
    fn default() -> Self {
        Self::new()
    }
}
