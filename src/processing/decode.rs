//! JPEG decoding into zero-padded, power-of-two pixel buffers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use jpeg_decoder::{Decoder as JpegDecoder, PixelFormat as JpegPixelFormat};
use tracing::debug;

use crate::error::Error;
use crate::processing::layout::{ImageGeometry, ScreenGeometry, padded_dimension};

/// Byte layout of a [`PaddedPixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel.
    Luminance,
    /// Three bytes per pixel, red first.
    Rgb,
}

impl PixelFormat {
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Luminance => 1,
            Self::Rgb => 3,
        }
    }
}

/// Decoded pixels placed in the top-left corner of a power-of-two canvas.
/// Everything outside the natural image is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedPixelBuffer {
    width: u32,
    height: u32,
    natural_width: u32,
    natural_height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PaddedPixelBuffer {
    /// Allocate a zero-filled buffer large enough for a
    /// `natural_width x natural_height` image.
    #[must_use]
    pub fn zeroed(natural_width: u32, natural_height: u32, format: PixelFormat) -> Self {
        let width = padded_dimension(natural_width);
        let height = padded_dimension(natural_height);
        let len = width as usize * height as usize * format.components();
        Self {
            width,
            height,
            natural_width,
            natural_height,
            format,
            data: vec![0; len],
        }
    }

    /// Copy one decoded scanline into row `y`. Bytes beyond the natural
    /// width are ignored.
    pub fn write_row(&mut self, y: u32, scanline: &[u8]) {
        if y >= self.natural_height {
            return;
        }
        let components = self.format.components();
        let stride = self.width as usize * components;
        let natural = (self.natural_width as usize * components).min(scanline.len());
        let start = y as usize * stride;
        self.data[start..start + natural].copy_from_slice(&scanline[..natural]);
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn natural_size(&self) -> (u32, u32) {
        (self.natural_width, self.natural_height)
    }

    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Expand to tightly packed RGBA8 with opaque alpha, the layout GPU
    /// textures accept.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        match self.format {
            PixelFormat::Luminance => {
                for &v in &self.data {
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
            }
            PixelFormat::Rgb => {
                for chunk in self.data.chunks_exact(3) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
                }
            }
        }
        rgba
    }
}

/// A decoded image ready for upload: padded pixels plus layout.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub geometry: ImageGeometry,
    pub pixels: PaddedPixelBuffer,
}

/// Decodes JPEG files against a fixed screen aspect.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    screen: ScreenGeometry,
    max_padded_dimension: u32,
}

impl ImageDecoder {
    #[must_use]
    pub const fn new(screen: ScreenGeometry) -> Self {
        Self {
            screen,
            max_padded_dimension: u32::MAX,
        }
    }

    /// Reject images whose padded width or height would exceed `max`,
    /// before any pixel data is decoded.
    #[must_use]
    pub const fn with_max_padded_dimension(mut self, max: u32) -> Self {
        self.max_padded_dimension = max;
        self
    }

    /// Decode `path` into a padded buffer and compute its geometry.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] when the file cannot be opened, is not a
    /// valid JPEG, uses a pixel format other than 8-bit gray, RGB or CMYK,
    /// or pads beyond the configured maximum dimension.
    pub fn decode(&self, path: &Path) -> Result<DecodedImage, Error> {
        let file = File::open(path).map_err(|err| Error::decode(path, err))?;
        let mut decoder = JpegDecoder::new(BufReader::new(file));
        decoder.read_info().map_err(|err| jpeg_error(path, err))?;
        let info = decoder
            .info()
            .ok_or_else(|| Error::decode(path, "missing image info"))?;
        let width = u32::from(info.width);
        let height = u32::from(info.height);
        if width == 0 || height == 0 {
            return Err(Error::decode(path, "image has no pixels"));
        }
        let padded = (padded_dimension(width), padded_dimension(height));
        if padded.0 > self.max_padded_dimension || padded.1 > self.max_padded_dimension {
            return Err(Error::decode(
                path,
                format!(
                    "padded size {}x{} exceeds the {} texel limit",
                    padded.0, padded.1, self.max_padded_dimension
                ),
            ));
        }

        let pixels = decoder.decode().map_err(|err| jpeg_error(path, err))?;
        let (format, scanlines) = match info.pixel_format {
            JpegPixelFormat::L8 => (PixelFormat::Luminance, pixels),
            JpegPixelFormat::RGB24 => (PixelFormat::Rgb, pixels),
            JpegPixelFormat::CMYK32 => (PixelFormat::Rgb, cmyk_to_rgb(&pixels)),
            JpegPixelFormat::L16 => {
                return Err(Error::decode(path, "16-bit grayscale JPEGs are not supported"));
            }
        };

        let row_len = width as usize * format.components();
        if scanlines.len() < row_len * height as usize {
            return Err(Error::decode(path, "decoder returned truncated pixel data"));
        }

        let mut buffer = PaddedPixelBuffer::zeroed(width, height, format);
        for (y, row) in (0..height).zip(scanlines.chunks_exact(row_len)) {
            buffer.write_row(y, row);
        }

        let geometry = ImageGeometry::compute(width, height, self.screen);
        debug!(
            path = %path.display(),
            width,
            height,
            padded_width = buffer.width(),
            padded_height = buffer.height(),
            format = ?format,
            "decoded jpeg"
        );
        Ok(DecodedImage {
            geometry,
            pixels: buffer,
        })
    }
}

fn jpeg_error(path: &Path, err: jpeg_decoder::Error) -> Error {
    match err {
        jpeg_decoder::Error::Unsupported(feature) => {
            Error::decode(path, format!("unsupported JPEG feature: {feature:?}"))
        }
        other => Error::decode(path, other),
    }
}

fn cmyk_to_rgb(pixels: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    for chunk in pixels.chunks_exact(4) {
        let c = f32::from(chunk[0]) / 255.0;
        let m = f32::from(chunk[1]) / 255.0;
        let y = f32::from(chunk[2]) / 255.0;
        let k = f32::from(chunk[3]) / 255.0;
        let c = c * (1.0 - k) + k;
        let m = m * (1.0 - k) + k;
        let y = y * (1.0 - k) + k;
        let r = ((1.0 - c) * 255.0).round().clamp(0.0, 255.0) as u8;
        let g = ((1.0 - m) * 255.0).round().clamp(0.0, 255.0) as u8;
        let b = ((1.0 - y) * 255.0).round().clamp(0.0, 255.0) as u8;
        rgb.extend_from_slice(&[r, g, b]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_land_top_left_and_padding_stays_zero() {
        let mut buf = PaddedPixelBuffer::zeroed(3, 2, PixelFormat::Rgb);
        assert_eq!((buf.width(), buf.height()), (4, 2));
        buf.write_row(0, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        buf.write_row(1, &[10, 11, 12, 13, 14, 15, 16, 17, 18]);
        buf.write_row(2, &[99; 9]);

        let bytes = buf.as_bytes();
        assert_eq!(bytes.len(), 4 * 2 * 3);
        assert_eq!(&bytes[0..9], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&bytes[9..12], &[0, 0, 0]);
        assert_eq!(&bytes[12..21], &[10, 11, 12, 13, 14, 15, 16, 17, 18]);
        assert_eq!(&bytes[21..24], &[0, 0, 0]);
    }

    #[test]
    fn luminance_expands_to_gray_rgba() {
        let mut buf = PaddedPixelBuffer::zeroed(1, 1, PixelFormat::Luminance);
        buf.write_row(0, &[200]);
        let rgba = buf.to_rgba8();
        assert_eq!(rgba.len(), 2 * 2 * 4);
        assert_eq!(&rgba[0..4], &[200, 200, 200, 255]);
        assert_eq!(&rgba[4..8], &[0, 0, 0, 255]);
    }

    #[test]
    fn cmyk_black_and_white() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
    }

    #[test]
    fn missing_file_is_a_decode_failure() {
        let decoder = ImageDecoder::new(ScreenGeometry::new(1920, 1080));
        let err = decoder
            .decode(Path::new("/definitely/not/here.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }), "unexpected error: {err:?}");
    }
}
