//! Raster images as PDF image XObjects.

use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Object, Stream};

use crate::error::{Error, Result};

/// A decoded image, ready to be drawn onto a generated page.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    width: u32,
    height: u32,
    stream: Stream,
}

impl PreparedImage {
    /// Decode `bytes` (JPEG, PNG, GIF, BMP or WebP).
    ///
    /// Three-component and greyscale JPEGs are passed through untouched as
    /// DCTDecode. Anything else (CMYK and Adobe-transformed JPEGs included)
    /// is decoded to 8-bit RGB, with transparency flattened onto white, and
    /// Flate-compressed when the document is saved.
    pub fn decode(bytes: &[u8], source_url: &str) -> Result<Self> {
        let decode_error = |reason: String| Error::ImageDecode {
            source_url: source_url.to_string(),
            reason,
        };

        let format = image::guess_format(bytes).map_err(|e| decode_error(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| decode_error(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(decode_error("image has no pixels".to_string()));
        }

        // The decoder converts CMYK to RGB, so the colour space of the
        // passed-through bytes comes from the JPEG header itself.
        let passthrough = match format {
            ImageFormat::Jpeg => jpeg_color_space(bytes),
            _ => None,
        };
        let stream = match passthrough {
            Some(color_space) => jpeg_stream(bytes, width, height, color_space),
            None => rgb_stream(&decoded),
        };

        tracing::debug!(
            "Decoded {:?} image {}x{} from {}",
            format,
            width,
            height,
            source_url
        );

        Ok(Self {
            width,
            height,
            stream,
        })
    }

    /// Natural size in pixels.
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn into_stream(self) -> Stream {
        self.stream
    }
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}

/// Colour space for embedding a JPEG as-is, from its frame header.
///
/// `None` when the image has to be re-encoded: any component count other
/// than 1 or 3, an Adobe APP14 colour transform, or a header that can't be
/// read.
fn jpeg_color_space(bytes: &[u8]) -> Option<&'static [u8]> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // standalone markers
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // start of scan or end of image before any frame header
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let length = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        if length < 2 {
            return None;
        }
        let segment = bytes.get(pos + 4..pos + 2 + length)?;

        match marker {
            0xEE if segment.starts_with(b"Adobe") => return None,
            // SOF0..SOF15, except DHT (C4), JPG (C8) and DAC (CC)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return match segment.get(5)? {
                    1 => Some(b"DeviceGray"),
                    3 => Some(b"DeviceRGB"),
                    _ => None,
                };
            }
            _ => {}
        }

        pos += 2 + length;
    }

    None
}

fn jpeg_stream(bytes: &[u8], width: u32, height: u32, color_space: &[u8]) -> Stream {
    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    Stream::new(dict, bytes.to_vec()).with_compression(false)
}

fn rgb_stream(decoded: &DynamicImage) -> Stream {
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        for channel in [r, g, b] {
            rgb.push(over_white(channel, a));
        }
    }

    Stream::new(image_dict(width, height, b"DeviceRGB"), rgb).with_compression(true)
}

/// Composite one channel over a white background.
#[allow(clippy::cast_possible_truncation)]
const fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u16, alpha as u16);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Scale `(width, height)` to fit inside `(max_width, max_height)` keeping
/// the aspect ratio: fit the width first, then refit to the height if it
/// still overflows. Scales up as well as down.
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }

    let mut w = max_width;
    let mut h = w * height / width;
    if h > max_height {
        h = max_height;
        w = h * width / height;
    }
    (w, h)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, Rgba};
    use std::io::Cursor;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_jpeg_passthrough() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 6, Rgb([10, 200, 30])));
        let bytes = encode(&img, ImageFormat::Jpeg);

        let prepared = PreparedImage::decode(&bytes, "nid-front.jpg").unwrap();
        assert_eq!(prepared.dimensions(), (8, 6));

        let stream = prepared.into_stream();
        assert_eq!(stream.dict.get(b"Filter").unwrap(), &Object::Name(b"DCTDecode".to_vec()));
        assert_eq!(stream.content, bytes);
    }

    #[test]
    fn test_greyscale_jpeg_passthrough() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(4, 4, Luma([128])));
        let bytes = encode(&img, ImageFormat::Jpeg);

        let stream = PreparedImage::decode(&bytes, "scan.jpg").unwrap().into_stream();
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap(), &Object::Name(b"DeviceGray".to_vec()));
        assert_eq!(stream.content, bytes);
    }

    #[test]
    fn test_cmyk_jpeg_reencoded() {
        let mut bytes = Vec::new();
        let cmyk = [0u8, 255, 255, 0].repeat(4 * 4);
        jpeg_encoder::Encoder::new(&mut bytes, 90)
            .encode(&cmyk, 4, 4, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        assert_eq!(jpeg_color_space(&bytes), None);

        let prepared = PreparedImage::decode(&bytes, "nid-back.jpg").unwrap();
        assert_eq!(prepared.dimensions(), (4, 4));

        let stream = prepared.into_stream();
        assert!(stream.dict.get(b"Filter").is_err());
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap(), &Object::Name(b"DeviceRGB".to_vec()));
        assert_eq!(stream.content.len(), 4 * 4 * 3);
    }

    #[test]
    fn test_jpeg_header_scan() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(2, 2, Rgb([1, 2, 3])));
        let rgb = encode(&img, ImageFormat::Jpeg);
        assert_eq!(jpeg_color_space(&rgb), Some(&b"DeviceRGB"[..]));

        // Adobe APP14 segment ahead of the frame header
        let mut adobe = vec![0xFF, 0xD8, 0xFF, 0xEE, 0x00, 0x0E];
        adobe.extend_from_slice(b"Adobe\x00\x64\x00\x00\x00\x00\x01");
        adobe.extend_from_slice(&rgb[2..]);
        assert_eq!(jpeg_color_space(&adobe), None);

        assert_eq!(jpeg_color_space(&rgb[..20]), None);
        assert_eq!(jpeg_color_space(b"\x89PNG"), None);
    }

    #[test]
    fn test_png_alpha_flattened_on_white() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(2, 3, Rgba([0, 0, 0, 0])));
        let bytes = encode(&img, ImageFormat::Png);

        let stream = PreparedImage::decode(&bytes, "photo.png").unwrap().into_stream();
        assert!(stream.dict.get(b"Filter").is_err());
        assert_eq!(stream.content.len(), 2 * 3 * 3);
        assert!(stream.content.iter().all(|&b| b == 255));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = PreparedImage::decode(b"<html>404</html>", "https://cdn/x.png").unwrap_err();
        assert!(matches!(err, Error::ImageDecode { .. }));
        assert!(err.is_per_file());
    }

    #[test]
    fn test_over_white() {
        assert_eq!(over_white(0, 255), 0);
        assert_eq!(over_white(0, 0), 255);
        assert_eq!(over_white(100, 255), 100);
    }

    #[test]
    fn test_portrait_into_landscape_box() {
        // 3:4 image into a 4:3 box: height bound, width = box height * 3/4
        let (w, h) = fit_within(300.0, 400.0, 160.0, 120.0);
        assert!((h - 120.0).abs() < 0.001);
        assert!((w - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_landscape_fits_width() {
        let (w, h) = fit_within(400.0, 200.0, 190.0, 200.0);
        assert!((w - 190.0).abs() < 0.001);
        assert!((h - 95.0).abs() < 0.001);
    }

    #[test]
    fn test_small_image_scales_up() {
        let (w, h) = fit_within(10.0, 10.0, 100.0, 50.0);
        assert!((w - 50.0).abs() < 0.001);
        assert!((h - 50.0).abs() < 0.001);
    }
}
