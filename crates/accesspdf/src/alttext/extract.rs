//! Decode embedded image XObjects into bitmaps.
//!
//! Decoding tries a structured path first (JPEG for `DCTDecode`, otherwise
//! filtered samples interpreted through the declared color space, with any
//! `/SMask` applied as alpha). When that fails the decoded bytes are read
//! again using only `/Width` and `/Height`, inferring the channel count
//! from the data length. Every result is gray, RGB or RGBA.

use std::io::Cursor;

use accesspdf_core::PdfError;
use accesspdf_parse::{PdfDocument, number, stream_bytes};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Object, Stream};
use tracing::debug;

/// An image found in a document, first page 1-based.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub hash: String,
    pub page: usize,
    pub image: DynamicImage,
}

/// Decode the image whose raw stream bytes hash to `hash`.
pub fn extract_by_hash(doc: &PdfDocument, hash: &str) -> Result<Option<DynamicImage>, PdfError> {
    match doc.find_image_stream(hash) {
        Some(stream) => decode_image(doc, stream).map(Some),
        None => Ok(None),
    }
}

/// Every distinct image in page order. Images that cannot be decoded are
/// skipped.
pub fn extract_all(doc: &PdfDocument) -> Result<Vec<ExtractedImage>, PdfError> {
    let mut out = Vec::new();
    for info in doc.document_images()? {
        let Some(stream) = doc.find_image_stream(&info.hash) else {
            continue;
        };
        match decode_image(doc, stream) {
            Ok(image) => out.push(ExtractedImage {
                hash: info.hash,
                page: info.page,
                image,
            }),
            Err(e) => debug!(hash = %info.hash, error = %e, "skipping undecodable image"),
        }
    }
    Ok(out)
}

/// Decode one image XObject stream.
pub fn decode_image(doc: &PdfDocument, stream: &Stream) -> Result<DynamicImage, PdfError> {
    match decode_structured(doc, stream) {
        Ok(image) => Ok(image),
        Err(e) => {
            debug!(error = %e, "structured decode failed, trying raw samples");
            decode_raw(doc, stream).ok_or(e)
        }
    }
}

/// Downscale so the longest side is at most `max_dim` and encode as PNG.
pub fn prepare_for_provider(image: &DynamicImage, max_dim: u32) -> Result<Vec<u8>, PdfError> {
    let max_dim = max_dim.max(1);
    let resized;
    let image = if image.width().max(image.height()) > max_dim {
        resized = image.resize(max_dim, max_dim, FilterType::Lanczos3);
        debug!(
            from_w = image.width(),
            from_h = image.height(),
            to_w = resized.width(),
            to_h = resized.height(),
            "downscaled image for provider"
        );
        &resized
    } else {
        image
    };
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| PdfError::ImageError(format!("PNG encoding failed: {e}")))?;
    Ok(png)
}

/// Resolved image color space.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed { base: Box<ColorSpace>, palette: Vec<u8> },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

fn color_space(doc: &PdfDocument, obj: &Object) -> Option<ColorSpace> {
    match doc.resolve(obj) {
        Object::Name(name) => named_space(name),
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let profile = doc.resolve(items.get(1)?).as_stream().ok()?;
                    match profile.dict.get(b"N").ok().and_then(number)? as i64 {
                        1 => Some(ColorSpace::Gray),
                        3 => Some(ColorSpace::Rgb),
                        4 => Some(ColorSpace::Cmyk),
                        _ => None,
                    }
                }
                b"Indexed" => {
                    let base = color_space(doc, items.get(1)?)?;
                    let palette = match doc.resolve(items.get(3)?) {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(s) => stream_bytes(s).ok()?,
                        _ => return None,
                    };
                    Some(ColorSpace::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                other => named_space(other),
            }
        }
        _ => None,
    }
}

fn named_space(name: &[u8]) -> Option<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
        _ => None,
    }
}

fn dimension(doc: &PdfDocument, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = number(doc.resolve(dict.get(key).ok()?))?;
    (value >= 1.0).then_some(value as u32)
}

fn is_dct(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && filters[0].as_name().ok() == Some(b"DCTDecode".as_slice())
        }
        _ => false,
    }
}

fn image_error(msg: impl Into<String>) -> PdfError {
    PdfError::ImageError(msg.into())
}

fn decode_structured(doc: &PdfDocument, stream: &Stream) -> Result<DynamicImage, PdfError> {
    let dict = &stream.dict;
    let width = dimension(doc, dict, b"Width").ok_or_else(|| image_error("missing /Width"))?;
    let height = dimension(doc, dict, b"Height").ok_or_else(|| image_error("missing /Height"))?;

    let base = if is_dct(dict) {
        let decoded = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|e| image_error(format!("JPEG decode failed: {e}")))?;
        normalize(decoded)
    } else {
        let data = stream_bytes(stream).map_err(|e| image_error(e.to_string()))?;
        let stencil = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
        let (space, bpc) = if stencil {
            (ColorSpace::Gray, 1)
        } else {
            let space = dict
                .get(b"ColorSpace")
                .ok()
                .and_then(|cs| color_space(doc, cs))
                .ok_or_else(|| image_error("unsupported or missing /ColorSpace"))?;
            let bpc = dict
                .get(b"BitsPerComponent")
                .ok()
                .and_then(number)
                .map_or(8, |b| b as u32);
            (space, bpc)
        };
        samples_to_image(&data, width, height, &space, bpc)?
    };

    match soft_mask(doc, stream, base.width(), base.height()) {
        Some(alpha) => Ok(apply_alpha(&base, &alpha)),
        None => Ok(base),
    }
}

/// The `/SMask` as a gray bitmap, if it decodes at the image's size.
fn soft_mask(doc: &PdfDocument, stream: &Stream, width: u32, height: u32) -> Option<GrayImage> {
    let mask = doc.resolve(stream.dict.get(b"SMask").ok()?).as_stream().ok()?;
    let data = stream_bytes(mask).ok()?;
    let bpc = mask
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(number)
        .map_or(8, |b| b as u32);
    let mask_w = dimension(doc, &mask.dict, b"Width")?;
    let mask_h = dimension(doc, &mask.dict, b"Height")?;
    let gray = samples_to_image(&data, mask_w, mask_h, &ColorSpace::Gray, bpc)
        .ok()?
        .to_luma8();
    if gray.dimensions() != (width, height) {
        debug!("ignoring /SMask with mismatched size");
        return None;
    }
    Some(gray)
}

fn apply_alpha(base: &DynamicImage, alpha: &GrayImage) -> DynamicImage {
    let mut rgba = base.to_rgba8();
    for (pixel, a) in rgba.pixels_mut().zip(alpha.pixels()) {
        pixel.0[3] = a.0[0];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Reduce any decoded image to gray, RGB or RGBA.
fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            image
        }
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            DynamicImage::ImageRgba8(image.to_rgba8())
        }
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Split byte-aligned rows into one byte per sample. Samples narrower than
/// eight bits are scaled to 0..=255 unless `raw_indices` is set; 16-bit
/// samples keep their high byte.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bpc: u32,
    raw_indices: bool,
) -> Result<Vec<u8>, PdfError> {
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(image_error(format!("unsupported BitsPerComponent {bpc}")));
    }
    let per_row = width as usize * components;
    let row_bytes = (per_row * bpc as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(image_error(format!(
            "image data too short: {} bytes, expected {needed}",
            data.len()
        )));
    }

    let mut out = Vec::with_capacity(per_row * height as usize);
    for row in data[..needed].chunks_exact(row_bytes) {
        match bpc {
            8 => out.extend_from_slice(&row[..per_row]),
            16 => out.extend(row.chunks_exact(2).take(per_row).map(|pair| pair[0])),
            _ => {
                let max = (1u32 << bpc) - 1;
                let per_byte = 8 / bpc as usize;
                for i in 0..per_row {
                    let byte = row[i / per_byte];
                    let shift = 8 - bpc as usize * (i % per_byte + 1);
                    let value = (u32::from(byte) >> shift) & max;
                    out.push(if raw_indices {
                        value as u8
                    } else {
                        (value * 255 / max) as u8
                    });
                }
            }
        }
    }
    Ok(out)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u32::from(cmyk[3]);
    let channel = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

fn samples_to_image(
    data: &[u8],
    width: u32,
    height: u32,
    space: &ColorSpace,
    bpc: u32,
) -> Result<DynamicImage, PdfError> {
    let indexed = matches!(space, ColorSpace::Indexed { .. });
    let samples = unpack_samples(data, width, height, space.components(), bpc, indexed)?;
    let buffer_error = || image_error("sample buffer does not match dimensions");
    match space {
        ColorSpace::Gray => GrayImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(buffer_error),
        ColorSpace::Rgb => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(buffer_error),
        ColorSpace::Cmyk => {
            let rgb: Vec<u8> = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(buffer_error)
        }
        ColorSpace::Indexed { base, palette } => {
            let stride = base.components();
            let mut rgb = Vec::with_capacity(samples.len() * 3);
            for index in samples {
                let start = usize::from(index) * stride;
                let entry = palette
                    .get(start..start + stride)
                    .ok_or_else(|| image_error(format!("palette index {index} out of range")))?;
                match base.as_ref() {
                    ColorSpace::Gray => rgb.extend_from_slice(&[entry[0]; 3]),
                    ColorSpace::Rgb => rgb.extend_from_slice(entry),
                    ColorSpace::Cmyk => rgb.extend_from_slice(&cmyk_to_rgb(entry)),
                    ColorSpace::Indexed { .. } => {
                        return Err(image_error("nested /Indexed color space"));
                    }
                }
            }
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(buffer_error)
        }
    }
}

/// Fallback: 8-bit samples whose channel count is inferred from the
/// length of the decoded (or, failing that, raw) bytes.
fn decode_raw(doc: &PdfDocument, stream: &Stream) -> Option<DynamicImage> {
    let width = dimension(doc, &stream.dict, b"Width")?;
    let height = dimension(doc, &stream.dict, b"Height")?;
    let data = stream_bytes(stream).unwrap_or_else(|_| stream.content.clone());
    let pixels = width as usize * height as usize;
    let space = match data.len() / pixels {
        0 => return None,
        1 | 2 => ColorSpace::Gray,
        3 => ColorSpace::Rgb,
        _ => ColorSpace::Cmyk,
    };
    let size = pixels * space.components();
    samples_to_image(&data[..size], width, height, &space, 8).ok()
}
