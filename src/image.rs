//! image.rs
//!
//! Image XObject and inline-image decoding: sample unpacking for 1 to 16
//! bits per component, decode arrays, indexed palettes, image masks,
//! stencil and color-key masks, soft-mask alpha and the DCT passthrough
//! into the external JPEG decoder.

use crate::canvas::{RasterImage, SamplingMode};
use crate::color::RgbColor;
use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::object::{Dictionary, Object, ObjectId, Stream};

/// A decoded, draw-ready image plus its sampling preference.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: RasterImage,
    pub sampling: SamplingMode,
}

/// Decodes an image stream (XObject or inline). `fill_color` paints the
/// 1-bits of image masks. `None` means the image cannot be drawn; a
/// warning says why.
pub fn decode_image(
    doc: &PdfDocument,
    stream: &Stream,
    id: Option<ObjectId>,
    fill_color: RgbColor,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<DecodedImage> {
    decode_image_impl(doc, stream, id, fill_color, page, warnings, 0)
}

/// `depth` bounds the mask-of-mask chain (`/SMask`, `/Mask`) against
/// self-referencing streams.
#[allow(clippy::too_many_arguments)]
fn decode_image_impl(
    doc: &PdfDocument,
    stream: &Stream,
    id: Option<ObjectId>,
    fill_color: RgbColor,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
    depth: usize,
) -> Option<DecodedImage> {
    if depth > 2 {
        return None;
    }
    let dict = &stream.dict;
    let width = int_key(doc, dict, b"Width", b"W")? as usize;
    let height = int_key(doc, dict, b"Height", b"H")? as usize;
    if width == 0 || height == 0 || width * height > 64_000_000 {
        return None;
    }
    let interpolate = bool_key(doc, dict, b"Interpolate", b"I");
    let sampling = if interpolate {
        SamplingMode::Linear
    } else {
        SamplingMode::Nearest
    };
    let is_mask = bool_key(doc, dict, b"ImageMask", b"IM");

    let bytes = match id {
        Some(id) => doc.stream_bytes(id, page, warnings).as_ref().clone(),
        None => doc.decode_stream_direct(stream, page, warnings),
    };

    // the filter chain stops at image codecs; find which one remains
    let codec = stream
        .filter_names()
        .into_iter()
        .find(|f| crate::filters::is_image_codec(f));
    if let Some(codec) = codec {
        return match codec.as_slice() {
            b"DCTDecode" | b"DCT" => {
                let image = decode_jpeg(&bytes, page, warnings)?;
                let image = apply_soft_mask(doc, dict, image, page, warnings, depth);
                Some(DecodedImage { image, sampling })
            }
            other => {
                warnings.push(PdfWarnMsg::warning(
                    page,
                    0,
                    format!(
                        "image codec /{} not supported",
                        String::from_utf8_lossy(other)
                    ),
                ));
                None
            }
        };
    }

    let bpc = if is_mask {
        1
    } else {
        int_key(doc, dict, b"BitsPerComponent", b"BPC").unwrap_or(8) as u32
    };

    if is_mask {
        let decode = decode_array(doc, dict).unwrap_or_else(|| vec![0.0, 1.0]);
        let image = decode_stencil(&bytes, width, height, &decode, fill_color);
        return Some(DecodedImage { image, sampling });
    }

    let cs_obj = dict
        .get(b"ColorSpace")
        .or_else(|_| dict.get(b"CS"))
        .ok()
        .cloned()
        .unwrap_or(Object::Name(b"DeviceGray".to_vec()));
    let colorspace = crate::color::parse_color_space(doc, &cs_obj, page, warnings);
    let n = colorspace.components().max(1);

    let decode = decode_array(doc, dict).unwrap_or_else(|| colorspace.default_decode(bpc));
    let max_val = ((1u64 << bpc.min(32)) - 1) as f32;

    let row_bits = width * n * bpc as usize;
    let row_bytes = row_bits.div_ceil(8);
    let mut out = Vec::with_capacity(width * height * 4);
    let mut comps = vec![0f32; n];
    for y in 0..height {
        let row = bytes.get(y * row_bytes..);
        let mut reader = SampleReader::new(row.unwrap_or(&[]), bpc);
        for _ in 0..width {
            for (c, slot) in comps.iter_mut().enumerate() {
                let raw = reader.next() as f32;
                let d0 = decode.get(c * 2).copied().unwrap_or(0.0);
                let d1 = decode.get(c * 2 + 1).copied().unwrap_or(max_val);
                // for indexed spaces the decode range spans palette
                // indices, so this maps raw samples straight to them
                *slot = d0 + raw * (d1 - d0) / max_val;
            }
            let rgb = colorspace.to_rgb(&comps);
            out.extend_from_slice(&rgb.to_rgba8(1.0));
        }
    }
    let image = RasterImage::from_rgba(width as u32, height as u32, out);
    let image = apply_color_key_mask(doc, dict, image, &bytes, bpc, n);
    let image = apply_stencil_mask(doc, dict, image, page, warnings, depth);
    let image = apply_soft_mask(doc, dict, image, page, warnings, depth);
    Some(DecodedImage { image, sampling })
}

/// 1-bit stencil: sample 0 paints (decode `[0 1]`), `[1 0]` inverts.
fn decode_stencil(
    bytes: &[u8],
    width: usize,
    height: usize,
    decode: &[f32],
    fill_color: RgbColor,
) -> RasterImage {
    let inverted = decode.first().copied().unwrap_or(0.0) > 0.5;
    let row_bytes = width.div_ceil(8);
    let mut out = Vec::with_capacity(width * height * 4);
    let color = fill_color.to_rgba8(1.0);
    for y in 0..height {
        for x in 0..width {
            let bit = bytes
                .get(y * row_bytes + x / 8)
                .map(|b| b >> (7 - x % 8) & 1)
                .unwrap_or(1);
            let paints = (bit == 0) != inverted;
            if paints {
                out.extend_from_slice(&color);
            } else {
                out.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    RasterImage::from_rgba(width as u32, height as u32, out)
}

fn decode_jpeg(bytes: &[u8], page: usize, warnings: &mut Vec<PdfWarnMsg>) -> Option<RasterImage> {
    match image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            Some(RasterImage::from_rgba(w, h, rgba.into_raw()))
        }
        Err(e) => {
            warnings.push(PdfWarnMsg::warning(page, 0, format!("jpeg decode: {e}")));
            None
        }
    }
}

/// `/SMask`: a grayscale image whose samples become the base image's
/// alpha, resampled to the base dimensions.
fn apply_soft_mask(
    doc: &PdfDocument,
    dict: &Dictionary,
    mut image: RasterImage,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
    depth: usize,
) -> RasterImage {
    let mask_ref = match dict.get(b"SMask") {
        Ok(Object::Reference(r)) => *r,
        _ => return image,
    };
    let mask_obj = doc.get_object(mask_ref);
    let mask_stream = match mask_obj.as_stream() {
        Ok(s) => s,
        Err(_) => return image,
    };
    let decoded = match decode_image_impl(
        doc,
        mask_stream,
        Some(mask_ref),
        RgbColor::BLACK,
        page,
        warnings,
        depth + 1,
    ) {
        Some(d) => d.image,
        None => return image,
    };
    for y in 0..image.height {
        for x in 0..image.width {
            // nearest-neighbor resample of the mask to base dimensions
            let mx = (x as u64 * u64::from(decoded.width) / u64::from(image.width)) as u32;
            let my = (y as u64 * u64::from(decoded.height) / u64::from(image.height)) as u32;
            let midx = ((my * decoded.width + mx) * 4) as usize;
            let alpha = decoded.data.get(midx).copied().unwrap_or(255);
            let idx = ((y * image.width + x) * 4 + 3) as usize;
            image.data[idx] = alpha;
        }
    }
    image
}

/// `/Mask` as a stencil stream: masked-out pixels go transparent.
fn apply_stencil_mask(
    doc: &PdfDocument,
    dict: &Dictionary,
    mut image: RasterImage,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
    depth: usize,
) -> RasterImage {
    let mask_ref = match dict.get(b"Mask") {
        Ok(Object::Reference(r)) => *r,
        _ => return image,
    };
    let mask_obj = doc.get_object(mask_ref);
    let mask_stream = match mask_obj.as_stream() {
        Ok(s) => s,
        Err(_) => return image,
    };
    let decoded = match decode_image_impl(
        doc,
        mask_stream,
        Some(mask_ref),
        RgbColor::BLACK,
        page,
        warnings,
        depth + 1,
    ) {
        Some(d) => d.image,
        None => return image,
    };
    for y in 0..image.height {
        for x in 0..image.width {
            let mx = (x as u64 * u64::from(decoded.width) / u64::from(image.width)) as u32;
            let my = (y as u64 * u64::from(decoded.height) / u64::from(image.height)) as u32;
            let midx = ((my * decoded.width + mx) * 4) as usize;
            // the stencil's painted area masks the base image OUT
            let masked = decoded.data.get(midx + 3).copied().unwrap_or(0) > 127;
            if masked {
                let idx = ((y * image.width + x) * 4 + 3) as usize;
                image.data[idx] = 0;
            }
        }
    }
    image
}

/// `/Mask` as a color-key array: samples inside every component range
/// become transparent.
fn apply_color_key_mask(
    doc: &PdfDocument,
    dict: &Dictionary,
    mut image: RasterImage,
    raw: &[u8],
    bpc: u32,
    n: usize,
) -> RasterImage {
    let ranges: Vec<i64> = match dict.get(b"Mask") {
        Ok(obj) => match &*doc.resolve(obj) {
            Object::Array(arr) => arr
                .iter()
                .filter_map(|o| doc.resolve(o).as_i64().ok())
                .collect(),
            _ => return image,
        },
        Err(_) => return image,
    };
    if ranges.len() < n * 2 {
        return image;
    }
    let width = image.width as usize;
    let row_bytes = (width * n * bpc as usize).div_ceil(8);
    for y in 0..image.height as usize {
        let mut reader = SampleReader::new(raw.get(y * row_bytes..).unwrap_or(&[]), bpc);
        for x in 0..width {
            let mut inside = true;
            for c in 0..n {
                let v = reader.next() as i64;
                if v < ranges[c * 2] || v > ranges[c * 2 + 1] {
                    inside = false;
                }
            }
            if inside {
                let idx = (y * width + x) * 4 + 3;
                image.data[idx] = 0;
            }
        }
    }
    image
}

fn decode_array(doc: &PdfDocument, dict: &Dictionary) -> Option<Vec<f32>> {
    let obj = dict.get(b"Decode").or_else(|_| dict.get(b"D")).ok()?;
    let resolved = doc.resolve(obj);
    let arr = resolved.as_array().ok()?;
    Some(
        arr.iter()
            .map(|o| doc.resolve(o).as_f32().unwrap_or(0.0))
            .collect(),
    )
}

fn int_key(doc: &PdfDocument, dict: &Dictionary, key: &[u8], abbrev: &[u8]) -> Option<i64> {
    let obj = dict.get(key).or_else(|_| dict.get(abbrev)).ok()?;
    doc.resolve(obj).as_i64().ok().filter(|v| *v >= 0)
}

fn bool_key(doc: &PdfDocument, dict: &Dictionary, key: &[u8], abbrev: &[u8]) -> bool {
    dict.get(key)
        .or_else(|_| dict.get(abbrev))
        .ok()
        .and_then(|o| doc.resolve(o).as_bool().ok())
        .unwrap_or(false)
}

/// MSB-first fixed-width sample reader over one row.
struct SampleReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    bpc: u32,
}

impl<'a> SampleReader<'a> {
    fn new(data: &'a [u8], bpc: u32) -> Self {
        SampleReader {
            data,
            bit_pos: 0,
            bpc,
        }
    }

    fn next(&mut self) -> u32 {
        let mut v: u32 = 0;
        for _ in 0..self.bpc {
            let bit = self
                .data
                .get(self.bit_pos / 8)
                .map(|b| b >> (7 - self.bit_pos % 8) & 1)
                .unwrap_or(0);
            v = v << 1 | u32::from(bit);
            self.bit_pos += 1;
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sample_reader_unpacks_sub_byte_widths() {
        let mut r = SampleReader::new(&[0b1101_0010], 2);
        assert_eq!(r.next(), 0b11);
        assert_eq!(r.next(), 0b01);
        assert_eq!(r.next(), 0b00);
        assert_eq!(r.next(), 0b10);
    }

    #[test]
    fn sample_reader_16_bit() {
        let mut r = SampleReader::new(&[0x12, 0x34], 16);
        assert_eq!(r.next(), 0x1234);
    }

    #[test]
    fn stencil_paints_zero_bits_with_fill_color() {
        // one row, 8 pixels: 0xF0 -> left half 1-bits (clear), right
        // half 0-bits (painted) under the default decode
        let img = decode_stencil(&[0xF0], 8, 1, &[0.0, 1.0], RgbColor::new(1.0, 0.0, 0.0));
        assert_eq!(&img.data[0..4], &[0, 0, 0, 0]);
        assert_eq!(&img.data[16..20], &[255, 0, 0, 255]);
    }

    #[test]
    fn stencil_decode_1_0_inverts_polarity() {
        let img = decode_stencil(&[0xF0], 8, 1, &[1.0, 0.0], RgbColor::new(1.0, 0.0, 0.0));
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&img.data[16..20], &[0, 0, 0, 0]);
    }
}
