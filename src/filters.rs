//! filters.rs
//!
//! Stream decoding. Filters compose left to right, each consuming the
//! previous buffer. Byte-oriented filters are decoded here; the image
//! codec filters (DCT, JBIG2, JPX) pass through unchanged and are handed
//! to their decoders by the image renderer. Decryption happens before any
//! filter runs and is owned by the document.

use std::io::Read;

use crate::errors::{PdfError, PdfWarnMsg};
use crate::object::{Dictionary, Object, Stream};

/// Filters whose output is pixels, not bytes. `decode_stream` leaves
/// their input untouched.
pub(crate) fn is_image_codec(name: &[u8]) -> bool {
    matches!(name, b"DCTDecode" | b"DCT" | b"JPXDecode" | b"JBIG2Decode")
}

/// Decode parameters for the filter at `index`: `/DecodeParms` (or `/DP`)
/// is either a single dictionary or an array parallel to the filter list.
pub(crate) fn decode_parms(dict: &Dictionary, index: usize) -> Option<Dictionary> {
    let parms = dict
        .get(b"DecodeParms")
        .or_else(|_| dict.get(b"DP"))
        .ok()?;
    match parms {
        Object::Dictionary(d) if index == 0 => Some(d.clone()),
        Object::Array(arr) => match arr.get(index) {
            Some(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Runs the byte-oriented filter chain. Image codec filters terminate the
/// chain with the bytes passed through. A failed filter yields
/// `CorruptStream`; truncated input keeps whatever decoded so far.
pub fn decode_stream(
    stream: &Stream,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Result<Vec<u8>, PdfError> {
    let mut data = stream.content.clone();
    for (i, name) in stream.filter_names().iter().enumerate() {
        if is_image_codec(name) {
            return Ok(data);
        }
        let parms = decode_parms(&stream.dict, i);
        data = apply_filter(name, &data, parms.as_ref(), page, warnings)?;
    }
    Ok(data)
}

pub(crate) fn apply_filter(
    name: &[u8],
    data: &[u8],
    parms: Option<&Dictionary>,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Result<Vec<u8>, PdfError> {
    match name {
        b"FlateDecode" | b"Fl" => {
            let out = flate_decode(data)?;
            apply_predictor(out, parms)
        }
        b"LZWDecode" | b"LZW" => {
            let out = lzw_decode(data, parms)?;
            apply_predictor(out, parms)
        }
        b"ASCII85Decode" | b"A85" => ascii85_decode(data),
        b"ASCIIHexDecode" | b"AHx" => asciihex_decode(data),
        b"RunLengthDecode" | b"RL" => runlength_decode(data),
        b"CCITTFaxDecode" | b"CCF" => {
            let params = crate::ccitt::CcittParams::from_dict(parms);
            crate::ccitt::decode_g3_g4(data, &params)
        }
        b"Crypt" => {
            // the document's security handler already ran; only the
            // Identity transform remains meaningful here
            let is_identity = parms
                .and_then(|p| p.get(b"Name").ok())
                .and_then(|n| n.as_name().ok().map(|n| n == b"Identity"))
                .unwrap_or(true);
            if !is_identity {
                warnings.push(PdfWarnMsg::warning(
                    page,
                    0,
                    "non-identity Crypt filter without handler".to_string(),
                ));
            }
            Ok(data.to_vec())
        }
        other => {
            warnings.push(PdfWarnMsg::warning(
                page,
                0,
                format!("unknown filter {:?}", String::from_utf8_lossy(other)),
            ));
            Ok(data.to_vec())
        }
    }
}

/// zlib wrapper first, raw deflate as fallback (broken producers omit the
/// wrapper). Truncated input keeps the decoded prefix.
fn flate_decode(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    fn drain(mut reader: impl Read) -> (Vec<u8>, bool) {
        let mut out = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => return (out, true),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(_) => return (out, false),
            }
        }
    }
    let (out, clean) = drain(flate2::read::ZlibDecoder::new(data));
    if clean || !out.is_empty() {
        return Ok(out);
    }
    let (out, clean) = drain(flate2::read::DeflateDecoder::new(data));
    if clean || !out.is_empty() {
        return Ok(out);
    }
    Err(PdfError::CorruptStream("flate: no decodable data".to_string()))
}

fn lzw_decode(data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>, PdfError> {
    let early_change = parms
        .and_then(|p| p.get(b"EarlyChange").ok())
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(1);
    let mut decoder = if early_change == 0 {
        weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
    } else {
        weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    };
    let mut out = Vec::new();
    let mut buf = vec![0u8; 8192];
    let mut input = data;
    loop {
        let res = decoder.decode_bytes(input, &mut buf);
        out.extend_from_slice(&buf[..res.consumed_out]);
        input = &input[res.consumed_in..];
        match res.status {
            Ok(weezl::LzwStatus::Ok) => {}
            Ok(weezl::LzwStatus::Done) => break,
            // truncated input: return what decoded so far
            Ok(weezl::LzwStatus::NoProgress) => break,
            Err(e) => {
                if out.is_empty() {
                    return Err(PdfError::CorruptStream(format!("lzw: {e}")));
                }
                break;
            }
        }
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut group_len = 0;
    let mut i = 0;
    // optional <~ leader
    if data.starts_with(b"<~") {
        i = 2;
    }
    while i < data.len() {
        let b = data[i];
        i += 1;
        if crate::lexer::is_whitespace(b) {
            continue;
        }
        if b == b'~' {
            break; // ~> terminator
        }
        if b == b'z' && group_len == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(PdfError::CorruptStream(format!(
                "ascii85: invalid byte 0x{b:02x}"
            )));
        }
        group[group_len] = b - b'!';
        group_len += 1;
        if group_len == 5 {
            let v = group.iter().fold(0u32, |acc, &d| {
                acc.wrapping_mul(85).wrapping_add(u32::from(d))
            });
            out.extend_from_slice(&v.to_be_bytes());
            group_len = 0;
        }
    }
    // partial final group: pad with 'u', emit len-1 bytes
    if group_len >= 2 {
        let missing = 5 - group_len;
        for slot in group.iter_mut().skip(group_len) {
            *slot = 84;
        }
        let v = group.iter().fold(0u32, |acc, &d| {
            acc.wrapping_mul(85).wrapping_add(u32::from(d))
        });
        out.extend_from_slice(&v.to_be_bytes()[..group_len - 1]);
    }
    Ok(out)
}

fn asciihex_decode(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut out = Vec::new();
    let mut nibble: Option<u8> = None;
    for &b in data {
        if crate::lexer::is_whitespace(b) {
            continue;
        }
        if b == b'>' {
            break;
        }
        let v = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => {
                return Err(PdfError::CorruptStream(format!(
                    "asciihex: invalid byte 0x{b:02x}"
                )))
            }
        };
        match nibble.take() {
            Some(hi) => out.push(hi << 4 | v),
            None => nibble = Some(v),
        }
    }
    if let Some(hi) = nibble {
        out.push(hi << 4);
    }
    Ok(out)
}

fn runlength_decode(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break, // EOD
            0..=127 => {
                let n = usize::from(len) + 1;
                if i + n > data.len() {
                    out.extend_from_slice(&data[i..]); // truncated
                    break;
                }
                out.extend_from_slice(&data[i..i + n]);
                i += n;
            }
            129..=255 => {
                let n = 257 - usize::from(len);
                match data.get(i) {
                    Some(&b) => out.extend(std::iter::repeat(b).take(n)),
                    None => break, // truncated
                }
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Predictor postprocessing for Flate and LZW: 1 = none, 2 = TIFF
/// horizontal differencing, >= 10 = the PNG filter set.
fn apply_predictor(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>, PdfError> {
    let parms = match parms {
        Some(p) => p,
        None => return Ok(data),
    };
    let int = |key: &[u8], default: i64| -> i64 {
        parms
            .get(key)
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(default)
    };
    let predictor = int(b"Predictor", 1);
    if predictor <= 1 {
        return Ok(data);
    }
    let colors = int(b"Colors", 1).max(1) as usize;
    let bpc = int(b"BitsPerComponent", 8).max(1) as usize;
    let columns = int(b"Columns", 1).max(1) as usize;
    let bytes_per_pixel = (colors * bpc).div_ceil(8).max(1);
    let row_len = (columns * colors * bpc).div_ceil(8);

    if predictor == 2 {
        // TIFF predictor: defined here for 8-bit components only
        if bpc != 8 {
            return Ok(data);
        }
        let mut out = data;
        for row in out.chunks_mut(row_len) {
            for i in bytes_per_pixel..row.len() {
                row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
            }
        }
        return Ok(out);
    }

    // PNG predictors: each row is prefixed with a filter-type byte
    let stride = row_len + 1;
    let rows = data.len() / stride;
    let mut out = vec![0u8; rows * row_len];
    let mut prev_row = vec![0u8; row_len];
    for r in 0..rows {
        let src = &data[r * stride..r * stride + stride];
        let filter = src[0];
        let src = &src[1..];
        let dst = &mut out[r * row_len..(r + 1) * row_len];
        for i in 0..row_len {
            let raw = src[i];
            let left = if i >= bytes_per_pixel {
                dst[i - bytes_per_pixel]
            } else {
                0
            };
            let up = prev_row[i];
            let up_left = if i >= bytes_per_pixel {
                prev_row[i - bytes_per_pixel]
            } else {
                0
            };
            dst[i] = match filter {
                0 => raw,
                1 => raw.wrapping_add(left),
                2 => raw.wrapping_add(up),
                3 => raw.wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => raw.wrapping_add(paeth(left, up, up_left)),
                _ => {
                    return Err(PdfError::CorruptStream(format!(
                        "png predictor: filter type {filter}"
                    )))
                }
            };
        }
        prev_row.copy_from_slice(dst);
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let pa = (p - i32::from(a)).abs();
    let pb = (p - i32::from(b)).abs();
    let pc = (p - i32::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, Object};
    use pretty_assertions::assert_eq;

    #[test]
    fn asciihex_roundtrip_with_odd_nibble() {
        assert_eq!(
            asciihex_decode(b"48 65 6C 6C 6F 2>").unwrap(),
            b"Hello ".to_vec()
        );
    }

    #[test]
    fn ascii85_full_group() {
        // five '!' digits are the zero group
        assert_eq!(ascii85_decode(b"!!!!!~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn ascii85_partial_group() {
        // "5l" is the two-digit encoding of the single byte 0x41
        assert_eq!(ascii85_decode(b"5l~>").unwrap(), vec![0x41]);
    }

    #[test]
    fn ascii85_z_shortcut() {
        assert_eq!(ascii85_decode(b"z~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn runlength_literal_and_repeat() {
        // 2 -> copy 3 bytes, 254 -> repeat next byte 3 times, 128 -> EOD
        assert_eq!(
            runlength_decode(&[2, b'a', b'b', b'c', 254, b'x', 128]).unwrap(),
            b"abcxxx".to_vec()
        );
    }

    #[test]
    fn flate_roundtrip() {
        use std::io::Write;
        let mut enc =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"some data to compress, compress, compress")
            .unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(
            flate_decode(&compressed).unwrap(),
            b"some data to compress, compress, compress".to_vec()
        );
    }

    #[test]
    fn png_up_predictor() {
        // two rows of 3 bytes, filter type 2 (Up)
        let mut parms = Dictionary::new();
        parms.set("Predictor", Object::Integer(15));
        parms.set("Columns", Object::Integer(3));
        let data = vec![
            2, 10, 20, 30, // row 0: up against zero row
            2, 1, 1, 1, // row 1: deltas against row 0
        ];
        assert_eq!(
            apply_predictor(data, Some(&parms)).unwrap(),
            vec![10, 20, 30, 11, 21, 31]
        );
    }

    #[test]
    fn tiff_predictor_8bit() {
        let mut parms = Dictionary::new();
        parms.set("Predictor", Object::Integer(2));
        parms.set("Columns", Object::Integer(4));
        let data = vec![1, 1, 1, 1];
        assert_eq!(
            apply_predictor(data, Some(&parms)).unwrap(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn lzw_early_change_roundtrip() {
        let mut enc = weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        let compressed = enc.encode(b"ababababababababab").unwrap();
        assert_eq!(
            lzw_decode(&compressed, None).unwrap(),
            b"ababababababababab".to_vec()
        );
    }
}
