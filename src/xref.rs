//! xref.rs
//!
//! Cross-reference parsing: the classical `xref` table, cross-reference
//! streams (PDF 1.5+), hybrid files carrying both, and a last-resort
//! rebuild pass that scans the whole file for `N G obj` headers when the
//! declared tables are unusable.

use std::collections::HashMap;

use crate::errors::{PdfError, PdfWarnMsg};
use crate::lexer::Lexer;
use crate::object::{Object, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free,
    /// Byte offset of `N G obj` in the file
    Normal { offset: usize, gen: u16 },
    /// Object lives inside an object stream
    Compressed { container: u32, index: u16 },
}

#[derive(Debug, Clone, Default)]
pub struct Xref {
    entries: HashMap<u32, XrefEntry>,
    pub trailer: crate::object::Dictionary,
}

impl Xref {
    pub fn get(&self, obj_num: u32) -> Option<XrefEntry> {
        self.entries.get(&obj_num).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from an older section never shadow newer ones.
    fn merge_older(&mut self, other: Xref) {
        for (num, entry) in other.entries {
            self.entries.entry(num).or_insert(entry);
        }
        for (k, v) in other.trailer.iter() {
            if !self.trailer.has(k) {
                self.trailer.set(k.to_vec(), v.clone());
            }
        }
    }

    fn insert(&mut self, obj_num: u32, entry: XrefEntry) {
        self.entries.entry(obj_num).or_insert(entry);
    }
}

/// Locates `startxref` near the end of the file and walks the `/Prev`
/// chain. Falls back to a full-file rebuild on any structural failure.
pub fn parse_xref(data: &[u8], warnings: &mut Vec<PdfWarnMsg>) -> Result<Xref, PdfError> {
    match parse_xref_declared(data) {
        Ok(xref) if !xref.is_empty() => Ok(xref),
        Ok(_) => {
            warnings.push(PdfWarnMsg::warning(
                0,
                0,
                "empty cross-reference table, rebuilding".to_string(),
            ));
            rebuild_xref(data)
        }
        Err(e) => {
            warnings.push(PdfWarnMsg::warning(
                0,
                0,
                format!("cross-reference unusable ({e}), rebuilding"),
            ));
            rebuild_xref(data)
        }
    }
}

fn parse_xref_declared(data: &[u8]) -> Result<Xref, PdfError> {
    let start_offset = find_startxref(data)?;
    let mut xref = Xref::default();
    let mut next = Some(start_offset);
    let mut visited = Vec::new();
    while let Some(offset) = next {
        if visited.contains(&offset) {
            break; // Prev cycle
        }
        visited.push(offset);
        let section = parse_section_at(data, offset)?;
        // hybrid-reference file: the classic table points at an xref stream too
        let hybrid = match section.trailer.get(b"XRefStm") {
            Ok(Object::Integer(p)) if *p >= 0 => Some(*p as usize),
            _ => None,
        };
        next = match section.trailer.get(b"Prev") {
            Ok(Object::Integer(p)) if *p >= 0 => Some(*p as usize),
            _ => None,
        };
        xref.merge_older(section);
        if let Some(h) = hybrid {
            if !visited.contains(&h) {
                visited.push(h);
                if let Ok(s) = parse_section_at(data, h) {
                    xref.merge_older(s);
                }
            }
        }
    }
    if !xref.trailer.has(b"Root") {
        return Err(PdfError::InvalidTrailer("no Root entry".to_string()));
    }
    Ok(xref)
}

fn find_startxref(data: &[u8]) -> Result<usize, PdfError> {
    let tail_len = data.len().min(2048);
    let tail = &data[data.len() - tail_len..];
    let pos = tail
        .windows(9)
        .rposition(|w| w == b"startxref")
        .ok_or_else(|| PdfError::InvalidXref("startxref not found".to_string()))?;
    let mut lexer = Lexer::new(tail);
    lexer.seek(pos + 9);
    match lexer.read_next(false) {
        Ok(Some(Object::Integer(i))) if i >= 0 && (i as usize) < data.len() => Ok(i as usize),
        _ => Err(PdfError::InvalidXref("bad startxref offset".to_string())),
    }
}

fn parse_section_at(data: &[u8], offset: usize) -> Result<Xref, PdfError> {
    if offset >= data.len() {
        return Err(PdfError::InvalidXref("xref offset past EOF".to_string()));
    }
    let mut lexer = Lexer::new(data);
    lexer.seek(offset);
    if lexer.match_sequence(b"xref") {
        parse_classic_table(&mut lexer)
    } else {
        parse_xref_stream(&mut lexer)
    }
}

/// `xref` / subsection headers `start count` / 20-byte entries / `trailer`
fn parse_classic_table(lexer: &mut Lexer) -> Result<Xref, PdfError> {
    let mut xref = Xref::default();
    loop {
        if lexer.match_sequence(b"trailer") {
            let trailer = match lexer.read_next(true)? {
                Some(Object::Dictionary(d)) => d,
                _ => return Err(PdfError::InvalidTrailer("trailer is not a dictionary".into())),
            };
            xref.trailer = trailer;
            return Ok(xref);
        }
        let start = match lexer.read_next(false)? {
            Some(Object::Integer(i)) if i >= 0 => i as u32,
            _ => return Err(PdfError::InvalidXref("bad subsection start".into())),
        };
        let count = match lexer.read_next(false)? {
            Some(Object::Integer(i)) if i >= 0 => i as u32,
            _ => return Err(PdfError::InvalidXref("bad subsection count".into())),
        };
        for i in 0..count {
            let offset = match lexer.read_next(false)? {
                Some(Object::Integer(v)) if v >= 0 => v as usize,
                _ => return Err(PdfError::InvalidXref("bad entry offset".into())),
            };
            let gen = match lexer.read_next(false)? {
                Some(Object::Integer(v)) if v >= 0 => v as u16,
                _ => return Err(PdfError::InvalidXref("bad entry generation".into())),
            };
            let kind = match lexer.read_next(false)? {
                Some(Object::Operator(op)) => op,
                _ => return Err(PdfError::InvalidXref("bad entry kind".into())),
            };
            let entry = match kind.as_str() {
                "n" => XrefEntry::Normal { offset, gen },
                "f" => XrefEntry::Free,
                _ => return Err(PdfError::InvalidXref(format!("entry kind {kind:?}"))),
            };
            xref.insert(start + i, entry);
        }
    }
}

/// `N G obj << /Type /XRef ... >> stream` with /W field widths
fn parse_xref_stream(lexer: &mut Lexer) -> Result<Xref, PdfError> {
    // object header
    for expected in ["number", "generation"] {
        match lexer.read_next(false)? {
            Some(Object::Integer(_)) => {}
            _ => {
                return Err(PdfError::InvalidXref(format!(
                    "xref stream: bad object {expected}"
                )))
            }
        }
    }
    if !lexer.match_sequence(b"obj") {
        return Err(PdfError::InvalidXref("xref stream: missing obj".into()));
    }
    let stream = match lexer.read_next(true)? {
        Some(Object::Stream(s)) => s,
        _ => return Err(PdfError::InvalidXref("xref stream: not a stream".into())),
    };
    let mut scratch = Vec::new();
    let decoded = crate::filters::decode_stream(&stream, 0, &mut scratch)?;

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")?
        .as_array()?
        .iter()
        .map(|o| o.as_i64().map(|v| v as usize))
        .collect::<Result<_, _>>()?;
    if widths.len() < 3 {
        return Err(PdfError::InvalidXref("W needs three fields".into()));
    }
    let size = stream.dict.get(b"Size")?.as_i64()? as u32;
    let index: Vec<i64> = match stream.dict.get(b"Index") {
        Ok(Object::Array(arr)) => arr
            .iter()
            .map(|o| o.as_i64())
            .collect::<Result<_, _>>()?,
        _ => vec![0, i64::from(size)],
    };

    let row_len: usize = widths.iter().sum();
    let mut xref = Xref::default();
    let mut rows = decoded.chunks_exact(row_len);
    for pair in index.chunks(2) {
        let (start, count) = match pair {
            [s, c] => (*s as u32, *c as u32),
            _ => break,
        };
        for i in 0..count {
            let row = match rows.next() {
                Some(r) => r,
                None => break,
            };
            let mut fields = [0u64; 3];
            let mut off = 0;
            for (f, w) in fields.iter_mut().zip(widths.iter()) {
                for _ in 0..*w {
                    *f = *f << 8 | u64::from(row[off]);
                    off += 1;
                }
            }
            // a zero-width first field defaults to type 1
            let kind = if widths[0] == 0 { 1 } else { fields[0] };
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::Normal {
                    offset: fields[1] as usize,
                    gen: fields[2] as u16,
                },
                2 => XrefEntry::Compressed {
                    container: fields[1] as u32,
                    index: fields[2] as u16,
                },
                _ => continue, // unknown types are ignored per ISO 32000
            };
            xref.insert(start + i, entry);
        }
    }
    xref.trailer = stream.dict.clone();
    Ok(xref)
}

/// Last resort: scan for `N G obj` headers over the whole file. The last
/// header wins for each object number, matching incremental-save order.
fn rebuild_xref(data: &[u8]) -> Result<Xref, PdfError> {
    let mut xref = Xref::default();
    let mut i = 0;
    while i + 3 < data.len() {
        if &data[i..i + 3] == b"obj"
            && data.get(i + 3).map(|b| !b.is_ascii_alphanumeric()).unwrap_or(true)
        {
            if let Some((id, header_start)) = read_obj_header_backwards(data, i) {
                xref.entries.insert(
                    id.0,
                    XrefEntry::Normal {
                        offset: header_start,
                        gen: id.1,
                    },
                );
            }
        }
        i += 1;
    }
    // the trailer dictionary may still be intact even when offsets are not
    if let Some(pos) = data.windows(7).rposition(|w| w == b"trailer") {
        let mut lexer = Lexer::new(data);
        lexer.seek(pos + 7);
        if let Ok(Some(Object::Dictionary(d))) = lexer.read_next(true) {
            xref.trailer = d;
        }
    }
    if xref.is_empty() {
        return Err(PdfError::InvalidXref("rebuild found no objects".to_string()));
    }
    Ok(xref)
}

/// Walks back from an `obj` keyword over `G` and `N`; returns the id and
/// the offset of `N`.
fn read_obj_header_backwards(data: &[u8], obj_pos: usize) -> Option<(ObjectId, usize)> {
    let mut i = obj_pos;
    let skip_ws_back = |data: &[u8], mut i: usize| {
        while i > 0 && crate::lexer::is_whitespace(data[i - 1]) {
            i -= 1;
        }
        i
    };
    let read_num_back = |data: &[u8], mut i: usize| -> Option<(u64, usize)> {
        let end = i;
        while i > 0 && data[i - 1].is_ascii_digit() {
            i -= 1;
        }
        if i == end {
            return None;
        }
        let s = std::str::from_utf8(&data[i..end]).ok()?;
        Some((s.parse().ok()?, i))
    };
    i = skip_ws_back(data, i);
    let (gen, gen_start) = read_num_back(data, i)?;
    i = skip_ws_back(data, gen_start);
    let (num, num_start) = read_num_back(data, i)?;
    if num_start > 0 && !crate::lexer::is_whitespace(data[num_start - 1]) {
        return None;
    }
    Some(((num as u32, gen as u16), num_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_pdf() -> Vec<u8> {
        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n");
        let obj1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let obj2 = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 3\n");
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        pdf.extend_from_slice(format!("{obj1:010} 00000 n \n").as_bytes());
        pdf.extend_from_slice(format!("{obj2:010} 00000 n \n").as_bytes());
        pdf.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        pdf
    }

    #[test]
    fn classic_table_parses() {
        let pdf = minimal_pdf();
        let mut warnings = Vec::new();
        let xref = parse_xref(&pdf, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert!(matches!(xref.get(1), Some(XrefEntry::Normal { .. })));
        assert!(matches!(xref.get(0), Some(XrefEntry::Free)));
        assert_eq!(
            xref.trailer.get(b"Root").unwrap(),
            &Object::Reference((1, 0))
        );
    }

    #[test]
    fn broken_startxref_triggers_rebuild() {
        let mut pdf = minimal_pdf();
        // corrupt the startxref offset
        let pos = pdf.windows(9).rposition(|w| w == b"startxref").unwrap();
        pdf.truncate(pos);
        pdf.extend_from_slice(b"startxref\n999999999\n%%EOF\n");
        let mut warnings = Vec::new();
        let xref = parse_xref(&pdf, &mut warnings).unwrap();
        assert!(!warnings.is_empty());
        assert!(matches!(xref.get(1), Some(XrefEntry::Normal { .. })));
        assert!(xref.trailer.has(b"Root"));
    }

    #[test]
    fn xref_stream_entries_decode() {
        // uncompressed xref stream: W [1 2 1], entries for objects 0..3
        let rows: &[u8] = &[
            0, 0, 0, 255, // free
            1, 0, 20, 0, // normal at offset 20
            2, 0, 5, 7, // compressed, container 5 index 7
        ];
        let mut body = Vec::new();
        body.extend_from_slice(b"7 0 obj\n<< /Type /XRef /W [1 2 1] /Size 3 /Root 1 0 R /Length 12 >>\nstream\n");
        body.extend_from_slice(rows);
        body.extend_from_slice(b"\nendstream\nendobj\n");
        let mut lexer = Lexer::new(&body);
        let xref = parse_xref_stream(&mut lexer).unwrap();
        assert_eq!(xref.get(0), Some(XrefEntry::Free));
        assert_eq!(
            xref.get(1),
            Some(XrefEntry::Normal { offset: 20, gen: 0 })
        );
        assert_eq!(
            xref.get(2),
            Some(XrefEntry::Compressed {
                container: 5,
                index: 7
            })
        );
    }
}
