//! font.rs
//!
//! Font resolution: a font dictionary becomes a `PdfFont` that can
//! tokenize show-string bytes into character codes, supply widths, map
//! codes to glyph ids in the embedded glyph source and map codes to
//! Unicode for extraction. Embedded TrueType/OpenType programs are read
//! through allsorts; the `post` and format-0 `cmap` subtables are read
//! from the raw table bytes since the resolution chain needs them
//! directly.

use std::collections::HashMap;
use std::rc::Rc;

use allsorts::binary::read::ReadScope;
use allsorts::font_data::FontData;
use allsorts::tables::cmap::owned::CmapSubtable as OwnedCmapSubtable;
use allsorts::tables::cmap::CmapSubtable;
use allsorts::tables::{FontTableProvider, HeadTable, HheaTable, MaxpTable};
use allsorts::tag;

use crate::cmap::{parse_cmap, CMap, CharacterCode};
use crate::document::PdfDocument;
use crate::encoding::{glyph_name_to_unicode, BaseEncoding, Encoding};
use crate::errors::PdfWarnMsg;
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId};

/// Standard built-in PDF fonts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuiltinFont {
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierOblique,
    CourierBold,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl BuiltinFont {
    pub fn get_id(self) -> &'static str {
        use self::BuiltinFont::*;
        match self {
            TimesRoman => "Times-Roman",
            TimesBold => "Times-Bold",
            TimesItalic => "Times-Italic",
            TimesBoldItalic => "Times-BoldItalic",
            Helvetica => "Helvetica",
            HelveticaBold => "Helvetica-Bold",
            HelveticaOblique => "Helvetica-Oblique",
            HelveticaBoldOblique => "Helvetica-BoldOblique",
            Courier => "Courier",
            CourierOblique => "Courier-Oblique",
            CourierBold => "Courier-Bold",
            CourierBoldOblique => "Courier-BoldOblique",
            Symbol => "Symbol",
            ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Matches the base-font name, tolerating subset prefixes
    /// (`ABCDEF+Helvetica`) and the Arial aliases.
    pub fn from_id(name: &str) -> Option<Self> {
        use self::BuiltinFont::*;
        let name = name.rsplit('+').next().unwrap_or(name);
        match name {
            "Times-Roman" | "TimesNewRoman" => Some(TimesRoman),
            "Times-Bold" | "TimesNewRoman,Bold" => Some(TimesBold),
            "Times-Italic" | "TimesNewRoman,Italic" => Some(TimesItalic),
            "Times-BoldItalic" | "TimesNewRoman,BoldItalic" => Some(TimesBoldItalic),
            "Helvetica" | "Arial" => Some(Helvetica),
            "Helvetica-Bold" | "Arial,Bold" | "Arial-Bold" => Some(HelveticaBold),
            "Helvetica-Oblique" | "Arial,Italic" => Some(HelveticaOblique),
            "Helvetica-BoldOblique" | "Arial,BoldItalic" => Some(HelveticaBoldOblique),
            "Courier" | "CourierNew" => Some(Courier),
            "Courier-Oblique" | "CourierNew,Italic" => Some(CourierOblique),
            "Courier-Bold" | "CourierNew,Bold" => Some(CourierBold),
            "Courier-BoldOblique" | "CourierNew,BoldItalic" => Some(CourierBoldOblique),
            "Symbol" => Some(Symbol),
            "ZapfDingbats" => Some(ZapfDingbats),
            _ => None,
        }
    }

    /// AFM-derived advance for a glyph name, in thousandths. Courier is
    /// monospaced; the serif/sans tables cover the standard Latin set and
    /// everything else falls back to a representative width.
    pub fn glyph_width(self, glyph_name: &str) -> f32 {
        use self::BuiltinFont::*;
        match self {
            Courier | CourierOblique | CourierBold | CourierBoldOblique => 600.0,
            Helvetica | HelveticaOblique | HelveticaBold | HelveticaBoldOblique => {
                let bold = matches!(self, HelveticaBold | HelveticaBoldOblique);
                let table = if bold { HELVETICA_BOLD_WIDTHS } else { HELVETICA_WIDTHS };
                lookup_width(table, glyph_name).unwrap_or(556.0)
            }
            TimesRoman | TimesItalic | TimesBold | TimesBoldItalic => {
                let bold = matches!(self, TimesBold | TimesBoldItalic);
                let table = if bold { TIMES_BOLD_WIDTHS } else { TIMES_WIDTHS };
                lookup_width(table, glyph_name).unwrap_or(500.0)
            }
            Symbol | ZapfDingbats => 600.0,
        }
    }
}

fn lookup_width(table: &[(&str, u16)], name: &str) -> Option<f32> {
    table
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|i| f32::from(table[i].1))
}

/// `/FontDescriptor` fields the renderer consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontDescriptor {
    pub flags: i64,
    pub italic_angle: f32,
    pub stem_v: f32,
    pub missing_width: f32,
    pub font_weight: Option<f32>,
}

impl FontDescriptor {
    pub fn is_symbolic(&self) -> bool {
        self.flags & 0x4 != 0
    }

    pub fn is_serif(&self) -> bool {
        self.flags & 0x2 != 0
    }

    pub fn is_fixed_pitch(&self) -> bool {
        self.flags & 0x1 != 0
    }
}

/// Simple (single-byte) font: Type1 or TrueType.
#[derive(Debug, Clone)]
pub struct SimpleFont {
    pub encoding: Encoding,
    pub first_char: i64,
    /// thousandths, indexed by code minus first char
    pub widths: Vec<f32>,
    pub builtin: Option<BuiltinFont>,
}

/// CID to glyph id: identity or the big-endian 16-bit table.
#[derive(Debug, Clone)]
pub enum CidToGid {
    Identity,
    Map(Vec<u16>),
}

impl CidToGid {
    pub fn glyph(&self, cid: u32) -> u16 {
        match self {
            CidToGid::Identity => cid as u16,
            CidToGid::Map(entries) => entries.get(cid as usize).copied().unwrap_or(0),
        }
    }
}

/// Composite (Type0) font with its descendant CID font.
#[derive(Debug, Clone)]
pub struct CompositeFont {
    /// code → CID
    pub cmap: Rc<CMap>,
    pub default_width: f32,
    /// per-CID widths from /W, thousandths
    pub widths: HashMap<u32, f32>,
    pub cid_to_gid: CidToGid,
}

/// Procedure-based Type3 font.
#[derive(Debug, Clone)]
pub struct Type3Font {
    pub encoding: Encoding,
    pub font_matrix: Matrix,
    /// glyph name → content stream object
    pub char_procs: HashMap<String, Object>,
    pub resources: Option<Dictionary>,
    pub first_char: i64,
    /// widths in glyph space (transformed by the font matrix)
    pub widths: Vec<f32>,
}

#[derive(Debug, Clone)]
pub enum FontVariant {
    Simple(SimpleFont),
    Composite(CompositeFont),
    Type3(Type3Font),
}

#[derive(Debug, Clone)]
pub struct PdfFont {
    pub base_font: String,
    pub variant: FontVariant,
    pub descriptor: Option<FontDescriptor>,
    pub to_unicode: Option<Rc<CMap>>,
    /// raw embedded font program, for the back-end's typeface loader
    pub font_file: Option<Rc<Vec<u8>>>,
    /// parsed SFNT tables of the embedded program
    pub embedded: Option<Rc<ParsedFont>>,
}

impl PdfFont {
    /// Splits a show-string into character codes. One byte per code for
    /// simple fonts; composite fonts take the longest codespace prefix.
    pub fn encode_bytes(&self, bytes: &[u8]) -> Vec<CharacterCode> {
        match &self.variant {
            FontVariant::Composite(composite) => {
                let mut out = Vec::new();
                let mut rest = bytes;
                while let Some((code, _)) = composite.cmap.next_code(rest) {
                    rest = &rest[code.len()..];
                    out.push(code);
                }
                out
            }
            _ => bytes.iter().map(|b| CharacterCode::new(&[*b])).collect(),
        }
    }

    /// Advance width for a code in thousandths of text space.
    pub fn glyph_width(&self, code: CharacterCode) -> f32 {
        match &self.variant {
            FontVariant::Simple(simple) => {
                let idx = i64::from(code.value()) - simple.first_char;
                if idx >= 0 {
                    if let Some(w) = simple.widths.get(idx as usize) {
                        return *w;
                    }
                }
                if let Some(builtin) = simple.builtin {
                    let name = simple
                        .encoding
                        .glyph_name(code.value() as u8)
                        .unwrap_or("space");
                    return builtin.glyph_width(name);
                }
                // embedded program metrics when the widths array is short
                if let Some(parsed) = &self.embedded {
                    let gid = self.glyph_id(code);
                    if let Some(adv) = parsed.advance(gid) {
                        return f32::from(adv) * 1000.0 / parsed.units_per_em_f32();
                    }
                }
                self.missing_width()
            }
            FontVariant::Composite(composite) => {
                let cid = composite.cmap.lookup_cid(code).unwrap_or(0);
                composite
                    .widths
                    .get(&cid)
                    .copied()
                    .unwrap_or(composite.default_width)
            }
            FontVariant::Type3(t3) => {
                let idx = i64::from(code.value()) - t3.first_char;
                let raw = if idx >= 0 {
                    t3.widths.get(idx as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                // glyph space → text space, then the interpreter's /1000
                let (dx, _) = t3.font_matrix.transform_vector(raw, 0.0);
                dx * 1000.0
            }
        }
    }

    fn missing_width(&self) -> f32 {
        self.descriptor
            .as_ref()
            .map(|d| d.missing_width)
            .unwrap_or(0.0)
    }

    /// Glyph id in the embedded glyph source. The chain for simple
    /// TrueType fonts: symbolic format-0 subtable, then glyph name via
    /// `post`, then Unicode via the character map.
    pub fn glyph_id(&self, code: CharacterCode) -> u16 {
        match &self.variant {
            FontVariant::Composite(composite) => {
                let cid = composite.cmap.lookup_cid(code).unwrap_or(0);
                composite.cid_to_gid.glyph(cid)
            }
            FontVariant::Simple(simple) => {
                let parsed = match &self.embedded {
                    Some(p) => p,
                    None => return 0,
                };
                let byte = code.value() as u8;
                let symbolic = self
                    .descriptor
                    .as_ref()
                    .map(FontDescriptor::is_symbolic)
                    .unwrap_or(false);
                if symbolic {
                    if let Some(gid) = parsed.format0_glyph(byte) {
                        return gid;
                    }
                    // symbolic cmaps often live at 0xF000 + code
                    if let Some(gid) = parsed.lookup_glyph_index(0xF000 + u32::from(byte)) {
                        return gid;
                    }
                }
                let name = simple.encoding.glyph_name(byte);
                if let Some(name) = name {
                    if let Some(gid) = parsed.glyph_for_name(name) {
                        return gid;
                    }
                }
                let uni = self
                    .to_unicode
                    .as_ref()
                    .and_then(|tu| tu.lookup_unicode(code))
                    .and_then(|s| s.chars().next())
                    .or_else(|| name.and_then(glyph_name_to_unicode));
                if let Some(c) = uni {
                    if let Some(gid) = parsed.lookup_glyph_index(c as u32) {
                        return gid;
                    }
                }
                0
            }
            FontVariant::Type3(_) => 0,
        }
    }

    /// Unicode for extraction: ToUnicode first, then the encoding's
    /// glyph names through the glyph list.
    pub fn unicode(&self, code: CharacterCode) -> Option<String> {
        if let Some(tu) = &self.to_unicode {
            if let Some(s) = tu.lookup_unicode(code) {
                return Some(s);
            }
        }
        match &self.variant {
            FontVariant::Simple(simple) => simple
                .encoding
                .unicode(code.value() as u8)
                .map(String::from),
            FontVariant::Type3(t3) => t3.encoding.unicode(code.value() as u8).map(String::from),
            FontVariant::Composite(_) => None,
        }
    }

    /// Glyph-space to text-space transform. 1/1000 except for Type3,
    /// which carries its own matrix.
    pub fn font_matrix(&self) -> Matrix {
        match &self.variant {
            FontVariant::Type3(t3) => t3.font_matrix,
            _ => Matrix::scale(0.001, 0.001),
        }
    }

    pub fn writing_mode(&self) -> u8 {
        match &self.variant {
            FontVariant::Composite(composite) => composite.cmap.wmode,
            _ => 0,
        }
    }

    /// Word spacing applies to the single-byte code 0x20 only.
    pub fn is_word_space(&self, code: CharacterCode) -> bool {
        code.len() == 1 && code.bytes()[0] == 0x20
    }

    pub fn is_type3(&self) -> bool {
        matches!(self.variant, FontVariant::Type3(_))
    }
}

// ----------------------------------------------------------------------
// font dictionary loading

/// Resolves a font dictionary into a `PdfFont`. Never fails hard: broken
/// pieces degrade to a font that draws nothing sensible but keeps the
/// interpreter running.
pub fn load_font(
    doc: &PdfDocument,
    font_dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> PdfFont {
    let subtype = doc
        .dict_get(font_dict, b"Subtype")
        .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec))
        .unwrap_or_default();
    let base_font = doc
        .dict_get(font_dict, b"BaseFont")
        .and_then(|o| o.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned()))
        .unwrap_or_default();

    let descriptor_dict = descriptor_of(doc, font_dict);
    let descriptor = descriptor_dict.as_ref().map(|d| parse_descriptor(doc, d));
    let font_file = descriptor_dict
        .as_ref()
        .and_then(|d| font_program(doc, d, page, warnings));
    let embedded = font_file
        .as_ref()
        .and_then(|bytes| ParsedFont::from_bytes(bytes, 0))
        .map(Rc::new);
    let to_unicode = parse_to_unicode(doc, font_dict, page, warnings);

    let variant = match subtype.as_slice() {
        b"Type0" => FontVariant::Composite(load_composite(doc, font_dict, page, warnings)),
        b"Type3" => FontVariant::Type3(load_type3(doc, font_dict)),
        _ => FontVariant::Simple(load_simple(doc, font_dict, &base_font, embedded.is_some())),
    };

    PdfFont {
        base_font,
        variant,
        descriptor,
        to_unicode,
        font_file,
        embedded,
    }
}

fn descriptor_of(doc: &PdfDocument, font_dict: &Dictionary) -> Option<Dictionary> {
    let desc = doc.dict_get(font_dict, b"FontDescriptor")?;
    desc.as_dict().ok().cloned()
}

fn parse_descriptor(doc: &PdfDocument, desc: &Dictionary) -> FontDescriptor {
    let num = |key: &[u8]| -> Option<f32> {
        doc.dict_get(desc, key).and_then(|o| o.as_f32().ok())
    };
    FontDescriptor {
        flags: doc
            .dict_get(desc, b"Flags")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0),
        italic_angle: num(b"ItalicAngle").unwrap_or(0.0),
        stem_v: num(b"StemV").unwrap_or(0.0),
        missing_width: num(b"MissingWidth").unwrap_or(0.0),
        font_weight: num(b"FontWeight"),
    }
}

fn font_program(
    doc: &PdfDocument,
    desc: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Rc<Vec<u8>>> {
    for key in [&b"FontFile2"[..], &b"FontFile3"[..], &b"FontFile"[..]] {
        if let Ok(Object::Reference(r)) = desc.get(key) {
            let bytes = doc.stream_bytes(*r, page, warnings);
            if !bytes.is_empty() {
                return Some(bytes);
            }
        }
    }
    None
}

fn parse_to_unicode(
    doc: &PdfDocument,
    font_dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Rc<CMap>> {
    let obj = font_dict.get(b"ToUnicode").ok()?;
    let id: Option<ObjectId> = obj.as_reference().ok();
    if let Some(id) = id {
        if let Some(cached) = doc.to_unicode_registry.borrow().get(&id) {
            return Some(cached.clone());
        }
    }
    let bytes: Vec<u8> = match (id, obj) {
        (Some(id), _) => doc.stream_bytes(id, page, warnings).as_ref().clone(),
        (None, Object::Stream(s)) => doc.decode_stream_direct(s, page, warnings),
        _ => return None,
    };
    if bytes.is_empty() {
        return None;
    }
    let lookup = |name: &str| doc.cmap_registry.borrow().get(name).cloned();
    let cmap = Rc::new(parse_cmap(&bytes, &lookup));
    if let Some(id) = id {
        doc.to_unicode_registry.borrow_mut().insert(id, cmap.clone());
    }
    Some(cmap)
}

fn load_simple(
    doc: &PdfDocument,
    font_dict: &Dictionary,
    base_font: &str,
    has_embedded: bool,
) -> SimpleFont {
    let encoding = parse_encoding(doc, font_dict, BaseEncoding::Standard);
    let first_char = doc
        .dict_get(font_dict, b"FirstChar")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    let widths = doc
        .dict_get(font_dict, b"Widths")
        .and_then(|o| {
            o.as_array().ok().map(|arr| {
                arr.iter()
                    .map(|w| doc.resolve(w).as_f32().unwrap_or(0.0))
                    .collect::<Vec<f32>>()
            })
        })
        .unwrap_or_default();
    let builtin = if widths.is_empty() && !has_embedded {
        BuiltinFont::from_id(base_font)
    } else {
        None
    };
    SimpleFont {
        encoding,
        first_char,
        widths,
        builtin,
    }
}

/// `/Encoding`: a base-encoding name, or a dictionary selecting a base
/// plus `/Differences`.
fn parse_encoding(doc: &PdfDocument, font_dict: &Dictionary, default: BaseEncoding) -> Encoding {
    let obj = match doc.dict_get(font_dict, b"Encoding") {
        Some(o) => o,
        None => return Encoding::from_base(default),
    };
    match &*obj {
        Object::Name(name) => {
            Encoding::from_base(BaseEncoding::from_name(name).unwrap_or(default))
        }
        Object::Dictionary(dict) => {
            let base = doc
                .dict_get(dict, b"BaseEncoding")
                .and_then(|o| o.as_name().ok().and_then(BaseEncoding::from_name))
                .unwrap_or(default);
            let mut encoding = Encoding::from_base(base);
            if let Some(diffs) = doc.dict_get(dict, b"Differences") {
                if let Ok(arr) = diffs.as_array() {
                    let resolved: Vec<Object> =
                        arr.iter().map(|o| (*doc.resolve(o)).clone()).collect();
                    encoding.apply_differences(&resolved);
                }
            }
            encoding
        }
        _ => Encoding::from_base(default),
    }
}

fn load_composite(
    doc: &PdfDocument,
    font_dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> CompositeFont {
    let cmap = load_code_to_cid_map(doc, font_dict, page, warnings);

    let descendant = doc
        .dict_get(font_dict, b"DescendantFonts")
        .and_then(|o| o.as_array().ok().and_then(|a| a.first().cloned()))
        .map(|o| doc.resolve(&o))
        .and_then(|o| o.as_dict().ok().cloned())
        .unwrap_or_default();

    let default_width = doc
        .dict_get(&descendant, b"DW")
        .and_then(|o| o.as_f32().ok())
        .unwrap_or(1000.0);
    let widths = doc
        .dict_get(&descendant, b"W")
        .and_then(|o| o.as_array().ok().cloned())
        .map(|arr| parse_cid_widths(doc, &arr))
        .unwrap_or_default();

    let cid_to_gid = match doc.dict_get(&descendant, b"CIDToGIDMap") {
        Some(obj) => match &*obj {
            Object::Name(n) if n == b"Identity" => CidToGid::Identity,
            Object::Stream(_) | Object::Reference(_) => {
                let bytes = match descendant.get(b"CIDToGIDMap") {
                    Ok(Object::Reference(r)) => {
                        doc.stream_bytes(*r, page, warnings).as_ref().clone()
                    }
                    Ok(Object::Stream(s)) => doc.decode_stream_direct(s, page, warnings),
                    _ => Vec::new(),
                };
                let entries = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                CidToGid::Map(entries)
            }
            _ => CidToGid::Identity,
        },
        None => CidToGid::Identity,
    };

    CompositeFont {
        cmap,
        default_width,
        widths,
        cid_to_gid,
    }
}

/// The Type0 `/Encoding`: the identity maps, a predefined CMap from the
/// document registry, or an embedded CMap stream.
fn load_code_to_cid_map(
    doc: &PdfDocument,
    font_dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Rc<CMap> {
    let obj = match font_dict.get(b"Encoding") {
        Ok(o) => o.clone(),
        Err(_) => return Rc::new(CMap::identity(0)),
    };
    match &obj {
        Object::Name(name) => {
            let name_str = String::from_utf8_lossy(name).into_owned();
            match name_str.as_str() {
                "Identity-H" => Rc::new(CMap::identity(0)),
                "Identity-V" => Rc::new(CMap::identity(1)),
                _ => {
                    if let Some(known) = doc.cmap_registry.borrow().get(&name_str) {
                        return known.clone();
                    }
                    warnings.push(PdfWarnMsg::warning(
                        page,
                        0,
                        format!("predefined CMap {name_str:?} not available, using identity"),
                    ));
                    Rc::new(CMap::identity(0))
                }
            }
        }
        Object::Reference(r) => {
            if let Some(cached) = doc.cid_map_registry.borrow().get(r) {
                return cached.clone();
            }
            let bytes = doc.stream_bytes(*r, page, warnings);
            let lookup = |name: &str| doc.cmap_registry.borrow().get(name).cloned();
            let mut cmap = parse_cmap(&bytes, &lookup);
            if !cmap.has_codespaces() {
                cmap.add_codespace(2, 0x0000, 0xFFFF);
            }
            let rc = Rc::new(cmap);
            doc.cid_map_registry.borrow_mut().insert(*r, rc.clone());
            rc
        }
        _ => Rc::new(CMap::identity(0)),
    }
}

/// `/W`: `c [w1 w2 …]` assigns consecutive widths from `c`; `c1 c2 w`
/// assigns `w` to the whole inclusive range.
fn parse_cid_widths(doc: &PdfDocument, arr: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < arr.len() {
        let first = match doc.resolve(&arr[i]).as_i64() {
            Ok(v) if v >= 0 => v as u32,
            _ => break,
        };
        match arr.get(i + 1).map(|o| doc.resolve(o)) {
            Some(next) => match &*next {
                Object::Array(list) => {
                    for (offset, w) in list.iter().enumerate() {
                        if let Ok(w) = doc.resolve(w).as_f32() {
                            widths.insert(first + offset as u32, w);
                        }
                    }
                    i += 2;
                }
                _ => {
                    let last = match next.as_i64() {
                        Ok(v) if v >= i64::from(first) => v as u32,
                        _ => break,
                    };
                    let w = match arr.get(i + 2).map(|o| doc.resolve(o)) {
                        Some(w) => w.as_f32().unwrap_or(0.0),
                        None => break,
                    };
                    // cap the expansion; fonts do not have 2^32 CIDs
                    for cid in first..=last.min(first + 65535) {
                        widths.insert(cid, w);
                    }
                    i += 3;
                }
            },
            None => break,
        }
    }
    widths
}

fn load_type3(doc: &PdfDocument, font_dict: &Dictionary) -> Type3Font {
    let font_matrix = doc
        .dict_get(font_dict, b"FontMatrix")
        .and_then(|o| {
            let arr = o.as_array().ok()?;
            if arr.len() < 6 {
                return None;
            }
            let mut m = [0f32; 6];
            for (slot, v) in m.iter_mut().zip(arr.iter()) {
                *slot = doc.resolve(v).as_f32().ok()?;
            }
            Some(Matrix::from_array(m))
        })
        .unwrap_or_else(|| Matrix::scale(0.001, 0.001));

    let char_procs = doc
        .dict_get(font_dict, b"CharProcs")
        .and_then(|o| o.as_dict().ok().cloned())
        .map(|d| {
            d.iter()
                .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    let resources = doc
        .dict_get(font_dict, b"Resources")
        .and_then(|o| o.as_dict().ok().cloned());

    let first_char = doc
        .dict_get(font_dict, b"FirstChar")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    let widths = doc
        .dict_get(font_dict, b"Widths")
        .and_then(|o| {
            o.as_array().ok().map(|arr| {
                arr.iter()
                    .map(|w| doc.resolve(w).as_f32().unwrap_or(0.0))
                    .collect::<Vec<f32>>()
            })
        })
        .unwrap_or_default();

    Type3Font {
        encoding: parse_encoding(doc, font_dict, BaseEncoding::Standard),
        font_matrix,
        char_procs,
        resources,
        first_char,
        widths,
    }
}

// ----------------------------------------------------------------------
// embedded SFNT access

pub struct ParsedFont {
    pub num_glyphs: u16,
    units_per_em: u16,
    hhea_table: HheaTable,
    maxp_table: MaxpTable,
    hmtx_data: Box<[u8]>,
    cmap_subtable: Option<OwnedCmapSubtable>,
    /// direct 256-entry table from a format-0 subtable, if present
    format0: Option<Box<[u8; 256]>>,
    /// glyph name → glyph id from the `post` table
    post_names: Option<HashMap<String, u16>>,
}

impl std::fmt::Debug for ParsedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFont")
            .field("num_glyphs", &self.num_glyphs)
            .field("units_per_em", &self.units_per_em)
            .field("has_cmap", &self.cmap_subtable.is_some())
            .field("has_format0", &self.format0.is_some())
            .field("has_post_names", &self.post_names.is_some())
            .finish()
    }
}

impl ParsedFont {
    pub fn from_bytes(font_bytes: &[u8], font_index: usize) -> Option<Self> {
        let scope = ReadScope::new(font_bytes);
        let font_file = scope.read::<FontData<'_>>().ok()?;
        let provider = font_file.table_provider(font_index).ok()?;

        let head_data = provider.table_data(tag::HEAD).ok()??.into_owned();
        let head_table = ReadScope::new(&head_data).read::<HeadTable>().ok()?;

        let maxp_data = provider.table_data(tag::MAXP).ok()??.into_owned();
        let maxp_table = ReadScope::new(&maxp_data).read::<MaxpTable>().ok()?;

        let hhea_data = provider.table_data(tag::HHEA).ok()??.into_owned();
        let hhea_table = ReadScope::new(&hhea_data).read::<HheaTable>().ok()?;

        let hmtx_data = provider.table_data(tag::HMTX).ok()??.into_owned().into_boxed_slice();

        let mut font = ParsedFont {
            num_glyphs: maxp_table.num_glyphs,
            units_per_em: head_table.units_per_em,
            hhea_table,
            maxp_table,
            hmtx_data,
            cmap_subtable: None,
            format0: None,
            post_names: None,
        };

        // CID-keyed programs legitimately ship without a cmap table
        if let Ok(Some(cmap_data)) = provider.table_data(tag::CMAP) {
            font.format0 = parse_cmap_format0(&cmap_data);
            if let Ok(second_provider) = font_file.table_provider(font_index) {
                if let Ok(mut font_data_impl) = allsorts::font::Font::new(second_provider) {
                    font.cmap_subtable = ReadScope::new(font_data_impl.cmap_subtable_data())
                        .read::<CmapSubtable<'_>>()
                        .ok()
                        .and_then(|t| t.to_owned());
                }
            }
        }
        if let Ok(Some(post_data)) = provider.table_data(tag::POST) {
            font.post_names = parse_post_names(&post_data);
        }
        Some(font)
    }

    pub fn units_per_em_f32(&self) -> f32 {
        if self.units_per_em == 0 {
            1000.0
        } else {
            f32::from(self.units_per_em)
        }
    }

    /// Unicode scalar → glyph id through the best character map.
    pub fn lookup_glyph_index(&self, c: u32) -> Option<u16> {
        match self.cmap_subtable.as_ref()?.map_glyph(c) {
            Ok(Some(gid)) => Some(gid),
            _ => None,
        }
    }

    /// Direct byte lookup in a format-0 subtable.
    pub fn format0_glyph(&self, code: u8) -> Option<u16> {
        let table = self.format0.as_ref()?;
        let gid = table[usize::from(code)];
        if gid == 0 {
            None
        } else {
            Some(u16::from(gid))
        }
    }

    /// Glyph name → glyph id through the `post` table.
    pub fn glyph_for_name(&self, name: &str) -> Option<u16> {
        self.post_names.as_ref()?.get(name).copied()
    }

    /// Horizontal advance in font units.
    pub fn advance(&self, glyph_index: u16) -> Option<u16> {
        allsorts::glyph_info::advance(
            &self.maxp_table,
            &self.hhea_table,
            &self.hmtx_data,
            glyph_index,
        )
        .ok()
    }
}

/// Scans the raw `cmap` table for a format-0 subtable.
fn parse_cmap_format0(data: &[u8]) -> Option<Box<[u8; 256]>> {
    let be16 = |off: usize| -> Option<u16> {
        Some(u16::from_be_bytes([*data.get(off)?, *data.get(off + 1)?]))
    };
    let be32 = |off: usize| -> Option<u32> {
        Some(u32::from_be_bytes([
            *data.get(off)?,
            *data.get(off + 1)?,
            *data.get(off + 2)?,
            *data.get(off + 3)?,
        ]))
    };
    let num_tables = be16(2)?;
    for i in 0..usize::from(num_tables) {
        let rec = 4 + i * 8;
        let offset = be32(rec + 4)? as usize;
        if be16(offset)? == 0 {
            // format 0: header (6 bytes) then the 256-byte glyph array
            let table = data.get(offset + 6..offset + 6 + 256)?;
            let mut out = [0u8; 256];
            out.copy_from_slice(table);
            return Some(Box::new(out));
        }
    }
    None
}

/// `post` formats 1.0 (standard Macintosh order) and 2.0 (index array
/// plus pascal-string names).
fn parse_post_names(data: &[u8]) -> Option<HashMap<String, u16>> {
    let be32 = |off: usize| -> Option<u32> {
        Some(u32::from_be_bytes([
            *data.get(off)?,
            *data.get(off + 1)?,
            *data.get(off + 2)?,
            *data.get(off + 3)?,
        ]))
    };
    let be16 = |off: usize| -> Option<u16> {
        Some(u16::from_be_bytes([*data.get(off)?, *data.get(off + 1)?]))
    };
    let version = be32(0)?;
    let mut names = HashMap::new();
    match version {
        0x0001_0000 => {
            for (gid, name) in MAC_GLYPH_NAMES.iter().enumerate() {
                names.insert((*name).to_string(), gid as u16);
            }
        }
        0x0002_0000 => {
            let num_glyphs = usize::from(be16(32)?);
            let mut string_data = 34 + num_glyphs * 2;
            // collect the pascal strings first
            let mut custom = Vec::new();
            while string_data < data.len() {
                let len = usize::from(*data.get(string_data)?);
                let bytes = data.get(string_data + 1..string_data + 1 + len)?;
                custom.push(String::from_utf8_lossy(bytes).into_owned());
                string_data += 1 + len;
            }
            for gid in 0..num_glyphs {
                let index = usize::from(be16(34 + gid * 2)?);
                let name = if index < 258 {
                    MAC_GLYPH_NAMES.get(index).map(|n| (*n).to_string())
                } else {
                    custom.get(index - 258).cloned()
                };
                if let Some(name) = name {
                    names.entry(name).or_insert(gid as u16);
                }
            }
        }
        _ => return None,
    }
    Some(names)
}

/// The 258 standard Macintosh glyph names, in `post` order.
#[rustfmt::skip]
static MAC_GLYPH_NAMES: &[&str] = &[
    ".notdef", ".null", "nonmarkingreturn", "space", "exclam", "quotedbl",
    "numbersign", "dollar", "percent", "ampersand", "quotesingle", "parenleft",
    "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash",
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight",
    "nine", "colon", "semicolon", "less", "equal", "greater", "question", "at",
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
    "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft",
    "backslash", "bracketright", "asciicircum", "underscore", "grave", "a",
    "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p",
    "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar",
    "braceright", "asciitilde", "Adieresis", "Aring", "Ccedilla", "Eacute",
    "Ntilde", "Odieresis", "Udieresis", "aacute", "agrave", "acircumflex",
    "adieresis", "atilde", "aring", "ccedilla", "eacute", "egrave",
    "ecircumflex", "edieresis", "iacute", "igrave", "icircumflex", "idieresis",
    "ntilde", "oacute", "ograve", "ocircumflex", "odieresis", "otilde",
    "uacute", "ugrave", "ucircumflex", "udieresis", "dagger", "degree", "cent",
    "sterling", "section", "bullet", "paragraph", "germandbls", "registered",
    "copyright", "trademark", "acute", "dieresis", "notequal", "AE", "Oslash",
    "infinity", "plusminus", "lessequal", "greaterequal", "yen", "mu",
    "partialdiff", "summation", "product", "pi", "integral", "ordfeminine",
    "ordmasculine", "Omega", "ae", "oslash", "questiondown", "exclamdown",
    "logicalnot", "radical", "florin", "approxequal", "Delta", "guillemotleft",
    "guillemotright", "ellipsis", "nonbreakingspace", "Agrave", "Atilde",
    "Otilde", "OE", "oe", "endash", "emdash", "quotedblleft", "quotedblright",
    "quoteleft", "quoteright", "divide", "lozenge", "ydieresis", "Ydieresis",
    "fraction", "currency", "guilsinglleft", "guilsinglright", "fi", "fl",
    "daggerdbl", "periodcentered", "quotesinglbase", "quotedblbase",
    "perthousand", "Acircumflex", "Ecircumflex", "Aacute", "Edieresis",
    "Egrave", "Iacute", "Icircumflex", "Idieresis", "Igrave", "Oacute",
    "Ocircumflex", "apple", "Ograve", "Uacute", "Ucircumflex", "Ugrave",
    "dotlessi", "circumflex", "tilde", "macron", "breve", "dotaccent", "ring",
    "cedilla", "hungarumlaut", "ogonek", "caron", "Lslash", "lslash", "Scaron",
    "scaron", "Zcaron", "zcaron", "brokenbar", "Eth", "eth", "Yacute",
    "yacute", "Thorn", "thorn", "minus", "multiply", "onesuperior",
    "twosuperior", "threesuperior", "onehalf", "onequarter", "threequarters",
    "franc", "Gbreve", "gbreve", "Idotaccent", "Scedilla", "scedilla",
    "Cacute", "cacute", "Ccaron", "ccaron", "dcroat",
];

// ----------------------------------------------------------------------
// base-14 widths (AFM data, thousandths), sorted by glyph name

#[rustfmt::skip]
static HELVETICA_WIDTHS: &[(&str, u16)] = &[
    ("A", 667), ("B", 667), ("C", 722), ("D", 722), ("E", 667), ("F", 611),
    ("G", 778), ("H", 722), ("I", 278), ("J", 500), ("K", 667), ("L", 556),
    ("M", 833), ("N", 722), ("O", 778), ("P", 667), ("Q", 778), ("R", 722),
    ("S", 667), ("T", 611), ("U", 722), ("V", 667), ("W", 944), ("X", 667),
    ("Y", 667), ("Z", 611), ("a", 556), ("ampersand", 667), ("asciicircum", 469),
    ("asciitilde", 584), ("asterisk", 389), ("at", 1015), ("b", 556),
    ("backslash", 278), ("bar", 260), ("braceleft", 334), ("braceright", 334),
    ("bracketleft", 278), ("bracketright", 278), ("bullet", 350), ("c", 500),
    ("colon", 278), ("comma", 278), ("d", 556), ("dagger", 556),
    ("daggerdbl", 556), ("dollar", 556), ("e", 556), ("eight", 556),
    ("ellipsis", 1000), ("emdash", 1000), ("endash", 556), ("equal", 584),
    ("exclam", 278), ("f", 278), ("fi", 500), ("five", 556), ("fl", 500),
    ("four", 556), ("g", 556), ("greater", 584), ("h", 556), ("hyphen", 333),
    ("i", 222), ("j", 222), ("k", 500), ("l", 222), ("less", 584), ("m", 833),
    ("n", 556), ("nine", 556), ("numbersign", 556), ("o", 556), ("one", 556),
    ("p", 556), ("parenleft", 333), ("parenright", 333), ("percent", 889),
    ("period", 278), ("plus", 584), ("q", 556), ("question", 556),
    ("quotedbl", 355), ("quoteleft", 222), ("quoteright", 222),
    ("quotesingle", 191), ("r", 333), ("s", 500), ("semicolon", 278),
    ("seven", 556), ("six", 556), ("slash", 278), ("space", 278),
    ("t", 278), ("three", 556), ("two", 556), ("u", 556), ("underscore", 556),
    ("v", 500), ("w", 722), ("x", 500), ("y", 500), ("z", 500), ("zero", 556),
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: &[(&str, u16)] = &[
    ("A", 722), ("B", 722), ("C", 722), ("D", 722), ("E", 667), ("F", 611),
    ("G", 778), ("H", 722), ("I", 278), ("J", 556), ("K", 722), ("L", 611),
    ("M", 833), ("N", 722), ("O", 778), ("P", 667), ("Q", 778), ("R", 722),
    ("S", 667), ("T", 611), ("U", 722), ("V", 667), ("W", 944), ("X", 667),
    ("Y", 667), ("Z", 611), ("a", 556), ("ampersand", 722), ("b", 611),
    ("c", 556), ("colon", 333), ("comma", 278), ("d", 611), ("dollar", 556),
    ("e", 556), ("eight", 556), ("equal", 584), ("exclam", 333), ("f", 333),
    ("five", 556), ("four", 556), ("g", 611), ("h", 611), ("hyphen", 333),
    ("i", 278), ("j", 278), ("k", 556), ("l", 278), ("m", 889), ("n", 611),
    ("nine", 556), ("o", 611), ("one", 556), ("p", 611), ("parenleft", 333),
    ("parenright", 333), ("percent", 889), ("period", 278), ("plus", 584),
    ("q", 611), ("question", 611), ("r", 389), ("s", 556), ("semicolon", 333),
    ("seven", 556), ("six", 556), ("slash", 278), ("space", 278), ("t", 333),
    ("three", 556), ("two", 556), ("u", 611), ("v", 556), ("w", 778),
    ("x", 556), ("y", 556), ("z", 500), ("zero", 556),
];

#[rustfmt::skip]
static TIMES_WIDTHS: &[(&str, u16)] = &[
    ("A", 722), ("B", 667), ("C", 667), ("D", 722), ("E", 611), ("F", 556),
    ("G", 722), ("H", 722), ("I", 333), ("J", 389), ("K", 722), ("L", 611),
    ("M", 889), ("N", 722), ("O", 722), ("P", 556), ("Q", 722), ("R", 667),
    ("S", 556), ("T", 611), ("U", 722), ("V", 722), ("W", 944), ("X", 722),
    ("Y", 722), ("Z", 611), ("a", 444), ("ampersand", 778), ("b", 500),
    ("c", 444), ("colon", 278), ("comma", 250), ("d", 500), ("dollar", 500),
    ("e", 444), ("eight", 500), ("equal", 564), ("exclam", 333), ("f", 333),
    ("fi", 556), ("five", 500), ("fl", 556), ("four", 500), ("g", 500),
    ("h", 500), ("hyphen", 333), ("i", 278), ("j", 278), ("k", 500),
    ("l", 278), ("m", 778), ("n", 500), ("nine", 500), ("o", 500),
    ("one", 500), ("p", 500), ("parenleft", 333), ("parenright", 333),
    ("percent", 833), ("period", 250), ("plus", 564), ("q", 500),
    ("question", 444), ("r", 333), ("s", 389), ("semicolon", 278),
    ("seven", 500), ("six", 500), ("slash", 278), ("space", 250), ("t", 278),
    ("three", 500), ("two", 500), ("u", 500), ("v", 500), ("w", 722),
    ("x", 500), ("y", 500), ("z", 444), ("zero", 500),
];

#[rustfmt::skip]
static TIMES_BOLD_WIDTHS: &[(&str, u16)] = &[
    ("A", 722), ("B", 667), ("C", 722), ("D", 722), ("E", 667), ("F", 611),
    ("G", 778), ("H", 778), ("I", 389), ("J", 500), ("K", 778), ("L", 667),
    ("M", 944), ("N", 722), ("O", 778), ("P", 611), ("Q", 778), ("R", 722),
    ("S", 556), ("T", 667), ("U", 722), ("V", 722), ("W", 1000), ("X", 722),
    ("Y", 722), ("Z", 667), ("a", 500), ("ampersand", 833), ("b", 556),
    ("c", 444), ("colon", 333), ("comma", 250), ("d", 556), ("dollar", 500),
    ("e", 444), ("eight", 500), ("equal", 570), ("exclam", 333), ("f", 333),
    ("five", 500), ("four", 500), ("g", 500), ("h", 556), ("hyphen", 333),
    ("i", 278), ("j", 333), ("k", 556), ("l", 278), ("m", 833), ("n", 556),
    ("nine", 500), ("o", 500), ("one", 500), ("p", 556), ("parenleft", 333),
    ("parenright", 333), ("percent", 1000), ("period", 250), ("plus", 570),
    ("q", 556), ("question", 500), ("r", 444), ("s", 389), ("semicolon", 333),
    ("seven", 500), ("six", 500), ("slash", 278), ("space", 250), ("t", 333),
    ("three", 500), ("two", 500), ("u", 556), ("v", 500), ("w", 722),
    ("x", 500), ("y", 500), ("z", 444), ("zero", 500),
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn simple_font(widths: Vec<f32>, first_char: i64) -> PdfFont {
        PdfFont {
            base_font: "Test".to_string(),
            variant: FontVariant::Simple(SimpleFont {
                encoding: Encoding::from_base(BaseEncoding::WinAnsi),
                first_char,
                widths,
                builtin: None,
            }),
            descriptor: None,
            to_unicode: None,
            font_file: None,
            embedded: None,
        }
    }

    #[test]
    fn simple_font_tokenizes_per_byte() {
        let font = simple_font(vec![], 0);
        let codes = font.encode_bytes(&[0x41, 0x42]);
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].bytes(), &[0x41]);
    }

    #[test]
    fn widths_index_by_code_minus_first_char() {
        let font = simple_font(vec![100.0, 200.0, 300.0], 65);
        assert_eq!(font.glyph_width(CharacterCode::new(&[65])), 100.0);
        assert_eq!(font.glyph_width(CharacterCode::new(&[67])), 300.0);
        // outside the array: missing width (0 without a descriptor)
        assert_eq!(font.glyph_width(CharacterCode::new(&[90])), 0.0);
    }

    #[test]
    fn composite_font_uses_cmap_and_w_array() {
        let mut cmap = CMap::identity(0);
        cmap.add_cid_char(CharacterCode::new(&[0x00, 0x41]), 3, true);
        let mut widths = HashMap::new();
        widths.insert(3u32, 750.0f32);
        let font = PdfFont {
            base_font: "TestCID".to_string(),
            variant: FontVariant::Composite(CompositeFont {
                cmap: Rc::new(cmap),
                default_width: 1000.0,
                widths,
                cid_to_gid: CidToGid::Identity,
            }),
            descriptor: None,
            to_unicode: None,
            font_file: None,
            embedded: None,
        };
        let codes = font.encode_bytes(&[0x00, 0x41, 0x00, 0x42]);
        assert_eq!(codes.len(), 2);
        assert_eq!(font.glyph_width(codes[0]), 750.0);
        assert_eq!(font.glyph_width(codes[1]), 1000.0);
        // identity CIDToGID: the mapped CID is the glyph id
        assert_eq!(font.glyph_id(codes[0]), 3);
        assert_eq!(font.glyph_id(codes[1]), 0x42);
    }

    #[test]
    fn cid_to_gid_map_indexes_big_endian_entries() {
        let map = CidToGid::Map(vec![0, 7, 9]);
        assert_eq!(map.glyph(1), 7);
        assert_eq!(map.glyph(2), 9);
        assert_eq!(map.glyph(99), 0);
    }

    #[test]
    fn builtin_widths_for_base_14() {
        assert_eq!(BuiltinFont::from_id("Helvetica"), Some(BuiltinFont::Helvetica));
        assert_eq!(
            BuiltinFont::from_id("ABCDEF+Helvetica"),
            Some(BuiltinFont::Helvetica)
        );
        assert_eq!(BuiltinFont::Helvetica.glyph_width("space"), 278.0);
        assert_eq!(BuiltinFont::Courier.glyph_width("anything"), 600.0);
        assert_eq!(BuiltinFont::TimesRoman.glyph_width("W"), 944.0);
    }

    #[test]
    fn word_space_is_single_byte_0x20_only() {
        let font = simple_font(vec![], 0);
        assert!(font.is_word_space(CharacterCode::new(&[0x20])));
        assert!(!font.is_word_space(CharacterCode::new(&[0x00, 0x20])));
        assert!(!font.is_word_space(CharacterCode::new(&[0x21])));
    }

    #[test]
    fn post_format2_names_resolve() {
        // post 2.0: 2 glyphs, glyph 0 -> standard index 0 (.notdef),
        // glyph 1 -> custom index 258 ("myglyph")
        let mut data = Vec::new();
        data.extend_from_slice(&0x0002_0000u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 28]); // fixed header fields
        data.extend_from_slice(&2u16.to_be_bytes()); // numGlyphs
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&258u16.to_be_bytes());
        data.push(7);
        data.extend_from_slice(b"myglyph");
        let names = parse_post_names(&data).unwrap();
        assert_eq!(names.get(".notdef"), Some(&0));
        assert_eq!(names.get("myglyph"), Some(&1));
    }

    #[test]
    fn cmap_format0_scan_finds_table() {
        // cmap header with one (1,0) record pointing at a format 0 table
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&1u16.to_be_bytes()); // numTables
        data.extend_from_slice(&1u16.to_be_bytes()); // platform
        data.extend_from_slice(&0u16.to_be_bytes()); // encoding
        data.extend_from_slice(&12u32.to_be_bytes()); // offset
        data.extend_from_slice(&0u16.to_be_bytes()); // format 0
        data.extend_from_slice(&262u16.to_be_bytes()); // length
        data.extend_from_slice(&0u16.to_be_bytes()); // language
        let mut glyphs = [0u8; 256];
        glyphs[0x41] = 36;
        data.extend_from_slice(&glyphs);
        let table = parse_cmap_format0(&data).unwrap();
        assert_eq!(table[0x41], 36);
        assert_eq!(table[0x42], 0);
    }
}
