//! cmap.rs
//!
//! Length-aware character-code maps. A CMap owns codespace ranges (code
//! length in bytes plus an inclusive big-endian interval), per-length
//! buckets of single code mappings and per-length buckets of sorted,
//! non-overlapping ranges looked up by binary search. The same structure
//! backs code→CID maps, ToUnicode maps and the predefined identities.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::lexer::Lexer;
use crate::object::Object;

pub const MAX_CODE_LEN: usize = 4;

/// A character code: up to four bytes, equal only when both the bytes
/// and the length agree (`41` ≠ `00 41`).
#[derive(Debug, Clone, Copy, Eq)]
pub struct CharacterCode {
    len: u8,
    bytes: [u8; MAX_CODE_LEN],
}

impl CharacterCode {
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_CODE_LEN);
        let mut buf = [0u8; MAX_CODE_LEN];
        buf[..len].copy_from_slice(&bytes[..len]);
        CharacterCode {
            len: len as u8,
            bytes: buf,
        }
    }

    /// Packs a big-endian value into a code of the given byte length.
    pub fn from_value(value: u32, len: usize) -> Self {
        let len = len.clamp(1, MAX_CODE_LEN);
        let mut buf = [0u8; MAX_CODE_LEN];
        for i in 0..len {
            buf[i] = (value >> ((len - 1 - i) * 8)) as u8;
        }
        CharacterCode {
            len: len as u8,
            bytes: buf,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Big-endian numeric value.
    pub fn value(&self) -> u32 {
        self.bytes().iter().fold(0u32, |acc, &b| acc << 8 | u32::from(b))
    }
}

impl PartialEq for CharacterCode {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Hash for CharacterCode {
    /// FNV-1a over the bytes, then the length.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut h: u64 = 0xcbf29ce484222325;
        for &b in self.bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x100000001b3);
        }
        h ^= u64::from(self.len);
        h = h.wrapping_mul(0x100000001b3);
        state.write_u64(h);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodespaceRange {
    /// code length in bytes, 1..=4
    pub len: u8,
    pub start: u32,
    pub end: u32,
}

/// Sorted range entry: codes in `[start, end]` map to `base + (v - start)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MapRange {
    start: u32,
    end: u32,
    base: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CidSystemInfo {
    pub registry: String,
    pub ordering: String,
    pub supplement: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CMap {
    pub name: Option<String>,
    /// 0 horizontal, 1 vertical
    pub wmode: u8,
    pub cid_system_info: Option<CidSystemInfo>,
    codespaces: Vec<CodespaceRange>,
    cid_singles: HashMap<CharacterCode, u32>,
    uni_singles: HashMap<CharacterCode, String>,
    /// per-length buckets, index = code length - 1
    cid_ranges: [Vec<MapRange>; MAX_CODE_LEN],
    uni_ranges: [Vec<MapRange>; MAX_CODE_LEN],
}

impl CMap {
    pub fn new() -> Self {
        CMap::default()
    }

    /// The predefined Identity-H / Identity-V maps: two-byte codes, CID
    /// equal to the code value.
    pub fn identity(wmode: u8) -> Self {
        let mut cmap = CMap {
            name: Some(if wmode == 0 { "Identity-H" } else { "Identity-V" }.to_string()),
            wmode,
            ..CMap::default()
        };
        cmap.add_codespace(2, 0x0000, 0xFFFF);
        cmap.add_cid_range(2, 0x0000, 0xFFFF, 0, false);
        cmap
    }

    pub fn has_codespaces(&self) -> bool {
        !self.codespaces.is_empty()
    }

    pub fn add_codespace(&mut self, len: u8, start: u32, end: u32) {
        let len = len.clamp(1, MAX_CODE_LEN as u8);
        let range = CodespaceRange { len, start, end };
        if !self.codespaces.contains(&range) {
            self.codespaces.push(range);
        }
    }

    pub fn add_cid_char(&mut self, code: CharacterCode, cid: u32, overwrite: bool) {
        if overwrite || !self.cid_singles.contains_key(&code) {
            self.cid_singles.insert(code, cid);
        }
    }

    pub fn add_unicode_char(&mut self, code: CharacterCode, text: String, overwrite: bool) {
        if overwrite || !self.uni_singles.contains_key(&code) {
            self.uni_singles.insert(code, text);
        }
    }

    pub fn add_cid_range(&mut self, len: usize, start: u32, end: u32, base: u32, overwrite: bool) {
        let bucket = (len.clamp(1, MAX_CODE_LEN)) - 1;
        Self::insert_range(&mut self.cid_ranges[bucket], start, end, base, overwrite);
    }

    pub fn add_unicode_range(
        &mut self,
        len: usize,
        start: u32,
        end: u32,
        base: u32,
        overwrite: bool,
    ) {
        let bucket = (len.clamp(1, MAX_CODE_LEN)) - 1;
        Self::insert_range(&mut self.uni_ranges[bucket], start, end, base, overwrite);
    }

    /// Keeps the bucket sorted by start and non-overlapping. Without the
    /// override flag an insertion that overlaps existing entries is
    /// dropped, which also makes re-insertion idempotent.
    fn insert_range(bucket: &mut Vec<MapRange>, start: u32, end: u32, base: u32, overwrite: bool) {
        if end < start {
            return;
        }
        let overlaps = |r: &MapRange| r.start <= end && start <= r.end;
        if bucket.iter().any(overlaps) {
            if !overwrite {
                return;
            }
            bucket.retain(|r| !overlaps(r));
        }
        let pos = bucket.partition_point(|r| r.start < start);
        bucket.insert(pos, MapRange { start, end, base });
    }

    fn range_lookup(bucket: &[MapRange], value: u32) -> Option<u32> {
        let idx = bucket.partition_point(|r| r.end < value);
        let r = bucket.get(idx)?;
        if value >= r.start && value <= r.end {
            Some(r.base + (value - r.start))
        } else {
            None
        }
    }

    pub fn lookup_cid(&self, code: CharacterCode) -> Option<u32> {
        if code.is_empty() {
            return None;
        }
        if let Some(&cid) = self.cid_singles.get(&code) {
            return Some(cid);
        }
        Self::range_lookup(&self.cid_ranges[code.len() - 1], code.value())
    }

    pub fn lookup_unicode(&self, code: CharacterCode) -> Option<String> {
        if code.is_empty() {
            return None;
        }
        if let Some(s) = self.uni_singles.get(&code) {
            return Some(s.clone());
        }
        let scalar = Self::range_lookup(&self.uni_ranges[code.len() - 1], code.value())?;
        valid_scalar(scalar).map(String::from)
    }

    /// Longest-prefix tokenization: consumes the longest 1–4 byte prefix
    /// whose value falls inside a declared codespace range of that
    /// length. With no match one byte is consumed as an undefined code.
    /// Returns the code and whether it was inside a codespace.
    pub fn next_code(&self, bytes: &[u8]) -> Option<(CharacterCode, bool)> {
        if bytes.is_empty() {
            return None;
        }
        let max = bytes.len().min(MAX_CODE_LEN);
        for take in (1..=max).rev() {
            let code = CharacterCode::new(&bytes[..take]);
            let value = code.value();
            let inside = self
                .codespaces
                .iter()
                .any(|cs| usize::from(cs.len) == take && value >= cs.start && value <= cs.end);
            if inside {
                return Some((code, true));
            }
        }
        Some((CharacterCode::new(&bytes[..1]), false))
    }

    /// Merges `other` into `self`. With `overwrite` false existing
    /// entries win, which is the `usecmap` contract.
    pub fn merge(&mut self, other: &CMap, overwrite: bool) {
        for cs in &other.codespaces {
            self.add_codespace(cs.len, cs.start, cs.end);
        }
        for (code, cid) in &other.cid_singles {
            self.add_cid_char(*code, *cid, overwrite);
        }
        for (code, text) in &other.uni_singles {
            self.add_unicode_char(*code, text.clone(), overwrite);
        }
        for (len, bucket) in other.cid_ranges.iter().enumerate() {
            for r in bucket {
                self.add_cid_range(len + 1, r.start, r.end, r.base, overwrite);
            }
        }
        for (len, bucket) in other.uni_ranges.iter().enumerate() {
            for r in bucket {
                self.add_unicode_range(len + 1, r.start, r.end, r.base, overwrite);
            }
        }
        if self.wmode == 0 {
            self.wmode = other.wmode;
        }
    }
}

/// Unicode scalars outside the surrogate block and below 0x10FFFF.
fn valid_scalar(v: u32) -> Option<char> {
    if (0xD800..=0xDFFF).contains(&v) || v > 0x10FFFF {
        None
    } else {
        char::from_u32(v)
    }
}

/// UTF-16BE with an optional byte-order mark, as used by bfchar/bfrange
/// targets.
fn utf16_be_to_scalars(bytes: &[u8]) -> Vec<u32> {
    let bytes = if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        &bytes[2..]
    } else {
        bytes
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let u = units[i];
        if (0xD800..=0xDBFF).contains(&u) && i + 1 < units.len() {
            let lo = units[i + 1];
            if (0xDC00..=0xDFFF).contains(&lo) {
                out.push(0x10000 + ((u32::from(u) - 0xD800) << 10) + (u32::from(lo) - 0xDC00));
                i += 2;
                continue;
            }
        }
        out.push(u32::from(u));
        i += 1;
    }
    // a one-byte target is a raw scalar
    if out.is_empty() && bytes.len() == 1 {
        out.push(u32::from(bytes[0]));
    }
    out
}

fn scalars_to_string(scalars: &[u32]) -> String {
    scalars.iter().filter_map(|&v| valid_scalar(v)).collect()
}

/// Looks up base CMaps for `usecmap`, by name only.
pub type CMapLookup<'a> = dyn Fn(&str) -> Option<Rc<CMap>> + 'a;

/// Parses a CMap stream: operator-delimited blocks of hex-string pairs
/// and triples. Unknown operators are skipped, so the PostScript wrapper
/// tokens (`def`, `begin`, `dict`, …) fall through harmlessly.
pub fn parse_cmap(data: &[u8], base_lookup: &CMapLookup) -> CMap {
    let mut cmap = CMap::new();
    let mut lexer = Lexer::new(data);
    // operands seen since the last operator, for /CMapName /WMode /Name usecmap
    let mut operands: Vec<Object> = Vec::new();

    while let Ok(Some(token)) = lexer.read_next(false) {
        let op = match token {
            Object::Operator(op) => op,
            other => {
                operands.push(other);
                continue;
            }
        };
        match op.as_str() {
            "begincodespacerange" => {
                while !lexer.match_sequence(b"endcodespacerange") {
                    let (start, end) = match read_hex_pair(&mut lexer) {
                        Some(p) => p,
                        None => break,
                    };
                    cmap.add_codespace(start.len() as u8, start.value(), end.value());
                }
            }
            "beginbfchar" => {
                while !lexer.match_sequence(b"endbfchar") {
                    let code = match read_hex(&mut lexer) {
                        Some(c) => c,
                        None => break,
                    };
                    let target = match lexer.read_next(false) {
                        Ok(Some(Object::String(s, _))) => s,
                        _ => break,
                    };
                    let scalars = utf16_be_to_scalars(&target);
                    cmap.add_unicode_char(code, scalars_to_string(&scalars), false);
                }
            }
            "beginbfrange" => {
                while !lexer.match_sequence(b"endbfrange") {
                    if !read_bfrange_entry(&mut lexer, &mut cmap) {
                        break;
                    }
                }
            }
            "begincidchar" => {
                while !lexer.match_sequence(b"endcidchar") {
                    let code = match read_hex(&mut lexer) {
                        Some(c) => c,
                        None => break,
                    };
                    let cid = match lexer.read_next(false) {
                        Ok(Some(Object::Integer(i))) if i >= 0 => i as u32,
                        _ => break,
                    };
                    cmap.add_cid_char(code, cid, false);
                }
            }
            "begincidrange" => {
                while !lexer.match_sequence(b"endcidrange") {
                    let (start, end) = match read_hex_pair(&mut lexer) {
                        Some(p) => p,
                        None => break,
                    };
                    let base = match lexer.read_next(false) {
                        Ok(Some(Object::Integer(i))) if i >= 0 => i as u32,
                        _ => break,
                    };
                    cmap.add_cid_range(start.len(), start.value(), end.value(), base, false);
                }
            }
            "usecmap" => {
                // resolves by CMap name only; anything else is ignored
                if let Some(Object::Name(name)) = operands.last() {
                    if let Ok(name) = std::str::from_utf8(name) {
                        if let Some(base) = base_lookup(name) {
                            cmap.merge(&base, false);
                        }
                    }
                }
                operands.clear();
            }
            "def" => {
                apply_def(&mut cmap, &operands);
                operands.clear();
            }
            "endcmap" => break,
            _ => operands.clear(),
        }
    }
    cmap
}

/// `/CMapName /X def`, `/WMode 1 def`, `/CIDSystemInfo << … >> def`
fn apply_def(cmap: &mut CMap, operands: &[Object]) {
    let (key, value) = match operands {
        [.., Object::Name(key), value] => (key.as_slice(), value),
        _ => return,
    };
    match key {
        b"CMapName" => {
            if let Object::Name(n) = value {
                cmap.name = Some(String::from_utf8_lossy(n).into_owned());
            }
        }
        b"WMode" => {
            if let Object::Integer(i) = value {
                cmap.wmode = u8::from(*i == 1);
            }
        }
        b"CIDSystemInfo" => {
            if let Object::Dictionary(d) = value {
                let string = |key: &[u8]| {
                    d.get(key)
                        .ok()
                        .and_then(|o| o.as_string_bytes().ok())
                        .map(|b| String::from_utf8_lossy(b).into_owned())
                };
                cmap.cid_system_info = Some(CidSystemInfo {
                    registry: string(b"Registry").unwrap_or_default(),
                    ordering: string(b"Ordering").unwrap_or_default(),
                    supplement: d
                        .get(b"Supplement")
                        .ok()
                        .and_then(|o| o.as_i64().ok())
                        .unwrap_or(0),
                });
            }
        }
        _ => {}
    }
}

fn read_hex(lexer: &mut Lexer) -> Option<CharacterCode> {
    match lexer.read_next(false) {
        Ok(Some(Object::String(s, _))) if !s.is_empty() => Some(CharacterCode::new(&s)),
        _ => None,
    }
}

fn read_hex_pair(lexer: &mut Lexer) -> Option<(CharacterCode, CharacterCode)> {
    let start = read_hex(lexer)?;
    let end = read_hex(lexer)?;
    Some((start, end))
}

/// One bfrange triple. The third operand is either a hex string
/// (sequential mapping) or an array (explicit per-code mapping).
fn read_bfrange_entry(lexer: &mut Lexer, cmap: &mut CMap) -> bool {
    let (start, end) = match read_hex_pair(lexer) {
        Some(p) => p,
        None => return false,
    };
    let len = start.len();
    match lexer.read_next(false) {
        Ok(Some(Object::String(target, _))) => {
            // the FF FF placeholder carries no mapping
            if target == [0xFF, 0xFF] {
                return true;
            }
            let scalars = utf16_be_to_scalars(&target);
            match scalars.as_slice() {
                [] => {}
                [single] => {
                    cmap.add_unicode_range(len, start.value(), end.value(), *single, false);
                }
                // multi-scalar targets map only the starting code
                multi => {
                    cmap.add_unicode_char(start, scalars_to_string(multi), false);
                }
            }
            true
        }
        Ok(Some(Object::Array(items))) => {
            for (i, item) in items.iter().enumerate() {
                let code = CharacterCode::from_value(start.value() + i as u32, len);
                if let Object::String(bytes, _) = item {
                    let scalars = utf16_be_to_scalars(bytes);
                    cmap.add_unicode_char(code, scalars_to_string(&scalars), false);
                }
            }
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_bases(_: &str) -> Option<Rc<CMap>> {
        None
    }

    #[test]
    fn character_codes_are_length_aware() {
        let short = CharacterCode::new(&[0x41]);
        let long = CharacterCode::new(&[0x00, 0x41]);
        assert_ne!(short, long);
        assert_eq!(short.value(), long.value());
        let mut map = HashMap::new();
        map.insert(short, 1);
        map.insert(long, 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn sequential_range_agrees_with_lookup() {
        // for all v in [s, e]: lookup(pack(v, n)) == t + (v - s)
        let mut cmap = CMap::new();
        let (s, e, t) = (0x2000u32, 0x20FFu32, 0x450u32);
        cmap.add_cid_range(2, s, e, t, false);
        for v in s..=e {
            let code = CharacterCode::from_value(v, 2);
            assert_eq!(cmap.lookup_cid(code), Some(t + (v - s)));
        }
        assert_eq!(cmap.lookup_cid(CharacterCode::from_value(s - 1, 2)), None);
        assert_eq!(cmap.lookup_cid(CharacterCode::from_value(e + 1, 2)), None);
    }

    #[test]
    fn binary_search_finds_unique_range_or_none() {
        let mut cmap = CMap::new();
        cmap.add_cid_range(2, 0x10, 0x1F, 100, false);
        cmap.add_cid_range(2, 0x30, 0x3F, 200, false);
        cmap.add_cid_range(2, 0x50, 0x5F, 300, false);
        assert_eq!(cmap.lookup_cid(CharacterCode::from_value(0x35, 2)), Some(205));
        assert_eq!(cmap.lookup_cid(CharacterCode::from_value(0x25, 2)), None);
        assert_eq!(cmap.lookup_cid(CharacterCode::from_value(0x5F, 2)), Some(315));
    }

    #[test]
    fn merge_preserves_existing_and_is_idempotent() {
        let mut a = CMap::new();
        a.add_cid_char(CharacterCode::new(&[0x01]), 10, false);
        let mut b = CMap::new();
        b.add_cid_char(CharacterCode::new(&[0x01]), 99, false);
        b.add_cid_char(CharacterCode::new(&[0x02]), 20, false);

        a.merge(&b, false);
        assert_eq!(a.lookup_cid(CharacterCode::new(&[0x01])), Some(10));
        assert_eq!(a.lookup_cid(CharacterCode::new(&[0x02])), Some(20));

        // merging again changes nothing
        a.merge(&b, false);
        assert_eq!(a.lookup_cid(CharacterCode::new(&[0x01])), Some(10));
        assert_eq!(a.lookup_cid(CharacterCode::new(&[0x02])), Some(20));
    }

    #[test]
    fn merge_commutes_on_disjoint_keys() {
        let mut a = CMap::new();
        a.add_cid_char(CharacterCode::new(&[0x01]), 10, false);
        a.add_cid_range(2, 0x100, 0x1FF, 700, false);
        let mut b = CMap::new();
        b.add_cid_char(CharacterCode::new(&[0x02]), 20, false);
        b.add_cid_range(2, 0x300, 0x3FF, 900, false);

        let mut ab = a.clone();
        ab.merge(&b, false);
        let mut ba = b.clone();
        ba.merge(&a, false);
        for code in [
            CharacterCode::new(&[0x01]),
            CharacterCode::new(&[0x02]),
            CharacterCode::from_value(0x150, 2),
            CharacterCode::from_value(0x350, 2),
            CharacterCode::from_value(0x250, 2),
        ] {
            assert_eq!(ab.lookup_cid(code), ba.lookup_cid(code));
        }
    }

    #[test]
    fn tokenization_takes_longest_codespace_prefix() {
        let mut cmap = CMap::new();
        cmap.add_codespace(1, 0x00, 0x7F);
        cmap.add_codespace(2, 0x8000, 0xFFFF);
        let (code, defined) = cmap.next_code(&[0x41, 0x42]).unwrap();
        assert!(defined);
        assert_eq!(code.bytes(), &[0x41]);
        let (code, defined) = cmap.next_code(&[0x81, 0x40, 0x41]).unwrap();
        assert!(defined);
        assert_eq!(code.bytes(), &[0x81, 0x40]);
        // outside every codespace: one byte, undefined
        let (code, defined) = cmap.next_code(&[0xFF]).unwrap();
        assert!(!defined);
        assert_eq!(code.len(), 1);
    }

    #[test]
    fn bfrange_maps_single_byte_to_unicode() {
        // <00> <05> <0041>: byte 0x02 maps to "C"
        let src = b"begincmap\n1 begincodespacerange\n<00> <FF>\nendcodespacerange\n\
                    1 beginbfrange\n<00> <05> <0041>\nendbfrange\nendcmap";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x02])),
            Some("C".to_string())
        );
        assert_eq!(cmap.lookup_unicode(CharacterCode::new(&[0x06])), None);
    }

    #[test]
    fn bfrange_array_form_and_bfchar() {
        let src = b"2 beginbfchar\n<01> <0058>\n<02> <FEFF0059>\nendbfchar\n\
                    1 beginbfrange\n<10> <12> [<0041> <0042> <0043>]\nendbfrange";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x01])),
            Some("X".to_string())
        );
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x02])),
            Some("Y".to_string())
        );
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x11])),
            Some("B".to_string())
        );
    }

    #[test]
    fn bfchar_surrogate_pair_decodes_to_astral_scalar() {
        let src = b"1 beginbfchar\n<01> <D83DDE00>\nendbfchar";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x01])),
            Some("\u{1F600}".to_string())
        );
    }

    #[test]
    fn multi_scalar_bfrange_target_maps_start_only() {
        let src = b"1 beginbfrange\n<20> <22> <00660066>\nendbfrange";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::new(&[0x20])),
            Some("ff".to_string())
        );
        assert_eq!(cmap.lookup_unicode(CharacterCode::new(&[0x21])), None);
    }

    #[test]
    fn cid_blocks_parse() {
        let src = b"1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
                    2 begincidchar\n<0041> 97\n<0042> 98\nendcidchar\n\
                    1 begincidrange\n<1000> <10FF> 500\nendcidrange";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(cmap.lookup_cid(CharacterCode::new(&[0x00, 0x41])), Some(97));
        assert_eq!(
            cmap.lookup_cid(CharacterCode::new(&[0x10, 0x20])),
            Some(500 + 0x20)
        );
    }

    #[test]
    fn usecmap_merges_base_without_override() {
        let mut base = CMap::identity(0);
        base.add_cid_char(CharacterCode::new(&[0x00, 0x01]), 777, true);
        let base = Rc::new(base);
        let lookup = move |name: &str| {
            if name == "Identity-H" {
                Some(base.clone())
            } else {
                None
            }
        };
        let src = b"/Identity-H usecmap\n\
                    2 begincidchar\n<0001> 5\nendcidchar";
        let cmap = parse_cmap(src, &lookup);
        // the embedded map's own entry was added after the merge and the
        // merged base entry stays
        assert_eq!(cmap.lookup_cid(CharacterCode::new(&[0x00, 0x01])), Some(777));
        assert_eq!(
            cmap.lookup_cid(CharacterCode::new(&[0x12, 0x34])),
            Some(0x1234)
        );
        assert!(cmap.has_codespaces());
    }

    #[test]
    fn wmode_and_cmap_name_defs() {
        let src = b"/CMapName /Custom-V def\n/WMode 1 def\n\
                    /CIDSystemInfo << /Registry (Adobe) /Ordering (Japan1) /Supplement 6 >> def";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(cmap.name.as_deref(), Some("Custom-V"));
        assert_eq!(cmap.wmode, 1);
        let info = cmap.cid_system_info.unwrap();
        assert_eq!(info.registry, "Adobe");
        assert_eq!(info.ordering, "Japan1");
        assert_eq!(info.supplement, 6);
    }

    #[test]
    fn ffff_sentinel_is_skipped() {
        let src = b"1 beginbfrange\n<00> <10> <FFFF>\nendbfrange";
        let cmap = parse_cmap(src, &no_bases);
        assert_eq!(cmap.lookup_unicode(CharacterCode::new(&[0x05])), None);
    }

    #[test]
    fn surrogate_range_targets_are_rejected() {
        let mut cmap = CMap::new();
        cmap.add_unicode_range(2, 0x00, 0x10, 0xD7FF, false);
        assert_eq!(
            cmap.lookup_unicode(CharacterCode::from_value(0x00, 2)),
            Some("\u{D7FF}".to_string())
        );
        // 0xD7FF + 1 lands in the surrogate block
        assert_eq!(cmap.lookup_unicode(CharacterCode::from_value(0x01, 2)), None);
    }
}
