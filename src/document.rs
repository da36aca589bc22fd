//! document.rs
//!
//! The `PdfDocument` owns everything a render needs: the raw file bytes,
//! the cross-reference table, the object cache, the page list with
//! inherited attributes, the name trees and the per-document registries
//! (CMaps, ToUnicode maps, fonts, color spaces, patterns). Children of
//! the document borrow through it; nothing outlives the document.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_derive::{Deserialize, Serialize};

use crate::cmap::CMap;
use crate::date::{parse_pdf_date, OffsetDateTime};
use crate::encryption::{IdentityHandler, SecurityHandler};
use crate::errors::{PdfError, PdfWarnMsg};
use crate::graphics::Rect;
use crate::lexer::Lexer;
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::xref::{parse_xref, Xref, XrefEntry};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfParseOptions {
    /// Fail the whole parse on the first malformed object instead of
    /// skipping it with a warning
    #[serde(default)]
    pub fail_on_error: bool,
    /// User or owner password handed to the security handler
    #[serde(default)]
    pub password: Option<String>,
}

/// `/Info` dictionary contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<OffsetDateTime>,
    pub mod_date: Option<OffsetDateTime>,
}

/// One page with its inherited attributes already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    pub id: ObjectId,
    pub dict: Dictionary,
    /// Own resources overlaid over inherited ones
    pub resources: Dictionary,
    pub media_box: Rect,
    pub crop_box: Rect,
    /// Clockwise degrees, multiple of 90
    pub rotate: i32,
}

pub struct PdfDocument {
    data: Vec<u8>,
    xref: Xref,
    pages: Vec<PdfPage>,
    security: Box<dyn SecurityHandler>,
    /// resolved indirect objects
    cache: RefCell<HashMap<ObjectId, Rc<Object>>>,
    /// cycle guard for resolution in progress
    resolving: RefCell<HashSet<ObjectId>>,
    /// decoded stream payloads
    stream_cache: RefCell<HashMap<ObjectId, Rc<Vec<u8>>>>,
    /// parsed CMaps by CMap name (predefined and embedded `usecmap` bases)
    pub(crate) cmap_registry: RefCell<HashMap<String, Rc<CMap>>>,
    /// parsed ToUnicode CMaps by stream id
    pub(crate) to_unicode_registry: RefCell<HashMap<ObjectId, Rc<CMap>>>,
    /// parsed code-to-CID CMaps by stream id
    pub(crate) cid_map_registry: RefCell<HashMap<ObjectId, Rc<CMap>>>,
    /// resolved fonts by font-dictionary id
    pub(crate) font_cache: RefCell<HashMap<ObjectId, Rc<crate::font::PdfFont>>>,
    /// resolved color spaces by defining-object id
    pub(crate) colorspace_cache: RefCell<HashMap<ObjectId, Rc<crate::color::ColorSpace>>>,
    /// parsed pattern descriptors by pattern-object id
    pub(crate) pattern_cache: RefCell<HashMap<ObjectId, Rc<crate::pattern::Pattern>>>,
}

impl PdfDocument {
    /// Opens a document from bytes. Structural damage downgrades to
    /// warnings wherever a rebuild can recover.
    pub fn parse(
        bytes: &[u8],
        opts: &PdfParseOptions,
    ) -> Result<(PdfDocument, Vec<PdfWarnMsg>), PdfError> {
        let mut warnings = Vec::new();
        let xref = parse_xref(bytes, &mut warnings)?;
        let mut doc = PdfDocument {
            data: bytes.to_vec(),
            xref,
            pages: Vec::new(),
            security: Box::new(IdentityHandler),
            cache: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
            stream_cache: RefCell::new(HashMap::new()),
            cmap_registry: RefCell::new(HashMap::new()),
            to_unicode_registry: RefCell::new(HashMap::new()),
            cid_map_registry: RefCell::new(HashMap::new()),
            font_cache: RefCell::new(HashMap::new()),
            colorspace_cache: RefCell::new(HashMap::new()),
            pattern_cache: RefCell::new(HashMap::new()),
        };
        if doc.xref.trailer.has(b"Encrypt") {
            warnings.push(PdfWarnMsg::warning(
                0,
                0,
                "encrypted document, no security handler installed".to_string(),
            ));
        }
        doc.pages = doc.collect_pages(&mut warnings)?;
        if doc.pages.is_empty() && opts.fail_on_error {
            return Err(PdfError::InvalidTrailer("document has no pages".to_string()));
        }
        Ok((doc, warnings))
    }

    /// Installs the embedder's security handler (keys derived from the
    /// `/Encrypt` dictionary and the password in the parse options).
    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) {
        self.stream_cache.borrow_mut().clear();
        self.security = handler;
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.xref.trailer
    }

    pub fn encryption_dict(&self) -> Option<Dictionary> {
        let obj = self.xref.trailer.get(b"Encrypt").ok()?;
        self.resolve(obj).as_dict().ok().cloned()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&PdfPage, PdfError> {
        self.pages.get(index).ok_or(PdfError::PageOutOfBounds(index))
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    /// Page index of a page object id, for destination resolution.
    pub fn page_index_of(&self, id: ObjectId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    // ------------------------------------------------------------------
    // object resolution

    /// Resolves an indirect reference. Unresolved references yield null,
    /// never an error. Resolution results are cached for the document's
    /// lifetime.
    pub fn get_object(&self, id: ObjectId) -> Rc<Object> {
        if let Some(cached) = self.cache.borrow().get(&id) {
            return cached.clone();
        }
        if !self.resolving.borrow_mut().insert(id) {
            return Rc::new(Object::Null); // reference cycle
        }
        let parsed = self.load_object(id).unwrap_or(Object::Null);
        self.resolving.borrow_mut().remove(&id);
        let rc = Rc::new(parsed);
        self.cache.borrow_mut().insert(id, rc.clone());
        rc
    }

    /// Follows a reference chain to the value; non-references pass
    /// through (cloned into the shared representation).
    pub fn resolve(&self, obj: &Object) -> Rc<Object> {
        match obj {
            Object::Reference(id) => {
                let resolved = self.get_object(*id);
                // double indirection is legal
                if let Object::Reference(inner) = &*resolved {
                    self.get_object(*inner)
                } else {
                    resolved
                }
            }
            other => Rc::new(other.clone()),
        }
    }

    /// `dict[key]`, reference-resolved. `None` when absent.
    pub fn dict_get(&self, dict: &Dictionary, key: &[u8]) -> Option<Rc<Object>> {
        let obj = dict.get(key).ok()?;
        let resolved = self.resolve(obj);
        if resolved.is_null() {
            None
        } else {
            Some(resolved)
        }
    }

    fn load_object(&self, id: ObjectId) -> Option<Object> {
        match self.xref.get(id.0)? {
            XrefEntry::Free => None,
            XrefEntry::Normal { offset, .. } => self.parse_object_at(offset, id),
            XrefEntry::Compressed { container, index } => {
                self.parse_compressed_object(container, index)
            }
        }
    }

    fn parse_object_at(&self, offset: usize, id: ObjectId) -> Option<Object> {
        if offset >= self.data.len() {
            return None;
        }
        let resolver = |length_id: ObjectId| self.raw_stream_length(length_id);
        let mut lexer = Lexer::with_length_resolver(&self.data, &resolver);
        lexer.seek(offset);
        let num = match lexer.read_next(false).ok()?? {
            Object::Integer(n) => n,
            _ => return None,
        };
        let _gen = lexer.read_next(false).ok()??;
        if num != i64::from(id.0) || !lexer.match_sequence(b"obj") {
            return None;
        }
        lexer.read_next(true).ok()?
    }

    /// `/Length` values are plain integers (or references to them); this
    /// resolves them without entering the main object cache so stream
    /// parsing cannot recurse into itself.
    fn raw_stream_length(&self, id: ObjectId) -> Option<usize> {
        match self.xref.get(id.0)? {
            XrefEntry::Normal { offset, .. } => {
                let mut lexer = Lexer::new(&self.data);
                lexer.seek(offset);
                let _num = lexer.read_next(false).ok()??;
                let _gen = lexer.read_next(false).ok()??;
                if !lexer.match_sequence(b"obj") {
                    return None;
                }
                match lexer.read_next(false).ok()?? {
                    Object::Integer(i) if i >= 0 => Some(i as usize),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Objects inside an object stream: `/N` pairs of (number, offset)
    /// then the serialized objects starting at `/First`.
    fn parse_compressed_object(&self, container: u32, index: u16) -> Option<Object> {
        let container_id = (container, 0);
        let container_obj = self.get_object(container_id);
        let stream = container_obj.as_stream().ok()?;
        let mut scratch = Vec::new();
        let bytes = self.decoded_stream_bytes(container_id, stream, 0, &mut scratch)?;
        let n = stream.dict.get(b"N").ok()?.as_i64().ok()?;
        let first = stream.dict.get(b"First").ok()?.as_i64().ok()? as usize;
        let mut lexer = Lexer::new(&bytes);
        let mut pairs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let num = match lexer.read_next(false).ok()?? {
                Object::Integer(i) => i,
                _ => return None,
            };
            let off = match lexer.read_next(false).ok()?? {
                Object::Integer(i) if i >= 0 => i as usize,
                _ => return None,
            };
            pairs.push((num, off));
        }
        let (_, offset) = pairs.get(usize::from(index)).copied()?;
        let mut obj_lexer = Lexer::new(&bytes);
        obj_lexer.seek(first + offset);
        obj_lexer.read_next(true).ok()?
    }

    // ------------------------------------------------------------------
    // stream decoding

    /// Decoded payload of a stream in the object table. Cached; a broken
    /// filter chain yields empty bytes plus a warning, never an error.
    pub fn stream_bytes(
        &self,
        id: ObjectId,
        page: usize,
        warnings: &mut Vec<PdfWarnMsg>,
    ) -> Rc<Vec<u8>> {
        if let Some(cached) = self.stream_cache.borrow().get(&id) {
            return cached.clone();
        }
        let obj = self.get_object(id);
        let bytes = match obj.as_stream() {
            Ok(stream) => self
                .decoded_stream_bytes(id, stream, page, warnings)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        let rc = Rc::new(bytes);
        self.stream_cache.borrow_mut().insert(id, rc.clone());
        rc
    }

    fn decoded_stream_bytes(
        &self,
        id: ObjectId,
        stream: &Stream,
        page: usize,
        warnings: &mut Vec<PdfWarnMsg>,
    ) -> Option<Vec<u8>> {
        let decrypted;
        let input: &Stream = if self.security.is_identity() {
            stream
        } else {
            decrypted = Stream::new(
                stream.dict.clone(),
                self.security.decrypt_stream(id, &stream.content),
            );
            &decrypted
        };
        match crate::filters::decode_stream(input, page, warnings) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warnings.push(PdfWarnMsg::error(page, 0, format!("stream {id:?}: {e}")));
                None
            }
        }
    }

    /// Decodes a stream that is not in the object table (inline images,
    /// direct dictionary values). Not cached.
    pub fn decode_stream_direct(
        &self,
        stream: &Stream,
        page: usize,
        warnings: &mut Vec<PdfWarnMsg>,
    ) -> Vec<u8> {
        match crate::filters::decode_stream(stream, page, warnings) {
            Ok(bytes) => bytes,
            Err(e) => {
                warnings.push(PdfWarnMsg::error(page, 0, format!("direct stream: {e}")));
                Vec::new()
            }
        }
    }

    /// The page's content: every stream in `/Contents`, decoded and
    /// joined with a separator so operators never fuse across parts.
    pub fn page_content(
        &self,
        page_index: usize,
        warnings: &mut Vec<PdfWarnMsg>,
    ) -> Result<Vec<u8>, PdfError> {
        let page = self.page(page_index)?;
        let contents = match page.dict.get(b"Contents") {
            Ok(c) => c.clone(),
            Err(_) => return Ok(Vec::new()),
        };
        let resolved = self.resolve(&contents);
        let mut out = Vec::new();
        match (&contents, &*resolved) {
            (_, Object::Array(parts)) => {
                for part in parts {
                    match part {
                        Object::Reference(r) => {
                            out.extend_from_slice(&self.stream_bytes(*r, page_index, warnings));
                            out.push(b'\n');
                        }
                        Object::Stream(s) => {
                            out.extend(self.decode_stream_direct(s, page_index, warnings));
                            out.push(b'\n');
                        }
                        _ => {}
                    }
                }
            }
            (Object::Reference(r), Object::Stream(_)) => {
                out.extend_from_slice(&self.stream_bytes(*r, page_index, warnings));
                out.push(b'\n');
            }
            (Object::Stream(s), _) => {
                out.extend(self.decode_stream_direct(s, page_index, warnings));
                out.push(b'\n');
            }
            _ => {}
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // page tree

    fn collect_pages(&self, warnings: &mut Vec<PdfWarnMsg>) -> Result<Vec<PdfPage>, PdfError> {
        let root = match self.xref.trailer.get(b"Root") {
            Ok(Object::Reference(r)) => *r,
            _ => return Err(PdfError::InvalidTrailer("Root is not a reference".into())),
        };
        let catalog = self.get_object(root);
        let catalog = catalog
            .as_dict()
            .map_err(|_| PdfError::InvalidTrailer("catalog is not a dictionary".into()))?;
        let pages_root = match catalog.get(b"Pages").and_then(|o| o.as_reference()) {
            Ok(r) => r,
            Err(_) => {
                warnings.push(PdfWarnMsg::warning(0, 0, "catalog has no Pages tree".into()));
                return Ok(Vec::new());
            }
        };
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let inherited = Inherited::default();
        self.walk_pages(pages_root, &inherited, &mut visited, &mut out, warnings);
        Ok(out)
    }

    fn walk_pages(
        &self,
        node_id: ObjectId,
        inherited: &Inherited,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<PdfPage>,
        warnings: &mut Vec<PdfWarnMsg>,
    ) {
        if !visited.insert(node_id) {
            return; // malformed tree with a cycle
        }
        let node = self.get_object(node_id);
        let dict = match node.as_dict() {
            Ok(d) => d,
            Err(_) => {
                warnings.push(PdfWarnMsg::warning(
                    0,
                    0,
                    format!("page-tree node {node_id:?} is not a dictionary"),
                ));
                return;
            }
        };
        let mut inherited = inherited.clone();
        inherited.absorb(self, dict);

        let node_type = dict
            .get(b"Type")
            .ok()
            .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec));
        let is_page = match node_type.as_deref() {
            Some(b"Page") => true,
            Some(b"Pages") => false,
            // missing type: leaf when there is no Kids array
            _ => !dict.has(b"Kids"),
        };
        if is_page {
            out.push(self.build_page(node_id, dict, &inherited));
            return;
        }
        let kids: Vec<ObjectId> = match self.dict_get(dict, b"Kids") {
            Some(kids) => match kids.as_array() {
                Ok(arr) => arr.iter().filter_map(|k| k.as_reference().ok()).collect(),
                Err(_) => Vec::new(),
            },
            None => Vec::new(),
        };
        for kid in kids {
            self.walk_pages(kid, &inherited, visited, out, warnings);
        }
    }

    fn build_page(&self, id: ObjectId, dict: &Dictionary, inherited: &Inherited) -> PdfPage {
        let media_box = inherited
            .media_box
            .unwrap_or_else(|| Rect::from_xywh(0.0, 0.0, 612.0, 792.0));
        let crop_box = inherited
            .crop_box
            .unwrap_or(media_box)
            .intersect(&media_box)
            .unwrap_or(media_box);
        PdfPage {
            id,
            dict: dict.clone(),
            resources: inherited.resources.clone().unwrap_or_default(),
            media_box,
            crop_box,
            rotate: inherited.rotate.rem_euclid(360),
        }
    }

    /// `[llx lly urx ury]`, reference-resolved, normalized.
    pub fn rect_from_object(&self, obj: &Object) -> Option<Rect> {
        let resolved = self.resolve(obj);
        let arr = resolved.as_array().ok()?;
        if arr.len() < 4 {
            return None;
        }
        let mut v = [0f32; 4];
        for (slot, o) in v.iter_mut().zip(arr.iter()) {
            *slot = self.resolve(o).as_f32().ok()?;
        }
        Some(Rect::from_lbrt(v[0], v[1], v[2], v[3]))
    }

    // ------------------------------------------------------------------
    // name trees and document info

    /// Resolves a named destination through the catalog's `/Dests`
    /// dictionary (PDF 1.1) or the `/Names` `/Dests` name tree. Returns
    /// the explicit destination array.
    pub fn named_destination(&self, name: &[u8]) -> Option<Vec<Object>> {
        let root = self.xref.trailer.get(b"Root").ok()?.as_reference().ok()?;
        let catalog_obj = self.get_object(root);
        let catalog = catalog_obj.as_dict().ok()?;

        let value = if let Some(dests) = self.dict_get(catalog, b"Dests") {
            let dict = dests.as_dict().ok()?.clone();
            self.dict_get(&dict, name)
        } else {
            let names = self.dict_get(catalog, b"Names")?;
            let dests = self.dict_get(names.as_dict().ok()?, b"Dests")?;
            let root_node = dests.as_dict().ok()?.clone();
            self.lookup_name_tree(&root_node, name, 0)
        }?;
        self.explicit_destination(&value)
    }

    /// A destination value is either the explicit array or a dictionary
    /// wrapping one under `/D`.
    pub fn explicit_destination(&self, value: &Object) -> Option<Vec<Object>> {
        let resolved = self.resolve(value);
        match &*resolved {
            Object::Array(arr) => Some(arr.clone()),
            Object::Dictionary(d) => {
                let inner = self.dict_get(d, b"D")?;
                inner.as_array().ok().cloned()
            }
            _ => None,
        }
    }

    fn lookup_name_tree(
        &self,
        node: &Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<Rc<Object>> {
        if depth > 32 {
            return None;
        }
        if let Some(names) = self.dict_get(node, b"Names") {
            let arr = names.as_array().ok()?;
            for pair in arr.chunks(2) {
                if let [key, value] = pair {
                    let key = self.resolve(key);
                    if key.as_string_bytes().ok() == Some(name) {
                        return Some(self.resolve(value));
                    }
                }
            }
            return None;
        }
        let kids = self.dict_get(node, b"Kids")?;
        for kid in kids.as_array().ok()?.iter() {
            let kid = self.resolve(kid);
            let kid_dict = kid.as_dict().ok()?;
            if let Some(limits) = self.dict_get(kid_dict, b"Limits") {
                if let Ok(arr) = limits.as_array() {
                    if arr.len() == 2 {
                        let lo = self.resolve(&arr[0]);
                        let hi = self.resolve(&arr[1]);
                        if let (Ok(lo), Ok(hi)) =
                            (lo.as_string_bytes(), hi.as_string_bytes())
                        {
                            if name < lo || name > hi {
                                continue;
                            }
                        }
                    }
                }
            }
            if let Some(found) = self.lookup_name_tree(kid_dict, name, depth + 1) {
                return Some(found);
            }
        }
        None
    }

    /// Registers a parsed CMap under its name, for `usecmap` bases and
    /// the predefined CMaps a composite font may name in `/Encoding`.
    pub fn register_cmap(&self, name: impl Into<String>, cmap: Rc<CMap>) {
        self.cmap_registry.borrow_mut().insert(name.into(), cmap);
    }

    pub fn document_info(&self) -> PdfDocumentInfo {
        let mut info = PdfDocumentInfo::default();
        let dict = match self.xref.trailer.get(b"Info") {
            Ok(obj) => match self.resolve(obj).as_dict() {
                Ok(d) => d.clone(),
                Err(_) => return info,
            },
            Err(_) => return info,
        };
        let text = |key: &[u8]| -> Option<String> {
            self.dict_get(&dict, key)
                .and_then(|o| o.as_string_bytes().map(decode_text_string).ok())
        };
        info.title = text(b"Title");
        info.author = text(b"Author");
        info.subject = text(b"Subject");
        info.keywords = text(b"Keywords");
        info.creator = text(b"Creator");
        info.producer = text(b"Producer");
        info.creation_date = text(b"CreationDate").and_then(|s| parse_pdf_date(&s));
        info.mod_date = text(b"ModDate").and_then(|s| parse_pdf_date(&s));
        info
    }
}

/// Attributes pushed down the page tree.
#[derive(Debug, Clone, Default)]
struct Inherited {
    resources: Option<Dictionary>,
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: i32,
}

impl Inherited {
    fn absorb(&mut self, doc: &PdfDocument, dict: &Dictionary) {
        if let Some(res) = doc.dict_get(dict, b"Resources") {
            if let Ok(d) = res.as_dict() {
                self.resources = Some(d.clone());
            }
        }
        if let Ok(mb) = dict.get(b"MediaBox") {
            if let Some(r) = doc.rect_from_object(mb) {
                self.media_box = Some(r);
            }
        }
        if let Ok(cb) = dict.get(b"CropBox") {
            if let Some(r) = doc.rect_from_object(cb) {
                self.crop_box = Some(r);
            }
        }
        if let Some(rot) = doc.dict_get(dict, b"Rotate") {
            if let Ok(r) = rot.as_i64() {
                self.rotate = r as i32;
            }
        }
    }
}

/// Text-string decoding: UTF-16BE with BOM, else PDFDocEncoding treated
/// as Latin-1 (the differences do not matter for the info keys).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Builds a two-page file with inherited resources and media box.
    fn two_page_pdf() -> Vec<u8> {
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; 7];
        pdf.extend_from_slice(b"%PDF-1.4\n");
        let mut add = |pdf: &mut Vec<u8>, offsets: &mut Vec<usize>, num: usize, body: &[u8]| {
            offsets[num] = pdf.len();
            pdf.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
            pdf.extend_from_slice(body);
            pdf.extend_from_slice(b"\nendobj\n");
        };
        add(&mut pdf, &mut offsets, 1, b"<< /Type /Catalog /Pages 2 0 R >>");
        add(
            &mut pdf,
            &mut offsets,
            2,
            b"<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 \
               /MediaBox [0 0 612 792] /Resources << /Font << /F1 6 0 R >> >> >>",
        );
        add(&mut pdf, &mut offsets, 3, b"<< /Type /Page /Parent 2 0 R /Contents 5 0 R >>");
        add(
            &mut pdf,
            &mut offsets,
            4,
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 200] /Rotate 90 >>",
        );
        add(
            &mut pdf,
            &mut offsets,
            5,
            b"<< /Length 14 >>\nstream\nBT ET 0 0 1 rg\nendstream",
        );
        add(&mut pdf, &mut offsets, 6, b"<< /Type /Font /Subtype /Type1 >>");
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 7\n0000000000 65535 f \n");
        for off in &offsets[1..] {
            pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 7 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        pdf
    }

    #[test]
    fn pages_inherit_media_box_and_resources() {
        let pdf = two_page_pdf();
        let (doc, warnings) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(doc.page_count(), 2);

        let p0 = doc.page(0).unwrap();
        assert_eq!(p0.media_box, Rect::from_lbrt(0.0, 0.0, 612.0, 792.0));
        assert!(p0.resources.has(b"Font"));
        assert_eq!(p0.rotate, 0);

        let p1 = doc.page(1).unwrap();
        assert_eq!(p1.media_box, Rect::from_lbrt(0.0, 0.0, 100.0, 200.0));
        assert_eq!(p1.rotate, 90);
    }

    #[test]
    fn page_content_decodes_stream() {
        let pdf = two_page_pdf();
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let mut warnings = Vec::new();
        let content = doc.page_content(0, &mut warnings).unwrap();
        assert_eq!(content, b"BT ET 0 0 1 rg\n".to_vec());
    }

    #[test]
    fn unresolved_reference_yields_null() {
        let pdf = two_page_pdf();
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        assert!(doc.get_object((99, 0)).is_null());
        // resolution results are cached
        assert!(doc.get_object((99, 0)).is_null());
    }

    #[test]
    fn object_cache_returns_same_rc() {
        let pdf = two_page_pdf();
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let a = doc.get_object((6, 0));
        let b = doc.get_object((6, 0));
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn utf16_info_strings_decode() {
        assert_eq!(
            decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]),
            "Hi"
        );
        assert_eq!(decode_text_string(b"plain"), "plain");
    }
}
