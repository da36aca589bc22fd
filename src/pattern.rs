//! pattern.rs
//!
//! Pattern resources: tiling patterns (type 1) carrying a cell content
//! stream and step vector, and shading patterns (type 2) wrapping a
//! shading dictionary. Cell rendering happens in the interpreter, which
//! owns content-stream execution; this module parses and describes.

use std::rc::Rc;

use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::graphics::Rect;
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId};
use crate::shading::{parse_shading, Shading};

#[derive(Debug, Clone)]
pub struct TilingPattern {
    /// 1 = colored (self-contained), 2 = uncolored (tinted)
    pub paint_type: i64,
    pub bbox: Rect,
    pub x_step: f32,
    pub y_step: f32,
    pub matrix: Matrix,
    pub resources: Option<Dictionary>,
    /// the pattern-cell content stream object
    pub content: ObjectId,
}

impl TilingPattern {
    pub fn is_uncolored(&self) -> bool {
        self.paint_type == 2
    }
}

#[derive(Debug, Clone)]
pub struct ShadingPattern {
    pub shading: Shading,
    pub matrix: Matrix,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Tiling(TilingPattern),
    Shading(ShadingPattern),
}

/// Resolves a pattern object from the page's `/Pattern` resources.
/// Parsed descriptors cache on the document by object id.
pub fn parse_pattern(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Rc<Pattern>> {
    let id = obj.as_reference().ok();
    if let Some(id) = id {
        if let Some(cached) = doc.pattern_cache.borrow().get(&id) {
            return Some(cached.clone());
        }
    }
    let parsed = Rc::new(parse_pattern_inner(doc, obj, page, warnings)?);
    if let Some(id) = id {
        doc.pattern_cache.borrow_mut().insert(id, parsed.clone());
    }
    Some(parsed)
}

fn parse_pattern_inner(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Pattern> {
    let resolved = doc.resolve(obj);
    let dict = resolved.as_dict().ok()?;
    let pattern_type = doc
        .dict_get(dict, b"PatternType")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(1);
    let matrix = doc
        .dict_get(dict, b"Matrix")
        .and_then(|o| {
            let arr = o.as_array().ok()?;
            let mut m = [0f32; 6];
            for (slot, v) in m.iter_mut().zip(arr.iter()) {
                *slot = doc.resolve(v).as_f32().ok()?;
            }
            Some(Matrix::from_array(m))
        })
        .unwrap_or(Matrix::IDENTITY);

    match pattern_type {
        2 => {
            let shading_obj = dict.get(b"Shading").ok()?;
            let shading = parse_shading(doc, shading_obj, page, warnings)?;
            Some(Pattern::Shading(ShadingPattern { shading, matrix }))
        }
        _ => {
            // a tiling pattern is a content stream; it must be indirect
            // so the interpreter can re-enter it by id
            let content = obj.as_reference().ok()?;
            let bbox = dict
                .get(b"BBox")
                .ok()
                .and_then(|o| doc.rect_from_object(o))?;
            if bbox.is_empty() {
                warnings.push(PdfWarnMsg::warning(page, 0, "tiling pattern with empty BBox".into()));
                return None;
            }
            let step = |key: &[u8], fallback: f32| {
                doc.dict_get(dict, key)
                    .and_then(|o| o.as_f32().ok())
                    .filter(|v| v.abs() > 1e-6)
                    .unwrap_or(fallback)
            };
            Some(Pattern::Tiling(TilingPattern {
                paint_type: doc
                    .dict_get(dict, b"PaintType")
                    .and_then(|o| o.as_i64().ok())
                    .unwrap_or(1),
                x_step: step(b"XStep", bbox.width),
                y_step: step(b"YStep", bbox.height),
                bbox,
                matrix,
                resources: doc
                    .dict_get(dict, b"Resources")
                    .and_then(|o| o.as_dict().ok().cloned()),
                content,
            }))
        }
    }
}
