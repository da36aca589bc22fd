//! annotation.rs
//!
//! Annotation and link enumeration plus appearance-stream rendering.
//! The appearance (`/AP` `/N`) is a form XObject; its BBox, transformed
//! by the form matrix, is fitted to the annotation rectangle and the
//! stream runs through the regular interpreter. Fallback visual
//! decoration for annotations without appearances lives with the
//! embedder.

use crate::canvas::Canvas;
use crate::document::{decode_text_string, PdfDocument};
use crate::errors::{PdfError, PdfWarnMsg};
use crate::graphics::{GraphicsState, Rect};
use crate::interpreter::Interpreter;
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId};
use crate::render::RenderOptions;

/// Where a link annotation points.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// resolved page index plus the raw destination array
    Page { index: usize, dest: Vec<Object> },
    Uri(String),
    /// named destination that did not resolve to a page
    Named(String),
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub subtype: String,
    pub rect: Rect,
    pub contents: Option<String>,
    pub target: Option<LinkTarget>,
    /// normal appearance stream, when present
    pub appearance: Option<ObjectId>,
    pub hidden: bool,
}

/// Enumerates the page's annotations with resolved link targets.
pub fn page_annotations(
    doc: &PdfDocument,
    page_index: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Vec<Annotation> {
    let page = match doc.page(page_index) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };
    let annots = match doc.dict_get(&page.dict, b"Annots") {
        Some(a) => a,
        None => return Vec::new(),
    };
    let annots = match annots.as_array() {
        Ok(arr) => arr.clone(),
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::new();
    for entry in &annots {
        let resolved = doc.resolve(entry);
        let dict = match resolved.as_dict() {
            Ok(d) => d,
            Err(_) => {
                warnings.push(PdfWarnMsg::warning(
                    page_index,
                    0,
                    "annotation is not a dictionary".to_string(),
                ));
                continue;
            }
        };
        if let Some(annotation) = parse_annotation(doc, dict) {
            out.push(annotation);
        }
    }
    out
}

fn parse_annotation(doc: &PdfDocument, dict: &Dictionary) -> Option<Annotation> {
    let subtype = doc
        .dict_get(dict, b"Subtype")
        .and_then(|o| o.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned()))
        .unwrap_or_default();
    let rect = dict.get(b"Rect").ok().and_then(|o| doc.rect_from_object(o))?;
    let contents = doc
        .dict_get(dict, b"Contents")
        .and_then(|o| o.as_string_bytes().map(decode_text_string).ok());
    let flags = doc
        .dict_get(dict, b"F")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    let target = link_target(doc, dict);
    let appearance = normal_appearance(doc, dict);
    Some(Annotation {
        subtype,
        rect,
        contents,
        target,
        appearance,
        hidden: flags & 0x2 != 0,
    })
}

/// `/Dest` on the annotation, or a `/A` GoTo / URI action.
fn link_target(doc: &PdfDocument, dict: &Dictionary) -> Option<LinkTarget> {
    if let Some(dest) = dict.get(b"Dest").ok().cloned() {
        return destination_target(doc, &dest);
    }
    let action = doc.dict_get(dict, b"A")?;
    let action = action.as_dict().ok()?;
    let kind = doc
        .dict_get(action, b"S")
        .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec))?;
    match kind.as_slice() {
        b"GoTo" => {
            let dest = action.get(b"D").ok()?.clone();
            destination_target(doc, &dest)
        }
        b"URI" => {
            let uri = doc.dict_get(action, b"URI")?;
            let uri = uri.as_string_bytes().ok()?;
            Some(LinkTarget::Uri(String::from_utf8_lossy(uri).into_owned()))
        }
        _ => None,
    }
}

fn destination_target(doc: &PdfDocument, dest: &Object) -> Option<LinkTarget> {
    let resolved = doc.resolve(dest);
    let name: Option<Vec<u8>> = match resolved.as_ref() {
        Object::String(n, _) | Object::Name(n) => Some(n.clone()),
        _ => None,
    };
    // names resolve through the document's destination trees
    let explicit = match resolved.as_ref() {
        Object::Array(arr) => Some(arr.clone()),
        _ => name.as_ref().and_then(|n| doc.named_destination(n)),
    };
    let as_named =
        |n: Vec<u8>| LinkTarget::Named(String::from_utf8_lossy(&n).into_owned());
    match explicit {
        Some(arr) => {
            let page_ref = arr.first()?.as_reference().ok()?;
            match doc.page_index_of(page_ref) {
                Some(index) => Some(LinkTarget::Page { index, dest: arr }),
                None => name.map(as_named),
            }
        }
        None => name.map(as_named),
    }
}

/// `/AP` `/N`, following `/AS` into a state subdictionary when present.
fn normal_appearance(doc: &PdfDocument, dict: &Dictionary) -> Option<ObjectId> {
    let ap = doc.dict_get(dict, b"AP")?;
    let ap = ap.as_dict().ok()?;
    let normal = ap.get(b"N").ok()?;
    match normal {
        Object::Reference(r) => {
            let resolved = doc.get_object(*r);
            match resolved.as_ref() {
                Object::Stream(_) => Some(*r),
                Object::Dictionary(states) => pick_appearance_state(doc, dict, states),
                _ => None,
            }
        }
        Object::Dictionary(states) => pick_appearance_state(doc, dict, states),
        _ => None,
    }
}

fn pick_appearance_state(
    doc: &PdfDocument,
    annot: &Dictionary,
    states: &Dictionary,
) -> Option<ObjectId> {
    let wanted = doc
        .dict_get(annot, b"AS")
        .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec));
    if let Some(wanted) = wanted {
        if let Ok(Object::Reference(r)) = states.get(&wanted) {
            return Some(*r);
        }
    }
    states.iter().find_map(|(_, v)| v.as_reference().ok())
}

/// Renders every visible annotation appearance on the page through the
/// interpreter, fitting each form's transformed BBox to its `/Rect`.
pub fn render_annotations(
    doc: &PdfDocument,
    page_index: usize,
    device: Matrix,
    canvas: &mut dyn Canvas,
    options: &RenderOptions,
) -> Result<Vec<PdfWarnMsg>, PdfError> {
    let mut warnings = Vec::new();
    let annotations = page_annotations(doc, page_index, &mut warnings);
    for annotation in annotations {
        if annotation.hidden {
            continue;
        }
        let form_id = match annotation.appearance {
            Some(id) => id,
            None => continue,
        };
        if let Some(token) = &options.cancel {
            if token.is_cancelled() {
                return Err(PdfError::Cancelled);
            }
        }
        render_one_appearance(
            doc,
            page_index,
            device,
            &annotation,
            form_id,
            canvas,
            options,
            &mut warnings,
        )?;
    }
    Ok(warnings)
}

#[allow(clippy::too_many_arguments)]
fn render_one_appearance(
    doc: &PdfDocument,
    page_index: usize,
    device: Matrix,
    annotation: &Annotation,
    form_id: ObjectId,
    canvas: &mut dyn Canvas,
    options: &RenderOptions,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Result<(), PdfError> {
    let form_obj = doc.get_object(form_id);
    let stream = match form_obj.as_stream() {
        Ok(s) => s,
        Err(_) => return Ok(()),
    };
    let matrix = doc
        .dict_get(&stream.dict, b"Matrix")
        .and_then(|o| {
            let arr = o.as_array().ok()?;
            let mut m = [0f32; 6];
            for (slot, v) in m.iter_mut().zip(arr.iter()) {
                *slot = doc.resolve(v).as_f32().ok()?;
            }
            Some(Matrix::from_array(m))
        })
        .unwrap_or(Matrix::IDENTITY);
    let bbox = stream
        .dict
        .get(b"BBox")
        .ok()
        .and_then(|o| doc.rect_from_object(o))
        .unwrap_or(annotation.rect);

    // fit the transformed BBox onto the annotation rectangle
    let transformed = bbox.transform(matrix);
    let fit = if transformed.is_empty() {
        Matrix::IDENTITY
    } else {
        let sx = annotation.rect.width / transformed.width;
        let sy = annotation.rect.height / transformed.height;
        Matrix::combine(
            Matrix::translate(-transformed.x, -transformed.y),
            Matrix::combine(
                Matrix::scale(sx, sy),
                Matrix::translate(annotation.rect.x, annotation.rect.y),
            ),
        )
    };
    let ctm = Matrix::combine(Matrix::combine(matrix, fit), device);

    let bytes = doc.stream_bytes(form_id, page_index, warnings).as_ref().clone();
    let resources = doc
        .dict_get(&stream.dict, b"Resources")
        .and_then(|o| o.as_dict().ok().cloned())
        .unwrap_or_default();

    let initial = GraphicsState {
        ctm,
        device_matrix: device,
        ..GraphicsState::default()
    };
    canvas.save();
    let device_clip = annotation.rect.transform(device);
    canvas.clip_rect(device_clip);
    let mut interp = Interpreter::new(doc, page_index, initial, options.cancel.clone());
    let result = interp.execute(&bytes, &resources, canvas);
    warnings.append(&mut interp.warnings);
    canvas.restore();
    match result {
        Err(e @ (PdfError::Cancelled | PdfError::Fatal(_))) => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PdfDocument, PdfParseOptions};
    use pretty_assertions::assert_eq;

    fn pdf_with_link() -> Vec<u8> {
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; 6];
        pdf.extend_from_slice(b"%PDF-1.4\n");
        let mut add = |pdf: &mut Vec<u8>, offsets: &mut Vec<usize>, num: usize, body: &str| {
            offsets[num] = pdf.len();
            pdf.extend_from_slice(format!("{num} 0 obj\n{body}\nendobj\n").as_bytes());
        };
        add(&mut pdf, &mut offsets, 1, "<< /Type /Catalog /Pages 2 0 R >>");
        add(
            &mut pdf,
            &mut offsets,
            2,
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 100 100] >>",
        );
        add(
            &mut pdf,
            &mut offsets,
            3,
            "<< /Type /Page /Parent 2 0 R /Annots [5 0 R] >>",
        );
        add(&mut pdf, &mut offsets, 4, "<< /Type /Page /Parent 2 0 R >>");
        add(
            &mut pdf,
            &mut offsets,
            5,
            "<< /Type /Annot /Subtype /Link /Rect [10 10 50 30] /Dest [4 0 R /Fit] >>",
        );
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
        for off in &offsets[1..] {
            pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        pdf
    }

    #[test]
    fn link_annotation_resolves_page_target() {
        let pdf = pdf_with_link();
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let mut warnings = Vec::new();
        let annots = page_annotations(&doc, 0, &mut warnings);
        assert_eq!(annots.len(), 1);
        assert_eq!(annots[0].subtype, "Link");
        assert_eq!(annots[0].rect, Rect::from_lbrt(10.0, 10.0, 50.0, 30.0));
        match &annots[0].target {
            Some(LinkTarget::Page { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected target {other:?}"),
        }
        assert!(!annots[0].hidden);
    }
}
