//! render.rs
//!
//! The public render entry: builds the device transform from the page
//! geometry, rotation and the caller's options, installs the crop clip
//! and walks the page content through the interpreter. Annotation
//! appearances render after the page content when enabled.

use serde_derive::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::document::{PdfDocument, PdfPage};
use crate::errors::{PdfError, PdfWarnMsg};
use crate::graphics::{GraphicsState, Rect, RenderingIntent};
use crate::interpreter::{CancellationToken, Interpreter};
use crate::matrix::Matrix;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// device pixels per PDF unit
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// user-space crop; the page's crop box when absent
    #[serde(default)]
    pub crop: Option<Rect>,
    /// overrides the initial rendering intent
    #[serde(default)]
    pub intent: Option<RenderingIntent>,
    #[serde(default = "default_true")]
    pub render_annotations: bool,
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

fn default_scale() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            scale: 1.0,
            crop: None,
            intent: None,
            render_annotations: true,
            cancel: None,
        }
    }
}

/// Size of the device raster these options produce for a page.
pub fn device_size(page: &PdfPage, options: &RenderOptions) -> (f32, f32) {
    let crop = options.crop.unwrap_or(page.crop_box);
    let (w, h) = (crop.width * options.scale, crop.height * options.scale);
    match page.rotate.rem_euclid(360) {
        90 | 270 => (h, w),
        _ => (w, h),
    }
}

/// User space → device space: y flips downward, the crop's corner lands
/// at the origin, and the page `/Rotate` turns in 90° steps.
pub fn device_transform(page: &PdfPage, options: &RenderOptions) -> Matrix {
    let crop = options.crop.unwrap_or(page.crop_box);
    let s = options.scale.max(1e-6);
    let (a, b, c, d) = match page.rotate.rem_euclid(360) {
        90 => (0.0, 1.0, 1.0, 0.0),
        180 => (-1.0, 0.0, 0.0, 1.0),
        270 => (0.0, -1.0, -1.0, 0.0),
        _ => (1.0, 0.0, 0.0, -1.0),
    };
    let unshifted = Matrix::from_array([a * s, b * s, c * s, d * s, 0.0, 0.0]);
    let bounds = crop.transform(unshifted);
    Matrix::from_array([
        a * s,
        b * s,
        c * s,
        d * s,
        -bounds.x,
        -bounds.y,
    ])
}

/// Renders one page onto the canvas. The page either renders (possibly
/// with degraded pieces collected as warnings) or fails terminally with
/// `Cancelled` or `Fatal`; partial canvas output is preserved either
/// way.
pub fn render_page(
    doc: &PdfDocument,
    page_index: usize,
    canvas: &mut dyn Canvas,
    options: &RenderOptions,
) -> Result<Vec<PdfWarnMsg>, PdfError> {
    let page = doc.page(page_index)?.clone();
    let device = device_transform(&page, options);
    let (device_w, device_h) = device_size(&page, options);

    let mut warnings = Vec::new();
    let content = doc.page_content(page_index, &mut warnings)?;

    let mut initial = GraphicsState {
        ctm: device,
        device_matrix: device,
        ..GraphicsState::default()
    };
    if let Some(intent) = options.intent {
        initial.rendering_intent = intent;
    }

    canvas.save();
    canvas.clip_rect(Rect::from_xywh(0.0, 0.0, device_w, device_h));

    let mut interp = Interpreter::new(doc, page_index, initial, options.cancel.clone());
    let result = interp.execute(&content, &page.resources, canvas);
    warnings.extend(std::mem::take(&mut interp.warnings));

    let result = result.and_then(|()| {
        if options.render_annotations {
            crate::annotation::render_annotations(doc, page_index, device, canvas, options)
                .map(|mut w| warnings.append(&mut w))
        } else {
            Ok(())
        }
    });

    canvas.restore();
    result.map(|()| warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, RecordingCanvas};
    use crate::document::PdfParseOptions;
    use pretty_assertions::assert_eq;

    fn one_page_pdf(page_extra: &str, content: &[u8]) -> Vec<u8> {
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; 5];
        pdf.extend_from_slice(b"%PDF-1.4\n");
        let mut add = |pdf: &mut Vec<u8>, offsets: &mut Vec<usize>, num: usize, body: Vec<u8>| {
            offsets[num] = pdf.len();
            pdf.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
            pdf.extend_from_slice(&body);
            pdf.extend_from_slice(b"\nendobj\n");
        };
        add(&mut pdf, &mut offsets, 1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        add(
            &mut pdf,
            &mut offsets,
            2,
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 200 100] >>".to_vec(),
        );
        add(
            &mut pdf,
            &mut offsets,
            3,
            format!("<< /Type /Page /Parent 2 0 R /Contents 4 0 R {page_extra} >>").into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        add(&mut pdf, &mut offsets, 4, stream);
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for off in &offsets[1..] {
            pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        pdf
    }

    #[test]
    fn device_transform_flips_y() {
        let pdf = one_page_pdf("", b"");
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let page = doc.page(0).unwrap();
        let m = device_transform(page, &RenderOptions::default());
        // bottom-left of the page lands at the bottom of the raster
        assert_eq!(m.transform_point(0.0, 0.0), (0.0, 100.0));
        assert_eq!(m.transform_point(0.0, 100.0), (0.0, 0.0));
        assert_eq!(device_size(page, &RenderOptions::default()), (200.0, 100.0));
    }

    #[test]
    fn rotation_90_swaps_device_size() {
        let pdf = one_page_pdf("/Rotate 90", b"");
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let page = doc.page(0).unwrap();
        let options = RenderOptions::default();
        assert_eq!(device_size(page, &options), (100.0, 200.0));
        let m = device_transform(page, &options);
        // all four corners stay inside the rotated raster
        for (x, y) in [(0.0, 0.0), (200.0, 0.0), (0.0, 100.0), (200.0, 100.0)] {
            let (dx, dy) = m.transform_point(x, y);
            assert!((0.0..=100.0).contains(&dx), "({dx},{dy})");
            assert!((0.0..=200.0).contains(&dy), "({dx},{dy})");
        }
    }

    #[test]
    fn scale_multiplies_device_coordinates() {
        let pdf = one_page_pdf("", b"0 0 10 10 re f");
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let mut canvas = RecordingCanvas::new();
        let options = RenderOptions {
            scale: 2.0,
            ..RenderOptions::default()
        };
        let warnings = render_page(&doc, 0, &mut canvas, &options).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        let path = canvas
            .calls
            .iter()
            .find_map(|c| match c {
                DrawCall::Path { path, .. } => Some(path.clone()),
                _ => None,
            })
            .unwrap();
        // user (0,0)-(10,10) at scale 2 on a 100-high page
        assert_eq!(path.bounds(), Some(Rect::from_lbrt(0.0, 180.0, 20.0, 200.0)));
    }

    #[test]
    fn render_restores_canvas_on_success() {
        let pdf = one_page_pdf("", b"q q q 0 0 5 5 re f");
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let mut canvas = RecordingCanvas::new();
        render_page(&doc, 0, &mut canvas, &RenderOptions::default()).unwrap();
        let saves = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Save))
            .count();
        let restores = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Restore))
            .count();
        assert_eq!(saves, restores);
    }

    #[test]
    fn page_out_of_bounds_errors() {
        let pdf = one_page_pdf("", b"");
        let (doc, _) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        let mut canvas = RecordingCanvas::new();
        assert_eq!(
            render_page(&doc, 5, &mut canvas, &RenderOptions::default()),
            Err(PdfError::PageOutOfBounds(5))
        );
    }
}
