//! text.rs
//!
//! Plain-text extraction: the interpreter records one fragment per shown
//! character with its device-space origin and advance, in content-stream
//! order.

use crate::canvas::RecordingCanvas;
use crate::document::PdfDocument;
use crate::errors::{PdfError, PdfWarnMsg};
use crate::graphics::GraphicsState;
use crate::interpreter::Interpreter;
use crate::render::{device_transform, RenderOptions};

/// One shown character (or multi-scalar ligature expansion).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    /// device-space text origin
    pub x: f32,
    pub y: f32,
    /// device-space advance width
    pub width: f32,
    pub font_size: f32,
}

/// Extracts the page's text as an ordered fragment sequence. Positions
/// use the same device mapping as rendering with these options.
pub fn extract_text(
    doc: &PdfDocument,
    page_index: usize,
    options: &RenderOptions,
) -> Result<(Vec<TextFragment>, Vec<PdfWarnMsg>), PdfError> {
    let page = doc.page(page_index)?;
    let device = device_transform(page, options);
    let mut warnings = Vec::new();
    let content = doc.page_content(page_index, &mut warnings)?;

    let initial = GraphicsState {
        ctm: device,
        device_matrix: device,
        ..GraphicsState::default()
    };
    let mut canvas = RecordingCanvas::new();
    let resources = page.resources.clone();
    let mut interp = Interpreter::new(doc, page_index, initial, options.cancel.clone());
    interp.execute(&content, &resources, &mut canvas)?;
    warnings.extend(interp.warnings);
    Ok((interp.text, warnings))
}

/// Joins fragments into a reading string, inserting line breaks on
/// large vertical jumps.
pub fn fragments_to_string(fragments: &[TextFragment]) -> String {
    let mut out = String::new();
    let mut last: Option<&TextFragment> = None;
    for fragment in fragments {
        if let Some(prev) = last {
            let line_jump = (fragment.y - prev.y).abs() > prev.font_size.max(1.0) * 0.5;
            if line_jump {
                out.push('\n');
            } else if fragment.x - (prev.x + prev.width) > prev.font_size.max(1.0) * 0.3 {
                out.push(' ');
            }
        }
        out.push_str(&fragment.text);
        last = Some(fragment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frag(text: &str, x: f32, y: f32, width: f32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            x,
            y,
            width,
            font_size: 12.0,
        }
    }

    #[test]
    fn joins_adjacent_fragments_without_spaces() {
        let frags = [frag("H", 0.0, 0.0, 7.0), frag("i", 7.0, 0.0, 3.0)];
        assert_eq!(fragments_to_string(&frags), "Hi");
    }

    #[test]
    fn inserts_space_on_horizontal_gap() {
        let frags = [frag("a", 0.0, 0.0, 5.0), frag("b", 30.0, 0.0, 5.0)];
        assert_eq!(fragments_to_string(&frags), "a b");
    }

    #[test]
    fn inserts_newline_on_vertical_jump() {
        let frags = [frag("a", 0.0, 0.0, 5.0), frag("b", 0.0, 20.0, 5.0)];
        assert_eq!(fragments_to_string(&frags), "a\nb");
    }
}
