//! # renderpdf
//!
//! renderpdf parses PDF files into a navigable object model and renders
//! their pages onto a caller-supplied 2-D canvas.
//!
//! The crate owns the PDF core: the lexer and object model, the
//! cross-reference and document layer, the stream filter pipeline, the
//! font/CMap/encoding resolution chain, the content-stream interpreter
//! with its graphics state, and the path/text/image/pattern/shading
//! renderers including transparency groups and soft masks. Rasterization
//! itself is delegated to whatever implements the [`Canvas`] contract;
//! the built-in [`RecordingCanvas`] captures draw calls as a display
//! list.
//!
//! ```no_run
//! use renderpdf::*;
//!
//! let bytes = std::fs::read("input.pdf").unwrap();
//! let (doc, warnings) = PdfDocument::parse(&bytes, &PdfParseOptions::default()).unwrap();
//! for w in &warnings {
//!     eprintln!("{}: {}", w.severity, w.msg);
//! }
//!
//! let mut canvas = RecordingCanvas::new();
//! let options = RenderOptions { scale: 2.0, ..Default::default() };
//! render_page(&doc, 0, &mut canvas, &options).unwrap();
//!
//! let (text, _) = extract_text(&doc, 0, &options).unwrap();
//! println!("{}", fragments_to_string(&text));
//! ```

pub mod annotation;
pub mod canvas;
pub mod ccitt;
pub mod cmap;
pub mod color;
pub mod date;
pub mod document;
pub mod encoding;
pub mod encryption;
pub mod errors;
pub mod filters;
pub mod font;
pub mod function;
pub mod graphics;
pub mod image;
pub mod interpreter;
pub mod lexer;
pub mod matrix;
pub mod object;
pub mod pattern;
pub mod render;
pub mod shading;
pub mod text;
pub mod transparency;
pub mod xref;

pub use crate::annotation::{page_annotations, render_annotations, Annotation, LinkTarget};
pub use crate::canvas::{
    Canvas, CanvasPaint, DrawCall, FillRule, GlyphRun, LayerCanvas, MaskLayer, PaintStyle,
    PathCommand, PdfPath, PositionedGlyph, RasterImage, RecordingCanvas, SamplingMode,
    StrokeStyle, TileShader, TypefaceSource,
};
pub use crate::cmap::{CMap, CharacterCode, CodespaceRange};
pub use crate::color::{ColorSpace, RgbColor};
pub use crate::document::{PdfDocument, PdfDocumentInfo, PdfPage, PdfParseOptions};
pub use crate::encryption::{EncryptionInfo, IdentityHandler, SecurityHandler};
pub use crate::errors::{PdfError, PdfWarnMsg};
pub use crate::font::{BuiltinFont, FontDescriptor, PdfFont};
pub use crate::graphics::{
    BlendMode, GraphicsState, LineCapStyle, LineDashPattern, LineJoinStyle, Paint, Point, Rect,
    RenderingIntent, SoftMask, SoftMaskSubtype, TextRenderingMode, TransparencyGroup,
};
pub use crate::interpreter::CancellationToken;
pub use crate::matrix::Matrix;
pub use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};
pub use crate::render::{device_size, device_transform, render_page, RenderOptions};
pub use crate::text::{extract_text, fragments_to_string, TextFragment};
