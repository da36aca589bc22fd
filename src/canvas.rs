//! canvas.rs
//!
//! The 2-D back-end contract this renderer draws against. A real target
//! (a GPU canvas, a software rasterizer) implements `Canvas`; the crate
//! ships `RecordingCanvas`, which captures the draw calls as a display
//! list for tests and for deferred playback.

use crate::color::RgbColor;
use crate::graphics::{
    BlendMode, LineCapStyle, LineDashPattern, LineJoinStyle, Rect,
};
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// A path in user space; the canvas transform places it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfPath {
    pub commands: Vec<PathCommand>,
}

impl PdfPath {
    pub fn new() -> Self {
        PdfPath::default()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::MoveTo(x, y));
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::LineTo(x, y));
    }

    #[allow(clippy::many_single_char_names)]
    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(PathCommand::CurveTo(x1, y1, x2, y2, x, y));
    }

    pub fn close(&mut self) {
        self.commands.push(PathCommand::Close);
    }

    pub fn rect(&mut self, r: Rect) {
        self.move_to(r.x, r.y);
        self.line_to(r.right(), r.y);
        self.line_to(r.right(), r.top());
        self.line_to(r.x, r.top());
        self.close();
    }

    /// Anchor-point bounds (control points included, good enough for
    /// layer sizing).
    pub fn bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        let mut add = |x: f32, y: f32| {
            let r = Rect::from_xywh(x, y, 0.0, 0.0);
            bounds = Some(match bounds {
                Some(b) => b.union(&r),
                None => r,
            });
        };
        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => add(x, y),
                PathCommand::CurveTo(x1, y1, x2, y2, x, y) => {
                    add(x1, y1);
                    add(x2, y2);
                    add(x, y);
                }
                PathCommand::Close => {}
            }
        }
        bounds
    }

    pub fn transform(&self, m: Matrix) -> PdfPath {
        let commands = self
            .commands
            .iter()
            .map(|cmd| match *cmd {
                PathCommand::MoveTo(x, y) => {
                    let (x, y) = m.transform_point(x, y);
                    PathCommand::MoveTo(x, y)
                }
                PathCommand::LineTo(x, y) => {
                    let (x, y) = m.transform_point(x, y);
                    PathCommand::LineTo(x, y)
                }
                PathCommand::CurveTo(x1, y1, x2, y2, x, y) => {
                    let (x1, y1) = m.transform_point(x1, y1);
                    let (x2, y2) = m.transform_point(x2, y2);
                    let (x, y) = m.transform_point(x, y);
                    PathCommand::CurveTo(x1, y1, x2, y2, x, y)
                }
                PathCommand::Close => PathCommand::Close,
            })
            .collect();
        PdfPath { commands }
    }
}

/// RGBA8 raster, row-major, premultiplication left to the back-end.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32) -> Self {
        RasterImage {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        RasterImage {
            width,
            height,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    Nearest,
    #[default]
    Linear,
}

/// Stroke geometry attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub cap: LineCapStyle,
    pub join: LineJoinStyle,
    pub miter_limit: f32,
    pub dash: LineDashPattern,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintStyle {
    Fill,
    Stroke(StrokeStyle),
}

/// A repeating tile shader produced by the tiling-pattern renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileShader {
    pub tile: RasterImage,
    /// pattern space → user space
    pub transform: Matrix,
    pub step_x: f32,
    pub step_y: f32,
}

/// Everything a draw call needs besides geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasPaint {
    pub style: PaintStyle,
    pub color: RgbColor,
    pub alpha: f32,
    pub blend: BlendMode,
    pub shader: Option<TileShader>,
}

impl CanvasPaint {
    pub fn fill(color: RgbColor, alpha: f32) -> Self {
        CanvasPaint {
            style: PaintStyle::Fill,
            color,
            alpha,
            blend: BlendMode::default(),
            shader: None,
        }
    }

    pub fn stroke(color: RgbColor, alpha: f32, stroke: StrokeStyle) -> Self {
        CanvasPaint {
            style: PaintStyle::Stroke(stroke),
            color,
            alpha,
            blend: BlendMode::default(),
            shader: None,
        }
    }
}

/// Where a glyph run's typeface comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TypefaceSource {
    /// embedded font program bytes
    Embedded(std::rc::Rc<Vec<u8>>),
    /// resolved by the platform font provider
    Named {
        postscript_name: String,
        weight: u16,
        italic: bool,
    },
}

/// One positioned glyph; `transform` carries the full glyph-space to
/// user-space mapping including font size and text matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    pub glyph_id: u16,
    pub transform: Matrix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub typeface: TypefaceSource,
    /// em units per glyph-space unit, for the back-end's scaler
    pub units_per_em: f32,
    pub glyphs: Vec<PositionedGlyph>,
}

/// A coverage image attached to a layer; composited destination-in on
/// restore.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskLayer {
    pub coverage: RasterImage,
    /// device placement of the coverage image
    pub bounds: Rect,
}

/// The consumed 2-D back-end contract.
pub trait Canvas {
    fn save(&mut self);
    fn restore(&mut self);
    /// Opens a compositing layer; contents blend as a unit on restore.
    fn save_layer(&mut self, bounds: Option<Rect>, alpha: f32, blend: BlendMode, mask: Option<MaskLayer>);
    fn concat(&mut self, matrix: Matrix);
    fn clip_rect(&mut self, rect: Rect);
    fn clip_path(&mut self, path: &PdfPath, rule: FillRule);
    fn draw_path(&mut self, path: &PdfPath, rule: FillRule, paint: &CanvasPaint);
    fn draw_image(&mut self, image: &RasterImage, sampling: SamplingMode, paint: &CanvasPaint);
    fn draw_glyphs(&mut self, run: &GlyphRun, paint: &CanvasPaint);
    /// Current clip bounds in device space, when the target tracks them.
    fn local_clip_bounds(&self) -> Option<Rect>;
    /// Offscreen scratch target for soft-mask and group rendering.
    fn make_layer(&self, width: u32, height: u32) -> Box<dyn LayerCanvas>;
    /// Glyph outline extraction for text-clip accumulation. Targets
    /// without a scaler return `None` and text clips fall back to boxes.
    fn glyph_outline(&self, _typeface: &TypefaceSource, _glyph_id: u16) -> Option<PdfPath> {
        None
    }
}

/// A scratch canvas whose pixels can be read back.
pub trait LayerCanvas: Canvas {
    fn snapshot_rgba(&self) -> RasterImage;
    fn size(&self) -> (u32, u32);
}

// ----------------------------------------------------------------------
// recording implementation

/// One recorded draw call, with the transform that was current when it
/// was issued.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Save,
    Restore,
    SaveLayer {
        bounds: Option<Rect>,
        alpha: f32,
        blend: BlendMode,
        has_mask: bool,
    },
    Concat(Matrix),
    ClipRect(Rect),
    ClipPath {
        path: PdfPath,
        rule: FillRule,
    },
    Path {
        path: PdfPath,
        rule: FillRule,
        paint: CanvasPaint,
        transform: Matrix,
    },
    Image {
        width: u32,
        height: u32,
        sampling: SamplingMode,
        alpha: f32,
        transform: Matrix,
    },
    Glyphs {
        glyph_ids: Vec<u16>,
        paint: CanvasPaint,
        transform: Matrix,
    },
}

/// Captures draw calls and tracks the transform/clip stacks, so tests
/// can assert device-space geometry without a rasterizer.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub calls: Vec<DrawCall>,
    transform_stack: Vec<(Matrix, Option<Rect>)>,
    current: Matrix,
    clip: Option<Rect>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        RecordingCanvas::default()
    }

    pub fn current_transform(&self) -> Matrix {
        self.current
    }

    /// Only the actual drawing operations, skipping state bookkeeping.
    pub fn drawing_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls.iter().filter(|c| {
            matches!(
                c,
                DrawCall::Path { .. } | DrawCall::Image { .. } | DrawCall::Glyphs { .. }
            )
        })
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) {
        self.transform_stack.push((self.current, self.clip));
        self.calls.push(DrawCall::Save);
    }

    fn restore(&mut self) {
        if let Some((m, clip)) = self.transform_stack.pop() {
            self.current = m;
            self.clip = clip;
        }
        self.calls.push(DrawCall::Restore);
    }

    fn save_layer(
        &mut self,
        bounds: Option<Rect>,
        alpha: f32,
        blend: BlendMode,
        mask: Option<MaskLayer>,
    ) {
        self.transform_stack.push((self.current, self.clip));
        self.calls.push(DrawCall::SaveLayer {
            bounds,
            alpha,
            blend,
            has_mask: mask.is_some(),
        });
    }

    fn concat(&mut self, matrix: Matrix) {
        self.current = self.current.pre_concat(matrix);
        self.calls.push(DrawCall::Concat(matrix));
    }

    fn clip_rect(&mut self, rect: Rect) {
        let device = rect.transform(self.current);
        self.clip = Some(match self.clip {
            Some(existing) => existing
                .intersect(&device)
                .unwrap_or(Rect::from_xywh(device.x, device.y, 0.0, 0.0)),
            None => device,
        });
        self.calls.push(DrawCall::ClipRect(rect));
    }

    fn clip_path(&mut self, path: &PdfPath, rule: FillRule) {
        if let Some(bounds) = path.bounds() {
            let device = bounds.transform(self.current);
            self.clip = Some(match self.clip {
                Some(existing) => existing
                    .intersect(&device)
                    .unwrap_or(Rect::from_xywh(device.x, device.y, 0.0, 0.0)),
                None => device,
            });
        }
        self.calls.push(DrawCall::ClipPath {
            path: path.clone(),
            rule,
        });
    }

    fn draw_path(&mut self, path: &PdfPath, rule: FillRule, paint: &CanvasPaint) {
        self.calls.push(DrawCall::Path {
            path: path.clone(),
            rule,
            paint: paint.clone(),
            transform: self.current,
        });
    }

    fn draw_image(&mut self, image: &RasterImage, sampling: SamplingMode, paint: &CanvasPaint) {
        self.calls.push(DrawCall::Image {
            width: image.width,
            height: image.height,
            sampling,
            alpha: paint.alpha,
            transform: self.current,
        });
    }

    fn draw_glyphs(&mut self, run: &GlyphRun, paint: &CanvasPaint) {
        self.calls.push(DrawCall::Glyphs {
            glyph_ids: run.glyphs.iter().map(|g| g.glyph_id).collect(),
            paint: paint.clone(),
            transform: self.current,
        });
    }

    fn local_clip_bounds(&self) -> Option<Rect> {
        self.clip
    }

    fn make_layer(&self, width: u32, height: u32) -> Box<dyn LayerCanvas> {
        Box::new(RecordingLayer {
            canvas: RecordingCanvas::new(),
            width,
            height,
        })
    }
}

/// Recording stand-in for an offscreen layer. Snapshot pixels are blank;
/// mask-coverage math is exercised directly on constructed buffers in
/// the transparency tests.
#[derive(Debug)]
pub struct RecordingLayer {
    pub canvas: RecordingCanvas,
    width: u32,
    height: u32,
}

impl Canvas for RecordingLayer {
    fn save(&mut self) {
        self.canvas.save();
    }
    fn restore(&mut self) {
        self.canvas.restore();
    }
    fn save_layer(
        &mut self,
        bounds: Option<Rect>,
        alpha: f32,
        blend: BlendMode,
        mask: Option<MaskLayer>,
    ) {
        self.canvas.save_layer(bounds, alpha, blend, mask);
    }
    fn concat(&mut self, matrix: Matrix) {
        self.canvas.concat(matrix);
    }
    fn clip_rect(&mut self, rect: Rect) {
        self.canvas.clip_rect(rect);
    }
    fn clip_path(&mut self, path: &PdfPath, rule: FillRule) {
        self.canvas.clip_path(path, rule);
    }
    fn draw_path(&mut self, path: &PdfPath, rule: FillRule, paint: &CanvasPaint) {
        self.canvas.draw_path(path, rule, paint);
    }
    fn draw_image(&mut self, image: &RasterImage, sampling: SamplingMode, paint: &CanvasPaint) {
        self.canvas.draw_image(image, sampling, paint);
    }
    fn draw_glyphs(&mut self, run: &GlyphRun, paint: &CanvasPaint) {
        self.canvas.draw_glyphs(run, paint);
    }
    fn local_clip_bounds(&self) -> Option<Rect> {
        self.canvas.local_clip_bounds()
    }
    fn make_layer(&self, width: u32, height: u32) -> Box<dyn LayerCanvas> {
        self.canvas.make_layer(width, height)
    }
}

impl LayerCanvas for RecordingLayer {
    fn snapshot_rgba(&self) -> RasterImage {
        RasterImage::new(self.width.max(1), self.height.max(1))
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recording_canvas_tracks_transform_stack() {
        let mut canvas = RecordingCanvas::new();
        canvas.save();
        canvas.concat(Matrix::translate(10.0, 20.0));
        assert_eq!(canvas.current_transform().e, 10.0);
        canvas.restore();
        assert_eq!(canvas.current_transform(), Matrix::IDENTITY);
    }

    #[test]
    fn clip_rect_intersects_in_device_space() {
        let mut canvas = RecordingCanvas::new();
        canvas.clip_rect(Rect::from_xywh(0.0, 0.0, 100.0, 100.0));
        canvas.concat(Matrix::translate(50.0, 50.0));
        canvas.clip_rect(Rect::from_xywh(0.0, 0.0, 100.0, 100.0));
        assert_eq!(
            canvas.local_clip_bounds(),
            Some(Rect::from_xywh(50.0, 50.0, 50.0, 50.0))
        );
    }

    #[test]
    fn path_bounds_cover_all_anchor_points() {
        let mut path = PdfPath::new();
        path.move_to(10.0, 10.0);
        path.line_to(50.0, 90.0);
        path.close();
        assert_eq!(path.bounds(), Some(Rect::from_lbrt(10.0, 10.0, 50.0, 90.0)));
    }
}
