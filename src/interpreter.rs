//! interpreter.rs
//!
//! The content-stream interpreter: an operand stack, a graphics-state
//! stack and a dispatch over the operator families (graphics state,
//! path, color, text, XObject, inline image, shading, marked content).
//! Paths accumulate in user space and transform through the CTM at
//! paint time; the canvas transform stays at identity except around
//! image and pattern placement.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::canvas::{
    Canvas, CanvasPaint, FillRule, GlyphRun, MaskLayer, PaintStyle, PdfPath, PositionedGlyph,
    SamplingMode, StrokeStyle, TileShader, TypefaceSource,
};
use crate::color::{parse_color_space, ColorSpace, Components, RgbColor};
use crate::document::PdfDocument;
use crate::errors::{PdfError, PdfWarnMsg};
use crate::font::{load_font, FontVariant, PdfFont};
use crate::graphics::{
    apply_ext_gstate, parse_transparency_group, BlendMode, GraphicsStack, GraphicsState,
    LineCapStyle, LineDashPattern, LineJoinStyle, Paint, Rect, RenderingIntent, SoftMask,
    SoftMaskSubtype, TextRenderingMode,
};
use crate::image::decode_image;
use crate::lexer::Lexer;
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::pattern::{parse_pattern, Pattern};
use crate::shading::{parse_shading, rasterize_shading};
use crate::text::TextFragment;
use crate::transparency::derive_coverage;

/// Checked between operators and before any layer materializes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// largest offscreen edge for masks, groups and pattern cells
const MAX_LAYER_EXTENT: u32 = 4096;
/// nesting limit for soft-mask and pattern sub-renders
const MAX_SUB_RENDER_DEPTH: usize = 6;

pub(crate) struct Interpreter<'a> {
    doc: &'a PdfDocument,
    page_index: usize,
    pub stack: GraphicsStack,
    operands: Vec<Object>,
    /// current path, user space
    path: PdfPath,
    start_point: Option<(f32, f32)>,
    current_point: Option<(f32, f32)>,
    pending_clip: Option<FillRule>,
    /// glyph outlines accumulated by the clipping text modes, device
    /// space, applied at ET
    text_clip: PdfPath,
    /// form XObjects currently being interpreted, for re-entry cuts
    active_xobjects: HashSet<ObjectId>,
    /// materialized soft-mask coverage, keyed by descriptor address
    mask_cache: HashMap<usize, Option<MaskLayer>>,
    cancel: Option<CancellationToken>,
    sub_render_depth: usize,
    marked_content_depth: usize,
    pub warnings: Vec<PdfWarnMsg>,
    pub text: Vec<TextFragment>,
    op_count: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        doc: &'a PdfDocument,
        page_index: usize,
        initial: GraphicsState,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Interpreter {
            doc,
            page_index,
            stack: GraphicsStack::new(initial),
            operands: Vec::new(),
            path: PdfPath::new(),
            start_point: None,
            current_point: None,
            pending_clip: None,
            text_clip: PdfPath::new(),
            active_xobjects: HashSet::new(),
            mask_cache: HashMap::new(),
            cancel: cancel.clone(),
            sub_render_depth: 0,
            marked_content_depth: 0,
            warnings: Vec::new(),
            text: Vec::new(),
            op_count: 0,
        }
    }

    fn warn(&mut self, msg: String) {
        self.warnings
            .push(PdfWarnMsg::warning(self.page_index, self.op_count, msg));
    }

    /// Runs a content stream against the canvas. Canvas saves opened by
    /// this call are balanced on every exit path, including
    /// cancellation.
    pub fn execute(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let mut lexer = Lexer::new(content);
        let mut canvas_saves: usize = 0;
        let result = loop {
            if self.cancel.as_ref().map(CancellationToken::is_cancelled) == Some(true) {
                break Err(PdfError::Cancelled);
            }
            match lexer.read_next(false) {
                Ok(None) => break Ok(()),
                Ok(Some(Object::Operator(op))) => {
                    self.op_count += 1;
                    match self.execute_operator(
                        &op,
                        &mut lexer,
                        resources,
                        canvas,
                        &mut canvas_saves,
                    ) {
                        Ok(()) => {}
                        Err(e @ (PdfError::Cancelled | PdfError::Fatal(_))) => break Err(e),
                        Err(other) => {
                            self.warn(format!("operator {op:?}: {other}"));
                        }
                    }
                    self.operands.clear();
                }
                Ok(Some(value)) => {
                    self.operands.push(value);
                    // runaway operand streams are data errors
                    if self.operands.len() > 128 {
                        self.operands.remove(0);
                    }
                }
                Err(e) => {
                    // recover at the next token
                    self.warn(format!("content stream: {e}"));
                    self.operands.clear();
                    lexer.seek(lexer.pos() + 1);
                }
            }
        };
        // unmatched saves from a broken or cancelled stream
        while canvas_saves > 0 {
            canvas.restore();
            self.stack.restore();
            canvas_saves -= 1;
        }
        result
    }

    fn execute_operator(
        &mut self,
        op: &str,
        lexer: &mut Lexer,
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
        canvas_saves: &mut usize,
    ) -> Result<(), PdfError> {
        match op.as_bytes() {
            // ---------------- graphics state ----------------
            b"q" => {
                self.stack.save();
                canvas.save();
                *canvas_saves += 1;
            }
            b"Q" => {
                if self.stack.restore() {
                    canvas.restore();
                    *canvas_saves = canvas_saves.saturating_sub(1);
                }
            }
            b"cm" => {
                let m = self.take_matrix()?;
                let state = self.stack.current_mut();
                state.ctm = state.ctm.pre_concat(m);
            }
            b"w" => self.stack.current_mut().line_width = self.take_f32()?,
            b"J" => self.stack.current_mut().line_cap = LineCapStyle::from_i64(self.take_i64()?),
            b"j" => self.stack.current_mut().line_join = LineJoinStyle::from_i64(self.take_i64()?),
            b"M" => self.stack.current_mut().miter_limit = self.take_f32()?,
            b"d" => {
                let phase = self.take_f32()?;
                let dashes = match self.operands.pop() {
                    Some(Object::Array(arr)) => arr
                        .iter()
                        .filter_map(|o| o.as_f32().ok())
                        .collect(),
                    _ => Vec::new(),
                };
                self.stack.current_mut().dash = LineDashPattern { dashes, phase };
            }
            b"ri" => {
                let name = self.take_name()?;
                self.stack.current_mut().rendering_intent = RenderingIntent::from_name(&name);
            }
            b"i" => self.stack.current_mut().flatness = self.take_f32()?,
            b"gs" => {
                let name = self.take_name()?;
                match self.resource_entry(resources, b"ExtGState", &name) {
                    Some((_, resolved)) => match resolved.as_dict() {
                        Ok(dict) => {
                            let dict = dict.clone();
                            let mut warnings = std::mem::take(&mut self.warnings);
                            apply_ext_gstate(
                                self.stack.current_mut(),
                                self.doc,
                                &dict,
                                self.page_index,
                                &mut warnings,
                            );
                            self.warnings = warnings;
                        }
                        Err(_) => self.warn(format!(
                            "ExtGState /{} is not a dictionary",
                            String::from_utf8_lossy(&name)
                        )),
                    },
                    None => self.warn(format!(
                        "missing ExtGState /{}",
                        String::from_utf8_lossy(&name)
                    )),
                }
            }

            // ---------------- path construction ----------------
            b"m" => {
                let [x, y] = self.take_f32s::<2>()?;
                self.path.move_to(x, y);
                self.start_point = Some((x, y));
                self.current_point = Some((x, y));
            }
            b"l" => {
                let [x, y] = self.take_f32s::<2>()?;
                self.path.line_to(x, y);
                self.current_point = Some((x, y));
            }
            b"c" => {
                let [x1, y1, x2, y2, x, y] = self.take_f32s::<6>()?;
                self.path.curve_to(x1, y1, x2, y2, x, y);
                self.current_point = Some((x, y));
            }
            b"v" => {
                let [x2, y2, x, y] = self.take_f32s::<4>()?;
                let (cx, cy) = self.current_point.unwrap_or((x2, y2));
                self.path.curve_to(cx, cy, x2, y2, x, y);
                self.current_point = Some((x, y));
            }
            b"y" => {
                let [x1, y1, x, y] = self.take_f32s::<4>()?;
                self.path.curve_to(x1, y1, x, y, x, y);
                self.current_point = Some((x, y));
            }
            b"h" => {
                self.path.close();
                self.current_point = self.start_point;
            }
            b"re" => {
                let [x, y, w, h] = self.take_f32s::<4>()?;
                self.path.rect(Rect::from_xywh(x, y, w, h));
                self.start_point = Some((x, y));
                self.current_point = Some((x, y));
            }

            // ---------------- path painting ----------------
            b"S" => self.paint_path(canvas, false, true, FillRule::NonZero),
            b"s" => {
                self.path.close();
                self.paint_path(canvas, false, true, FillRule::NonZero);
            }
            b"f" | b"F" => self.paint_path(canvas, true, false, FillRule::NonZero),
            b"f*" => self.paint_path(canvas, true, false, FillRule::EvenOdd),
            b"B" => self.paint_path(canvas, true, true, FillRule::NonZero),
            b"B*" => self.paint_path(canvas, true, true, FillRule::EvenOdd),
            b"b" => {
                self.path.close();
                self.paint_path(canvas, true, true, FillRule::NonZero);
            }
            b"b*" => {
                self.path.close();
                self.paint_path(canvas, true, true, FillRule::EvenOdd);
            }
            b"n" => self.paint_path(canvas, false, false, FillRule::NonZero),
            b"W" => self.pending_clip = Some(FillRule::NonZero),
            b"W*" => self.pending_clip = Some(FillRule::EvenOdd),

            // ---------------- color ----------------
            b"g" => {
                let v = self.take_f32()?;
                self.set_solid(false, ColorSpace::DeviceGray, &[v]);
            }
            b"G" => {
                let v = self.take_f32()?;
                self.set_solid(true, ColorSpace::DeviceGray, &[v]);
            }
            b"rg" => {
                let v = self.take_f32s::<3>()?;
                self.set_solid(false, ColorSpace::DeviceRgb, &v);
            }
            b"RG" => {
                let v = self.take_f32s::<3>()?;
                self.set_solid(true, ColorSpace::DeviceRgb, &v);
            }
            b"k" => {
                let v = self.take_f32s::<4>()?;
                self.set_solid(false, ColorSpace::DeviceCmyk, &v);
            }
            b"K" => {
                let v = self.take_f32s::<4>()?;
                self.set_solid(true, ColorSpace::DeviceCmyk, &v);
            }
            b"cs" => {
                let name = self.take_name()?;
                self.set_color_space(false, &name, resources);
            }
            b"CS" => {
                let name = self.take_name()?;
                self.set_color_space(true, &name, resources);
            }
            b"sc" => self.set_components(false, resources, false)?,
            b"SC" => self.set_components(true, resources, false)?,
            b"scn" => self.set_components(false, resources, true)?,
            b"SCN" => self.set_components(true, resources, true)?,

            // ---------------- text ----------------
            b"BT" => {
                let state = self.stack.current_mut();
                state.in_text_object = true;
                state.text_matrix = Matrix::IDENTITY;
                state.text_line_matrix = Matrix::IDENTITY;
            }
            b"ET" => {
                let state = self.stack.current_mut();
                state.in_text_object = false;
                state.text_matrix = Matrix::IDENTITY;
                state.text_line_matrix = Matrix::IDENTITY;
                if !self.text_clip.is_empty() {
                    let clip = std::mem::take(&mut self.text_clip);
                    canvas.clip_path(&clip, FillRule::NonZero);
                }
            }
            b"Tc" => self.stack.current_mut().char_spacing = self.take_f32()?,
            b"Tw" => self.stack.current_mut().word_spacing = self.take_f32()?,
            b"Tz" => self.stack.current_mut().horizontal_scaling = self.take_f32()?,
            b"TL" => self.stack.current_mut().leading = self.take_f32()?,
            b"Ts" => self.stack.current_mut().rise = self.take_f32()?,
            b"Tr" => {
                self.stack.current_mut().text_render_mode =
                    TextRenderingMode::from_i64(self.take_i64()?)
            }
            b"Tf" => {
                let size = self.take_f32()?;
                let name = self.take_name()?;
                let font = self.load_font_resource(resources, &name);
                let state = self.stack.current_mut();
                state.font = font;
                state.font_size = size;
            }
            b"Td" => {
                let [tx, ty] = self.take_f32s::<2>()?;
                self.advance_text_line(tx, ty);
            }
            b"TD" => {
                let [tx, ty] = self.take_f32s::<2>()?;
                self.stack.current_mut().leading = -ty;
                self.advance_text_line(tx, ty);
            }
            b"Tm" => {
                let m = self.take_matrix()?;
                let state = self.stack.current_mut();
                state.text_matrix = m;
                state.text_line_matrix = m;
            }
            b"T*" => {
                let leading = self.stack.current().leading;
                self.advance_text_line(0.0, -leading);
            }
            b"Tj" => {
                let bytes = self.take_string()?;
                self.show_text(&bytes, resources, canvas)?;
            }
            b"'" => {
                let bytes = self.take_string()?;
                let leading = self.stack.current().leading;
                self.advance_text_line(0.0, -leading);
                self.show_text(&bytes, resources, canvas)?;
            }
            b"\"" => {
                let bytes = self.take_string()?;
                let char_spacing = self.take_f32()?;
                let word_spacing = self.take_f32()?;
                {
                    let state = self.stack.current_mut();
                    state.word_spacing = word_spacing;
                    state.char_spacing = char_spacing;
                }
                let leading = self.stack.current().leading;
                self.advance_text_line(0.0, -leading);
                self.show_text(&bytes, resources, canvas)?;
            }
            b"TJ" => {
                let arr = match self.operands.pop() {
                    Some(Object::Array(arr)) => arr,
                    _ => return Err(PdfError::Dictionary("TJ expects an array".into())),
                };
                for item in arr {
                    match item {
                        Object::String(bytes, _) => self.show_text(&bytes, resources, canvas)?,
                        Object::Integer(_) | Object::Real(_) => {
                            let adjust = item.as_f32().unwrap_or(0.0);
                            let state = self.stack.current_mut();
                            let tx = -adjust / 1000.0
                                * state.font_size
                                * (state.horizontal_scaling / 100.0);
                            state.text_matrix =
                                Matrix::combine(Matrix::translate(tx, 0.0), state.text_matrix);
                        }
                        _ => {}
                    }
                }
            }

            // ---------------- XObjects, shadings, inline images ----------------
            b"Do" => {
                let name = self.take_name()?;
                self.invoke_xobject(&name, resources, canvas)?;
            }
            b"sh" => {
                let name = self.take_name()?;
                self.paint_shading_op(&name, resources, canvas);
            }
            b"BI" => self.inline_image(lexer, canvas)?,

            // ---------------- marked content, compatibility ----------------
            b"BMC" | b"BDC" => self.marked_content_depth += 1,
            b"EMC" => {
                self.marked_content_depth = self.marked_content_depth.saturating_sub(1);
            }
            b"MP" | b"DP" | b"BX" | b"EX" => {}
            // Type3 glyph metrics; widths come from the font dictionary
            b"d0" | b"d1" => {}

            other => {
                self.warn(format!(
                    "unknown operator {:?}",
                    String::from_utf8_lossy(other)
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // operand helpers

    fn take_f32(&mut self) -> Result<f32, PdfError> {
        self.operands
            .pop()
            .and_then(|o| o.as_f32().ok())
            .ok_or_else(|| PdfError::Dictionary("missing numeric operand".into()))
    }

    fn take_i64(&mut self) -> Result<i64, PdfError> {
        self.operands
            .pop()
            .and_then(|o| o.as_f32().ok().map(|v| v as i64))
            .ok_or_else(|| PdfError::Dictionary("missing integer operand".into()))
    }

    fn take_f32s<const N: usize>(&mut self) -> Result<[f32; N], PdfError> {
        if self.operands.len() < N {
            return Err(PdfError::Dictionary("not enough operands".into()));
        }
        let tail = self.operands.split_off(self.operands.len() - N);
        let mut out = [0f32; N];
        for (slot, obj) in out.iter_mut().zip(tail.iter()) {
            *slot = obj
                .as_f32()
                .map_err(|_| PdfError::Dictionary("non-numeric operand".into()))?;
        }
        Ok(out)
    }

    fn take_matrix(&mut self) -> Result<Matrix, PdfError> {
        let m = self.take_f32s::<6>()?;
        Ok(Matrix::from_array(m))
    }

    fn take_name(&mut self) -> Result<Vec<u8>, PdfError> {
        match self.operands.pop() {
            Some(Object::Name(n)) => Ok(n),
            _ => Err(PdfError::Dictionary("missing name operand".into())),
        }
    }

    fn take_string(&mut self) -> Result<Vec<u8>, PdfError> {
        match self.operands.pop() {
            Some(Object::String(s, _)) => Ok(s),
            _ => Err(PdfError::Dictionary("missing string operand".into())),
        }
    }

    // ------------------------------------------------------------------
    // resources

    /// Raw and resolved entry of `resources[category][name]`.
    fn resource_entry(
        &self,
        resources: &Dictionary,
        category: &[u8],
        name: &[u8],
    ) -> Option<(Object, Rc<Object>)> {
        let cat = self.doc.dict_get(resources, category)?;
        let cat = cat.as_dict().ok()?.clone();
        let raw = cat.get(name).ok()?.clone();
        let resolved = self.doc.resolve(&raw);
        Some((raw, resolved))
    }

    /// Form resources overlay the enclosing ones per category
    /// subdictionary.
    fn merge_resources(&self, parent: &Dictionary, child: Option<&Dictionary>) -> Dictionary {
        let child = match child {
            Some(c) => c,
            None => return parent.clone(),
        };
        let mut merged = parent.clone();
        for (key, value) in child.iter() {
            let parent_sub = self
                .doc
                .dict_get(parent, key)
                .and_then(|o| o.as_dict().ok().cloned());
            let child_sub = self
                .doc
                .resolve(value)
                .as_dict()
                .ok()
                .cloned();
            match (parent_sub, child_sub) {
                (Some(mut base), Some(overlay)) => {
                    for (k, v) in overlay.iter() {
                        base.set(k.to_vec(), v.clone());
                    }
                    merged.set(key.to_vec(), Object::Dictionary(base));
                }
                _ => merged.set(key.to_vec(), value.clone()),
            }
        }
        merged
    }

    fn load_font_resource(
        &mut self,
        resources: &Dictionary,
        name: &[u8],
    ) -> Option<Rc<PdfFont>> {
        let (raw, resolved) = match self.resource_entry(resources, b"Font", name) {
            Some(pair) => pair,
            None => {
                self.warn(format!("missing font /{}", String::from_utf8_lossy(name)));
                return None;
            }
        };
        if let Ok(id) = raw.as_reference() {
            if let Some(cached) = self.doc.font_cache.borrow().get(&id) {
                return Some(cached.clone());
            }
        }
        let dict = resolved.as_dict().ok()?.clone();
        let mut warnings = std::mem::take(&mut self.warnings);
        let font = Rc::new(load_font(self.doc, &dict, self.page_index, &mut warnings));
        self.warnings = warnings;
        if let Ok(id) = raw.as_reference() {
            self.doc.font_cache.borrow_mut().insert(id, font.clone());
        }
        Some(font)
    }

    // ------------------------------------------------------------------
    // color

    fn set_solid(&mut self, stroke: bool, cs: ColorSpace, comps: &[f32]) {
        let color = cs.to_rgb(comps);
        let state = self.stack.current_mut();
        let paint = Rc::new(Paint::Solid(color));
        if stroke {
            state.stroke_cs = Rc::new(cs);
            state.stroke_paint = paint;
        } else {
            state.fill_cs = Rc::new(cs);
            state.fill_paint = paint;
        }
    }

    fn set_color_space(&mut self, stroke: bool, name: &[u8], resources: &Dictionary) {
        let cs = match name {
            b"DeviceGray" | b"G" => ColorSpace::DeviceGray,
            b"DeviceRGB" | b"RGB" => ColorSpace::DeviceRgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::DeviceCmyk,
            b"Pattern" => ColorSpace::Pattern { base: None },
            other => match self.resource_entry(resources, b"ColorSpace", other) {
                Some((raw, _)) => {
                    let mut warnings = std::mem::take(&mut self.warnings);
                    let cs = parse_color_space(self.doc, &raw, self.page_index, &mut warnings);
                    self.warnings = warnings;
                    cs
                }
                None => {
                    self.warn(format!(
                        "missing color space /{}",
                        String::from_utf8_lossy(other)
                    ));
                    return;
                }
            },
        };
        let initial = cs.initial_components();
        let color = cs.to_rgb(&initial);
        let is_pattern = cs.is_pattern();
        let state = self.stack.current_mut();
        let paint = if is_pattern {
            Rc::new(Paint::Pattern {
                name: String::new(),
                pattern: None,
                tint: None,
                tint_color: None,
            })
        } else {
            Rc::new(Paint::Solid(color))
        };
        if stroke {
            state.stroke_cs = Rc::new(cs);
            state.stroke_paint = paint;
        } else {
            state.fill_cs = Rc::new(cs);
            state.fill_paint = paint;
        }
    }

    /// `sc`/`scn` and friends: numeric components, plus (for `scn`) an
    /// optional trailing pattern name.
    fn set_components(
        &mut self,
        stroke: bool,
        resources: &Dictionary,
        allow_pattern: bool,
    ) -> Result<(), PdfError> {
        let cs = if stroke {
            self.stack.current().stroke_cs.clone()
        } else {
            self.stack.current().fill_cs.clone()
        };
        let pattern_name = match self.operands.last() {
            Some(Object::Name(_)) if allow_pattern => match self.operands.pop() {
                Some(Object::Name(n)) => Some(n),
                _ => None,
            },
            _ => None,
        };
        let comps: Components = self
            .operands
            .drain(..)
            .filter_map(|o| o.as_f32().ok())
            .collect();

        match (&*cs, pattern_name) {
            (ColorSpace::Pattern { base }, Some(name)) => {
                // uncolored patterns take the leading numerics as tint
                let tint_color = base.as_ref().map(|b| b.to_rgb(&comps));
                // resolve against the resources in scope NOW; forms may
                // shadow the page's pattern dictionary
                let pattern = match self.resource_entry(resources, b"Pattern", &name) {
                    Some((raw, _)) => {
                        let mut warnings = std::mem::take(&mut self.warnings);
                        let p = parse_pattern(self.doc, &raw, self.page_index, &mut warnings);
                        self.warnings = warnings;
                        p
                    }
                    None => {
                        self.warn(format!(
                            "missing pattern /{}",
                            String::from_utf8_lossy(&name)
                        ));
                        None
                    }
                };
                let paint = Rc::new(Paint::Pattern {
                    name: String::from_utf8_lossy(&name).into_owned(),
                    pattern,
                    tint: if comps.is_empty() { None } else { Some(comps) },
                    tint_color,
                });
                let state = self.stack.current_mut();
                if stroke {
                    state.stroke_paint = paint;
                } else {
                    state.fill_paint = paint;
                }
            }
            (ColorSpace::Pattern { .. }, None) => {
                self.warn("numeric components under Pattern space".to_string());
            }
            (_, _) => {
                let color = cs.to_rgb(&comps);
                let state = self.stack.current_mut();
                let paint = Rc::new(Paint::Solid(color));
                if stroke {
                    state.stroke_paint = paint;
                } else {
                    state.fill_paint = paint;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // path painting

    fn paint_path(&mut self, canvas: &mut dyn Canvas, fill: bool, stroke: bool, rule: FillRule) {
        let path = std::mem::take(&mut self.path);
        self.start_point = None;
        self.current_point = None;
        if !path.is_empty() && (fill || stroke) {
            let device_path = path.transform(self.stack.current().ctm);
            if fill {
                self.draw_filled(&device_path, rule, canvas);
            }
            if stroke {
                self.draw_stroked(&path, canvas);
            }
        }
        // a pending clip installs the path after painting, then both go
        if let Some(clip_rule) = self.pending_clip.take() {
            let device_path = path.transform(self.stack.current().ctm);
            if !device_path.is_empty() {
                canvas.clip_path(&device_path, clip_rule);
            }
        }
    }

    fn draw_filled(&mut self, device_path: &PdfPath, rule: FillRule, canvas: &mut dyn Canvas) {
        let state = self.stack.current();
        match &*state.fill_paint.clone() {
            Paint::Solid(color) => {
                let paint = CanvasPaint {
                    style: PaintStyle::Fill,
                    color: *color,
                    alpha: state.fill_alpha,
                    blend: state.blend_mode,
                    shader: None,
                };
                let masked = self.begin_masked_draw(canvas);
                canvas.draw_path(device_path, rule, &paint);
                if masked {
                    canvas.restore();
                }
            }
            Paint::Pattern {
                pattern, tint_color, ..
            } => {
                let pattern = pattern.clone();
                let tint_color = *tint_color;
                self.paint_with_pattern(device_path, rule, pattern, tint_color, false, canvas);
            }
        }
    }

    fn draw_stroked(&mut self, user_path: &PdfPath, canvas: &mut dyn Canvas) {
        let state = self.stack.current();
        let ctm = state.ctm;
        let stroke_style = StrokeStyle {
            width: state.line_width.max(0.0),
            cap: state.line_cap,
            join: state.line_join,
            miter_limit: state.miter_limit,
            dash: state.dash.clone(),
        };
        match &*state.stroke_paint.clone() {
            Paint::Solid(color) => {
                let paint = CanvasPaint {
                    style: PaintStyle::Stroke(stroke_style),
                    color: *color,
                    alpha: state.stroke_alpha,
                    blend: state.blend_mode,
                    shader: None,
                };
                let masked = self.begin_masked_draw(canvas);
                // stroke in user space so the pen transforms correctly
                canvas.save();
                canvas.concat(ctm);
                canvas.draw_path(user_path, FillRule::NonZero, &paint);
                canvas.restore();
                if masked {
                    canvas.restore();
                }
            }
            Paint::Pattern {
                pattern, tint_color, ..
            } => {
                let pattern = pattern.clone();
                let tint_color = *tint_color;
                let device_path = user_path.transform(ctm);
                self.paint_with_pattern(
                    &device_path,
                    FillRule::NonZero,
                    pattern,
                    tint_color,
                    true,
                    canvas,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // text

    fn advance_text_line(&mut self, tx: f32, ty: f32) {
        let state = self.stack.current_mut();
        state.text_line_matrix =
            Matrix::combine(Matrix::translate(tx, ty), state.text_line_matrix);
        state.text_matrix = state.text_line_matrix;
    }

    fn show_text(
        &mut self,
        bytes: &[u8],
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let font = match self.stack.current().font.clone() {
            Some(f) => f,
            None => {
                self.warn("text shown without a font".to_string());
                return Ok(());
            }
        };
        let codes = font.encode_bytes(bytes);
        let mut run = Vec::with_capacity(codes.len());
        for code in codes {
            let state = self.stack.current();
            let font_size = state.font_size;
            let h = state.horizontal_scaling / 100.0;
            let params = Matrix::from_array([font_size * h, 0.0, 0.0, font_size, 0.0, state.rise]);
            let trm = Matrix::combine(
                params,
                Matrix::combine(state.text_matrix, state.ctm),
            );
            let mode = state.text_render_mode;
            let width = font.glyph_width(code);

            // extraction record, device-space origin and advance
            let (ox, oy) = trm.transform_point(0.0, 0.0);
            let (wx, wy) = trm.transform_vector(width / 1000.0, 0.0);
            self.text.push(TextFragment {
                text: font
                    .unicode(code)
                    .unwrap_or_else(|| "\u{FFFD}".to_string()),
                x: ox,
                y: oy,
                width: (wx * wx + wy * wy).sqrt(),
                font_size,
            });

            if font.is_type3() {
                if mode != TextRenderingMode::Invisible {
                    self.draw_type3_glyph(&font, code, trm, resources, canvas)?;
                }
            } else if mode.fills() || mode.strokes() || mode.clips() {
                let glyph_id = font.glyph_id(code);
                run.push(PositionedGlyph {
                    glyph_id,
                    transform: trm,
                });
                if mode.clips() {
                    self.accumulate_text_clip(&font, glyph_id, width, trm, canvas);
                }
            }

            // text matrix advance per glyph
            let state = self.stack.current_mut();
            let mut advance = (width / 1000.0 - state.char_spacing) * font_size;
            if font.is_word_space(code) {
                advance += state.word_spacing;
            }
            let tx = advance * h;
            let (dx, dy) = if font.writing_mode() == 1 {
                (0.0, -advance)
            } else {
                (tx, 0.0)
            };
            state.text_matrix = Matrix::combine(Matrix::translate(dx, dy), state.text_matrix);
        }
        if !run.is_empty() {
            self.flush_glyph_run(&font, run, canvas);
        }
        Ok(())
    }

    fn flush_glyph_run(&mut self, font: &PdfFont, glyphs: Vec<PositionedGlyph>, canvas: &mut dyn Canvas) {
        let state = self.stack.current();
        let mode = state.text_render_mode;
        let typeface = match &font.font_file {
            Some(bytes) => TypefaceSource::Embedded(bytes.clone()),
            None => TypefaceSource::Named {
                postscript_name: font.base_font.clone(),
                weight: font
                    .descriptor
                    .as_ref()
                    .and_then(|d| d.font_weight)
                    .unwrap_or(400.0) as u16,
                italic: font
                    .descriptor
                    .as_ref()
                    .map(|d| d.italic_angle != 0.0)
                    .unwrap_or(false),
            },
        };
        let units_per_em = font
            .embedded
            .as_ref()
            .map(|p| p.units_per_em_f32())
            .unwrap_or(1000.0);
        let run = GlyphRun {
            typeface,
            units_per_em,
            glyphs,
        };
        let fill_alpha = state.fill_alpha;
        let stroke_alpha = state.stroke_alpha;
        let blend = state.blend_mode;
        let fill_color = state.fill_paint.solid_or_black();
        let stroke_color = state.stroke_paint.solid_or_black();
        let stroke_style = StrokeStyle {
            width: state.line_width,
            cap: state.line_cap,
            join: state.line_join,
            miter_limit: state.miter_limit,
            dash: state.dash.clone(),
        };
        let masked = self.begin_masked_draw(canvas);
        if mode.fills() {
            let paint = CanvasPaint {
                style: PaintStyle::Fill,
                color: fill_color,
                alpha: fill_alpha,
                blend,
                shader: None,
            };
            canvas.draw_glyphs(&run, &paint);
        }
        if mode.strokes() {
            let paint = CanvasPaint {
                style: PaintStyle::Stroke(stroke_style),
                color: stroke_color,
                alpha: stroke_alpha,
                blend,
                shader: None,
            };
            canvas.draw_glyphs(&run, &paint);
        }
        if masked {
            canvas.restore();
        }
    }

    /// Adds the glyph's outline (or its advance box when the back-end
    /// has no scaler) to the pending text clip, in device space.
    fn accumulate_text_clip(
        &mut self,
        font: &PdfFont,
        glyph_id: u16,
        width: f32,
        trm: Matrix,
        canvas: &mut dyn Canvas,
    ) {
        let outline = font.font_file.as_ref().and_then(|bytes| {
            let source = TypefaceSource::Embedded(bytes.clone());
            let upem = font
                .embedded
                .as_ref()
                .map(|p| p.units_per_em_f32())
                .unwrap_or(1000.0);
            canvas.glyph_outline(&source, glyph_id).map(|p| {
                p.transform(Matrix::combine(
                    Matrix::scale(1.0 / upem, 1.0 / upem),
                    trm,
                ))
            })
        });
        let device = outline.unwrap_or_else(|| {
            let mut fallback = PdfPath::new();
            fallback.rect(Rect::from_xywh(0.0, 0.0, width / 1000.0, 1.0));
            fallback.transform(trm)
        });
        self.text_clip.commands.extend(device.commands);
    }

    fn draw_type3_glyph(
        &mut self,
        font: &PdfFont,
        code: crate::cmap::CharacterCode,
        trm: Matrix,
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let t3 = match &font.variant {
            FontVariant::Type3(t3) => t3.clone(),
            _ => return Ok(()),
        };
        let glyph_name = match t3.encoding.glyph_name(code.value() as u8) {
            Some(n) => n.to_string(),
            None => return Ok(()),
        };
        let proc_obj = match t3.char_procs.get(&glyph_name) {
            Some(p) => p.clone(),
            None => return Ok(()),
        };
        let proc_id = proc_obj.as_reference().ok();
        if let Some(id) = proc_id {
            if !self.active_xobjects.insert(id) {
                return Ok(()); // re-entrant glyph procedure
            }
        }
        let bytes: Vec<u8> = match (proc_id, &proc_obj) {
            (Some(id), _) => {
                let mut warnings = std::mem::take(&mut self.warnings);
                let b = self.doc.stream_bytes(id, self.page_index, &mut warnings);
                self.warnings = warnings;
                b.as_ref().clone()
            }
            (None, Object::Stream(s)) => {
                let mut warnings = std::mem::take(&mut self.warnings);
                let b = self.doc.decode_stream_direct(s, self.page_index, &mut warnings);
                self.warnings = warnings;
                b
            }
            _ => Vec::new(),
        };
        let glyph_resources =
            self.merge_resources(resources, t3.resources.as_ref());
        self.stack.save();
        canvas.save();
        {
            let state = self.stack.current_mut();
            state.ctm = Matrix::combine(t3.font_matrix, trm);
            state.in_text_object = false;
        }
        let result = self.execute(&bytes, &glyph_resources, canvas);
        canvas.restore();
        self.stack.restore();
        if let Some(id) = proc_id {
            self.active_xobjects.remove(&id);
        }
        result
    }

    // ------------------------------------------------------------------
    // XObjects and inline images

    fn invoke_xobject(
        &mut self,
        name: &[u8],
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let (raw, resolved) = match self.resource_entry(resources, b"XObject", name) {
            Some(pair) => pair,
            None => {
                self.warn(format!(
                    "missing XObject /{}",
                    String::from_utf8_lossy(name)
                ));
                return Ok(());
            }
        };
        let stream = match resolved.as_stream() {
            Ok(s) => s,
            Err(_) => {
                self.warn(format!(
                    "XObject /{} is not a stream",
                    String::from_utf8_lossy(name)
                ));
                return Ok(());
            }
        };
        let subtype = self
            .doc
            .dict_get(&stream.dict, b"Subtype")
            .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .unwrap_or_default();
        match subtype.as_slice() {
            b"Image" => self.draw_image_xobject(stream, raw.as_reference().ok(), canvas),
            b"Form" => self.draw_form_xobject(&raw, stream, resources, canvas),
            other => {
                self.warn(format!(
                    "XObject subtype /{} not supported",
                    String::from_utf8_lossy(other)
                ));
                Ok(())
            }
        }
    }

    fn draw_image_xobject(
        &mut self,
        stream: &Stream,
        id: Option<ObjectId>,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let fill_color = self.stack.current().fill_paint.solid_or_black();
        let mut warnings = std::mem::take(&mut self.warnings);
        let decoded = decode_image(
            self.doc,
            stream,
            id,
            fill_color,
            self.page_index,
            &mut warnings,
        );
        self.warnings = warnings;
        let decoded = match decoded {
            Some(d) => d,
            None => return Ok(()),
        };
        self.draw_decoded_image(&decoded.image, decoded.sampling, canvas);
        Ok(())
    }

    /// Places a decoded raster in the unit square (0,0)–(1,1) under the
    /// CTM; image rows run top-down.
    fn draw_decoded_image(
        &mut self,
        image: &crate::canvas::RasterImage,
        sampling: SamplingMode,
        canvas: &mut dyn Canvas,
    ) {
        let state = self.stack.current();
        let paint = CanvasPaint {
            style: PaintStyle::Fill,
            color: RgbColor::BLACK,
            alpha: state.fill_alpha,
            blend: state.blend_mode,
            shader: None,
        };
        let ctm = state.ctm;
        let pix_to_unit = Matrix::from_array([
            1.0 / image.width as f32,
            0.0,
            0.0,
            -1.0 / image.height as f32,
            0.0,
            1.0,
        ]);
        let masked = self.begin_masked_draw(canvas);
        canvas.save();
        canvas.concat(ctm);
        canvas.concat(pix_to_unit);
        canvas.draw_image(image, sampling, &paint);
        canvas.restore();
        if masked {
            canvas.restore();
        }
    }

    fn draw_form_xobject(
        &mut self,
        raw: &Object,
        stream: &Stream,
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let id = match raw.as_reference() {
            Ok(id) => id,
            Err(_) => (u32::MAX, u16::MAX), // direct forms cannot recurse
        };
        if !self.active_xobjects.insert(id) {
            // re-entry on the same reference is cut silently
            return Ok(());
        }
        let result = self.draw_form_inner(id, stream, resources, canvas);
        self.active_xobjects.remove(&id);
        result
    }

    fn draw_form_inner(
        &mut self,
        id: ObjectId,
        stream: &Stream,
        resources: &Dictionary,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let form_dict = &stream.dict;
        let matrix = self
            .doc
            .dict_get(form_dict, b"Matrix")
            .and_then(|o| {
                let arr = o.as_array().ok()?;
                let mut m = [0f32; 6];
                for (slot, v) in m.iter_mut().zip(arr.iter()) {
                    *slot = self.doc.resolve(v).as_f32().ok()?;
                }
                Some(Matrix::from_array(m))
            })
            .unwrap_or(Matrix::IDENTITY);
        let bbox = form_dict
            .get(b"BBox")
            .ok()
            .and_then(|o| self.doc.rect_from_object(o));
        let form_resources = self
            .doc
            .dict_get(form_dict, b"Resources")
            .and_then(|o| o.as_dict().ok().cloned());
        let merged = self.merge_resources(resources, form_resources.as_ref());

        let group = {
            let mut warnings = std::mem::take(&mut self.warnings);
            let g = self
                .doc
                .dict_get(form_dict, b"Group")
                .and_then(|o| o.as_dict().ok().cloned())
                .and_then(|d| {
                    parse_transparency_group(self.doc, &d, self.page_index, &mut warnings)
                });
            self.warnings = warnings;
            g
        };

        let bytes = {
            let mut warnings = std::mem::take(&mut self.warnings);
            let b = if id.0 != u32::MAX {
                self.doc
                    .stream_bytes(id, self.page_index, &mut warnings)
                    .as_ref()
                    .clone()
            } else {
                self.doc
                    .decode_stream_direct(stream, self.page_index, &mut warnings)
            };
            self.warnings = warnings;
            b
        };

        self.stack.save();
        canvas.save();
        let layered = {
            let state = self.stack.current_mut();
            state.ctm = state.ctm.pre_concat(matrix);
            let needs_layer = group
                .as_ref()
                .map(|g| g.isolated || g.knockout)
                .unwrap_or(false);
            if let Some(group) = group {
                state.transparency_group = Some(Rc::new(group));
            }
            if needs_layer {
                if self
                    .cancel
                    .as_ref()
                    .map(CancellationToken::is_cancelled)
                    == Some(true)
                {
                    canvas.restore();
                    self.stack.restore();
                    return Err(PdfError::Cancelled);
                }
                let bounds = bbox.map(|b| b.transform(self.stack.current().ctm));
                let state = self.stack.current_mut();
                let alpha = state.fill_alpha;
                let blend = state.blend_mode;
                // contents composite as a unit with the outer alpha
                state.fill_alpha = 1.0;
                state.stroke_alpha = 1.0;
                let mask = self.current_mask_layer(canvas);
                canvas.save_layer(bounds, alpha, blend, mask);
                true
            } else {
                false
            }
        };
        if let Some(bbox) = bbox {
            let device = bbox.transform(self.stack.current().ctm);
            canvas.clip_rect(device);
        }
        let result = self.execute(&bytes, &merged, canvas);
        if layered {
            canvas.restore();
        }
        canvas.restore();
        self.stack.restore();
        result
    }

    fn inline_image(
        &mut self,
        lexer: &mut Lexer,
        canvas: &mut dyn Canvas,
    ) -> Result<(), PdfError> {
        let mut dict = Dictionary::new();
        loop {
            match lexer.read_next(false)? {
                Some(Object::Operator(op)) if op == "ID" => break,
                Some(Object::Name(key)) => {
                    let value = lexer
                        .read_next(false)?
                        .ok_or_else(|| PdfError::Dictionary("inline image: missing value".into()))?;
                    dict.set(key, value);
                }
                Some(_) => continue,
                None => {
                    return Err(PdfError::Dictionary("inline image: unterminated".into()));
                }
            }
        }
        let data = lexer.take_inline_image_data().to_vec();
        let stream = Stream::new(dict, data);
        let fill_color = self.stack.current().fill_paint.solid_or_black();
        let mut warnings = std::mem::take(&mut self.warnings);
        let decoded = decode_image(
            self.doc,
            &stream,
            None,
            fill_color,
            self.page_index,
            &mut warnings,
        );
        self.warnings = warnings;
        if let Some(decoded) = decoded {
            self.draw_decoded_image(&decoded.image, decoded.sampling, canvas);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // shadings and patterns

    fn paint_shading_op(&mut self, name: &[u8], resources: &Dictionary, canvas: &mut dyn Canvas) {
        let (raw, _) = match self.resource_entry(resources, b"Shading", name) {
            Some(pair) => pair,
            None => {
                self.warn(format!(
                    "missing shading /{}",
                    String::from_utf8_lossy(name)
                ));
                return;
            }
        };
        let mut warnings = std::mem::take(&mut self.warnings);
        let shading = parse_shading(self.doc, &raw, self.page_index, &mut warnings);
        self.warnings = warnings;
        let shading = match shading {
            Some(s) => s,
            None => return,
        };
        let bounds = match canvas.local_clip_bounds() {
            Some(b) if !b.is_empty() => b,
            _ => {
                // no clip bounds from the target: fall back to the page
                // crop box in device space
                let device_matrix = self.stack.current().device_matrix;
                match self.doc.page(self.page_index) {
                    Ok(p) => p.crop_box.transform(device_matrix),
                    Err(_) => Rect::from_xywh(0.0, 0.0, 612.0, 792.0),
                }
            }
        };
        let to_device = self.stack.current().ctm;
        if let Some(raster) = rasterize_shading(&shading, to_device, bounds) {
            let paint = CanvasPaint {
                style: PaintStyle::Fill,
                color: RgbColor::BLACK,
                alpha: self.stack.current().fill_alpha,
                blend: self.stack.current().blend_mode,
                shader: None,
            };
            let masked = self.begin_masked_draw(canvas);
            canvas.save();
            canvas.concat(Matrix::translate(bounds.x, bounds.y));
            canvas.draw_image(&raster, SamplingMode::Linear, &paint);
            canvas.restore();
            if masked {
                canvas.restore();
            }
        }
    }

    fn paint_with_pattern(
        &mut self,
        device_path: &PdfPath,
        rule: FillRule,
        pattern: Option<Rc<Pattern>>,
        tint_color: Option<RgbColor>,
        is_stroke: bool,
        canvas: &mut dyn Canvas,
    ) {
        let pattern = match pattern {
            Some(p) => p,
            None => {
                self.warn("pattern paint without a resolved pattern".to_string());
                return;
            }
        };
        match &*pattern {
            Pattern::Shading(sp) => {
                // pattern space is anchored at the default page space
                let to_device = Matrix::combine(sp.matrix, self.stack.current().device_matrix);
                let bounds = match device_path.bounds() {
                    Some(b) => b,
                    None => return,
                };
                if let Some(raster) = rasterize_shading(&sp.shading, to_device, bounds) {
                    let alpha = if is_stroke {
                        self.stack.current().stroke_alpha
                    } else {
                        self.stack.current().fill_alpha
                    };
                    let paint = CanvasPaint {
                        style: PaintStyle::Fill,
                        color: RgbColor::BLACK,
                        alpha,
                        blend: self.stack.current().blend_mode,
                        shader: None,
                    };
                    let masked = self.begin_masked_draw(canvas);
                    canvas.save();
                    canvas.clip_path(device_path, rule);
                    canvas.concat(Matrix::translate(bounds.x, bounds.y));
                    canvas.draw_image(&raster, SamplingMode::Linear, &paint);
                    canvas.restore();
                    if masked {
                        canvas.restore();
                    }
                }
            }
            Pattern::Tiling(tp) => {
                let tile = self.render_pattern_cell(tp, tint_color, canvas);
                let tile = match tile {
                    Some(t) => t,
                    None => return,
                };
                let alpha = if is_stroke {
                    self.stack.current().stroke_alpha
                } else {
                    self.stack.current().fill_alpha
                };
                let paint = CanvasPaint {
                    style: PaintStyle::Fill,
                    color: tint_color.unwrap_or(RgbColor::BLACK),
                    alpha,
                    blend: self.stack.current().blend_mode,
                    shader: Some(tile),
                };
                let masked = self.begin_masked_draw(canvas);
                canvas.draw_path(device_path, rule, &paint);
                if masked {
                    canvas.restore();
                }
            }
        }
    }

    /// Renders the pattern cell once into an offscreen raster sized to
    /// its transformed BBox, exposed as a repeating shader.
    fn render_pattern_cell(
        &mut self,
        tp: &crate::pattern::TilingPattern,
        tint_color: Option<RgbColor>,
        canvas: &mut dyn Canvas,
    ) -> Option<TileShader> {
        if self.sub_render_depth >= MAX_SUB_RENDER_DEPTH {
            return None;
        }
        let to_device = Matrix::combine(tp.matrix, self.stack.current().device_matrix);
        let cell_device = tp.bbox.transform(to_device);
        let width = (cell_device.width.ceil() as u32).clamp(1, MAX_LAYER_EXTENT);
        let height = (cell_device.height.ceil() as u32).clamp(1, MAX_LAYER_EXTENT);
        let mut layer = canvas.make_layer(width, height);

        // map the cell bbox onto the layer raster, y flipped
        let sx = width as f32 / tp.bbox.width;
        let sy = height as f32 / tp.bbox.height;
        let cell_ctm = Matrix::combine(
            Matrix::translate(-tp.bbox.x, -tp.bbox.y),
            Matrix::from_array([sx, 0.0, 0.0, -sy, 0.0, height as f32]),
        );
        let mut initial = GraphicsState {
            ctm: cell_ctm,
            device_matrix: cell_ctm,
            ..GraphicsState::default()
        };
        if tp.is_uncolored() {
            let tint = tint_color.unwrap_or(RgbColor::BLACK);
            initial.fill_paint = Rc::new(Paint::Solid(tint));
            initial.stroke_paint = Rc::new(Paint::Solid(tint));
        }

        let bytes = {
            let mut warnings = std::mem::take(&mut self.warnings);
            let b = self
                .doc
                .stream_bytes(tp.content, self.page_index, &mut warnings)
                .as_ref()
                .clone();
            self.warnings = warnings;
            b
        };
        let mut sub = Interpreter::new(self.doc, self.page_index, initial, self.cancel.clone());
        sub.sub_render_depth = self.sub_render_depth + 1;
        sub.active_xobjects = self.active_xobjects.clone();
        let resources = tp.resources.clone().unwrap_or_default();
        let layer_canvas: &mut dyn Canvas = layer.as_mut();
        let _ = sub.execute(&bytes, &resources, layer_canvas);
        self.warnings.extend(sub.warnings);

        let tile = layer.snapshot_rgba();
        let (step_dx, _) = to_device.transform_vector(tp.x_step, 0.0);
        let (_, step_dy) = to_device.transform_vector(0.0, tp.y_step);
        Some(TileShader {
            tile,
            transform: Matrix::translate(cell_device.x, cell_device.y),
            step_x: step_dx.abs().max(1.0),
            step_y: step_dy.abs().max(1.0),
        })
    }

    // ------------------------------------------------------------------
    // soft masks

    /// Opens a destination-in masked layer when the graphics state has a
    /// soft mask. Returns whether a layer was opened (the caller closes
    /// it after the draw).
    fn begin_masked_draw(&mut self, canvas: &mut dyn Canvas) -> bool {
        let mask = match self.stack.current().soft_mask.clone() {
            Some(m) => m,
            None => return false,
        };
        let layer = self.materialize_soft_mask(&mask, canvas);
        canvas.save_layer(
            Some(mask.transformed_bbox),
            1.0,
            BlendMode::default(),
            layer,
        );
        true
    }

    fn current_mask_layer(&mut self, canvas: &mut dyn Canvas) -> Option<MaskLayer> {
        let mask = self.stack.current().soft_mask.clone()?;
        self.materialize_soft_mask(&mask, canvas)
    }

    /// Renders the mask form once per descriptor and converts it to a
    /// coverage image per its subtype and transfer function.
    fn materialize_soft_mask(
        &mut self,
        mask: &Rc<SoftMask>,
        canvas: &mut dyn Canvas,
    ) -> Option<MaskLayer> {
        let key = Rc::as_ptr(mask) as usize;
        if let Some(cached) = self.mask_cache.get(&key) {
            return cached.clone();
        }
        let built = self.build_mask_layer(mask, canvas);
        self.mask_cache.insert(key, built.clone());
        built
    }

    fn build_mask_layer(
        &mut self,
        mask: &SoftMask,
        canvas: &mut dyn Canvas,
    ) -> Option<MaskLayer> {
        if self.sub_render_depth >= MAX_SUB_RENDER_DEPTH {
            return None;
        }
        if self.cancel.as_ref().map(CancellationToken::is_cancelled) == Some(true) {
            return None;
        }
        let bounds = mask.transformed_bbox;
        let width = (bounds.width.ceil() as u32).clamp(1, MAX_LAYER_EXTENT);
        let height = (bounds.height.ceil() as u32).clamp(1, MAX_LAYER_EXTENT);
        let mut layer = canvas.make_layer(width, height);

        // mask space: form content against the install-time CTM, shifted
        // into the layer with y flipped to raster rows
        let sx = width as f32 / bounds.width.max(1e-6);
        let sy = height as f32 / bounds.height.max(1e-6);
        let to_layer = Matrix::combine(
            Matrix::translate(-bounds.x, -bounds.y),
            Matrix::from_array([sx, 0.0, 0.0, -sy, 0.0, height as f32]),
        );
        let mask_ctm = Matrix::combine(Matrix::combine(mask.matrix, mask.ctm), to_layer);

        // alpha masks read transparency, so they paint white on clear;
        // luminosity masks read painted luminance from a black base
        let paint_color = match mask.subtype {
            SoftMaskSubtype::Alpha => RgbColor::WHITE,
            SoftMaskSubtype::Luminosity => RgbColor::BLACK,
        };
        let mut initial = GraphicsState {
            ctm: mask_ctm,
            device_matrix: mask_ctm,
            ..GraphicsState::default()
        };
        initial.fill_paint = Rc::new(Paint::Solid(paint_color));
        initial.stroke_paint = Rc::new(Paint::Solid(paint_color));

        if mask.subtype == SoftMaskSubtype::Luminosity {
            if let Some(backdrop) = &mask.backdrop {
                // pre-fill with the backdrop in the group color space;
                // approximate with a gray of the first component
                let level = backdrop.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let mut backdrop_path = PdfPath::new();
                backdrop_path.rect(Rect::from_xywh(0.0, 0.0, width as f32, height as f32));
                layer.draw_path(
                    &backdrop_path,
                    FillRule::NonZero,
                    &CanvasPaint::fill(RgbColor::new(level, level, level), 1.0),
                );
            }
        }

        let bytes = {
            let mut warnings = std::mem::take(&mut self.warnings);
            let b = self
                .doc
                .stream_bytes(mask.form, self.page_index, &mut warnings)
                .as_ref()
                .clone();
            self.warnings = warnings;
            b
        };
        let mut sub = Interpreter::new(self.doc, self.page_index, initial, self.cancel.clone());
        sub.sub_render_depth = self.sub_render_depth + 1;
        let resources = mask.resources.clone().unwrap_or_default();
        let layer_canvas: &mut dyn Canvas = layer.as_mut();
        let _ = sub.execute(&bytes, &resources, layer_canvas);
        self.warnings.extend(sub.warnings);

        let snapshot = layer.snapshot_rgba();
        let coverage = derive_coverage(&snapshot, mask.subtype, mask.transfer.as_ref());
        Some(MaskLayer { coverage, bounds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, RecordingCanvas};
    use crate::document::{PdfDocument, PdfParseOptions};
    use pretty_assertions::assert_eq;

    /// Single-page document with the given content stream and extra
    /// page-level resource entries spliced in as raw PDF text.
    fn doc_with_content(content: &[u8], resources: &str) -> PdfDocument {
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; 6];
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
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>".to_vec(),
        );
        add(
            &mut pdf,
            &mut offsets,
            3,
            format!(
                "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << {resources} >> >>"
            )
            .into_bytes(),
        );
        let mut stream_obj = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream_obj.extend_from_slice(content);
        stream_obj.extend_from_slice(b"\nendstream");
        add(&mut pdf, &mut offsets, 4, stream_obj);
        add(&mut pdf, &mut offsets, 5, b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
        for off in &offsets[1..] {
            pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        let (doc, warnings) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        doc
    }

    fn run(doc: &PdfDocument) -> (Interpreter<'_>, RecordingCanvas) {
        let mut canvas = RecordingCanvas::new();
        let mut warnings = Vec::new();
        let content = doc.page_content(0, &mut warnings).unwrap();
        let page = doc.page(0).unwrap();
        let mut interp = Interpreter::new(doc, 0, GraphicsState::default(), None);
        interp
            .execute(&content, &page.resources.clone(), &mut canvas)
            .unwrap();
        (interp, canvas)
    }

    #[test]
    fn fill_rect_under_translation() {
        // q 0.5 w 1 0 0 1 10 20 cm 0 0 100 100 re f Q
        let doc = doc_with_content(b"q 0.5 w 1 0 0 1 10 20 cm 0 0 100 100 re f Q", "");
        let (interp, canvas) = run(&doc);

        // exactly one filled rectangle at device (10,20)-(110,120)
        let fills: Vec<_> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Path { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(fills.len(), 1);
        assert_eq!(
            fills[0].bounds(),
            Some(Rect::from_lbrt(10.0, 20.0, 110.0, 120.0))
        );
        // one push, one pop; the final state equals the initial state
        assert_eq!(interp.stack.balance(), (1, 1));
        assert_eq!(interp.stack.current().line_width, 1.0);
        assert_eq!(interp.stack.current().ctm, Matrix::IDENTITY);
    }

    #[test]
    fn painting_clears_the_path() {
        let doc = doc_with_content(b"0 0 10 10 re f 20 20 5 5 re f", "");
        let (_, canvas) = run(&doc);
        let fills: Vec<_> = canvas.drawing_calls().collect();
        assert_eq!(fills.len(), 2);
        match fills[0] {
            DrawCall::Path { path, .. } => {
                assert_eq!(path.bounds(), Some(Rect::from_lbrt(0.0, 0.0, 10.0, 10.0)));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn clip_then_noop_paint_installs_clip() {
        let doc = doc_with_content(b"0 0 50 50 re W n 0 0 100 100 re f", "");
        let (_, canvas) = run(&doc);
        let clips: Vec<_> = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::ClipPath { .. }))
            .collect();
        assert_eq!(clips.len(), 1);
        assert_eq!(
            canvas.local_clip_bounds(),
            Some(Rect::from_xywh(0.0, 0.0, 50.0, 50.0))
        );
    }

    #[test]
    fn color_operators_set_paints() {
        let doc = doc_with_content(b"0 0 1 rg 0 0 10 10 re f", "");
        let (_, canvas) = run(&doc);
        let mut calls = canvas.drawing_calls();
        match calls.next().unwrap() {
            DrawCall::Path { paint, .. } => {
                assert_eq!(paint.color, RgbColor::new(0.0, 0.0, 1.0));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn extra_restores_are_ignored() {
        let doc = doc_with_content(b"Q Q q 2 w Q Q", "");
        let (interp, _) = run(&doc);
        assert_eq!(interp.stack.depth(), 1);
        assert_eq!(interp.stack.current().line_width, 1.0);
    }

    #[test]
    fn text_object_shows_glyphs_and_advances() {
        let doc = doc_with_content(
            b"BT /F1 12 Tf 100 700 Td (AB) Tj ET",
            "/Font << /F1 5 0 R >>",
        );
        let (interp, canvas) = run(&doc);
        let glyph_calls: Vec<_> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Glyphs { glyph_ids, .. } => Some(glyph_ids.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(glyph_calls.len(), 1);
        assert_eq!(glyph_calls[0].len(), 2);
        // extraction captured both characters with advancing x
        assert_eq!(interp.text.len(), 2);
        assert_eq!(interp.text[0].text, "A");
        assert_eq!(interp.text[1].text, "B");
        assert_eq!(interp.text[0].x, 100.0);
        assert!(interp.text[1].x > interp.text[0].x);
        // ET zeroed the text matrices
        assert_eq!(interp.stack.current().text_matrix, Matrix::IDENTITY);
    }

    #[test]
    fn tj_adjustments_shift_by_thousandths() {
        let doc = doc_with_content(
            b"BT /F1 10 Tf [ (A) -500 (B) ] TJ ET",
            "/Font << /F1 5 0 R >>",
        );
        let (interp, _) = run(&doc);
        assert_eq!(interp.text.len(), 2);
        // Helvetica A is 667/1000; adjustment adds 500/1000 * 10 = 5
        let gap = interp.text[1].x - interp.text[0].x;
        let expected = 6.67 + 5.0;
        assert!((gap - expected).abs() < 0.01, "gap {gap}");
    }

    #[test]
    fn unknown_operators_warn_and_continue() {
        let doc = doc_with_content(b"1 2 frobnicate 0 0 10 10 re f", "");
        let (interp, canvas) = run(&doc);
        assert_eq!(canvas.drawing_calls().count(), 1);
        assert!(interp
            .warnings
            .iter()
            .any(|w| w.msg.contains("frobnicate")));
    }

    #[test]
    fn missing_resource_skips_draw() {
        let doc = doc_with_content(b"/NoSuchImage Do 0 0 10 10 re f", "");
        let (interp, canvas) = run(&doc);
        assert_eq!(canvas.drawing_calls().count(), 1);
        assert!(interp.warnings.iter().any(|w| w.msg.contains("NoSuchImage")));
    }

    #[test]
    fn cancellation_stops_between_operators() {
        let doc = doc_with_content(b"0 0 10 10 re f", "");
        let token = CancellationToken::new();
        token.cancel();
        let mut canvas = RecordingCanvas::new();
        let mut warnings = Vec::new();
        let content = doc.page_content(0, &mut warnings).unwrap();
        let page = doc.page(0).unwrap();
        let mut interp = Interpreter::new(&doc, 0, GraphicsState::default(), Some(token));
        let result = interp.execute(&content, &page.resources.clone(), &mut canvas);
        assert_eq!(result, Err(PdfError::Cancelled));
        assert_eq!(canvas.drawing_calls().count(), 0);
    }

    #[test]
    fn inline_image_draws() {
        // 2x2 gray 8-bit inline image
        let doc = doc_with_content(
            b"q 10 0 0 10 0 0 cm BI /W 2 /H 2 /CS /G /BPC 8 ID \x00\x40\x80\xFF EI Q",
            "",
        );
        let (_, canvas) = run(&doc);
        let images: Vec<_> = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Image { .. }))
            .collect();
        assert_eq!(images.len(), 1);
        match images[0] {
            DrawCall::Image { width, height, .. } => {
                assert_eq!((*width, *height), (2, 2));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn malformed_syntax_recovers_at_next_operator() {
        let doc = doc_with_content(b"(unterminated 0 0 10 10 re f", "");
        let (interp, _) = run(&doc);
        assert!(!interp.warnings.is_empty());
    }

    #[test]
    fn tm_sets_both_matrices_and_tstar_uses_leading() {
        // Tm puts the line start at (10, 100); T* drops one leading
        let doc = doc_with_content(
            b"BT /F1 10 Tf 14 TL 1 0 0 1 10 100 Tm (A) Tj T* (B) Tj ET",
            "/Font << /F1 5 0 R >>",
        );
        let (interp, _) = run(&doc);
        assert_eq!(interp.text.len(), 2);
        assert_eq!((interp.text[0].x, interp.text[0].y), (10.0, 100.0));
        // the second line starts at the line matrix, not after A's advance
        assert_eq!((interp.text[1].x, interp.text[1].y), (10.0, 86.0));
    }

    #[test]
    fn form_xobject_reentry_is_visited_once() {
        // object 6 is a form whose content invokes itself
        let mut pdf: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; 7];
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
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 100 100] >>".to_vec(),
        );
        add(
            &mut pdf,
            &mut offsets,
            3,
            b"<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
               /Resources << /XObject << /X 6 0 R >> >> >>"
                .to_vec(),
        );
        add(
            &mut pdf,
            &mut offsets,
            4,
            b"<< /Length 5 >>\nstream\n/X Do\nendstream".to_vec(),
        );
        add(&mut pdf, &mut offsets, 5, b"<< >>".to_vec());
        add(
            &mut pdf,
            &mut offsets,
            6,
            b"<< /Subtype /Form /BBox [0 0 100 100] /Length 18 >>\nstream\n0 0 5 5 re f /X Do\nendstream"
                .to_vec(),
        );
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 7\n0000000000 65535 f \n");
        for off in &offsets[1..] {
            pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(b"trailer\n<< /Size 7 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());

        let (doc, warnings) = PdfDocument::parse(&pdf, &PdfParseOptions::default()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        let (_, canvas) = run(&doc);
        // the rectangle inside the form painted exactly once
        assert_eq!(canvas.drawing_calls().count(), 1);
    }
}
