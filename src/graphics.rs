//! graphics.rs
//!
//! The graphics state the interpreter mutates: geometry types, line
//! parameters, blend modes, paints, soft-mask and transparency-group
//! descriptors, the state snapshot itself and the save/restore stack.
//! Extended graphics-state dictionaries are applied here.

use std::rc::Rc;

use serde_derive::{Deserialize, Serialize};

use crate::color::{ColorSpace, Components, RgbColor};
use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::font::PdfFont;
use crate::function::parse_function;
use crate::matrix::Matrix;
use crate::object::{Dictionary, Object, ObjectId};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

/// Axis-aligned rectangle, origin at the lower-left corner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// From `[llx lly urx ury]`, normalizing flipped corners.
    pub fn from_lbrt(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        let (x0, x1) = if llx <= urx { (llx, urx) } else { (urx, llx) };
        let (y0, y1) = if lly <= ury { (lly, ury) } else { (ury, lly) };
        Rect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.top().min(other.top());
        if x1 > x0 && y1 > y0 {
            Some(Rect::from_lbrt(x0, y0, x1, y1))
        } else {
            None
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_lbrt(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Bounds of the four transformed corners.
    pub fn transform(&self, m: Matrix) -> Rect {
        let corners = [
            m.transform_point(self.x, self.y),
            m.transform_point(self.right(), self.y),
            m.transform_point(self.x, self.top()),
            m.transform_point(self.right(), self.top()),
        ];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        Rect::from_lbrt(
            xs.clone().fold(f32::INFINITY, f32::min),
            ys.clone().fold(f32::INFINITY, f32::min),
            xs.fold(f32::NEG_INFINITY, f32::max),
            ys.fold(f32::NEG_INFINITY, f32::max),
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineCapStyle {
    #[default]
    Butt,
    Round,
    ProjectingSquare,
}

impl LineCapStyle {
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => LineCapStyle::Round,
            2 => LineCapStyle::ProjectingSquare,
            _ => LineCapStyle::Butt,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineJoinStyle {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoinStyle {
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => LineJoinStyle::Round,
            2 => LineJoinStyle::Bevel,
            _ => LineJoinStyle::Miter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDashPattern {
    pub dashes: Vec<f32>,
    pub phase: f32,
}

impl LineDashPattern {
    pub fn is_solid(&self) -> bool {
        self.dashes.is_empty() || self.dashes.iter().all(|d| *d <= 0.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextRenderingMode {
    #[default]
    Fill,
    Stroke,
    FillStroke,
    Invisible,
    FillClip,
    StrokeClip,
    FillStrokeClip,
    Clip,
}

impl TextRenderingMode {
    pub fn from_i64(v: i64) -> Self {
        use TextRenderingMode::*;
        match v {
            1 => Stroke,
            2 => FillStroke,
            3 => Invisible,
            4 => FillClip,
            5 => StrokeClip,
            6 => FillStrokeClip,
            7 => Clip,
            _ => Fill,
        }
    }

    pub fn fills(self) -> bool {
        use TextRenderingMode::*;
        matches!(self, Fill | FillStroke | FillClip | FillStrokeClip)
    }

    pub fn strokes(self) -> bool {
        use TextRenderingMode::*;
        matches!(self, Stroke | FillStroke | StrokeClip | FillStrokeClip)
    }

    pub fn clips(self) -> bool {
        use TextRenderingMode::*;
        matches!(self, FillClip | StrokeClip | FillStrokeClip | Clip)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderingIntent {
    AbsoluteColorimetric,
    #[default]
    RelativeColorimetric,
    Saturation,
    Perceptual,
}

impl RenderingIntent {
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"AbsoluteColorimetric" => RenderingIntent::AbsoluteColorimetric,
            b"Saturation" => RenderingIntent::Saturation,
            b"Perceptual" => RenderingIntent::Perceptual,
            _ => RenderingIntent::RelativeColorimetric,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeparableBlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonSeparableBlendMode {
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    Separable(SeparableBlendMode),
    NonSeparable(NonSeparableBlendMode),
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Separable(SeparableBlendMode::Normal)
    }
}

impl BlendMode {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        use self::{NonSeparableBlendMode::*, SeparableBlendMode::*};
        let mode = match name {
            b"Normal" | b"Compatible" => BlendMode::Separable(Normal),
            b"Multiply" => BlendMode::Separable(Multiply),
            b"Screen" => BlendMode::Separable(Screen),
            b"Overlay" => BlendMode::Separable(Overlay),
            b"Darken" => BlendMode::Separable(Darken),
            b"Lighten" => BlendMode::Separable(Lighten),
            b"ColorDodge" => BlendMode::Separable(ColorDodge),
            b"ColorBurn" => BlendMode::Separable(ColorBurn),
            b"HardLight" => BlendMode::Separable(HardLight),
            b"SoftLight" => BlendMode::Separable(SoftLight),
            b"Difference" => BlendMode::Separable(Difference),
            b"Exclusion" => BlendMode::Separable(Exclusion),
            b"Hue" => BlendMode::NonSeparable(Hue),
            b"Saturation" => BlendMode::NonSeparable(Saturation),
            b"Color" => BlendMode::NonSeparable(Color),
            b"Luminosity" => BlendMode::NonSeparable(Luminosity),
            _ => return None,
        };
        Some(mode)
    }

    pub fn get_id(&self) -> &'static str {
        use self::{BlendMode::*, NonSeparableBlendMode::*, SeparableBlendMode::*};
        match self {
            Separable(s) => match s {
                Normal => "Normal",
                Multiply => "Multiply",
                Screen => "Screen",
                Overlay => "Overlay",
                Darken => "Darken",
                Lighten => "Lighten",
                ColorDodge => "ColorDodge",
                ColorBurn => "ColorBurn",
                HardLight => "HardLight",
                SoftLight => "SoftLight",
                Difference => "Difference",
                Exclusion => "Exclusion",
            },
            NonSeparable(n) => match n {
                Hue => "Hue",
                Saturation => "Saturation",
                Color => "Color",
                Luminosity => "Luminosity",
            },
        }
    }
}

/// What a painting operator paints with: a resolved sRGB color, or a
/// pattern resolved from the resource dictionary in scope when the
/// color operator ran (with tint components for the uncolored variant).
/// Immutable; color operators replace the whole value.
#[derive(Debug, Clone)]
pub enum Paint {
    Solid(RgbColor),
    Pattern {
        name: String,
        pattern: Option<Rc<crate::pattern::Pattern>>,
        tint: Option<Components>,
        /// tint resolved through the pattern space's base converter
        tint_color: Option<RgbColor>,
    },
}

impl Paint {
    pub fn solid_or_black(&self) -> RgbColor {
        match self {
            Paint::Solid(c) => *c,
            Paint::Pattern { tint_color, .. } => tint_color.unwrap_or(RgbColor::BLACK),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SoftMaskSubtype {
    Alpha,
    Luminosity,
}

/// Descriptor for a soft mask installed from an ExtGState. The mask form
/// renders lazily, right before the first draw under its scope.
#[derive(Debug, Clone)]
pub struct SoftMask {
    pub subtype: SoftMaskSubtype,
    /// the form XObject acting as mask source
    pub form: ObjectId,
    /// backdrop color in the mask's blending color space
    pub backdrop: Option<Vec<f32>>,
    /// resolved 256-entry transfer table; identity when absent
    pub transfer: Option<[u8; 256]>,
    pub matrix: Matrix,
    pub bbox: Rect,
    pub transformed_bbox: Rect,
    /// CTM in effect when the mask was installed; the form replays
    /// against it
    pub ctm: Matrix,
    pub resources: Option<Dictionary>,
}

/// `/Group` descriptor of a transparency-group form.
#[derive(Debug, Clone, Default)]
pub struct TransparencyGroup {
    pub isolated: bool,
    pub knockout: bool,
    pub colorspace: Option<Rc<ColorSpace>>,
}

/// Snapshot of everything `q` saves and `Q` restores. Paints and soft
/// masks are shared by reference since they are immutable.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub device_matrix: Matrix,

    pub line_width: f32,
    pub line_cap: LineCapStyle,
    pub line_join: LineJoinStyle,
    pub miter_limit: f32,
    pub dash: LineDashPattern,
    pub flatness: f32,
    pub rendering_intent: RenderingIntent,

    pub stroke_paint: Rc<Paint>,
    pub fill_paint: Rc<Paint>,
    pub stroke_cs: Rc<ColorSpace>,
    pub fill_cs: Rc<ColorSpace>,

    pub stroke_alpha: f32,
    pub fill_alpha: f32,
    pub blend_mode: BlendMode,
    pub soft_mask: Option<Rc<SoftMask>>,
    pub knockout: bool,
    pub overprint_stroke: bool,
    pub overprint_fill: bool,
    pub overprint_mode: i64,

    pub font: Option<Rc<PdfFont>>,
    pub font_size: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    /// percent, 100 = no scaling
    pub horizontal_scaling: f32,
    pub leading: f32,
    pub rise: f32,
    pub text_render_mode: TextRenderingMode,

    pub text_matrix: Matrix,
    pub text_line_matrix: Matrix,
    pub in_text_object: bool,

    pub transparency_group: Option<Rc<TransparencyGroup>>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: Matrix::IDENTITY,
            device_matrix: Matrix::IDENTITY,
            line_width: 1.0,
            line_cap: LineCapStyle::default(),
            line_join: LineJoinStyle::default(),
            miter_limit: 10.0,
            dash: LineDashPattern::default(),
            flatness: 1.0,
            rendering_intent: RenderingIntent::default(),
            stroke_paint: Rc::new(Paint::Solid(RgbColor::BLACK)),
            fill_paint: Rc::new(Paint::Solid(RgbColor::BLACK)),
            stroke_cs: Rc::new(ColorSpace::DeviceGray),
            fill_cs: Rc::new(ColorSpace::DeviceGray),
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            blend_mode: BlendMode::default(),
            soft_mask: None,
            knockout: false,
            overprint_stroke: false,
            overprint_fill: false,
            overprint_mode: 0,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            rise: 0.0,
            text_render_mode: TextRenderingMode::default(),
            text_matrix: Matrix::IDENTITY,
            text_line_matrix: Matrix::IDENTITY,
            in_text_object: false,
            transparency_group: None,
        }
    }
}

/// The save/restore stack. Pops beyond the balance point are ignored,
/// matching the end-of-stream contract.
#[derive(Debug)]
pub struct GraphicsStack {
    stack: Vec<GraphicsState>,
    pushes: usize,
    pops: usize,
}

impl GraphicsStack {
    pub fn new(initial: GraphicsState) -> Self {
        GraphicsStack {
            stack: vec![initial],
            pushes: 0,
            pops: 0,
        }
    }

    pub fn current(&self) -> &GraphicsState {
        self.stack.last().expect("stack never empties")
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        self.stack.last_mut().expect("stack never empties")
    }

    pub fn save(&mut self) {
        let top = self.current().clone();
        self.stack.push(top);
        self.pushes += 1;
    }

    /// Returns whether a frame was actually popped.
    pub fn restore(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            self.pops += 1;
            true
        } else {
            false
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn balance(&self) -> (usize, usize) {
        (self.pushes, self.pops)
    }
}

// ----------------------------------------------------------------------
// ExtGState application

/// Applies the subset of an extended graphics-state dictionary this
/// renderer honors. Alpha constants clamp to [0, 1]; `/SMask /None`
/// removes the active soft mask; an array of blend-mode names takes the
/// first supported one.
pub fn apply_ext_gstate(
    state: &mut GraphicsState,
    doc: &PdfDocument,
    dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) {
    if let Some(v) = doc.dict_get(dict, b"LW").and_then(|o| o.as_f32().ok()) {
        state.line_width = v;
    }
    if let Some(v) = doc.dict_get(dict, b"LC").and_then(|o| o.as_i64().ok()) {
        state.line_cap = LineCapStyle::from_i64(v);
    }
    if let Some(v) = doc.dict_get(dict, b"LJ").and_then(|o| o.as_i64().ok()) {
        state.line_join = LineJoinStyle::from_i64(v);
    }
    if let Some(v) = doc.dict_get(dict, b"ML").and_then(|o| o.as_f32().ok()) {
        state.miter_limit = v;
    }
    if let Some(v) = doc.dict_get(dict, b"D") {
        if let Ok(arr) = v.as_array() {
            if arr.len() == 2 {
                let dashes = doc
                    .resolve(&arr[0])
                    .as_array()
                    .map(|a| a.iter().filter_map(|d| doc.resolve(d).as_f32().ok()).collect())
                    .unwrap_or_default();
                let phase = doc.resolve(&arr[1]).as_f32().unwrap_or(0.0);
                state.dash = LineDashPattern { dashes, phase };
            }
        }
    }
    if let Some(v) = doc.dict_get(dict, b"RI").and_then(|o| o.as_name().ok().map(<[u8]>::to_vec)) {
        state.rendering_intent = RenderingIntent::from_name(&v);
    }
    if let Some(v) = doc.dict_get(dict, b"CA").and_then(|o| o.as_f32().ok()) {
        state.stroke_alpha = v.clamp(0.0, 1.0);
    }
    if let Some(v) = doc.dict_get(dict, b"ca").and_then(|o| o.as_f32().ok()) {
        state.fill_alpha = v.clamp(0.0, 1.0);
    }
    if let Some(v) = doc.dict_get(dict, b"OP").and_then(|o| o.as_bool().ok()) {
        state.overprint_stroke = v;
    }
    if let Some(v) = doc.dict_get(dict, b"op").and_then(|o| o.as_bool().ok()) {
        state.overprint_fill = v;
    }
    if let Some(v) = doc.dict_get(dict, b"OPM").and_then(|o| o.as_i64().ok()) {
        state.overprint_mode = v;
    }
    if let Some(v) = doc.dict_get(dict, b"TK").and_then(|o| o.as_bool().ok()) {
        state.knockout = v;
    }
    if let Some(bm) = doc.dict_get(dict, b"BM") {
        match &*bm {
            Object::Name(n) => {
                if let Some(mode) = BlendMode::from_name(n) {
                    state.blend_mode = mode;
                }
            }
            // several names: the first supported one wins
            Object::Array(arr) => {
                for candidate in arr {
                    let candidate = doc.resolve(candidate);
                    if let Ok(n) = candidate.as_name() {
                        if let Some(mode) = BlendMode::from_name(n) {
                            state.blend_mode = mode;
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(matrix) = doc.dict_get(dict, b"Matrix") {
        if let Ok(arr) = matrix.as_array() {
            if arr.len() >= 6 {
                let mut m = [0f32; 6];
                let mut ok = true;
                for (slot, v) in m.iter_mut().zip(arr.iter()) {
                    match doc.resolve(v).as_f32() {
                        Ok(f) => *slot = f,
                        Err(_) => ok = false,
                    }
                }
                if ok {
                    state.ctm = state.ctm.pre_concat(Matrix::from_array(m));
                }
            }
        }
    }
    match doc.dict_get(dict, b"SMask") {
        Some(obj) => match &*obj {
            Object::Name(n) if n == b"None" => state.soft_mask = None,
            Object::Dictionary(mask_dict) => {
                match build_soft_mask(doc, mask_dict, state.ctm, page, warnings) {
                    Some(mask) => state.soft_mask = Some(Rc::new(mask)),
                    None => state.soft_mask = None,
                }
            }
            _ => {}
        },
        None => {}
    }
}

/// Builds the soft-mask descriptor from `/SMask`: subtype, mask form,
/// backdrop, transfer LUT, form geometry and resources.
fn build_soft_mask(
    doc: &PdfDocument,
    mask_dict: &Dictionary,
    ctm: Matrix,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<SoftMask> {
    let subtype = match doc
        .dict_get(mask_dict, b"S")
        .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec))
        .as_deref()
    {
        Some(b"Alpha") => SoftMaskSubtype::Alpha,
        _ => SoftMaskSubtype::Luminosity,
    };
    // the raw entry must stay a reference: the form is re-entered by id
    let form = match mask_dict.get(b"G") {
        Ok(Object::Reference(r)) => *r,
        _ => {
            warnings.push(PdfWarnMsg::warning(
                page,
                0,
                "soft mask without an indirect /G form".to_string(),
            ));
            return None;
        }
    };
    let form_obj = doc.get_object(form);
    let form_stream = form_obj.as_stream().ok()?;
    let form_dict = &form_stream.dict;

    let matrix = doc
        .dict_get(form_dict, b"Matrix")
        .and_then(|o| {
            let arr = o.as_array().ok()?;
            let mut m = [0f32; 6];
            for (slot, v) in m.iter_mut().zip(arr.iter()) {
                *slot = doc.resolve(v).as_f32().ok()?;
            }
            Some(Matrix::from_array(m))
        })
        .unwrap_or(Matrix::IDENTITY);
    let bbox = form_dict
        .get(b"BBox")
        .ok()
        .and_then(|o| doc.rect_from_object(o))
        .unwrap_or(Rect::from_xywh(0.0, 0.0, 1.0, 1.0));
    let transformed_bbox = bbox.transform(Matrix::combine(matrix, ctm));

    let backdrop = doc.dict_get(mask_dict, b"BC").and_then(|o| {
        o.as_array().ok().map(|arr| {
            arr.iter()
                .filter_map(|v| doc.resolve(v).as_f32().ok())
                .collect::<Vec<f32>>()
        })
    });
    let transfer = match mask_dict.get(b"TR") {
        Ok(Object::Name(n)) if n == b"Identity" => None,
        Ok(obj) => Some(parse_function(doc, obj, page, warnings).to_lut()),
        Err(_) => None,
    };
    let resources = doc
        .dict_get(form_dict, b"Resources")
        .and_then(|o| o.as_dict().ok().cloned());

    Some(SoftMask {
        subtype,
        form,
        backdrop,
        transfer,
        matrix,
        bbox,
        transformed_bbox,
        ctm,
        resources,
    })
}

/// Parses a `/Group` dictionary with subtype `/Transparency`.
pub fn parse_transparency_group(
    doc: &PdfDocument,
    dict: &Dictionary,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<TransparencyGroup> {
    let subtype = doc
        .dict_get(dict, b"S")
        .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec))?;
    if subtype != b"Transparency" {
        return None;
    }
    let flag = |key: &[u8]| {
        doc.dict_get(dict, key)
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false)
    };
    let colorspace = dict
        .get(b"CS")
        .ok()
        .map(|cs| Rc::new(crate::color::parse_color_space(doc, cs, page, warnings)));
    Some(TransparencyGroup {
        isolated: flag(b"I"),
        knockout: flag(b"K"),
        colorspace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rect_normalizes_and_intersects() {
        let r = Rect::from_lbrt(100.0, 200.0, 10.0, 20.0);
        assert_eq!(r, Rect::from_xywh(10.0, 20.0, 90.0, 180.0));
        let clipped = r.intersect(&Rect::from_xywh(0.0, 0.0, 50.0, 50.0)).unwrap();
        assert_eq!(clipped, Rect::from_xywh(10.0, 20.0, 40.0, 30.0));
        assert!(r.intersect(&Rect::from_xywh(500.0, 500.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn rect_transform_takes_corner_bounds() {
        let r = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        let rotated = r.transform(Matrix::from_array([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]));
        assert_eq!(rotated, Rect::from_xywh(-10.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn stack_ignores_unbalanced_restore() {
        let mut stack = GraphicsStack::new(GraphicsState::default());
        stack.save();
        stack.current_mut().line_width = 4.0;
        assert!(stack.restore());
        assert_eq!(stack.current().line_width, 1.0);
        // extra restore at the bottom is a no-op
        assert!(!stack.restore());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn stack_counts_pushes_and_pops() {
        let mut stack = GraphicsStack::new(GraphicsState::default());
        stack.save();
        stack.save();
        stack.restore();
        stack.restore();
        stack.restore();
        assert_eq!(stack.balance(), (2, 2));
    }

    #[test]
    fn blend_mode_names_roundtrip() {
        let mode = BlendMode::from_name(b"Multiply").unwrap();
        assert_eq!(mode.get_id(), "Multiply");
        assert_eq!(BlendMode::from_name(b"Compatible"), Some(BlendMode::default()));
        assert_eq!(BlendMode::from_name(b"NoSuchMode"), None);
    }

    #[test]
    fn text_render_modes_classify() {
        assert!(TextRenderingMode::FillStroke.fills());
        assert!(TextRenderingMode::FillStroke.strokes());
        assert!(!TextRenderingMode::FillStroke.clips());
        assert!(TextRenderingMode::Clip.clips());
        assert!(!TextRenderingMode::Invisible.fills());
    }
}
