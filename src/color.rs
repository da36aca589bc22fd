//! color.rs
//!
//! Color spaces and their conversion to sRGB for the screen target.
//! Device spaces convert directly; calibrated spaces go through XYZ;
//! ICC profiles fall back to the alternate (or the device space of the
//! same component count); Separation/DeviceN run their tint transform
//! into the alternate space.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::function::{parse_function, Function};
use crate::object::{Dictionary, Object, ObjectId};

/// Components of one color value; four inline slots cover every device
/// space without allocation.
pub type Components = SmallVec<[f32; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: RgbColor = RgbColor {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        RgbColor { r, g, b }
    }

    pub fn to_rgba8(self, alpha: f32) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        [q(self.r), q(self.g), q(self.b), q(alpha)]
    }
}

#[derive(Debug, Clone)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray {
        gamma: f32,
    },
    CalRgb {
        gamma: [f32; 3],
    },
    Lab {
        white_point: [f32; 3],
        range: [f32; 4],
    },
    /// N-component profile rendered through the alternate space
    IccBased {
        n: usize,
        alternate: Box<ColorSpace>,
    },
    Indexed {
        base: Box<ColorSpace>,
        hival: u32,
        palette: Vec<u8>,
    },
    Separation {
        name: String,
        alternate: Box<ColorSpace>,
        tint: Rc<Function>,
    },
    DeviceN {
        n: usize,
        alternate: Box<ColorSpace>,
        tint: Rc<Function>,
    },
    /// Pattern space, optionally with an underlying space for the tint
    /// components of uncolored patterns
    Pattern {
        base: Option<Box<ColorSpace>>,
    },
}

impl ColorSpace {
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray { .. } => 1,
            ColorSpace::DeviceRgb | ColorSpace::CalRgb { .. } | ColorSpace::Lab { .. } => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased { n, .. } => *n,
            ColorSpace::Indexed { .. } => 1,
            ColorSpace::Separation { .. } => 1,
            ColorSpace::DeviceN { n, .. } => *n,
            ColorSpace::Pattern { base } => base.as_ref().map(|b| b.components()).unwrap_or(0),
        }
    }

    /// Initial color: black in every space.
    pub fn initial_components(&self) -> Components {
        match self {
            ColorSpace::DeviceCmyk => SmallVec::from_slice(&[0.0, 0.0, 0.0, 1.0]),
            ColorSpace::Lab { .. } => SmallVec::from_slice(&[0.0, 0.0, 0.0]),
            _ => {
                let mut c = Components::new();
                c.resize(self.components().max(1), 0.0);
                c
            }
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, ColorSpace::Pattern { .. })
    }

    /// Converts component values to sRGB.
    pub fn to_rgb(&self, comps: &[f32]) -> RgbColor {
        match self {
            ColorSpace::DeviceGray => {
                let g = comps.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
                RgbColor::new(g, g, g)
            }
            ColorSpace::CalGray { gamma } => {
                let g = comps
                    .first()
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0)
                    .powf(*gamma);
                RgbColor::new(g, g, g)
            }
            ColorSpace::DeviceRgb => RgbColor::new(
                comps.first().copied().unwrap_or(0.0).clamp(0.0, 1.0),
                comps.get(1).copied().unwrap_or(0.0).clamp(0.0, 1.0),
                comps.get(2).copied().unwrap_or(0.0).clamp(0.0, 1.0),
            ),
            ColorSpace::CalRgb { gamma } => RgbColor::new(
                comps.first().copied().unwrap_or(0.0).clamp(0.0, 1.0).powf(gamma[0]),
                comps.get(1).copied().unwrap_or(0.0).clamp(0.0, 1.0).powf(gamma[1]),
                comps.get(2).copied().unwrap_or(0.0).clamp(0.0, 1.0).powf(gamma[2]),
            ),
            ColorSpace::DeviceCmyk => {
                let c = comps.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let m = comps.get(1).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let y = comps.get(2).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let k = comps.get(3).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                RgbColor::new(
                    (1.0 - c) * (1.0 - k),
                    (1.0 - m) * (1.0 - k),
                    (1.0 - y) * (1.0 - k),
                )
            }
            ColorSpace::Lab { white_point, range } => {
                let l = comps.first().copied().unwrap_or(0.0).clamp(0.0, 100.0);
                let a = comps.get(1).copied().unwrap_or(0.0).clamp(range[0], range[1]);
                let b = comps.get(2).copied().unwrap_or(0.0).clamp(range[2], range[3]);
                lab_to_rgb(l, a, b, *white_point)
            }
            ColorSpace::IccBased { alternate, .. } => alternate.to_rgb(comps),
            ColorSpace::Indexed {
                base,
                hival,
                palette,
            } => {
                let n = base.components();
                let idx = (comps.first().copied().unwrap_or(0.0).round() as i64)
                    .clamp(0, i64::from(*hival)) as usize;
                let entry: Vec<f32> = (0..n)
                    .map(|c| {
                        palette
                            .get(idx * n + c)
                            .map(|&b| f32::from(b) / 255.0)
                            .unwrap_or(0.0)
                    })
                    .collect();
                // Lab palette entries are stored scaled to the component
                // ranges rather than bytes of [0,1]
                match base.as_ref() {
                    ColorSpace::Lab { range, .. } => {
                        let scaled = [
                            entry.first().copied().unwrap_or(0.0) * 100.0,
                            range[0] + entry.get(1).copied().unwrap_or(0.0) * (range[1] - range[0]),
                            range[2] + entry.get(2).copied().unwrap_or(0.0) * (range[3] - range[2]),
                        ];
                        base.to_rgb(&scaled)
                    }
                    _ => base.to_rgb(&entry),
                }
            }
            ColorSpace::Separation { alternate, tint, .. } => {
                let out = tint.eval(&[comps.first().copied().unwrap_or(0.0)]);
                alternate.to_rgb(&out)
            }
            ColorSpace::DeviceN { alternate, tint, .. } => {
                let out = tint.eval(comps);
                alternate.to_rgb(&out)
            }
            ColorSpace::Pattern { base } => match base {
                Some(b) => b.to_rgb(comps),
                None => RgbColor::BLACK,
            },
        }
    }

    /// Default image decode array: the nominal range of each component.
    pub fn default_decode(&self, bits_per_component: u32) -> Vec<f32> {
        match self {
            ColorSpace::Indexed { .. } => {
                let max = ((1u64 << bits_per_component.min(32)) - 1) as f32;
                vec![0.0, max]
            }
            ColorSpace::Lab { range, .. } => {
                vec![0.0, 100.0, range[0], range[1], range[2], range[3]]
            }
            _ => (0..self.components()).flat_map(|_| [0.0, 1.0]).collect(),
        }
    }
}

fn lab_to_rgb(l: f32, a: f32, b: f32, white_point: [f32; 3]) -> RgbColor {
    // CIE L*a*b* → XYZ
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let finv = |t: f32| {
        if t > 6.0 / 29.0 {
            t * t * t
        } else {
            3.0 * (6.0f32 / 29.0).powi(2) * (t - 4.0 / 29.0)
        }
    };
    let x = white_point[0] * finv(fx);
    let y = white_point[1] * finv(fy);
    let z = white_point[2] * finv(fz);
    // XYZ (D50-ish) → linear sRGB
    let rl = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let gl = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let bl = 0.0557 * x - 0.2040 * y + 1.0570 * z;
    let gamma = |v: f32| {
        let v = v.clamp(0.0, 1.0);
        if v <= 0.0031308 {
            12.92 * v
        } else {
            1.055 * v.powf(1.0 / 2.4) - 0.055
        }
    };
    RgbColor::new(gamma(rl), gamma(gl), gamma(bl))
}

// ----------------------------------------------------------------------
// parsing

/// Resolves a color-space object: a device/Pattern name, or one of the
/// array forms. Unknown constructions degrade to a device space of
/// matching arity with a warning.
pub fn parse_color_space(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> ColorSpace {
    // cache by defining object id where the space is indirect
    let id: Option<ObjectId> = obj.as_reference().ok();
    if let Some(id) = id {
        if let Some(cached) = doc.colorspace_cache.borrow().get(&id) {
            return (**cached).clone();
        }
    }
    let cs = parse_color_space_inner(doc, obj, page, warnings, 0);
    if let Some(id) = id {
        doc.colorspace_cache
            .borrow_mut()
            .insert(id, Rc::new(cs.clone()));
    }
    cs
}

fn parse_color_space_inner(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
    depth: usize,
) -> ColorSpace {
    if depth > 8 {
        return ColorSpace::DeviceGray;
    }
    let resolved = doc.resolve(obj);
    match &*resolved {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => ColorSpace::DeviceGray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorSpace::DeviceRgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::DeviceCmyk,
            b"Pattern" => ColorSpace::Pattern { base: None },
            b"Indexed" | b"I" => ColorSpace::DeviceGray,
            other => {
                warnings.push(PdfWarnMsg::warning(
                    page,
                    0,
                    format!("unknown color space /{}", String::from_utf8_lossy(other)),
                ));
                ColorSpace::DeviceGray
            }
        },
        Object::Array(arr) => parse_color_space_array(doc, arr, page, warnings, depth),
        _ => ColorSpace::DeviceGray,
    }
}

fn parse_color_space_array(
    doc: &PdfDocument,
    arr: &[Object],
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
    depth: usize,
) -> ColorSpace {
    let family = match arr.first().map(|o| doc.resolve(o)) {
        Some(o) => match o.as_name() {
            Ok(n) => n.to_vec(),
            Err(_) => return ColorSpace::DeviceGray,
        },
        None => return ColorSpace::DeviceGray,
    };
    match family.as_slice() {
        b"DeviceGray" | b"G" => ColorSpace::DeviceGray,
        b"DeviceRGB" | b"RGB" => ColorSpace::DeviceRgb,
        b"DeviceCMYK" | b"CMYK" => ColorSpace::DeviceCmyk,
        b"CalGray" => {
            let gamma = cal_dict(doc, arr.get(1))
                .and_then(|d| doc.dict_get(&d, b"Gamma").and_then(|o| o.as_f32().ok()))
                .unwrap_or(1.0);
            ColorSpace::CalGray { gamma }
        }
        b"CalRGB" => {
            let gamma = cal_dict(doc, arr.get(1))
                .and_then(|d| {
                    let arr = doc.dict_get(&d, b"Gamma")?;
                    let arr = arr.as_array().ok()?;
                    Some([
                        doc.resolve(arr.first()?).as_f32().ok()?,
                        doc.resolve(arr.get(1)?).as_f32().ok()?,
                        doc.resolve(arr.get(2)?).as_f32().ok()?,
                    ])
                })
                .unwrap_or([1.0, 1.0, 1.0]);
            ColorSpace::CalRgb { gamma }
        }
        b"Lab" => {
            let dict = cal_dict(doc, arr.get(1));
            let white_point = dict
                .as_ref()
                .and_then(|d| triple(doc, d, b"WhitePoint"))
                .unwrap_or([0.9505, 1.0, 1.089]);
            let range = dict
                .as_ref()
                .and_then(|d| {
                    let r = doc.dict_get(d, b"Range")?;
                    let r = r.as_array().ok()?;
                    Some([
                        doc.resolve(r.first()?).as_f32().ok()?,
                        doc.resolve(r.get(1)?).as_f32().ok()?,
                        doc.resolve(r.get(2)?).as_f32().ok()?,
                        doc.resolve(r.get(3)?).as_f32().ok()?,
                    ])
                })
                .unwrap_or([-100.0, 100.0, -100.0, 100.0]);
            ColorSpace::Lab { white_point, range }
        }
        b"ICCBased" => {
            let stream_obj = arr.get(1).map(|o| doc.resolve(o));
            let dict = stream_obj.as_ref().and_then(|o| o.as_dict().ok());
            let n = dict
                .and_then(|d| doc.dict_get(d, b"N").and_then(|o| o.as_i64().ok()))
                .unwrap_or(3) as usize;
            let alternate = dict
                .and_then(|d| d.get(b"Alternate").ok().cloned())
                .map(|alt| parse_color_space_inner(doc, &alt, page, warnings, depth + 1))
                .unwrap_or(match n {
                    1 => ColorSpace::DeviceGray,
                    4 => ColorSpace::DeviceCmyk,
                    _ => ColorSpace::DeviceRgb,
                });
            ColorSpace::IccBased {
                n,
                alternate: Box::new(alternate),
            }
        }
        b"Indexed" | b"I" => {
            let base = arr
                .get(1)
                .map(|o| parse_color_space_inner(doc, o, page, warnings, depth + 1))
                .unwrap_or(ColorSpace::DeviceRgb);
            let hival = arr
                .get(2)
                .and_then(|o| doc.resolve(o).as_i64().ok())
                .unwrap_or(0)
                .clamp(0, 255) as u32;
            let palette = match arr.get(3).map(|o| (o.clone(), doc.resolve(o))) {
                Some((orig, resolved)) => match &*resolved {
                    Object::String(s, _) => s.clone(),
                    Object::Stream(s) => match orig {
                        Object::Reference(r) => doc.stream_bytes(r, page, warnings).as_ref().clone(),
                        _ => doc.decode_stream_direct(s, page, warnings),
                    },
                    _ => Vec::new(),
                },
                None => Vec::new(),
            };
            ColorSpace::Indexed {
                base: Box::new(base),
                hival,
                palette,
            }
        }
        b"Separation" => {
            let name = arr
                .get(1)
                .and_then(|o| doc.resolve(o).as_name().ok().map(|n| {
                    String::from_utf8_lossy(n).into_owned()
                }))
                .unwrap_or_default();
            let alternate = arr
                .get(2)
                .map(|o| parse_color_space_inner(doc, o, page, warnings, depth + 1))
                .unwrap_or(ColorSpace::DeviceGray);
            let tint = arr
                .get(3)
                .map(|o| parse_function(doc, o, page, warnings))
                .unwrap_or_else(|| Rc::new(Function::identity()));
            ColorSpace::Separation {
                name,
                alternate: Box::new(alternate),
                tint,
            }
        }
        b"DeviceN" => {
            let n = arr
                .get(1)
                .and_then(|o| doc.resolve(o).as_array().ok().map(Vec::len))
                .unwrap_or(1);
            let alternate = arr
                .get(2)
                .map(|o| parse_color_space_inner(doc, o, page, warnings, depth + 1))
                .unwrap_or(ColorSpace::DeviceGray);
            let tint = arr
                .get(3)
                .map(|o| parse_function(doc, o, page, warnings))
                .unwrap_or_else(|| Rc::new(Function::identity()));
            ColorSpace::DeviceN {
                n,
                alternate: Box::new(alternate),
                tint,
            }
        }
        b"Pattern" => {
            let base = arr
                .get(1)
                .map(|o| parse_color_space_inner(doc, o, page, warnings, depth + 1))
                .map(Box::new);
            ColorSpace::Pattern { base }
        }
        other => {
            warnings.push(PdfWarnMsg::warning(
                page,
                0,
                format!(
                    "unsupported color space family /{}",
                    String::from_utf8_lossy(other)
                ),
            ));
            ColorSpace::DeviceGray
        }
    }
}

fn cal_dict(doc: &PdfDocument, obj: Option<&Object>) -> Option<Dictionary> {
    let resolved = doc.resolve(obj?);
    resolved.as_dict().ok().cloned()
}

fn triple(doc: &PdfDocument, dict: &Dictionary, key: &[u8]) -> Option<[f32; 3]> {
    let arr = doc.dict_get(dict, key)?;
    let arr = arr.as_array().ok()?;
    Some([
        doc.resolve(arr.first()?).as_f32().ok()?,
        doc.resolve(arr.get(1)?).as_f32().ok()?,
        doc.resolve(arr.get(2)?).as_f32().ok()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn device_spaces_convert() {
        assert_eq!(
            ColorSpace::DeviceGray.to_rgb(&[0.5]),
            RgbColor::new(0.5, 0.5, 0.5)
        );
        assert_eq!(
            ColorSpace::DeviceRgb.to_rgb(&[0.1, 0.2, 0.3]),
            RgbColor::new(0.1, 0.2, 0.3)
        );
        // pure K is black
        assert_eq!(
            ColorSpace::DeviceCmyk.to_rgb(&[0.0, 0.0, 0.0, 1.0]),
            RgbColor::BLACK
        );
    }

    #[test]
    fn initial_color_is_black_everywhere() {
        assert_eq!(ColorSpace::DeviceGray.initial_components().as_slice(), &[0.0]);
        assert_eq!(
            ColorSpace::DeviceCmyk.initial_components().as_slice(),
            &[0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(ColorSpace::DeviceCmyk.to_rgb(&[0.0, 0.0, 0.0, 1.0]), RgbColor::BLACK);
    }

    #[test]
    fn indexed_palette_lookup() {
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 1,
            palette: vec![255, 0, 0, 0, 0, 255],
        };
        assert_eq!(cs.to_rgb(&[0.0]), RgbColor::new(1.0, 0.0, 0.0));
        assert_eq!(cs.to_rgb(&[1.0]), RgbColor::new(0.0, 0.0, 1.0));
        // out-of-range indices clamp to hival
        assert_eq!(cs.to_rgb(&[9.0]), RgbColor::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn separation_runs_tint_transform() {
        // identity tint into DeviceGray: tint 1 = black ink = gray 1?
        // identity keeps the value; the alternate interprets it
        let cs = ColorSpace::Separation {
            name: "Spot".to_string(),
            alternate: Box::new(ColorSpace::DeviceGray),
            tint: Rc::new(Function::identity()),
        };
        assert_eq!(cs.to_rgb(&[0.25]), RgbColor::new(0.25, 0.25, 0.25));
    }

    #[test]
    fn lab_white_maps_to_white() {
        let cs = ColorSpace::Lab {
            white_point: [0.9505, 1.0, 1.089],
            range: [-100.0, 100.0, -100.0, 100.0],
        };
        let white = cs.to_rgb(&[100.0, 0.0, 0.0]);
        assert!(white.r > 0.98 && white.g > 0.98 && white.b > 0.98);
        let black = cs.to_rgb(&[0.0, 0.0, 0.0]);
        assert!(black.r < 0.02 && black.g < 0.02 && black.b < 0.02);
    }

    #[test]
    fn default_decode_for_indexed_spans_palette_indices() {
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 3,
            palette: vec![0; 12],
        };
        assert_eq!(cs.default_decode(4), vec![0.0, 15.0]);
        assert_eq!(ColorSpace::DeviceRgb.default_decode(8), vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }
}
