//! shading.rs
//!
//! Shading dictionaries (types 1–7) and their rasterization. Axial and
//! radial shadings evaluate exactly per pixel; the mesh types
//! triangulate and interpolate vertex colors. Output is an RGBA raster
//! covering the requested device bounds, drawn by the caller.

use std::rc::Rc;

use crate::canvas::RasterImage;
use crate::color::{ColorSpace, RgbColor};
use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::function::{parse_function, Function};
use crate::graphics::Rect;
use crate::matrix::Matrix;
use crate::object::{Object, Stream};

/// largest raster edge a shading materializes at
const MAX_SHADING_EXTENT: u32 = 2048;

#[derive(Debug, Clone)]
pub struct Shading {
    pub colorspace: Rc<ColorSpace>,
    pub background: Option<RgbColor>,
    pub bbox: Option<Rect>,
    pub kind: ShadingKind,
}

#[derive(Debug, Clone)]
pub enum ShadingKind {
    /// type 1: color = f(x, y) over a domain rectangle
    FunctionBased {
        domain: [f32; 4],
        matrix: Matrix,
        function: Rc<Function>,
    },
    /// type 2
    Axial {
        coords: [f32; 4],
        domain: [f32; 2],
        extend: [bool; 2],
        function: Rc<Function>,
    },
    /// type 3
    Radial {
        coords: [f32; 6],
        domain: [f32; 2],
        extend: [bool; 2],
        function: Rc<Function>,
    },
    /// types 4–7, reduced to colored triangles in shading space
    Mesh { triangles: Vec<Triangle> },
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub points: [(f32, f32); 3],
    pub colors: [RgbColor; 3],
}

/// Evaluates the shading's color function into sRGB.
fn function_color(cs: &ColorSpace, function: &Function, t: f32) -> RgbColor {
    let comps = function.eval(&[t]);
    cs.to_rgb(&comps)
}

// ----------------------------------------------------------------------
// parsing

pub fn parse_shading(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Shading> {
    let resolved = doc.resolve(obj);
    let dict = resolved.as_dict().ok()?;
    let shading_type = doc.dict_get(dict, b"ShadingType")?.as_i64().ok()?;
    let colorspace = Rc::new(match dict.get(b"ColorSpace") {
        Ok(cs) => crate::color::parse_color_space(doc, cs, page, warnings),
        Err(_) => ColorSpace::DeviceRgb,
    });
    let background = doc.dict_get(dict, b"Background").and_then(|o| {
        let arr = o.as_array().ok()?;
        let comps: Vec<f32> = arr
            .iter()
            .filter_map(|v| doc.resolve(v).as_f32().ok())
            .collect();
        Some(colorspace.to_rgb(&comps))
    });
    let bbox = dict.get(b"BBox").ok().and_then(|o| doc.rect_from_object(o));

    let numbers = |key: &[u8]| -> Option<Vec<f32>> {
        let arr = doc.dict_get(dict, key)?;
        let arr = arr.as_array().ok()?;
        Some(
            arr.iter()
                .map(|o| doc.resolve(o).as_f32().unwrap_or(0.0))
                .collect(),
        )
    };
    let function = |warnings: &mut Vec<PdfWarnMsg>| -> Option<Rc<Function>> {
        let obj = dict.get(b"Function").ok()?;
        let resolved = doc.resolve(obj);
        // an array of 1-out functions acts as one n-out function; take
        // the first component function per channel via a combined eval
        match &*resolved {
            Object::Array(parts) => {
                let fns: Vec<Rc<Function>> = parts
                    .iter()
                    .map(|p| parse_function(doc, p, page, warnings))
                    .collect();
                Some(Rc::new(Function::combined(fns)))
            }
            _ => Some(parse_function(doc, obj, page, warnings)),
        }
    };

    let kind = match shading_type {
        1 => {
            let domain = numbers(b"Domain")
                .filter(|d| d.len() >= 4)
                .map(|d| [d[0], d[1], d[2], d[3]])
                .unwrap_or([0.0, 1.0, 0.0, 1.0]);
            let matrix = numbers(b"Matrix")
                .filter(|m| m.len() >= 6)
                .map(|m| Matrix::from_array([m[0], m[1], m[2], m[3], m[4], m[5]]))
                .unwrap_or(Matrix::IDENTITY);
            ShadingKind::FunctionBased {
                domain,
                matrix,
                function: function(warnings)?,
            }
        }
        2 => {
            let c = numbers(b"Coords").filter(|c| c.len() >= 4)?;
            ShadingKind::Axial {
                coords: [c[0], c[1], c[2], c[3]],
                domain: domain2(numbers(b"Domain")),
                extend: extend2(doc, dict),
                function: function(warnings)?,
            }
        }
        3 => {
            let c = numbers(b"Coords").filter(|c| c.len() >= 6)?;
            ShadingKind::Radial {
                coords: [c[0], c[1], c[2], c[3], c[4], c[5]],
                domain: domain2(numbers(b"Domain")),
                extend: extend2(doc, dict),
                function: function(warnings)?,
            }
        }
        4 | 5 | 6 | 7 => {
            let stream = resolved.as_stream().ok()?;
            let bytes = match obj {
                Object::Reference(r) => doc.stream_bytes(*r, page, warnings).as_ref().clone(),
                _ => doc.decode_stream_direct(stream, page, warnings),
            };
            let function = dict
                .get(b"Function")
                .ok()
                .map(|_| function(warnings))
                .flatten();
            let triangles = parse_mesh(
                doc,
                stream,
                &bytes,
                shading_type,
                &colorspace,
                function.as_deref(),
                warnings,
                page,
            )?;
            ShadingKind::Mesh { triangles }
        }
        other => {
            warnings.push(PdfWarnMsg::warning(
                page,
                0,
                format!("shading type {other} not supported"),
            ));
            return None;
        }
    };
    Some(Shading {
        colorspace,
        background,
        bbox,
        kind,
    })
}

fn domain2(d: Option<Vec<f32>>) -> [f32; 2] {
    d.filter(|d| d.len() >= 2)
        .map(|d| [d[0], d[1]])
        .unwrap_or([0.0, 1.0])
}

fn extend2(doc: &PdfDocument, dict: &crate::object::Dictionary) -> [bool; 2] {
    doc.dict_get(dict, b"Extend")
        .and_then(|o| {
            let arr = o.as_array().ok()?;
            Some([
                doc.resolve(arr.first()?).as_bool().ok()?,
                doc.resolve(arr.get(1)?).as_bool().ok()?,
            ])
        })
        .unwrap_or([false, false])
}

// ----------------------------------------------------------------------
// rasterization

/// Renders the shading into an RGBA raster covering `device_bounds`.
/// `to_device` maps shading space to device space. Pixels the shading
/// does not reach stay transparent (or take the background color).
pub fn rasterize_shading(shading: &Shading, to_device: Matrix, device_bounds: Rect) -> Option<RasterImage> {
    let width = (device_bounds.width.ceil() as u32).clamp(1, MAX_SHADING_EXTENT);
    let height = (device_bounds.height.ceil() as u32).clamp(1, MAX_SHADING_EXTENT);
    let inverse = to_device.invert()?;
    let mut img = RasterImage::new(width, height);
    let background = shading.background.map(|c| c.to_rgba8(1.0)).unwrap_or([0, 0, 0, 0]);

    // cache one color per quantized t for the function-driven kinds
    let mut lut: Vec<Option<[u8; 4]>> = vec![None; 257];
    let mut color_for_t = |cs: &ColorSpace, f: &Function, domain: [f32; 2], s: f32| -> [u8; 4] {
        let idx = (s.clamp(0.0, 1.0) * 256.0) as usize;
        if let Some(c) = lut[idx] {
            return c;
        }
        let t = domain[0] + s.clamp(0.0, 1.0) * (domain[1] - domain[0]);
        let c = function_color(cs, f, t).to_rgba8(1.0);
        lut[idx] = Some(c);
        c
    };

    for py in 0..height {
        for px in 0..width {
            // pixel center, device space
            let dx = device_bounds.x + px as f32 + 0.5;
            let dy = device_bounds.y + py as f32 + 0.5;
            let (x, y) = inverse.transform_point(dx, dy);
            if let Some(bbox) = &shading.bbox {
                if x < bbox.x || x > bbox.right() || y < bbox.y || y > bbox.top() {
                    continue;
                }
            }
            let rgba = match &shading.kind {
                ShadingKind::FunctionBased {
                    domain,
                    matrix,
                    function,
                } => {
                    let inv = match matrix.invert() {
                        Some(m) => m,
                        None => continue,
                    };
                    let (fx, fy) = inv.transform_point(x, y);
                    if fx < domain[0] || fx > domain[1] || fy < domain[2] || fy > domain[3] {
                        background
                    } else {
                        let comps = function.eval(&[fx, fy]);
                        shading.colorspace.to_rgb(&comps).to_rgba8(1.0)
                    }
                }
                ShadingKind::Axial {
                    coords,
                    domain,
                    extend,
                    function,
                } => {
                    let [x0, y0, x1, y1] = *coords;
                    let (ax, ay) = (x1 - x0, y1 - y0);
                    let denom = ax * ax + ay * ay;
                    if denom < 1e-12 {
                        continue;
                    }
                    let s = ((x - x0) * ax + (y - y0) * ay) / denom;
                    if (s < 0.0 && !extend[0]) || (s > 1.0 && !extend[1]) {
                        background
                    } else {
                        color_for_t(&shading.colorspace, function, *domain, s)
                    }
                }
                ShadingKind::Radial {
                    coords,
                    domain,
                    extend,
                    function,
                } => match radial_param(*coords, x, y, *extend) {
                    Some(s) => color_for_t(&shading.colorspace, function, *domain, s),
                    None => background,
                },
                ShadingKind::Mesh { .. } => continue, // painted below
            };
            if rgba[3] != 0 {
                let idx = ((py * width + px) * 4) as usize;
                img.data[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }

    if let ShadingKind::Mesh { triangles } = &shading.kind {
        for tri in triangles {
            fill_triangle(&mut img, device_bounds, to_device, tri);
        }
    }
    Some(img)
}

/// Finds the largest `s` whose circle contains (x, y), per the radial
/// shading definition.
fn radial_param(coords: [f32; 6], x: f32, y: f32, extend: [bool; 2]) -> Option<f32> {
    let [x0, y0, r0, x1, y1, r1] = coords;
    // circle center/radius at parameter s
    let cdx = x1 - x0;
    let cdy = y1 - y0;
    let dr = r1 - r0;
    // solve |p - c(s)| = r(s):  a s^2 + b s + c = 0
    let pdx = x - x0;
    let pdy = y - y0;
    let a = cdx * cdx + cdy * cdy - dr * dr;
    let b = -2.0 * (pdx * cdx + pdy * cdy + r0 * dr);
    let c = pdx * pdx + pdy * pdy - r0 * r0;
    let candidates: [Option<f32>; 2] = if a.abs() < 1e-9 {
        if b.abs() < 1e-9 {
            [None, None]
        } else {
            [Some(-c / b), None]
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let s1 = (-b + sq) / (2.0 * a);
        let s2 = (-b - sq) / (2.0 * a);
        [Some(s1.max(s2)), Some(s1.min(s2))]
    };
    for s in candidates.into_iter().flatten() {
        if r0 + s * dr < 0.0 {
            continue;
        }
        if s < 0.0 {
            if extend[0] {
                return Some(0.0);
            }
            continue;
        }
        if s > 1.0 {
            if extend[1] {
                return Some(1.0);
            }
            continue;
        }
        return Some(s);
    }
    None
}

fn fill_triangle(img: &mut RasterImage, bounds: Rect, to_device: Matrix, tri: &Triangle) {
    let pts: Vec<(f32, f32)> = tri
        .points
        .iter()
        .map(|&(x, y)| to_device.transform_point(x, y))
        .collect();
    let min_x = pts.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let max_x = pts.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = pts.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = pts.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let (x0, y0, x1, y1) = (
        ((min_x - bounds.x).floor().max(0.0)) as u32,
        ((min_y - bounds.y).floor().max(0.0)) as u32,
        ((max_x - bounds.x).ceil().min(img.width as f32)) as u32,
        ((max_y - bounds.y).ceil().min(img.height as f32)) as u32,
    );
    let (ax, ay) = pts[0];
    let (bx, by) = pts[1];
    let (cx, cy) = pts[2];
    let area = (bx - ax) * (cy - ay) - (cx - ax) * (by - ay);
    if area.abs() < 1e-9 {
        return;
    }
    for py in y0..y1 {
        for px in x0..x1 {
            let x = bounds.x + px as f32 + 0.5;
            let y = bounds.y + py as f32 + 0.5;
            let w0 = ((bx - x) * (cy - y) - (cx - x) * (by - y)) / area;
            let w1 = ((cx - x) * (ay - y) - (ax - x) * (cy - y)) / area;
            let w2 = 1.0 - w0 - w1;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let color = RgbColor::new(
                w0 * tri.colors[0].r + w1 * tri.colors[1].r + w2 * tri.colors[2].r,
                w0 * tri.colors[0].g + w1 * tri.colors[1].g + w2 * tri.colors[2].g,
                w0 * tri.colors[0].b + w1 * tri.colors[1].b + w2 * tri.colors[2].b,
            );
            let idx = ((py * img.width + px) * 4) as usize;
            img.data[idx..idx + 4].copy_from_slice(&color.to_rgba8(1.0));
        }
    }
}

// ----------------------------------------------------------------------
// mesh stream reading

struct MeshReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> MeshReader<'a> {
    fn read(&mut self, bits: u32) -> Option<u32> {
        let mut v: u32 = 0;
        for _ in 0..bits {
            let byte = self.data.get(self.bit_pos / 8)?;
            v = v << 1 | u32::from(byte >> (7 - self.bit_pos % 8) & 1);
            self.bit_pos += 1;
        }
        Some(v)
    }

}

struct MeshVertex {
    x: f32,
    y: f32,
    color: RgbColor,
}

#[allow(clippy::too_many_arguments)]
fn parse_mesh(
    doc: &PdfDocument,
    stream: &Stream,
    bytes: &[u8],
    shading_type: i64,
    colorspace: &ColorSpace,
    function: Option<&Function>,
    warnings: &mut Vec<PdfWarnMsg>,
    page: usize,
) -> Option<Vec<Triangle>> {
    let dict = &stream.dict;
    let int = |key: &[u8], default: i64| {
        doc.dict_get(dict, key)
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(default)
    };
    let bits_per_coord = int(b"BitsPerCoordinate", 16) as u32;
    let bits_per_comp = int(b"BitsPerComponent", 8) as u32;
    let bits_per_flag = int(b"BitsPerFlag", 8) as u32;
    let decode: Vec<f32> = doc
        .dict_get(dict, b"Decode")?
        .as_array()
        .ok()?
        .iter()
        .map(|o| doc.resolve(o).as_f32().unwrap_or(0.0))
        .collect();
    let n_comps = if function.is_some() {
        1
    } else {
        colorspace.components()
    };
    if decode.len() < 4 + n_comps * 2 {
        warnings.push(PdfWarnMsg::warning(page, 0, "mesh decode too short".into()));
        return None;
    }
    let coord_max = (((1u64 << bits_per_coord.min(32)) - 1) as f64).max(1.0) as f32;
    let comp_max = (((1u64 << bits_per_comp.min(32)) - 1) as f64).max(1.0) as f32;

    let mut reader = MeshReader { data: bytes, bit_pos: 0 };
    let mut read_vertex = |reader: &mut MeshReader| -> Option<MeshVertex> {
        let rx = reader.read(bits_per_coord)? as f32;
        let ry = reader.read(bits_per_coord)? as f32;
        let x = decode[0] + rx * (decode[1] - decode[0]) / coord_max;
        let y = decode[2] + ry * (decode[3] - decode[2]) / coord_max;
        let mut comps = Vec::with_capacity(n_comps);
        for c in 0..n_comps {
            let raw = reader.read(bits_per_comp)? as f32;
            let d0 = decode[4 + c * 2];
            let d1 = decode[5 + c * 2];
            comps.push(d0 + raw * (d1 - d0) / comp_max);
        }
        let color = match function {
            Some(f) => colorspace.to_rgb(&f.eval(&comps)),
            None => colorspace.to_rgb(&comps),
        };
        Some(MeshVertex { x, y, color })
    };

    let mut triangles = Vec::new();
    match shading_type {
        4 => {
            // free-form triangles with edge flags
            let mut previous: Vec<MeshVertex> = Vec::new();
            while let Some(flag) = reader.read(bits_per_flag) {
                let v = match read_vertex(&mut reader) {
                    Some(v) => v,
                    None => break,
                };
                match flag {
                    0 => {
                        previous.clear();
                        previous.push(v);
                        // flag 0 starts a fresh triangle: two more
                        // vertices with their flags follow
                        let mut complete = true;
                        for _ in 0..2 {
                            let more = reader
                                .read(bits_per_flag)
                                .and_then(|_| read_vertex(&mut reader));
                            match more {
                                Some(v2) => previous.push(v2),
                                None => {
                                    complete = false;
                                    break;
                                }
                            }
                        }
                        if !complete {
                            break;
                        }
                    }
                    1 => {
                        // share the previous two vertices
                        if previous.len() >= 3 {
                            previous.remove(0);
                        }
                        previous.push(v);
                    }
                    _ => {
                        // share first and last
                        if previous.len() >= 3 {
                            previous.remove(1);
                        }
                        previous.push(v);
                    }
                }
                if previous.len() == 3 {
                    triangles.push(Triangle {
                        points: [
                            (previous[0].x, previous[0].y),
                            (previous[1].x, previous[1].y),
                            (previous[2].x, previous[2].y),
                        ],
                        colors: [previous[0].color, previous[1].color, previous[2].color],
                    });
                }
            }
        }
        5 => {
            let per_row = int(b"VerticesPerRow", 2).max(2) as usize;
            let mut rows: Vec<Vec<MeshVertex>> = Vec::new();
            loop {
                let mut row = Vec::with_capacity(per_row);
                for _ in 0..per_row {
                    match read_vertex(&mut reader) {
                        Some(v) => row.push(v),
                        None => break,
                    }
                }
                if row.len() < per_row {
                    break;
                }
                rows.push(row);
            }
            for pair in rows.windows(2) {
                let (top, bottom) = (&pair[0], &pair[1]);
                for i in 0..per_row - 1 {
                    triangles.push(lattice_triangle(&top[i], &top[i + 1], &bottom[i]));
                    triangles.push(lattice_triangle(&top[i + 1], &bottom[i + 1], &bottom[i]));
                }
            }
        }
        _ => {
            // Coons (6) and tensor (7) patches: corner-bilinear
            // approximation subdivided into a fixed grid
            let points_per_patch = if shading_type == 7 { 16 } else { 12 };
            loop {
                let flag = match reader.read(bits_per_flag) {
                    Some(f) => f,
                    None => break,
                };
                let fresh = flag == 0;
                let point_count = if fresh { points_per_patch } else { points_per_patch - 4 };
                let color_count = if fresh { 4 } else { 2 };
                let mut pts = Vec::with_capacity(point_count);
                let mut truncated = false;
                for _ in 0..point_count {
                    let rx = match reader.read(bits_per_coord) {
                        Some(v) => v as f32,
                        None => {
                            truncated = true;
                            break;
                        }
                    };
                    let ry = match reader.read(bits_per_coord) {
                        Some(v) => v as f32,
                        None => {
                            truncated = true;
                            break;
                        }
                    };
                    pts.push((
                        decode[0] + rx * (decode[1] - decode[0]) / coord_max,
                        decode[2] + ry * (decode[3] - decode[2]) / coord_max,
                    ));
                }
                if truncated || pts.len() < point_count {
                    break;
                }
                let mut colors = Vec::with_capacity(4);
                for _ in 0..color_count {
                    let mut comps = Vec::with_capacity(n_comps);
                    for c in 0..n_comps {
                        match reader.read(bits_per_comp) {
                            Some(raw) => {
                                let d0 = decode[4 + c * 2];
                                let d1 = decode[5 + c * 2];
                                comps.push(d0 + raw as f32 * (d1 - d0) / comp_max);
                            }
                            None => {
                                truncated = true;
                                break;
                            }
                        }
                    }
                    if truncated {
                        break;
                    }
                    colors.push(match function {
                        Some(f) => colorspace.to_rgb(&f.eval(&comps)),
                        None => colorspace.to_rgb(&comps),
                    });
                }
                if truncated {
                    break;
                }
                // patches that reuse the previous edge (flag 1..3) are
                // skipped by this approximation; fresh patches render
                // from their four corner points and colors
                if fresh && pts.len() >= 10 && colors.len() == 4 {
                    let corners = [pts[0], pts[3], pts[6], pts[9]];
                    triangles.extend(subdivide_patch(&corners, &colors));
                }
            }
        }
    }
    Some(triangles)
}

fn lattice_triangle(a: &MeshVertex, b: &MeshVertex, c: &MeshVertex) -> Triangle {
    Triangle {
        points: [(a.x, a.y), (b.x, b.y), (c.x, c.y)],
        colors: [a.color, b.color, c.color],
    }
}

/// Bilinear corner interpolation over an 8×8 grid.
fn subdivide_patch(corners: &[(f32, f32); 4], colors: &[RgbColor]) -> Vec<Triangle> {
    const STEPS: usize = 8;
    let lerp = |a: (f32, f32), b: (f32, f32), t: f32| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
    let lerp_c = |a: RgbColor, b: RgbColor, t: f32| {
        RgbColor::new(
            a.r + (b.r - a.r) * t,
            a.g + (b.g - a.g) * t,
            a.b + (b.b - a.b) * t,
        )
    };
    let point_at = |u: f32, v: f32| {
        let top = lerp(corners[0], corners[1], u);
        let bottom = lerp(corners[3], corners[2], u);
        lerp(top, bottom, v)
    };
    let color_at = |u: f32, v: f32| {
        let top = lerp_c(colors[0], colors[1], u);
        let bottom = lerp_c(colors[3], colors[2], u);
        lerp_c(top, bottom, v)
    };
    let mut out = Vec::with_capacity(STEPS * STEPS * 2);
    for i in 0..STEPS {
        for j in 0..STEPS {
            let (u0, u1) = (i as f32 / STEPS as f32, (i + 1) as f32 / STEPS as f32);
            let (v0, v1) = (j as f32 / STEPS as f32, (j + 1) as f32 / STEPS as f32);
            let p00 = point_at(u0, v0);
            let p10 = point_at(u1, v0);
            let p01 = point_at(u0, v1);
            let p11 = point_at(u1, v1);
            out.push(Triangle {
                points: [p00, p10, p01],
                colors: [color_at(u0, v0), color_at(u1, v0), color_at(u0, v1)],
            });
            out.push(Triangle {
                points: [p10, p11, p01],
                colors: [color_at(u1, v0), color_at(u1, v1), color_at(u0, v1)],
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gray_ramp() -> Rc<Function> {
        Rc::new(Function::identity())
    }

    #[test]
    fn axial_shading_interpolates_along_axis() {
        let shading = Shading {
            colorspace: Rc::new(ColorSpace::DeviceGray),
            background: None,
            bbox: None,
            kind: ShadingKind::Axial {
                coords: [0.0, 0.0, 100.0, 0.0],
                domain: [0.0, 1.0],
                extend: [false, false],
                function: gray_ramp(),
            },
        };
        let img = rasterize_shading(
            &shading,
            Matrix::IDENTITY,
            Rect::from_xywh(0.0, 0.0, 100.0, 4.0),
        )
        .unwrap();
        let px = |x: u32| img.data[((x) * 4) as usize];
        // left end dark, right end light, midpoint in between
        assert!(px(1) < 16);
        assert!(px(99) > 240);
        let mid = px(50);
        assert!((110..=145).contains(&mid));
    }

    #[test]
    fn axial_without_extend_leaves_outside_transparent() {
        let shading = Shading {
            colorspace: Rc::new(ColorSpace::DeviceGray),
            background: None,
            bbox: None,
            kind: ShadingKind::Axial {
                coords: [40.0, 0.0, 60.0, 0.0],
                domain: [0.0, 1.0],
                extend: [false, false],
                function: gray_ramp(),
            },
        };
        let img = rasterize_shading(
            &shading,
            Matrix::IDENTITY,
            Rect::from_xywh(0.0, 0.0, 100.0, 1.0),
        )
        .unwrap();
        // alpha channel outside the axis span stays 0
        assert_eq!(img.data[10 * 4 + 3], 0);
        assert_eq!(img.data[50 * 4 + 3], 255);
    }

    #[test]
    fn radial_circle_param_basic() {
        // concentric circles at origin, r from 0 to 10
        let coords = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        let s = radial_param(coords, 5.0, 0.0, [false, false]).unwrap();
        assert!((s - 0.5).abs() < 1e-4);
        assert!(radial_param(coords, 20.0, 0.0, [false, false]).is_none());
        // extend keeps the boundary color outside
        assert_eq!(radial_param(coords, 20.0, 0.0, [false, true]), Some(1.0));
    }

    #[test]
    fn triangle_fill_interpolates_colors() {
        let mut img = RasterImage::new(10, 10);
        fill_triangle(
            &mut img,
            Rect::from_xywh(0.0, 0.0, 10.0, 10.0),
            Matrix::IDENTITY,
            &Triangle {
                points: [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)],
                colors: [RgbColor::BLACK, RgbColor::WHITE, RgbColor::BLACK],
            },
        );
        // near the black corner vs near the white corner
        let near_black = img.data[(1 * 10 + 1) * 4];
        let near_white = img.data[(0 * 10 + 8) * 4];
        assert!(near_black < 64);
        assert!(near_white > 170);
    }
}
