//! function.rs
//!
//! PDF functions: sampled (type 0), exponential (type 2), stitching
//! (type 3) and the PostScript calculator (type 4). Shadings, tint
//! transforms and soft-mask transfer functions all evaluate through
//! here.

use std::rc::Rc;

use crate::document::PdfDocument;
use crate::errors::PdfWarnMsg;
use crate::lexer::Lexer;
use crate::object::{Dictionary, Object};

#[derive(Debug, Clone)]
pub struct Function {
    pub domain: Vec<f32>,
    pub range: Option<Vec<f32>>,
    kind: FunctionKind,
}

#[derive(Debug, Clone)]
enum FunctionKind {
    Sampled {
        size: Vec<usize>,
        /// normalized samples, one f32 per output component
        samples: Vec<f32>,
        encode: Vec<f32>,
        decode: Vec<f32>,
        n_out: usize,
    },
    Exponential {
        c0: Vec<f32>,
        c1: Vec<f32>,
        n: f32,
    },
    Stitching {
        functions: Vec<Function>,
        bounds: Vec<f32>,
        encode: Vec<f32>,
    },
    Calculator {
        program: Vec<PsOp>,
    },
    /// an array of one-output functions acting as a single n-output
    /// function (one per color component, as shadings use them)
    Combined {
        parts: Vec<Rc<Function>>,
    },
    /// stands in for an unparseable function
    Identity,
}

impl Function {
    pub fn identity() -> Self {
        Function {
            domain: vec![0.0, 1.0],
            range: None,
            kind: FunctionKind::Identity,
        }
    }

    /// One function out of an array of single-output functions.
    pub fn combined(parts: Vec<Rc<Function>>) -> Function {
        Function {
            domain: parts
                .first()
                .map(|f| f.domain.clone())
                .unwrap_or_else(|| vec![0.0, 1.0]),
            range: None,
            kind: FunctionKind::Combined { parts },
        }
    }

    /// Number of output components, when statically known.
    pub fn output_arity(&self) -> Option<usize> {
        match &self.kind {
            FunctionKind::Sampled { n_out, .. } => Some(*n_out),
            FunctionKind::Exponential { c0, .. } => Some(c0.len()),
            FunctionKind::Stitching { functions, .. } => {
                functions.first().and_then(Function::output_arity)
            }
            FunctionKind::Combined { parts } => Some(parts.len()),
            _ => self.range.as_ref().map(|r| r.len() / 2),
        }
    }

    pub fn eval(&self, inputs: &[f32]) -> Vec<f32> {
        let mut clamped: Vec<f32> = Vec::with_capacity(inputs.len());
        for (i, &x) in inputs.iter().enumerate() {
            let lo = self.domain.get(i * 2).copied().unwrap_or(0.0);
            let hi = self.domain.get(i * 2 + 1).copied().unwrap_or(1.0);
            clamped.push(x.clamp(lo.min(hi), hi.max(lo)));
        }
        let mut out = match &self.kind {
            FunctionKind::Identity => clamped.clone(),
            FunctionKind::Exponential { c0, c1, n } => {
                let x = clamped.first().copied().unwrap_or(0.0);
                let t = x.powf(*n);
                c0.iter()
                    .zip(c1.iter())
                    .map(|(&a, &b)| a + t * (b - a))
                    .collect()
            }
            FunctionKind::Stitching {
                functions,
                bounds,
                encode,
            } => {
                let x = clamped.first().copied().unwrap_or(0.0);
                let d0 = self.domain.first().copied().unwrap_or(0.0);
                let d1 = self.domain.get(1).copied().unwrap_or(1.0);
                let mut k = 0;
                while k < bounds.len() && x >= bounds[k] {
                    k += 1;
                }
                let lo = if k == 0 { d0 } else { bounds[k - 1] };
                let hi = if k == bounds.len() { d1 } else { bounds[k] };
                let e0 = encode.get(k * 2).copied().unwrap_or(0.0);
                let e1 = encode.get(k * 2 + 1).copied().unwrap_or(1.0);
                let t = interpolate(x, lo, hi, e0, e1);
                match functions.get(k) {
                    Some(f) => f.eval(&[t]),
                    None => Vec::new(),
                }
            }
            FunctionKind::Sampled {
                size,
                samples,
                encode,
                decode,
                n_out,
            } => eval_sampled(&clamped, &self.domain, size, samples, encode, decode, *n_out),
            FunctionKind::Calculator { program } => {
                let mut stack: Vec<f32> = clamped.clone();
                eval_ps(program, &mut stack);
                let n_out = self.range.as_ref().map(|r| r.len() / 2).unwrap_or(stack.len());
                let keep = stack.len().saturating_sub(n_out);
                stack.split_off(keep)
            }
            FunctionKind::Combined { parts } => parts
                .iter()
                .flat_map(|f| f.eval(&clamped))
                .collect(),
        };
        if let Some(range) = &self.range {
            for (i, v) in out.iter_mut().enumerate() {
                let lo = range.get(i * 2).copied().unwrap_or(f32::MIN);
                let hi = range.get(i * 2 + 1).copied().unwrap_or(f32::MAX);
                *v = v.clamp(lo.min(hi), hi.max(lo));
            }
        }
        out
    }

    /// 256-entry lookup table over [0, 1], for soft-mask transfer
    /// functions.
    pub fn to_lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let x = i as f32 / 255.0;
            let y = self.eval(&[x]).first().copied().unwrap_or(x);
            *slot = (y.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        }
        lut
    }
}

fn interpolate(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    if (x1 - x0).abs() < 1e-12 {
        y0
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// Linear interpolation along the first input dimension; additional
/// dimensions sample the nearest grid plane.
#[allow(clippy::too_many_arguments)]
fn eval_sampled(
    inputs: &[f32],
    domain: &[f32],
    size: &[usize],
    samples: &[f32],
    encode: &[f32],
    decode: &[f32],
    n_out: usize,
) -> Vec<f32> {
    if size.is_empty() || n_out == 0 {
        return Vec::new();
    }
    // map every input into its sample-grid coordinate
    let mut coords: Vec<f32> = Vec::with_capacity(size.len());
    for (i, &sz) in size.iter().enumerate() {
        let x = inputs.get(i).copied().unwrap_or(0.0);
        let d0 = domain.get(i * 2).copied().unwrap_or(0.0);
        let d1 = domain.get(i * 2 + 1).copied().unwrap_or(1.0);
        let e0 = encode.get(i * 2).copied().unwrap_or(0.0);
        let e1 = encode.get(i * 2 + 1).copied().unwrap_or((sz - 1) as f32);
        let e = interpolate(x, d0, d1, e0, e1).clamp(0.0, (sz - 1) as f32);
        coords.push(e);
    }
    let sample_at = |grid: &[usize]| -> Vec<f32> {
        let mut index = 0usize;
        let mut stride = 1usize;
        for (i, &sz) in size.iter().enumerate() {
            index += grid.get(i).copied().unwrap_or(0).min(sz - 1) * stride;
            stride *= sz;
        }
        (0..n_out)
            .map(|c| samples.get(index * n_out + c).copied().unwrap_or(0.0))
            .collect()
    };
    let mut grid: Vec<usize> = coords.iter().map(|c| c.round() as usize).collect();
    let x = coords[0];
    let lo = x.floor() as usize;
    let hi = (lo + 1).min(size[0] - 1);
    let frac = x - lo as f32;
    grid[0] = lo;
    let a = sample_at(&grid);
    grid[0] = hi;
    let b = sample_at(&grid);
    let raw: Vec<f32> = a
        .iter()
        .zip(b.iter())
        .map(|(&va, &vb)| va + frac * (vb - va))
        .collect();
    raw.iter()
        .enumerate()
        .map(|(c, &v)| {
            let d0 = decode.get(c * 2).copied().unwrap_or(0.0);
            let d1 = decode.get(c * 2 + 1).copied().unwrap_or(1.0);
            interpolate(v, 0.0, 1.0, d0, d1)
        })
        .collect()
}

// ----------------------------------------------------------------------
// parsing

/// Parses a function object (dictionary or stream). Unparseable
/// functions degrade to identity with a warning.
pub fn parse_function(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Rc<Function> {
    match try_parse_function(doc, obj, page, warnings) {
        Some(f) => Rc::new(f),
        None => {
            warnings.push(PdfWarnMsg::warning(
                page,
                0,
                "unparseable function, using identity".to_string(),
            ));
            Rc::new(Function::identity())
        }
    }
}

fn try_parse_function(
    doc: &PdfDocument,
    obj: &Object,
    page: usize,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Option<Function> {
    let resolved = doc.resolve(obj);
    let dict = resolved.as_dict().ok()?;
    let function_type = doc.dict_get(dict, b"FunctionType")?.as_i64().ok()?;
    let domain = number_array(doc, dict, b"Domain")?;
    let range = number_array(doc, dict, b"Range");

    let kind = match function_type {
        0 => {
            let stream_bytes = match obj {
                Object::Reference(r) => doc.stream_bytes(*r, page, warnings).as_ref().clone(),
                Object::Stream(s) => doc.decode_stream_direct(s, page, warnings),
                _ => return None,
            };
            let size: Vec<usize> = number_array(doc, dict, b"Size")?
                .iter()
                .map(|&v| (v as usize).max(1))
                .collect();
            let bps = doc.dict_get(dict, b"BitsPerSample")?.as_i64().ok()? as u32;
            let range = range.as_ref()?;
            let n_out = range.len() / 2;
            let encode = number_array(doc, dict, b"Encode").unwrap_or_else(|| {
                size.iter()
                    .flat_map(|&s| [0.0, (s - 1) as f32])
                    .collect()
            });
            let decode = number_array(doc, dict, b"Decode").unwrap_or_else(|| range.clone());
            let total: usize = size.iter().product::<usize>() * n_out;
            let samples = unpack_samples(&stream_bytes, bps, total);
            FunctionKind::Sampled {
                size,
                samples,
                encode,
                decode,
                n_out,
            }
        }
        2 => {
            let c0 = number_array(doc, dict, b"C0").unwrap_or_else(|| vec![0.0]);
            let c1 = number_array(doc, dict, b"C1").unwrap_or_else(|| vec![1.0]);
            let n = doc
                .dict_get(dict, b"N")
                .and_then(|o| o.as_f32().ok())
                .unwrap_or(1.0);
            FunctionKind::Exponential { c0, c1, n }
        }
        3 => {
            let functions: Vec<Function> = doc
                .dict_get(dict, b"Functions")?
                .as_array()
                .ok()?
                .iter()
                .filter_map(|f| try_parse_function(doc, f, page, warnings))
                .collect();
            let bounds = number_array(doc, dict, b"Bounds").unwrap_or_default();
            let encode = number_array(doc, dict, b"Encode").unwrap_or_default();
            FunctionKind::Stitching {
                functions,
                bounds,
                encode,
            }
        }
        4 => {
            let stream_bytes = match obj {
                Object::Reference(r) => doc.stream_bytes(*r, page, warnings).as_ref().clone(),
                Object::Stream(s) => doc.decode_stream_direct(s, page, warnings),
                _ => return None,
            };
            FunctionKind::Calculator {
                program: parse_ps_program(&stream_bytes)?,
            }
        }
        _ => return None,
    };
    Some(Function {
        domain,
        range,
        kind,
    })
}

fn number_array(doc: &PdfDocument, dict: &Dictionary, key: &[u8]) -> Option<Vec<f32>> {
    let arr = doc.dict_get(dict, key)?;
    let arr = arr.as_array().ok()?;
    Some(
        arr.iter()
            .map(|o| doc.resolve(o).as_f32().unwrap_or(0.0))
            .collect(),
    )
}

/// Big-endian bit-packed samples, normalized to [0, 1].
fn unpack_samples(data: &[u8], bps: u32, count: usize) -> Vec<f32> {
    let max = if bps >= 32 {
        u32::MAX as f32
    } else {
        ((1u64 << bps) - 1) as f32
    };
    let mut out = Vec::with_capacity(count);
    let mut bit_pos = 0usize;
    for _ in 0..count {
        let mut v: u64 = 0;
        for _ in 0..bps {
            let byte = match data.get(bit_pos / 8) {
                Some(b) => *b,
                None => {
                    out.push(0.0);
                    return out;
                }
            };
            v = v << 1 | u64::from(byte >> (7 - bit_pos % 8) & 1);
            bit_pos += 1;
        }
        out.push(v as f32 / max);
    }
    out
}

// ----------------------------------------------------------------------
// type 4 calculator

#[derive(Debug, Clone, PartialEq)]
enum PsOp {
    Push(f32),
    Block(Vec<PsOp>),
    Op(&'static str),
}

static PS_OPERATORS: &[&str] = &[
    "abs", "add", "and", "atan", "bitshift", "ceiling", "copy", "cos", "cvi", "cvr", "div", "dup",
    "eq", "exch", "exp", "false", "floor", "ge", "gt", "idiv", "if", "ifelse", "index", "le",
    "ln", "log", "lt", "mod", "mul", "ne", "neg", "not", "or", "pop", "roll", "round", "sin",
    "sqrt", "sub", "true", "truncate", "xor",
];

fn parse_ps_program(data: &[u8]) -> Option<Vec<PsOp>> {
    let mut lexer = Lexer::new(data);
    // the program is wrapped in one outer block
    let mut blocks: Vec<Vec<PsOp>> = vec![Vec::new()];
    loop {
        lexer.skip_whitespace_and_comments();
        if lexer.match_sequence(b"{") {
            blocks.push(Vec::new());
            continue;
        }
        if lexer.match_sequence(b"}") {
            let finished = blocks.pop()?;
            match blocks.last_mut() {
                Some(parent) => parent.push(PsOp::Block(finished)),
                None => return Some(finished), // outer block closed
            }
            continue;
        }
        match lexer.read_next(false).ok()? {
            Some(Object::Integer(i)) => blocks.last_mut()?.push(PsOp::Push(i as f32)),
            Some(Object::Real(r)) => blocks.last_mut()?.push(PsOp::Push(r)),
            Some(Object::Operator(op)) => {
                let known = PS_OPERATORS.iter().find(|&&k| k == op)?;
                blocks.last_mut()?.push(PsOp::Op(known));
            }
            Some(_) => return None,
            None => break,
        }
    }
    // tolerate a missing outer close
    blocks.pop().map(|mut outer| {
        if outer.len() == 1 {
            if let PsOp::Block(inner) = &outer[0] {
                return inner.clone();
            }
        }
        std::mem::take(&mut outer)
    })
}

fn eval_ps(program: &[PsOp], stack: &mut Vec<f32>) {
    let mut pending_blocks: Vec<&Vec<PsOp>> = Vec::new();
    for op in program {
        match op {
            PsOp::Push(v) => stack.push(*v),
            PsOp::Block(b) => pending_blocks.push(b),
            PsOp::Op(name) => match *name {
                "if" => {
                    let block = pending_blocks.pop();
                    let cond = stack.pop().unwrap_or(0.0);
                    if cond != 0.0 {
                        if let Some(b) = block {
                            eval_ps(b, stack);
                        }
                    }
                }
                "ifelse" => {
                    let else_block = pending_blocks.pop();
                    let then_block = pending_blocks.pop();
                    let cond = stack.pop().unwrap_or(0.0);
                    let chosen = if cond != 0.0 { then_block } else { else_block };
                    if let Some(b) = chosen {
                        eval_ps(b, stack);
                    }
                }
                other => eval_ps_operator(other, stack),
            },
        }
    }
}

fn eval_ps_operator(name: &str, stack: &mut Vec<f32>) {
    match name {
        "add" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(a + b);
        }
        "sub" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(a - b);
        }
        "mul" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(a * b);
        }
        "div" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(if b == 0.0 { 0.0 } else { a / b });
        }
        "idiv" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(if b == 0.0 {
                0.0
            } else {
                (a as i64 / b as i64) as f32
            });
        }
        "mod" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(if b == 0.0 {
                0.0
            } else {
                (a as i64 % b as i64) as f32
            });
        }
        "neg" => {
            let a = stack_pop(stack);
            stack.push(-a);
        }
        "abs" => {
            let a = stack_pop(stack);
            stack.push(a.abs());
        }
        "sqrt" => {
            let a = stack_pop(stack);
            stack.push(a.max(0.0).sqrt());
        }
        "sin" => {
            let a = stack_pop(stack);
            stack.push(a.to_radians().sin());
        }
        "cos" => {
            let a = stack_pop(stack);
            stack.push(a.to_radians().cos());
        }
        "atan" => {
            let den = stack_pop(stack);
            let num = stack_pop(stack);
            let mut deg = num.atan2(den).to_degrees();
            if deg < 0.0 {
                deg += 360.0;
            }
            stack.push(deg);
        }
        "exp" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(a.powf(b));
        }
        "ln" => {
            let a = stack_pop(stack);
            stack.push(a.max(f32::MIN_POSITIVE).ln());
        }
        "log" => {
            let a = stack_pop(stack);
            stack.push(a.max(f32::MIN_POSITIVE).log10());
        }
        "cvi" | "truncate" => {
            let a = stack_pop(stack);
            stack.push(a.trunc());
        }
        "cvr" => {}
        "floor" => {
            let a = stack_pop(stack);
            stack.push(a.floor());
        }
        "ceiling" => {
            let a = stack_pop(stack);
            stack.push(a.ceil());
        }
        "round" => {
            let a = stack_pop(stack);
            stack.push(a.round());
        }
        "dup" => {
            let a = stack_pop(stack);
            stack.push(a);
            stack.push(a);
        }
        "pop" => {
            stack_pop(stack);
        }
        "exch" => {
            let b = stack_pop(stack);
            let a = stack_pop(stack);
            stack.push(b);
            stack.push(a);
        }
        "copy" => {
            let n = stack_pop(stack) as usize;
            let len = stack.len();
            for i in len.saturating_sub(n)..len {
                let v = stack[i];
                stack.push(v);
            }
        }
        "index" => {
            let n = stack_pop(stack) as usize;
            let v = stack
                .len()
                .checked_sub(n + 1)
                .and_then(|i| stack.get(i).copied())
                .unwrap_or(0.0);
            stack.push(v);
        }
        "roll" => {
            let j = stack_pop(stack) as i64;
            let n = (stack_pop(stack) as usize).min(stack.len());
            if n > 0 {
                let start = stack.len() - n;
                let slice = &mut stack[start..];
                let j = j.rem_euclid(n as i64) as usize;
                slice.rotate_right(j);
            }
        }
        "eq" => binary_bool(stack, |a, b| a == b),
        "ne" => binary_bool(stack, |a, b| a != b),
        "gt" => binary_bool(stack, |a, b| a > b),
        "ge" => binary_bool(stack, |a, b| a >= b),
        "lt" => binary_bool(stack, |a, b| a < b),
        "le" => binary_bool(stack, |a, b| a <= b),
        "and" => binary_int(stack, |a, b| a & b),
        "or" => binary_int(stack, |a, b| a | b),
        "xor" => binary_int(stack, |a, b| a ^ b),
        "not" => {
            let a = stack_pop(stack);
            stack.push(if a == 0.0 { 1.0 } else { 0.0 });
        }
        "bitshift" => {
            let shift = stack_pop(stack) as i64;
            let a = stack_pop(stack) as i64;
            let v = if shift >= 0 {
                a.wrapping_shl(shift as u32)
            } else {
                a.wrapping_shr((-shift) as u32)
            };
            stack.push(v as f32);
        }
        "true" => stack.push(1.0),
        "false" => stack.push(0.0),
        _ => {}
    }
}

fn stack_pop(stack: &mut Vec<f32>) -> f32 {
    stack.pop().unwrap_or(0.0)
}

fn binary_bool(stack: &mut Vec<f32>, f: impl Fn(f32, f32) -> bool) {
    let b = stack_pop(stack);
    let a = stack_pop(stack);
    stack.push(if f(a, b) { 1.0 } else { 0.0 });
}

fn binary_int(stack: &mut Vec<f32>, f: impl Fn(i64, i64) -> i64) {
    let b = stack_pop(stack) as i64;
    let a = stack_pop(stack) as i64;
    stack.push(f(a, b) as f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exponential_interpolates_between_c0_and_c1() {
        let f = Function {
            domain: vec![0.0, 1.0],
            range: None,
            kind: FunctionKind::Exponential {
                c0: vec![0.0, 1.0],
                c1: vec![1.0, 0.0],
                n: 1.0,
            },
        };
        assert_eq!(f.eval(&[0.0]), vec![0.0, 1.0]);
        assert_eq!(f.eval(&[0.5]), vec![0.5, 0.5]);
        assert_eq!(f.eval(&[1.0]), vec![1.0, 0.0]);
        // inputs clamp to the domain
        assert_eq!(f.eval(&[2.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn stitching_selects_subfunction_by_bounds() {
        let half = |c0: f32, c1: f32| Function {
            domain: vec![0.0, 1.0],
            range: None,
            kind: FunctionKind::Exponential {
                c0: vec![c0],
                c1: vec![c1],
                n: 1.0,
            },
        };
        let f = Function {
            domain: vec![0.0, 1.0],
            range: None,
            kind: FunctionKind::Stitching {
                functions: vec![half(0.0, 0.5), half(0.5, 1.0)],
                bounds: vec![0.5],
                encode: vec![0.0, 1.0, 0.0, 1.0],
            },
        };
        assert_eq!(f.eval(&[0.25]), vec![0.25]);
        assert_eq!(f.eval(&[0.75]), vec![0.75]);
    }

    #[test]
    fn sampled_linear_interpolation() {
        // 3 samples [0, 128, 255] at 8 bits, one output
        let f = Function {
            domain: vec![0.0, 1.0],
            range: Some(vec![0.0, 1.0]),
            kind: FunctionKind::Sampled {
                size: vec![3],
                samples: unpack_samples(&[0, 128, 255], 8, 3),
                encode: vec![0.0, 2.0],
                decode: vec![0.0, 1.0],
                n_out: 1,
            },
        };
        assert_eq!(f.eval(&[0.0]), vec![0.0]);
        assert_eq!(f.eval(&[1.0]), vec![1.0]);
        let mid = f.eval(&[0.5])[0];
        assert!((mid - 128.0 / 255.0).abs() < 1e-4);
        // halfway between the first two samples
        let quarter = f.eval(&[0.25])[0];
        assert!((quarter - 0.5 * 128.0 / 255.0).abs() < 1e-4);
    }

    #[test]
    fn calculator_program_runs() {
        let program = parse_ps_program(b"{ 2 mul 1 exch sub }").unwrap();
        let f = Function {
            domain: vec![0.0, 1.0],
            range: Some(vec![0.0, 1.0]),
            kind: FunctionKind::Calculator { program },
        };
        // 1 - 2x clamped into range
        assert_eq!(f.eval(&[0.25]), vec![0.5]);
        assert_eq!(f.eval(&[0.0]), vec![1.0]);
        assert_eq!(f.eval(&[1.0]), vec![0.0]);
    }

    #[test]
    fn calculator_ifelse() {
        let program = parse_ps_program(b"{ dup 0.5 lt { pop 0 } { pop 1 } ifelse }").unwrap();
        let f = Function {
            domain: vec![0.0, 1.0],
            range: Some(vec![0.0, 1.0]),
            kind: FunctionKind::Calculator { program },
        };
        assert_eq!(f.eval(&[0.2]), vec![0.0]);
        assert_eq!(f.eval(&[0.8]), vec![1.0]);
    }

    #[test]
    fn transfer_lut_endpoints() {
        let f = Function::identity();
        let lut = f.to_lut();
        assert_eq!(lut[0], 0);
        assert_eq!(lut[128], 128);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn unpack_odd_bit_widths() {
        // two 4-bit samples from one byte: 0xF0 -> [15, 0] -> [1.0, 0.0]
        assert_eq!(unpack_samples(&[0xF0], 4, 2), vec![1.0, 0.0]);
        // 1-bit samples
        assert_eq!(unpack_samples(&[0b1010_0000], 1, 4), vec![1.0, 0.0, 1.0, 0.0]);
    }
}
