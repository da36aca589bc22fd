//! lexer.rs
//!
//! Byte-level scanner over a parse context. Yields `Object` values for
//! both the object-table loader and the content-stream interpreter. The
//! same machine lexes CMap streams; `match_sequence` exists so those
//! parsers can detect their `end...` block keywords in place.

use crate::errors::PdfError;
use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// PDF whitespace: null, tab, line feed, form feed, carriage return, space
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Resolves the `/Length` of a stream when it is an indirect reference.
/// The document loader passes a closure into the lexer; content-stream
/// lexing runs without one.
pub type LengthResolver<'a> = dyn Fn(ObjectId) -> Option<usize> + 'a;

pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
    length_of: Option<&'a LengthResolver<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Lexer {
            data,
            pos: 0,
            length_of: None,
        }
    }

    pub fn with_length_resolver(data: &'a [u8], length_of: &'a LengthResolver<'a>) -> Self {
        Lexer {
            data,
            pos: 0,
            length_of: Some(length_of),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace_and_comments();
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.data.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(b) = self.peek() {
                if is_whitespace(b) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.peek() == Some(b'%') {
                while let Some(b) = self.bump() {
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                }
            } else {
                return;
            }
        }
    }

    /// Skips leading whitespace/comments, then advances over `pattern` if
    /// the input starts with it. Returns whether it matched.
    pub fn match_sequence(&mut self, pattern: &[u8]) -> bool {
        self.skip_whitespace_and_comments();
        if self.data[self.pos..].starts_with(pattern) {
            self.pos += pattern.len();
            true
        } else {
            false
        }
    }

    /// Reads the next value. `Ok(None)` at end of input. Operators and
    /// unknown keywords surface as `Object::Operator`.
    pub fn read_next(&mut self, allow_references: bool) -> Result<Option<Object>, PdfError> {
        self.skip_whitespace_and_comments();
        let b = match self.peek() {
            Some(b) => b,
            None => return Ok(None),
        };
        let obj = match b {
            b'0'..=b'9' | b'+' | b'-' | b'.' => {
                let num = self.read_number()?;
                if allow_references {
                    self.try_upgrade_to_reference(num)?
                } else {
                    num
                }
            }
            b'/' => self.read_name()?,
            b'(' => self.read_literal_string()?,
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.read_dictionary_or_stream(allow_references)?
                } else {
                    self.read_hex_string()?
                }
            }
            b'[' => self.read_array(allow_references)?,
            b']' | b'>' | b')' | b'{' | b'}' => {
                return Err(PdfError::syntax(
                    self.pos,
                    format!("unexpected delimiter {:?}", b as char),
                ));
            }
            _ => self.read_keyword(),
        };
        Ok(Some(obj))
    }

    /// `12 0 R` — only upgraded when both trailing tokens are present.
    fn try_upgrade_to_reference(&mut self, num: Object) -> Result<Object, PdfError> {
        let obj_num = match num {
            Object::Integer(i) if i >= 0 => i,
            _ => return Ok(num),
        };
        let save = self.pos;
        self.skip_whitespace_and_comments();
        let mut gen = 0u64;
        let mut digits = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            gen = gen * 10 + u64::from(b - b'0');
            digits += 1;
            self.pos += 1;
        }
        if digits == 0 {
            self.pos = save;
            return Ok(Object::Integer(obj_num));
        }
        self.skip_whitespace_and_comments();
        let is_ref = self.peek() == Some(b'R')
            && self
                .peek_at(1)
                .map(|n| !is_regular(n))
                .unwrap_or(true);
        if is_ref {
            self.pos += 1;
            Ok(Object::Reference((obj_num as u32, gen as u16)))
        } else {
            self.pos = save;
            Ok(Object::Integer(obj_num))
        }
    }

    fn read_number(&mut self) -> Result<Object, PdfError> {
        let start = self.pos;
        let mut negative = false;
        match self.peek() {
            Some(b'+') => {
                self.pos += 1;
            }
            Some(b'-') => {
                negative = true;
                self.pos += 1;
            }
            _ => {}
        }
        let mut int_part: i64 = 0;
        let mut frac_part: f64 = 0.0;
        let mut frac_scale: f64 = 1.0;
        let mut is_real = false;
        let mut any_digit = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => {
                    any_digit = true;
                    if is_real {
                        frac_scale /= 10.0;
                        frac_part += f64::from(b - b'0') * frac_scale;
                    } else {
                        int_part = int_part.saturating_mul(10).saturating_add(i64::from(b - b'0'));
                    }
                    self.pos += 1;
                }
                b'.' if !is_real => {
                    is_real = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        // A lone sign or decimal point still lexes; it is the number zero
        if !any_digit && !is_real {
            return Err(PdfError::syntax(start, "sign without digits"));
        }
        if is_real {
            let v = int_part as f64 + frac_part;
            Ok(Object::Real(if negative { -v as f32 } else { v as f32 }))
        } else {
            Ok(Object::Integer(if negative { -int_part } else { int_part }))
        }
    }

    fn read_name(&mut self) -> Result<Object, PdfError> {
        debug_assert_eq!(self.peek(), Some(b'/'));
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hi = self.peek().and_then(hex_val);
                let lo = self.peek_at(1).and_then(hex_val);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    name.push(hi << 4 | lo);
                    self.pos += 2;
                } else {
                    name.push(b'#');
                }
            } else {
                name.push(b);
            }
        }
        Ok(Object::Name(name))
    }

    fn read_literal_string(&mut self) -> Result<Object, PdfError> {
        debug_assert_eq!(self.peek(), Some(b'('));
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let b = self
                .bump()
                .ok_or_else(|| PdfError::syntax(self.pos, "unterminated literal string"))?;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    let esc = self
                        .bump()
                        .ok_or_else(|| PdfError::syntax(self.pos, "unterminated escape"))?;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' | b')' | b'\\' => out.push(esc),
                        b'0'..=b'7' => {
                            let mut v = u16::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        v = v * 8 + u16::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push(v as u8);
                        }
                        // line continuation: backslash followed by EOL
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                // raw EOL inside a string normalizes to a single LF
                b'\r' => {
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                other => out.push(other),
            }
        }
        Ok(Object::String(out, StringFormat::Literal))
    }

    fn read_hex_string(&mut self) -> Result<Object, PdfError> {
        debug_assert_eq!(self.peek(), Some(b'<'));
        self.pos += 1;
        let mut out = Vec::new();
        let mut nibble: Option<u8> = None;
        loop {
            let b = self
                .bump()
                .ok_or_else(|| PdfError::syntax(self.pos, "unterminated hex string"))?;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            let v = hex_val(b)
                .ok_or_else(|| PdfError::syntax(self.pos - 1, "invalid hex digit in string"))?;
            match nibble.take() {
                Some(hi) => out.push(hi << 4 | v),
                None => nibble = Some(v),
            }
        }
        // odd trailing nibble is padded with zero
        if let Some(hi) = nibble {
            out.push(hi << 4);
        }
        Ok(Object::String(out, StringFormat::Hexadecimal))
    }

    fn read_array(&mut self, allow_references: bool) -> Result<Object, PdfError> {
        debug_assert_eq!(self.peek(), Some(b'['));
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(PdfError::syntax(self.pos, "unterminated array")),
                _ => match self.read_next(allow_references)? {
                    Some(obj) => items.push(obj),
                    None => return Err(PdfError::syntax(self.pos, "unterminated array")),
                },
            }
        }
        Ok(Object::Array(items))
    }

    fn read_dictionary_or_stream(&mut self, allow_references: bool) -> Result<Object, PdfError> {
        let dict = self.read_dictionary(allow_references)?;
        let save = self.pos;
        if self.match_sequence(b"stream") {
            self.read_stream_payload(dict)
        } else {
            self.pos = save;
            Ok(Object::Dictionary(dict))
        }
    }

    fn read_dictionary(&mut self, allow_references: bool) -> Result<Dictionary, PdfError> {
        debug_assert!(self.data[self.pos..].starts_with(b"<<"));
        self.pos += 2;
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                Some(b'>') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break;
                }
                Some(b'/') => {
                    let key = match self.read_name()? {
                        Object::Name(n) => n,
                        _ => unreachable!(),
                    };
                    let value = self
                        .read_next(allow_references)?
                        .ok_or_else(|| PdfError::syntax(self.pos, "missing dictionary value"))?;
                    dict.set(key, value);
                }
                Some(b) => {
                    return Err(PdfError::syntax(
                        self.pos,
                        format!("expected name key, found {:?}", b as char),
                    ));
                }
                None => return Err(PdfError::syntax(self.pos, "unterminated dictionary")),
            }
        }
        Ok(dict)
    }

    /// Payload bytes are not lexed: exactly `/Length` bytes follow the
    /// single EOL after the `stream` keyword. A broken length falls back
    /// to scanning for `endstream`.
    fn read_stream_payload(&mut self, dict: Dictionary) -> Result<Object, PdfError> {
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        let declared = match dict.get(b"Length") {
            Ok(Object::Integer(i)) if *i >= 0 => Some(*i as usize),
            Ok(Object::Reference(r)) => self.length_of.and_then(|f| f(*r)),
            _ => None,
        };
        let start = self.pos;
        if let Some(len) = declared {
            if start + len <= self.data.len() {
                let end = start + len;
                let mut probe = Lexer::new(self.data);
                probe.seek(end);
                if probe.match_sequence(b"endstream") {
                    self.pos = probe.pos();
                    return Ok(Object::Stream(Stream::new(
                        dict,
                        self.data[start..end].to_vec(),
                    )));
                }
            }
        }
        // recovery: take everything up to the next endstream keyword
        let rest = &self.data[start..];
        let found = find_keyword(rest, b"endstream")
            .ok_or_else(|| PdfError::syntax(start, "missing endstream"))?;
        let mut end = start + found;
        // drop the EOL that separates payload from the keyword
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        self.pos = start + found + b"endstream".len();
        Ok(Object::Stream(Stream::new(
            dict,
            self.data[start..end].to_vec(),
        )))
    }

    fn read_keyword(&mut self) -> Object {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_regular(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word = &self.data[start..self.pos];
        match word {
            b"true" => Object::Boolean(true),
            b"false" => Object::Boolean(false),
            b"null" => Object::Null,
            _ => Object::Operator(String::from_utf8_lossy(word).into_owned()),
        }
    }

    /// Raw bytes of an inline image: everything from the current position
    /// up to the `EI` keyword at a token boundary. The separating
    /// whitespace byte before `EI` is not part of the data.
    pub fn take_inline_image_data(&mut self) -> &'a [u8] {
        // data starts after the single whitespace byte following `ID`
        if self.peek().map(is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
        let start = self.pos;
        let rest = &self.data[start..];
        let mut i = 0;
        while i + 1 < rest.len() {
            if rest[i] == b'E'
                && rest[i + 1] == b'I'
                && (i == 0 || is_whitespace(rest[i - 1]))
                && rest.get(i + 2).map(|b| !is_regular(*b)).unwrap_or(true)
            {
                let mut end = i;
                if end > 0 {
                    end -= 1; // the whitespace before EI
                }
                self.pos = start + i + 2;
                return &rest[..end];
            }
            i += 1;
        }
        self.pos = self.data.len();
        rest
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// First occurrence of `keyword` in `data` at a token boundary.
fn find_keyword(data: &[u8], keyword: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + keyword.len() <= data.len() {
        if &data[i..i + keyword.len()] == keyword {
            let before_ok = i == 0 || !is_regular(data[i - 1]);
            let after_ok = data
                .get(i + keyword.len())
                .map(|b| !is_regular(*b))
                .unwrap_or(true);
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_one(input: &[u8]) -> Object {
        Lexer::new(input).read_next(true).unwrap().unwrap()
    }

    #[test]
    fn numbers_integer_real_and_lone_decimal_point() {
        assert_eq!(lex_one(b"42"), Object::Integer(42));
        assert_eq!(lex_one(b"-17"), Object::Integer(-17));
        assert_eq!(lex_one(b"+3"), Object::Integer(3));
        assert_eq!(lex_one(b"4.5"), Object::Real(4.5));
        assert_eq!(lex_one(b"-.002"), Object::Real(-0.002));
        assert_eq!(lex_one(b"4."), Object::Real(4.0));
        assert_eq!(lex_one(b"."), Object::Real(0.0));
    }

    #[test]
    fn literal_string_escaped_paren_is_one_char() {
        assert_eq!(
            lex_one(br"(\()"),
            Object::String(vec![b'('], StringFormat::Literal)
        );
    }

    #[test]
    fn literal_string_escapes_and_balance() {
        assert_eq!(
            lex_one(b"(a(b)c\\n\\101\\\\)"),
            Object::String(b"a(b)c\nA\\".to_vec(), StringFormat::Literal)
        );
    }

    #[test]
    fn literal_string_line_continuation() {
        assert_eq!(
            lex_one(b"(ab\\\ncd)"),
            Object::String(b"abcd".to_vec(), StringFormat::Literal)
        );
    }

    #[test]
    fn hex_string_whitespace_and_odd_nibble() {
        assert_eq!(
            lex_one(b"<48 65 6C6C 6F2>"),
            Object::String(b"Hello ".to_vec(), StringFormat::Hexadecimal)
        );
    }

    #[test]
    fn name_with_hash_escape() {
        assert_eq!(lex_one(b"/A#42C"), Object::Name(b"ABC".to_vec()));
    }

    #[test]
    fn reference_vs_plain_integers() {
        let mut lx = Lexer::new(b"12 0 R 7 9");
        assert_eq!(
            lx.read_next(true).unwrap().unwrap(),
            Object::Reference((12, 0))
        );
        assert_eq!(lx.read_next(true).unwrap().unwrap(), Object::Integer(7));
        assert_eq!(lx.read_next(true).unwrap().unwrap(), Object::Integer(9));
        assert_eq!(lx.read_next(true).unwrap(), None);
    }

    #[test]
    fn references_disabled_in_content_streams() {
        let mut lx = Lexer::new(b"12 0 R");
        assert_eq!(lx.read_next(false).unwrap().unwrap(), Object::Integer(12));
        assert_eq!(lx.read_next(false).unwrap().unwrap(), Object::Integer(0));
        assert_eq!(
            lx.read_next(false).unwrap().unwrap(),
            Object::Operator("R".to_string())
        );
    }

    #[test]
    fn dictionary_with_comment_and_nested_array() {
        let obj = lex_one(b"<< /Type /Page % comment\n /Kids [1 0 R 2 0 R] >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get(b"Type").unwrap(), &Object::Name(b"Page".to_vec()));
        assert_eq!(dict.get(b"Kids").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn stream_payload_exact_length() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let obj = lex_one(input);
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
    }

    #[test]
    fn stream_payload_bad_length_recovers_via_endstream() {
        let input = b"<< /Length 9999 >>\nstream\nhello\nendstream";
        let obj = lex_one(input);
        assert_eq!(obj.as_stream().unwrap().content, b"hello");
    }

    #[test]
    fn stream_length_via_resolver() {
        let resolver = |id: ObjectId| if id == (7, 0) { Some(3) } else { None };
        let input = b"<< /Length 7 0 R >>\nstream\nabc\nendstream";
        let mut lx = Lexer::with_length_resolver(input, &resolver);
        let obj = lx.read_next(true).unwrap().unwrap();
        assert_eq!(obj.as_stream().unwrap().content, b"abc");
    }

    #[test]
    fn operators_lex_as_operators() {
        let mut lx = Lexer::new(b"BT /F1 12 Tf (Hi) Tj ET");
        let mut ops = Vec::new();
        while let Some(obj) = lx.read_next(false).unwrap() {
            if let Object::Operator(op) = obj {
                ops.push(op);
            }
        }
        assert_eq!(ops, vec!["BT", "Tf", "Tj", "ET"]);
    }

    #[test]
    fn inline_image_data_stops_at_ei() {
        let mut lx = Lexer::new(b" \x01\x02EI\x03 EI Q");
        let data = lx.take_inline_image_data();
        assert_eq!(data, b"\x01\x02EI\x03");
        assert!(lx.match_sequence(b"Q"));
    }
}
