//! object.rs
//!
//! The PDF object model: a tagged `Object` over the primitive PDF value
//! kinds, an insertion-ordered `Dictionary` and a `Stream` carrying its
//! raw (still encoded) payload. Indirect objects are addressed by
//! `ObjectId` = (object number, generation number).

use crate::errors::PdfError;

/// (object number, generation number)
pub type ObjectId = (u32, u16);

/// How a string object was written in the file. Escapes are already
/// resolved; the format only matters when reporting and re-lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    /// Interned name with `#XX` escapes already decoded
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// Only appears inside content streams
    Operator(String),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
            Object::Operator(_) => "Operator",
        }
    }

    fn type_err(&self, expected: &'static str) -> PdfError {
        PdfError::Type {
            expected,
            found: self.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool, PdfError> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(self.type_err("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64, PdfError> {
        match self {
            Object::Integer(i) => Ok(*i),
            _ => Err(self.type_err("Integer")),
        }
    }

    /// Integer or Real as f32. PDF operands freely mix the two.
    pub fn as_f32(&self) -> Result<f32, PdfError> {
        match self {
            Object::Integer(i) => Ok(*i as f32),
            Object::Real(r) => Ok(*r),
            _ => Err(self.type_err("Number")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8], PdfError> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(self.type_err("Name")),
        }
    }

    pub fn as_name_str(&self) -> Result<&str, PdfError> {
        std::str::from_utf8(self.as_name()?).map_err(|_| self.type_err("Name"))
    }

    pub fn as_string_bytes(&self) -> Result<&[u8], PdfError> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(self.type_err("String")),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>, PdfError> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(self.type_err("Array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary, PdfError> {
        match self {
            Object::Dictionary(d) => Ok(d),
            // A stream can stand in wherever its dictionary is wanted
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(self.type_err("Dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream, PdfError> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(self.type_err("Stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId, PdfError> {
        match self {
            Object::Reference(r) => Ok(*r),
            _ => Err(self.type_err("Reference")),
        }
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Object {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Object {
        Object::Stream(s)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Object {
        Object::Integer(i)
    }
}

impl From<f32> for Object {
    fn from(r: f32) -> Object {
        Object::Real(r)
    }
}

/// Key/value mapping with insertion order preserved, so iteration is
/// deterministic. PDF dictionaries are small; lookup is a linear scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, Object)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object, PdfError> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| {
                PdfError::Dictionary(format!("missing key /{}", String::from_utf8_lossy(key)))
            })
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Object> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace. Replacement keeps the original position.
    pub fn set<V: Into<Object>>(&mut self, key: impl Into<Vec<u8>>, value: V) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }
}

impl FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

/// Stream dictionary plus the raw payload exactly as it appears in the
/// file. Decoding through the filter chain happens in `filters.rs`; the
/// document caches decoded bytes for streams in the object table.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Stream { dict, content }
    }

    /// The declared filter chain, left to right. A single name and an
    /// array of names are both legal; `F` abbreviations occur inline.
    pub fn filter_names(&self) -> Vec<Vec<u8>> {
        let filter = match self
            .dict
            .get(b"Filter")
            .or_else(|_| self.dict.get(b"F"))
        {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };
        match filter {
            Object::Name(n) => vec![n.clone()],
            Object::Array(arr) => arr
                .iter()
                .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dictionary_preserves_insertion_order() {
        let mut d = Dictionary::new();
        d.set("Zebra", Object::Integer(1));
        d.set("Alpha", Object::Integer(2));
        d.set("Mike", Object::Integer(3));
        d.set("Zebra", Object::Integer(9));

        let keys: Vec<&[u8]> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&b"Zebra"[..], &b"Alpha"[..], &b"Mike"[..]]);
        assert_eq!(d.get(b"Zebra").unwrap(), &Object::Integer(9));
    }

    #[test]
    fn accessor_type_errors_name_the_found_type() {
        let o = Object::Integer(12);
        let err = o.as_dict().unwrap_err();
        assert_eq!(
            err,
            PdfError::Type {
                expected: "Dictionary",
                found: "Integer"
            }
        );
    }

    #[test]
    fn stream_dict_stands_in_for_dictionary() {
        let mut d = Dictionary::new();
        d.set("Length", Object::Integer(0));
        let s = Object::Stream(Stream::new(d, Vec::new()));
        assert!(s.as_dict().is_ok());
    }
}
