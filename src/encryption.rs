//! encryption.rs
//!
//! The security-handler contract. The handler is a collaborator supplied
//! by the embedder: given the document's encryption dictionary and a
//! password it produces per-object decryption. This crate ships only the
//! identity handler; an encrypted file without a real handler renders
//! with garbage strings and streams but does not fail to open.

use crate::object::{Dictionary, Object, ObjectId};

pub trait SecurityHandler {
    /// Decrypts a stream payload before the filter chain runs.
    fn decrypt_stream(&self, id: ObjectId, data: &[u8]) -> Vec<u8>;

    /// Decrypts a string object.
    fn decrypt_string(&self, id: ObjectId, data: &[u8]) -> Vec<u8>;

    /// True when decryption is a no-op (unencrypted file or identity
    /// crypt filter), letting callers skip buffer copies.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Handler for unencrypted documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityHandler;

impl SecurityHandler for IdentityHandler {
    fn decrypt_stream(&self, _id: ObjectId, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decrypt_string(&self, _id: ObjectId, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// The parts of the `/Encrypt` dictionary a handler needs to key itself.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionInfo {
    pub filter: String,
    pub v: i64,
    pub r: i64,
    pub key_length: i64,
    pub encrypt_metadata: bool,
}

impl EncryptionInfo {
    pub fn from_dict(dict: &Dictionary) -> Option<Self> {
        let filter = match dict.get(b"Filter") {
            Ok(Object::Name(n)) => String::from_utf8_lossy(n).into_owned(),
            _ => return None,
        };
        let int = |key: &[u8], default: i64| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(default)
        };
        Some(EncryptionInfo {
            filter,
            v: int(b"V", 0),
            r: int(b"R", 2),
            key_length: int(b"Length", 40),
            encrypt_metadata: dict
                .get(b"EncryptMetadata")
                .ok()
                .and_then(|o| o.as_bool().ok())
                .unwrap_or(true),
        })
    }
}
