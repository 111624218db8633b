//! Storage key generation and the reversible filename encoding used for
//! object metadata.
//!
//! Metadata values travel as HTTP-header-like fields, so they must stay ASCII.
//! Original filenames are therefore stored percent-encoded (RFC 3986) with an
//! empty safe set: only `A-Z a-z 0-9 - _ . ~` pass through unchanged.

use serde::Serialize;
use std::{borrow::Cow, fmt};
use thiserror::Error;
use uuid::Uuid;

/// Name used when an upload declares no filename at all.
pub const DEFAULT_UPLOAD_NAME: &str = "uploaded.pdf";

/// Unique handle for one stored document: `{uuid-v4}-{sanitized name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed percent escape at byte {0}")]
    MalformedEscape(usize),
    #[error("encoded value contains non-ASCII characters")]
    NonAscii,
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Reduce a client-supplied filename to its last path component and replace
/// any remaining separators with `_`.
///
/// Total over all inputs. Callers substitute [`DEFAULT_UPLOAD_NAME`] before
/// calling when no filename was declared.
pub fn sanitize_base_name(raw: &str) -> String {
    let base = raw.rsplit('/').next().unwrap_or(raw);
    base.replace(['/', '\\'], "_")
}

/// Prefix a sanitized name with a fresh random v4 UUID.
///
/// Collisions are not checked for; uniqueness rests on the 122 random bits.
pub fn generate_storage_key(sanitized_name: &str) -> StorageKey {
    StorageKey(format!("{}-{}", Uuid::new_v4(), sanitized_name))
}

/// True when the name carries a `.pdf` extension (case-insensitive).
pub fn is_pdf_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Percent-encode every octet outside the RFC 3986 unreserved set.
pub fn encode_name(original: &str) -> String {
    urlencoding::encode(original).into_owned()
}

/// Strict inverse of [`encode_name`].
///
/// Unlike lenient URL decoders this refuses stray `%` signs and escapes that
/// do not form UTF-8, so a corrupt metadata value is detected instead of being
/// passed through half-decoded.
pub fn decode_name(encoded: &str) -> Result<String, DecodeError> {
    if !encoded.is_ascii() {
        return Err(DecodeError::NonAscii);
    }

    let bytes = encoded.as_bytes();
    let mut pos = 0;
    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'%') {
        let at = pos + offset;
        let well_formed = bytes
            .get(at + 1..at + 3)
            .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(DecodeError::MalformedEscape(at));
        }
        pos = at + 3;
    }

    urlencoding::decode(encoded)
        .map(Cow::into_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}
