//! multipart/form-data encoding
//!
//! The partner protocol takes file and artefact uploads as form posts. Scalar
//! fields are written only when non-empty, because the partner distinguishes
//! an absent field from an empty one. Structured values ride inside a single
//! field as JSON text.
//!
//! [`form_field_value`] reads one field back out of an encoded body. Only the
//! test double depends on it, but every encoded field must survive it.

use crate::error::MultipartError;
use serde::Serialize;
use tracing::trace;

const CRLF: &str = "\r\n";

/// A finished multipart body together with its `Content-Type` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
    /// Encoded body
    pub body: Vec<u8>,
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
}

/// Incremental multipart/form-data writer
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: String,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Form with a random boundary
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Form with a caller-chosen boundary
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: String::new(),
        }
    }

    /// Boundary separating the parts
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Adds a text field unless `value` is empty
    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.write_part(name, value);
        }
        self
    }

    /// Adds a text field unless `value` is `None` or empty
    pub fn optional_text(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.text(name, v),
            None => self,
        }
    }

    /// Adds `value` JSON-encoded as a single text field
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<&mut Self, MultipartError> {
        let encoded = serde_json::to_string(value).map_err(|source| MultipartError::Encode {
            field: name.to_string(),
            source,
        })?;
        self.write_part(name, &encoded);
        Ok(self)
    }

    /// Closes the body
    #[must_use]
    pub fn finish(mut self) -> EncodedForm {
        self.body.push_str("--");
        self.body.push_str(&self.boundary);
        self.body.push_str("--");
        self.body.push_str(CRLF);
        EncodedForm {
            content_type: format!("multipart/form-data; boundary={}", self.boundary),
            body: self.body.into_bytes(),
        }
    }

    fn write_part(&mut self, name: &str, value: &str) {
        trace!(field = name, "adding multipart field");
        self.body.push_str("--");
        self.body.push_str(&self.boundary);
        self.body.push_str(CRLF);
        self.body.push_str("Content-Disposition: form-data; name=\"");
        self.body.push_str(&escape_quotes(name));
        self.body.push('"');
        self.body.push_str(CRLF);
        self.body.push_str(CRLF);
        self.body.push_str(value);
        self.body.push_str(CRLF);
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => s.to_string(),
    }
}

/// Extracts the boundary parameter of a multipart `Content-Type` value
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !media_type.starts_with("multipart/") {
        return Err(MultipartError::ContentType(format!(
            "'{media_type}' is not a multipart type"
        )));
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value))
        .filter(|b| !b.is_empty())
        .ok_or_else(|| MultipartError::ContentType("boundary not found".to_string()))
}

fn disposition_name(headers: &str) -> Option<String> {
    let disposition = headers.split(CRLF).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-disposition")
            .then_some(value)
    })?;

    disposition
        .split(';')
        .skip(1)
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("name"))
        .map(|(_, value)| unquote(value))
}

/// Returns the raw value of the part named `field`.
///
/// Parts without a parseable `Content-Disposition` are skipped.
pub fn form_field_value(
    body: &[u8],
    content_type: &str,
    field: &str,
) -> Result<String, MultipartError> {
    let boundary = boundary_from_content_type(content_type)?;
    let text = std::str::from_utf8(body)
        .map_err(|e| MultipartError::Malformed(format!("body is not UTF-8: {e}")))?;
    let delimiter = format!("--{boundary}");

    // The first segment is the preamble.
    for segment in text.split(delimiter.as_str()).skip(1) {
        if segment.starts_with("--") {
            break;
        }
        let part = segment.strip_prefix(CRLF).unwrap_or(segment);
        let (headers, content) = part.split_once("\r\n\r\n").ok_or_else(|| {
            MultipartError::Malformed("part without header terminator".to_string())
        })?;

        if disposition_name(headers).as_deref() == Some(field) {
            return Ok(content.strip_suffix(CRLF).unwrap_or(content).to_string());
        }
    }

    Err(MultipartError::FieldNotFound(field.to_string()))
}
