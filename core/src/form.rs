//! `multipart/form-data` bodies for image and APK uploads.
//!
//! Fields are added with `Option` values; `None` is skipped so the server
//! never receives a field the form left blank.

use uuid::Uuid;

/// A binary file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Upload payloads that travel as `multipart/form-data`.
pub trait FormPayload: Clone + Send + Sync + 'static {
    fn to_form(&self) -> MultipartForm;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    File(FilePart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<(String, Part)>,
    boundary: String,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            boundary: format!("----backoffice-{}", Uuid::new_v4().simple()),
        }
    }

    /// Add a text field when `value` is present.
    pub fn text<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.parts.push((name.to_string(), Part::Text(value.to_string())));
        }
        self
    }

    /// Add a file field when `file` is present.
    pub fn file(mut self, name: &str, file: Option<FilePart>) -> Self {
        if let Some(file) = file {
            self.parts.push((name.to_string(), Part::File(file)));
        }
        self
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(n, part)| match part {
            Part::Text(value) if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, part) in &self.parts {
            let name = quoted(name);
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            match part {
                Part::Text(value) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File(file) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                            quoted(&file.file_name)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(
                        format!("Content-Type: {}\r\n\r\n", quoted(&file.content_type)).as_bytes(),
                    );
                    out.extend_from_slice(&file.bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

/// Percent-encode the characters that would end a quoted header value or
/// the header line itself, as browsers do for form uploads.
fn quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
