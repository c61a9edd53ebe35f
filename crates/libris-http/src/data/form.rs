use bytes::Bytes;
use http::Method;
use serde_json::Value;

use crate::core::{flatten_fields, guess_content_type};

/// Field name the binary payload is attached under unless overridden.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Spoof field carrying the intended verb through a POST transport.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// The single binary attachment of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            field_name: DEFAULT_FILE_FIELD.to_string(),
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming the part after the file.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_FIELD.to_string());
        Ok(Self::new(file_name, bytes))
    }

    #[must_use]
    pub fn field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A flat multipart payload: text fields plus at most one file.
///
/// # Examples
///
/// ```
/// use libris_http::{FilePart, MultipartForm};
/// use serde_json::json;
///
/// let form = MultipartForm::new()
///     .fields_from(&json!({ "title": "Data Structures", "tags": ["cs", "algo"] }))
///     .file(FilePart::new("ds.pdf", b"%PDF-1.7".to_vec()));
///
/// assert_eq!(form.get("title"), Some("Data Structures"));
/// assert_eq!(form.get("tags[1]"), Some("algo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Append every entry of a JSON object, flattened.
    #[must_use]
    pub fn fields_from(mut self, value: &Value) -> Self {
        self.fields.extend(flatten_fields(value));
        self
    }

    /// Attach the binary payload, replacing any previous one.
    #[must_use]
    pub fn file(mut self, file: FilePart) -> Self {
        self.file = Some(file);
        self
    }

    /// Carry `method` as a `_method` field (for PUT uploads sent via POST).
    #[must_use]
    pub fn method_override(self, method: Method) -> Self {
        self.text(METHOD_OVERRIDE_FIELD, method.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
