use serde_json::Value;

/// Flatten a JSON object into multipart text fields.
///
/// Scalars are appended by name, arrays expand to `name[index]`, nested
/// objects are JSON-stringified. `null` entries are skipped.
pub fn flatten_fields(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        return Vec::new();
    };

    let mut fields = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let Some(text) = field_text(item) {
                        fields.push((format!("{key}[{index}]"), text));
                    }
                }
            }
            other => {
                if let Some(text) = field_text(other) {
                    fields.push((key.clone(), text));
                }
            }
        }
    }
    fields
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Media type for common library attachments, by file extension.
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    let ct = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "epub" => "application/epub+zip",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(ct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_scalars_arrays_objects() {
        let fields = flatten_fields(&json!({
            "title": "Operating Systems",
            "year": 2023,
            "published": true,
            "authors": ["Silberschatz", "Galvin"],
            "meta": { "edition": 10 },
            "course_id": null,
        }));

        assert!(fields.contains(&("title".to_string(), "Operating Systems".to_string())));
        assert!(fields.contains(&("year".to_string(), "2023".to_string())));
        assert!(fields.contains(&("published".to_string(), "true".to_string())));
        assert!(fields.contains(&("authors[0]".to_string(), "Silberschatz".to_string())));
        assert!(fields.contains(&("authors[1]".to_string(), "Galvin".to_string())));
        assert!(fields.contains(&("meta".to_string(), r#"{"edition":10}"#.to_string())));
        assert!(!fields.iter().any(|(k, _)| k == "course_id"));
    }

    #[test]
    fn test_flatten_non_object_is_empty() {
        assert!(flatten_fields(&json!([1, 2])).is_empty());
        assert!(flatten_fields(&json!("x")).is_empty());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("notes.PDF"), Some("application/pdf"));
        assert_eq!(guess_content_type("cover.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("README"), None);
        assert_eq!(guess_content_type("archive.rar"), None);
    }
}
