//! Request bodies: nothing, a structured entry, or a photo upload.
//!
//! # Design
//! One tagged variant covers every body shape the API accepts, so the service
//! needs a single request builder instead of one method per shape. Entries go
//! out as JSON; photos go out as `multipart/form-data` with an `image` file
//! part and a `desc` text part.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// A structured record for a remote resource (a post, an item, an album...).
///
/// Fields the service does not know about travel in `attributes`. The keys
/// `id`, `title` and `content` always map to the typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.typed_field(&key) {
            Some(field) => *field = Some(value_to_string(value)),
            None => {
                self.attributes.insert(key, value);
            }
        }
        self
    }

    /// Copy with reserved keys moved out of `attributes`. A typed field that
    /// is already set keeps its value.
    fn normalized(&self) -> Cow<'_, Entry> {
        if !RESERVED_KEYS.iter().any(|key| self.attributes.contains_key(*key)) {
            return Cow::Borrowed(self);
        }
        let mut entry = self.clone();
        for key in RESERVED_KEYS {
            if let Some(value) = entry.attributes.remove(key) {
                if let Some(field) = entry.typed_field(key) {
                    field.get_or_insert_with(|| value_to_string(value));
                }
            }
        }
        Cow::Owned(entry)
    }

    fn typed_field(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "id" => Some(&mut self.id),
            "title" => Some(&mut self.title),
            "content" => Some(&mut self.content),
            _ => None,
        }
    }
}

const RESERVED_KEYS: [&str; 3] = ["id", "title", "content"];

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Binary photo content plus its format tag and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    /// Image format such as `jpeg` or `png`; becomes `image/<format>`.
    pub format: String,
    pub description: String,
}

impl PhotoUpload {
    pub fn new(data: Vec<u8>, format: &str, description: &str) -> Self {
        Self {
            data,
            format: format.trim().to_ascii_lowercase(),
            description: description.to_string(),
        }
    }

    pub fn mime_type(&self) -> String {
        format!("image/{}", self.format)
    }

    /// Encode as `multipart/form-data`; returns `(content_type, body)`.
    pub fn encode(&self) -> Result<(String, Vec<u8>), ApiError> {
        let boundary = format!("----douban-{}", Uuid::new_v4().simple());
        self.encode_with_boundary(&boundary)
    }

    pub(crate) fn encode_with_boundary(&self, boundary: &str) -> Result<(String, Vec<u8>), ApiError> {
        if self.data.is_empty() {
            return Err(ApiError::InvalidPayload("photo data is empty".to_string()));
        }
        if self.format.is_empty() || !self.format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidPayload(format!("bad photo format {:?}", self.format)));
        }

        let mut body = Vec::with_capacity(self.data.len() + self.description.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"photo.{}\"\r\n",
                self.format
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", self.mime_type()).as_bytes());
        body.extend_from_slice(&self.data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"desc\"\r\n");
        body.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n\r\n");
        body.extend_from_slice(self.description.as_bytes());
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok((format!("multipart/form-data; boundary={boundary}"), body))
    }
}

/// Body content for a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    Entry(Entry),
    Photo(PhotoUpload),
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    /// Encode into `(content_type, body)`, or `None` for an empty payload.
    pub fn encode(&self) -> Result<Option<(String, Vec<u8>)>, ApiError> {
        match self {
            Payload::None => Ok(None),
            Payload::Entry(entry) => {
                let body = serde_json::to_vec(&*entry.normalized()).map_err(|e| ApiError::SerializationError(e.to_string()))?;
                Ok(Some(("application/json".to_string(), body)))
            }
            Payload::Photo(photo) => photo.encode().map(Some),
        }
    }
}

impl From<Entry> for Payload {
    fn from(entry: Entry) -> Self {
        Payload::Entry(entry)
    }
}

impl From<PhotoUpload> for Payload {
    fn from(photo: PhotoUpload) -> Self {
        Payload::Photo(photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_known_and_extra_fields() {
        let entry = Entry::new().title("Hello").attribute("rating", 5);
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["title"], "Hello");
        assert_eq!(json["rating"], 5);
        assert!(json.get("id").is_none());
        assert!(json.get("content").is_none());
    }

    #[test]
    fn entry_deserializes_unknown_fields_into_attributes() {
        let entry: Entry = serde_json::from_str(r#"{"id":"7","title":"t","author":"me"}"#).unwrap();
        assert_eq!(entry.id.as_deref(), Some("7"));
        assert_eq!(entry.attributes["author"], "me");
    }

    #[test]
    fn reserved_attribute_keys_set_the_typed_fields() {
        let entry = Entry::new().title("a").attribute("title", "b").attribute("id", 42);
        assert_eq!(entry.title.as_deref(), Some("b"));
        assert_eq!(entry.id.as_deref(), Some("42"));
        assert!(entry.attributes.is_empty());

        let (_, body) = Payload::from(entry.clone()).encode().unwrap().unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text.matches("\"title\"").count(), 1);
        let decoded: Entry = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn reserved_keys_inserted_directly_are_not_duplicated() {
        let mut entry = Entry::new().title("kept");
        entry.attributes.insert("id".to_string(), "from-map".into());
        entry.attributes.insert("title".to_string(), "dropped".into());

        let (_, body) = Payload::Entry(entry).encode().unwrap().unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text.matches("\"id\"").count(), 1);
        assert_eq!(text.matches("\"title\"").count(), 1);
        let decoded: Entry = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("from-map"));
        assert_eq!(decoded.title.as_deref(), Some("kept"));
        assert!(decoded.attributes.is_empty());
    }

    #[test]
    fn empty_payload_encodes_to_nothing() {
        assert!(Payload::None.encode().unwrap().is_none());
    }

    #[test]
    fn entry_payload_is_json() {
        let (content_type, body) = Payload::from(Entry::new().content("hi")).encode().unwrap().unwrap();
        assert_eq!(content_type, "application/json");
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn photo_multipart_layout() {
        let photo = PhotoUpload::new(vec![0xff, 0xd8, 0x00], "JPEG", "sunset");
        let (content_type, body) = photo.encode_with_boundary("XYZ").unwrap();
        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");

        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.jpeg\"\r\n\
Content-Type: image/jpeg\r\n\r\n",
        );
        expected.extend_from_slice(&[0xff, 0xd8, 0x00]);
        expected.extend_from_slice(
            b"\r\n--XYZ\r\nContent-Disposition: form-data; name=\"desc\"\r\n\
Content-Type: text/plain; charset=utf-8\r\n\r\nsunset\r\n--XYZ--\r\n",
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn photo_boundaries_are_unique() {
        let photo = PhotoUpload::new(vec![1, 2, 3], "png", "");
        let (a, _) = photo.encode().unwrap();
        let (b, _) = photo.encode().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_photo_is_rejected() {
        let err = PhotoUpload::new(Vec::new(), "png", "x").encode().unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[test]
    fn photo_format_must_be_a_plain_token() {
        let err = PhotoUpload::new(vec![1], "png\r\nX-Evil: 1", "x").encode().unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }
}
