//! `Content`: the tagged union carried by tool results, prompt messages, and
//! sampling results. Tag key on the wire is `type`; an unrecognized tag must
//! fail to decode rather than silently falling back to a default variant.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        url: Option<String>,
        data: Option<String>,
        mime_type: String,
    },
    ResourceRef {
        uri: String,
        text: Option<String>,
        blob: Option<String>,
        mime_type: Option<String>,
    },
}

impl Serialize for Content {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut obj = Map::new();
        match self {
            Content::Text { text } => {
                obj.insert("type".to_string(), Value::String("text".to_string()));
                obj.insert("text".to_string(), Value::String(text.clone()));
            }
            Content::Image { url, data, mime_type } => {
                obj.insert("type".to_string(), Value::String("image".to_string()));
                if let Some(url) = url {
                    obj.insert("url".to_string(), Value::String(url.clone()));
                }
                if let Some(data) = data {
                    obj.insert("data".to_string(), Value::String(data.clone()));
                }
                obj.insert("mimeType".to_string(), Value::String(mime_type.clone()));
            }
            Content::ResourceRef { uri, text, blob, mime_type } => {
                obj.insert("type".to_string(), Value::String("resource".to_string()));
                obj.insert("uri".to_string(), Value::String(uri.clone()));
                if let Some(text) = text {
                    obj.insert("text".to_string(), Value::String(text.clone()));
                }
                if let Some(blob) = blob {
                    obj.insert("blob".to_string(), Value::String(blob.clone()));
                }
                if let Some(mime_type) = mime_type {
                    obj.insert("mimeType".to_string(), Value::String(mime_type.clone()));
                }
            }
        }
        Value::Object(obj).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| D::Error::custom("content must be an object"))?;
        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("content missing \"type\" tag"))?;
        match tag {
            "text" => {
                let text = obj
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| D::Error::custom("text content missing \"text\""))?
                    .to_string();
                Ok(Content::Text { text })
            }
            "image" => {
                let mime_type = obj
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .ok_or_else(|| D::Error::custom("image content missing \"mimeType\""))?
                    .to_string();
                Ok(Content::Image {
                    url: obj.get("url").and_then(Value::as_str).map(str::to_string),
                    data: obj.get("data").and_then(Value::as_str).map(str::to_string),
                    mime_type,
                })
            }
            "resource" => {
                let uri = obj
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| D::Error::custom("resource content missing \"uri\""))?
                    .to_string();
                Ok(Content::ResourceRef {
                    uri,
                    text: obj.get("text").and_then(Value::as_str).map(str::to_string),
                    blob: obj.get("blob").and_then(Value::as_str).map(str::to_string),
                    mime_type: obj.get("mimeType").and_then(Value::as_str).map(str::to_string),
                })
            }
            other => Err(D::Error::custom(format!("unknown content type tag: {other}"))),
        }
    }
}
