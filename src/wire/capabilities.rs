//! Capability records.
//!
//! Both client- and server-declared capabilities are, conceptually, a fixed
//! record of booleans. On the wire they're nested: presence of the outer
//! key (`tools`, `roots`, …) implies the feature is on, and an inner
//! `listChanged` flag defaults to `false` when the key's value is an empty
//! object. We flatten that on decode and re-nest it on encode so the rest
//! of the crate only ever sees plain bools.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientCapabilities {
    pub roots: bool,
    pub roots_list_changed: bool,
    pub sampling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub tools_list_changed: bool,
    pub resources: bool,
    pub resources_list_changed: bool,
    pub prompts: bool,
    pub prompts_list_changed: bool,
    pub sampling: bool,
}

fn read_feature(obj: &Map<String, Value>, key: &str) -> (bool, bool) {
    match obj.get(key) {
        Some(v) => {
            let list_changed = v.get("listChanged").and_then(Value::as_bool).unwrap_or(false);
            (true, list_changed)
        }
        None => (false, false),
    }
}

fn write_feature(obj: &mut Map<String, Value>, key: &str, present: bool, list_changed: bool) {
    if present {
        let mut inner = Map::new();
        if list_changed {
            inner.insert("listChanged".to_string(), Value::Bool(true));
        }
        obj.insert(key.to_string(), Value::Object(inner));
    }
}

impl Serialize for ClientCapabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut obj = Map::new();
        write_feature(&mut obj, "roots", self.roots, self.roots_list_changed);
        write_feature(&mut obj, "sampling", self.sampling, false);
        Value::Object(obj).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClientCapabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| D::Error::custom("capabilities must be an object"))?;
        let (roots, roots_list_changed) = read_feature(obj, "roots");
        let (sampling, _) = read_feature(obj, "sampling");
        Ok(ClientCapabilities { roots, roots_list_changed, sampling })
    }
}

impl Serialize for ServerCapabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut obj = Map::new();
        write_feature(&mut obj, "tools", self.tools, self.tools_list_changed);
        write_feature(&mut obj, "resources", self.resources, self.resources_list_changed);
        write_feature(&mut obj, "prompts", self.prompts, self.prompts_list_changed);
        write_feature(&mut obj, "sampling", self.sampling, false);
        Value::Object(obj).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerCapabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| D::Error::custom("capabilities must be an object"))?;
        let (tools, tools_list_changed) = read_feature(obj, "tools");
        let (resources, resources_list_changed) = read_feature(obj, "resources");
        let (prompts, prompts_list_changed) = read_feature(obj, "prompts");
        let (sampling, _) = read_feature(obj, "sampling");
        Ok(ServerCapabilities {
            tools,
            tools_list_changed,
            resources,
            resources_list_changed,
            prompts,
            prompts_list_changed,
            sampling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_server_capabilities() {
        let raw = json!({"tools":{"listChanged":true},"resources":{"listChanged":true},"prompts":{"listChanged":true}});
        let caps: ServerCapabilities = serde_json::from_value(raw).unwrap();
        assert!(caps.tools && caps.tools_list_changed);
        assert!(caps.resources && caps.resources_list_changed);
        assert!(caps.prompts && caps.prompts_list_changed);
        assert!(!caps.sampling);
    }

    #[test]
    fn absent_feature_is_false() {
        let caps: ServerCapabilities = serde_json::from_value(json!({})).unwrap();
        assert_eq!(caps, ServerCapabilities::default());
    }

    #[test]
    fn inner_flag_defaults_false_on_empty_object() {
        let caps: ServerCapabilities = serde_json::from_value(json!({"tools":{}})).unwrap();
        assert!(caps.tools);
        assert!(!caps.tools_list_changed);
    }

    #[test]
    fn client_capabilities_round_trip() {
        let caps = ClientCapabilities { roots: true, roots_list_changed: true, sampling: true };
        let encoded = serde_json::to_value(caps).unwrap();
        let decoded: ClientCapabilities = serde_json::from_value(encoded).unwrap();
        assert_eq!(caps, decoded);
    }
}
