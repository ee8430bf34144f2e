//! Filesystem (or other URI-addressable) roots the client exposes to the
//! server, e.g. "this session may only touch files under this root".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootListResult {
    pub roots: Vec<Root>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_root() {
        let root = Root { uri: "file:///workspace".to_string(), name: "workspace".to_string(), description: None };
        let encoded = serde_json::to_value(&root).unwrap();
        let decoded: Root = serde_json::from_value(encoded).unwrap();
        assert_eq!(root, decoded);
    }
}
