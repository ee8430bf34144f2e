//! Tool metadata cache: decouples discovery from schema lookup so a host
//! can list available tools (name + description only) without paying for
//! full schemas until a tool is actually about to be called.

use std::collections::HashMap;

use serde_json::Value;

use crate::wire::{Tool, ToolMetadata};

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
    initialized: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry's contents wholesale and marks it initialized.
    pub fn cache_from_tools(&mut self, tools: Vec<Tool>) {
        self.tools = tools.into_iter().map(|tool| (tool.name.clone(), tool)).collect();
        self.initialized = true;
    }

    /// Same as [`Self::cache_from_tools`] but accepts raw JSON maps, for
    /// hosts that received tool listings by some other route than a typed
    /// `tools/list` call (e.g. a cached listing loaded from disk).
    pub fn cache_from_maps(&mut self, tools: Vec<Value>) -> Result<(), serde_json::Error> {
        let parsed = tools.into_iter().map(serde_json::from_value).collect::<Result<Vec<Tool>, _>>()?;
        self.cache_from_tools(parsed);
        Ok(())
    }

    pub fn get_all_metadata(&self) -> Vec<ToolMetadata> {
        self.tools.values().map(ToolMetadata::from).collect()
    }

    pub fn get_metadata(&self, name: &str) -> Option<ToolMetadata> {
        self.tools.get(name).map(ToolMetadata::from)
    }

    pub fn get_schema(&self, name: &str) -> Option<&Value> {
        self.tools.get(name).map(|tool| &tool.input_schema)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn invalidate_all(&mut self) {
        self.tools.clear();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: format!("{name} tool"),
            input_schema: json!({"type": "object"}),
            supports_progress: None,
            supports_cancellation: None,
            metadata: None,
        }
    }

    #[test]
    fn cache_from_tools_marks_initialized_and_populates() {
        let mut registry = ToolRegistry::new();
        assert!(!registry.is_initialized());
        registry.cache_from_tools(vec![tool("calculator")]);
        assert!(registry.is_initialized());
        assert_eq!(registry.count(), 1);
        assert!(registry.has_tool("calculator"));
    }

    #[test]
    fn get_metadata_and_schema_lookup_miss_returns_none() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.get_metadata("missing"), None);
        assert_eq!(registry.get_schema("missing"), None);
    }

    #[test]
    fn invalidate_all_resets_to_uninitialized() {
        let mut registry = ToolRegistry::new();
        registry.cache_from_tools(vec![tool("a")]);
        registry.invalidate_all();
        assert!(!registry.is_initialized());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn recaching_replaces_contents_wholesale() {
        let mut registry = ToolRegistry::new();
        registry.cache_from_tools(vec![tool("a"), tool("b")]);
        registry.cache_from_tools(vec![tool("c")]);
        assert_eq!(registry.count(), 1);
        assert!(!registry.has_tool("a"));
        assert!(registry.has_tool("c"));
    }
}
