//! Content block model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single content unit within a page or template.
///
/// Props are carried through untouched; the renderer owns their meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }
}

/// Decode a stored block column, treating anything unreadable as no blocks.
pub fn parse_blocks(raw: Option<&str>) -> Vec<Block> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_wire_shape() {
        let block = Block::new("b1", "hero").with_prop("title", "Welcome");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "hero");
        assert_eq!(value["props"]["title"], "Welcome");
    }

    #[test]
    fn test_parse_blocks_tolerates_garbage() {
        assert!(parse_blocks(None).is_empty());
        assert!(parse_blocks(Some("not json")).is_empty());
        let blocks = parse_blocks(Some(r#"[{"id":"a","type":"text"}]"#));
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].props.is_empty());
    }
}
