/*!
Textual encoding of node trees.

The engine only needs "node tree to text" and "text to node tree"; the
[`NodeCodec`] trait is that seam. [`JsonCodec`] is the default adapter and
writes one JSON object per node:

```json
{
  "tag": "people",
  "children": [
    { "tag": "person", "properties": { "age": "30", "name": "Bob" } }
  ]
}
```

Empty `properties` and `children` are omitted on output and optional on input.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Node, PrefsError, Result};

/// Encoding abstraction for node trees
pub trait NodeCodec {
    /// Encode the tree rooted at `node`
    fn encode(&self, node: &Node) -> Result<String>;

    /// Decode a tree and return its root node
    fn decode(&self, text: &str) -> Result<Node>;

    /// Get the name of the format
    fn format_name(&self) -> &str;
}

#[derive(Serialize, Deserialize, Debug)]
struct NodeRepr {
    tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeRepr>,
}

impl NodeRepr {
    fn from_node(node: &Node) -> Self {
        Self {
            tag: node.tag(),
            properties: node.properties().into_iter().collect(),
            children: node.children().iter().map(NodeRepr::from_node).collect(),
        }
    }

    fn into_node(self) -> Result<Node> {
        if self.tag.is_empty() {
            return Err(PrefsError::parse("node without tag"));
        }

        let node = Node::new(self.tag);
        for (name, value) in self.properties {
            node.set_string(name, value);
        }
        for child in self.children {
            node.add_child(child.into_node()?)?;
        }
        Ok(node)
    }
}

/// JSON codec backed by `serde_json`
#[derive(Debug, Clone)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Create a codec emitting indented output
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a codec emitting single-line output
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Create a codec with explicit formatting
    pub fn with_pretty(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCodec for JsonCodec {
    fn encode(&self, node: &Node) -> Result<String> {
        let repr = NodeRepr::from_node(node);
        let text = if self.pretty {
            serde_json::to_string_pretty(&repr)?
        } else {
            serde_json::to_string(&repr)?
        };
        Ok(text)
    }

    fn decode(&self, text: &str) -> Result<Node> {
        let repr: NodeRepr = serde_json::from_str(text)
            .map_err(|e| PrefsError::parse(format!("Invalid node document: {e}")))?;
        repr.into_node()
    }

    fn format_name(&self) -> &str {
        "json"
    }
}
