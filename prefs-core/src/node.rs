/*!
Persisted node tree.

A [`Node`] is a shared handle to one element of a preferences tree: a tag
(the class name of the object it describes), named scalar properties and an
ordered list of children. Cloning a `Node` clones the handle, not the
element. Parents own their children; a child only holds a weak link back to
its parent, so dropping the root releases the whole tree.

Scalar properties are stored as text. The typed accessors define the three
encodings the engine supports:

- strings are stored verbatim
- integers are stored in canonical base-10 form
- booleans are stored as exactly `true` or `false`
*/

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{PrefsError, Result};

const TRUE_TOKEN: &str = "true";
const FALSE_TOKEN: &str = "false";

struct NodeData {
    tag: String,
    properties: BTreeMap<String, String>,
    children: Vec<Node>,
    parent: Weak<RefCell<NodeData>>,
}

/// Handle to one node of a preferences tree
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeData>>,
}

/// Non-owning reference to a node.
///
/// Upgrading fails once every owner of the node's tree has released it.
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<RefCell<NodeData>>,
}

impl WeakNode {
    /// An empty reference that never upgrades
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }

    /// Get the node back if it is still alive
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl Default for WeakNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(WeakNode)")
    }
}

impl Node {
    /// Create a detached node labeled `tag`
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeData {
                tag: tag.into(),
                properties: BTreeMap::new(),
                children: Vec::new(),
                parent: Weak::new(),
            })),
        }
    }

    /// Tag of this node (the class name of the object it describes)
    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    /// Whether both handles point at the same node
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a non-owning reference to this node
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ----- properties -----

    /// Set a string property, replacing any previous value
    pub fn set_string<K, V>(&self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner
            .borrow_mut()
            .properties
            .insert(name.into(), value.into());
    }

    /// Get a string property
    ///
    /// # Errors
    /// * `PrefsError::NotFound` - If the property is not set
    pub fn get_string(&self, name: &str) -> Result<String> {
        self.inner
            .borrow()
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| PrefsError::NotFound(name.to_string()))
    }

    /// Set an integer property
    pub fn set_int<K: Into<String>>(&self, name: K, value: i64) {
        self.set_string(name, value.to_string());
    }

    /// Get an integer property
    ///
    /// # Errors
    /// * `PrefsError::NotFound` - If the property is not set
    /// * `PrefsError::MalformedValue` - If the text is not a base-10 integer
    pub fn get_int(&self, name: &str) -> Result<i64> {
        let text = self.get_string(name)?;
        match text.parse::<i64>() {
            Ok(value) => Ok(value),
            Err(_) => Err(PrefsError::MalformedValue {
                property: name.to_string(),
                value: text,
                expected: "integer",
            }),
        }
    }

    /// Set a boolean property
    pub fn set_bool<K: Into<String>>(&self, name: K, value: bool) {
        let token = if value { TRUE_TOKEN } else { FALSE_TOKEN };
        self.set_string(name, token);
    }

    /// Get a boolean property
    ///
    /// # Errors
    /// * `PrefsError::NotFound` - If the property is not set
    /// * `PrefsError::MalformedValue` - If the text is neither `true` nor `false`
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let text = self.get_string(name)?;
        match text.as_str() {
            TRUE_TOKEN => Ok(true),
            FALSE_TOKEN => Ok(false),
            _ => Err(PrefsError::MalformedValue {
                property: name.to_string(),
                value: text,
                expected: "true or false",
            }),
        }
    }

    /// Whether a property is set
    pub fn has_property(&self, name: &str) -> bool {
        self.inner.borrow().properties.contains_key(name)
    }

    /// Remove a property, returning its previous text
    pub fn remove_property(&self, name: &str) -> Option<String> {
        self.inner.borrow_mut().properties.remove(name)
    }

    /// All properties, sorted by name
    pub fn properties(&self) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ----- tree -----

    /// Append `child` as the last child of this node
    ///
    /// # Errors
    /// * `PrefsError::InvalidTree` - If `child` already has a parent, or is
    ///   this node or one of its ancestors
    pub fn add_child(&self, child: Node) -> Result<()> {
        if child.parent().is_some() {
            return Err(PrefsError::InvalidTree(format!(
                "<{}> is already attached to a parent",
                child.tag()
            )));
        }

        let mut cursor = Some(self.clone());
        while let Some(ancestor) = cursor {
            if ancestor.ptr_eq(&child) {
                return Err(PrefsError::InvalidTree(format!(
                    "adding <{}> below <{}> would create a cycle",
                    child.tag(),
                    self.tag()
                )));
            }
            cursor = ancestor.parent();
        }

        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.inner.borrow_mut().children.push(child);
        Ok(())
    }

    /// Children in document order
    pub fn children(&self) -> Vec<Node> {
        self.inner.borrow().children.clone()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    /// First child, if any
    pub fn first_child(&self) -> Option<Node> {
        self.inner.borrow().children.first().cloned()
    }

    /// The sibling following this node, if any
    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let data = parent.inner.borrow();
        let position = data.children.iter().position(|c| c.ptr_eq(self))?;
        data.children.get(position + 1).cloned()
    }

    /// Parent of this node, if it is attached and the parent is alive
    pub fn parent(&self) -> Option<Node> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Node { inner })
    }

    /// Number of nodes in the subtree rooted here (including this node)
    pub fn subtree_len(&self) -> usize {
        1 + self
            .inner
            .borrow()
            .children
            .iter()
            .map(Node::subtree_len)
            .sum::<usize>()
    }
}

/// Structural equality: same tag, properties and children in the same order
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.inner.borrow();
        let b = other.inner.borrow();
        a.tag == b.tag && a.properties == b.properties && a.children == b.children
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("Node")
            .field("tag", &data.tag)
            .field("properties", &data.properties)
            .field("children", &data.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_property() {
        let node = Node::new("person");
        node.set_string("name", "Bob");
        assert_eq!(node.get_string("name").unwrap(), "Bob");
        assert!(node.has_property("name"));

        node.set_string("name", "Alice");
        assert_eq!(node.get_string("name").unwrap(), "Alice");
    }

    #[test]
    fn test_missing_properties_are_not_found() {
        let node = Node::new("person");

        assert!(matches!(node.get_string("name"), Err(PrefsError::NotFound(p)) if p == "name"));
        assert!(matches!(node.get_int("age"), Err(PrefsError::NotFound(p)) if p == "age"));
        assert!(matches!(node.get_bool("alive"), Err(PrefsError::NotFound(p)) if p == "alive"));
    }

    #[test]
    fn test_int_property() {
        let node = Node::new("person");
        node.set_int("age", 30);
        assert_eq!(node.get_string("age").unwrap(), "30");
        assert_eq!(node.get_int("age").unwrap(), 30);

        node.set_int("offset", -12);
        assert_eq!(node.get_int("offset").unwrap(), -12);
    }

    #[test]
    fn test_malformed_int() {
        let node = Node::new("person");
        node.set_string("age", "thirty");

        let err = node.get_int("age").unwrap_err();
        assert!(matches!(err, PrefsError::MalformedValue { ref value, .. } if value == "thirty"));
    }

    #[test]
    fn test_bool_property() {
        let node = Node::new("person");
        node.set_bool("alive", true);
        assert_eq!(node.get_string("alive").unwrap(), "true");
        assert!(node.get_bool("alive").unwrap());

        node.set_bool("alive", false);
        assert!(!node.get_bool("alive").unwrap());
    }

    #[test]
    fn test_malformed_bool() {
        let node = Node::new("person");
        for token in ["yes", "1", "TRUE", " true", ""] {
            node.set_string("alive", token);
            assert!(
                matches!(node.get_bool("alive"), Err(PrefsError::MalformedValue { .. })),
                "token {token:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_remove_property() {
        let node = Node::new("person");
        node.set_string("name", "Bob");
        assert_eq!(node.remove_property("name"), Some("Bob".to_string()));
        assert!(!node.has_property("name"));
        assert_eq!(node.remove_property("name"), None);
    }

    #[test]
    fn test_children_keep_order() {
        let parent = Node::new("people");
        let bob = Node::new("person");
        bob.set_string("name", "Bob");
        let alice = Node::new("person");
        alice.set_string("name", "Alice");

        parent.add_child(bob.clone()).unwrap();
        parent.add_child(alice.clone()).unwrap();

        let children = parent.children();
        assert_eq!(children.len(), 2);
        assert!(children[0].ptr_eq(&bob));
        assert!(children[1].ptr_eq(&alice));

        let first = parent.first_child().unwrap();
        assert!(first.ptr_eq(&bob));
        assert!(first.next_sibling().unwrap().ptr_eq(&alice));
        assert!(alice.next_sibling().is_none());
        assert!(bob.parent().unwrap().ptr_eq(&parent));
        assert_eq!(parent.subtree_len(), 3);
    }

    #[test]
    fn test_add_child_rejects_attached_node() {
        let a = Node::new("a");
        let b = Node::new("b");
        let child = Node::new("child");

        a.add_child(child.clone()).unwrap();
        assert!(matches!(b.add_child(child), Err(PrefsError::InvalidTree(_))));
        assert_eq!(b.child_count(), 0);
    }

    #[test]
    fn test_add_child_rejects_cycle() {
        let root = Node::new("root");
        let mid = Node::new("mid");
        root.add_child(mid.clone()).unwrap();

        assert!(matches!(mid.add_child(root.clone()), Err(PrefsError::InvalidTree(_))));
        assert!(matches!(root.add_child(root.clone()), Err(PrefsError::InvalidTree(_))));
    }

    #[test]
    fn test_weak_node_dies_with_tree() {
        let root = Node::new("root");
        let child = Node::new("child");
        root.add_child(child.clone()).unwrap();
        let weak = child.downgrade();
        drop(child);

        assert!(weak.upgrade().is_some());
        drop(root);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = Node::new("person");
        a.set_int("age", 30);
        let b = Node::new("person");
        b.set_string("age", "30");
        assert_eq!(a, b);

        b.set_bool("alive", true);
        assert_ne!(a, b);
    }
}
