/*!
Snapshot: object -> node -> buffer/file.

[`Prefs::obj_to_node`] is the entry point class callbacks use for child
objects; the buffer, file and storage variants encode the resulting tree and
release it afterwards.
*/

use std::any::{type_name, Any, TypeId};

use tracing::{debug, error};

use crate::context::address_of;
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{Node, Prefs, PrefsError, Result};

impl<U> Prefs<U> {
    /// Create a node describing the current state of `object`
    ///
    /// The class's `from_object` callback populates a fresh node tagged with
    /// `class_name`. If `object` is registered under `class_name`, the
    /// returned node becomes the node remembered for it. The caller owns the
    /// node.
    ///
    /// # Errors
    /// * `PrefsError::UnknownClass` - If the class is not registered
    /// * `PrefsError::TypeMismatch` - If `object` is not the class's object type
    /// * `PrefsError::MissingCallback` - If the class cannot be snapshotted
    /// * `PrefsError::CallbackFailed` - If the callback failed; no node is returned
    /// * `PrefsError::DepthExceeded` - If nested calls exceed `max_depth`
    pub fn obj_to_node<T: Any>(&mut self, class_name: &str, object: &T, user: &mut U) -> Result<Node> {
        let (class_key, handler) = self.resolve_class(class_name)?;
        if handler.object_type() != TypeId::of::<T>() {
            error!(class = %class_name, object_type = type_name::<T>(), "Object type does not match class");
            return Err(PrefsError::TypeMismatch {
                class: class_name.to_string(),
                expected: handler.object_type_name(),
            });
        }

        self.enter()?;
        let node = Node::new(class_name);
        let result = handler.from_object(self, &node, object, user);
        self.leave();

        if let Err(e) = result {
            self.record_callback_failure();
            error!(class = %class_name, error = %e, "from_object() failed");
            return Err(PrefsError::callback_failed(class_name, e));
        }

        if let Some((key, entry)) = self.objects.find_alive(address_of(object), TypeId::of::<T>()) {
            if entry.class == class_key {
                self.objects.set_node(key, node.downgrade());
            }
        }
        self.record_snapshot();

        debug!(class = %class_name, children = node.child_count(), "Created node from object");
        Ok(node)
    }

    /// Encode the current state of `object` as text
    pub fn obj_to_buffer<T: Any>(&mut self, class_name: &str, object: &T, user: &mut U) -> Result<String> {
        let node = self.obj_to_node(class_name, object, user)?;
        self.node_to_buffer(&node)
    }

    /// Write the current state of `object` to a file
    ///
    /// The document is compressed as configured and written atomically: on
    /// failure no partial file is left at `path`.
    pub fn obj_to_file<T: Any>(
        &mut self,
        class_name: &str,
        object: &T,
        path: &str,
        user: &mut U,
    ) -> Result<()> {
        self.obj_to_storage(&LocalFileStorage::new(), class_name, object, path, user)
    }

    /// Save the current state of `object` through a storage adapter
    pub fn obj_to_storage<S, T>(
        &mut self,
        storage: &S,
        class_name: &str,
        object: &T,
        path: &str,
        user: &mut U,
    ) -> Result<()>
    where
        S: StorageAdapter + ?Sized,
        T: Any,
    {
        if path.is_empty() {
            return Err(PrefsError::NullArgument("path"));
        }
        let node = self.obj_to_node(class_name, object, user)?;
        self.node_to_storage(storage, &node, path)
    }

    /// Encode a node tree as text
    pub fn node_to_buffer(&self, node: &Node) -> Result<String> {
        let text = self.codec.encode(node)?;
        self.record_document_size(text.len());
        Ok(text)
    }

    /// Write a node tree to a file (compressed as configured, atomically)
    pub fn node_to_file(&self, node: &Node, path: &str) -> Result<()> {
        self.node_to_storage(&LocalFileStorage::new(), node, path)
    }

    /// Save a node tree through a storage adapter
    pub fn node_to_storage<S>(&self, storage: &S, node: &Node, path: &str) -> Result<()>
    where
        S: StorageAdapter + ?Sized,
    {
        let text = self.node_to_buffer(node)?;
        let data = self.compressor.compress(text.as_bytes())?;

        storage.save(&data, path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to save document");
            e
        })?;

        debug!(
            path = %path,
            size = data.len(),
            compression = self.compressor.algorithm_name(),
            "Saved document"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::PrefsClass;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Point {
        x: i64,
        y: i64,
    }

    struct PointClass;

    impl PrefsClass for PointClass {
        type Object = Point;

        fn from_object(&self, _: &mut Prefs, node: &Node, p: &Point, _: &mut ()) -> Result<()> {
            node.set_int("x", p.x);
            node.set_int("y", p.y);
            Ok(())
        }
    }

    struct Broken;

    impl PrefsClass for Broken {
        type Object = Point;

        fn from_object(&self, _: &mut Prefs, node: &Node, _: &Point, _: &mut ()) -> Result<()> {
            node.set_string("half", "written");
            Err(PrefsError::custom("disk on fire"))
        }
    }

    struct RestoreOnly;

    impl PrefsClass for RestoreOnly {
        type Object = Point;

        fn to_object(&self, _: &mut Prefs, _: &Node, _: &mut ()) -> Result<Option<Rc<Point>>> {
            Ok(None)
        }
    }

    #[repr(C)]
    struct Frame {
        origin: Point,
        label: String,
    }

    struct FrameClass;

    impl PrefsClass for FrameClass {
        type Object = Frame;

        fn from_object(&self, prefs: &mut Prefs, node: &Node, frame: &Frame, user: &mut ()) -> Result<()> {
            node.set_string("label", frame.label.as_str());
            node.add_child(prefs.obj_to_node("point", &frame.origin, user)?)?;
            Ok(())
        }
    }

    struct Spiral;

    struct SpiralClass;

    impl PrefsClass<Cell<usize>> for SpiralClass {
        type Object = Spiral;

        fn from_object(
            &self,
            prefs: &mut Prefs<Cell<usize>>,
            node: &Node,
            spiral: &Spiral,
            calls: &mut Cell<usize>,
        ) -> Result<()> {
            calls.set(calls.get() + 1);
            node.add_child(prefs.obj_to_node("spiral", spiral, calls)?)?;
            Ok(())
        }
    }

    fn prefs() -> Prefs {
        let mut prefs = Prefs::new().unwrap();
        prefs.register_class("point", PointClass).unwrap();
        prefs.register_class("broken", Broken).unwrap();
        prefs.register_class("restore-only", RestoreOnly).unwrap();
        prefs
    }

    #[test]
    fn test_obj_to_node() {
        let mut prefs = prefs();
        let node = prefs.obj_to_node("point", &Point { x: 3, y: -4 }, &mut ()).unwrap();

        assert_eq!(node.tag(), "point");
        assert_eq!(node.get_int("x").unwrap(), 3);
        assert_eq!(node.get_int("y").unwrap(), -4);
        assert_eq!(prefs.depth(), 0);
    }

    #[test]
    fn test_unknown_class() {
        let mut prefs = prefs();
        let result = prefs.obj_to_node("line", &Point { x: 0, y: 0 }, &mut ());
        assert!(matches!(result, Err(PrefsError::UnknownClass(name)) if name == "line"));
    }

    #[test]
    fn test_type_mismatch() {
        let mut prefs = prefs();
        let result = prefs.obj_to_node("point", &42u8, &mut ());
        assert!(matches!(result, Err(PrefsError::TypeMismatch { .. })));
    }

    #[test]
    fn test_callback_failure_returns_no_node() {
        let mut prefs = prefs();
        let result = prefs.obj_to_node("broken", &Point { x: 0, y: 0 }, &mut ());

        match result {
            Err(PrefsError::CallbackFailed { class, source }) => {
                assert_eq!(class, "broken");
                assert!(matches!(*source, PrefsError::Custom(_)));
            }
            other => panic!("expected CallbackFailed, got {other:?}"),
        }
        assert_eq!(prefs.depth(), 0);
    }

    #[test]
    fn test_missing_snapshot_callback() {
        let mut prefs = prefs();
        let result = prefs.obj_to_node("restore-only", &Point { x: 0, y: 0 }, &mut ());
        assert!(matches!(
            result,
            Err(PrefsError::MissingCallback { class, direction: crate::Direction::Snapshot })
                if class == "restore-only"
        ));
    }

    #[test]
    fn test_registered_object_remembers_node() {
        let mut prefs = prefs();
        let point = Rc::new(Point { x: 1, y: 2 });
        prefs.register_object("point", &point).unwrap();
        assert!(prefs.node_of(&point).is_none());

        let node = prefs.obj_to_node("point", point.as_ref(), &mut ()).unwrap();
        assert!(prefs.node_of(&point).unwrap().ptr_eq(&node));

        // the caller owns the node; once released the registry forgets it
        drop(node);
        assert!(prefs.node_of(&point).is_none());
    }

    #[test]
    fn test_inner_object_does_not_touch_container_entry() {
        let mut prefs = prefs();
        prefs.register_class("frame", FrameClass).unwrap();
        let frame = Rc::new(Frame {
            origin: Point { x: 1, y: 1 },
            label: "window".into(),
        });
        prefs.register_object("frame", &frame).unwrap();
        assert_eq!(address_of(&frame.origin), address_of(frame.as_ref()));

        let node = prefs.obj_to_node("frame", frame.as_ref(), &mut ()).unwrap();
        assert_eq!(node.child_count(), 1);
        assert!(prefs.node_of(&frame).unwrap().ptr_eq(&node));
        assert_eq!(prefs.class_of(&frame).as_deref(), Some("frame"));

        // snapshotting the first field alone shares the frame's address
        let origin = prefs.obj_to_node("point", &frame.origin, &mut ()).unwrap();
        assert!(prefs.node_of(&frame).unwrap().ptr_eq(&node));
        assert!(!prefs.node_of(&frame).unwrap().ptr_eq(&origin));
        assert!(prefs
            .objects
            .find_alive(address_of(&frame.origin), TypeId::of::<Point>())
            .is_none());
    }

    #[test]
    fn test_depth_limit() {
        let config = crate::PrefsConfig::default().with_max_depth(8);
        let mut prefs: Prefs<Cell<usize>> = Prefs::with_config(config).unwrap();
        prefs.register_class("spiral", SpiralClass).unwrap();

        let mut calls = Cell::new(0);
        let result = prefs.obj_to_node("spiral", &Spiral, &mut calls);

        assert!(matches!(result, Err(PrefsError::DepthExceeded { limit: 8 })));
        assert_eq!(calls.get(), 8);
        assert_eq!(prefs.depth(), 0);

        // the guard was fully released, so a second attempt gets as deep
        let result = prefs.obj_to_node("spiral", &Spiral, &mut calls);
        assert!(matches!(result, Err(PrefsError::DepthExceeded { limit: 8 })));
        assert_eq!(calls.get(), 16);
        assert_eq!(prefs.depth(), 0);
    }

    #[test]
    fn test_obj_to_buffer() {
        let mut prefs = prefs();
        let text = prefs.obj_to_buffer("point", &Point { x: 3, y: 4 }, &mut ()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tag"], "point");
        assert_eq!(value["properties"]["x"], "3");
    }

    #[test]
    fn test_obj_to_storage() {
        let mut prefs = prefs();
        let storage = MemoryStorage::new();
        prefs
            .obj_to_storage(&storage, "point", &Point { x: 3, y: 4 }, "p", &mut ())
            .unwrap();
        assert!(storage.exists("p"));

        // failed snapshot does not write
        let result = prefs.obj_to_storage(&storage, "broken", &Point { x: 0, y: 0 }, "b", &mut ());
        assert!(result.is_err());
        assert!(!storage.exists("b"));

        let result = prefs.obj_to_storage(&storage, "point", &Point { x: 0, y: 0 }, "", &mut ());
        assert!(matches!(result, Err(PrefsError::NullArgument(_))));
    }
}
