/*!
Restore: buffer/file -> node -> object.

Objects produced by a class's `to_object` callback are registered with the
context and remember the node they were created from. Documents parsed by the
buffer, file and storage variants stay anchored in the context until the next
successful restore replaces them.
*/

use std::any::{Any, TypeId};
use std::rc::Rc;

use tracing::{debug, error};

use crate::context::rc_address;
use crate::registry::SlotKey;
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{Node, Prefs, PrefsError, Result};

impl<U> Prefs<U> {
    /// Create a new object from `node`
    ///
    /// The node's tag selects the class. A produced object is registered
    /// under that class with `node` as its node. A callback returning no
    /// object yields `Ok(None)`.
    ///
    /// # Errors
    /// * `PrefsError::UnknownClass` - If no class is registered for the tag
    /// * `PrefsError::MissingCallback` - If the class cannot be restored
    /// * `PrefsError::CallbackFailed` - If the callback failed
    /// * `PrefsError::DuplicateObject` - If the object is registered under another class
    /// * `PrefsError::DepthExceeded` - If nested calls exceed `max_depth`
    pub fn obj_from_node(&mut self, node: &Node, user: &mut U) -> Result<Option<Rc<dyn Any>>> {
        let class_name = node.tag();
        let (class_key, handler) = self.resolve_class(&class_name)?;

        self.enter()?;
        let result = handler.to_object(self, node, user);
        self.leave();

        let object = match result {
            Ok(Some(object)) => object,
            Ok(None) => {
                debug!(class = %class_name, "to_object() returned no object");
                return Ok(None);
            }
            Err(e) => {
                self.record_callback_failure();
                error!(class = %class_name, error = %e, "to_object() failed");
                return Err(PrefsError::callback_failed(&class_name, e));
            }
        };

        let key = self.track_restored(&class_name, class_key, &object)?;
        self.objects.set_node(key, node.downgrade());
        self.record_restore();

        debug!(class = %class_name, "Created object from node");
        Ok(Some(object))
    }

    /// Like [`Prefs::obj_from_node`], returning the concrete object type
    ///
    /// # Errors
    /// * `PrefsError::TypeMismatch` - If the tag's class does not produce `T`;
    ///   checked before the callback runs
    pub fn obj_from_node_as<T: Any>(&mut self, node: &Node, user: &mut U) -> Result<Option<Rc<T>>> {
        let class_name = node.tag();
        let (_, handler) = self.resolve_class(&class_name)?;
        if handler.object_type() != TypeId::of::<T>() {
            error!(class = %class_name, expected = handler.object_type_name(), "Requested type does not match class");
            return Err(PrefsError::TypeMismatch {
                class: class_name,
                expected: handler.object_type_name(),
            });
        }

        match self.obj_from_node(node, user)? {
            Some(object) => object.downcast::<T>().map(Some).map_err(|_| PrefsError::TypeMismatch {
                class: class_name,
                expected: handler.object_type_name(),
            }),
            None => Ok(None),
        }
    }

    /// Restore an object from text
    ///
    /// On success the parsed tree becomes the current document.
    pub fn obj_from_buffer(&mut self, text: &str, user: &mut U) -> Result<Option<Rc<dyn Any>>> {
        let root = self.parse_buffer(text)?;
        self.restore_root(root, |prefs, root| prefs.obj_from_node(root, user))
    }

    /// Typed variant of [`Prefs::obj_from_buffer`]
    pub fn obj_from_buffer_as<T: Any>(&mut self, text: &str, user: &mut U) -> Result<Option<Rc<T>>> {
        let root = self.parse_buffer(text)?;
        self.restore_root(root, |prefs, root| prefs.obj_from_node_as::<T>(root, user))
    }

    /// Restore an object from a file (decompressed as configured)
    pub fn obj_from_file(&mut self, path: &str, user: &mut U) -> Result<Option<Rc<dyn Any>>> {
        self.obj_from_storage(&LocalFileStorage::new(), path, user)
    }

    /// Typed variant of [`Prefs::obj_from_file`]
    pub fn obj_from_file_as<T: Any>(&mut self, path: &str, user: &mut U) -> Result<Option<Rc<T>>> {
        let root = self.load_document(&LocalFileStorage::new(), path)?;
        self.restore_root(root, |prefs, root| prefs.obj_from_node_as::<T>(root, user))
    }

    /// Restore an object from a storage adapter
    pub fn obj_from_storage<S>(&mut self, storage: &S, path: &str, user: &mut U) -> Result<Option<Rc<dyn Any>>>
    where
        S: StorageAdapter + ?Sized,
    {
        let root = self.load_document(storage, path)?;
        self.restore_root(root, |prefs, root| prefs.obj_from_node(root, user))
    }

    /// Parse text into a node tree without restoring any object
    ///
    /// The tree becomes the current document; the returned root shares it.
    pub fn node_from_buffer(&mut self, text: &str) -> Result<Node> {
        let root = self.parse_buffer(text)?;
        self.anchor_document(root.clone());
        Ok(root)
    }

    /// Parse a file into a node tree without restoring any object
    pub fn node_from_file(&mut self, path: &str) -> Result<Node> {
        self.node_from_storage(&LocalFileStorage::new(), path)
    }

    pub fn node_from_storage<S>(&mut self, storage: &S, path: &str) -> Result<Node>
    where
        S: StorageAdapter + ?Sized,
    {
        let root = self.load_document(storage, path)?;
        self.anchor_document(root.clone());
        Ok(root)
    }

    fn parse_buffer(&self, text: &str) -> Result<Node> {
        if text.is_empty() {
            return Err(PrefsError::NullArgument("buffer"));
        }
        self.codec.decode(text).map_err(|e| {
            error!(format = self.codec.format_name(), error = %e, "Failed to parse document");
            e
        })
    }

    fn load_document<S>(&self, storage: &S, path: &str) -> Result<Node>
    where
        S: StorageAdapter + ?Sized,
    {
        if path.is_empty() {
            return Err(PrefsError::NullArgument("path"));
        }

        let data = storage.load(path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to load document");
            e
        })?;
        let data = self.compressor.decompress(&data)?;
        let text = String::from_utf8(data)
            .map_err(|e| PrefsError::parse(format!("{path}: document is not valid UTF-8: {e}")))?;

        debug!(path = %path, size = text.len(), "Loaded document");
        self.parse_buffer(&text)
    }

    /// Run `restore` on a parsed root, anchoring the tree only on success
    fn restore_root<R, F>(&mut self, root: Node, restore: F) -> Result<R>
    where
        F: FnOnce(&mut Self, &Node) -> Result<R>,
    {
        let restored = restore(self, &root)?;
        self.anchor_document(root);
        Ok(restored)
    }

    fn track_restored(&mut self, class_name: &str, class_key: SlotKey, object: &Rc<dyn Any>) -> Result<SlotKey> {
        let type_id = Any::type_id(&**object);
        if let Some((key, entry)) = self.objects.find_alive(rc_address(object), type_id) {
            if entry.class == class_key {
                return Ok(key);
            }
            let owner = self
                .classes
                .get(entry.class)
                .map(|class| class.name.clone())
                .unwrap_or_default();
            error!(class = %class_name, owner = %owner, "Restored object is registered under another class");
            return Err(PrefsError::DuplicateObject { class: owner });
        }

        self.register_erased(class_name, object, type_id, "restored object")
    }
}
