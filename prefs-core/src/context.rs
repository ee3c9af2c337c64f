/*!
The preferences context.

[`Prefs`] owns everything one user of the library registers: the class
registry, the object registry, the adapters used to encode and store
documents, and the document parsed by the last restore. Contexts are fully
independent of each other; there is no process-wide state.

Lifecycle:

1. [`Prefs::new`] / [`Prefs::with_config`]
2. [`Prefs::register_class`] for every class before using it
3. [`Prefs::register_object`] for objects that shall be tracked
4. snapshot (`obj_to_*`) and restore (`obj_from_*`)
5. [`Prefs::unregister_object`] before freeing a tracked object
6. [`Prefs::unregister_class`] when a class is not used anymore
7. [`Prefs::exit`] (or drop) - anything still registered is released with a warning

A context is single-threaded (`!Send`): class callbacks receive `&mut Prefs`
and re-enter it for child objects. Nested calls are limited to
`PrefsConfig::max_depth`; cycles between child objects are not detected
otherwise.
*/

use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::class::{ClassAdapter, ErasedClass};
use crate::codec::{JsonCodec, NodeCodec};
use crate::compression::{self, CompressionAdapter};
use crate::config::PrefsConfig;
use crate::registry::{ClassRegistry, ObjectRegistry, SlotKey};
use crate::{Node, PrefsClass, PrefsError, Result};

#[cfg(feature = "metrics")]
use crate::observability::PrefsMetrics;

/// Address used to identify a caller object
pub(crate) fn address_of<T: ?Sized>(object: &T) -> usize {
    object as *const T as *const () as usize
}

/// Address of the value an `Rc` points to, as used for registration
pub(crate) fn rc_address<T: ?Sized>(object: &Rc<T>) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

/// Preferences context holding registered classes and objects
///
/// `U` is the type of the user data handed to every class callback.
pub struct Prefs<U = ()> {
    pub(crate) config: PrefsConfig,
    pub(crate) classes: ClassRegistry<U>,
    pub(crate) objects: ObjectRegistry,
    pub(crate) document: Option<Node>,
    pub(crate) codec: Box<dyn NodeCodec>,
    pub(crate) compressor: Box<dyn CompressionAdapter>,
    depth: usize,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: PrefsMetrics,
}

impl<U> Prefs<U> {
    /// Create a context with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(PrefsConfig::default())
    }

    /// Create a context from a configuration
    ///
    /// # Errors
    /// * `PrefsError::Validation` - If the configuration is invalid
    pub fn with_config(config: PrefsConfig) -> Result<Self> {
        config.validate()?;
        let codec = Box::new(JsonCodec::with_pretty(config.pretty));
        let compressor = compression::adapter_for(config.compression, config.compression_level);
        Self::with_adapters(config, codec, compressor)
    }

    /// Create a context with explicit codec and compression adapters
    pub fn with_adapters(
        config: PrefsConfig,
        codec: Box<dyn NodeCodec>,
        compressor: Box<dyn CompressionAdapter>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            version = crate::VERSION,
            format = codec.format_name(),
            compression = compressor.algorithm_name(),
            "Initialized preferences context"
        );

        Ok(Self {
            classes: ClassRegistry::new(config.slot_batch),
            objects: ObjectRegistry::new(config.slot_batch),
            document: None,
            codec,
            compressor,
            depth: 0,
            #[cfg(feature = "metrics")]
            metrics: PrefsMetrics::new()?,
            config,
        })
    }

    /// Configuration of this context
    pub fn config(&self) -> &PrefsConfig {
        &self.config
    }

    /// Tear down the context
    ///
    /// Every class and object still registered is released and reported as
    /// a warning. Objects themselves are never dropped by the context.
    pub fn exit(mut self) {
        self.release_all();
    }

    fn release_all(&mut self) {
        for (key, entry) in self.classes.drain() {
            let orphaned = self.objects.remove_class(key);
            warn!(
                class = %entry.name,
                objects = orphaned,
                "Releasing class that is still registered"
            );
        }

        let orphaned = self.objects.clear();
        if orphaned > 0 {
            warn!(objects = orphaned, "Released objects without a class");
        }

        self.document = None;
    }

    // ----- classes -----

    /// Register a class under `name`
    ///
    /// # Errors
    /// * `PrefsError::InvalidName` - If `name` is empty or longer than `MAX_CLASS_NAME`
    /// * `PrefsError::DuplicateClass` - If `name` is already registered
    /// * `PrefsError::SlotExhausted` - If the registry cannot grow
    pub fn register_class<C>(&mut self, name: &str, class: C) -> Result<()>
    where
        C: PrefsClass<U>,
    {
        let handler: Rc<dyn ErasedClass<U>> = Rc::new(ClassAdapter(class));
        match self.classes.register(name, handler) {
            Ok(_) => {
                debug!(class = %name, object_type = type_name::<C::Object>(), "Registered class");
                Ok(())
            }
            Err(e) => {
                error!(class = %name, error = %e, "Failed to register class");
                Err(e)
            }
        }
    }

    /// Unregister a class and forget every object registered under it
    ///
    /// Returns the number of live objects that were orphaned; entries of
    /// objects dropped in the meantime are not counted. Unknown classes are
    /// logged and ignored.
    pub fn unregister_class(&mut self, name: &str) -> usize {
        let Some((key, _entry)) = self.classes.unregister(name) else {
            error!(class = %name, "Tried to unregister class that is not registered");
            return 0;
        };

        let orphaned = self.objects.remove_class(key);
        if orphaned > 0 {
            debug!(class = %name, objects = orphaned, "Deallocated object entries of class");
        }
        orphaned
    }

    /// Whether a class is registered under `name`
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.find(name).is_some()
    }

    /// Names of all registered classes
    pub fn class_names(&self) -> Vec<String> {
        self.classes.names()
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub(crate) fn resolve_class(&self, name: &str) -> Result<(SlotKey, Rc<dyn ErasedClass<U>>)> {
        match self.classes.find(name) {
            Some((key, entry)) => Ok((key, Rc::clone(&entry.handler))),
            None => {
                error!(class = %name, "Unknown class");
                Err(PrefsError::UnknownClass(name.to_string()))
            }
        }
    }

    // ----- objects -----

    /// Register a live object under `class_name`
    ///
    /// The context keeps only a weak reference; ownership stays with the
    /// caller.
    ///
    /// # Errors
    /// * `PrefsError::UnknownClass` - If the class is not registered
    /// * `PrefsError::TypeMismatch` - If the class works on another object type
    /// * `PrefsError::DuplicateObject` - If the object is registered already (under any class)
    pub fn register_object<T: Any>(&mut self, class_name: &str, object: &Rc<T>) -> Result<()> {
        let erased: Rc<dyn Any> = object.clone();
        self.register_erased(class_name, &erased, TypeId::of::<T>(), type_name::<T>())
            .map(|_| ())
    }

    pub(crate) fn register_erased(
        &mut self,
        class_name: &str,
        object: &Rc<dyn Any>,
        type_id: TypeId,
        object_type: &'static str,
    ) -> Result<SlotKey> {
        let (class_key, handler) = self.resolve_class(class_name)?;
        if handler.object_type() != type_id {
            error!(class = %class_name, object_type, "Object type does not match class");
            return Err(PrefsError::TypeMismatch {
                class: class_name.to_string(),
                expected: handler.object_type_name(),
            });
        }

        let address = rc_address(object);
        if let Some((key, entry)) = self.objects.find(address) {
            if entry.is_alive() {
                let owner = self.class_name_of_key(entry.class);
                error!(class = %class_name, owner = %owner, "Object already registered");
                return Err(PrefsError::DuplicateObject { class: owner });
            }
            debug!(class = %class_name, "Reclaiming stale object entry");
            self.objects.remove(key);
        }

        self.objects
            .insert(class_key, Rc::downgrade(object), type_id, address)
            .map_err(|e| {
                error!(class = %class_name, error = %e, "Failed to allocate object slot");
                e
            })
    }

    /// Unregister an object
    ///
    /// Unknown objects, or objects registered under another class, are
    /// logged and ignored. The object itself is not touched.
    pub fn unregister_object<T: Any>(&mut self, class_name: &str, object: &Rc<T>) {
        let Some((key, entry)) = self.objects.find_alive(rc_address(object), TypeId::of::<T>()) else {
            error!(class = %class_name, "Object not found");
            return;
        };

        let owner = self.class_name_of_key(entry.class);
        if owner != class_name {
            error!(class = %class_name, owner = %owner, "Object is registered under another class");
            return;
        }
        self.objects.remove(key);
    }

    /// Whether `object` is registered (and still alive)
    pub fn is_registered<T: Any>(&self, object: &Rc<T>) -> bool {
        self.objects
            .find_alive(rc_address(object), TypeId::of::<T>())
            .is_some()
    }

    /// Name of the class `object` is registered under
    pub fn class_of<T: Any>(&self, object: &Rc<T>) -> Option<String> {
        self.objects
            .find_alive(rc_address(object), TypeId::of::<T>())
            .and_then(|(_, entry)| self.classes.get(entry.class))
            .map(|class| class.name.clone())
    }

    /// Node last produced or consumed for `object`, if that node is still alive
    pub fn node_of<T: Any>(&self, object: &Rc<T>) -> Option<Node> {
        self.objects
            .find_alive(rc_address(object), TypeId::of::<T>())
            .and_then(|(_, entry)| entry.node.upgrade())
    }

    /// Drop the entries of registered objects that have been dropped
    ///
    /// Returns how many entries were removed. Stale entries are also swept
    /// automatically as the registry grows.
    pub fn purge_stale_objects(&mut self) -> usize {
        self.objects.sweep()
    }

    /// Number of live registered objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live objects registered under `class_name`
    pub fn objects_in_class(&self, class_name: &str) -> usize {
        match self.classes.find(class_name) {
            Some((key, _)) => self.objects.count_class(key),
            None => 0,
        }
    }

    fn class_name_of_key(&self, key: SlotKey) -> String {
        self.classes
            .get(key)
            .map(|class| class.name.clone())
            .unwrap_or_default()
    }

    // ----- document anchor -----

    /// Root of the document parsed by the last successful restore or parse
    pub fn document(&self) -> Option<&Node> {
        self.document.as_ref()
    }

    /// Release the current document
    ///
    /// Nodes of the document that nobody else holds die with it; registry
    /// references to them read as absent afterwards.
    pub fn release_document(&mut self) {
        self.document = None;
    }

    pub(crate) fn anchor_document(&mut self, root: Node) {
        if self.document.replace(root).is_some() {
            debug!("Replaced previous document");
        }
    }

    // ----- recursion guard -----

    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            error!(limit = self.config.max_depth, "Recursion depth limit exceeded");
            return Err(PrefsError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current nesting of snapshot/restore calls
    pub fn depth(&self) -> usize {
        self.depth
    }

    // ----- metrics -----

    /// Metrics collected by this context
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> &PrefsMetrics {
        &self.metrics
    }

    pub(crate) fn record_snapshot(&self) {
        #[cfg(feature = "metrics")]
        self.metrics.snapshots_total.inc();
    }

    pub(crate) fn record_restore(&self) {
        #[cfg(feature = "metrics")]
        self.metrics.restores_total.inc();
    }

    pub(crate) fn record_callback_failure(&self) {
        #[cfg(feature = "metrics")]
        self.metrics.callback_failures_total.inc();
    }

    pub(crate) fn record_document_size(&self, bytes: usize) {
        #[cfg(feature = "metrics")]
        self.metrics.document_bytes.observe(bytes as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = bytes;
    }
}

impl<U> Drop for Prefs<U> {
    fn drop(&mut self) {
        self.release_all();
    }
}
