/*!
Class and object registries of a context.

Both registries keep their entries in a generation-checked [`SlotTable`]
with a hashed index on top: class names for the class registry, object
addresses for the object registry.
*/

pub mod class;
pub mod object;
pub mod slots;

pub use class::{validate_class_name, MAX_CLASS_NAME};
pub use slots::SlotKey;

pub(crate) use class::ClassRegistry;
pub(crate) use object::ObjectRegistry;
pub(crate) use slots::SlotTable;
