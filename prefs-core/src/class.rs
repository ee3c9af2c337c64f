/*!
Class callbacks.

A class tells the engine how to convert one kind of caller object to a node
and back. Both directions are optional: a class that only ever gets restored
implements [`PrefsClass::to_object`], one that only ever gets snapshotted
implements [`PrefsClass::from_object`]. Calling the direction a class does not
implement fails with `PrefsError::MissingCallback`.

Composite classes call back into the context (`obj_to_node` /
`obj_from_node`) for their children, threading `user` through unchanged.

# Example
```rust
use std::rc::Rc;
use prefs_core::{Node, Prefs, PrefsClass, Result};

struct Person {
    name: String,
    age: i64,
}

struct PersonClass;

impl PrefsClass for PersonClass {
    type Object = Person;

    fn from_object(&self, _: &mut Prefs, node: &Node, person: &Person, _: &mut ()) -> Result<()> {
        node.set_string("name", person.name.as_str());
        node.set_int("age", person.age);
        Ok(())
    }

    fn to_object(&self, _: &mut Prefs, node: &Node, _: &mut ()) -> Result<Option<Rc<Person>>> {
        Ok(Some(Rc::new(Person {
            name: node.get_string("name")?,
            age: node.get_int("age")?,
        })))
    }
}

let mut prefs = Prefs::new()?;
prefs.register_class("person", PersonClass)?;

let bob = Rc::new(Person { name: "Bob".into(), age: 30 });
let text = prefs.obj_to_buffer("person", bob.as_ref(), &mut ())?;
let restored = prefs.obj_from_buffer_as::<Person>(&text, &mut ())?.unwrap();
assert_eq!(restored.name, "Bob");
# Ok::<(), prefs_core::PrefsError>(())
```
*/

use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

use crate::{Direction, Node, Prefs, PrefsError, Result};

/// Conversion callbacks of one class of objects
///
/// `U` is the user data type threaded through every callback of a context.
pub trait PrefsClass<U = ()>: 'static {
    /// Type of the objects this class converts
    type Object: Any;

    /// Populate `node` (already tagged with the class name) from `object`
    fn from_object(
        &self,
        prefs: &mut Prefs<U>,
        node: &Node,
        object: &Self::Object,
        user: &mut U,
    ) -> Result<()> {
        let _ = (prefs, node, object, user);
        Err(PrefsError::MissingCallback {
            class: String::new(),
            direction: Direction::Snapshot,
        })
    }

    /// Create a new object from `node`
    ///
    /// Returning `Ok(None)` is not an error; nothing gets registered.
    fn to_object(
        &self,
        prefs: &mut Prefs<U>,
        node: &Node,
        user: &mut U,
    ) -> Result<Option<Rc<Self::Object>>> {
        let _ = (prefs, node, user);
        Err(PrefsError::MissingCallback {
            class: String::new(),
            direction: Direction::Restore,
        })
    }
}

/// Type-erased view of a [`PrefsClass`] stored in the class registry
pub(crate) trait ErasedClass<U> {
    fn object_type(&self) -> TypeId;

    fn object_type_name(&self) -> &'static str;

    fn from_object(
        &self,
        prefs: &mut Prefs<U>,
        node: &Node,
        object: &dyn Any,
        user: &mut U,
    ) -> Result<()>;

    fn to_object(&self, prefs: &mut Prefs<U>, node: &Node, user: &mut U)
        -> Result<Option<Rc<dyn Any>>>;
}

pub(crate) struct ClassAdapter<C>(pub(crate) C);

impl<U, C> ErasedClass<U> for ClassAdapter<C>
where
    C: PrefsClass<U>,
{
    fn object_type(&self) -> TypeId {
        TypeId::of::<C::Object>()
    }

    fn object_type_name(&self) -> &'static str {
        type_name::<C::Object>()
    }

    fn from_object(
        &self,
        prefs: &mut Prefs<U>,
        node: &Node,
        object: &dyn Any,
        user: &mut U,
    ) -> Result<()> {
        let object = object
            .downcast_ref::<C::Object>()
            .ok_or_else(|| PrefsError::TypeMismatch {
                class: node.tag(),
                expected: type_name::<C::Object>(),
            })?;
        self.0.from_object(prefs, node, object, user)
    }

    fn to_object(
        &self,
        prefs: &mut Prefs<U>,
        node: &Node,
        user: &mut U,
    ) -> Result<Option<Rc<dyn Any>>> {
        let object = self.0.to_object(prefs, node, user)?;
        Ok(object.map(|o| o as Rc<dyn Any>))
    }
}
