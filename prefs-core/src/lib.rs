/*!
# Prefs Core

Lightweight preference persistence: snapshot live objects into a tree of
named nodes, store the tree as a document, and later restore new objects from
it.

This crate provides:

- A class registry mapping class names to conversion callbacks ([`PrefsClass`])
- An object registry tracking live objects and the node they came from
- Snapshot (object -> node -> buffer/file) and restore (file/buffer -> node -> object)
- Pluggable codec, compression and storage adapters

## Architecture

Everything lives in a [`Prefs`] context; there is no global state. Class
callbacks receive the context and call back into it for child objects, so an
object graph maps onto a node tree with one node per object. Documents are
JSON, optionally gzip-compressed.

## Usage

```rust
use std::rc::Rc;
use prefs_core::{Node, Prefs, PrefsClass, Result};

struct Volume(i64);

struct VolumeClass;

impl PrefsClass for VolumeClass {
    type Object = Volume;

    fn from_object(&self, _: &mut Prefs, node: &Node, volume: &Volume, _: &mut ()) -> Result<()> {
        node.set_int("level", volume.0);
        Ok(())
    }

    fn to_object(&self, _: &mut Prefs, node: &Node, _: &mut ()) -> Result<Option<Rc<Volume>>> {
        Ok(Some(Rc::new(Volume(node.get_int("level")?))))
    }
}

assert!(prefs_core::check_version!());

let mut prefs = Prefs::new()?;
prefs.register_class("volume", VolumeClass)?;

let text = prefs.obj_to_buffer("volume", &Volume(11), &mut ())?;
let volume = prefs.obj_from_buffer_as::<Volume>(&text, &mut ())?.unwrap();
assert_eq!(volume.0, 11);
# Ok::<(), prefs_core::PrefsError>(())
```
*/

pub mod class;
pub mod codec;
pub mod compression;
pub mod config;
pub mod context;
pub mod error;
pub mod node;
pub mod observability;
pub mod registry;
pub mod restore;
pub mod snapshot;
pub mod storage;
pub mod version;

#[cfg(test)]
mod error_tests;

pub use class::PrefsClass;
pub use codec::{JsonCodec, NodeCodec};
pub use compression::{CompressionAdapter, GzipCompressor, NoCompression};
pub use config::{CompressionKind, PrefsConfig};
pub use context::Prefs;
pub use error::{Direction, PrefsError, Result};
pub use node::{Node, WeakNode};
pub use observability::{init_logging, init_observability};
pub use registry::{validate_class_name, MAX_CLASS_NAME};
pub use storage::{LocalFileStorage, MemoryStorage, StorageAdapter};
pub use version::{is_compatible, VERSION, VERSION_MAJOR, VERSION_MICRO, VERSION_MINOR};

#[cfg(feature = "metrics")]
pub use observability::PrefsMetrics;
