//! The instance factory protocol.
//!
//! Static descriptors cannot express "this array holds N elements of a
//! type only the document reveals". Rather than growing the descriptor
//! language, the materializer defers exactly that decision to a
//! caller-supplied [`InstanceFactory`], keyed purely by structural path.

use smelt_tree::Value;

use crate::descriptor::{Assembler, Instance, TypeDescriptor};

/// One allocation request presented to the factory.
///
/// The factory is expected to be deterministic with respect to
/// `(path, len)`; the materializer does not enforce this, but its own
/// behavior is only predictable if it holds.
#[derive(Debug)]
pub struct Allocation<'a> {
    /// Canonical structural path of the allocation site (see
    /// [`crate::path`]).
    pub path: &'a str,
    /// Root of the document being materialized, for factories that need
    /// to inspect structures not known at compile time.
    pub root: &'a Value,
    /// The statically declared type, when the descriptor knows it.
    /// Absent exactly when an array element is being allocated.
    pub static_type: Option<&'static TypeDescriptor>,
    /// Field name of the value within its parent object; empty for the
    /// document root and for array elements.
    pub field_name: &'a str,
    /// `Some(n)`: allocate an array container with `n` slots.
    /// `None`: allocate a single instance (an object, or one element to
    /// be placed inside an array).
    pub len: Option<usize>,
}

/// A factory's answer to an allocation request.
pub enum Resolution {
    /// A ready instance, plus the descriptor the materializer should use
    /// to populate it. Ownership of the instance transfers to the result
    /// graph.
    Instance {
        /// The allocated value.
        value: Instance,
        /// Describes how to fill it.
        ty: &'static TypeDescriptor,
    },
    /// For container requests: how to turn the materialized elements
    /// into the concrete collection.
    Collection {
        /// The collection assembler.
        assemble: Assembler,
    },
}

/// Resolves allocations the descriptors cannot decide alone.
///
/// Invoked strictly sequentially, in document order: at most once per
/// array container (with the element count), at most once per array
/// element (all elements of one array share a path), once per object
/// node, and never for scalar fields. Any instance it returns is handed
/// over before anything is assigned into it.
pub trait InstanceFactory {
    /// Resolve an allocation request, or decline with `None` to let
    /// descriptor-driven defaults apply.
    fn create_instance(&mut self, request: &Allocation<'_>) -> Option<Resolution>;
}

/// The factory with no opinions: every request is declined.
pub struct NoFactory;

impl InstanceFactory for NoFactory {
    fn create_instance(&mut self, _request: &Allocation<'_>) -> Option<Resolution> {
        None
    }
}

/// Adapts a closure into an [`InstanceFactory`].
pub struct FnFactory<F>(pub F);

impl<F> InstanceFactory for FnFactory<F>
where
    F: FnMut(&Allocation<'_>) -> Option<Resolution>,
{
    fn create_instance(&mut self, request: &Allocation<'_>) -> Option<Resolution> {
        (self.0)(request)
    }
}
