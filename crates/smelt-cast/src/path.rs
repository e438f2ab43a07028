//! Canonical structural paths.
//!
//! A path names a position in the document by shape, not by instance:
//! two nodes reachable through structurally identical descents get the
//! same path, which is what lets a factory reason about "the elements of
//! the weather array" as one thing.

/// The path of the document root.
pub const ROOT: &str = "/";

/// Path of the field `name` within the object at `parent`.
pub fn field(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Path shared by every element of the array field `name` within the
/// object at `parent`.
///
/// The join is deliberately not root-guarded: elements of a root-level
/// array live under a doubled slash (`//weather`), matching the paths a
/// factory is written against.
pub fn element(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}
