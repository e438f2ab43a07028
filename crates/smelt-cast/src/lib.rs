//! Schema-driven materialization of typed values from JSON.
//!
//! A document is parsed into a token tree ([`smelt_tree::Value`]), then a
//! [`TypeDescriptor`] drives the recursive binding of tree nodes to the
//! fields of a target type. Whenever static type information is not
//! enough to decide an allocation (how many elements an array holds,
//! what concrete type an ambiguous element has), a caller-supplied
//! [`InstanceFactory`] is consulted, keyed by structural path.
//!
//! # Deserialization example
//!
//! ```
//! use smelt_cast::{from_str, reflect_struct};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Config {
//!     name: String,
//!     port: u16,
//! }
//!
//! reflect_struct!(Config { name: String, port: u16 });
//!
//! let config: Config = from_str(r#"{"name": "myapp", "port": 8080}"#).unwrap();
//! assert_eq!(config.name, "myapp");
//! assert_eq!(config.port, 8080);
//! ```
//!
//! # Resolving an ambiguous array
//!
//! ```
//! use smelt_cast::{
//!     Allocation, FnFactory, Reflect, Resolution, assemble_vec, from_str_with, reflect_struct,
//! };
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Weather {
//!     id: u32,
//!     icon: String,
//! }
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Report {
//!     weather: Vec<Weather>,
//! }
//!
//! reflect_struct!(Weather { id: u32, icon: String });
//! reflect_struct!(Report { weather: Vec<Weather> [deferred] });
//!
//! let mut factory = FnFactory(|request: &Allocation<'_>| {
//!     match (request.path, request.field_name) {
//!         // Allocate the container for the root-level weather array.
//!         ("/", "weather") => Some(Resolution::Collection {
//!             assemble: assemble_vec::<Weather>,
//!         }),
//!         // Allocate one element to be placed inside that array.
//!         ("//weather", _) => Some(Resolution::Instance {
//!             value: Box::new(Weather::default()),
//!             ty: Weather::descriptor(),
//!         }),
//!         _ => None,
//!     }
//! });
//!
//! let report: Report =
//!     from_str_with(r#"{"weather": [{"id": 800, "icon": "01d"}]}"#, &mut factory).unwrap();
//! assert_eq!(report.weather[0].id, 800);
//! ```

mod descriptor;
mod error;
mod factory;
mod materialize;
pub mod path;
mod reflect;
mod tracing_macros;

#[cfg(test)]
mod tests;

pub use descriptor::{
    ArrayShape, Assembler, AssignError, DEFERRED_ARRAY, FieldDescriptor, Instance, ObjectShape,
    OptionalShape, ScalarShape, Shape, TypeDescriptor, assemble_vec, downcast,
};
pub use error::CastError;
pub use factory::{Allocation, FnFactory, InstanceFactory, NoFactory, Resolution};
pub use materialize::materialize;
pub use reflect::{Reflect, register};
pub use smelt_tree::Value;

/// Deserialize a typed value from JSON text, with no factory.
///
/// Every allocation must be decidable from descriptors alone; a schema
/// with deferred arrays will fail with
/// [`CastError::UnresolvedAmbiguity`].
pub fn from_str<T: Reflect>(source: &str) -> Result<T, CastError> {
    from_str_with(source, &mut NoFactory)
}

/// Deserialize a typed value from JSON text, consulting `factory` for
/// allocations the descriptors cannot decide.
pub fn from_str_with<T: Reflect>(
    source: &str,
    factory: &mut dyn InstanceFactory,
) -> Result<T, CastError> {
    let value = smelt_tree::parse(source)?;
    cast_with(&value, factory)
}

/// Materialize a typed value from an already-parsed tree.
pub fn cast<T: Reflect>(value: &Value) -> Result<T, CastError> {
    cast_with(value, &mut NoFactory)
}

/// Materialize a typed value from an already-parsed tree, consulting
/// `factory`.
pub fn cast_with<T: Reflect>(
    value: &Value,
    factory: &mut dyn InstanceFactory,
) -> Result<T, CastError> {
    let instance = materialize(value, T::descriptor(), factory)?;
    downcast::<T>(instance).map_err(|e| CastError::Descriptor {
        path: path::ROOT.to_string(),
        detail: e.to_string(),
    })
}
