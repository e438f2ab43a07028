//! The [`Reflect`] trait and the descriptor registry.
//!
//! Every materialization target exposes its descriptor through
//! [`Reflect::descriptor`]. Scalars have `static` descriptors;
//! `Vec<T>`, `Option<T>`, and structs build theirs on first use and
//! intern them in a registry keyed by [`TypeId`], so each target type is
//! described exactly once per process.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use crate::descriptor::{
    ArrayShape, AssignError, Instance, OptionalShape, ScalarShape, Shape, TypeDescriptor,
    assemble_vec, downcast,
};

/// A type the materializer can produce.
pub trait Reflect: Any + Sized {
    /// The descriptor for this type.
    fn descriptor() -> &'static TypeDescriptor;
}

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, &'static TypeDescriptor>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Intern the descriptor for `T`, building it on first use.
///
/// The builder runs outside the registry lock so descriptors of nested
/// types can be built recursively. Self-referential types are not
/// supported (the object graph is a tree).
pub fn register<T: 'static>(build: impl FnOnce() -> TypeDescriptor) -> &'static TypeDescriptor {
    let id = TypeId::of::<T>();
    if let Ok(registry) = REGISTRY.read()
        && let Some(descriptor) = registry.get(&id)
    {
        return *descriptor;
    }

    let built: &'static TypeDescriptor = Box::leak(Box::new(build()));
    match REGISTRY.write() {
        // A racing build may have gotten there first; its copy stays
        // canonical and ours becomes garbage.
        Ok(mut registry) => *registry.entry(id).or_insert(built),
        Err(_) => built,
    }
}

macro_rules! scalar_reflect {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> &'static TypeDescriptor {
                    static DESCRIPTOR: TypeDescriptor = TypeDescriptor {
                        name: $name,
                        shape: Shape::Scalar(ScalarShape::$variant),
                    };
                    &DESCRIPTOR
                }
            }
        )*
    };
}

scalar_reflect! {
    bool => Bool, "bool";
    i8 => I8, "i8";
    i16 => I16, "i16";
    i32 => I32, "i32";
    i64 => I64, "i64";
    u8 => U8, "u8";
    u16 => U16, "u16";
    u32 => U32, "u32";
    u64 => U64, "u64";
    f32 => F32, "f32";
    f64 => F64, "f64";
    String => Str, "String";
}

impl<T: Reflect> Reflect for Vec<T> {
    fn descriptor() -> &'static TypeDescriptor {
        register::<Vec<T>>(|| TypeDescriptor {
            name: std::any::type_name::<Vec<T>>(),
            shape: Shape::Array(ArrayShape {
                element: Some(T::descriptor()),
                assemble: Some(assemble_vec::<T>),
            }),
        })
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn descriptor() -> &'static TypeDescriptor {
        register::<Option<T>>(|| TypeDescriptor {
            name: std::any::type_name::<Option<T>>(),
            shape: Shape::Optional(OptionalShape {
                inner: T::descriptor(),
                some: wrap_some::<T>,
                none: none_of::<T>,
            }),
        })
    }
}

fn wrap_some<T: 'static>(value: Instance) -> Result<Instance, AssignError> {
    let value = downcast::<T>(value)?;
    Ok(Box::new(Some(value)))
}

fn none_of<T: 'static>() -> Instance {
    Box::new(None::<T>)
}

/// Implement [`Reflect`] for a struct with named fields.
///
/// The struct must be `Default` (absent document keys keep their default
/// value). Append `[deferred]` to an array field whose element type the
/// instance factory decides:
///
/// ```
/// use smelt_cast::reflect_struct;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Weather {
///     id: u32,
///     icon: String,
/// }
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Report {
///     weather: Vec<Weather>,
///     visibility: u32,
/// }
///
/// reflect_struct!(Weather { id: u32, icon: String });
/// reflect_struct!(Report { weather: Vec<Weather> [deferred], visibility: u32 });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($ty:ident { $($field:ident : $fty:ty $([$mode:ident])?),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn descriptor() -> &'static $crate::TypeDescriptor {
                $crate::register::<$ty>(|| $crate::TypeDescriptor {
                    name: stringify!($ty),
                    shape: $crate::Shape::Object($crate::ObjectShape {
                        construct: || Box::new(<$ty as Default>::default()),
                        fields: vec![
                            $(
                                $crate::FieldDescriptor {
                                    name: stringify!($field),
                                    ty: $crate::reflect_struct!(@field_ty $fty $(, $mode)?),
                                    assign: |target, value| {
                                        let target = target
                                            .downcast_mut::<$ty>()
                                            .ok_or($crate::AssignError::new(stringify!($ty)))?;
                                        target.$field = $crate::downcast::<$fty>(value)?;
                                        Ok(())
                                    },
                                },
                            )*
                        ],
                    }),
                })
            }
        }
    };

    (@field_ty $fty:ty) => {
        <$fty as $crate::Reflect>::descriptor()
    };
    (@field_ty $fty:ty, deferred) => {
        &$crate::DEFERRED_ARRAY
    };
}
