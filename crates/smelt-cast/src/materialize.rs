//! The materializer: recursive binding of tree nodes to descriptors.
//!
//! The algorithm walks the token tree and the target type's field layout
//! in lockstep. Wherever the descriptor alone cannot decide what to
//! allocate (array containers, array elements, overridable objects), the
//! instance factory is consulted first; declined requests fall back to
//! descriptor-driven defaults.

use smelt_parse::Number;
use smelt_tree::{Node, NodeKind, Object, Span, Value};

#[allow(unused_imports)]
use crate::trace;

use crate::descriptor::{
    ArrayShape, Assembler, Instance, ObjectShape, ScalarShape, Shape, TypeDescriptor,
};
use crate::error::CastError;
use crate::factory::{Allocation, InstanceFactory, Resolution};
use crate::path;

/// Materialize `value` against `ty`, consulting `factory` wherever the
/// descriptor alone cannot decide an allocation.
///
/// The call is fully synchronous and owns nothing across invocations;
/// the factory is invoked strictly sequentially, in document order.
pub fn materialize(
    value: &Value,
    ty: &'static TypeDescriptor,
    factory: &mut dyn InstanceFactory,
) -> Result<Instance, CastError> {
    let mut materializer = Materializer {
        root: value,
        factory,
    };
    materializer.node(value, ty, path::ROOT, "", true)
}

struct Materializer<'doc, 'f> {
    root: &'doc Value,
    factory: &'f mut dyn InstanceFactory,
}

impl Materializer<'_, '_> {
    /// Bind `value` against `ty`.
    ///
    /// `at` is the path of the containing object (`/` at the root, the
    /// shared element path inside arrays) and `name` the field name
    /// within it (empty for the root and for array elements). `consult`
    /// is false when the factory already declined this very allocation
    /// as an array element, so it is not asked twice.
    fn node(
        &mut self,
        value: &Value,
        ty: &'static TypeDescriptor,
        at: &str,
        name: &str,
        consult: bool,
    ) -> Result<Instance, CastError> {
        match &ty.shape {
            Shape::Scalar(scalar) => coerce_scalar(value, ty, *scalar, &own_path(at, name)),
            Shape::Optional(optional) => {
                if value.is_null() {
                    Ok((optional.none)())
                } else {
                    let inner = self.node(value, optional.inner, at, name, consult)?;
                    (optional.some)(inner).map_err(|e| CastError::Descriptor {
                        path: own_path(at, name),
                        detail: e.to_string(),
                    })
                }
            }
            Shape::Object(shape) => self.object(value, ty, shape, at, name, consult),
            Shape::Array(shape) => self.array(value, ty, shape, at, name),
        }
    }

    fn object(
        &mut self,
        value: &Value,
        ty: &'static TypeDescriptor,
        shape: &'static ObjectShape,
        at: &str,
        name: &str,
        consult: bool,
    ) -> Result<Instance, CastError> {
        let own = own_path(at, name);
        let Some(object) = value.as_object() else {
            return Err(mismatch(&own, ty.name, value));
        };

        // Obtain the instance: the factory may override the allocation
        // (and, for polymorphic members, the type), otherwise the
        // descriptor default-constructs.
        let (instance, shape) = if consult {
            let request = Allocation {
                path: &own,
                root: self.root,
                static_type: Some(ty),
                field_name: name,
                len: None,
            };
            match self.factory.create_instance(&request) {
                Some(Resolution::Instance {
                    value: provided,
                    ty: dynamic,
                }) => {
                    trace!("factory provided {} at {}", dynamic.name, own);
                    match &dynamic.shape {
                        Shape::Object(dynamic_shape) => (provided, dynamic_shape),
                        _ => {
                            return Err(CastError::Descriptor {
                                path: own,
                                detail: format!(
                                    "factory resolved {}, which is not an object type",
                                    dynamic.name
                                ),
                            });
                        }
                    }
                }
                Some(Resolution::Collection { .. }) => {
                    return Err(CastError::Descriptor {
                        path: own,
                        detail: "factory answered an object request with a collection".to_string(),
                    });
                }
                None => ((shape.construct)(), shape),
            }
        } else {
            ((shape.construct)(), shape)
        };

        self.fields(instance, shape, object, &own)
    }

    /// Populate declared fields from the object's entries. Missing keys
    /// keep the instance's default value; duplicate keys resolve
    /// last-occurrence-wins.
    fn fields(
        &mut self,
        mut instance: Instance,
        shape: &'static ObjectShape,
        object: &Object,
        own: &str,
    ) -> Result<Instance, CastError> {
        for field in &shape.fields {
            let Some(child) = object.get(field.name) else {
                continue;
            };
            let materialized = self.node(child, field.ty, own, field.name, true)?;
            (field.assign)(&mut *instance, materialized).map_err(|e| CastError::Descriptor {
                path: path::field(own, field.name),
                detail: e.to_string(),
            })?;
        }
        Ok(instance)
    }

    fn array(
        &mut self,
        value: &Value,
        ty: &'static TypeDescriptor,
        shape: &'static ArrayShape,
        at: &str,
        name: &str,
    ) -> Result<Instance, CastError> {
        let own = own_path(at, name);
        let Some(array) = value.as_array() else {
            return Err(mismatch(&own, ty.name, value));
        };

        // Container request: the element count is only known now that
        // the node is parsed.
        let request = Allocation {
            path: at,
            root: self.root,
            static_type: None,
            field_name: name,
            len: Some(array.len()),
        };
        let assemble: Option<Assembler> = match self.factory.create_instance(&request) {
            Some(Resolution::Collection { assemble }) => {
                trace!("factory assembles the container at {}", own);
                Some(assemble)
            }
            Some(Resolution::Instance { .. }) => {
                return Err(CastError::Descriptor {
                    path: own,
                    detail: "factory answered a container request with a single instance"
                        .to_string(),
                });
            }
            None => shape.assemble,
        };

        let element_path = path::element(at, name);
        let mut items: Vec<Instance> = Vec::with_capacity(array.len());
        for item in array.iter() {
            let request = Allocation {
                path: &element_path,
                root: self.root,
                static_type: None,
                field_name: "",
                len: None,
            };
            let materialized = match self.factory.create_instance(&request) {
                Some(Resolution::Instance {
                    value: provided,
                    ty: dynamic,
                }) => {
                    trace!("factory provided {} element at {}", dynamic.name, element_path);
                    self.provided(provided, dynamic, item, &element_path)?
                }
                Some(Resolution::Collection { .. }) => {
                    return Err(CastError::Descriptor {
                        path: element_path,
                        detail: "factory answered an element request with a collection"
                            .to_string(),
                    });
                }
                None => match shape.element {
                    // The factory already declined this allocation, so it
                    // is not consulted again while binding the element.
                    Some(element_ty) => self.node(item, element_ty, &element_path, "", false)?,
                    None => untyped_scalar(item, &element_path)?,
                },
            };
            items.push(materialized);
        }

        match assemble {
            Some(assemble) => assemble(items).map_err(|e| CastError::Descriptor {
                path: own,
                detail: e.to_string(),
            }),
            // Growable fallback: the elements as they are, in a plain Vec.
            None => Ok(Box::new(items)),
        }
    }

    /// Populate a factory-provided instance through its descriptor.
    fn provided(
        &mut self,
        instance: Instance,
        ty: &'static TypeDescriptor,
        value: &Value,
        at: &str,
    ) -> Result<Instance, CastError> {
        match &ty.shape {
            Shape::Object(shape) => {
                let Some(object) = value.as_object() else {
                    return Err(mismatch(at, ty.name, value));
                };
                self.fields(instance, shape, object, at)
            }
            _ => Err(CastError::Descriptor {
                path: at.to_string(),
                detail: format!("factory resolved {}, which is not an object type", ty.name),
            }),
        }
    }
}

/// Self-materialization for elements with no static type where the
/// factory declined: scalars carry enough information on their own,
/// everything else is an unresolved ambiguity.
fn untyped_scalar(value: &Value, at: &str) -> Result<Instance, CastError> {
    match &value.node {
        Node::Str(s) => Ok(Box::new(s.clone())),
        Node::Bool(b) => Ok(Box::new(*b)),
        Node::Number(n) => {
            let instance: Instance = match *n {
                Number::PosInt(v) => match i64::try_from(v) {
                    Ok(signed) => Box::new(signed),
                    Err(_) => Box::new(v),
                },
                Number::NegInt(v) => Box::new(v),
                Number::Float(v) => Box::new(v),
            };
            Ok(instance)
        }
        Node::Null | Node::Object(_) | Node::Array(_) => Err(CastError::UnresolvedAmbiguity {
            path: at.to_string(),
            span: value.span,
        }),
    }
}

/// Convert a scalar node into a concrete primitive.
fn coerce_scalar(
    value: &Value,
    ty: &'static TypeDescriptor,
    shape: ScalarShape,
    path: &str,
) -> Result<Instance, CastError> {
    match (&value.node, shape) {
        (Node::Str(s), ScalarShape::Str) => Ok(Box::new(s.clone())),
        (Node::Bool(b), ScalarShape::Bool) => Ok(Box::new(*b)),
        (Node::Number(n), shape) if shape.is_numeric() => {
            coerce_number(*n, ty, shape, path, value.span)
        }
        _ => Err(mismatch(path, ty.name, value)),
    }
}

/// Numeric coercion: floats widen or narrow freely; integer targets
/// reject fractional values and out-of-range magnitudes.
fn coerce_number(
    n: Number,
    ty: &'static TypeDescriptor,
    shape: ScalarShape,
    path: &str,
    span: Option<Span>,
) -> Result<Instance, CastError> {
    let fail = || CastError::TypeMismatch {
        path: path.to_string(),
        expected: ty.name,
        actual: NodeKind::Number,
        span,
    };

    match shape {
        ScalarShape::F64 => Ok(Box::new(n.as_f64())),
        ScalarShape::F32 => Ok(Box::new(n.as_f64() as f32)),
        ScalarShape::U64 => n
            .as_u64()
            .map(|v| Box::new(v) as Instance)
            .ok_or_else(fail),
        _ => {
            let v = n.as_i64().ok_or_else(fail)?;
            let instance: Instance = match shape {
                ScalarShape::I8 => Box::new(i8::try_from(v).map_err(|_| fail())?),
                ScalarShape::I16 => Box::new(i16::try_from(v).map_err(|_| fail())?),
                ScalarShape::I32 => Box::new(i32::try_from(v).map_err(|_| fail())?),
                ScalarShape::I64 => Box::new(v),
                ScalarShape::U8 => Box::new(u8::try_from(v).map_err(|_| fail())?),
                ScalarShape::U16 => Box::new(u16::try_from(v).map_err(|_| fail())?),
                ScalarShape::U32 => Box::new(u32::try_from(v).map_err(|_| fail())?),
                // Bool, Str, and the float/u64 targets never reach here.
                _ => return Err(fail()),
            };
            Ok(instance)
        }
    }
}

fn mismatch(path: &str, expected: &'static str, value: &Value) -> CastError {
    CastError::TypeMismatch {
        path: path.to_string(),
        expected,
        actual: value.kind(),
        span: value.span,
    }
}

fn own_path(at: &str, name: &str) -> String {
    if name.is_empty() {
        at.to_string()
    } else {
        path::field(at, name)
    }
}
