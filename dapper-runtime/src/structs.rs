// Dapper - dapper-runtime
// Module: Value Objects
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Marshaling of embind value objects.
//!
//! A value object is a C++ struct exposed field by field. The module
//! registers a constructor, a destructor and, per field, a getter and a
//! setter. Reading a struct calls every getter and then destroys the object;
//! writing one constructs a fresh object and calls every setter.

use std::collections::BTreeMap;

use dapper_error::{helpers, Result};
use wasmi::{StoreContextMut, Val};

use crate::{
    converters::{from_wire, run_destructors, to_wire},
    dyncall::{wire_i64, DynCallTarget},
    registry::{RawType, TypeConverter},
    state::HostState,
    value::{Destructor, Value},
};

/// A value object as registered, before its field types are known.
#[derive(Debug, Clone, PartialEq)]
pub struct StructRegistration {
    /// Struct name
    pub name:        String,
    /// Allocates an object, returning its pointer
    pub constructor: DynCallTarget,
    /// Frees an object
    pub destructor:  DynCallTarget,
    /// Fields in registration order
    pub fields:      Vec<FieldRegistration>,
}

/// One field of a [`StructRegistration`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRegistration {
    /// Field name
    pub name:                 String,
    /// Type id the getter returns
    pub getter_return_type:   RawType,
    /// Getter `(context, ptr) -> wire`
    pub getter:               DynCallTarget,
    /// Opaque context passed to the getter
    pub getter_context:       i32,
    /// Type id the setter takes
    pub setter_argument_type: RawType,
    /// Setter `(context, ptr, wire)`
    pub setter:               DynCallTarget,
    /// Opaque context passed to the setter
    pub setter_context:       i32,
}

/// A field with its converters resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    /// Field name
    pub name:           String,
    /// Getter `(context, ptr) -> wire`
    pub getter:         DynCallTarget,
    /// Getter context
    pub getter_context: i32,
    /// Converter for the getter's result
    pub getter_type:    TypeConverter,
    /// Setter `(context, ptr, wire)`
    pub setter:         DynCallTarget,
    /// Setter context
    pub setter_context: i32,
    /// Converter for the setter's argument
    pub setter_type:    TypeConverter,
}

/// A finalized value object.
#[derive(Debug, Clone, PartialEq)]
pub struct StructConverter {
    /// Struct name
    pub name:        String,
    /// Allocates an object
    pub constructor: DynCallTarget,
    /// Frees an object
    pub destructor:  DynCallTarget,
    /// Resolved fields
    pub fields:      Vec<StructField>,
}

impl StructRegistration {
    /// Create a registration without fields.
    #[must_use]
    pub fn new(name: impl Into<String>, constructor: DynCallTarget, destructor: DynCallTarget) -> Self {
        Self {
            name: name.into(),
            constructor,
            destructor,
            fields: Vec::new(),
        }
    }

    /// Types to resolve before finalizing: every getter type, then every
    /// setter type.
    #[must_use]
    pub fn dependency_types(&self) -> Vec<RawType> {
        self.fields
            .iter()
            .map(|field| field.getter_return_type)
            .chain(self.fields.iter().map(|field| field.setter_argument_type))
            .collect()
    }

    /// Pair fields with converters in [`dependency_types`](Self::dependency_types) order.
    ///
    /// # Errors
    ///
    /// Returns `CONVERTER_COUNT_MISMATCH` unless there are two converters per
    /// field.
    pub fn finalize(self, converters: &[TypeConverter]) -> Result<StructConverter> {
        let count = self.fields.len();
        if converters.len() != count * 2 {
            return Err(helpers::converter_count_mismatch(count * 2, converters.len()));
        }
        let (getters, setters) = converters.split_at(count);
        let fields = self
            .fields
            .into_iter()
            .zip(getters.iter().zip(setters))
            .map(|(field, (getter_type, setter_type))| StructField {
                name:           field.name,
                getter:         field.getter,
                getter_context: field.getter_context,
                getter_type:    getter_type.clone(),
                setter:         field.setter,
                setter_context: field.setter_context,
                setter_type:    setter_type.clone(),
            })
            .collect();
        Ok(StructConverter {
            name: self.name,
            constructor: self.constructor,
            destructor: self.destructor,
            fields,
        })
    }
}

impl StructConverter {
    /// Read the object at `ptr` into a [`Value::Object`] and destroy it.
    ///
    /// The destructor runs even when a getter fails; the getter's error is
    /// the one returned.
    pub fn read(&self, ctx: &mut StoreContextMut<'_, HostState>, ptr: i32) -> Result<Value> {
        let fields = self.read_fields(ctx, ptr);
        let destroyed = self.destructor.call(ctx, &[Val::I32(ptr)]);
        let fields = fields?;
        destroyed?;
        Ok(Value::Object(fields))
    }

    fn read_fields(
        &self,
        ctx: &mut StoreContextMut<'_, HostState>,
        ptr: i32,
    ) -> Result<BTreeMap<String, Value>> {
        let mut fields = BTreeMap::new();
        for field in &self.fields {
            let wire = field
                .getter
                .call(ctx, &[Val::I32(field.getter_context), Val::I32(ptr)])?
                .ok_or_else(|| {
                    helpers::type_mismatch(format!("getter of {}.{} returned nothing", self.name, field.name))
                })?;
            fields.insert(field.name.clone(), from_wire(ctx, &field.getter_type, &wire)?);
        }
        Ok(fields)
    }

    /// Build a module object from `value`, returning its pointer.
    ///
    /// The object's destructor is queued on `destructors`.
    ///
    /// # Errors
    ///
    /// Returns `MISSING_FIELD` naming the first field `value` lacks, before
    /// anything is allocated.
    pub fn write(
        &self,
        ctx: &mut StoreContextMut<'_, HostState>,
        value: &Value,
        destructors: Option<&mut Vec<Destructor>>,
    ) -> Result<i32> {
        let Value::Object(object) = value else {
            return Err(helpers::type_mismatch(format!(
                "{} expects an object, got {}",
                self.name,
                value.type_name()
            )));
        };
        if let Some(missing) = self.fields.iter().find(|field| !object.contains_key(&field.name)) {
            return Err(helpers::missing_field(&missing.name));
        }
        let ptr = self
            .constructor
            .call(ctx, &[])?
            .ok_or_else(|| helpers::type_mismatch(format!("constructor of {} returned nothing", self.name)))?;
        let ptr = wire_i64(&ptr)? as i32;
        for field in &self.fields {
            let mut field_destructors = Vec::new();
            let field_value = object.get(&field.name).unwrap_or(&Value::Undefined);
            let wire = to_wire(ctx, &field.setter_type, Some(&mut field_destructors), field_value)?;
            field.setter.call(ctx, &[Val::I32(field.setter_context), Val::I32(ptr), wire])?;
            run_destructors(ctx, field_destructors)?;
        }
        if let Some(destructors) = destructors {
            destructors.push(Destructor::Call {
                target:   self.destructor.clone(),
                argument: ptr,
            });
        }
        Ok(ptr)
    }
}

#[cfg(test)]
mod tests {
    use dapper_error::codes;

    use super::*;
    use crate::registry::ConverterKind;

    fn target(signature: &str, index: i32) -> DynCallTarget {
        DynCallTarget::parse(signature, index).unwrap()
    }

    fn field(name: &str, getter_type: RawType, setter_type: RawType) -> FieldRegistration {
        FieldRegistration {
            name:                 name.to_string(),
            getter_return_type:   getter_type,
            getter:               target("iii", 1),
            getter_context:       0,
            setter_argument_type: setter_type,
            setter:               target("viii", 2),
            setter_context:       0,
        }
    }

    #[test]
    fn test_dependency_order_getters_then_setters() {
        let mut registration = StructRegistration::new("Pair", target("i", 3), target("vi", 4));
        registration.fields.push(field("a", 10, 11));
        registration.fields.push(field("b", 12, 13));
        assert_eq!(registration.dependency_types(), vec![10, 12, 11, 13]);
    }

    #[test]
    fn test_finalize_pairs_converters() {
        let mut registration = StructRegistration::new("Pair", target("i", 3), target("vi", 4));
        registration.fields.push(field("a", 10, 11));
        let get = TypeConverter::new("get", ConverterKind::Integer { size: 4, signed: true });
        let set = TypeConverter::new("set", ConverterKind::Float { size: 8 });
        let converter = registration.clone().finalize(&[get.clone(), set.clone()]).unwrap();
        assert_eq!(converter.fields[0].getter_type, get);
        assert_eq!(converter.fields[0].setter_type, set);
        let err = registration.finalize(&[get]).unwrap_err();
        assert_eq!(err.code, codes::CONVERTER_COUNT_MISMATCH);
    }
}
