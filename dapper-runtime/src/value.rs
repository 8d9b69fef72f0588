// Dapper - dapper-runtime
// Module: Host Values
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host-side values exchanged with the module.
//!
//! [`Value`] is what the emval table stores and what embind converters
//! produce and consume. Views into linear memory ([`HeapView`]) only record an
//! address range; their contents are read when a property or element is
//! accessed.

use std::{collections::BTreeMap, fmt};

use dapper_foundation::{Int32View, Uint8View};

use crate::dyncall::DynCallTarget;

/// Element type of a typed view, in embind's memory view index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// `Int8Array`
    Int8,
    /// `Uint8Array`
    Uint8,
    /// `Int16Array`
    Int16,
    /// `Uint16Array`
    Uint16,
    /// `Int32Array`
    Int32,
    /// `Uint32Array`
    Uint32,
    /// `Float32Array`
    Float32,
    /// `Float64Array`
    Float64,
    /// `BigInt64Array`
    BigInt64,
    /// `BigUint64Array`
    BigUint64,
}

impl ViewKind {
    /// Kind for a `_embind_register_memory_view` data type index
    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        Some(match index {
            0 => Self::Int8,
            1 => Self::Uint8,
            2 => Self::Int16,
            3 => Self::Uint16,
            4 => Self::Int32,
            5 => Self::Uint32,
            6 => Self::Float32,
            7 => Self::Float64,
            8 => Self::BigInt64,
            9 => Self::BigUint64,
            _ => return None,
        })
    }

    /// Size of one element in bytes
    #[must_use]
    pub fn element_size(self) -> u32 {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 | Self::BigInt64 | Self::BigUint64 => 8,
        }
    }

    /// Constructor name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::BigInt64 => "BigInt64Array",
            Self::BigUint64 => "BigUint64Array",
        }
    }
}

/// Typed window onto linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapView {
    /// Element type
    pub kind:    ViewKind,
    /// Address of the first element
    pub address: u32,
    /// Number of elements
    pub length:  u32,
}

impl HeapView {
    /// Size of the window in bytes
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        u64::from(self.length) * u64::from(self.kind.element_size())
    }
}

/// Callable host objects the module can reach through emval.
#[derive(Debug, Clone, PartialEq)]
pub enum HostFunction {
    /// The `readData` global
    ReadData,
    /// The `writeData` global
    WriteData,
    /// The `stdout` global
    Stdout,
    /// The `stderr` global
    Stderr,
    /// A view's `constructor`
    ViewConstructor(ViewKind),
    /// A view's `set`, bound to the view
    ViewSet(Box<Value>),
}

impl HostFunction {
    /// Callback global named `name`
    #[must_use]
    pub fn global(name: &str) -> Option<Self> {
        match name {
            "readData" => Some(Self::ReadData),
            "writeData" => Some(Self::WriteData),
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            _ => None,
        }
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadData => "readData",
            Self::WriteData => "writeData",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::ViewConstructor(kind) => kind.as_str(),
            Self::ViewSet(_) => "set",
        }
    }
}

/// Cleanup owed after a value was passed into the module.
#[derive(Debug, Clone, PartialEq)]
pub enum Destructor {
    /// Release a `malloc` allocation
    Free(u32),
    /// Call a module destructor with one pointer argument
    Call {
        /// Destructor function
        target:   DynCallTarget,
        /// Object pointer
        argument: i32,
    },
}

/// A host-side value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Any integer the wire can carry
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Record of named fields, as produced by value objects
    Object(BTreeMap<String, Value>),
    /// Sequence
    Array(Vec<Value>),
    /// Host-owned byte array
    Bytes(Uint8View),
    /// Host-owned 32-bit array
    Words(Int32View),
    /// View into linear memory
    HeapView(HeapView),
    /// Host callable
    Function(HostFunction),
    /// The global object
    Global,
    /// Pending destructors handed back to the module
    Destructors(Vec<Destructor>),
}

impl Value {
    /// Short name of the variant, for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Bytes(_) => "Uint8Array",
            Self::Words(_) => "Int32Array",
            Self::HeapView(view) => view.kind.as_str(),
            Self::Function(_) => "function",
            Self::Global => "global",
            Self::Destructors(_) => "destructors",
        }
    }

    /// Truthiness as the module's glue sees it
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Integer view of a numeric value; floats are truncated
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Floating point view of a numeric value
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Borrow the text of a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field `name` of an object
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Build an object from `(name, value)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(fields) => {
                f.write_str("{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name:?}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Array(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Bytes(view) => match view.to_vec() {
                Ok(bytes) => write!(f, "Uint8Array{bytes:?}"),
                Err(_) => f.write_str("Uint8Array(<poisoned>)"),
            },
            Self::Words(view) => match view.to_vec() {
                Ok(words) => write!(f, "Int32Array{words:?}"),
                Err(_) => f.write_str("Int32Array(<poisoned>)"),
            },
            Self::HeapView(view) => {
                write!(f, "{}(address={:#x}, length={})", view.kind.as_str(), view.address, view.length)
            }
            Self::Function(function) => write!(f, "function {}", function.name()),
            Self::Global => f.write_str("globalThis"),
            Self::Destructors(list) => write!(f, "destructors({})", list.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Uint8View> for Value {
    fn from(value: Uint8View) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}
