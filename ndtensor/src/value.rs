/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Runtime-typed scalar values.
//!
//! [`Value`] holds one value of any supported scalar type behind a
//! uniform interface, for heterogeneous collections of parameters and
//! metadata. The held type is identified by a [`TypeId`]; conversion
//! out of the erased representation is checked both for definedness
//! (complex never narrows to a real type, floats never decimate to
//! integers) and for range (an out-of-range value is an error, never a
//! silent truncation).

use std::fmt;

use num_complex::Complex32;
use num_complex::Complex64;
use serde::Deserialize;
use serde::Serialize;

/// The type of error for value operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ValueError {
    #[error("no conversion from {from} to {to}")]
    TypeError { from: TypeId, to: TypeId },

    #[error("value {value} outside the representable range of {target}")]
    RangeError { value: String, target: TypeId },

    #[error("value holds no data")]
    NotAllocated,

    #[error("cannot parse {input:?} as {target}")]
    ParseError { input: String, target: TypeId },
}

/// Identifier for every scalar type a [`Value`] can hold. The mapping
/// from Rust types to identifiers is resolved at compile time through
/// [`ScalarKind::TYPE_ID`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex32,
    Complex64,
    Bool,
    String,
}

impl TypeId {
    /// The identifier for a scalar type.
    pub fn of<T: ScalarKind>() -> TypeId {
        T::TYPE_ID
    }

    /// A stable textual name for the identified type.
    pub fn name(&self) -> &'static str {
        match self {
            TypeId::UInt8 => "uint8",
            TypeId::UInt16 => "uint16",
            TypeId::UInt32 => "uint32",
            TypeId::UInt64 => "uint64",
            TypeId::Int8 => "int8",
            TypeId::Int16 => "int16",
            TypeId::Int32 => "int32",
            TypeId::Int64 => "int64",
            TypeId::Float32 => "float32",
            TypeId::Float64 => "float64",
            TypeId::Complex32 => "complex32",
            TypeId::Complex64 => "complex64",
            TypeId::Bool => "bool",
            TypeId::String => "string",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A widened, type-erased rendition of a scalar, used as the bridge
/// between a holder and a requested target type.
#[derive(Clone, Debug)]
pub enum ScalarRepr {
    UInt(u64),
    Int(i64),
    Float(f64),
    Complex(Complex64),
    Bool(bool),
    Str(String),
}

/// A scalar type a [`Value`] can hold.
pub trait ScalarKind: Clone + fmt::Display + fmt::Debug + 'static {
    /// The compile-time-resolved identifier of this type.
    const TYPE_ID: TypeId;

    /// Widen into the erased representation.
    fn to_repr(&self) -> ScalarRepr;

    /// Convert out of an erased representation produced by a holder of
    /// type `from`. Undefined conversions fail with
    /// [`ValueError::TypeError`], representable-range violations with
    /// [`ValueError::RangeError`].
    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError>;

    /// Parse from text, as the inverse of the type's `Display` form.
    fn parse_text(text: &str) -> Result<Self, ValueError>;
}

macro_rules! impl_uint_kind {
    ($($t:ty => $id:ident),* $(,)?) => { $(
        impl ScalarKind for $t {
            const TYPE_ID: TypeId = TypeId::$id;

            fn to_repr(&self) -> ScalarRepr {
                ScalarRepr::UInt(*self as u64)
            }

            fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
                match repr {
                    ScalarRepr::UInt(u) => {
                        <$t>::try_from(*u).map_err(|_| ValueError::RangeError {
                            value: u.to_string(),
                            target: TypeId::$id,
                        })
                    }
                    ScalarRepr::Int(i) => {
                        u64::try_from(*i)
                            .ok()
                            .and_then(|u| <$t>::try_from(u).ok())
                            .ok_or_else(|| ValueError::RangeError {
                                value: i.to_string(),
                                target: TypeId::$id,
                            })
                    }
                    _ => Err(ValueError::TypeError {
                        from,
                        to: TypeId::$id,
                    }),
                }
            }

            fn parse_text(text: &str) -> Result<Self, ValueError> {
                text.trim().parse().map_err(|_| ValueError::ParseError {
                    input: text.to_string(),
                    target: TypeId::$id,
                })
            }
        }

        impl From<$t> for Value {
            fn from(value: $t) -> Value {
                Value::new(value)
            }
        }
    )* };
}

macro_rules! impl_int_kind {
    ($($t:ty => $id:ident),* $(,)?) => { $(
        impl ScalarKind for $t {
            const TYPE_ID: TypeId = TypeId::$id;

            fn to_repr(&self) -> ScalarRepr {
                ScalarRepr::Int(*self as i64)
            }

            fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
                match repr {
                    ScalarRepr::UInt(u) => {
                        <$t>::try_from(*u).map_err(|_| ValueError::RangeError {
                            value: u.to_string(),
                            target: TypeId::$id,
                        })
                    }
                    ScalarRepr::Int(i) => {
                        <$t>::try_from(*i).map_err(|_| ValueError::RangeError {
                            value: i.to_string(),
                            target: TypeId::$id,
                        })
                    }
                    _ => Err(ValueError::TypeError {
                        from,
                        to: TypeId::$id,
                    }),
                }
            }

            fn parse_text(text: &str) -> Result<Self, ValueError> {
                text.trim().parse().map_err(|_| ValueError::ParseError {
                    input: text.to_string(),
                    target: TypeId::$id,
                })
            }
        }

        impl From<$t> for Value {
            fn from(value: $t) -> Value {
                Value::new(value)
            }
        }
    )* };
}

impl_uint_kind!(u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64);
impl_int_kind!(i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64);

impl ScalarKind for f32 {
    const TYPE_ID: TypeId = TypeId::Float32;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Float(*self as f64)
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::UInt(u) => Ok(*u as f32),
            ScalarRepr::Int(i) => Ok(*i as f32),
            ScalarRepr::Float(v) => {
                if v.is_finite() && v.abs() > f32::MAX as f64 {
                    Err(ValueError::RangeError {
                        value: v.to_string(),
                        target: TypeId::Float32,
                    })
                } else {
                    Ok(*v as f32)
                }
            }
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::Float32,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        text.trim().parse().map_err(|_| ValueError::ParseError {
            input: text.to_string(),
            target: TypeId::Float32,
        })
    }
}

impl ScalarKind for f64 {
    const TYPE_ID: TypeId = TypeId::Float64;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Float(*self)
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::UInt(u) => Ok(*u as f64),
            ScalarRepr::Int(i) => Ok(*i as f64),
            ScalarRepr::Float(v) => Ok(*v),
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::Float64,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        text.trim().parse().map_err(|_| ValueError::ParseError {
            input: text.to_string(),
            target: TypeId::Float64,
        })
    }
}

impl ScalarKind for Complex32 {
    const TYPE_ID: TypeId = TypeId::Complex32;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Complex(Complex64::new(self.re as f64, self.im as f64))
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::UInt(u) => Ok(Complex32::new(*u as f32, 0.0)),
            ScalarRepr::Int(i) => Ok(Complex32::new(*i as f32, 0.0)),
            ScalarRepr::Float(v) => {
                let re = f32::from_repr(&ScalarRepr::Float(*v), from).map_err(|_| {
                    ValueError::RangeError {
                        value: v.to_string(),
                        target: TypeId::Complex32,
                    }
                })?;
                Ok(Complex32::new(re, 0.0))
            }
            ScalarRepr::Complex(c) => {
                let re = f32::from_repr(&ScalarRepr::Float(c.re), from).map_err(|_| {
                    ValueError::RangeError {
                        value: c.to_string(),
                        target: TypeId::Complex32,
                    }
                })?;
                let im = f32::from_repr(&ScalarRepr::Float(c.im), from).map_err(|_| {
                    ValueError::RangeError {
                        value: c.to_string(),
                        target: TypeId::Complex32,
                    }
                })?;
                Ok(Complex32::new(re, im))
            }
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::Complex32,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        text.trim().parse().map_err(|_| ValueError::ParseError {
            input: text.to_string(),
            target: TypeId::Complex32,
        })
    }
}

impl ScalarKind for Complex64 {
    const TYPE_ID: TypeId = TypeId::Complex64;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Complex(*self)
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::UInt(u) => Ok(Complex64::new(*u as f64, 0.0)),
            ScalarRepr::Int(i) => Ok(Complex64::new(*i as f64, 0.0)),
            ScalarRepr::Float(v) => Ok(Complex64::new(*v, 0.0)),
            ScalarRepr::Complex(c) => Ok(*c),
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::Complex64,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        text.trim().parse().map_err(|_| ValueError::ParseError {
            input: text.to_string(),
            target: TypeId::Complex64,
        })
    }
}

impl ScalarKind for bool {
    const TYPE_ID: TypeId = TypeId::Bool;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Bool(*self)
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::Bool(b) => Ok(*b),
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::Bool,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        text.trim().parse().map_err(|_| ValueError::ParseError {
            input: text.to_string(),
            target: TypeId::Bool,
        })
    }
}

impl ScalarKind for String {
    const TYPE_ID: TypeId = TypeId::String;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr::Str(self.clone())
    }

    fn from_repr(repr: &ScalarRepr, from: TypeId) -> Result<Self, ValueError> {
        match repr {
            ScalarRepr::Str(s) => Ok(s.clone()),
            _ => Err(ValueError::TypeError {
                from,
                to: TypeId::String,
            }),
        }
    }

    fn parse_text(text: &str) -> Result<Self, ValueError> {
        Ok(text.to_string())
    }
}

impl From<Complex32> for Value {
    fn from(value: Complex32) -> Value {
        Value::new(value)
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Value {
        Value::new(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::new(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::new(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::new(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::new(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::new(value.to_string())
    }
}

/// The cloneable, streamable holder a [`Value`] owns.
trait ValueHolder: fmt::Debug {
    fn type_id(&self) -> TypeId;
    fn clone_box(&self) -> Box<dyn ValueHolder>;
    fn repr(&self) -> ScalarRepr;
    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn read(&mut self, text: &str) -> Result<(), ValueError>;
}

#[derive(Debug, Clone)]
struct Holder<T: ScalarKind>(T);

impl<T: ScalarKind> ValueHolder for Holder<T> {
    fn type_id(&self) -> TypeId {
        T::TYPE_ID
    }

    fn clone_box(&self) -> Box<dyn ValueHolder> {
        Box::new(self.clone())
    }

    fn repr(&self) -> ScalarRepr {
        self.0.to_repr()
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }

    fn read(&mut self, text: &str) -> Result<(), ValueError> {
        self.0 = T::parse_text(text)?;
        Ok(())
    }
}

struct DisplayAdapter<'a>(&'a dyn ValueHolder);

impl fmt::Display for DisplayAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write(f)
    }
}

/// A runtime-typed scalar. A default-constructed value holds no data;
/// every query on it fails with [`ValueError::NotAllocated`] until a
/// value is assigned.
///
/// ```
/// use ndtensor::{TypeId, Value};
///
/// let v = Value::new(200u8);
/// assert_eq!(v.type_id().unwrap(), TypeId::UInt8);
/// assert!(v.as_::<i8>().is_err()); // 200 does not fit in i8
/// assert_eq!(v.as_::<u32>().unwrap(), 200);
/// ```
#[derive(Debug, Default)]
pub struct Value {
    holder: Option<Box<dyn ValueHolder>>,
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self {
            holder: self.holder.as_ref().map(|h| h.clone_box()),
        }
    }
}

impl Value {
    /// A value holding `value`.
    pub fn new<T: ScalarKind>(value: T) -> Self {
        Self {
            holder: Some(Box::new(Holder(value))),
        }
    }

    /// A value holding nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this value holds nothing.
    pub fn is_empty(&self) -> bool {
        self.holder.is_none()
    }

    /// Replace the held value.
    pub fn set<T: ScalarKind>(&mut self, value: T) {
        self.holder = Some(Box::new(Holder(value)));
    }

    /// Transfer the held value out, leaving this value empty.
    pub fn take(&mut self) -> Value {
        Value {
            holder: self.holder.take(),
        }
    }

    /// The identifier of the held type.
    pub fn type_id(&self) -> Result<TypeId, ValueError> {
        self.holder
            .as_ref()
            .map(|h| h.type_id())
            .ok_or(ValueError::NotAllocated)
    }

    /// Convert the held value to `T`, checking that the conversion is
    /// defined and that the value is representable.
    pub fn as_<T: ScalarKind>(&self) -> Result<T, ValueError> {
        let holder = self.holder.as_ref().ok_or(ValueError::NotAllocated)?;
        T::from_repr(&holder.repr(), holder.type_id())
    }

    /// Render the held value through its own formatting.
    pub fn format(&self) -> Result<String, ValueError> {
        let holder = self.holder.as_ref().ok_or(ValueError::NotAllocated)?;
        Ok(DisplayAdapter(holder.as_ref()).to_string())
    }

    /// Parse `text` into the held type, replacing the held value. The
    /// value must already hold a value of the target type.
    pub fn parse_assign(&mut self, text: &str) -> Result<(), ValueError> {
        let holder = self.holder.as_mut().ok_or(ValueError::NotAllocated)?;
        holder.read(text)
    }
}
