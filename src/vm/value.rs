use std::fmt::{Display, Formatter};

use crate::error::VmError;
use crate::vm::object::ObjRef;

/// One operand-stack or local slot. Values are fixed-size and copied on every
/// move; longs and doubles take a single slot. A reference carries no
/// ownership — objects live in the heap until the process exits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Ref(Option<ObjRef>),
    Long(i64),
    Double(f64),
    /// Arrays exist only as a placeholder variant.
    Arr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Ref,
    Long,
    Double,
    Arr,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Ref => "reference",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Arr => "array",
        }
    }

    /// Value kind implied by the first character of a field descriptor.
    pub fn from_descriptor(descriptor: &str) -> Result<ValueKind, VmError> {
        match descriptor.chars().next() {
            Some('I') => Ok(ValueKind::Int),
            Some('F') => Ok(ValueKind::Float),
            Some('J') => Ok(ValueKind::Long),
            Some('D') => Ok(ValueKind::Double),
            Some('L') => Ok(ValueKind::Ref),
            Some('[') => Ok(ValueKind::Arr),
            Some(c) => Err(VmError::UnknownTypeDescriptor(c)),
            None => Err(VmError::UnknownTypeDescriptor('\0')),
        }
    }

    /// The zeroed value of this kind, used for fresh locals, static slots and
    /// object memory.
    pub const fn default_value(self) -> Value {
        match self {
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Ref => Value::Ref(None),
            ValueKind::Long => Value::Long(0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::Arr => Value::Arr,
        }
    }
}

impl Value {
    pub const fn kind(self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Ref(_) => ValueKind::Ref,
            Value::Long(_) => ValueKind::Long,
            Value::Double(_) => ValueKind::Double,
            Value::Arr => ValueKind::Arr,
        }
    }

    fn mismatch(self, expected: ValueKind) -> VmError {
        VmError::StackTypeMismatch {
            expected: expected.name(),
            found: self.kind().name(),
        }
    }

    pub fn as_int(self) -> Result<i32, VmError> {
        match self {
            Value::Int(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Int)),
        }
    }

    pub fn as_long(self) -> Result<i64, VmError> {
        match self {
            Value::Long(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Long)),
        }
    }

    pub fn as_float(self) -> Result<f32, VmError> {
        match self {
            Value::Float(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Float)),
        }
    }

    pub fn as_double(self) -> Result<f64, VmError> {
        match self {
            Value::Double(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Double)),
        }
    }

    pub fn as_ref(self) -> Result<Option<ObjRef>, VmError> {
        match self {
            Value::Ref(r) => Ok(r),
            other => Err(other.mismatch(ValueKind::Ref)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "I:{}", v),
            Value::Float(v) => write!(f, "F:{}", v),
            Value::Ref(None) => write!(f, "A:null"),
            Value::Ref(Some(r)) => write!(f, "A:#{}", r.index()),
            Value::Long(v) => write!(f, "L:{}", v),
            Value::Double(v) => write!(f, "D:{}", v),
            Value::Arr => write!(f, "ARR"),
        }
    }
}
