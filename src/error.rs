use std::fmt::{Display, Formatter};

use crate::class_parser::constants::CPTag;

/// Every failure in the VM is fatal to the run: format errors indicate a
/// malformed class file, resolution errors a dangling symbolic reference,
/// interpreter errors an unsupported program. Nothing is retried.
#[derive(Debug)]
pub enum VmError {
    UnexpectedEof,
    BadMagic(u32),
    InvalidUtf8,
    UnsupportedConstantTag(u8),
    UnknownTypeDescriptor(char),
    UnknownAttributeType(String),
    MalformedDescriptor(String),

    PoolIndexOutOfRange(u16),
    TagMismatch {
        index: u16,
        expected: CPTag,
        found: Option<CPTag>,
    },
    UnresolvedMember {
        class: String,
        name: String,
        descriptor: String,
    },
    ClassNotFound(String),
    CircularInheritance(String),
    CircularResolution(u16),

    UnrecognizedOpcode(u8),
    UnknownNativeMethod {
        class: String,
        name: String,
        descriptor: String,
    },
    MissingCode {
        class: String,
        name: String,
    },
    StackTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    StackUnderflow,
    LocalIndexOutOfRange(usize),
    NullReference,
    DivisionByZero,
    Unsupported(&'static str),
    Io(std::io::Error),
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use VmError::*;

        match self {
            UnexpectedEof => write!(f, "unexpected end of input"),
            BadMagic(magic) => write!(f, "bad magic number 0x{:08x} for class file", magic),
            InvalidUtf8 => write!(f, "invalid UTF-8 in constant pool entry"),
            UnsupportedConstantTag(tag) => write!(f, "unsupported constant pool tag: {}", tag),
            UnknownTypeDescriptor(c) => write!(f, "unknown type descriptor '{}'", c),
            UnknownAttributeType(name) => write!(f, "unknown attribute type: {}", name),
            MalformedDescriptor(desc) => write!(f, "malformed method descriptor '{}'", desc),
            PoolIndexOutOfRange(index) => {
                write!(f, "constant pool index {} out of range", index)
            }
            TagMismatch {
                index,
                expected,
                found,
            } => match found {
                Some(found) => write!(
                    f,
                    "constant pool entry {} is {:?}, expected {:?}",
                    index, found, expected
                ),
                None => write!(
                    f,
                    "constant pool entry {} is an empty slot, expected {:?}",
                    index, expected
                ),
            },
            UnresolvedMember {
                class,
                name,
                descriptor,
            } => write!(f, "unable to find {}:{} in class {}", name, descriptor, class),
            ClassNotFound(name) => write!(f, "unable to open class file for {}", name),
            CircularInheritance(name) => {
                write!(f, "class {} appears in its own superclass chain", name)
            }
            CircularResolution(index) => {
                write!(f, "constant pool entry {} resolves through itself", index)
            }
            UnrecognizedOpcode(op) => write!(f, "unrecognised opcode 0x{:02x}", op),
            UnknownNativeMethod {
                class,
                name,
                descriptor,
            } => write!(f, "no native implementation for {}.{}{}", class, name, descriptor),
            MissingCode { class, name } => {
                write!(f, "method {}.{} has no code attribute", class, name)
            }
            StackTypeMismatch { expected, found } => {
                write!(f, "operand stack holds {}, expected {}", found, expected)
            }
            StackUnderflow => write!(f, "operand stack underflow"),
            LocalIndexOutOfRange(index) => {
                write!(f, "local variable index {} out of range", index)
            }
            NullReference => write!(f, "null reference"),
            DivisionByZero => write!(f, "integer division by zero"),
            Unsupported(what) => write!(f, "unsupported operation: {}", what),
            Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Io(e)
    }
}
