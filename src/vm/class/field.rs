use crate::class_parser::constants::ACC_STATIC;
use crate::error::VmError;
use crate::helper::has_flag;
use crate::vm::value::Value;

/// Bytes a field of this descriptor occupies in an instance. Arrays reserve
/// a fixed 16 bytes even though only the placeholder variant exists.
pub fn descriptor_size(descriptor: &str) -> Result<usize, VmError> {
    match descriptor.chars().next() {
        Some('I') | Some('F') => Ok(4),
        Some('J') | Some('D') | Some('L') => Ok(8),
        Some('[') => Ok(16),
        Some(c) => Err(VmError::UnknownTypeDescriptor(c)),
        None => Err(VmError::UnknownTypeDescriptor('\0')),
    }
}

/// Where a field's data lives: a byte offset into each instance, or one
/// boxed value slot shared by the whole class.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSlot {
    Instance { offset: usize },
    Static(Value),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub flags: u16,
    pub name: String,
    pub descriptor: String,
    pub slot: FieldSlot,
    pub source_file: Option<String>,
}

impl Field {
    pub fn is_static(&self) -> bool {
        has_flag(self.flags, ACC_STATIC)
    }

    pub fn offset(&self) -> Option<usize> {
        match self.slot {
            FieldSlot::Instance { offset } => Some(offset),
            FieldSlot::Static(_) => None,
        }
    }
}
