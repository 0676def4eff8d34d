use std::rc::Rc;

use crate::class_parser::constants::{ACC_NATIVE, ACC_STATIC};
use crate::error::VmError;
use crate::helper::has_flag;

#[derive(Debug, Clone)]
pub struct Method {
    pub flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Slot in the owning class's dispatch table, assigned at link time.
    /// Constructors (and bootstrap helpers with no slot) carry `None`.
    pub vtable_slot: Option<usize>,
    pub code: Option<Code>,
    pub source_file: Option<String>,
}

impl Method {
    pub fn is_static(&self) -> bool {
        has_flag(self.flags, ACC_STATIC)
    }

    pub fn is_native(&self) -> bool {
        has_flag(self.flags, ACC_NATIVE)
    }
}

/// Decoded Code attribute. The instruction stream is shared so an execution
/// frame can keep reading it while a nested load mutates the class arena.
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: usize,
    pub max_locals: usize,
    pub code: Rc<[u8]>,
}

/// Shape of a method descriptor as the invoke opcodes need it: how many
/// declared parameters, and whether a value comes back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DescInfo {
    pub nr_args: usize,
    pub returns: bool,
}

/// Scans `(...)R`, counting each parameter once: `[` prefixes fold into the
/// element type, `L...;` runs to its semicolon.
pub fn parse_desc(descriptor: &str) -> Result<DescInfo, VmError> {
    let malformed = || VmError::MalformedDescriptor(descriptor.to_string());

    let mut chars = descriptor.chars();
    if chars.next() != Some('(') {
        return Err(malformed());
    }

    let mut nr_args = 0;
    loop {
        let mut c = chars.next().ok_or_else(malformed)?;
        if c == ')' {
            break;
        }

        nr_args += 1;
        while c == '[' {
            c = chars.next().ok_or_else(malformed)?;
        }
        if c == 'L' {
            loop {
                match chars.next() {
                    Some(';') => break,
                    Some(_) => {}
                    None => return Err(malformed()),
                }
            }
        }
    }

    let returns = chars.next().ok_or_else(malformed)? != 'V';
    Ok(DescInfo { nr_args, returns })
}
