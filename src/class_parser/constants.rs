use num_enum::TryFromPrimitive;

pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_NATIVE: u16 = 0x0100;

/// Constant-pool entry tags as stored in the class file. Integer, float,
/// long and double literals are parsed so the pool indices line up, but the
/// resolver never dereferences them.
#[derive(TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum CPTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    Fieldref = 9,
    Methodref = 10,
    NameAndType = 12,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    /// Second slot of a long/double entry.
    Hole,
}

impl Constant {
    pub const fn tag(&self) -> Option<CPTag> {
        match self {
            Constant::Utf8(_) => Some(CPTag::Utf8),
            Constant::Integer(_) => Some(CPTag::Integer),
            Constant::Float(_) => Some(CPTag::Float),
            Constant::Long(_) => Some(CPTag::Long),
            Constant::Double(_) => Some(CPTag::Double),
            Constant::Class { .. } => Some(CPTag::Class),
            Constant::String { .. } => Some(CPTag::String),
            Constant::Fieldref { .. } => Some(CPTag::Fieldref),
            Constant::Methodref { .. } => Some(CPTag::Methodref),
            Constant::NameAndType { .. } => Some(CPTag::NameAndType),
            Constant::Hole => None,
        }
    }
}
