use crate::class_parser::constants::{CPTag, Constant};
use crate::error::VmError;

/// Runtime constant pool of one class, owned for the class's lifetime.
/// Entries are 1-indexed; index 0 is unused by the format.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn from_entries(entries: Vec<Constant>) -> ConstantPool {
        ConstantPool { entries }
    }

    pub fn get(&self, index: u16) -> Result<&Constant, VmError> {
        if index == 0 {
            return Err(VmError::PoolIndexOutOfRange(index));
        }
        self.entries
            .get(index as usize - 1)
            .ok_or(VmError::PoolIndexOutOfRange(index))
    }

    fn mismatch(&self, index: u16, expected: CPTag) -> VmError {
        let found = self.entries.get(index as usize - 1).and_then(Constant::tag);
        VmError::TagMismatch {
            index,
            expected,
            found,
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, VmError> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(self.mismatch(index, CPTag::Utf8)),
        }
    }

    /// Follows tag-specific indirections down to the UTF8 leaf: a String
    /// resolves to its text, a Class or NameAndType to its name. A
    /// well-formed pool reaches the leaf within a hop or two; an entry chain
    /// that runs deeper is a reference loop and fails instead of recursing
    /// unboundedly.
    pub fn resolve_text(&self, index: u16) -> Result<&str, VmError> {
        self.resolve_text_depth(index, 0)
    }

    fn resolve_text_depth(&self, index: u16, depth: u8) -> Result<&str, VmError> {
        const MAX_RESOLVE_DEPTH: u8 = 4;
        if depth > MAX_RESOLVE_DEPTH {
            return Err(VmError::CircularResolution(index));
        }
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            Constant::String { string_index } => {
                self.resolve_text_depth(*string_index, depth + 1)
            }
            Constant::Class { name_index } | Constant::NameAndType { name_index, .. } => {
                self.resolve_text_depth(*name_index, depth + 1)
            }
            _ => Err(self.mismatch(index, CPTag::Utf8)),
        }
    }

    /// The name of the class a Class entry refers to.
    pub fn class_name(&self, index: u16) -> Result<&str, VmError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.resolve_text(*name_index),
            _ => Err(self.mismatch(index, CPTag::Class)),
        }
    }

    /// `(name, descriptor)` of a NameAndType entry.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), VmError> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(self.mismatch(index, CPTag::NameAndType)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> ConstantPool {
        ConstantPool::from_entries(vec![
            Constant::Utf8("java/lang/System".to_string()), // 1
            Constant::Class { name_index: 1 },               // 2
            Constant::Utf8("out".to_string()),               // 3
            Constant::Utf8("Ljava/io/PrintStream;".to_string()), // 4
            Constant::NameAndType {
                name_index: 3,
                descriptor_index: 4,
            }, // 5
            Constant::String { string_index: 1 },            // 6
            Constant::Long(99),                              // 7
            Constant::Hole,                                  // 8
        ])
    }

    #[test]
    fn resolves_through_indirections() {
        let pool = sample_pool();

        assert_eq!(pool.class_name(2).unwrap(), "java/lang/System");
        assert_eq!(pool.name_and_type(5).unwrap(), ("out", "Ljava/io/PrintStream;"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let pool = sample_pool();

        assert_eq!(pool.resolve_text(2).unwrap(), pool.resolve_text(2).unwrap());
        // A String entry yields the same text as the UTF8 it points to.
        assert_eq!(pool.resolve_text(6).unwrap(), pool.utf8(1).unwrap());
    }

    #[test]
    fn index_bounds() {
        let pool = sample_pool();

        assert!(matches!(pool.get(0), Err(VmError::PoolIndexOutOfRange(0))));
        assert!(matches!(pool.get(9), Err(VmError::PoolIndexOutOfRange(9))));
    }

    #[test]
    fn tag_mismatches() {
        let pool = sample_pool();

        assert!(matches!(
            pool.utf8(2),
            Err(VmError::TagMismatch {
                index: 2,
                expected: CPTag::Utf8,
                found: Some(CPTag::Class),
            })
        ));
        assert!(matches!(
            pool.class_name(3),
            Err(VmError::TagMismatch { expected: CPTag::Class, .. })
        ));
        // Literal entries and holes are not resolvable.
        assert!(pool.resolve_text(7).is_err());
        assert!(matches!(
            pool.resolve_text(8),
            Err(VmError::TagMismatch { found: None, .. })
        ));
    }

    #[test]
    fn self_referencing_entries_fail_instead_of_recursing() {
        let pool = ConstantPool::from_entries(vec![
            Constant::String { string_index: 1 }, // 1 -> itself
            Constant::Class { name_index: 3 },    // 2 -> 3
            Constant::String { string_index: 2 }, // 3 -> 2
        ]);

        assert!(matches!(
            pool.resolve_text(1),
            Err(VmError::CircularResolution(1))
        ));
        assert!(matches!(
            pool.resolve_text(2),
            Err(VmError::CircularResolution(_))
        ));
    }
}
