//! Symbolic member resolution: a Fieldref/Methodref pool entry becomes a
//! stable handle, loading the referenced class on the way if needed.
//! Lookup is exact on name and descriptor; there is no supertype search or
//! overload widening.

use crate::class_parser::constants::{CPTag, Constant};
use crate::error::VmError;
use crate::vm::class::class::{FieldId, MethodId};
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::vm::Vm;

fn member_parts<'p>(
    pool: &'p ConstantPool,
    index: u16,
    expected: CPTag,
) -> Result<(&'p str, &'p str, &'p str), VmError> {
    let (class_index, nat_index) = match (pool.get(index)?, expected) {
        (
            Constant::Fieldref {
                class_index,
                name_and_type_index,
            },
            CPTag::Fieldref,
        )
        | (
            Constant::Methodref {
                class_index,
                name_and_type_index,
            },
            CPTag::Methodref,
        ) => (*class_index, *name_and_type_index),
        (found, _) => {
            return Err(VmError::TagMismatch {
                index,
                expected,
                found: found.tag(),
            })
        }
    };

    let class_name = pool.class_name(class_index)?;
    let (name, descriptor) = pool.name_and_type(nat_index)?;
    Ok((class_name, name, descriptor))
}

pub fn resolve_fieldref(vm: &mut Vm, pool: &ConstantPool, index: u16) -> Result<FieldId, VmError> {
    let (class_name, name, descriptor) = member_parts(pool, index, CPTag::Fieldref)?;
    let class = vm.load_class(class_name)?;

    match vm.arena.get(class).find_field(name, descriptor) {
        Some(field_index) => Ok(FieldId {
            class,
            index: field_index,
        }),
        None => Err(VmError::UnresolvedMember {
            class: class_name.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }),
    }
}

pub fn resolve_methodref(
    vm: &mut Vm,
    pool: &ConstantPool,
    index: u16,
) -> Result<MethodId, VmError> {
    let (class_name, name, descriptor) = member_parts(pool, index, CPTag::Methodref)?;
    let class = vm.load_class(class_name)?;

    match vm.arena.get(class).find_method(name, descriptor) {
        Some(method_index) => Ok(MethodId {
            class,
            index: method_index,
        }),
        None => Err(VmError::UnresolvedMember {
            class: class_name.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> Vm {
        Vm::with_streams(Box::new(std::io::sink()), Box::new(std::io::sink()))
    }

    fn system_out_pool() -> ConstantPool {
        ConstantPool::from_entries(vec![
            Constant::Utf8("java/lang/System".to_string()), // 1
            Constant::Class { name_index: 1 },              // 2
            Constant::Utf8("out".to_string()),              // 3
            Constant::Utf8("Ljava/io/PrintStream;".to_string()), // 4
            Constant::NameAndType {
                name_index: 3,
                descriptor_index: 4,
            }, // 5
            Constant::Fieldref {
                class_index: 2,
                name_and_type_index: 5,
            }, // 6
            Constant::Utf8("java/io/PrintStream".to_string()), // 7
            Constant::Class { name_index: 7 },              // 8
            Constant::Utf8("println".to_string()),          // 9
            Constant::Utf8("(I)V".to_string()),             // 10
            Constant::NameAndType {
                name_index: 9,
                descriptor_index: 10,
            }, // 11
            Constant::Methodref {
                class_index: 8,
                name_and_type_index: 11,
            }, // 12
        ])
    }

    #[test]
    fn resolves_field_and_method_refs() {
        let mut vm = vm();
        let pool = system_out_pool();

        let field = resolve_fieldref(&mut vm, &pool, 6).unwrap();
        assert_eq!(vm.arena.field(field).name, "out");

        let method = resolve_methodref(&mut vm, &pool, 12).unwrap();
        assert_eq!(vm.arena.method(method).descriptor, "(I)V");
        assert_eq!(vm.arena.method(method).vtable_slot, Some(0));
    }

    #[test]
    fn exact_descriptor_match_only() {
        let mut vm = vm();
        let pool = ConstantPool::from_entries(vec![
            Constant::Utf8("java/io/PrintStream".to_string()), // 1
            Constant::Class { name_index: 1 },                 // 2
            Constant::Utf8("println".to_string()),             // 3
            Constant::Utf8("(J)V".to_string()),                // 4
            Constant::NameAndType {
                name_index: 3,
                descriptor_index: 4,
            }, // 5
            Constant::Methodref {
                class_index: 2,
                name_and_type_index: 5,
            }, // 6
        ]);

        // println exists, but not for longs; no widening to (D)V happens.
        assert!(matches!(
            resolve_methodref(&mut vm, &pool, 6),
            Err(VmError::UnresolvedMember { descriptor, .. }) if descriptor == "(J)V"
        ));
    }

    #[test]
    fn wrong_tag_is_reported() {
        let mut vm = vm();
        let pool = system_out_pool();

        // Entry 6 is a Fieldref, not a Methodref.
        assert!(matches!(
            resolve_methodref(&mut vm, &pool, 6),
            Err(VmError::TagMismatch {
                expected: CPTag::Methodref,
                found: Some(CPTag::Fieldref),
                ..
            })
        ));
    }
}
