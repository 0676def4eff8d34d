//! Hand-built runtime classes installed into every fresh VM. They stand in
//! for the class library: `java/lang/Object` as the root supertype,
//! `java/io/PrintStream` with native `println` methods, and
//! `java/lang/System` carrying the `out`/`err` statics.

use std::rc::Rc;

use crate::class_parser::constants::ACC_NATIVE;
use crate::vm::class::class::{Class, MethodId};
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::{Field, FieldSlot};
use crate::vm::class::method::Method;
use crate::vm::value::Value;
use crate::vm::vm::Vm;

pub const BOOTSTRAP_CLASS_NAMES: [&str; 3] =
    ["java/lang/Object", "java/io/PrintStream", "java/lang/System"];

/// Byte offset of the stream selector inside a `PrintStream` instance.
pub const PRINT_STREAM_TARGET_OFFSET: usize = 8;
pub const TARGET_STDOUT: i64 = 0;
pub const TARGET_STDERR: i64 = 1;

fn native_method(name: &str, descriptor: &str, vtable_slot: Option<usize>) -> Method {
    Method {
        flags: ACC_NATIVE,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        vtable_slot,
        code: None,
        source_file: None,
    }
}

pub fn install(vm: &mut Vm) {
    let empty_pool = Rc::new(ConstantPool::from_entries(vec![]));

    vm.arena.register(Class {
        name: "java/lang/Object".to_string(),
        super_class: None,
        flags: 0x0021,
        instance_size: 8,
        interfaces: vec![],
        fields: vec![],
        methods: vec![native_method("<init>", "()V", None)],
        vtable: vec![],
        constant_pool: Rc::clone(&empty_pool),
        source_file: None,
    });

    let print_stream = vm.arena.next_id();
    vm.arena.register(Class {
        name: "java/io/PrintStream".to_string(),
        super_class: None,
        flags: 0x0021,
        instance_size: PRINT_STREAM_TARGET_OFFSET + 8,
        interfaces: vec![],
        fields: vec![],
        methods: vec![
            native_method("<init>", "()V", None),
            native_method("println", "(I)V", Some(0)),
            native_method("println", "(D)V", Some(1)),
        ],
        vtable: vec![
            MethodId { class: print_stream, index: 1 },
            MethodId { class: print_stream, index: 2 },
        ],
        constant_pool: Rc::clone(&empty_pool),
        source_file: None,
    });

    // One PrintStream instance per process stream; the selector in the
    // instance body tells the native println which sink to write to.
    let size = vm.arena.get(print_stream).instance_size;
    let out = vm.heap.alloc(print_stream, size);
    let err = vm.heap.alloc(print_stream, size);
    vm.heap
        .store(out, PRINT_STREAM_TARGET_OFFSET, Value::Long(TARGET_STDOUT))
        .expect("bootstrap PrintStream layout");
    vm.heap
        .store(err, PRINT_STREAM_TARGET_OFFSET, Value::Long(TARGET_STDERR))
        .expect("bootstrap PrintStream layout");

    let stream_field = |name: &str, stream| Field {
        flags: crate::class_parser::constants::ACC_STATIC,
        name: name.to_string(),
        descriptor: "Ljava/io/PrintStream;".to_string(),
        slot: FieldSlot::Static(Value::Ref(Some(stream))),
        source_file: None,
    };
    vm.arena.register(Class {
        name: "java/lang/System".to_string(),
        super_class: None,
        flags: 0x0021,
        instance_size: 8,
        interfaces: vec![],
        fields: vec![stream_field("out", out), stream_field("err", err)],
        methods: vec![],
        vtable: vec![],
        constant_pool: empty_pool,
        source_file: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::ValueKind;

    #[test]
    fn system_statics_select_distinct_streams() {
        let vm = Vm::with_streams(Box::new(std::io::sink()), Box::new(std::io::sink()));

        let system = vm.arena.lookup("java/lang/System").unwrap();
        let class = vm.arena.get(system);
        let out = class.fields[class.find_field("out", "Ljava/io/PrintStream;").unwrap()]
            .clone();
        let err = class.fields[class.find_field("err", "Ljava/io/PrintStream;").unwrap()]
            .clone();

        let target = |field: &Field| match field.slot {
            FieldSlot::Static(Value::Ref(Some(r))) => vm
                .heap
                .load(r, PRINT_STREAM_TARGET_OFFSET, ValueKind::Long)
                .unwrap(),
            _ => panic!("stream statics must hold references"),
        };
        assert_eq!(target(&out), Value::Long(TARGET_STDOUT));
        assert_eq!(target(&err), Value::Long(TARGET_STDERR));
    }

    #[test]
    fn println_overloads_have_stable_vtable_slots() {
        let vm = Vm::with_streams(Box::new(std::io::sink()), Box::new(std::io::sink()));

        let ps = vm.arena.lookup("java/io/PrintStream").unwrap();
        let class = vm.arena.get(ps);
        let int_println = &class.methods[class.find_method("println", "(I)V").unwrap()];
        let double_println = &class.methods[class.find_method("println", "(D)V").unwrap()];

        assert!(int_println.is_native());
        assert_eq!(int_println.vtable_slot, Some(0));
        assert_eq!(double_println.vtable_slot, Some(1));
        assert_eq!(class.vtable.len(), 2);
    }
}
