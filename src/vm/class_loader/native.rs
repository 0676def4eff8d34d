use std::collections::HashMap;
use std::io::Write;

use once_cell::sync::Lazy;

use crate::error::VmError;
use crate::vm::class_loader::bootstrap::{PRINT_STREAM_TARGET_OFFSET, TARGET_STDERR};
use crate::vm::object::ObjRef;
use crate::vm::value::{Value, ValueKind};
use crate::vm::vm::Vm;

/// Key of a native method binding. Overloads are distinct bindings, so the
/// descriptor is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeMethodRef {
    pub class_name: String,
    pub method_name: String,
    pub descriptor: String,
}

impl NativeMethodRef {
    fn new(class_name: &str, method_name: &str, descriptor: &str) -> NativeMethodRef {
        NativeMethodRef {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

/// A native receives the VM and the call's argument values (receiver first
/// for instance methods) and may produce a return value.
pub type NativeFn = fn(&mut Vm, &[Value]) -> Result<Option<Value>, VmError>;

pub static NATIVE_FN_STORE: Lazy<HashMap<NativeMethodRef, NativeFn>> = Lazy::new(|| {
    let mut store: HashMap<NativeMethodRef, NativeFn> = HashMap::new();
    store.insert(
        NativeMethodRef::new("java/lang/Object", "<init>", "()V"),
        object_init,
    );
    store.insert(
        NativeMethodRef::new("java/io/PrintStream", "<init>", "()V"),
        object_init,
    );
    store.insert(
        NativeMethodRef::new("java/io/PrintStream", "println", "(I)V"),
        println_int,
    );
    store.insert(
        NativeMethodRef::new("java/io/PrintStream", "println", "(D)V"),
        println_double,
    );
    store
});

fn object_init(_vm: &mut Vm, _args: &[Value]) -> Result<Option<Value>, VmError> {
    Ok(None)
}

/// Resolves a PrintStream receiver to the process stream its selector names.
fn target_stream(vm: &mut Vm, receiver: Value) -> Result<&mut dyn Write, VmError> {
    let r: ObjRef = receiver.as_ref()?.ok_or(VmError::NullReference)?;
    let target = vm
        .heap
        .load(r, PRINT_STREAM_TARGET_OFFSET, ValueKind::Long)?
        .as_long()?;
    if target == TARGET_STDERR {
        Ok(vm.stderr.as_mut())
    } else {
        Ok(vm.stdout.as_mut())
    }
}

fn println_int(vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, VmError> {
    let v = args[1].as_int()?;
    let stream = target_stream(vm, args[0])?;
    writeln!(stream, "{}", v)?;
    Ok(None)
}

fn println_double(vm: &mut Vm, args: &[Value]) -> Result<Option<Value>, VmError> {
    let v = args[1].as_double()?;
    // Whole doubles still print with a decimal point (1 -> "1.0").
    let mut text = v.to_string();
    if !text.contains('.') && v.is_finite() {
        text.push_str(".0");
    }
    let stream = target_stream(vm, args[0])?;
    writeln!(stream, "{}", text)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_knows_the_println_overloads() {
        assert!(NATIVE_FN_STORE
            .contains_key(&NativeMethodRef::new("java/io/PrintStream", "println", "(I)V")));
        assert!(NATIVE_FN_STORE
            .contains_key(&NativeMethodRef::new("java/io/PrintStream", "println", "(D)V")));
        assert!(!NATIVE_FN_STORE
            .contains_key(&NativeMethodRef::new("java/io/PrintStream", "println", "(J)V")));
    }

    #[test]
    fn println_on_null_receiver() {
        let mut vm = Vm::with_streams(Box::new(std::io::sink()), Box::new(std::io::sink()));
        let result = println_int(&mut vm, &[Value::Ref(None), Value::Int(1)]);
        assert!(matches!(result, Err(VmError::NullReference)));
    }
}
