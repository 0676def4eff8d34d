use std::rc::Rc;

use crate::error::VmError;
use crate::trace::{format_stack, BLUE, GREEN, RESET, YELLOW};
use crate::vm::class::class::MethodId;
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::FieldSlot;
use crate::vm::class::method::parse_desc;
use crate::vm::class_loader::native::{NativeMethodRef, NATIVE_FN_STORE};
use crate::vm::class_loader::resolve::{resolve_fieldref, resolve_methodref};
use crate::vm::instructions::Opcode;
use crate::vm::thread::frame::Frame;
use crate::vm::value::{Value, ValueKind};
use crate::vm::vm::Vm;

pub const MAX_NO_OF_ARGS: usize = 16;

fn check(value: Value, kind: ValueKind) -> Result<Value, VmError> {
    if value.kind() == kind {
        Ok(value)
    } else {
        Err(VmError::StackTypeMismatch {
            expected: kind.name(),
            found: value.kind().name(),
        })
    }
}

/// Runs one method to completion and yields its return value (`None` for
/// void). Nested invokes re-enter here; the Rust call stack carries the
/// frame chain.
pub fn call_method(
    vm: &mut Vm,
    method: MethodId,
    args: &[Value],
) -> Result<Option<Value>, VmError> {
    let (native, code, pool, class_name, name, descriptor) = {
        let class = vm.arena.get(method.class);
        let m = &class.methods[method.index];
        (
            m.is_native(),
            m.code.clone(),
            Rc::clone(&class.constant_pool),
            class.name.clone(),
            m.name.clone(),
            m.descriptor.clone(),
        )
    };

    if vm.trace {
        eprintln!("{}> {}.{}{}{}", GREEN, class_name, name, descriptor, RESET);
    }

    let result = if native {
        let key = NativeMethodRef {
            class_name: class_name.clone(),
            method_name: name.clone(),
            descriptor: descriptor.clone(),
        };
        match NATIVE_FN_STORE.get(&key).copied() {
            Some(f) => f(vm, args),
            None => Err(VmError::UnknownNativeMethod {
                class: class_name.clone(),
                name: name.clone(),
                descriptor,
            }),
        }
    } else {
        let code = code.ok_or_else(|| VmError::MissingCode {
            class: class_name.clone(),
            name: name.clone(),
        })?;
        let mut frame = Frame::new(method, &code);
        for (index, value) in args.iter().enumerate() {
            frame.store(index, *value)?;
        }
        exec(vm, &mut frame, &code.code, &pool)
    };

    if vm.trace {
        eprintln!("{}< {}.{}{}", YELLOW, class_name, name, RESET);
    }
    result
}

fn fetch_u1(code: &[u8], frame: &mut Frame) -> Result<u8, VmError> {
    let byte = *code.get(frame.ip).ok_or(VmError::UnexpectedEof)?;
    frame.ip += 1;
    Ok(byte)
}

fn fetch_u2(code: &[u8], frame: &mut Frame) -> Result<u16, VmError> {
    let hi = fetch_u1(code, frame)?;
    let lo = fetch_u1(code, frame)?;
    Ok(u16::from_be_bytes([hi, lo]))
}

fn exec(
    vm: &mut Vm,
    frame: &mut Frame,
    code: &[u8],
    pool: &ConstantPool,
) -> Result<Option<Value>, VmError> {
    loop {
        let byte = *code.get(frame.ip).ok_or(VmError::UnexpectedEof)?;
        let op = Opcode::try_from(byte).map_err(|_| VmError::UnrecognizedOpcode(byte))?;
        if vm.trace {
            eprintln!("  {} {}{}{}", format_stack(frame.stack()), BLUE, op, RESET);
        }
        frame.ip += 1;

        match op {
            Opcode::NOP => {}
            Opcode::ACONST_NULL => frame.push(Value::Ref(None)),

            Opcode::ICONST_M1
            | Opcode::ICONST_0
            | Opcode::ICONST_1
            | Opcode::ICONST_2
            | Opcode::ICONST_3
            | Opcode::ICONST_4
            | Opcode::ICONST_5 => {
                frame.push(Value::Int(byte as i32 - Opcode::ICONST_0 as i32));
            }
            Opcode::LCONST_0 | Opcode::LCONST_1 => {
                frame.push(Value::Long((byte - Opcode::LCONST_0 as u8) as i64));
            }
            Opcode::FCONST_0 => frame.push(Value::Float(0.0)),
            Opcode::FCONST_1 => frame.push(Value::Float(1.0)),
            Opcode::DCONST_0 => frame.push(Value::Double(0.0)),
            Opcode::DCONST_1 => frame.push(Value::Double(1.0)),

            Opcode::BIPUSH => {
                let v = fetch_u1(code, frame)? as i8;
                frame.push(Value::Int(v as i32));
            }
            Opcode::SIPUSH => {
                let v = fetch_u2(code, frame)? as i16;
                frame.push(Value::Int(v as i32));
            }

            Opcode::ILOAD | Opcode::LLOAD | Opcode::FLOAD | Opcode::DLOAD | Opcode::ALOAD => {
                let index = fetch_u1(code, frame)? as usize;
                let kind = match op {
                    Opcode::ILOAD => ValueKind::Int,
                    Opcode::LLOAD => ValueKind::Long,
                    Opcode::FLOAD => ValueKind::Float,
                    Opcode::DLOAD => ValueKind::Double,
                    _ => ValueKind::Ref,
                };
                frame.push(check(frame.load(index)?, kind)?);
            }
            Opcode::ILOAD_0 | Opcode::ILOAD_1 | Opcode::ILOAD_2 | Opcode::ILOAD_3 => {
                let index = (byte - Opcode::ILOAD_0 as u8) as usize;
                frame.push(check(frame.load(index)?, ValueKind::Int)?);
            }
            Opcode::LLOAD_0 | Opcode::LLOAD_1 | Opcode::LLOAD_2 | Opcode::LLOAD_3 => {
                let index = (byte - Opcode::LLOAD_0 as u8) as usize;
                frame.push(check(frame.load(index)?, ValueKind::Long)?);
            }
            Opcode::FLOAD_0 | Opcode::FLOAD_1 | Opcode::FLOAD_2 | Opcode::FLOAD_3 => {
                let index = (byte - Opcode::FLOAD_0 as u8) as usize;
                frame.push(check(frame.load(index)?, ValueKind::Float)?);
            }
            Opcode::DLOAD_0 | Opcode::DLOAD_1 | Opcode::DLOAD_2 | Opcode::DLOAD_3 => {
                let index = (byte - Opcode::DLOAD_0 as u8) as usize;
                frame.push(check(frame.load(index)?, ValueKind::Double)?);
            }
            Opcode::ALOAD_0 | Opcode::ALOAD_1 | Opcode::ALOAD_2 | Opcode::ALOAD_3 => {
                let index = (byte - Opcode::ALOAD_0 as u8) as usize;
                frame.push(check(frame.load(index)?, ValueKind::Ref)?);
            }

            Opcode::ISTORE | Opcode::LSTORE | Opcode::FSTORE | Opcode::DSTORE | Opcode::ASTORE => {
                let index = fetch_u1(code, frame)? as usize;
                let kind = match op {
                    Opcode::ISTORE => ValueKind::Int,
                    Opcode::LSTORE => ValueKind::Long,
                    Opcode::FSTORE => ValueKind::Float,
                    Opcode::DSTORE => ValueKind::Double,
                    _ => ValueKind::Ref,
                };
                let value = check(frame.pop()?, kind)?;
                frame.store(index, value)?;
            }
            Opcode::ISTORE_0 | Opcode::ISTORE_1 | Opcode::ISTORE_2 | Opcode::ISTORE_3 => {
                let index = (byte - Opcode::ISTORE_0 as u8) as usize;
                let value = check(frame.pop()?, ValueKind::Int)?;
                frame.store(index, value)?;
            }
            Opcode::LSTORE_0 | Opcode::LSTORE_1 | Opcode::LSTORE_2 | Opcode::LSTORE_3 => {
                let index = (byte - Opcode::LSTORE_0 as u8) as usize;
                let value = check(frame.pop()?, ValueKind::Long)?;
                frame.store(index, value)?;
            }
            Opcode::FSTORE_0 | Opcode::FSTORE_1 | Opcode::FSTORE_2 | Opcode::FSTORE_3 => {
                let index = (byte - Opcode::FSTORE_0 as u8) as usize;
                let value = check(frame.pop()?, ValueKind::Float)?;
                frame.store(index, value)?;
            }
            Opcode::DSTORE_0 | Opcode::DSTORE_1 | Opcode::DSTORE_2 | Opcode::DSTORE_3 => {
                let index = (byte - Opcode::DSTORE_0 as u8) as usize;
                let value = check(frame.pop()?, ValueKind::Double)?;
                frame.store(index, value)?;
            }
            Opcode::ASTORE_0 | Opcode::ASTORE_1 | Opcode::ASTORE_2 | Opcode::ASTORE_3 => {
                let index = (byte - Opcode::ASTORE_0 as u8) as usize;
                let value = check(frame.pop()?, ValueKind::Ref)?;
                frame.store(index, value)?;
            }

            Opcode::POP => {
                frame.pop()?;
            }
            Opcode::DUP => {
                let v = frame.pop()?;
                frame.push(v);
                frame.push(v);
            }
            Opcode::SWAP => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                frame.push(v1);
                frame.push(v2);
            }

            Opcode::IADD | Opcode::ISUB | Opcode::IMUL => {
                let v2 = frame.pop()?.as_int()?;
                let v1 = frame.pop()?.as_int()?;
                frame.push(Value::Int(match op {
                    Opcode::IADD => v1.wrapping_add(v2),
                    Opcode::ISUB => v1.wrapping_sub(v2),
                    _ => v1.wrapping_mul(v2),
                }));
            }
            Opcode::IDIV | Opcode::IREM => {
                let v2 = frame.pop()?.as_int()?;
                let v1 = frame.pop()?.as_int()?;
                if v2 == 0 {
                    return Err(VmError::DivisionByZero);
                }
                frame.push(Value::Int(if op == Opcode::IDIV {
                    v1.wrapping_div(v2)
                } else {
                    v1.wrapping_rem(v2)
                }));
            }
            Opcode::LADD | Opcode::LSUB | Opcode::LMUL => {
                let v2 = frame.pop()?.as_long()?;
                let v1 = frame.pop()?.as_long()?;
                frame.push(Value::Long(match op {
                    Opcode::LADD => v1.wrapping_add(v2),
                    Opcode::LSUB => v1.wrapping_sub(v2),
                    _ => v1.wrapping_mul(v2),
                }));
            }
            Opcode::LDIV | Opcode::LREM => {
                let v2 = frame.pop()?.as_long()?;
                let v1 = frame.pop()?.as_long()?;
                if v2 == 0 {
                    return Err(VmError::DivisionByZero);
                }
                frame.push(Value::Long(if op == Opcode::LDIV {
                    v1.wrapping_div(v2)
                } else {
                    v1.wrapping_rem(v2)
                }));
            }
            Opcode::FADD | Opcode::FSUB | Opcode::FMUL | Opcode::FDIV | Opcode::FREM => {
                let v2 = frame.pop()?.as_float()?;
                let v1 = frame.pop()?.as_float()?;
                frame.push(Value::Float(match op {
                    Opcode::FADD => v1 + v2,
                    Opcode::FSUB => v1 - v2,
                    Opcode::FMUL => v1 * v2,
                    Opcode::FDIV => v1 / v2,
                    _ => v1 % v2,
                }));
            }
            Opcode::DADD | Opcode::DSUB | Opcode::DMUL | Opcode::DDIV | Opcode::DREM => {
                let v2 = frame.pop()?.as_double()?;
                let v1 = frame.pop()?.as_double()?;
                frame.push(Value::Double(match op {
                    Opcode::DADD => v1 + v2,
                    Opcode::DSUB => v1 - v2,
                    Opcode::DMUL => v1 * v2,
                    Opcode::DDIV => v1 / v2,
                    _ => v1 % v2,
                }));
            }

            Opcode::INEG => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Int(v.wrapping_neg()));
            }
            Opcode::LNEG => {
                let v = frame.pop()?.as_long()?;
                frame.push(Value::Long(v.wrapping_neg()));
            }
            Opcode::FNEG => {
                let v = frame.pop()?.as_float()?;
                frame.push(Value::Float(-v));
            }
            Opcode::DNEG => {
                let v = frame.pop()?.as_double()?;
                frame.push(Value::Double(-v));
            }

            // Shift counts are ints; only the low bits matter.
            Opcode::ISHL | Opcode::ISHR | Opcode::IUSHR => {
                let shift = frame.pop()?.as_int()? as u32 & 0x1f;
                let v1 = frame.pop()?.as_int()?;
                frame.push(Value::Int(match op {
                    Opcode::ISHL => v1.wrapping_shl(shift),
                    Opcode::ISHR => v1.wrapping_shr(shift),
                    _ => ((v1 as u32) >> shift) as i32,
                }));
            }
            Opcode::LSHL | Opcode::LSHR | Opcode::LUSHR => {
                let shift = frame.pop()?.as_int()? as u32 & 0x3f;
                let v1 = frame.pop()?.as_long()?;
                frame.push(Value::Long(match op {
                    Opcode::LSHL => v1.wrapping_shl(shift),
                    Opcode::LSHR => v1.wrapping_shr(shift),
                    _ => ((v1 as u64) >> shift) as i64,
                }));
            }

            Opcode::IAND | Opcode::IOR | Opcode::IXOR => {
                let v2 = frame.pop()?.as_int()?;
                let v1 = frame.pop()?.as_int()?;
                frame.push(Value::Int(match op {
                    Opcode::IAND => v1 & v2,
                    Opcode::IOR => v1 | v2,
                    _ => v1 ^ v2,
                }));
            }
            Opcode::LAND | Opcode::LOR | Opcode::LXOR => {
                let v2 = frame.pop()?.as_long()?;
                let v1 = frame.pop()?.as_long()?;
                frame.push(Value::Long(match op {
                    Opcode::LAND => v1 & v2,
                    Opcode::LOR => v1 | v2,
                    _ => v1 ^ v2,
                }));
            }

            Opcode::I2L => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Long(v as i64));
            }
            Opcode::I2F => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Float(v as f32));
            }
            Opcode::I2D => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Double(v as f64));
            }
            Opcode::L2I => {
                let v = frame.pop()?.as_long()?;
                frame.push(Value::Int(v as i32));
            }
            Opcode::L2F => {
                let v = frame.pop()?.as_long()?;
                frame.push(Value::Float(v as f32));
            }
            Opcode::L2D => {
                let v = frame.pop()?.as_long()?;
                frame.push(Value::Double(v as f64));
            }
            Opcode::F2I => {
                let v = frame.pop()?.as_float()?;
                frame.push(Value::Int(v as i32));
            }
            Opcode::F2L => {
                let v = frame.pop()?.as_float()?;
                frame.push(Value::Long(v as i64));
            }
            Opcode::F2D => {
                let v = frame.pop()?.as_float()?;
                frame.push(Value::Double(v as f64));
            }
            Opcode::D2I => {
                let v = frame.pop()?.as_double()?;
                frame.push(Value::Int(v as i32));
            }
            Opcode::D2L => {
                let v = frame.pop()?.as_double()?;
                frame.push(Value::Long(v as i64));
            }
            Opcode::D2F => {
                let v = frame.pop()?.as_double()?;
                frame.push(Value::Float(v as f32));
            }
            Opcode::I2B => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Int(v as i8 as i32));
            }
            Opcode::I2C => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Int(v as u16 as i32));
            }
            Opcode::I2S => {
                let v = frame.pop()?.as_int()?;
                frame.push(Value::Int(v as i16 as i32));
            }

            Opcode::IRETURN => return Ok(Some(check(frame.pop()?, ValueKind::Int)?)),
            Opcode::LRETURN => return Ok(Some(check(frame.pop()?, ValueKind::Long)?)),
            Opcode::FRETURN => return Ok(Some(check(frame.pop()?, ValueKind::Float)?)),
            Opcode::DRETURN => return Ok(Some(check(frame.pop()?, ValueKind::Double)?)),
            Opcode::ARETURN => return Ok(Some(check(frame.pop()?, ValueKind::Ref)?)),
            Opcode::RETURN => return Ok(None),

            Opcode::GETSTATIC => {
                let index = fetch_u2(code, frame)?;
                let field = resolve_fieldref(vm, pool, index)?;
                match &vm.arena.field(field).slot {
                    FieldSlot::Static(value) => frame.push(*value),
                    FieldSlot::Instance { .. } => {
                        return Err(VmError::Unsupported("static access to instance field"))
                    }
                }
            }
            Opcode::PUTSTATIC => {
                let index = fetch_u2(code, frame)?;
                let value = frame.pop()?;
                let field = resolve_fieldref(vm, pool, index)?;
                let slot = &mut vm.arena.field_mut(field).slot;
                match slot {
                    FieldSlot::Static(_) => *slot = FieldSlot::Static(value),
                    FieldSlot::Instance { .. } => {
                        return Err(VmError::Unsupported("static access to instance field"))
                    }
                }
            }
            Opcode::GETFIELD => {
                let index = fetch_u2(code, frame)?;
                let field = resolve_fieldref(vm, pool, index)?;
                let (offset, kind) = {
                    let f = vm.arena.field(field);
                    let offset = f
                        .offset()
                        .ok_or(VmError::Unsupported("instance access to static field"))?;
                    (offset, ValueKind::from_descriptor(&f.descriptor)?)
                };
                let receiver = frame.pop()?.as_ref()?.ok_or(VmError::NullReference)?;
                frame.push(vm.heap.load(receiver, offset, kind)?);
            }
            Opcode::PUTFIELD => {
                let index = fetch_u2(code, frame)?;
                let field = resolve_fieldref(vm, pool, index)?;
                let (offset, kind) = {
                    let f = vm.arena.field(field);
                    let offset = f
                        .offset()
                        .ok_or(VmError::Unsupported("instance access to static field"))?;
                    (offset, ValueKind::from_descriptor(&f.descriptor)?)
                };
                // The stored width comes from the descriptor; a value of
                // another kind must not touch the neighbouring bytes.
                let value = check(frame.pop()?, kind)?;
                let receiver = frame.pop()?.as_ref()?.ok_or(VmError::NullReference)?;
                vm.heap.store(receiver, offset, value)?;
            }

            Opcode::INVOKEVIRTUAL => {
                let index = fetch_u2(code, frame)?;
                let resolved = resolve_methodref(vm, pool, index)?;
                let info = parse_desc(&vm.arena.method(resolved).descriptor)?;
                let args = frame.pop_args(info.nr_args + 1)?;

                // Re-dispatch on the receiver's own table: the resolved
                // method only supplies the slot number.
                let receiver = args[0].as_ref()?.ok_or(VmError::NullReference)?;
                let slot = vm
                    .arena
                    .method(resolved)
                    .vtable_slot
                    .ok_or(VmError::Unsupported("virtual call to constructor"))?;
                let target = vm
                    .arena
                    .get(vm.heap.class_of(receiver))
                    .vtable
                    .get(slot)
                    .copied()
                    .ok_or(VmError::Unsupported("receiver class lacks the virtual slot"))?;

                let ret = call_method(vm, target, &args)?;
                if info.returns {
                    frame.push(ret.ok_or(VmError::Unsupported("value-returning call came back void"))?);
                }
            }
            Opcode::INVOKESPECIAL => {
                let index = fetch_u2(code, frame)?;
                let target = resolve_methodref(vm, pool, index)?;
                let info = parse_desc(&vm.arena.method(target).descriptor)?;
                let args = frame.pop_args(info.nr_args + 1)?;

                args[0].as_ref()?.ok_or(VmError::NullReference)?;
                let ret = call_method(vm, target, &args)?;
                if info.returns {
                    frame.push(ret.ok_or(VmError::Unsupported("value-returning call came back void"))?);
                }
            }
            Opcode::INVOKESTATIC => {
                let index = fetch_u2(code, frame)?;
                let target = resolve_methodref(vm, pool, index)?;
                let info = parse_desc(&vm.arena.method(target).descriptor)?;
                let args = frame.pop_args(info.nr_args)?;

                let ret = call_method(vm, target, &args)?;
                if info.returns {
                    frame.push(ret.ok_or(VmError::Unsupported("value-returning call came back void"))?);
                }
            }

            Opcode::NEW => {
                let index = fetch_u2(code, frame)?;
                let class_name = pool.class_name(index)?;
                let class = vm.load_class(class_name)?;
                let size = vm.arena.get(class).instance_size;
                let r = vm.heap.alloc(class, size);
                frame.push(Value::Ref(Some(r)));
            }
        }
    }
}
