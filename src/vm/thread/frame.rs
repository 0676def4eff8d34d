use smallvec::SmallVec;

use crate::error::VmError;
use crate::vm::class::class::MethodId;
use crate::vm::class::method::Code;
use crate::vm::thread::interpreter::MAX_NO_OF_ARGS;
use crate::vm::value::Value;

/// One method activation: instruction pointer, locals and operand stack.
/// Stack depth is bounded by the method's declared max; a deeper push is a
/// malformed class file, not a recoverable condition.
pub struct Frame {
    pub method: MethodId,
    pub ip: usize,
    locals: SmallVec<[Value; 8]>,
    stack: SmallVec<[Value; 8]>,
    max_stack: usize,
}

impl Frame {
    pub fn new(method: MethodId, code: &Code) -> Frame {
        let mut locals = SmallVec::with_capacity(code.max_locals);
        locals.resize(code.max_locals, Value::Int(0));
        Frame {
            method,
            ip: 0,
            locals,
            stack: SmallVec::new(),
            max_stack: code.max_stack,
        }
    }

    pub fn load(&self, index: usize) -> Result<Value, VmError> {
        self.locals
            .get(index)
            .copied()
            .ok_or(VmError::LocalIndexOutOfRange(index))
    }

    pub fn store(&mut self, index: usize, value: Value) -> Result<(), VmError> {
        match self.locals.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::LocalIndexOutOfRange(index)),
        }
    }

    pub fn push(&mut self, value: Value) {
        debug_assert!(self.stack.len() < self.max_stack, "operand stack overflow");
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pops `n` values and returns them in call order (receiver or first
    /// argument first).
    pub fn pop_args(&mut self, n: usize) -> Result<SmallVec<[Value; MAX_NO_OF_ARGS]>, VmError> {
        let mut args = SmallVec::new();
        args.resize(n, Value::Int(0));
        for slot in args.iter_mut().rev() {
            *slot = self.pop()?;
        }
        Ok(args)
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::class::class::{ClassId, MethodId};
    use std::rc::Rc;

    fn frame() -> Frame {
        let code = Code {
            max_stack: 4,
            max_locals: 3,
            code: Rc::from(vec![]),
        };
        Frame::new(MethodId { class: ClassId(0), index: 0 }, &code)
    }

    #[test]
    fn locals_start_zeroed() {
        let f = frame();
        assert_eq!(f.load(0).unwrap(), Value::Int(0));
        assert_eq!(f.load(2).unwrap(), Value::Int(0));
    }

    #[test]
    fn push_pop_is_lifo() {
        let mut f = frame();
        f.push(Value::Int(1));
        f.push(Value::Long(2));
        assert_eq!(f.pop().unwrap(), Value::Long(2));
        assert_eq!(f.pop().unwrap(), Value::Int(1));
    }

    #[test]
    fn pop_args_restores_call_order() {
        let mut f = frame();
        f.push(Value::Int(10));
        f.push(Value::Int(20));
        f.push(Value::Int(30));

        let args = f.pop_args(2).unwrap();
        assert_eq!(&args[..], &[Value::Int(20), Value::Int(30)]);
        assert_eq!(f.pop().unwrap(), Value::Int(10));
    }

    #[test]
    fn underflow_and_bad_local_index_are_errors() {
        let mut f = frame();
        assert!(matches!(f.pop(), Err(VmError::StackUnderflow)));
        assert!(matches!(f.pop_args(1), Err(VmError::StackUnderflow)));
        assert!(matches!(f.load(3), Err(VmError::LocalIndexOutOfRange(3))));
        assert!(matches!(
            f.store(7, Value::Int(1)),
            Err(VmError::LocalIndexOutOfRange(7))
        ));
    }
}
