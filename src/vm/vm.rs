use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use crate::vm::class::class::ClassArena;
use crate::vm::class_loader::bootstrap;
use crate::vm::object::ObjHeap;

/// The whole runtime: class arena, object heap and output sinks. Passed
/// `&mut` through loader and interpreter instead of living in a global, so
/// tests can spin up as many isolated VMs as they like.
pub struct Vm {
    pub arena: ClassArena,
    pub heap: ObjHeap,
    /// Directory class files are resolved against (`<name>.class`).
    pub class_path: PathBuf,
    /// Opcode/stack tracing to stderr.
    pub trace: bool,
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    /// Names currently being linked; guards against a class naming itself or
    /// an ancestor as its own superclass.
    pub(crate) loading: HashSet<String>,
}

impl Vm {
    pub fn new() -> Vm {
        Vm::with_streams(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    pub fn with_streams(stdout: Box<dyn Write>, stderr: Box<dyn Write>) -> Vm {
        let mut vm = Vm {
            arena: ClassArena::new(),
            heap: ObjHeap::new(),
            class_path: PathBuf::from("."),
            trace: false,
            stdout,
            stderr,
            loading: HashSet::new(),
        };
        bootstrap::install(&mut vm);
        vm
    }
}
