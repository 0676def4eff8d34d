mod class_parser;
mod error;
mod helper;
mod trace;
mod vm;

use std::process::exit;

use clap::Parser;

use crate::error::VmError;
use crate::trace::{BOLD, RED, RESET};
use crate::vm::class::class::MethodId;
use crate::vm::thread::interpreter::call_method;
use crate::vm::vm::Vm;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Class whose static main method is executed; its class file is looked
    /// up as <name>.class in the current directory.
    main_class: String,

    /// Trace every executed instruction to stderr.
    #[clap(short, long)]
    debug: bool,
}

fn run(args: &Args) -> Result<(), VmError> {
    let mut vm = Vm::new();
    vm.trace = args.debug;

    let class = vm.load_class(&args.main_class)?;
    let index = vm
        .arena
        .get(class)
        .find_method_named("main")
        .ok_or_else(|| VmError::UnresolvedMember {
            class: args.main_class.clone(),
            name: "main".to_string(),
            descriptor: "()V".to_string(),
        })?;

    call_method(&mut vm, MethodId { class, index }, &[])?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{}{}ERROR:{} {}", BOLD, RED, RESET, e);
        exit(1);
    }
}
