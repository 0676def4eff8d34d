pub mod class;
pub mod class_loader;
pub mod instructions;
pub mod object;
pub mod thread;
pub mod value;
pub mod vm;
