pub mod frame;
pub mod interpreter;
