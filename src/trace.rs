//! ANSI escape helpers for the `-d` execution trace on stderr.

use crate::vm::value::Value;

pub const BOLD: &str = "\x1b[1m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const RESET: &str = "\x1b[0m";

/// Renders an operand stack bottom-to-top, e.g. `[ I:2 I:3 ]`.
pub fn format_stack(stack: &[Value]) -> String {
    let mut s = String::from("[ ");
    for value in stack {
        s.push_str(&value.to_string());
        s.push(' ');
    }
    s.push(']');
    s
}

#[cfg(test)]
mod tests {
    use super::format_stack;
    use crate::vm::value::Value;

    #[test]
    fn stack_rendering() {
        assert_eq!(format_stack(&[]), "[ ]");
        assert_eq!(
            format_stack(&[Value::Int(2), Value::Ref(None)]),
            "[ I:2 A:null ]"
        );
    }
}
