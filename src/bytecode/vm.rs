//! Fixed-stack fetch-decode-execute loop over a [`Chunk`].

use crate::bytecode::chunk::Chunk;
use crate::bytecode::opcode::OpCode;
use crate::bytecode::value::Value;
use crate::error::RuntimeError;

const LOX_STACK_MAX: usize = 256;

pub struct Vm {
    stack: Vec<Value>,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            stack: Vec::with_capacity(LOX_STACK_MAX),
        }
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= LOX_STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Run a chunk to completion, returning the final value left on the
    /// stack by `OP_RETURN` along with the line it faulted on, if any.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, (RuntimeError, u32)> {
        let mut ip = 0usize;
        loop {
            let line = chunk.line_at(ip);
            let byte = chunk.code[ip];
            ip += 1;
            let op = OpCode::from_byte(byte).expect("compiler only emits known opcodes");

            macro_rules! binary_numeric {
                ($wrap:expr) => {{
                    let b = self.pop().map_err(|e| (e, line))?;
                    let a = self.pop().map_err(|e| (e, line))?;
                    match (a.as_number(), b.as_number()) {
                        (Some(a), Some(b)) => self.push($wrap(a, b)).map_err(|e| (e, line))?,
                        _ => return Err((RuntimeError::NotNumbers, line)),
                    }
                }};
            }

            match op {
                OpCode::Constant => {
                    let index = chunk.code[ip] as usize;
                    ip += 1;
                    self.push(chunk.constants[index]).map_err(|e| (e, line))?;
                }
                OpCode::Nil => self.push(Value::Nil).map_err(|e| (e, line))?,
                OpCode::True => self.push(Value::Bool(true)).map_err(|e| (e, line))?,
                OpCode::False => self.push(Value::Bool(false)).map_err(|e| (e, line))?,
                OpCode::Add => binary_numeric!(|a, b| Value::Number(a + b)),
                OpCode::Subtract => binary_numeric!(|a, b| Value::Number(a - b)),
                OpCode::Multiply => binary_numeric!(|a, b| Value::Number(a * b)),
                OpCode::Divide => binary_numeric!(|a, b| Value::Number(a / b)),
                OpCode::Greater => binary_numeric!(|a, b| Value::Bool(a > b)),
                OpCode::Less => binary_numeric!(|a, b| Value::Bool(a < b)),
                OpCode::Negate => {
                    let value = self.pop().map_err(|e| (e, line))?;
                    match value.as_number() {
                        Some(n) => self.push(Value::Number(-n)).map_err(|e| (e, line))?,
                        None => return Err((RuntimeError::NotANumber, line)),
                    }
                }
                OpCode::Not => {
                    let value = self.pop().map_err(|e| (e, line))?;
                    self.push(Value::Bool(!value.is_truthy()))
                        .map_err(|e| (e, line))?;
                }
                OpCode::Equal => {
                    let b = self.pop().map_err(|e| (e, line))?;
                    let a = self.pop().map_err(|e| (e, line))?;
                    self.push(Value::Bool(a.is_equal(&b))).map_err(|e| (e, line))?;
                }
                OpCode::Return => {
                    return self.pop().map_err(|e| (e, line));
                }
            }
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compiler::Compiler;
    use crate::error::Diagnostics;
    use crate::scanner::Scanner;

    fn run(src: &str) -> Result<Value, (RuntimeError, u32)> {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let chunk = Compiler::new(tokens).compile(&mut diagnostics).unwrap();
        Vm::new().run(&chunk)
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn evaluates_comparison() {
        assert_eq!(run("3 > 2").unwrap(), Value::Bool(true));
    }

    #[test]
    fn evaluates_negate_and_not() {
        assert_eq!(run("-(1 + 2)").unwrap(), Value::Number(-3.0));
        assert_eq!(run("!false").unwrap(), Value::Bool(true));
    }

    #[test]
    fn errors_on_non_numeric_arithmetic() {
        assert!(run("-nil").is_err());
    }

    #[test]
    fn nil_and_false_are_falsy_everything_else_truthy() {
        assert_eq!(run("!nil").unwrap(), Value::Bool(true));
        assert_eq!(run("!0").unwrap(), Value::Bool(false));
    }
}
