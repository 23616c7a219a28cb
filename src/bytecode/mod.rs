//! Single-pass Pratt compiler and stack VM, compiled independently of the
//! tree-walking path. Scope is intentionally limited to literals,
//! arithmetic, comparison and `return`; see the design notes for why this
//! is not extended to full language parity.

pub mod chunk;
pub mod compiler;
pub mod opcode;
pub mod value;
pub mod vm;

pub use chunk::Chunk;
pub use compiler::Compiler;
pub use opcode::OpCode;
pub use value::Value;
pub use vm::Vm;
