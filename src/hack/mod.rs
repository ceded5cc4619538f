pub mod assembler;
pub mod instruction;
pub mod rom;

pub use assembler::{assemble, assemble_with, AssembleError, AssembleResult, AssembledProgram};
pub use instruction::{AValue, AsmInstruction, Instruction};
